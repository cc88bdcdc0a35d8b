//! Secret metadata projection.
//!
//! What the UI may know about a stored secret without touching its value.

use atelier_types::keystate::ProviderKeyState;

/// Metadata about a provider's stored secret. Never contains the value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretMetadata {
    pub has_key: bool,
    pub encrypted: bool,
    pub created_at: Option<u64>,
    pub updated_at: Option<u64>,
}

impl SecretMetadata {
    /// Metadata for a provider with no stored secret.
    pub fn absent() -> Self {
        Self {
            has_key: false,
            encrypted: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Project into the UI's tagged key state. `unlocked` is the caller's
    /// session knowledge (whether this secret was already decrypted).
    pub fn key_state(&self, unlocked: bool) -> ProviderKeyState {
        match (self.has_key, self.encrypted) {
            (false, _) => ProviderKeyState::Absent,
            (true, false) => ProviderKeyState::Plaintext,
            (true, true) => ProviderKeyState::Encrypted { unlocked },
        }
    }
}
