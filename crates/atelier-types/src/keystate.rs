//! Per-provider stored-key state.
//!
//! The UI keeps one of these per provider id in a keyed map. The tagged
//! representation makes "needs a PIN" expressible only when a key exists
//! and is encrypted.

use serde::{Deserialize, Serialize};

/// The state of a provider's stored credential, as the UI sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ProviderKeyState {
    /// No secret stored for this provider.
    Absent,
    /// A secret is stored unencrypted; usable without a PIN.
    Plaintext,
    /// A secret is stored encrypted. `unlocked` tracks whether the
    /// current session has already decrypted it.
    Encrypted { unlocked: bool },
}

impl ProviderKeyState {
    /// Whether using the key right now requires prompting for a PIN.
    pub fn needs_pin(&self) -> bool {
        matches!(self, ProviderKeyState::Encrypted { unlocked: false })
    }

    /// Whether any secret is stored at all.
    pub fn has_key(&self) -> bool {
        !matches!(self, ProviderKeyState::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_pin_only_when_encrypted_and_locked() {
        assert!(!ProviderKeyState::Absent.needs_pin());
        assert!(!ProviderKeyState::Plaintext.needs_pin());
        assert!(!ProviderKeyState::Encrypted { unlocked: true }.needs_pin());
        assert!(ProviderKeyState::Encrypted { unlocked: false }.needs_pin());
    }

    #[test]
    fn test_has_key() {
        assert!(!ProviderKeyState::Absent.has_key());
        assert!(ProviderKeyState::Plaintext.has_key());
        assert!(ProviderKeyState::Encrypted { unlocked: false }.has_key());
    }
}
