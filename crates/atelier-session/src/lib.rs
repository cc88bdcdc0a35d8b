//! # atelier-session
//!
//! Per-tab session identity and ephemeral job state.
//!
//! The session token is an opaque random handle attached to status and
//! result requests so the relay can scope access to a job's owner without
//! a login. It is generated at most once per tab lifetime and is never
//! derived from any stored secret; it is an anti-enumeration handle, not
//! a credential.
//!
//! The store also mirrors the in-progress job so a reload mid-job can
//! resume polling where it left off.

use std::sync::{Mutex, OnceLock};

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Session token size in bytes (hex-encoded to 64 characters).
pub const TOKEN_BYTES: usize = 32;

/// The in-progress job mirror, enough to resume polling after a reload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingJob {
    pub job_id: String,
    pub provider: String,
    pub model: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

/// Ephemeral per-tab storage: the session token plus the pending job.
#[derive(Default)]
pub struct SessionStore {
    token: OnceLock<String>,
    pending: Mutex<Option<PendingJob>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session token, generated on first use and stable for the life
    /// of this store.
    pub fn token(&self) -> &str {
        self.token.get_or_init(|| {
            tracing::debug!("generated new session token");
            generate_token()
        })
    }

    /// Record the in-progress job.
    pub fn set_pending_job(&self, job: PendingJob) {
        *self.lock_pending() = Some(job);
    }

    /// The in-progress job, if any.
    pub fn pending_job(&self) -> Option<PendingJob> {
        self.lock_pending().clone()
    }

    /// Forget the in-progress job (terminal state reached or cancelled).
    pub fn clear_pending_job(&self) {
        *self.lock_pending() = None;
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<PendingJob>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Generate a fresh random session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
