//! # atelier-types
//!
//! Shared domain types for the Atelier BYOK subsystem.
//!
//! ## Modules
//!
//! - [`catalog`] — Model capability/limit metadata and cached catalog entries
//! - [`job`] — Generation job projection and request parameters
//! - [`provider`] — Provider listing and model-response wire types
//! - [`keystate`] — Per-provider stored-key state

pub mod catalog;
pub mod job;
pub mod keystate;
pub mod provider;

/// Server-assigned job identifier.
pub type JobId = String;

/// Maximum accepted prompt length in characters.
pub const MAX_PROMPT_LEN: usize = 2000;

/// Fixed delay between job status polls (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 2500;

/// Default catalog entry time-to-live (10 minutes).
pub const DEFAULT_CATALOG_TTL_MS: u64 = 600_000;

/// Current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
