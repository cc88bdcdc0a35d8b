//! # atelier-provider
//!
//! The provider API boundary: everything the subsystem knows about the
//! relay that fronts third-party generation providers.
//!
//! The plaintext provider key travels only as the `X-Image-Key` request
//! header on the individual call that needs it and is never stored or
//! logged here. Status and result requests carry the per-tab session token
//! as `X-Client-Session`.
//!
//! ## Modules
//!
//! - [`api`] — The [`ProviderApi`] trait the orchestrator consumes
//! - [`client`] — The HTTP implementation
//!
//! [`ProviderApi`]: api::ProviderApi

pub mod api;
pub mod client;

pub use api::ProviderApi;
pub use client::ProviderClient;

/// Error code the relay uses when a model is not permitted for this key.
pub const CODE_MODEL_NOT_ALLOWED: &str = "model_not_allowed";

/// Error types for provider boundary operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay rejected the request.
    #[error("provider error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The requested model is not permitted for this key. The message is
    /// the relay's, naming the currently permitted model.
    #[error("model not allowed: {message}")]
    ModelNotAllowed { message: String },

    /// The relay answered with something unparseable.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
