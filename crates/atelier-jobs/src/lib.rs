//! # atelier-jobs
//!
//! The generation job orchestrator.
//!
//! A job moves through `idle -> submitting -> {queued, running} ->
//! {done, error}`, with `cancelled` reachable from any non-terminal state.
//! "Idle" and "submitting" are the absence of a [`JobHandle`] and an
//! in-flight [`submit`] call; everything from `queued` onward is driven by
//! the handle's polling loop.
//!
//! The plaintext provider key is attached to the single submission request
//! and is not retained here.
//!
//! ## Modules
//!
//! - [`config`] — Orchestrator configuration
//! - [`validate`] — Pre-submission parameter validation
//! - [`visibility`] — Tab visibility gate for the polling loop
//! - [`catalog_sync`] — Read-through catalog refresh
//! - [`orchestrator`] — Submission, polling, cancellation, result fetch
//!
//! [`submit`]: orchestrator::JobOrchestrator::submit

pub mod catalog_sync;
pub mod config;
pub mod orchestrator;
pub mod validate;
pub mod visibility;

pub use config::OrchestratorConfig;
pub use orchestrator::{JobHandle, JobOrchestrator, JobOutcome, JobPhase, JobSnapshot};
pub use validate::ValidationError;
pub use visibility::{Visibility, VisibilityGate};

use atelier_catalog::CatalogError;
use atelier_provider::ProviderError;

/// Error types for orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Parameters rejected before any network round-trip.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The provider boundary rejected a request or the transport failed.
    #[error(transparent)]
    Provider(ProviderError),

    /// The requested model is not permitted for this key; the message
    /// names the currently permitted model.
    #[error("model not permitted: {message}")]
    ModelNotAllowed { message: String },

    /// The job itself failed server-side.
    #[error("generation failed: {message}")]
    Job {
        code: Option<String>,
        message: String,
    },

    /// The job succeeded but its artifact could not be retrieved.
    #[error("job succeeded but result fetch failed: {0}")]
    ResultFetch(#[source] ProviderError),

    /// A done job arrived without a result URL.
    #[error("job reported done without a result URL")]
    MissingResultUrl,

    /// The polling chain was cancelled.
    #[error("job cancelled")]
    Cancelled,

    /// The catalog cache failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The polling task was aborted or panicked.
    #[error("polling task failed: {0}")]
    Task(String),
}

impl From<ProviderError> for JobError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::ModelNotAllowed { message } => JobError::ModelNotAllowed { message },
            other => JobError::Provider(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
