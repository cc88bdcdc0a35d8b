//! The provider API trait.

use async_trait::async_trait;

use atelier_types::job::{GenerationJob, GenerationParams};
use atelier_types::provider::{ProviderInfo, ProviderModelsResponse, SubmitResponse};

use crate::Result;

/// The boundary the orchestrator and catalog refresh consume.
///
/// Implemented over HTTP by [`ProviderClient`](crate::client::ProviderClient)
/// and by scripted stubs in tests.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// List the providers the relay fronts.
    async fn list_providers(&self) -> Result<Vec<ProviderInfo>>;

    /// Fetch the model catalog for a provider. `force` asks the relay to
    /// bypass its own upstream cache.
    async fn fetch_models(
        &self,
        provider: &str,
        key: &str,
        force: bool,
    ) -> Result<ProviderModelsResponse>;

    /// Search a provider's models by name.
    async fn search_models(
        &self,
        provider: &str,
        key: &str,
        query: &str,
        limit: u32,
    ) -> Result<ProviderModelsResponse>;

    /// Check a key against the provider without generating anything.
    async fn validate_key(&self, provider: &str, key: &str) -> Result<()>;

    /// Submit a generation job. The key rides this one request only.
    async fn submit_generation(
        &self,
        params: &GenerationParams,
        key: &str,
        session: &str,
    ) -> Result<SubmitResponse>;

    /// Fetch the current projection of a job.
    async fn fetch_job(&self, job_id: &str, session: &str) -> Result<GenerationJob>;

    /// Fetch the result artifact at `result_url`, scoped by the session
    /// token.
    async fn fetch_result(&self, result_url: &str, session: &str) -> Result<Vec<u8>>;
}
