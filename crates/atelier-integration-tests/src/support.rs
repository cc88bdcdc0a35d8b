//! Shared test support: a scripted provider boundary and fixture builders.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use atelier_provider::{ProviderApi, ProviderError, Result as ProviderResult};
use atelier_types::catalog::{
    CatalogEntry, ModelCapabilities, ModelDefaults, ModelLimits, ModelSpec,
};
use atelier_types::job::{GenerationJob, GenerationParams, JobStatus};
use atelier_types::provider::{ProviderInfo, ProviderModelsResponse, SubmitResponse};

/// Install a test subscriber honoring `RUST_LOG`. Safe to call from every
/// test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What a [`ScriptedApi`] saw on submission.
#[derive(Clone, Debug)]
pub struct RecordedSubmission {
    pub params: GenerationParams,
    pub key: String,
    pub session: String,
}

/// A scripted provider boundary: replays a fixed status sequence and
/// records every call for assertions.
pub struct ScriptedApi {
    pub statuses: Mutex<Vec<GenerationJob>>,
    pub models: Vec<ModelSpec>,
    pub submissions: Mutex<Vec<RecordedSubmission>>,
    pub result_sessions: Mutex<Vec<(String, String)>>,
    pub fetch_count: AtomicUsize,
    pub models_fetch_count: AtomicUsize,
    pub artifact: Vec<u8>,
}

impl ScriptedApi {
    pub fn new(statuses: Vec<GenerationJob>) -> Self {
        Self {
            statuses: Mutex::new(statuses),
            models: vec![flux_model()],
            submissions: Mutex::new(Vec::new()),
            result_sessions: Mutex::new(Vec::new()),
            fetch_count: AtomicUsize::new(0),
            models_fetch_count: AtomicUsize::new(0),
            artifact: b"png-bytes".to_vec(),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn result_fetches(&self) -> Vec<(String, String)> {
        self.result_sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ProviderApi for ScriptedApi {
    async fn list_providers(&self) -> ProviderResult<Vec<ProviderInfo>> {
        Ok(vec![ProviderInfo {
            id: "together".to_string(),
            label: "Together AI".to_string(),
            enabled: true,
            recommended_models: vec!["flux-schnell".to_string()],
        }])
    }

    async fn fetch_models(
        &self,
        provider: &str,
        _key: &str,
        _force: bool,
    ) -> ProviderResult<ProviderModelsResponse> {
        self.models_fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderModelsResponse {
            provider: provider.to_string(),
            models: self.models.clone(),
        })
    }

    async fn search_models(
        &self,
        provider: &str,
        _key: &str,
        query: &str,
        _limit: u32,
    ) -> ProviderResult<ProviderModelsResponse> {
        let query = query.to_ascii_lowercase();
        Ok(ProviderModelsResponse {
            provider: provider.to_string(),
            models: self
                .models
                .iter()
                .filter(|m| m.id.to_ascii_lowercase().contains(&query))
                .cloned()
                .collect(),
        })
    }

    async fn validate_key(&self, _provider: &str, key: &str) -> ProviderResult<()> {
        if key.is_empty() {
            return Err(ProviderError::Api {
                status: 401,
                code: Some("invalid_key".to_string()),
                message: "key rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn submit_generation(
        &self,
        params: &GenerationParams,
        key: &str,
        session: &str,
    ) -> ProviderResult<SubmitResponse> {
        self.submissions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedSubmission {
                params: params.clone(),
                key: key.to_string(),
                session: session.to_string(),
            });
        Ok(SubmitResponse {
            job_id: "42".to_string(),
            status: "queued".to_string(),
        })
    }

    async fn fetch_job(&self, _job_id: &str, _session: &str) -> ProviderResult<GenerationJob> {
        let index = self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let statuses = self
            .statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let clamped = index.min(statuses.len() - 1);
        Ok(statuses[clamped].clone())
    }

    async fn fetch_result(&self, result_url: &str, session: &str) -> ProviderResult<Vec<u8>> {
        self.result_sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((result_url.to_string(), session.to_string()));
        Ok(self.artifact.clone())
    }
}

/// The fixture model used across integration tests.
pub fn flux_model() -> ModelSpec {
    ModelSpec {
        id: "flux-schnell".to_string(),
        display_name: "FLUX Schnell".to_string(),
        recommended: true,
        capabilities: ModelCapabilities {
            supports_steps: true,
            supports_cfg: true,
            supports_seed: true,
            supports_mode: false,
            modes: vec![],
        },
        limits: ModelLimits {
            min_steps: 1,
            max_steps: 50,
            min_cfg: 1.0,
            max_cfg: 20.0,
            min_width: 256,
            max_width: 1440,
            min_height: 256,
            max_height: 1440,
            presets: vec![(1024, 1024), (1440, 810)],
        },
        defaults: ModelDefaults {
            width: 1024,
            height: 1024,
            steps: 4,
            cfg: 3.5,
            seed: None,
            mode: None,
        },
    }
}

/// A catalog entry holding the fixture model.
pub fn catalog_entry() -> CatalogEntry {
    CatalogEntry {
        provider_id: "together".to_string(),
        models: vec![flux_model()],
        fetched_at: 0,
        ttl_ms: 600_000,
    }
}

/// A job projection with the given status; done jobs carry a result URL.
pub fn job(status: JobStatus) -> GenerationJob {
    GenerationJob {
        job_id: "42".to_string(),
        provider: "together".to_string(),
        model: "flux-schnell".to_string(),
        prompt: "a lighthouse at dusk".to_string(),
        width: 1024,
        height: 1024,
        steps: 4,
        cfg: None,
        seed: None,
        mode: None,
        status,
        created_at: 0,
        updated_at: 0,
        started_at: None,
        completed_at: None,
        duration_ms: None,
        error_code: None,
        error_message: None,
        result_url: matches!(status, JobStatus::Done).then(|| "/jobs/42/result".to_string()),
    }
}
