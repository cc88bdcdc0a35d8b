//! Provider listing wire types.

use serde::{Deserialize, Serialize};

use crate::catalog::ModelSpec;

/// A provider advertised by the relay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub label: String,
    pub enabled: bool,
    #[serde(default)]
    pub recommended_models: Vec<String>,
}

/// Response to a model listing or search request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderModelsResponse {
    pub provider: String,
    pub models: Vec<ModelSpec>,
}

/// Response to a generation submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
}
