//! Model catalog structures.
//!
//! A [`CatalogEntry`] is the locally cached list of models offered by one
//! provider, stamped with the fetch time and a time-to-live. [`ModelSpec`]
//! carries the per-model capabilities, limits and defaults that job
//! submission validates against.

use serde::{Deserialize, Serialize};

/// What a model supports beyond a bare prompt.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub supports_steps: bool,
    pub supports_cfg: bool,
    pub supports_seed: bool,
    pub supports_mode: bool,
    /// Named generation modes, empty unless `supports_mode`.
    #[serde(default)]
    pub modes: Vec<String>,
}

/// Numeric parameter bounds for a model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelLimits {
    pub min_steps: u32,
    pub max_steps: u32,
    pub min_cfg: f32,
    pub max_cfg: f32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Preferred (width, height) presets.
    #[serde(default)]
    pub presets: Vec<(u32, u32)>,
}

/// Default parameter values substituted when the caller omits them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDefaults {
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// A single model offered by a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub recommended: bool,
    pub capabilities: ModelCapabilities,
    pub limits: ModelLimits,
    pub defaults: ModelDefaults,
}

impl ModelSpec {
    /// Check the defaults-within-limits invariant:
    /// every numeric default satisfies `min <= default <= max`.
    pub fn validate_defaults(&self) -> bool {
        let l = &self.limits;
        let d = &self.defaults;
        l.min_width <= d.width
            && d.width <= l.max_width
            && l.min_height <= d.height
            && d.height <= l.max_height
            && l.min_steps <= d.steps
            && d.steps <= l.max_steps
            && l.min_cfg <= d.cfg
            && d.cfg <= l.max_cfg
    }
}

/// A cached model list for one provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub provider_id: String,
    pub models: Vec<ModelSpec>,
    /// Unix milliseconds of the successful fetch that produced this entry.
    pub fetched_at: u64,
    pub ttl_ms: u64,
}

impl CatalogEntry {
    /// Staleness rule: stale iff more than `ttl_ms` has elapsed since fetch.
    pub fn is_stale(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.fetched_at) > self.ttl_ms
    }

    /// Look up a model by id.
    pub fn model(&self, model_id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == model_id)
    }
}
