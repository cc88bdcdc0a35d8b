//! Pre-submission parameter validation.
//!
//! Validation is synchronous and runs before any network round-trip:
//! invalid input never consumes a request. Omitted parameters are
//! substituted from the model's defaults; supplied parameters must fall
//! within the model's limits. Parameters the model does not support are
//! dropped rather than rejected.

use atelier_types::catalog::{CatalogEntry, ModelSpec};
use atelier_types::job::GenerationParams;

/// A parameter rejection, raised before any network I/O.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("prompt too long: {len} characters (maximum {max})")]
    PromptTooLong { len: usize, max: usize },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("{field} out of range: {value} (allowed {min} to {max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("mode '{0}' is not offered by this model")]
    UnsupportedMode(String),
}

/// Validate `params` against the cached catalog and resolve omitted
/// fields from the model's defaults.
pub fn validate(
    params: &GenerationParams,
    catalog: &CatalogEntry,
    max_prompt_len: usize,
) -> Result<GenerationParams, ValidationError> {
    let prompt = params.prompt.trim();
    if prompt.is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }
    if prompt.chars().count() > max_prompt_len {
        return Err(ValidationError::PromptTooLong {
            len: prompt.chars().count(),
            max: max_prompt_len,
        });
    }

    let model = catalog
        .model(&params.model)
        .ok_or_else(|| ValidationError::UnknownModel(params.model.clone()))?;

    let width = params.width.unwrap_or(model.defaults.width);
    let height = params.height.unwrap_or(model.defaults.height);
    check_range("width", width as f64, model.limits.min_width as f64, model.limits.max_width as f64)?;
    check_range("height", height as f64, model.limits.min_height as f64, model.limits.max_height as f64)?;

    let steps = resolve_steps(params, model)?;
    let cfg = resolve_cfg(params, model)?;
    let mode = resolve_mode(params, model)?;
    let seed = if model.capabilities.supports_seed {
        params.seed
    } else {
        None
    };

    Ok(GenerationParams {
        provider: params.provider.clone(),
        model: params.model.clone(),
        prompt: prompt.to_string(),
        width: Some(width),
        height: Some(height),
        steps,
        cfg,
        seed,
        mode,
        extras: params.extras.clone(),
    })
}

fn resolve_steps(
    params: &GenerationParams,
    model: &ModelSpec,
) -> Result<Option<u32>, ValidationError> {
    if !model.capabilities.supports_steps {
        return Ok(None);
    }
    let steps = params.steps.unwrap_or(model.defaults.steps);
    check_range(
        "steps",
        steps as f64,
        model.limits.min_steps as f64,
        model.limits.max_steps as f64,
    )?;
    Ok(Some(steps))
}

fn resolve_cfg(
    params: &GenerationParams,
    model: &ModelSpec,
) -> Result<Option<f32>, ValidationError> {
    if !model.capabilities.supports_cfg {
        return Ok(None);
    }
    let cfg = params.cfg.unwrap_or(model.defaults.cfg);
    check_range(
        "cfg",
        cfg as f64,
        model.limits.min_cfg as f64,
        model.limits.max_cfg as f64,
    )?;
    Ok(Some(cfg))
}

fn resolve_mode(
    params: &GenerationParams,
    model: &ModelSpec,
) -> Result<Option<String>, ValidationError> {
    if !model.capabilities.supports_mode {
        return Ok(None);
    }
    match &params.mode {
        Some(mode) => {
            if model.capabilities.modes.iter().any(|m| m == mode) {
                Ok(Some(mode.clone()))
            } else {
                Err(ValidationError::UnsupportedMode(mode.clone()))
            }
        }
        None => Ok(model.defaults.mode.clone()),
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
