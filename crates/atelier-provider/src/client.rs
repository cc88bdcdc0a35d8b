//! HTTP implementation of the provider boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use atelier_types::job::{GenerationJob, GenerationParams};
use atelier_types::provider::{ProviderInfo, ProviderModelsResponse, SubmitResponse};

use crate::api::ProviderApi;
use crate::{ProviderError, Result, CODE_MODEL_NOT_ALLOWED};

/// Header carrying the plaintext provider key, per request only.
pub const HEADER_IMAGE_KEY: &str = "X-Image-Key";

/// Header carrying the per-tab session token.
pub const HEADER_CLIENT_SESSION: &str = "X-Client-Session";

/// CSRF header sent on mutating requests.
pub const HEADER_CSRF: &str = "X-CSRF-Token";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error payload the relay returns on a rejected request.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    error_message: Option<String>,
}

/// HTTP client for the provider relay.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl ProviderClient {
    /// Build a client for the relay at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Build a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token: None,
        })
    }

    /// Attach the CSRF token sent with mutating requests.
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Resolve a possibly relative URL (like a job's `result_url`)
    /// against the relay base.
    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn csrf(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.csrf_token {
            Some(token) => builder.header(HEADER_CSRF, token),
            None => builder,
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = check_status(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

/// Map a non-success response to a typed error, reading the relay's error
/// payload when it has one.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_error(status, &body))
}

fn map_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.error_code.clone());
    let message = parsed
        .and_then(|b| b.error_message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    if code.as_deref() == Some(CODE_MODEL_NOT_ALLOWED) {
        return ProviderError::ModelNotAllowed { message };
    }

    ProviderError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

#[async_trait]
impl ProviderApi for ProviderClient {
    async fn list_providers(&self) -> Result<Vec<ProviderInfo>> {
        let response = self.client.get(self.endpoint("providers")).send().await?;
        Self::parse_json(response).await
    }

    async fn fetch_models(
        &self,
        provider: &str,
        key: &str,
        force: bool,
    ) -> Result<ProviderModelsResponse> {
        let mut request = self
            .client
            .get(self.endpoint("providers"))
            .query(&[("provider", provider)])
            .header(HEADER_IMAGE_KEY, key);
        if force {
            request = request.query(&[("force", "1")]);
        }

        tracing::debug!(provider, force, "fetching provider models");
        Self::parse_json(request.send().await?).await
    }

    async fn search_models(
        &self,
        provider: &str,
        key: &str,
        query: &str,
        limit: u32,
    ) -> Result<ProviderModelsResponse> {
        let request = self
            .client
            .get(self.endpoint("providers/search"))
            .query(&[("provider", provider), ("query", query)])
            .query(&[("limit", limit)])
            .header(HEADER_IMAGE_KEY, key);
        Self::parse_json(request.send().await?).await
    }

    async fn validate_key(&self, provider: &str, key: &str) -> Result<()> {
        let request = self
            .csrf(self.client.post(self.endpoint("validate")))
            .query(&[("provider", provider)])
            .header(HEADER_IMAGE_KEY, key);
        check_status(request.send().await?).await?;
        Ok(())
    }

    async fn submit_generation(
        &self,
        params: &GenerationParams,
        key: &str,
        session: &str,
    ) -> Result<SubmitResponse> {
        let request = self
            .csrf(self.client.post(self.endpoint("generate")))
            .header(HEADER_IMAGE_KEY, key)
            .header(HEADER_CLIENT_SESSION, session)
            .json(params);

        tracing::debug!(provider = %params.provider, model = %params.model, "submitting generation");
        Self::parse_json(request.send().await?).await
    }

    async fn fetch_job(&self, job_id: &str, session: &str) -> Result<GenerationJob> {
        let request = self
            .client
            .get(self.endpoint(&format!("jobs/{job_id}")))
            .header(HEADER_CLIENT_SESSION, session);
        Self::parse_json(request.send().await?).await
    }

    async fn fetch_result(&self, result_url: &str, session: &str) -> Result<Vec<u8>> {
        let request = self
            .client
            .get(self.resolve(result_url))
            .header(HEADER_CLIENT_SESSION, session);
        let response = check_status(request.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ProviderClient {
        ProviderClient::new("https://relay.example/api/").expect("client")
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let c = client();
        assert_eq!(c.endpoint("providers"), "https://relay.example/api/providers");
        assert_eq!(c.endpoint("/generate"), "https://relay.example/api/generate");
    }

    #[test]
    fn test_resolve_relative_result_url() {
        let c = client();
        assert_eq!(
            c.resolve("/jobs/42/result"),
            "https://relay.example/api/jobs/42/result"
        );
        assert_eq!(
            c.resolve("https://cdn.example/artifact.png"),
            "https://cdn.example/artifact.png"
        );
    }

    #[test]
    fn test_map_error_model_not_allowed() {
        let body = r#"{"error_code":"model_not_allowed","error_message":"only flux-schnell is permitted"}"#;
        let err = map_error(StatusCode::FORBIDDEN, body);
        assert!(matches!(
            err,
            ProviderError::ModelNotAllowed { ref message } if message.contains("flux-schnell")
        ));
    }

    #[test]
    fn test_map_error_generic_api() {
        let body = r#"{"error_code":"invalid_key","error_message":"key rejected"}"#;
        match map_error(StatusCode::UNAUTHORIZED, body) {
            ProviderError::Api { status, code, message } => {
                assert_eq!(status, 401);
                assert_eq!(code.as_deref(), Some("invalid_key"));
                assert_eq!(message, "key rejected");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_error_unparseable_body() {
        let err = map_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        match err {
            ProviderError::Api { status, code, message } => {
                assert_eq!(status, 502);
                assert!(code.is_none());
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
