//! Bedrock runtime provider for Anthropic models.
//!
//! Calls the `InvokeModel` REST endpoint with bearer-token auth and maps
//! the runtime's exception taxonomy onto service errors.

use super::{ContentBlock, InvokeRequest, InvokeResponse, Provider, TokenUsage};
use async_trait::async_trait;
use confab_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wire protocol version for Anthropic models on Bedrock.
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
/// Generation ceiling per request.
const MAX_TOKENS: i64 = 8192;
/// Deterministic decoding parameters.
const TEMPERATURE: f64 = 0.0;
const TOP_K: i64 = 100;

/// Response header naming the runtime exception on failures.
const ERRORTYPE_HEADER: &str = "x-amzn-errortype";

/// Bedrock runtime provider.
pub struct BedrockProvider {
    client: reqwest::Client,
    base_url: String,
    model_id: String,
}

impl BedrockProvider {
    /// Create a provider for the given region, API key, and model.
    pub fn new(region: &str, api_key: &str, model_id: impl Into<String>) -> Self {
        Self::with_base_url(
            format!("https://bedrock-runtime.{region}.amazonaws.com"),
            api_key,
            model_id,
        )
    }

    /// Create with a custom base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: &str,
        model_id: impl Into<String>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            model_id: model_id.into(),
        }
    }

    /// InvokeModel URL. Versioned model ids carry a colon, which the
    /// runtime expects percent-encoded in the path.
    fn invoke_url(&self) -> String {
        let model = self.model_id.replace(':', "%3A");
        format!("{}/model/{}/invoke", self.base_url, model)
    }
}

#[async_trait]
impl Provider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse> {
        let start = Instant::now();

        let body = InvokeBody {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_k: TOP_K,
            messages: vec![WireMessage {
                role: "user",
                content: &request.content,
            }],
        };

        let response = self
            .client
            .post(self.invoke_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let errortype = response
                .headers()
                .get(ERRORTYPE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.split(':').next().unwrap_or(value).to_string());
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(classify_error(status, errortype.as_deref(), &detail));
        }

        let parsed: ModelResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("failed to parse response: {e}")))?;

        let text = parsed
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text.clone())
            .ok_or_else(|| Error::Upstream("response carried no text content".into()))?;

        let usage = parsed.usage.map(|wire| TokenUsage {
            input_tokens: wire.input_tokens,
            output_tokens: wire.output_tokens,
        });

        tracing::debug!(
            model_id = %self.model_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "InvokeModel completed"
        );

        Ok(InvokeResponse { text, usage })
    }
}

/// Map a failed InvokeModel response onto the service error taxonomy.
///
/// The runtime names its exception in the `x-amzn-errortype` header
/// (sometimes suffixed after a colon); the HTTP status is the fallback when
/// the header is absent or unrecognized.
fn classify_error(status: StatusCode, errortype: Option<&str>, detail: &str) -> Error {
    let detail = if detail.is_empty() {
        format!("status {status}")
    } else {
        detail.to_string()
    };

    match errortype {
        Some("ThrottlingException") => Error::RateLimited(detail),
        Some("ValidationException") => Error::InvalidRequest(detail),
        Some("ServiceQuotaExceededException") => Error::QuotaExceeded(detail),
        _ => match status.as_u16() {
            429 => Error::RateLimited(detail),
            400 | 422 => Error::InvalidRequest(detail),
            _ => Error::Upstream(detail),
        },
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    anthropic_version: &'static str,
    max_tokens: i64,
    temperature: f64,
    top_k: i64,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a [ContentBlock],
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    content: Vec<WireBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: i64,
    output_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}
