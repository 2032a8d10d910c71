//! Upstream model provider abstraction.
//!
//! Provides a narrow seam between the service logic and the inference
//! backend so orchestration can be exercised against scripted providers
//! in tests.

mod bedrock;

pub use bedrock::BedrockProvider;

use async_trait::async_trait;
use confab_common::Result;
use serde::Serialize;

/// Unified interface for the inference backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Send one generation request and return the generated text.
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse>;
}

/// One generation request.
///
/// The service flattens system instruction, transcript, and new input into
/// a single synthetic user turn, so a request is just that turn's content
/// blocks.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub content: Vec<ContentBlock>,
}

impl InvokeRequest {
    /// Request carrying a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// A content block within the synthetic user turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

/// Base64 image payload in the vendor's wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    /// Base64 source with the given media type.
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// One generation response.
#[derive(Debug, Clone)]
pub struct InvokeResponse {
    /// Generated text
    pub text: String,
    /// Token usage when the backend reports it
    pub usage: Option<TokenUsage>,
}

impl InvokeResponse {
    /// Response carrying only text.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_block_wire_shape() {
        let block = ContentBlock::Text {
            text: "Hello".into(),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "Hello"}));
    }

    #[test]
    fn test_image_block_wire_shape() {
        let block = ContentBlock::Image {
            source: ImageSource::base64("image/png", "aGVsbG8="),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": "image/png",
                    "data": "aGVsbG8="
                }
            })
        );
    }

    #[test]
    fn test_text_request_helper() {
        let request = InvokeRequest::text("hi");
        assert_eq!(request.content.len(), 1);
        assert!(matches!(
            &request.content[0],
            ContentBlock::Text { text } if text == "hi"
        ));
    }
}
