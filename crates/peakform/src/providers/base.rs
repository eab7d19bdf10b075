use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::FlowResult;
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Raw audio bytes as returned by a provider's speech endpoint, before any
/// container packaging.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudio {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Base trait for generation providers (OpenAI-compatible APIs, test mocks)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message for the exchange. When `output_schema` is
    /// set the provider is instructed to answer with JSON conforming to it.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        output_schema: Option<&Value>,
    ) -> FlowResult<(Message, Usage)>;

    /// Synthesize speech for `text`. Providers without a speech endpoint
    /// fail with `FlowError::Provider`.
    async fn speak(&self, text: &str, voice: &str) -> FlowResult<RawAudio>;
}
