use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, RawAudio, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    check_openai_context_length_error, messages_to_openai_spec, openai_response_to_message,
    output_schema_to_response_format, tools_to_openai_spec,
};
use crate::errors::{FlowError, FlowResult};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const DEFAULT_PCM_MIME: &str = "audio/pcm;rate=24000";

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> FlowResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(|e| FlowError::Provider(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = match data.get("usage") {
            Some(usage) => usage,
            None => return Usage::default(),
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    async fn post(&self, path: &str, payload: Value) -> FlowResult<reqwest::Response> {
        let url = format!("{}{}", self.config.host.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| FlowError::Provider(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(response),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(FlowError::Provider(format!("server error: {status}")))
            }
            status => Err(FlowError::Provider(format!("request failed: {status}"))),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        output_schema: Option<&Value>,
    ) -> FlowResult<(Message, Usage)> {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        // Convert messages and tools to OpenAI format
        let messages_spec = messages_to_openai_spec(messages);
        let tools_spec = if !tools.is_empty() {
            tools_to_openai_spec(tools)?
        } else {
            vec![]
        };

        // Build payload with the system message first
        let mut messages_array = vec![system_message];
        messages_array.extend(messages_spec);

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array
        });

        if !tools_spec.is_empty() {
            payload
                .as_object_mut()
                .unwrap()
                .insert("tools".to_string(), json!(tools_spec));
        }
        if let Some(schema) = output_schema {
            payload.as_object_mut().unwrap().insert(
                "response_format".to_string(),
                output_schema_to_response_format(schema),
            );
        }
        if let Some(temp) = self.config.temperature {
            payload
                .as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload
                .as_object_mut()
                .unwrap()
                .insert("max_tokens".to_string(), json!(tokens));
        }

        let response: Value = self
            .post("/v1/chat/completions", payload)
            .await?
            .json()
            .await
            .map_err(|e| FlowError::Provider(e.to_string()))?;

        // Raise specific error if context length is exceeded
        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(FlowError::Provider(err.to_string()));
            }
            return Err(FlowError::Provider(format!("OpenAI API error: {error}")));
        }

        let message = openai_response_to_message(response.clone())?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }

    async fn speak(&self, text: &str, voice: &str) -> FlowResult<RawAudio> {
        let payload = json!({
            "model": self.config.speech_model,
            "input": text,
            "voice": voice,
            "response_format": "pcm",
        });

        let response = self.post("/v1/audio/speech", payload).await?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_PCM_MIME.to_string());

        let data = response
            .bytes()
            .await
            .map_err(|e| FlowError::Provider(e.to_string()))?
            .to_vec();

        Ok(RawAudio { data, mime_type })
    }
}
