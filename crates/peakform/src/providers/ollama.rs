use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, RawAudio, Usage};
use super::configs::OllamaProviderConfig;
use super::utils::{
    messages_to_openai_spec, openai_response_to_message, output_schema_to_response_format,
    tools_to_openai_spec,
};
use crate::errors::{FlowError, FlowResult};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "qwen2.5";

pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> FlowResult<Self> {
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

    async fn post(&self, payload: Value) -> FlowResult<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FlowError::Provider(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json()
                .await
                .map_err(|e| FlowError::Provider(e.to_string())),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(FlowError::Provider(format!("server error: {status}")))
            }
            status => Err(FlowError::Provider(format!("request failed: {status}"))),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
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

        let messages_spec = messages_to_openai_spec(messages);
        let tools_spec = if !tools.is_empty() {
            tools_to_openai_spec(tools)?
        } else {
            vec![]
        };

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

        let response = self.post(payload).await?;

        let message = openai_response_to_message(response.clone())?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }

    async fn speak(&self, _text: &str, _voice: &str) -> FlowResult<RawAudio> {
        Err(FlowError::Provider(
            "the ollama provider does not support speech synthesis".to_string(),
        ))
    }
}
