use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::{FlowError, FlowResult};
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, RawAudio, Usage};

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Message>>>,
    speech: Arc<Mutex<Vec<RawAudio>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of completion responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            speech: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue speech payloads returned by successive `speak` calls
    pub fn with_speech(mut self, speech: Vec<RawAudio>) -> Self {
        self.speech = Arc::new(Mutex::new(speech));
        self
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[Tool],
        _output_schema: Option<&Value>,
    ) -> FlowResult<(Message, Usage)> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return an empty response if no more pre-configured responses
            Ok((Message::assistant(), Usage::default()))
        } else {
            Ok((responses.remove(0), Usage::default()))
        }
    }

    async fn speak(&self, _text: &str, _voice: &str) -> FlowResult<RawAudio> {
        let mut speech = self.speech.lock().unwrap();
        if speech.is_empty() {
            Err(FlowError::Provider(
                "mock provider has no scripted speech".to_string(),
            ))
        } else {
            Ok(speech.remove(0))
        }
    }
}
