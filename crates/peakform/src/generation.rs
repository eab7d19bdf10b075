use serde_json::Value;

use crate::errors::{FlowError, FlowResult, Violation, Violations};
use crate::models::message::{Message, ToolRequest};
use crate::providers::base::{Provider, RawAudio};
use crate::schema::Shape;
use crate::tools::ToolRegistry;

/// Turns a compiled prompt into a value validated against an output shape.
///
/// The client owns the tool-call sub-protocol: while the provider answers
/// with tool requests, each is dispatched through the bridge and the result
/// fed back into the same logical request. The turn budget belongs to the
/// provider; this loop runs until the provider produces a final answer.
/// No retries happen here, a failed generation surfaces immediately.
pub struct GenerationClient {
    provider: Box<dyn Provider + Send + Sync>,
}

impl GenerationClient {
    pub fn new(provider: Box<dyn Provider + Send + Sync>) -> Self {
        Self { provider }
    }

    /// Run one generation request and validate the final answer against
    /// `output`. The prompt is sent as the opening user message; callers
    /// with conversation history fold it into the prompt beforehand. Tools,
    /// when given, are available to the provider for this request only.
    pub async fn generate(
        &self,
        system: &str,
        prompt: &str,
        output: &Shape,
        tools: Option<&ToolRegistry>,
    ) -> FlowResult<Value> {
        let schema = output.to_json_schema();
        let text = self.converse(system, prompt, Some(&schema), tools).await?;

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            FlowError::SchemaViolation(Violations(vec![Violation::new(
                ".",
                format!("final answer is not valid JSON: {e}"),
            )]))
        })?;

        output.validate(&value).map_err(FlowError::SchemaViolation)
    }

    /// Synthesize raw speech audio through the provider.
    pub async fn speak(&self, text: &str, voice: &str) -> FlowResult<RawAudio> {
        self.provider.speak(text, voice).await
    }

    async fn converse(
        &self,
        system: &str,
        prompt: &str,
        output_schema: Option<&Value>,
        tools: Option<&ToolRegistry>,
    ) -> FlowResult<String> {
        let tool_specs = tools.map(ToolRegistry::provider_specs).unwrap_or_default();
        let mut messages = vec![Message::user().with_text(prompt)];

        loop {
            let (response, _usage) = self
                .provider
                .complete(system, &messages, &tool_specs, output_schema)
                .await?;

            let tool_requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();

            if tool_requests.is_empty() {
                let text = response.text();
                if text.trim().is_empty() {
                    return Err(FlowError::EmptyGeneration);
                }
                return Ok(text);
            }

            // Answer every tool request in this turn, then hand the results
            // back and let the provider continue the same logical request.
            messages.push(response);
            let mut tool_response = Message::user();
            for request in &tool_requests {
                let outcome = match (&request.tool_call, tools) {
                    (Ok(call), Some(tools)) => tools.dispatch(call),
                    (Ok(call), None) => Err(FlowError::ToolNotFound(call.name.clone())),
                    (Err(e), _) => Err(e.clone()),
                };
                tool_response = tool_response.with_tool_response(request.id.clone(), outcome);
            }
            messages.push(tool_response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Product};
    use crate::models::tool::ToolCall;
    use crate::providers::mock::MockProvider;
    use crate::schema::{Field, FieldType};
    use crate::tools::search_products_tool;
    use serde_json::json;
    use std::sync::Arc;

    fn reply_shape() -> Shape {
        Shape::new().field(Field::required("reply", "", FieldType::string()))
    }

    fn catalog_tools() -> ToolRegistry {
        let catalog = Arc::new(Catalog::new(vec![Product {
            title: "Whey Protein 900g".to_string(),
            description: "Grass-fed whey".to_string(),
            price: 39.90,
            handle: "whey-protein-900g".to_string(),
            tags: vec![],
        }]));
        let mut tools = ToolRegistry::new();
        tools.define(search_products_tool(catalog)).unwrap();
        tools
    }

    #[tokio::test]
    async fn test_generate_validates_final_answer() {
        let provider = MockProvider::new(vec![
            Message::assistant().with_text("{\"reply\": \"We stock one whey product.\"}"),
        ]);
        let client = GenerationClient::new(Box::new(provider));

        let value = client
            .generate("system", "Any whey?", &reply_shape(), None)
            .await
            .unwrap();
        assert_eq!(value["reply"], "We stock one whey product.");
    }

    #[tokio::test]
    async fn test_generate_empty_answer() {
        let provider = MockProvider::new(vec![]);
        let client = GenerationClient::new(Box::new(provider));

        let err = client
            .generate("system", "Any whey?", &reply_shape(), None)
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::EmptyGeneration);
    }

    #[tokio::test]
    async fn test_generate_does_not_retry_after_empty_answer() {
        // A valid answer is queued behind the empty one; a retrying client
        // would reach it and succeed.
        let provider = MockProvider::new(vec![
            Message::assistant(),
            Message::assistant().with_text("{\"reply\": \"late\"}"),
        ]);
        let client = GenerationClient::new(Box::new(provider));

        let err = client
            .generate("system", "Any whey?", &reply_shape(), None)
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::EmptyGeneration);
    }

    #[tokio::test]
    async fn test_generate_rejects_non_json_answer() {
        let provider = MockProvider::new(vec![
            Message::assistant().with_text("sure, we have whey!"),
        ]);
        let client = GenerationClient::new(Box::new(provider));

        let err = client
            .generate("system", "Any whey?", &reply_shape(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_generate_rejects_answer_outside_shape() {
        let provider = MockProvider::new(vec![
            Message::assistant().with_text("{\"reply\": 42}"),
        ]);
        let client = GenerationClient::new(Box::new(provider));

        let err = client
            .generate("system", "Any whey?", &reply_shape(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_generate_runs_tool_calls() {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("search_products", json!({"query": "whey"}))),
            ),
            Message::assistant().with_text("{\"reply\": \"Found Whey Protein 900g.\"}"),
        ]);
        let client = GenerationClient::new(Box::new(provider));
        let tools = catalog_tools();

        let value = client
            .generate("system", "Any whey?", &reply_shape(), Some(&tools))
            .await
            .unwrap();
        assert_eq!(value["reply"], "Found Whey Protein 900g.");
    }

    #[tokio::test]
    async fn test_generate_surfaces_tool_error_to_provider() {
        // The unknown tool fails, the provider sees the error result and
        // recovers with a final answer.
        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("track_order", json!({})))),
            Message::assistant().with_text("{\"reply\": \"I can't track orders yet.\"}"),
        ]);
        let client = GenerationClient::new(Box::new(provider));
        let tools = catalog_tools();

        let value = client
            .generate("system", "Where is my order?", &reply_shape(), Some(&tools))
            .await
            .unwrap();
        assert_eq!(value["reply"], "I can't track orders yet.");
    }
}
