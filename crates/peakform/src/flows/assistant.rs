use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{parse_response, validate_request};
use crate::catalog::Catalog;
use crate::errors::FlowResult;
use crate::generation::GenerationClient;
use crate::prompt_template::render_prompt_file;
use crate::registry::{TaskRegistry, TaskSchema};
use crate::schema::{Field, FieldType, Shape};
use crate::tools::{search_products_tool, ToolRegistry};

pub const TASK_NAME: &str = "shopping_assistant";

const SYSTEM_PROMPT: &str =
    "You are the PeakForm shopping assistant. You help members pick products from the \
     PeakForm store. Use the search_products tool to check the catalog before \
     recommending anything, and answer only with the requested JSON.";
const TEMPLATE: &str = "assistant.md";

pub fn task_schema() -> TaskSchema {
    let turn = Shape::new()
        .field(Field::required(
            "actor",
            "Who said it",
            FieldType::enumeration(["user", "assistant"]),
        ))
        .field(Field::required("text", "What was said", FieldType::string_max(2_000)));
    let input = Shape::new()
        .field(Field::required(
            "message",
            "The member's new message",
            FieldType::string_max(1_000),
        ))
        .field(
            Field::optional(
                "history",
                "Prior turns of this conversation, oldest first",
                FieldType::list(FieldType::Object(turn)),
            )
            .with_default(serde_json::Value::Array(Vec::new())),
        );

    let output = Shape::new().field(Field::required(
        "reply",
        "The assistant's answer to the member",
        FieldType::string(),
    ));

    TaskSchema::new(TASK_NAME, input, output)
}

/// One prior exchange in the conversation. The server is stateless: the
/// caller resubmits the full history on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub actor: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub reply: String,
}

pub struct ShoppingAssistantFlow {
    registry: Arc<TaskRegistry>,
    client: Arc<GenerationClient>,
    tools: ToolRegistry,
}

impl ShoppingAssistantFlow {
    pub fn new(
        registry: Arc<TaskRegistry>,
        client: Arc<GenerationClient>,
        catalog: Arc<Catalog>,
    ) -> FlowResult<Self> {
        let mut tools = ToolRegistry::new();
        tools.define(search_products_tool(catalog))?;
        Ok(Self {
            registry,
            client,
            tools,
        })
    }

    /// Answer one assistant turn. History is threaded into the prompt in
    /// original order; the catalog search tool is available to the model
    /// for the duration of the request.
    pub async fn run(&self, request: AssistantRequest) -> FlowResult<AssistantResponse> {
        let task = self.registry.lookup(TASK_NAME)?;
        let fields = validate_request(task, &request)?;
        let prompt = render_prompt_file(TEMPLATE, &fields)?;

        let output = self
            .client
            .generate(SYSTEM_PROMPT, &prompt, &task.output, Some(&self.tools))
            .await?;

        parse_response(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::errors::FlowError;
    use crate::models::message::Message;
    use crate::models::tool::ToolCall;
    use crate::providers::mock::MockProvider;
    use serde_json::json;

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(vec![Product {
            title: "Creatine Monohydrate 300g".to_string(),
            description: "Micronized creatine".to_string(),
            price: 19.90,
            handle: "creatine-monohydrate-300g".to_string(),
            tags: vec!["supplements".to_string()],
        }]))
    }

    fn flow(provider: MockProvider) -> ShoppingAssistantFlow {
        let mut registry = TaskRegistry::new();
        registry.register(task_schema()).unwrap();
        ShoppingAssistantFlow::new(
            Arc::new(registry),
            Arc::new(GenerationClient::new(Box::new(provider))),
            catalog(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_assistant_turn_with_tool_call() {
        let provider = MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("search_products", json!({"query": "creatine"}))),
            ),
            Message::assistant().with_text(
                json!({"reply": "We stock Creatine Monohydrate 300g at 19.90."}).to_string(),
            ),
        ]);

        let response = flow(provider)
            .run(AssistantRequest {
                message: "Do you sell creatine?".to_string(),
                history: vec![],
            })
            .await
            .unwrap();

        assert!(response.reply.contains("Creatine Monohydrate"));
    }

    #[tokio::test]
    async fn test_history_is_part_of_the_request_shape() {
        let provider = MockProvider::new(vec![
            Message::assistant().with_text(json!({"reply": "The 300g tub."}).to_string()),
        ]);

        let response = flow(provider)
            .run(AssistantRequest {
                message: "Which one did you mean?".to_string(),
                history: vec![
                    ConversationTurn {
                        actor: "user".to_string(),
                        text: "Do you sell creatine?".to_string(),
                    },
                    ConversationTurn {
                        actor: "assistant".to_string(),
                        text: "Yes, one option.".to_string(),
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(response.reply, "The 300g tub.");
    }

    #[tokio::test]
    async fn test_invalid_history_actor_rejected() {
        let provider = MockProvider::new(vec![]);
        let err = flow(provider)
            .run(AssistantRequest {
                message: "hi".to_string(),
                history: vec![ConversationTurn {
                    actor: "system".to_string(),
                    text: "not a valid turn".to_string(),
                }],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::Validation(_)));
    }
}
