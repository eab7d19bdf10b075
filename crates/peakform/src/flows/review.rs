use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_response, validate_request};
use crate::errors::{FlowError, FlowResult};
use crate::generation::GenerationClient;
use crate::prompt_template::render_prompt_file;
use crate::registry::{TaskRegistry, TaskSchema};
use crate::schema::{Field, FieldType, Shape};

pub const TASK_NAME: &str = "admin_review";

pub const RECOMMEND_APPROVE: &str = "Approve";
pub const RECOMMEND_DENY: &str = "Deny";

const SYSTEM_PROMPT: &str =
    "You are the PeakForm content moderator. You judge member-submitted content \
     against the site guidelines and answer only with the requested JSON.";
const TEMPLATE: &str = "review.md";

pub fn task_schema() -> TaskSchema {
    let input = Shape::new()
        .field(Field::required(
            "content",
            "The member-submitted content under review",
            FieldType::string_max(10_000),
        ))
        .field(
            Field::optional(
                "context",
                "Where the content was submitted, e.g. testimonial page",
                FieldType::string_max(500),
            )
            .with_default(Value::String("general submission".to_string())),
        );

    let output = Shape::new()
        .field(Field::required(
            "recommendation",
            "The moderation verdict",
            FieldType::enumeration([RECOMMEND_APPROVE, RECOMMEND_DENY]),
        ))
        .field(Field::required(
            "justification",
            "Why the verdict was reached",
            FieldType::string(),
        ));

    TaskSchema::new(TASK_NAME, input, output)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminReviewRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminReviewResponse {
    pub recommendation: String,
    pub justification: String,
}

pub struct AdminReviewFlow {
    registry: Arc<TaskRegistry>,
    client: Arc<GenerationClient>,
}

impl AdminReviewFlow {
    pub fn new(registry: Arc<TaskRegistry>, client: Arc<GenerationClient>) -> Self {
        Self { registry, client }
    }

    /// Review a submission. The verdict set is closed: anything outside
    /// Approve/Deny fails, it is never coerced to a default.
    pub async fn run(&self, request: AdminReviewRequest) -> FlowResult<AdminReviewResponse> {
        let task = self.registry.lookup(TASK_NAME)?;
        let fields = validate_request(task, &request)?;
        let prompt = render_prompt_file(TEMPLATE, &fields)?;

        let output = self
            .client
            .generate(SYSTEM_PROMPT, &prompt, &task.output, None)
            .await?;

        // A moderation verdict gates user-visible content, so the answer is
        // validated a second time at this boundary rather than trusting the
        // client's pass alone.
        let output = task
            .output
            .validate(&output)
            .map_err(FlowError::SchemaViolation)?;

        parse_response(output)
    }
}
