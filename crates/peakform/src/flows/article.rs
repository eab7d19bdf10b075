use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_response, validate_request};
use crate::errors::FlowResult;
use crate::generation::GenerationClient;
use crate::prompt_template::render_prompt_file;
use crate::registry::{TaskRegistry, TaskSchema};
use crate::schema::{Field, FieldType, Shape};

pub const TASK_NAME: &str = "blog_article";

const SYSTEM_PROMPT: &str =
    "You are the PeakForm editorial writer. You write well-structured fitness and \
     nutrition articles and answer only with the requested JSON.";
const TEMPLATE: &str = "article.md";

pub fn task_schema() -> TaskSchema {
    let input = Shape::new()
        .field(Field::required(
            "topic",
            "What the article should cover",
            FieldType::string_max(200),
        ))
        .field(
            Field::optional(
                "tone",
                "Editorial tone of the article",
                FieldType::enumeration(["motivational", "educational", "casual"]),
            )
            .with_default(Value::String("motivational".to_string())),
        )
        .field(
            Field::optional(
                "keywords",
                "Comma-separated keywords to weave in",
                FieldType::string_max(200),
            )
            .with_default(Value::String("".to_string())),
        );

    let output = Shape::new()
        .field(Field::required("title", "Article headline", FieldType::string()))
        .field(Field::required("slug", "URL slug for the article", FieldType::string()))
        .field(Field::required(
            "excerpt",
            "One or two sentences for the article card",
            FieldType::string(),
        ))
        .field(Field::required(
            "body_markdown",
            "Full article body in markdown",
            FieldType::string(),
        ))
        .field(Field::required(
            "tags",
            "Topic tags for the article",
            FieldType::list(FieldType::string()),
        ));

    TaskSchema::new(TASK_NAME, input, output)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogArticleRequest {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogArticleResponse {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub body_markdown: String,
    pub tags: Vec<String>,
}

pub struct BlogArticleFlow {
    registry: Arc<TaskRegistry>,
    client: Arc<GenerationClient>,
}

impl BlogArticleFlow {
    pub fn new(registry: Arc<TaskRegistry>, client: Arc<GenerationClient>) -> Self {
        Self { registry, client }
    }

    pub async fn run(&self, request: BlogArticleRequest) -> FlowResult<BlogArticleResponse> {
        let task = self.registry.lookup(TASK_NAME)?;
        let fields = validate_request(task, &request)?;
        let prompt = render_prompt_file(TEMPLATE, &fields)?;

        let output = self
            .client
            .generate(SYSTEM_PROMPT, &prompt, &task.output, None)
            .await?;

        parse_response(output)
    }
}
