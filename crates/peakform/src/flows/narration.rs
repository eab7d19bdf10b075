use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validate_request;
use crate::audio::wav_data_uri;
use crate::errors::FlowResult;
use crate::generation::GenerationClient;
use crate::prompt_template::render_prompt_file;
use crate::registry::{TaskRegistry, TaskSchema};
use crate::schema::{Field, FieldType, Shape};

pub const TASK_NAME: &str = "audio_narration";

const TEMPLATE: &str = "narration.md";

pub fn task_schema() -> TaskSchema {
    let input = Shape::new()
        .field(Field::required(
            "text",
            "The script to narrate",
            FieldType::string_max(4_000),
        ))
        .field(
            Field::optional(
                "voice",
                "Which synthetic voice reads the script",
                FieldType::enumeration(["alloy", "echo", "nova", "onyx"]),
            )
            .with_default(Value::String("alloy".to_string())),
        );

    let output = Shape::new().field(Field::required(
        "media",
        "The narration as a data:audio/wav;base64 URI",
        FieldType::string(),
    ));

    TaskSchema::new(TASK_NAME, input, output)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationResponse {
    pub media: String,
}

pub struct AudioNarrationFlow {
    registry: Arc<TaskRegistry>,
    client: Arc<GenerationClient>,
}

impl AudioNarrationFlow {
    pub fn new(registry: Arc<TaskRegistry>, client: Arc<GenerationClient>) -> Self {
        Self { registry, client }
    }

    /// Narrate a script. The provider's raw PCM payload is repackaged as a
    /// mono 16-bit WAV data URI; an absent or unrecognizable payload fails
    /// with `InvalidMedia` and nothing partial is ever returned.
    pub async fn run(&self, request: NarrationRequest) -> FlowResult<NarrationResponse> {
        let task = self.registry.lookup(TASK_NAME)?;
        let fields = validate_request(task, &request)?;
        let script = render_prompt_file(TEMPLATE, &fields)?;
        let voice = fields["voice"].as_str().unwrap_or("alloy");

        let audio = self.client.speak(&script, voice).await?;
        let media = wav_data_uri(&audio)?;

        Ok(NarrationResponse { media })
    }
}
