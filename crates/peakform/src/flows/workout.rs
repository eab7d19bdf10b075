use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{parse_response, validate_request};
use crate::errors::{FlowError, FlowResult, Violation, Violations};
use crate::generation::GenerationClient;
use crate::prompt_template::render_prompt_file;
use crate::registry::{TaskRegistry, TaskSchema};
use crate::schema::{Field, FieldType, Shape};

pub const TASK_NAME: &str = "workout_plan";

const SYSTEM_PROMPT: &str =
    "You are the PeakForm head coach. You design safe, progressive training programs \
     and answer only with the requested JSON.";
const TEMPLATE: &str = "workout.md";

pub fn task_schema() -> TaskSchema {
    let input = Shape::new()
        .field(Field::required(
            "goal",
            "What the member wants to achieve",
            FieldType::enumeration(["lose_weight", "build_muscle", "endurance", "general_fitness"]),
        ))
        .field(Field::required(
            "experience",
            "Training history of the member",
            FieldType::enumeration(["beginner", "intermediate", "advanced"]),
        ))
        .field(Field::required(
            "days_per_week",
            "How many days per week the member can train",
            FieldType::integer_range(1, 7),
        ))
        .field(
            Field::optional(
                "equipment",
                "Equipment the member has access to",
                FieldType::string_max(200),
            )
            .with_default(Value::String("bodyweight only".to_string())),
        )
        .field(
            Field::optional(
                "notes",
                "Injuries or preferences the plan must respect",
                FieldType::string_max(500),
            )
            .with_default(Value::String("none".to_string())),
        );

    let exercise = Shape::new()
        .field(Field::required("name", "Exercise name", FieldType::string()))
        .field(Field::required("sets", "Working sets", FieldType::integer_range(1, 10)))
        .field(Field::required("reps", "Rep target, e.g. 8-12", FieldType::string()))
        .field(Field::required(
            "rest_seconds",
            "Rest between sets in seconds",
            FieldType::integer_range(0, 600),
        ));
    let day = Shape::new()
        .field(Field::required("day", "Label such as Day 1", FieldType::string()))
        .field(Field::required("focus", "Session focus", FieldType::string()))
        .field(Field::required(
            "exercises",
            "Exercises for the session",
            FieldType::list(FieldType::Object(exercise)),
        ));
    let output = Shape::new()
        .field(Field::required("plan_name", "Display name of the plan", FieldType::string()))
        .field(Field::required(
            "summary",
            "One-paragraph overview of the plan",
            FieldType::string(),
        ))
        .field(Field::required(
            "weekly_schedule",
            "One entry per training day, exactly days_per_week entries",
            FieldType::list(FieldType::Object(day)),
        ));

    TaskSchema::new(TASK_NAME, input, output)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutPlanRequest {
    pub goal: String,
    pub experience: String,
    pub days_per_week: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: i64,
    pub reps: String,
    pub rest_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutDay {
    pub day: String,
    pub focus: String,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutPlanResponse {
    pub plan_name: String,
    pub summary: String,
    pub weekly_schedule: Vec<WorkoutDay>,
}

pub struct WorkoutPlanFlow {
    registry: Arc<TaskRegistry>,
    client: Arc<GenerationClient>,
}

impl WorkoutPlanFlow {
    pub fn new(registry: Arc<TaskRegistry>, client: Arc<GenerationClient>) -> Self {
        Self { registry, client }
    }

    /// Generate a weekly plan. The schedule length must equal the requested
    /// training frequency; a violating answer gets exactly one corrective
    /// re-request before the flow fails.
    pub async fn run(&self, request: WorkoutPlanRequest) -> FlowResult<WorkoutPlanResponse> {
        let task = self.registry.lookup(TASK_NAME)?;
        let fields = validate_request(task, &request)?;
        let prompt = render_prompt_file(TEMPLATE, &fields)?;

        let mut output = self
            .client
            .generate(SYSTEM_PROMPT, &prompt, &task.output, None)
            .await?;

        let requested = request.days_per_week;
        let produced = schedule_len(&output);
        if produced != requested {
            warn!(
                task = TASK_NAME,
                requested, produced, "schedule length mismatch, re-requesting once"
            );
            let corrective = format!(
                "{prompt}\n\nYour previous answer contained {produced} training days. \
                 Answer again with exactly {requested} entries in weekly_schedule."
            );
            output = self
                .client
                .generate(SYSTEM_PROMPT, &corrective, &task.output, None)
                .await?;

            let produced = schedule_len(&output);
            if produced != requested {
                return Err(FlowError::SchemaViolation(Violations(vec![Violation::new(
                    "weekly_schedule",
                    format!("expected exactly {requested} training days, got {produced}"),
                )])));
            }
        }

        parse_response(output)
    }
}

fn schedule_len(output: &Value) -> i64 {
    output["weekly_schedule"]
        .as_array()
        .map(|days| days.len() as i64)
        .unwrap_or(0)
}
