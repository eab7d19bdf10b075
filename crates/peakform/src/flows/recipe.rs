use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_response, validate_request};
use crate::errors::FlowResult;
use crate::generation::GenerationClient;
use crate::prompt_template::render_prompt_file;
use crate::registry::{TaskRegistry, TaskSchema};
use crate::schema::{Field, FieldType, Shape};

pub const TASK_NAME: &str = "recipe";

const SYSTEM_PROMPT: &str =
    "You are the PeakForm nutrition coach. You write practical, macro-aware recipes \
     and answer only with the requested JSON.";
const TEMPLATE: &str = "recipe.md";

pub fn task_schema() -> TaskSchema {
    let input = Shape::new()
        .field(Field::required(
            "meal_type",
            "Which meal the recipe is for",
            FieldType::enumeration(["breakfast", "lunch", "dinner", "snack"]),
        ))
        .field(Field::required(
            "target_calories",
            "Calorie target for one serving",
            FieldType::integer_range(150, 2000),
        ))
        .field(
            Field::optional(
                "dietary_preference",
                "Dietary style to respect, e.g. vegetarian",
                FieldType::string_max(100),
            )
            .with_default(Value::String("none".to_string())),
        )
        .field(
            Field::optional(
                "ingredients_on_hand",
                "Ingredients the member wants to use up",
                FieldType::string_max(500),
            )
            .with_default(Value::String("anything available".to_string())),
        );

    let ingredient = Shape::new()
        .field(Field::required("item", "Ingredient name", FieldType::string()))
        .field(Field::required("quantity", "Amount, e.g. 200 g", FieldType::string()));
    let macros = Shape::new()
        .field(Field::required("protein_g", "Protein per serving", FieldType::integer()))
        .field(Field::required("carbs_g", "Carbohydrates per serving", FieldType::integer()))
        .field(Field::required("fat_g", "Fat per serving", FieldType::integer()));
    let output = Shape::new()
        .field(Field::required("title", "Recipe title", FieldType::string()))
        .field(Field::required("description", "Short appetizing summary", FieldType::string()))
        .field(Field::required("servings", "Number of servings", FieldType::integer_range(1, 12)))
        .field(Field::required(
            "calories_per_serving",
            "Estimated calories for one serving",
            FieldType::integer(),
        ))
        .field(Field::required(
            "ingredients",
            "Everything needed, with quantities",
            FieldType::list(FieldType::Object(ingredient)),
        ))
        .field(Field::required(
            "steps",
            "Preparation steps in order",
            FieldType::list(FieldType::string()),
        ))
        .field(Field::required("macros", "Macro breakdown per serving", FieldType::Object(macros)));

    TaskSchema::new(TASK_NAME, input, output)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRequest {
    pub meal_type: String,
    pub target_calories: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients_on_hand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub item: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Macros {
    pub protein_g: i64,
    pub carbs_g: i64,
    pub fat_g: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub title: String,
    pub description: String,
    pub servings: i64,
    pub calories_per_serving: i64,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub macros: Macros,
}

pub struct RecipeFlow {
    registry: Arc<TaskRegistry>,
    client: Arc<GenerationClient>,
}

impl RecipeFlow {
    pub fn new(registry: Arc<TaskRegistry>, client: Arc<GenerationClient>) -> Self {
        Self { registry, client }
    }

    pub async fn run(&self, request: RecipeRequest) -> FlowResult<RecipeResponse> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FlowError;
    use crate::models::message::Message;
    use crate::providers::mock::MockProvider;
    use serde_json::json;

    fn flow(provider: MockProvider) -> RecipeFlow {
        let mut registry = TaskRegistry::new();
        registry.register(task_schema()).unwrap();
        RecipeFlow::new(
            Arc::new(registry),
            Arc::new(GenerationClient::new(Box::new(provider))),
        )
    }

    fn recipe_json() -> String {
        json!({
            "title": "Protein Overnight Oats",
            "description": "Five-minute prep, fridge does the rest.",
            "servings": 2,
            "calories_per_serving": 420,
            "ingredients": [
                {"item": "rolled oats", "quantity": "100 g"},
                {"item": "whey protein", "quantity": "1 scoop"}
            ],
            "steps": ["Mix everything.", "Refrigerate overnight."],
            "macros": {"protein_g": 32, "carbs_g": 48, "fat_g": 9}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_recipe_generation() {
        let provider = MockProvider::new(vec![Message::assistant().with_text(recipe_json())]);
        let response = flow(provider)
            .run(RecipeRequest {
                meal_type: "breakfast".to_string(),
                target_calories: 450,
                dietary_preference: None,
                ingredients_on_hand: Some("oats".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(response.title, "Protein Overnight Oats");
        assert_eq!(response.macros.protein_g, 32);
        assert_eq!(response.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_meal_type_rejected() {
        let provider = MockProvider::new(vec![Message::assistant().with_text(recipe_json())]);
        let err = flow(provider)
            .run(RecipeRequest {
                meal_type: "midnight_feast".to_string(),
                target_calories: 450,
                dietary_preference: None,
                ingredients_on_hand: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_malformed_output_is_schema_violation() {
        let provider = MockProvider::new(vec![
            Message::assistant().with_text("{\"title\": \"Oats\"}"),
        ]);
        let err = flow(provider)
            .run(RecipeRequest {
                meal_type: "breakfast".to_string(),
                target_calories: 450,
                dietary_preference: None,
                ingredients_on_hand: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::SchemaViolation(_)));
    }
}
