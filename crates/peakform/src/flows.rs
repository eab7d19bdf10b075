//! One orchestrator per generation task. Each flow validates its request
//! against the task's input shape, compiles the task's prompt template,
//! drives the generation client, and enforces any task-specific
//! post-conditions before handing the typed response back.
pub mod article;
pub mod assistant;
pub mod narration;
pub mod recipe;
pub mod review;
pub mod workout;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::Catalog;
use crate::errors::{FlowError, FlowResult};
use crate::generation::GenerationClient;
use crate::providers::base::Provider;
use crate::registry::{TaskRegistry, TaskSchema};

/// Validate a typed request against the task's input shape, returning the
/// coerced field values the prompt template renders from.
pub(crate) fn validate_request<T: Serialize>(task: &TaskSchema, request: &T) -> FlowResult<Value> {
    let value =
        serde_json::to_value(request).map_err(|e| FlowError::Internal(e.to_string()))?;
    task.input.validate(&value).map_err(FlowError::Validation)
}

/// Deserialize a validated output value into the flow's response type.
pub(crate) fn parse_response<T: DeserializeOwned>(value: Value) -> FlowResult<T> {
    serde_json::from_value(value)
        .map_err(|e| FlowError::Internal(format!("validated output failed to deserialize: {e}")))
}

/// Every flow in the system, wired to one provider and one catalog
/// snapshot. Built once at startup; the registries inside are immutable
/// from then on.
pub struct Flows {
    pub workout: workout::WorkoutPlanFlow,
    pub recipe: recipe::RecipeFlow,
    pub article: article::BlogArticleFlow,
    pub review: review::AdminReviewFlow,
    pub assistant: assistant::ShoppingAssistantFlow,
    pub narration: narration::AudioNarrationFlow,
}

impl Flows {
    pub fn new(
        provider: Box<dyn Provider + Send + Sync>,
        catalog: Arc<Catalog>,
    ) -> FlowResult<Self> {
        let mut registry = TaskRegistry::new();
        registry.register(workout::task_schema())?;
        registry.register(recipe::task_schema())?;
        registry.register(article::task_schema())?;
        registry.register(review::task_schema())?;
        registry.register(assistant::task_schema())?;
        registry.register(narration::task_schema())?;
        let registry = Arc::new(registry);

        let client = Arc::new(GenerationClient::new(provider));

        Ok(Self {
            workout: workout::WorkoutPlanFlow::new(registry.clone(), client.clone()),
            recipe: recipe::RecipeFlow::new(registry.clone(), client.clone()),
            article: article::BlogArticleFlow::new(registry.clone(), client.clone()),
            review: review::AdminReviewFlow::new(registry.clone(), client.clone()),
            assistant: assistant::ShoppingAssistantFlow::new(
                registry.clone(),
                client.clone(),
                catalog,
            )?,
            narration: narration::AudioNarrationFlow::new(registry, client),
        })
    }
}
