use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use peakform::errors::FlowError;
use peakform::flows::{article, assistant, narration, recipe, review, workout};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/workout-plan", post(generate_workout_plan))
        .route("/api/recipe", post(generate_recipe))
        .route("/api/blog-article", post(generate_blog_article))
        .route("/api/admin-review", post(review_submission))
        .route("/api/assistant", post(assistant_reply))
        .route("/api/narration", post(narrate))
        .with_state(state)
}

/// Error body for every flow endpoint. Caller mistakes come back verbatim
/// as 400s; generation-side failures are logged with a reference id and the
/// caller only sees a generic message.
pub struct ApiError(FlowError);

impl From<FlowError> for ApiError {
    fn from(error: FlowError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_caller_fault() {
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            let reference = Uuid::new_v4();
            error!(%reference, error = %self.0, "flow failed");
            let status = match self.0 {
                FlowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                format!("Content generation failed, please try again (ref {reference})"),
            )
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn generate_workout_plan(
    State(state): State<AppState>,
    Json(request): Json<workout::WorkoutPlanRequest>,
) -> Result<Json<workout::WorkoutPlanResponse>, ApiError> {
    Ok(Json(state.flows.workout.run(request).await?))
}

async fn generate_recipe(
    State(state): State<AppState>,
    Json(request): Json<recipe::RecipeRequest>,
) -> Result<Json<recipe::RecipeResponse>, ApiError> {
    Ok(Json(state.flows.recipe.run(request).await?))
}

async fn generate_blog_article(
    State(state): State<AppState>,
    Json(request): Json<article::BlogArticleRequest>,
) -> Result<Json<article::BlogArticleResponse>, ApiError> {
    Ok(Json(state.flows.article.run(request).await?))
}

async fn review_submission(
    State(state): State<AppState>,
    Json(request): Json<review::AdminReviewRequest>,
) -> Result<Json<review::AdminReviewResponse>, ApiError> {
    Ok(Json(state.flows.review.run(request).await?))
}

async fn assistant_reply(
    State(state): State<AppState>,
    Json(request): Json<assistant::AssistantRequest>,
) -> Result<Json<assistant::AssistantResponse>, ApiError> {
    Ok(Json(state.flows.assistant.run(request).await?))
}

async fn narrate(
    State(state): State<AppState>,
    Json(request): Json<narration::NarrationRequest>,
) -> Result<Json<narration::NarrationResponse>, ApiError> {
    Ok(Json(state.flows.narration.run(request).await?))
}
