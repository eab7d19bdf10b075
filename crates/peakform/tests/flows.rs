use anyhow::Result;
use std::sync::Arc;

use peakform::catalog::Catalog;
use peakform::errors::FlowError;
use peakform::flows::{assistant, workout, Flows};
use peakform::models::message::Message;
use peakform::models::tool::ToolCall;
use peakform::providers::base::RawAudio;
use peakform::providers::mock::MockProvider;
use serde_json::json;

fn flows_with(provider: MockProvider) -> Flows {
    Flows::new(Box::new(provider), Arc::new(Catalog::demo())).expect("flows build")
}

#[tokio::test]
async fn test_workout_plan_end_to_end() -> Result<()> {
    let plan = json!({
        "plan_name": "Kickstart",
        "summary": "Three full-body sessions per week.",
        "weekly_schedule": [
            {"day": "Day 1", "focus": "Full body", "exercises": [
                {"name": "Goblet squat", "sets": 3, "reps": "10-12", "rest_seconds": 90}
            ]},
            {"day": "Day 2", "focus": "Full body", "exercises": [
                {"name": "Push-up", "sets": 3, "reps": "AMRAP", "rest_seconds": 60}
            ]},
            {"day": "Day 3", "focus": "Full body", "exercises": [
                {"name": "Romanian deadlift", "sets": 3, "reps": "8-10", "rest_seconds": 120}
            ]}
        ]
    });
    let flows = flows_with(MockProvider::new(vec![
        Message::assistant().with_text(plan.to_string()),
    ]));

    let response = flows
        .workout
        .run(workout::WorkoutPlanRequest {
            goal: "general_fitness".to_string(),
            experience: "beginner".to_string(),
            days_per_week: 3,
            equipment: Some("dumbbells".to_string()),
            notes: None,
        })
        .await?;

    assert_eq!(response.weekly_schedule.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_assistant_searches_the_demo_catalog() -> Result<()> {
    let flows = flows_with(MockProvider::new(vec![
        Message::assistant().with_tool_request(
            "1",
            Ok(ToolCall::new("search_products", json!({"query": "whey"}))),
        ),
        Message::assistant()
            .with_text(json!({"reply": "Whey Protein 900g is in stock at 39.90."}).to_string()),
    ]));

    let response = flows
        .assistant
        .run(assistant::AssistantRequest {
            message: "Looking for a protein powder".to_string(),
            history: vec![],
        })
        .await?;

    assert!(response.reply.contains("Whey Protein 900g"));
    Ok(())
}

#[tokio::test]
async fn test_narration_end_to_end() -> Result<()> {
    let provider = MockProvider::new(vec![]).with_speech(vec![RawAudio {
        data: vec![0; 960],
        mime_type: "audio/pcm;rate=24000".to_string(),
    }]);
    let flows = flows_with(provider);

    let response = flows
        .narration
        .run(peakform::flows::narration::NarrationRequest {
            text: "Day one. Let's get moving.".to_string(),
            voice: Some("nova".to_string()),
        })
        .await?;

    assert!(response.media.starts_with("data:audio/wav;base64,"));
    Ok(())
}

#[tokio::test]
async fn test_generation_failure_is_not_retried() {
    let flows = flows_with(MockProvider::new(vec![]));

    let err = flows
        .review
        .run(peakform::flows::review::AdminReviewRequest {
            content: "Great plan!".to_string(),
            context: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err, FlowError::EmptyGeneration);
}
