use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failed check from shape validation, addressed by field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violations(pub Vec<Violation>);

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum FlowError {
    #[error("task `{0}` is already registered")]
    DuplicateTask(String),

    #[error("unknown task `{0}`")]
    UnknownTask(String),

    #[error("tool `{0}` is already defined")]
    DuplicateTool(String),

    #[error("request does not satisfy the input shape: {0}")]
    Validation(Violations),

    #[error("prompt template references a value that is not present: {0}")]
    MissingPlaceholderValue(String),

    #[error("the model returned no output")]
    EmptyGeneration,

    #[error("model output does not satisfy the output shape: {0}")]
    SchemaViolation(Violations),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool `{name}` failed: {message}")]
    ToolExecution { name: String, message: String },

    #[error("audio payload is missing or not recognizable: {0}")]
    InvalidMedia(String),

    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Failures the caller can fix by changing the request.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            FlowError::Validation(_) | FlowError::UnknownTask(_)
        )
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
