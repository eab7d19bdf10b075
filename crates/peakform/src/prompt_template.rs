use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Tera};

use crate::errors::{FlowError, FlowResult};

/// Get the path to the prompts directory
fn prompts_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("prompts")
}

/// Render a fixed template against the task's request fields.
///
/// Templates are plain tera: named placeholders plus `{% for %}` expansion
/// for list-typed fields (conversation history renders in original order).
/// A placeholder with no value is an error, though requests are validated
/// against the input shape first so this should never fire on the normal
/// path.
pub fn render_prompt<T: Serialize>(template: &str, context_data: &T) -> FlowResult<String> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)
        .map_err(|e| FlowError::Internal(format!("invalid prompt template: {e}")))?;
    let context = Context::from_serialize(context_data)
        .map_err(|e| FlowError::Internal(format!("prompt context is not serializable: {e}")))?;
    tera.render("inline_template", &context)
        .map_err(|e| FlowError::MissingPlaceholderValue(render_error_detail(e)))
}

/// Render one of the task templates shipped under `src/prompts/`.
pub fn render_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> FlowResult<String> {
    let template_path = template_file.into();
    let file_path = if !template_path.exists() {
        prompts_dir().join(template_path)
    } else {
        template_path
    };

    let template_content = fs::read_to_string(&file_path).map_err(|e| {
        FlowError::Internal(format!(
            "failed to read template `{}`: {e}",
            file_path.display()
        ))
    })?;
    render_prompt(&template_content, context_data)
}

// tera reports the missing variable on the error source, not the top-level
// message; walk the chain so the caller sees which placeholder failed.
fn render_error_detail(error: tera::Error) -> String {
    let mut detail = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        detail = format!("{detail}: {cause}");
        source = cause.source();
    }
    detail
}
