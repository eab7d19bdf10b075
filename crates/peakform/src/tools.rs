use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::catalog::Catalog;
use crate::errors::{FlowError, FlowResult};
use crate::models::tool::{Tool, ToolCall};
use crate::schema::{Field, FieldType, Shape};

pub const SEARCH_PRODUCTS: &str = "search_products";

type ToolHandler = Box<dyn Fn(Value) -> FlowResult<Value> + Send + Sync>;

/// A callable function the model may invoke mid-generation.
///
/// The handler only ever sees arguments that validated against the input
/// shape, and its result is validated against the output shape before the
/// model sees it.
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input: Shape,
    pub output: Shape,
    handler: ToolHandler,
}

impl ToolDefinition {
    pub fn new<N, D>(name: N, description: D, input: Shape, output: Shape, handler: ToolHandler) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input,
            output,
            handler,
        }
    }

    /// The provider-facing rendering of this tool
    pub fn provider_spec(&self) -> Tool {
        Tool::new(
            self.name.clone(),
            self.description.clone(),
            self.input.to_json_schema(),
        )
    }
}

/// The set of tools available to a task's generation run. Write-once at
/// startup, like the task registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn define(&mut self, tool: ToolDefinition) -> FlowResult<()> {
        if self.tools.contains_key(&tool.name) {
            return Err(FlowError::DuplicateTool(tool.name));
        }
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Provider specs for every defined tool, in name order
    pub fn provider_specs(&self) -> Vec<Tool> {
        let mut specs: Vec<Tool> = self.tools.values().map(ToolDefinition::provider_spec).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Validate and execute a tool call from the model.
    ///
    /// Every failure comes back as an `Err` the generation client hands to
    /// the model as a tool-error result, so the model can recover
    /// conversationally.
    pub fn dispatch(&self, call: &ToolCall) -> FlowResult<Value> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| FlowError::ToolNotFound(call.name.clone()))?;

        let arguments = tool
            .input
            .validate(&call.arguments)
            .map_err(FlowError::Validation)?;

        let result = (tool.handler)(arguments).map_err(|e| FlowError::ToolExecution {
            name: tool.name.clone(),
            message: e.to_string(),
        })?;

        tool.output
            .validate(&result)
            .map_err(|violations| FlowError::ToolExecution {
                name: tool.name.clone(),
                message: format!("result outside the declared output shape: {violations}"),
            })
    }
}

/// Catalog search, the one concrete tool in this system. Used by the
/// shopping assistant flow.
pub fn search_products_tool(catalog: Arc<Catalog>) -> ToolDefinition {
    let input = Shape::new().field(Field::required(
        "query",
        "Free-text query matched against product titles, descriptions and tags",
        FieldType::string_max(200),
    ));

    let hit = Shape::new()
        .field(Field::required("title", "Product title", FieldType::string()))
        .field(Field::required(
            "description",
            "Product description",
            FieldType::string(),
        ))
        .field(Field::required("price", "Price in store currency", FieldType::Number))
        .field(Field::required("handle", "URL handle of the product page", FieldType::string()));
    let output = Shape::new().field(Field::required(
        "results",
        "Matching products, most relevant first",
        FieldType::list(FieldType::Object(hit)),
    ));

    ToolDefinition::new(
        SEARCH_PRODUCTS,
        "Search the PeakForm store catalog for products matching a free-text query",
        input,
        output,
        Box::new(move |arguments| {
            let query = arguments
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let results = catalog.search(query);
            serde_json::to_value(json!({ "results": results }))
                .map_err(|e| FlowError::Internal(e.to_string()))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;

    fn echo_tool() -> ToolDefinition {
        let input = Shape::new().field(Field::required("message", "", FieldType::string_max(50)));
        let output = Shape::new().field(Field::required("echo", "", FieldType::string()));
        ToolDefinition::new(
            "echo",
            "Echoes back the input",
            input,
            output,
            Box::new(|arguments| Ok(json!({"echo": arguments["message"]}))),
        )
    }

    fn registry_with(tool: ToolDefinition) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.define(tool).unwrap();
        registry
    }

    #[test]
    fn test_dispatch_validates_and_executes() {
        let registry = registry_with(echo_tool());
        let result = registry
            .dispatch(&ToolCall::new("echo", json!({"message": "hello"})))
            .unwrap();
        assert_eq!(result, json!({"echo": "hello"}));
    }

    #[test]
    fn test_dispatch_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .dispatch(&ToolCall::new("nope", json!({})))
            .unwrap_err();
        assert_eq!(err, FlowError::ToolNotFound("nope".to_string()));
    }

    #[test]
    fn test_dispatch_rejects_invalid_arguments() {
        let registry = registry_with(echo_tool());
        let err = registry
            .dispatch(&ToolCall::new("echo", json!({"message": 42})))
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));
    }

    #[test]
    fn test_dispatch_wraps_handler_failure() {
        let input = Shape::new();
        let output = Shape::new();
        let failing = ToolDefinition::new(
            "broken",
            "Always fails",
            input,
            output,
            Box::new(|_| Err(FlowError::Internal("boom".to_string()))),
        );
        let registry = registry_with(failing);

        let err = registry
            .dispatch(&ToolCall::new("broken", json!({})))
            .unwrap_err();
        match err {
            FlowError::ToolExecution { name, message } => {
                assert_eq!(name, "broken");
                assert!(message.contains("boom"));
            }
            other => panic!("expected ToolExecution, got {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_rejects_result_outside_output_shape() {
        let input = Shape::new();
        let output = Shape::new().field(Field::required("echo", "", FieldType::string()));
        let lying = ToolDefinition::new(
            "lying",
            "Returns the wrong shape",
            input,
            output,
            Box::new(|_| Ok(json!({"echo": 42}))),
        );
        let registry = registry_with(lying);

        let err = registry
            .dispatch(&ToolCall::new("lying", json!({})))
            .unwrap_err();
        assert!(matches!(err, FlowError::ToolExecution { .. }));
    }

    #[test]
    fn test_duplicate_definition() {
        let mut registry = ToolRegistry::new();
        registry.define(echo_tool()).unwrap();
        let err = registry.define(echo_tool()).unwrap_err();
        assert_eq!(err, FlowError::DuplicateTool("echo".to_string()));
    }

    #[test]
    fn test_search_products_projection() {
        let catalog = Arc::new(Catalog::new(vec![Product {
            title: "Proteína Whey 900g".to_string(),
            description: "Concentrado de suero de leche".to_string(),
            price: 39.90,
            handle: "proteina-whey-900g".to_string(),
            tags: vec!["suplementos".to_string()],
        }]));
        let registry = registry_with(search_products_tool(catalog));

        let result = registry
            .dispatch(&ToolCall::new(SEARCH_PRODUCTS, json!({"query": "proteína"})))
            .unwrap();

        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0],
            json!({
                "title": "Proteína Whey 900g",
                "description": "Concentrado de suero de leche",
                "price": 39.90,
                "handle": "proteina-whey-900g",
            })
        );
    }
}
