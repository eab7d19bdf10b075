use serde_json::{json, Map, Value};

use crate::errors::{Violation, Violations};

/// Structural description of a single value.
///
/// Shapes are declared once at startup and double as both the validator for
/// request/response values and the source for the JSON Schema rendering that
/// providers consume.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String { max_len: Option<usize> },
    Integer { min: Option<i64>, max: Option<i64> },
    Number,
    Boolean,
    Enum(Vec<String>),
    List(Box<FieldType>),
    Object(Shape),
}

impl FieldType {
    pub fn string() -> Self {
        FieldType::String { max_len: None }
    }

    pub fn string_max(max_len: usize) -> Self {
        FieldType::String {
            max_len: Some(max_len),
        }
    }

    pub fn integer() -> Self {
        FieldType::Integer {
            min: None,
            max: None,
        }
    }

    pub fn integer_range(min: i64, max: i64) -> Self {
        FieldType::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum(values.into_iter().map(Into::into).collect())
    }

    pub fn list(item: FieldType) -> Self {
        FieldType::List(Box::new(item))
    }

    /// Check `value` against this type, collecting violations under `path`.
    /// Returns the coerced value; when a violation is recorded the original
    /// value is passed through unchanged.
    fn check(&self, path: &str, value: &Value, out: &mut Vec<Violation>) -> Value {
        match self {
            FieldType::String { max_len } => match value.as_str() {
                Some(s) => {
                    if let Some(max) = max_len {
                        if s.chars().count() > *max {
                            out.push(Violation::new(
                                path,
                                format!("string exceeds maximum length of {max}"),
                            ));
                        }
                    }
                    value.clone()
                }
                None => {
                    out.push(Violation::new(path, "expected a string"));
                    value.clone()
                }
            },
            FieldType::Integer { min, max } => match as_integer(value) {
                Some(n) => {
                    if let Some(min) = min {
                        if n < *min {
                            out.push(Violation::new(path, format!("must be at least {min}")));
                        }
                    }
                    if let Some(max) = max {
                        if n > *max {
                            out.push(Violation::new(path, format!("must be at most {max}")));
                        }
                    }
                    json!(n)
                }
                None => {
                    out.push(Violation::new(path, "expected an integer"));
                    value.clone()
                }
            },
            FieldType::Number => {
                if value.as_f64().is_none() {
                    out.push(Violation::new(path, "expected a number"));
                }
                value.clone()
            }
            FieldType::Boolean => {
                if value.as_bool().is_none() {
                    out.push(Violation::new(path, "expected a boolean"));
                }
                value.clone()
            }
            FieldType::Enum(values) => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => value.clone(),
                Some(s) => {
                    out.push(Violation::new(
                        path,
                        format!("`{s}` is not one of [{}]", values.join(", ")),
                    ));
                    value.clone()
                }
                None => {
                    out.push(Violation::new(path, "expected an enum string"));
                    value.clone()
                }
            },
            FieldType::List(item) => match value.as_array() {
                Some(entries) => {
                    let coerced: Vec<Value> = entries
                        .iter()
                        .enumerate()
                        .map(|(i, entry)| item.check(&format!("{path}[{i}]"), entry, out))
                        .collect();
                    Value::Array(coerced)
                }
                None => {
                    out.push(Violation::new(path, "expected a list"));
                    value.clone()
                }
            },
            FieldType::Object(shape) => shape.check(path, value, out),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::String { max_len } => {
                let mut schema = json!({"type": "string"});
                if let Some(max) = max_len {
                    schema["maxLength"] = json!(max);
                }
                schema
            }
            FieldType::Integer { min, max } => {
                let mut schema = json!({"type": "integer"});
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            FieldType::Number => json!({"type": "number"}),
            FieldType::Boolean => json!({"type": "boolean"}),
            FieldType::Enum(values) => json!({"type": "string", "enum": values}),
            FieldType::List(item) => json!({"type": "array", "items": item.to_json_schema()}),
            FieldType::Object(shape) => shape.to_json_schema(),
        }
    }
}

/// A named, typed member of a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub description: String,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<Value>,
}

impl Field {
    pub fn required<N, D>(name: N, description: D, ty: FieldType) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            ty,
            required: true,
            default: None,
        }
    }

    pub fn optional<N, D>(name: N, description: D, ty: FieldType) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            ty,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// An ordered set of fields describing a request or response object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    fields: Vec<Field>,
}

impl Shape {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Validate `value` against this shape.
    ///
    /// On success returns the coerced value: fields in declaration order,
    /// defaults filled in for absent optional fields, integral floats
    /// normalized to integers. Unknown fields are violations, so typos fail
    /// loudly instead of being dropped. Validating an already-valid value is
    /// idempotent.
    pub fn validate(&self, value: &Value) -> Result<Value, Violations> {
        let mut violations = Vec::new();
        let coerced = self.check("", value, &mut violations);
        if violations.is_empty() {
            Ok(coerced)
        } else {
            Err(Violations(violations))
        }
    }

    fn check(&self, path: &str, value: &Value, out: &mut Vec<Violation>) -> Value {
        let object = match value.as_object() {
            Some(object) => object,
            None => {
                out.push(Violation::new(
                    if path.is_empty() { "." } else { path },
                    "expected an object",
                ));
                return value.clone();
            }
        };

        let mut coerced = Map::new();
        for field in &self.fields {
            let field_path = join_path(path, &field.name);
            match object.get(&field.name) {
                Some(Value::Null) | None => {
                    if field.required {
                        out.push(Violation::new(&field_path, "required field is missing"));
                    } else if let Some(default) = &field.default {
                        coerced.insert(field.name.clone(), default.clone());
                    }
                }
                Some(present) => {
                    let checked = field.ty.check(&field_path, present, out);
                    coerced.insert(field.name.clone(), checked);
                }
            }
        }

        for name in object.keys() {
            if !self.fields.iter().any(|f| &f.name == name) {
                out.push(Violation::new(join_path(path, name), "unknown field"));
            }
        }

        Value::Object(coerced)
    }

    /// Render the shape into the JSON Schema dialect providers consume.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut schema = field.ty.to_json_schema();
            if !field.description.is_empty() {
                schema["description"] = json!(field.description);
            }
            if let Some(default) = &field.default {
                schema["default"] = default.clone();
            }
            properties.insert(field.name.clone(), schema);
            if field.required {
                required.push(field.name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
