use std::collections::HashMap;

use crate::errors::{FlowError, FlowResult};
use crate::schema::Shape;

/// A generation task: its name plus the input and output shapes every
/// request and response must satisfy. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSchema {
    pub name: String,
    pub input: Shape,
    pub output: Shape,
}

impl TaskSchema {
    pub fn new<N: Into<String>>(name: N, input: Shape, output: Shape) -> Self {
        Self {
            name: name.into(),
            input,
            output,
        }
    }
}

/// Process-wide set of task schemas. Built once at startup and shared by
/// `Arc` into each flow, so concurrent reads need no synchronization.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskSchema>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    pub fn register(&mut self, task: TaskSchema) -> FlowResult<()> {
        if self.tasks.contains_key(&task.name) {
            return Err(FlowError::DuplicateTask(task.name));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> FlowResult<&TaskSchema> {
        self.tasks
            .get(name)
            .ok_or_else(|| FlowError::UnknownTask(name.to_string()))
    }

    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};

    fn sample_task(name: &str) -> TaskSchema {
        let input = Shape::new().field(Field::required("topic", "", FieldType::string()));
        let output = Shape::new().field(Field::required("title", "", FieldType::string()));
        TaskSchema::new(name, input, output)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TaskRegistry::new();
        registry.register(sample_task("blog_article")).unwrap();

        let task = registry.lookup("blog_article").unwrap();
        assert_eq!(task.name, "blog_article");
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = TaskRegistry::new();
        registry.register(sample_task("recipe")).unwrap();

        let err = registry.register(sample_task("recipe")).unwrap_err();
        assert_eq!(err, FlowError::DuplicateTask("recipe".to_string()));
    }

    #[test]
    fn test_unknown_task() {
        let registry = TaskRegistry::new();
        let err = registry.lookup("nope").unwrap_err();
        assert_eq!(err, FlowError::UnknownTask("nope".to_string()));
    }
}
