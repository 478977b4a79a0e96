//! Task descriptors submitted to a crew and the outputs they produce.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of work handed to the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl TaskDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            context: Map::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }
}

/// Reference to a source consulted by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    pub uri: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

/// Result of one completed task, as passed on to the next task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task: String,
    pub agent_role: String,
    pub description: String,
    pub raw: String,
    pub value: Value,
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<SourceReference>,
}

impl TaskOutput {
    /// Look up a field of the structured value.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }
}
