//! Agent execution context and result contracts.
//!
//! An agent is a persona bound to one or more external capabilities. The
//! execution engine builds an [`AgentContext`] for every task it runs and
//! turns the returned [`AgentResult`] into a [`TaskOutput`].

use serde_json::Value;

use crate::memory::MemoryItem;
use crate::persona::PersonaConfig;
use crate::task::{SourceReference, TaskDescriptor, TaskOutput};

/// Context for one agent execution.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub run_id: String,
    pub task: TaskDescriptor,
    /// Output of the task that ran immediately before this one, if any.
    pub previous: Option<TaskOutput>,
    /// Long-term memories recalled for this task's description.
    pub memories: Vec<MemoryItem>,
}

impl AgentContext {
    pub fn new(run_id: impl Into<String>, task: TaskDescriptor) -> Self {
        Self {
            run_id: run_id.into(),
            task,
            previous: None,
            memories: Vec::new(),
        }
    }

    pub fn with_previous(mut self, previous: Option<TaskOutput>) -> Self {
        self.previous = previous;
        self
    }

    pub fn with_memories(mut self, memories: Vec<MemoryItem>) -> Self {
        self.memories = memories;
        self
    }

    /// Get a value from the task's context mapping
    pub fn get_param(&self, key: &str) -> Option<&Value> {
        self.task.context_value(key)
    }

    /// Get a field from the previous task's structured output
    pub fn previous_field(&self, key: &str) -> Option<&Value> {
        self.previous.as_ref().and_then(|output| output.field(key))
    }
}

/// Result of agent execution
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub raw: String,
    pub value: Value,
    pub sources: Vec<SourceReference>,
    pub confidence: f64,
}

impl AgentResult {
    pub fn new(raw: impl Into<String>, value: Value) -> Self {
        Self {
            raw: raw.into(),
            value,
            sources: Vec::new(),
            confidence: 1.0,
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceReference>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn into_output(self, task: &TaskDescriptor, agent_role: &str) -> TaskOutput {
        TaskOutput {
            task: task.name.clone(),
            agent_role: agent_role.to_string(),
            description: task.description.clone(),
            raw: self.raw,
            value: self.value,
            confidence: self.confidence,
            sources: self.sources,
        }
    }
}

/// Trait for agent implementations
#[async_trait::async_trait]
pub trait Agent: Send + Sync {
    /// Persona bound to this agent
    fn persona(&self) -> &PersonaConfig;

    /// Execute the agent's task
    async fn execute(&self, context: &AgentContext) -> anyhow::Result<AgentResult>;

    fn role(&self) -> &str {
        &self.persona().role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_and_previous_fields_resolve() {
        let task = TaskDescriptor::new("scrape", "Extract", "Text").with_context("urls", json!([]));
        let previous = TaskOutput {
            task: "search".into(),
            agent_role: "Searcher".into(),
            description: "Find".into(),
            raw: "https://a.example".into(),
            value: json!({ "urls": ["https://a.example"] }),
            confidence: 1.0,
            sources: Vec::new(),
        };

        let context = AgentContext::new("run", task).with_previous(Some(previous));
        assert_eq!(context.get_param("urls"), Some(&json!([])));
        assert_eq!(
            context.previous_field("urls"),
            Some(&json!(["https://a.example"]))
        );
        assert!(context.get_param("missing").is_none());
    }

    #[test]
    fn confidence_is_clamped() {
        let result = AgentResult::new("raw", json!({})).with_confidence(1.7);
        assert_eq!(result.confidence, 1.0);
    }
}
