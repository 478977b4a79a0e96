//! Grouping of agents and tasks for one execution run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProductResearchError;
use crate::agent::Agent;
use crate::memory::DynMemory;
use crate::task::{TaskDescriptor, TaskOutput};
use crate::trace::TraceCollector;

const DEFAULT_RECALL_LIMIT: usize = 3;

/// How the engine schedules the crew's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    /// One task at a time, in declaration order, each seeing the previous output.
    #[default]
    Sequential,
}

/// A task descriptor together with the agent responsible for it.
#[derive(Clone)]
pub struct AssignedTask {
    pub descriptor: TaskDescriptor,
    pub agent: Arc<dyn Agent>,
}

impl fmt::Debug for AssignedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssignedTask")
            .field("descriptor", &self.descriptor)
            .field("agent", &self.agent.role())
            .finish()
    }
}

#[derive(Clone)]
pub struct Crew {
    pub name: String,
    pub agents: Vec<Arc<dyn Agent>>,
    pub tasks: Vec<AssignedTask>,
    pub process: Process,
    pub memory: Option<DynMemory>,
    pub recall_limit: usize,
    /// Subject of the run. When set, memories are tagged with it and only
    /// memories with the same topic are recalled.
    pub topic: Option<String>,
}

impl Crew {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agents: Vec::new(),
            tasks: Vec::new(),
            process: Process::Sequential,
            memory: None,
            recall_limit: DEFAULT_RECALL_LIMIT,
            topic: None,
        }
    }

    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_task(mut self, descriptor: TaskDescriptor, agent: Arc<dyn Agent>) -> Self {
        self.tasks.push(AssignedTask { descriptor, agent });
        self
    }

    pub fn with_process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    pub fn with_memory(mut self, memory: DynMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_recall_limit(mut self, recall_limit: usize) -> Self {
        self.recall_limit = recall_limit;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into().trim().to_string();
        self.topic = (!topic.is_empty()).then_some(topic);
        self
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &TaskDescriptor> {
        self.tasks.iter().map(|task| &task.descriptor)
    }

    /// Check the crew can be executed: it has tasks, task names are unique,
    /// and every task is assigned to one of the crew's agents.
    pub fn validate(&self) -> Result<(), ProductResearchError> {
        if self.tasks.is_empty() {
            return Err(ProductResearchError::InvalidCrew(format!(
                "crew `{}` has no tasks",
                self.name
            )));
        }

        let mut names = HashSet::new();
        for task in &self.tasks {
            if task.descriptor.name.trim().is_empty() {
                return Err(ProductResearchError::InvalidCrew(
                    "task names must not be empty".into(),
                ));
            }
            if !names.insert(task.descriptor.name.as_str()) {
                return Err(ProductResearchError::InvalidCrew(format!(
                    "duplicate task name `{}`",
                    task.descriptor.name
                )));
            }
        }

        let roles: HashSet<&str> = self.agents.iter().map(|agent| agent.role()).collect();
        for task in &self.tasks {
            if !roles.contains(task.agent.role()) {
                return Err(ProductResearchError::InvalidCrew(format!(
                    "task `{}` is assigned to `{}`, which is not a member of crew `{}`",
                    task.descriptor.name,
                    task.agent.role(),
                    self.name
                )));
            }
        }

        Ok(())
    }
}

/// Everything a crew run produced.
#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub run_id: String,
    /// Raw output of the last task.
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    pub trace: TraceCollector,
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Runs a crew to completion.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn kickoff(&self, crew: Crew) -> anyhow::Result<CrewOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentContext, AgentResult};
    use crate::persona::PersonaConfig;

    struct NamedAgent(PersonaConfig);

    #[async_trait]
    impl Agent for NamedAgent {
        fn persona(&self) -> &PersonaConfig {
            &self.0
        }

        async fn execute(&self, _context: &AgentContext) -> anyhow::Result<AgentResult> {
            Ok(AgentResult::new("done", serde_json::Value::Null))
        }
    }

    fn agent(role: &str) -> Arc<dyn Agent> {
        Arc::new(NamedAgent(PersonaConfig::new(role, "goal", "backstory")))
    }

    #[test]
    fn empty_crew_is_invalid() {
        let err = Crew::new("empty").with_agent(agent("a")).validate().unwrap_err();
        assert!(err.to_string().contains("has no tasks"));
    }

    #[test]
    fn task_agent_must_be_member() {
        let member = agent("member");
        let outsider = agent("outsider");
        let crew = Crew::new("crew")
            .with_agent(member.clone())
            .with_task(TaskDescriptor::new("one", "d", "e"), member)
            .with_task(TaskDescriptor::new("two", "d", "e"), outsider);

        let err = crew.validate().unwrap_err();
        assert!(matches!(err, ProductResearchError::InvalidCrew(ref msg) if msg.contains("outsider")));
    }

    #[test]
    fn duplicate_task_names_are_rejected() {
        let member = agent("member");
        let crew = Crew::new("crew")
            .with_agent(member.clone())
            .with_task(TaskDescriptor::new("same", "d", "e"), member.clone())
            .with_task(TaskDescriptor::new("same", "d", "e"), member);

        assert!(crew.validate().is_err());
    }

    #[test]
    fn valid_crew_defaults_to_sequential() {
        let member = agent("member");
        let crew = Crew::new("crew")
            .with_agent(member.clone())
            .with_task(TaskDescriptor::new("one", "d", "e"), member);

        assert!(crew.validate().is_ok());
        assert_eq!(crew.process, Process::Sequential);
        assert_eq!(crew.descriptors().count(), 1);
        assert!(crew.topic.is_none());
    }

    #[test]
    fn blank_topic_is_ignored() {
        assert!(Crew::new("crew").with_topic("  ").topic.is_none());
        assert_eq!(
            Crew::new("crew").with_topic(" Pixel 9 ").topic.as_deref(),
            Some("Pixel 9")
        );
    }
}
