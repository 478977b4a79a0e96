use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use graph_flow::{
    Context, ExecutionStatus, FlowRunner, GraphBuilder, GraphError, InMemorySessionStorage,
    NextAction, Session, SessionStorage, Task, TaskResult,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentContext};
use crate::crew::{Crew, CrewOutput, ExecutionEngine, Process};
use crate::error::{CrewFailure, TaskError};
use crate::memory::{DynMemory, MemoryItem};
use crate::metrics::record_stage_metrics;
use crate::task::{TaskDescriptor, TaskOutput};
use crate::trace::{TraceCollector, TraceEvent, TraceStatus};

const RUN_ID_KEY: &str = "crew.run_id";
const OUTPUTS_KEY: &str = "crew.outputs";

const EXCERPT_CHARS: usize = 500;
/// Runs on other topics share task descriptions, so recall reads this many
/// times `recall_limit` before filtering by topic.
const TOPIC_RECALL_WINDOW: usize = 5;

type SharedTrace = Arc<Mutex<TraceCollector>>;

/// One crew task wrapped as a `graph_flow` task.
struct CrewStep {
    descriptor: TaskDescriptor,
    agent: Arc<dyn Agent>,
    memory: Option<DynMemory>,
    recall_limit: usize,
    topic: Option<String>,
    trace: SharedTrace,
    is_last: bool,
}

impl CrewStep {
    async fn recall(&self) -> Vec<MemoryItem> {
        let Some(memory) = &self.memory else {
            return Vec::new();
        };
        if self.recall_limit == 0 {
            return Vec::new();
        }
        let window = match self.topic {
            Some(_) => self.recall_limit.saturating_mul(TOPIC_RECALL_WINDOW),
            None => self.recall_limit,
        };
        match memory.search(&self.descriptor.description, window).await {
            Ok(items) => {
                let mut items: Vec<MemoryItem> = items
                    .into_iter()
                    .filter(|item| same_topic(self.topic.as_deref(), item))
                    .collect();
                items.truncate(self.recall_limit);
                items
            }
            Err(err) => {
                warn!(task = %self.descriptor.name, error = %err, "memory recall failed; continuing without memories");
                Vec::new()
            }
        }
    }

    async fn remember(&self, output: &TaskOutput) {
        let Some(memory) = &self.memory else {
            return;
        };
        let metadata = json!({
            "task": output.task,
            "agent": output.agent_role,
            "expected_output": self.descriptor.expected_output,
            "excerpt": excerpt(&output.raw, EXCERPT_CHARS),
            "topic": self.topic,
        });
        let item = MemoryItem::new(&self.descriptor.description, metadata, output.confidence);
        if let Err(err) = memory.save(item).await {
            warn!(task = %self.descriptor.name, backend = memory.backend(), error = %err, "failed to save long-term memory");
        }
    }
}

#[async_trait]
impl Task for CrewStep {
    fn id(&self) -> &str {
        &self.descriptor.name
    }

    #[instrument(name = "crew.step", skip(self, context), fields(task = %self.descriptor.name, role = %self.agent.role()))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let run_id: String = context.get(RUN_ID_KEY).await.unwrap_or_default();
        let mut outputs: Vec<TaskOutput> = context.get(OUTPUTS_KEY).await.unwrap_or_default();

        let memories = self.recall().await;
        let recalled = memories.len();
        let agent_context = AgentContext::new(run_id, self.descriptor.clone())
            .with_previous(outputs.last().cloned())
            .with_memories(memories);

        info!(description = %self.descriptor.description, recalled, "task started");
        let started = Instant::now();
        let result = self.agent.execute(&agent_context).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                let reason = format!("{err:#}");
                error!(error = %reason, duration_ms, "task failed");
                record_stage_metrics(&self.descriptor.name, "failed", duration_ms, recalled);
                self.trace.lock().await.push(TraceEvent::new(
                    &self.descriptor.name,
                    self.agent.role(),
                    TraceStatus::Failed,
                    excerpt(&reason, 120),
                    duration_ms,
                ));
                return Err(GraphError::TaskExecutionFailed(
                    TaskError::new(&self.descriptor.name, reason).to_string(),
                ));
            }
        };

        let output = result.into_output(&self.descriptor, self.agent.role());
        record_stage_metrics(&self.descriptor.name, "completed", duration_ms, recalled);
        self.remember(&output).await;

        self.trace.lock().await.push(TraceEvent::new(
            &output.task,
            &output.agent_role,
            TraceStatus::Completed,
            excerpt(&output.raw, 120),
            duration_ms,
        ));
        debug!(raw_chars = output.raw.len(), confidence = output.confidence, "task completed");

        let status = format!("{} completed", output.task);
        outputs.push(output);
        context.set(OUTPUTS_KEY, &outputs).await;

        let next = if self.is_last {
            NextAction::End
        } else {
            NextAction::ContinueAndExecute
        };
        Ok(TaskResult::new(Some(status), next))
    }
}

fn same_topic(topic: Option<&str>, item: &MemoryItem) -> bool {
    let Some(topic) = topic else {
        return true;
    };
    item.metadata
        .get("topic")
        .and_then(Value::as_str)
        .is_some_and(|recorded| recorded.trim().eq_ignore_ascii_case(topic))
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let mut cut: String = flattened.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn build_graph(crew: &Crew, trace: &SharedTrace) -> Arc<graph_flow::Graph> {
    let last = crew.tasks.len().saturating_sub(1);
    let steps: Vec<Arc<CrewStep>> = crew
        .tasks
        .iter()
        .enumerate()
        .map(|(idx, assigned)| {
            Arc::new(CrewStep {
                descriptor: assigned.descriptor.clone(),
                agent: assigned.agent.clone(),
                memory: crew.memory.clone(),
                recall_limit: crew.recall_limit,
                topic: crew.topic.clone(),
                trace: trace.clone(),
                is_last: idx == last,
            })
        })
        .collect();

    let mut builder = GraphBuilder::new(&crew.name);
    for step in &steps {
        builder = builder.add_task(step.clone());
    }

    match crew.process {
        Process::Sequential => {
            for pair in steps.windows(2) {
                builder = builder.add_edge(pair[0].id(), pair[1].id());
            }
        }
    }

    let builder = builder.set_start_task(steps[0].id());
    Arc::new(builder.build())
}

/// Executes a crew with `graph_flow`, one task after another, keeping the
/// session in memory for the duration of the run.
#[derive(Debug, Default, Clone)]
pub struct SequentialEngine;

impl SequentialEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionEngine for SequentialEngine {
    async fn kickoff(&self, crew: Crew) -> Result<CrewOutput> {
        crew.validate()?;

        let run_id = Uuid::new_v4().to_string();
        info!(
            crew = %crew.name,
            run_id = %run_id,
            tasks = crew.tasks.len(),
            topic = crew.topic.as_deref().unwrap_or("-"),
            memory = crew.memory.as_ref().map(|m| m.backend()).unwrap_or("disabled"),
            "crew kickoff"
        );

        let trace: SharedTrace = Arc::new(Mutex::new(TraceCollector::new()));
        let graph = build_graph(&crew, &trace);
        let storage = Arc::new(InMemorySessionStorage::new());
        let runner = FlowRunner::new(graph, storage.clone());

        let session = Session::new_from_task(run_id.clone(), &crew.tasks[0].descriptor.name);
        session.context.set(RUN_ID_KEY, run_id.clone()).await;

        storage
            .save(session)
            .await
            .map_err(|err| anyhow!("failed to persist session: {err}"))?;

        loop {
            let failure = match runner.run(&run_id).await {
                Ok(result) => match result.status {
                    ExecutionStatus::Completed => break,
                    ExecutionStatus::WaitingForInput => continue,
                    ExecutionStatus::Error(message) => message,
                },
                Err(err) => format!("graph execution failure: {err}"),
            };
            let trace = trace.lock().await.clone();
            return Err(CrewFailure {
                run_id,
                message: failure,
                trace,
            }
            .into());
        }

        let session = storage
            .get(&run_id)
            .await
            .map_err(|err| anyhow!("failed to reload session: {err}"))?
            .ok_or_else(|| anyhow!("session missing after execution"))?;

        let tasks_output: Vec<TaskOutput> =
            session.context.get(OUTPUTS_KEY).await.unwrap_or_default();
        let trace = trace.lock().await.clone();

        if tasks_output.len() != crew.tasks.len() {
            return Err(anyhow!(
                "crew finished with {} of {} task outputs",
                tasks_output.len(),
                crew.tasks.len()
            ));
        }

        let raw = tasks_output
            .last()
            .map(|output| output.raw.clone())
            .unwrap_or_default();

        info!(run_id = %run_id, "crew finished");

        Ok(CrewOutput {
            run_id,
            raw,
            tasks_output,
            trace,
        })
    }
}
