use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Completed,
    Failed,
}

/// One crew stage as observed by the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub task: String,
    pub role: String,
    pub status: TraceStatus,
    pub message: String,
    pub duration_ms: u64,
    pub timestamp_ms: i64,
}

impl TraceEvent {
    pub fn new(
        task: impl Into<String>,
        role: impl Into<String>,
        status: TraceStatus,
        message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            task: task.into(),
            role: role.into(),
            status,
            message: message.into(),
            duration_ms,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceCollector {
    events: Vec<TraceEvent>,
}

impl TraceCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn from_events(events: Vec<TraceEvent>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn summary(&self) -> TraceSummary {
        TraceSummary::from_events(&self.events)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub index: usize,
    pub task: String,
    pub role: String,
    pub status: TraceStatus,
    pub message: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceSummary {
    pub steps: Vec<TraceStep>,
}

impl TraceSummary {
    pub fn from_events(events: &[TraceEvent]) -> Self {
        let steps = events
            .iter()
            .enumerate()
            .map(|(idx, event)| TraceStep {
                index: idx + 1,
                task: event.task.clone(),
                role: event.role.clone(),
                status: event.status,
                message: event.message.clone(),
                duration_ms: event.duration_ms,
            })
            .collect();
        Self { steps }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|step| step.duration_ms).sum()
    }

    pub fn render_markdown(&self) -> String {
        if self.steps.is_empty() {
            return "No trace events recorded.".to_string();
        }
        let mut output = String::from("### Crew Trace\n");
        for step in &self.steps {
            let marker = match step.status {
                TraceStatus::Completed => "ok",
                TraceStatus::Failed => "FAILED",
            };
            let _ = writeln!(
                output,
                "{}. [{}] {} ({}) -> {} ({} ms)",
                step.index, marker, step.task, step.role, step.message, step.duration_ms
            );
        }
        let _ = writeln!(output, "Total: {} ms", self.total_duration_ms());
        output
    }
}

/// Write the events of one run as pretty JSON to `<dir>/<run_id>.json`.
pub fn persist_trace<P: AsRef<Path>>(
    dir: P,
    run_id: &str,
    events: &[TraceEvent],
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    create_dir_all(dir)
        .with_context(|| format!("failed to create trace directory {}", dir.display()))?;
    let path = dir.join(format!("{run_id}.json"));
    let payload = serde_json::to_vec_pretty(events)?;
    let mut file = File::create(&path)
        .with_context(|| format!("failed to create trace file {}", path.display()))?;
    file.write_all(&payload)
        .with_context(|| format!("failed to write trace file {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_renders_steps_in_order() {
        let mut collector = TraceCollector::new();
        collector.push(TraceEvent::new(
            "search",
            "Product Search Specialist",
            TraceStatus::Completed,
            "3 urls",
            120,
        ));
        collector.push(TraceEvent::new(
            "scrape",
            "Web Scraping Specialist",
            TraceStatus::Failed,
            "no pages fetched",
            30,
        ));

        let markdown = collector.summary().render_markdown();

        assert!(markdown.starts_with("### Crew Trace"));
        assert!(markdown.contains("1. [ok] search (Product Search Specialist)"));
        assert!(markdown.contains("2. [FAILED] scrape"));
        assert!(markdown.contains("Total: 150 ms"));
    }

    #[test]
    fn empty_trace_renders_placeholder() {
        assert_eq!(
            TraceSummary::default().render_markdown(),
            "No trace events recorded."
        );
    }

    #[test]
    fn persist_trace_writes_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let events = vec![TraceEvent::new(
            "analysis",
            "Product Analysis Expert",
            TraceStatus::Completed,
            "summary ready",
            42,
        )];

        let path = persist_trace(dir.path(), "run-1", &events)?;
        assert_eq!(path, dir.path().join("run-1.json"));

        let loaded: Vec<TraceEvent> = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].task, "analysis");
        assert_eq!(loaded[0].status, TraceStatus::Completed);
        Ok(())
    }
}
