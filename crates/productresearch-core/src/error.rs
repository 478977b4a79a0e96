use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::trace::TraceCollector;

/// Core error type for ProductResearch.
#[derive(Debug, Error)]
pub enum ProductResearchError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable {0}; export it before starting a research run")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid crew: {0}")]
    InvalidCrew(String),
    #[error("stage `{stage}` failed: {reason}")]
    StageFailed { stage: String, reason: String },
    #[error("memory store error: {0}")]
    Memory(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProductResearchError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }

    pub fn stage(stage: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            reason: reason.to_string(),
        }
    }
}

/// Error representing a single task failure inside a crew run.
#[derive(Debug, Clone)]
pub struct TaskError {
    pub task: String,
    pub reason: String,
}

impl TaskError {
    pub fn new(task: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task `{}` failed: {}", self.task, self.reason)
    }
}

impl std::error::Error for TaskError {}

/// A crew run that stopped early, with the trace of the stages that ran.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CrewFailure {
    pub run_id: String,
    pub message: String,
    pub trace: TraceCollector,
}
