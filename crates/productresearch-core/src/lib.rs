//! ProductResearch core abstractions built directly on top of `graph_flow`.
//!
//! This crate provides the agent contract, task descriptors, crews, a
//! sequential execution engine, long-term memory stores and the ambient
//! configuration/telemetry helpers shared by the agents and the CLI.

mod agent;
mod config;
mod crew;
mod error;
pub mod memory;
pub mod metrics;
mod persona;
mod security;
mod task;
mod telemetry;
mod trace;
mod workflow;

pub use agent::{Agent, AgentContext, AgentResult};
pub use config::{
    Config, ConfigLoader, LlmConfig, MemoryConfig, MySqlSettings, ScrapeConfig, SearchConfig,
    Secrets,
};
pub use crew::{AssignedTask, Crew, CrewOutput, ExecutionEngine, Process};
pub use error::{CrewFailure, ProductResearchError, TaskError};
pub use memory::{DynMemory, InMemoryStore, LongTermMemory, MemoryItem};
pub use persona::PersonaConfig;
pub use security::{SecretValue, require_env, require_with};
pub use task::{SourceReference, TaskDescriptor, TaskOutput};
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use trace::{TraceCollector, TraceEvent, TraceStatus, TraceStep, TraceSummary, persist_trace};
pub use workflow::SequentialEngine;
