//! MarketBrief core abstractions built directly on top of `graph_flow`.
//!
//! This crate wires two agents, a Senior Market Research Analyst and a Chief
//! Content Officer, into a sequential research and writing workflow that turns
//! a topic into a single Markdown investment report.

mod agents;
mod config;
mod error;
mod llm;
mod logging;
mod report;
mod security;
mod tasks;
mod telemetry;
mod tools;
mod workflow;

pub use agents::{AgentDescriptor, RESEARCH_TASK_ID, TaskDescriptor, WRITING_TASK_ID};
pub use config::{
    Config, DEFAULT_MODEL, OPENAI_API_KEY_ENV, OPENAI_MODEL_ENV, SERPER_API_KEY_ENV,
};
pub use error::MarketBriefError;
pub use llm::{
    COMPLETION_TEMPERATURE, ChatMessage, Completion, CompletionClient, CompletionError,
    CompletionRequest, DEFAULT_OPENAI_BASE_URL, OpenAiClient, Role, TokenUsage,
};
pub use logging::{RunLogInput, log_run_completion};
pub use report::{DEFAULT_REPORT_FILENAME, save_report};
pub use security::SecretValue;
pub use tasks::{ResearchTask, WriteReportTask};
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use tools::{
    DEFAULT_SEARCH_BASE_URL, DynToolExecutor, ScrapeTool, SearchHit, SearchTool, StubToolExecutor,
    ToolError, ToolExecutor, ToolRef, WebToolExecutor,
};
pub use workflow::{
    PipelineOptions, RunOutcome, run_market_research, run_market_research_with_report,
};
