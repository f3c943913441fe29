use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use graph_flow::{
    ExecutionStatus, FlowRunner, GraphBuilder, InMemorySessionStorage, Session, SessionStorage,
    Task,
};
use tracing::info;

use crate::MarketBriefError;
use crate::agents::{AgentDescriptor, TaskDescriptor};
use crate::config::Config;
use crate::llm::{CompletionClient, OpenAiClient};
use crate::report::save_report;
use crate::tasks::{
    KEY_PIPELINE_ERROR, KEY_REPORT, KEY_SOURCES, KEY_TOPIC, ResearchTask, WriteReportTask,
};
use crate::tools::{DynToolExecutor, WebToolExecutor};

/// The two tasks wired into the pipeline graph.
struct PipelineTasks {
    research: Arc<ResearchTask>,
    writer: Arc<WriteReportTask>,
}

fn build_graph(options: &PipelineOptions<'_>) -> (Arc<graph_flow::Graph>, PipelineTasks) {
    let model = options.completions.model_name().to_string();

    let analyst = AgentDescriptor::research_analyst(&model);
    let officer = AgentDescriptor::content_officer(&model);
    let research_brief = TaskDescriptor::research(analyst, options.topic);
    let writing_brief = TaskDescriptor::writing(officer, options.topic, &research_brief);

    let tasks = PipelineTasks {
        research: Arc::new(ResearchTask::new(
            research_brief,
            options.completions.clone(),
            options.tools.clone(),
        )),
        writer: Arc::new(WriteReportTask::new(
            writing_brief,
            options.completions.clone(),
        )),
    };

    let builder = GraphBuilder::new("market_research_pipeline")
        .add_task(tasks.research.clone())
        .add_task(tasks.writer.clone())
        .add_edge(tasks.research.id(), tasks.writer.id())
        .set_start_task(tasks.research.id());

    let graph = Arc::new(builder.build());

    (graph, tasks)
}

fn new_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("session-{}", nanos)
}

/// Options for one market research run.
pub struct PipelineOptions<'a> {
    pub topic: &'a str,
    pub session_id: Option<String>,
    pub completions: Arc<dyn CompletionClient>,
    pub tools: DynToolExecutor,
}

impl<'a> PipelineOptions<'a> {
    pub fn new(
        topic: &'a str,
        completions: Arc<dyn CompletionClient>,
        tools: DynToolExecutor,
    ) -> Self {
        Self {
            topic,
            session_id: None,
            completions,
            tools,
        }
    }

    /// Wire the live OpenAI and Serper backends from configuration.
    pub fn from_config(topic: &'a str, config: &Config) -> Self {
        let completions: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(
            None,
            config.model.clone(),
            config.openai_api_key.clone(),
        ));
        let tools: DynToolExecutor = Arc::new(WebToolExecutor::from_config(config));
        Self::new(topic, completions, tools)
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Everything produced by a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: String,
    pub topic: String,
    pub report_markdown: String,
    pub sources: Vec<String>,
    pub report_path: Option<PathBuf>,
}

/// Run the research and writing tasks end-to-end and return the final report.
pub async fn run_market_research(
    options: PipelineOptions<'_>,
) -> Result<RunOutcome, MarketBriefError> {
    let (graph, tasks) = build_graph(&options);

    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = FlowRunner::new(graph, storage.clone());

    let session_id = options.session_id.clone().unwrap_or_else(new_session_id);
    let session = Session::new_from_task(session_id.clone(), tasks.research.id());

    session
        .context
        .set(KEY_TOPIC, options.topic.to_string())
        .await;

    storage
        .save(session)
        .await
        .map_err(|err| MarketBriefError::Run(format!("failed to persist session: {err}")))?;

    info!(session_id = %session_id, topic = %options.topic, "starting market research run");

    loop {
        let result = runner
            .run(&session_id)
            .await
            .map_err(|err| MarketBriefError::Run(format!("graph execution failure: {err}")))?;

        match result.status {
            ExecutionStatus::Completed => break,
            ExecutionStatus::WaitingForInput => continue,
            ExecutionStatus::Error(message) => return Err(MarketBriefError::Run(message)),
        }
    }

    let session = storage
        .get(&session_id)
        .await
        .map_err(|err| MarketBriefError::Run(format!("failed to reload session: {err}")))?
        .ok_or_else(|| MarketBriefError::Run("session missing after execution".to_string()))?;

    if let Some(stage_error) = session.context.get::<String>(KEY_PIPELINE_ERROR).await {
        return Err(MarketBriefError::Run(stage_error));
    }

    let report_markdown: String = session.context.get(KEY_REPORT).await.ok_or_else(|| {
        MarketBriefError::Run("no report recorded by the writing task".to_string())
    })?;

    let sources: Vec<String> = session.context.get(KEY_SOURCES).await.unwrap_or_default();

    info!(session_id = %session_id, sources = sources.len(), "market research run completed");

    Ok(RunOutcome {
        session_id,
        topic: options.topic.to_string(),
        report_markdown,
        sources,
        report_path: None,
    })
}

/// Run the pipeline and persist the report to `report_path` once it completes.
///
/// Nothing is written when the run fails; an existing file at the path is
/// left untouched.
pub async fn run_market_research_with_report(
    options: PipelineOptions<'_>,
    report_path: impl AsRef<Path>,
) -> Result<RunOutcome, MarketBriefError> {
    let report_path = report_path.as_ref();
    let mut outcome = run_market_research(options).await?;
    save_report(&outcome.report_markdown, report_path)?;
    outcome.report_path = Some(report_path.to_path_buf());
    Ok(outcome)
}
