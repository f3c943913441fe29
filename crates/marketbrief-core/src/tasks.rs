use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use tracing::{debug, error, info, instrument, warn};

use crate::agents::TaskDescriptor;
use crate::llm::{ChatMessage, COMPLETION_TEMPERATURE, CompletionClient, CompletionRequest};
use crate::tools::{DynToolExecutor, SearchHit};

pub(crate) const KEY_TOPIC: &str = "topic";
pub(crate) const KEY_FINDINGS: &str = "research.findings";
pub(crate) const KEY_SOURCES: &str = "research.sources";
pub(crate) const KEY_REPORT: &str = "report.markdown";
pub(crate) const KEY_PIPELINE_ERROR: &str = "pipeline.error";

/// Number of top-ranked hits whose pages are fetched in full.
const SCRAPED_SOURCE_LIMIT: usize = 5;

struct GatheredSource {
    hit: SearchHit,
    excerpt: Option<String>,
}

/// Record a stage failure and stop the graph. The workflow layer turns the
/// recorded error into a run failure after execution completes.
async fn fail_run(context: &Context, stage: &str, message: String) -> TaskResult {
    let detail = format!("{stage}: {message}");
    error!(stage, %message, "pipeline stage failed");
    context.set(KEY_PIPELINE_ERROR, detail.clone()).await;
    TaskResult::new(Some(detail), NextAction::End)
}

/// Runs the Senior Market Research Analyst: search, scrape, then synthesize
/// findings with citations.
pub struct ResearchTask {
    descriptor: TaskDescriptor,
    completions: Arc<dyn CompletionClient>,
    tools: DynToolExecutor,
}

impl ResearchTask {
    pub fn new(
        descriptor: TaskDescriptor,
        completions: Arc<dyn CompletionClient>,
        tools: DynToolExecutor,
    ) -> Self {
        Self {
            descriptor,
            completions,
            tools,
        }
    }
}

#[async_trait]
impl Task for ResearchTask {
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    #[instrument(name = "task.research", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let topic: String = context.get(KEY_TOPIC).await.unwrap_or_default();

        info!(%topic, "research analyst gathering sources");

        let hits = match self.tools.search(&topic).await {
            Ok(hits) => hits,
            Err(err) => {
                return Ok(fail_run(
                    &context,
                    &self.descriptor.id,
                    format!("web search failed: {err}"),
                )
                .await);
            }
        };

        let mut gathered = Vec::with_capacity(hits.len());
        for (rank, hit) in hits.into_iter().enumerate() {
            let excerpt = if rank < SCRAPED_SOURCE_LIMIT {
                match self.tools.scrape(&hit.url).await {
                    Ok(text) => Some(text),
                    Err(err) => {
                        warn!(url = %hit.url, error = %err, "page scrape failed; keeping snippet only");
                        None
                    }
                }
            } else {
                None
            };
            gathered.push(GatheredSource { hit, excerpt });
        }

        let request = CompletionRequest {
            system_prompt: Some(self.descriptor.agent.system_prompt()),
            messages: vec![ChatMessage::user(build_research_prompt(
                &self.descriptor,
                &gathered,
            ))],
            temperature: Some(COMPLETION_TEMPERATURE),
            max_tokens: None,
        };

        let completion = match self.completions.complete(request).await {
            Ok(completion) => completion,
            Err(err) => {
                return Ok(fail_run(
                    &context,
                    &self.descriptor.id,
                    format!("completion failed: {err}"),
                )
                .await);
            }
        };

        let sources: Vec<String> = gathered
            .iter()
            .map(|source| source.hit.url.clone())
            .collect();

        context.set(KEY_FINDINGS, completion.content).await;
        context.set(KEY_SOURCES, &sources).await;

        if let Some(usage) = completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "analyst completion usage"
            );
        }
        debug!(sources = sources.len(), "research task populated context");

        Ok(TaskResult::new(
            Some(format!("Research completed for \"{topic}\"")),
            NextAction::ContinueAndExecute,
        ))
    }
}

/// Runs the Chief Content Officer: turn the analyst's findings into the final
/// Markdown investment report.
pub struct WriteReportTask {
    descriptor: TaskDescriptor,
    completions: Arc<dyn CompletionClient>,
}

impl WriteReportTask {
    pub fn new(descriptor: TaskDescriptor, completions: Arc<dyn CompletionClient>) -> Self {
        Self {
            descriptor,
            completions,
        }
    }
}

#[async_trait]
impl Task for WriteReportTask {
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    #[instrument(name = "task.write", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let findings: String = context.get(KEY_FINDINGS).await.unwrap_or_default();
        if findings.is_empty() {
            return Ok(fail_run(
                &context,
                &self.descriptor.id,
                "no research findings recorded in session context".to_string(),
            )
            .await);
        }

        let sources: Vec<String> = context.get(KEY_SOURCES).await.unwrap_or_default();

        debug!(
            findings_chars = findings.len(),
            sources = sources.len(),
            "content officer drafting report"
        );

        let request = CompletionRequest {
            system_prompt: Some(self.descriptor.agent.system_prompt()),
            messages: vec![ChatMessage::user(build_writing_prompt(
                &self.descriptor,
                &findings,
                &sources,
            ))],
            temperature: Some(COMPLETION_TEMPERATURE),
            max_tokens: None,
        };

        let completion = match self.completions.complete(request).await {
            Ok(completion) => completion,
            Err(err) => {
                return Ok(fail_run(
                    &context,
                    &self.descriptor.id,
                    format!("completion failed: {err}"),
                )
                .await);
            }
        };

        context.set(KEY_REPORT, completion.content.clone()).await;

        info!(chars = completion.content.len(), "report drafted");

        Ok(TaskResult::new(Some(completion.content), NextAction::End))
    }
}

fn build_research_prompt(descriptor: &TaskDescriptor, sources: &[GatheredSource]) -> String {
    let mut prompt = descriptor.description.clone();
    prompt.push_str("\n\nGathered evidence:\n");

    if sources.is_empty() {
        prompt.push_str("\n(no search results were returned for this topic)\n");
    }

    for (index, source) in sources.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] {}\nURL: {}\n",
            index + 1,
            source.hit.title,
            source.hit.url
        ));
        if !source.hit.snippet.is_empty() {
            prompt.push_str(&format!("Snippet: {}\n", source.hit.snippet));
        }
        if let Some(excerpt) = &source.excerpt {
            prompt.push_str(&format!("Extract:\n{excerpt}\n"));
        }
    }

    prompt.push_str(&format!("\nExpected output:\n{}", descriptor.expected_output));
    prompt
}

fn build_writing_prompt(descriptor: &TaskDescriptor, findings: &str, sources: &[String]) -> String {
    let mut prompt = descriptor.description.clone();
    prompt.push_str("\n\nResearch findings provided by the Senior Market Research Analyst:\n\n");
    prompt.push_str(findings);

    if !sources.is_empty() {
        prompt.push_str("\n\nSources consulted:\n");
        for (index, source) in sources.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", index + 1, source));
        }
    }

    prompt.push_str(&format!("\nExpected output:\n{}", descriptor.expected_output));
    prompt
}
