use anyhow::Result;
use clap::Parser;
use marketbrief_core::{
    Config, DEFAULT_REPORT_FILENAME, PipelineOptions, RunLogInput, TelemetryOptions,
    init_telemetry, log_run_completion, run_market_research_with_report,
};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "marketbrief",
    version,
    about = "Autonomous market research reports"
)]
struct Cli {
    /// Topic or company to research.
    #[arg(long, default_value = "Applications of Generative AI in Big Data Analytics")]
    topic: String,

    /// Where to write the Markdown report.
    #[arg(long, default_value = DEFAULT_REPORT_FILENAME)]
    output: PathBuf,

    /// Optional session ID for the run.
    #[arg(long)]
    session: Option<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_telemetry(TelemetryOptions::default())?;

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let rt = Runtime::new()?;
    rt.block_on(async move { run_command(cli, &config).await })?;

    Ok(())
}

async fn run_command(cli: Cli, config: &Config) -> Result<()> {
    info!(topic = %cli.topic, model = %config.model, "starting market research");

    let mut options = PipelineOptions::from_config(&cli.topic, config);
    if let Some(session_id) = cli.session {
        options = options.with_session_id(session_id);
    }

    let outcome = run_market_research_with_report(options, &cli.output).await?;

    if let Err(err) = log_run_completion(RunLogInput {
        session_id: outcome.session_id.clone(),
        topic: outcome.topic.clone(),
        model: config.model.clone(),
        report_path: outcome
            .report_path
            .as_ref()
            .map(|path| path.display().to_string()),
        sources: outcome.sources.clone(),
    }) {
        warn!(error = %err, "failed to append run log entry");
    }

    info!(
        session_id = %outcome.session_id,
        sources = outcome.sources.len(),
        "market research completed"
    );
    println!("Report saved to: {}", cli.output.display());

    Ok(())
}
