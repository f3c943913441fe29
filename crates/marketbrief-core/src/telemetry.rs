use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

use crate::MarketBriefError;

static TELEMETRY_GUARD: OnceLock<()> = OnceLock::new();

/// Options for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    /// Filter directives; falls back to `RUST_LOG`, then `info`.
    pub env_filter: Option<String>,
    pub with_ansi: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            env_filter: None,
            with_ansi: std::io::stdout().is_terminal(),
        }
    }
}

fn resolve_filter(options: &TelemetryOptions) -> String {
    options
        .env_filter
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string())
}

/// Install the global tracing subscriber.
///
/// Safe to call multiple times; only the first invocation installs it.
pub fn init_telemetry(options: TelemetryOptions) -> Result<(), MarketBriefError> {
    if TELEMETRY_GUARD.get().is_some() {
        return Ok(());
    }

    let filter = resolve_filter(&options);

    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new(filter))
        .with_ansi(options.with_ansi)
        .try_init()
        .map_err(|err| {
            MarketBriefError::InvalidConfiguration(format!("telemetry init failed: {err}"))
        })?;

    TELEMETRY_GUARD.get_or_init(|| ());
    Ok(())
}
