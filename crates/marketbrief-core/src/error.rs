use std::path::PathBuf;

use thiserror::Error;

/// Core error type for MarketBrief.
#[derive(Debug, Error)]
pub enum MarketBriefError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnvironment(Vec<String>),
    #[error("market research run failed: {0}")]
    Run(String),
    #[error("failed to write report {}: {}", .path.display(), .source)]
    ReportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarketBriefError {
    pub fn report_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ReportIo { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_environment_lists_every_name() {
        let err = MarketBriefError::MissingEnvironment(vec![
            "OPENAI_API_KEY".to_string(),
            "SERPER_API_KEY".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "missing required environment variables: OPENAI_API_KEY, SERPER_API_KEY"
        );
    }

    #[test]
    fn report_io_names_the_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = MarketBriefError::report_io(PathBuf::from("out/report.md"), source);
        assert!(err.to_string().contains("out/report.md"));
    }
}
