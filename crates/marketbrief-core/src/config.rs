use std::env;

use crate::{MarketBriefError, SecretValue};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const SERPER_API_KEY_ENV: &str = "SERPER_API_KEY";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Runtime configuration resolved from the process environment.
///
/// Both API keys are mandatory; the model name falls back to
/// [`DEFAULT_MODEL`] when `OPENAI_MODEL` is unset or blank.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: SecretValue,
    pub serper_api_key: SecretValue,
    pub model: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, MarketBriefError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Every missing required variable is collected so the error names all of
    /// them at once instead of failing on the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MarketBriefError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let openai_api_key = required(&lookup, OPENAI_API_KEY_ENV, &mut missing);
        let serper_api_key = required(&lookup, SERPER_API_KEY_ENV, &mut missing);

        let model = lookup(OPENAI_MODEL_ENV)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        match (openai_api_key, serper_api_key) {
            (Some(openai_api_key), Some(serper_api_key)) => Ok(Self {
                openai_api_key,
                serper_api_key,
                model,
            }),
            _ => Err(MarketBriefError::MissingEnvironment(missing)),
        }
    }
}

fn required<F>(lookup: &F, name: &str, missing: &mut Vec<String>) -> Option<SecretValue>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Some(SecretValue::new(value)),
        _ => {
            missing.push(name.to_string());
            None
        }
    }
}
