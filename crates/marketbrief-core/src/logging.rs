use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

const LOG_DIR_ENV: &str = "MARKETBRIEF_LOG_DIR";
const RETENTION_ENV: &str = "MARKETBRIEF_LOG_RETENTION_DAYS";
const DEFAULT_LOG_DIR: &str = "data/logs";
const DEFAULT_RETENTION_DAYS: u64 = 90;

static REDACTION_PATTERNS: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
    vec![
        (
            "api_key".to_string(),
            Regex::new(r"(?i)(api[_-]?key\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)")
                .expect("invalid api_key regex"),
        ),
        (
            "secret".to_string(),
            Regex::new(r"(?i)(secret\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)")
                .expect("invalid secret regex"),
        ),
        (
            "bearer".to_string(),
            Regex::new(r"(?i)(bearer\s+)([A-Za-z0-9\-_.+=/]+)").expect("invalid bearer regex"),
        ),
        (
            "sk_token".to_string(),
            Regex::new(r"(sk-[A-Za-z0-9]{16,})").expect("invalid sk_token regex"),
        ),
    ]
});

/// Summary of one completed run, appended to the monthly run log.
#[derive(Debug, Clone)]
pub struct RunLogInput {
    pub session_id: String,
    pub topic: String,
    pub model: String,
    pub report_path: Option<String>,
    pub sources: Vec<String>,
}

#[derive(Serialize)]
struct RunLogRecord {
    timestamp: String,
    session_id: String,
    topic: String,
    model: String,
    report_path: Option<String>,
    sources: Vec<String>,
    redactions: Vec<String>,
}

#[derive(Serialize)]
struct AuditLogRecord {
    timestamp: String,
    session_id: String,
    redactions: Vec<String>,
}

fn log_base_dir() -> PathBuf {
    std::env::var(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR))
}

fn retention_days() -> u64 {
    std::env::var(RETENTION_ENV)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let line = serde_json::to_string(value)?;
    writeln!(writer, "{}", line)
        .with_context(|| format!("failed to append log entry to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn sanitize_text(input: &str, redactions: &mut HashSet<String>) -> String {
    let mut output = input.to_string();
    for (name, regex) in REDACTION_PATTERNS.iter() {
        let mut matched = false;
        output = regex
            .replace_all(&output, |caps: &Captures| {
                matched = true;
                // Patterns with a prefix group keep the prefix; bare token
                // patterns are replaced outright.
                if caps.len() > 2 {
                    format!("{}[REDACTED]", &caps[1])
                } else {
                    "[REDACTED]".to_string()
                }
            })
            .to_string();
        if matched {
            redactions.insert(name.clone());
        }
    }
    output
}

/// Append a sanitized record for a completed run under the configured log
/// directory, then prune entries older than the retention window.
pub fn log_run_completion(input: RunLogInput) -> Result<()> {
    write_run_record(&log_base_dir(), retention_days(), input)
}

fn write_run_record(base_dir: &Path, retention: u64, input: RunLogInput) -> Result<()> {
    let timestamp = Utc::now();
    let mut redactions = HashSet::new();

    let topic = sanitize_text(&input.topic, &mut redactions);
    let sources: Vec<String> = input
        .sources
        .into_iter()
        .map(|source| sanitize_text(&source, &mut redactions))
        .collect();

    let record = RunLogRecord {
        timestamp: timestamp.to_rfc3339(),
        session_id: input.session_id.clone(),
        topic,
        model: input.model,
        report_path: input.report_path,
        sources,
        redactions: redactions.iter().cloned().collect(),
    };

    let month_dir = base_dir
        .join(format!("{:04}", timestamp.year()))
        .join(format!("{:02}", timestamp.month()));
    let run_log_path = month_dir.join("runs.jsonl");
    append_json_line(&run_log_path, &record)?;

    if !record.redactions.is_empty() {
        let audit = AuditLogRecord {
            timestamp: record.timestamp.clone(),
            session_id: input.session_id.clone(),
            redactions: record.redactions.clone(),
        };
        let audit_path = month_dir.join("audit.jsonl");
        append_json_line(&audit_path, &audit)?;
        warn!(
            session_id = %input.session_id,
            fields = ?record.redactions,
            "redacted potential secrets from run log"
        );
    }

    enforce_retention(base_dir, retention)?;

    Ok(())
}

fn enforce_retention(base_dir: &Path, retention: u64) -> Result<()> {
    if retention == 0 || !base_dir.exists() {
        return Ok(());
    }
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(retention.saturating_mul(86_400)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    prune_directory(base_dir, cutoff)?;
    Ok(())
}

fn prune_directory(dir: &Path, cutoff: SystemTime) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            prune_directory(&path, cutoff)?;
            if path.read_dir()?.next().is_none() {
                fs::remove_dir(&path).ok();
            }
        } else if metadata.is_file()
            && metadata
                .modified()
                .map(|time| time < cutoff)
                .unwrap_or(false)
        {
            fs::remove_file(&path).ok();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    fn sample_input() -> RunLogInput {
        RunLogInput {
            session_id: "test-session".to_string(),
            topic: "EV market with api_key=abcd1234".to_string(),
            model: "gpt-4".to_string(),
            report_path: Some("market_research_report.md".to_string()),
            sources: vec!["https://example.com/?token=sk-abcdef1234567890".to_string()],
        }
    }

    #[test]
    fn run_logging_sanitizes_and_persists() -> Result<()> {
        let temp = TempDir::new().expect("temp dir");

        write_run_record(temp.path(), 0, sample_input())?;

        let year_dir = temp.path().read_dir()?.next().unwrap()?.path();
        let month_dir = year_dir.read_dir()?.next().unwrap()?.path();
        let run_log = month_dir.join("runs.jsonl");
        assert!(run_log.exists());

        let line = std::fs::read_to_string(&run_log)?;
        let record: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(record["session_id"], "test-session");
        assert_eq!(record["model"], "gpt-4");
        assert!(record["topic"].as_str().unwrap().contains("[REDACTED]"));
        assert!(!line.contains("abcd1234"));
        assert!(!line.contains("sk-abcdef1234567890"));

        let audit_log = month_dir.join("audit.jsonl");
        assert!(audit_log.exists());

        Ok(())
    }

    #[test]
    fn clean_runs_produce_no_audit_entry() -> Result<()> {
        let temp = TempDir::new().expect("temp dir");
        let input = RunLogInput {
            session_id: "clean-session".to_string(),
            topic: "Applications of Generative AI in Big Data Analytics".to_string(),
            model: "gpt-4".to_string(),
            report_path: None,
            sources: vec!["https://example.com/article".to_string()],
        };

        write_run_record(temp.path(), 0, input)?;

        let year_dir = temp.path().read_dir()?.next().unwrap()?.path();
        let month_dir = year_dir.read_dir()?.next().unwrap()?.path();
        assert!(month_dir.join("runs.jsonl").exists());
        assert!(!month_dir.join("audit.jsonl").exists());

        Ok(())
    }

    #[test]
    fn fresh_entries_survive_retention() -> Result<()> {
        let temp = TempDir::new().expect("temp dir");

        write_run_record(temp.path(), 30, sample_input())?;

        let year_dir = temp.path().read_dir()?.next().unwrap()?.path();
        let month_dir = year_dir.read_dir()?.next().unwrap()?.path();
        assert!(month_dir.join("runs.jsonl").exists());

        Ok(())
    }

    #[test]
    fn sanitize_reports_matched_patterns() {
        let mut redactions = HashSet::new();
        let output = sanitize_text("Authorization: Bearer abc123TOKEN", &mut redactions);
        assert!(output.contains("[REDACTED]"));
        assert!(redactions.contains("bearer"));
    }
}
