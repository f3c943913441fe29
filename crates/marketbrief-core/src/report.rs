use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;

use crate::MarketBriefError;

pub const DEFAULT_REPORT_FILENAME: &str = "market_research_report.md";

/// Write the report Markdown to `path` exactly as produced, creating parent
/// directories as needed. Callers invoke this only after a successful run, so
/// a failed run never leaves a partial or empty file behind.
pub fn save_report<P: AsRef<Path>>(markdown: &str, path: P) -> Result<(), MarketBriefError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)
                .map_err(|source| MarketBriefError::report_io(path.to_path_buf(), source))?;
        }
    }

    let mut file = File::create(path)
        .map_err(|source| MarketBriefError::report_io(path.to_path_buf(), source))?;
    file.write_all(markdown.as_bytes())
        .map_err(|source| MarketBriefError::report_io(path.to_path_buf(), source))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn report_is_written_verbatim() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join(DEFAULT_REPORT_FILENAME);

        save_report("# Report\n\nBody text.", &path).expect("report should save");

        let written = std::fs::read_to_string(&path).expect("report should exist");
        assert_eq!(written, "# Report\n\nBody text.");
    }

    #[test]
    fn parent_directories_are_created() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("reports/2024/output.md");

        save_report("content", &path).expect("report should save");

        assert!(path.exists());
    }

    #[test]
    fn existing_file_is_replaced() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("report.md");
        std::fs::write(&path, "stale report from a previous run").unwrap();

        save_report("fresh", &path).expect("report should save");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[test]
    fn unwritable_path_reports_io_error() {
        let temp = TempDir::new().expect("temp dir");
        // A directory at the target path makes File::create fail.
        let path = temp.path().join("report.md");
        std::fs::create_dir(&path).unwrap();

        let err = save_report("content", &path).unwrap_err();
        assert!(matches!(err, MarketBriefError::ReportIo { .. }));
    }
}
