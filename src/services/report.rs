//! Console summary and persisted JSON run log.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::models::{LogEntry, MigrationRunStats};
use crate::services::users::BatchOptions;

/// Error messages shown in the console summary.
pub const SUMMARY_ERROR_LIMIT: usize = 10;

const RULE: &str = "============================================================";

/// Paging window recorded in the log.
#[derive(Debug, Serialize)]
pub struct BatchWindow {
    pub start_offset: u64,
    pub batch_size: u64,
}

/// On-disk shape of a run log.
#[derive(Debug, Serialize)]
pub struct RunLog<'a> {
    pub timestamp: String,
    pub subject: &'a str,
    pub dry_run: bool,
    pub mode: &'static str,
    pub batch: BatchWindow,
    pub stats: &'a MigrationRunStats,
    pub errors: &'a [String],
    pub migration_log: &'a [LogEntry],
}

/// A finished batch, ready to be reported.
pub struct RunReport<'a> {
    pub subject: &'a str,
    pub options: &'a BatchOptions,
    pub stats: &'a MigrationRunStats,
    pub finished_at: DateTime<Local>,
}

impl<'a> RunReport<'a> {
    pub fn new(subject: &'a str, options: &'a BatchOptions, stats: &'a MigrationRunStats) -> Self {
        Self {
            subject,
            options,
            stats,
            finished_at: Local::now(),
        }
    }

    /// Writes the human-readable summary.
    pub fn print_summary(&self, out: &mut impl Write) -> io::Result<()> {
        let stats = self.stats;
        let migrated_label = if self.options.dry_run {
            "Would migrate"
        } else {
            "Successfully migrated"
        };

        writeln!(out)?;
        writeln!(out, "{RULE}")?;
        writeln!(
            out,
            "MIGRATION SUMMARY: {} ({})",
            self.subject,
            self.options.mode()
        )?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Total found: {}", stats.total_found)?;
        writeln!(out, "{migrated_label}: {}", stats.migrated)?;
        writeln!(out, "Skipped: {}", stats.skipped)?;
        writeln!(out, "Duplicates found: {}", stats.duplicates)?;
        writeln!(out, "Errors: {}", stats.errors)?;

        if !stats.error_messages.is_empty() {
            writeln!(out)?;
            writeln!(out, "ERRORS ({}):", stats.error_messages.len())?;
            for message in stats.error_messages.iter().take(SUMMARY_ERROR_LIMIT) {
                writeln!(out, "  - {message}")?;
            }
            if stats.error_messages.len() > SUMMARY_ERROR_LIMIT {
                writeln!(
                    out,
                    "  ... and {} more errors",
                    stats.error_messages.len() - SUMMARY_ERROR_LIMIT
                )?;
            }
        }
        writeln!(out, "{RULE}")
    }

    fn file_stem(&self) -> String {
        format!(
            "migration_log_{}_{}",
            self.subject,
            self.finished_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Full run log, as persisted.
    pub fn to_log(&self) -> RunLog<'_> {
        RunLog {
            timestamp: self.finished_at.to_rfc3339(),
            subject: self.subject,
            dry_run: self.options.dry_run,
            mode: self.options.mode(),
            batch: BatchWindow {
                start_offset: self.options.start_offset,
                batch_size: self.options.batch_size,
            },
            stats: self.stats,
            errors: &self.stats.error_messages,
            migration_log: &self.stats.log,
        }
    }

    /// Writes the run log into `dir` and returns its path.
    ///
    /// Files are created exclusively; a name collision gets a numeric suffix.
    pub fn save_log(&self, dir: &Path) -> Result<PathBuf, AppError> {
        std::fs::create_dir_all(dir)?;
        let body = serde_json::to_vec_pretty(&self.to_log())?;
        let stem = self.file_stem();

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{stem}.json")
            } else {
                format!("{stem}_{attempt}.json")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&body)?;
                    file.flush()?;
                    info!(path = %path.display(), "Migration log saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MigrationOutcome;
    use serde_json::json;
    use tempfile::TempDir;

    fn options(dry_run: bool) -> BatchOptions {
        BatchOptions {
            start_offset: 0,
            batch_size: 100,
            dry_run,
        }
    }

    fn stats_with_errors(n: usize) -> MigrationRunStats {
        let mut stats = MigrationRunStats::default();
        for i in 0..n {
            stats.record(LogEntry {
                legacy_id: format!("id{i}"),
                label: None,
                new_id: None,
                phone: None,
                outcome: MigrationOutcome::SkippedInvalid {
                    reason: "username is required".to_string(),
                },
            });
        }
        stats.total_found = n as u64;
        stats
    }

    fn summary(stats: &MigrationRunStats, dry_run: bool) -> String {
        let opts = options(dry_run);
        let mut out = Vec::new();
        RunReport::new("users", &opts, stats)
            .print_summary(&mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_summary_truncates_errors() {
        let text = summary(&stats_with_errors(13), false);
        assert!(text.contains("MIGRATION SUMMARY: users (LIVE MIGRATION)"));
        assert!(text.contains("Skipped: 13"));
        assert!(text.contains("ERRORS (13):"));
        assert_eq!(text.matches("  - Skipped").count(), SUMMARY_ERROR_LIMIT);
        assert!(text.contains("... and 3 more errors"));
    }

    #[test]
    fn test_summary_without_errors() {
        let text = summary(&MigrationRunStats::default(), true);
        assert!(text.contains("(DRY RUN)"));
        assert!(text.contains("Would migrate: 0"));
        assert!(!text.contains("ERRORS"));
    }

    #[test]
    fn test_log_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let stats = stats_with_errors(1);
        let opts = options(true);
        let report = RunReport::new("users", &opts, &stats);

        let first = report.save_log(dir.path()).unwrap();
        let second = report.save_log(dir.path()).unwrap();
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("_1.json"));

        let log: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&first).unwrap()).unwrap();
        assert_eq!(log["dry_run"], json!(true));
        assert_eq!(log["mode"], json!("DRY RUN"));
        assert_eq!(log["stats"]["skipped"], json!(1));
        assert_eq!(log["errors"].as_array().unwrap().len(), 1);
        assert_eq!(log["migration_log"][0]["outcome"]["status"], json!("skipped_invalid"));
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("migration_log_users_"));
    }
}
