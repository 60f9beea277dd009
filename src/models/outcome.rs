//! Per-record outcomes and aggregate run statistics.

use serde::Serialize;

/// What happened to a single legacy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Created in the target store. `new_id` is absent in dry-run mode.
    Migrated { new_id: Option<String> },
    /// Already present in the target store.
    SkippedDuplicate { existing_id: Option<String> },
    /// Rejected by validation; nothing was written.
    SkippedInvalid { reason: String },
    /// Failed while writing or reading the target store.
    Error { reason: String },
}

impl MigrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationOutcome::Migrated { .. } => "migrated",
            MigrationOutcome::SkippedDuplicate { .. } => "skipped_duplicate",
            MigrationOutcome::SkippedInvalid { .. } => "skipped_invalid",
            MigrationOutcome::Error { .. } => "error",
        }
    }
}

/// One line of the per-record migration log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub legacy_id: String,
    /// Username or title, when the record has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub new_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub outcome: MigrationOutcome,
}

/// Aggregate counters plus the ordered error list and per-record log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationRunStats {
    pub total_found: u64,
    pub migrated: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub errors: u64,
    #[serde(skip)]
    pub error_messages: Vec<String>,
    #[serde(skip)]
    pub log: Vec<LogEntry>,
}

impl MigrationRunStats {
    /// Counts one outcome and appends it to the log.
    ///
    /// Invalid and failed records also contribute a human-readable line
    /// to the error list.
    pub fn record(&mut self, entry: LogEntry) {
        let who = entry.label.as_deref().unwrap_or(&entry.legacy_id);
        match &entry.outcome {
            MigrationOutcome::Migrated { .. } => self.migrated += 1,
            MigrationOutcome::SkippedDuplicate { .. } => self.duplicates += 1,
            MigrationOutcome::SkippedInvalid { reason } => {
                self.skipped += 1;
                self.error_messages
                    .push(format!("Skipped {} ({}): {}", who, entry.legacy_id, reason));
            }
            MigrationOutcome::Error { reason } => {
                self.errors += 1;
                self.error_messages
                    .push(format!("Error migrating {} ({}): {}", who, entry.legacy_id, reason));
            }
        }
        self.log.push(entry);
    }

    /// Number of records with a recorded outcome.
    pub fn processed(&self) -> u64 {
        self.migrated + self.skipped + self.duplicates + self.errors
    }
}
