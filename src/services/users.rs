//! Batch runner for legacy users.

use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::models::{
    LegacyDocument, LegacyUserRecord, LogEntry, MigrationOutcome, MigrationRunStats,
};
use crate::repositories::UserStore;
use crate::services::guard::DuplicateGuard;
use crate::services::mapper::map_user;
use crate::source::{LegacySource, SourceFilter};

/// Paging and mode for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub start_offset: u64,
    pub batch_size: u64,
    pub dry_run: bool,
}

impl BatchOptions {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.batch_size == 0 {
            return Err(AppError::InvalidArgument(
                "batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mode(&self) -> &'static str {
        if self.dry_run {
            "DRY RUN"
        } else {
            "LIVE MIGRATION"
        }
    }
}

/// Migrates one page of active legacy users, strictly in sequence.
pub struct UserMigrationService<'a, S: ?Sized, U: ?Sized> {
    source: &'a S,
    store: &'a U,
    collection: String,
    default_country_code: String,
}

impl<'a, S, U> UserMigrationService<'a, S, U>
where
    S: LegacySource + ?Sized,
    U: UserStore + ?Sized,
{
    pub fn new(source: &'a S, store: &'a U) -> Self {
        Self {
            source,
            store,
            collection: "AuthApp_usermodel".to_string(),
            default_country_code: "1".to_string(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_default_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.default_country_code = country_code.into();
        self
    }

    /// Runs one batch.
    ///
    /// Per-record failures are recorded in the returned stats. Only losing
    /// a store connection returns `Err`.
    pub async fn run(&self, options: &BatchOptions) -> Result<MigrationRunStats, AppError> {
        options.validate()?;
        info!(
            batch_size = options.batch_size,
            start = options.start_offset,
            mode = options.mode(),
            "Starting user migration"
        );

        let docs = self
            .source
            .fetch(
                &self.collection,
                &SourceFilter::active(),
                options.start_offset,
                options.batch_size,
            )
            .await?;

        let mut stats = MigrationRunStats {
            total_found: docs.len() as u64,
            ..Default::default()
        };
        if docs.is_empty() {
            info!("No users found to migrate");
            return Ok(stats);
        }
        info!(count = docs.len(), "Processing users");

        let mut guard = DuplicateGuard::new(self.store);
        let total = docs.len();
        for (i, doc) in docs.iter().enumerate() {
            debug!(
                "[{}/{}] Processing {}",
                i + 1,
                total,
                doc.text("username").unwrap_or_else(|| format!("user_{}", i + 1))
            );
            let entry = self.migrate_one(doc, &mut guard, options.dry_run).await?;
            stats.record(entry);
        }

        info!(
            migrated = stats.migrated,
            skipped = stats.skipped,
            duplicates = stats.duplicates,
            errors = stats.errors,
            "User batch finished"
        );
        Ok(stats)
    }

    async fn migrate_one(
        &self,
        doc: &LegacyDocument,
        guard: &mut DuplicateGuard<'_, U>,
        dry_run: bool,
    ) -> Result<LogEntry, AppError> {
        let record = match LegacyUserRecord::from_document(doc) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable user document");
                return Ok(LogEntry {
                    legacy_id: doc.id().unwrap_or_else(|| "<unknown>".to_string()),
                    label: doc.text("username"),
                    new_id: None,
                    phone: None,
                    outcome: MigrationOutcome::SkippedInvalid {
                        reason: e.to_string(),
                    },
                });
            }
        };

        let mut entry = LogEntry {
            legacy_id: record.legacy_id.clone(),
            label: record.username.clone(),
            new_id: None,
            phone: None,
            outcome: MigrationOutcome::Migrated { new_id: None },
        };

        let user = match map_user(&record, &self.default_country_code) {
            Ok(user) => user,
            Err(e) => {
                warn!(legacy_id = %record.legacy_id, reason = %e, "Skipping invalid user");
                entry.outcome = MigrationOutcome::SkippedInvalid {
                    reason: e.to_string(),
                };
                return Ok(entry);
            }
        };
        entry.phone = Some(user.phone_number.clone());

        match guard.check(&user).await {
            Ok(Some(duplicate)) => {
                warn!(
                    username = %user.username,
                    phone = %user.phone_number,
                    "User already exists"
                );
                entry.outcome = MigrationOutcome::SkippedDuplicate {
                    existing_id: duplicate.existing_id(),
                };
                return Ok(entry);
            }
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(legacy_id = %record.legacy_id, error = %e, "Duplicate check failed");
                entry.outcome = MigrationOutcome::Error { reason: e.coded() };
                return Ok(entry);
            }
        }

        if dry_run {
            info!(username = %user.username, phone = %user.phone_number, "[DRY RUN] Would create user");
            guard.claim(&user);
            return Ok(entry);
        }

        match self.store.create(&user).await {
            Ok(created) => {
                info!(username = %user.username, phone = %user.phone_number, id = %created.id, "Created user");
                guard.claim(&user);
                entry.new_id = Some(created.id.clone());
                entry.outcome = MigrationOutcome::Migrated {
                    new_id: Some(created.id),
                };
            }
            Err(AppError::Duplicate(detail)) => {
                warn!(username = %user.username, %detail, "User already exists");
                entry.outcome = MigrationOutcome::SkippedDuplicate { existing_id: None };
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(username = %user.username, error = %e, "Error creating user");
                entry.outcome = MigrationOutcome::Error { reason: e.coded() };
            }
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;
    use crate::source::MemorySource;
    use serde_json::json;

    fn legacy(id: &str, username: &str, phone: &str) -> LegacyDocument {
        LegacyDocument::from_value(json!({
            "_id": id,
            "username": username,
            "phone_number": phone,
            "country_code": "1",
            "name": "Test User",
            "status_key": 1,
            "is_removed": false,
        }))
        .unwrap()
    }

    fn options(batch_size: u64, dry_run: bool) -> BatchOptions {
        BatchOptions {
            start_offset: 0,
            batch_size,
            dry_run,
        }
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let source = MemorySource::new();
        let store = MemoryStore::new();
        let err = UserMigrationService::new(&source, &store)
            .run(&options(0, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_invalid_records_are_isolated() {
        let source = MemorySource::new().with_documents(
            "AuthApp_usermodel",
            vec![
                legacy("1", "", "8479873207"),
                legacy("2", "bob", "123"),
                legacy("3", "cy", "8479873209"),
            ],
        );
        let store = MemoryStore::new();
        let stats = UserMigrationService::new(&source, &store)
            .run(&options(10, false))
            .await
            .unwrap();

        assert_eq!(stats.total_found, 3);
        assert_eq!(stats.migrated, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.error_messages.len(), 2);
        assert!(stats.error_messages[0].contains("username is required"));
        assert_eq!(store.count_migrated().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_reports_in_run_duplicates() {
        let source = MemorySource::new().with_documents(
            "AuthApp_usermodel",
            vec![
                legacy("1", "ada", "8479873207"),
                legacy("2", "ada2", "(847) 987-3207"),
            ],
        );
        let store = MemoryStore::new();
        let stats = UserMigrationService::new(&source, &store)
            .run(&options(10, true))
            .await
            .unwrap();

        assert_eq!(stats.migrated, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.log[0].new_id, None);
        assert_eq!(store.count_migrated().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_source_failure_aborts() {
        let source = MemorySource::new();
        source.close().await.unwrap();
        let store = MemoryStore::new();
        let err = UserMigrationService::new(&source, &store)
            .run(&options(10, false))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
