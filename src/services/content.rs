//! Batch runner for legacy content collections.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::error::{AppError, RecordError};
use crate::models::{ContentKind, LegacyDocument, LogEntry, MigrationOutcome, MigrationRunStats};
use crate::repositories::ContentStore;
use crate::services::mapper::map_content;
use crate::services::users::BatchOptions;
use crate::source::{LegacySource, SourceFilter};

/// Migrates one page of a content collection.
///
/// Owners must already be migrated; the owner lookup is cached for the
/// run since most documents share a handful of authors.
pub struct ContentMigrationService<'a, S: ?Sized, C: ?Sized> {
    source: &'a S,
    store: &'a C,
    today: NaiveDate,
}

/// Per-run state.
#[derive(Default)]
struct RunState {
    owners: HashMap<String, Option<String>>,
    claimed: HashSet<String>,
}

enum Resolved {
    Owners(Vec<(&'static str, String)>),
    Missing(RecordError),
}

impl<'a, S, C> ContentMigrationService<'a, S, C>
where
    S: LegacySource + ?Sized,
    C: ContentStore + ?Sized,
{
    pub fn new(source: &'a S, store: &'a C) -> Self {
        Self {
            source,
            store,
            today: Utc::now().date_naive(),
        }
    }

    /// Fixes the date used for `Today` defaults.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub async fn run(
        &self,
        kind: ContentKind,
        options: &BatchOptions,
    ) -> Result<MigrationRunStats, AppError> {
        options.validate()?;
        info!(
            kind = %kind,
            batch_size = options.batch_size,
            start = options.start_offset,
            mode = options.mode(),
            "Starting content migration"
        );

        let docs = self
            .source
            .fetch(
                kind.collection(),
                &SourceFilter::all(),
                options.start_offset,
                options.batch_size,
            )
            .await?;

        let mut stats = MigrationRunStats {
            total_found: docs.len() as u64,
            ..Default::default()
        };
        if docs.is_empty() {
            info!(kind = %kind, "No documents found to migrate");
            return Ok(stats);
        }

        let mut state = RunState::default();
        for doc in &docs {
            let entry = self.migrate_one(kind, doc, &mut state, options.dry_run).await?;
            stats.record(entry);
        }

        info!(
            kind = %kind,
            migrated = stats.migrated,
            skipped = stats.skipped,
            duplicates = stats.duplicates,
            errors = stats.errors,
            "Content batch finished"
        );
        Ok(stats)
    }

    async fn resolve_owners(
        &self,
        kind: ContentKind,
        doc: &LegacyDocument,
        state: &mut RunState,
    ) -> Result<Resolved, AppError> {
        let mut owners = Vec::with_capacity(kind.owner_fields().len());
        for field in kind.owner_fields() {
            let Some(old_id) = doc.string(field.legacy) else {
                return Ok(Resolved::Missing(RecordError::MissingRequiredField(
                    field.legacy,
                )));
            };
            let user_id = match state.owners.get(&old_id) {
                Some(cached) => cached.clone(),
                None => {
                    let found = self.store.user_id_for_legacy(&old_id).await?;
                    state.owners.insert(old_id.clone(), found.clone());
                    found
                }
            };
            match user_id {
                Some(id) => owners.push((field.column, id)),
                None => {
                    return Ok(Resolved::Missing(RecordError::OwnerNotMigrated {
                        field: field.legacy,
                        old_id,
                    }))
                }
            }
        }
        Ok(Resolved::Owners(owners))
    }

    async fn migrate_one(
        &self,
        kind: ContentKind,
        doc: &LegacyDocument,
        state: &mut RunState,
        dry_run: bool,
    ) -> Result<LogEntry, AppError> {
        let mut entry = LogEntry {
            legacy_id: doc.id().unwrap_or_else(|| "<unknown>".to_string()),
            label: kind.label_field().and_then(|f| doc.text(f)),
            new_id: None,
            phone: None,
            outcome: MigrationOutcome::Migrated { new_id: None },
        };

        let outcome = match self.process(kind, doc, state, dry_run).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(kind = %kind, legacy_id = %entry.legacy_id, error = %e, "Error migrating document");
                MigrationOutcome::Error { reason: e.coded() }
            }
        };
        if let MigrationOutcome::Migrated { new_id } = &outcome {
            entry.new_id = new_id.clone();
        }
        entry.outcome = outcome;
        Ok(entry)
    }

    async fn process(
        &self,
        kind: ContentKind,
        doc: &LegacyDocument,
        state: &mut RunState,
        dry_run: bool,
    ) -> Result<MigrationOutcome, AppError> {
        let Some(old_id) = doc.id() else {
            return Ok(invalid(kind, RecordError::MissingRequiredField("_id")));
        };

        if state.claimed.contains(&old_id) {
            return Ok(MigrationOutcome::SkippedDuplicate { existing_id: None });
        }
        if let Some(existing) = self.store.find_id(kind, &old_id).await? {
            warn!(kind = %kind, legacy_id = %old_id, "Document already migrated");
            return Ok(MigrationOutcome::SkippedDuplicate {
                existing_id: Some(existing),
            });
        }

        let owners = match self.resolve_owners(kind, doc, state).await? {
            Resolved::Owners(owners) => owners,
            Resolved::Missing(reason) => return Ok(invalid(kind, reason)),
        };

        let content = match map_content(kind, doc, owners, self.today) {
            Ok(content) => content,
            Err(reason) => return Ok(invalid(kind, reason)),
        };

        if dry_run {
            info!(kind = %kind, legacy_id = %old_id, "[DRY RUN] Would create document");
            state.claimed.insert(old_id);
            return Ok(MigrationOutcome::Migrated { new_id: None });
        }

        match self.store.create(&content).await {
            Ok(id) => {
                info!(kind = %kind, legacy_id = %old_id, id = %id, "Created document");
                state.claimed.insert(old_id);
                Ok(MigrationOutcome::Migrated { new_id: Some(id) })
            }
            Err(AppError::Duplicate(_)) => {
                Ok(MigrationOutcome::SkippedDuplicate { existing_id: None })
            }
            Err(e) => Err(e),
        }
    }
}

fn invalid(kind: ContentKind, reason: RecordError) -> MigrationOutcome {
    warn!(kind = %kind, reason = %reason, "Skipping invalid document");
    MigrationOutcome::SkippedInvalid {
        reason: reason.to_string(),
    }
}
