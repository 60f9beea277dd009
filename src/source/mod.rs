//! Read-only access to the legacy document store.
//!
//! A [`LegacySource`] is opened explicitly, handed to the services that
//! need it, and closed by the caller on every exit path.

mod jsonl;
mod memory;
mod mongo;

pub use jsonl::JsonlSource;
pub use memory::MemorySource;
pub use mongo::MongoSource;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::config::SourceConfig;
use crate::error::AppError;
use crate::models::LegacyDocument;

/// Equality filter applied by the source.
///
/// Semantics follow MongoDB: a field constrained to `false` must be
/// present and false, a missing field does not match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    pub status_key: Option<i64>,
    pub is_removed: Option<bool>,
}

impl SourceFilter {
    /// Active, not removed (`status_key = 1`, `is_removed = false`).
    pub fn active() -> Self {
        Self {
            status_key: Some(1),
            is_removed: Some(false),
        }
    }

    /// No constraints.
    pub fn all() -> Self {
        Self::default()
    }

    /// Evaluates the filter against an in-memory document.
    pub fn matches(&self, doc: &LegacyDocument) -> bool {
        if let Some(status) = self.status_key {
            let matches_status = match doc.plain("status_key") {
                Some(JsonValue::Number(n)) => n.as_f64() == Some(status as f64),
                _ => false,
            };
            if !matches_status {
                return false;
            }
        }
        if let Some(removed) = self.is_removed {
            if doc.bool("is_removed") != Some(removed) {
                return false;
            }
        }
        true
    }
}

/// A paginated, read-only view of the legacy collections.
#[async_trait]
pub trait LegacySource: Send + Sync {
    /// Short description for logs (cluster/database or export path).
    fn describe(&self) -> String;

    /// Fetches up to `limit` documents matching `filter`, skipping the
    /// first `skip` matches.
    async fn fetch(
        &self,
        collection: &str,
        filter: &SourceFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<LegacyDocument>, AppError>;

    /// Counts documents matching `filter`.
    async fn count(&self, collection: &str, filter: &SourceFilter) -> Result<u64, AppError>;

    /// Releases the underlying connection. The source must not be used afterwards.
    async fn close(&self) -> Result<(), AppError>;
}

/// Opens the configured source, failing fast when it is unreachable.
pub async fn open_source(config: &SourceConfig) -> Result<Box<dyn LegacySource>, AppError> {
    match config {
        SourceConfig::Mongo { uri, database } => {
            Ok(Box::new(MongoSource::connect(uri, database).await?))
        }
        SourceConfig::Jsonl { path } => Ok(Box::new(JsonlSource::open(path).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: JsonValue) -> LegacyDocument {
        LegacyDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_active_filter() {
        let filter = SourceFilter::active();
        assert!(filter.matches(&doc(json!({"status_key": 1, "is_removed": false}))));
        assert!(filter.matches(&doc(json!({"status_key": {"$numberInt": "1"}, "is_removed": false}))));
        assert!(!filter.matches(&doc(json!({"status_key": 2, "is_removed": false}))));
        assert!(!filter.matches(&doc(json!({"status_key": 1, "is_removed": true}))));
    }

    #[test]
    fn test_missing_field_does_not_match_false() {
        let filter = SourceFilter::active();
        assert!(!filter.matches(&doc(json!({"status_key": 1}))));
        assert!(!filter.matches(&doc(json!({"is_removed": false}))));
    }

    #[test]
    fn test_all_filter_matches_everything() {
        assert!(SourceFilter::all().matches(&doc(json!({}))));
    }
}
