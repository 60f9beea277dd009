//! Legacy source backed by a live MongoDB deployment.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::LegacyDocument;
use crate::source::{LegacySource, SourceFilter};

/// Read-only MongoDB client scoped to one database.
#[derive(Debug, Clone)]
pub struct MongoSource {
    client: Client,
    db: Database,
}

impl MongoSource {
    /// Connects and pings the server so an unreachable cluster fails before any work.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::SourceConnection(e.to_string()))?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::SourceConnection(e.to_string()))?;
        info!(database = %database, "Connected to legacy MongoDB");
        Ok(Self { client, db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

/// Translates the equality filter into a query document.
pub(crate) fn filter_document(filter: &SourceFilter) -> Document {
    let mut query = Document::new();
    if let Some(status) = filter.status_key {
        query.insert("status_key", status);
    }
    if let Some(removed) = filter.is_removed {
        query.insert("is_removed", removed);
    }
    query
}

fn source_error(err: mongodb::error::Error) -> AppError {
    AppError::Source(err.to_string())
}

#[async_trait]
impl LegacySource for MongoSource {
    fn describe(&self) -> String {
        format!("mongodb database {}", self.db.name())
    }

    async fn fetch(
        &self,
        collection: &str,
        filter: &SourceFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<LegacyDocument>, AppError> {
        let query = filter_document(filter);
        debug!(collection = %collection, ?query, skip, limit, "Fetching legacy documents");

        // Stable `_id` order keeps offsets meaningful across runs.
        let mut cursor = self
            .collection(collection)
            .find(query)
            .sort(doc! { "_id": 1 })
            .skip(skip)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(source_error)?;

        let mut docs = Vec::new();
        while let Some(raw) = cursor.try_next().await.map_err(source_error)? {
            let id = raw
                .get("_id")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            let value = Bson::Document(raw).into_relaxed_extjson();
            docs.push(LegacyDocument::from_value(value).map_err(|e| {
                AppError::MalformedDocument {
                    id,
                    reason: e.to_string(),
                }
            })?);
        }
        Ok(docs)
    }

    async fn count(&self, collection: &str, filter: &SourceFilter) -> Result<u64, AppError> {
        self.collection(collection)
            .count_documents(filter_document(filter))
            .await
            .map_err(source_error)
    }

    async fn close(&self) -> Result<(), AppError> {
        self.client.clone().shutdown().await;
        debug!("Closed legacy MongoDB client");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_filter_document() {
        let query = filter_document(&SourceFilter::active());
        assert_eq!(query, doc! { "status_key": 1i64, "is_removed": false });
    }

    #[test]
    fn test_empty_filter_document() {
        assert!(filter_document(&SourceFilter::all()).is_empty());
    }
}
