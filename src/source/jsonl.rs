//! Legacy source backed by a directory of Extended JSON line files.
//!
//! Each collection lives in `<dir>/<collection>.jsonl`, one document per
//! line, as produced by `mongoexport`. A missing file reads as an empty
//! collection, the same as querying an absent collection on the server.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::AppError;
use crate::models::LegacyDocument;
use crate::source::{LegacySource, SourceFilter};

#[derive(Debug, Clone)]
pub struct JsonlSource {
    dir: PathBuf,
}

impl JsonlSource {
    /// Opens an export directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&dir).await.map_err(|e| {
            AppError::SourceConnection(format!("cannot open export {}: {}", dir.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(AppError::SourceConnection(format!(
                "export path {} is not a directory",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.jsonl"))
    }

    /// Loads every document of a collection, in file order.
    async fn load(&self, collection: &str) -> Result<Vec<LegacyDocument>, AppError> {
        let path = self.collection_path(collection);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Collection export missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::Source(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        parse_lines(&contents, &path)
    }
}

fn parse_lines(contents: &str, path: &Path) -> Result<Vec<LegacyDocument>, AppError> {
    let mut docs = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: JsonValue = serde_json::from_str(line).map_err(|e| {
            AppError::Source(format!("{} line {}: {}", path.display(), idx + 1, e))
        })?;
        let doc = LegacyDocument::from_value(value).map_err(|e| {
            AppError::Source(format!("{} line {}: {}", path.display(), idx + 1, e))
        })?;
        docs.push(doc);
    }
    Ok(docs)
}

#[async_trait]
impl LegacySource for JsonlSource {
    fn describe(&self) -> String {
        format!("jsonl export {}", self.dir.display())
    }

    async fn fetch(
        &self,
        collection: &str,
        filter: &SourceFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<LegacyDocument>, AppError> {
        Ok(self
            .load(collection)
            .await?
            .into_iter()
            .filter(|doc| filter.matches(doc))
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, collection: &str, filter: &SourceFilter) -> Result<u64, AppError> {
        Ok(self
            .load(collection)
            .await?
            .iter()
            .filter(|doc| filter.matches(doc))
            .count() as u64)
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const USERS: &str = r#"{"_id":{"$oid":"5f1a2b3c4d5e6f7a8b9c0d01"},"username":"ada","status_key":1,"is_removed":false}
{"_id":{"$oid":"5f1a2b3c4d5e6f7a8b9c0d02"},"username":"bob","status_key":1,"is_removed":true}

{"_id":{"$oid":"5f1a2b3c4d5e6f7a8b9c0d03"},"username":"cy","status_key":{"$numberInt":"1"},"is_removed":false}
"#;

    async fn source_with(contents: &str) -> (TempDir, JsonlSource) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("AuthApp_usermodel.jsonl"), contents).unwrap();
        let source = JsonlSource::open(dir.path()).await.unwrap();
        (dir, source)
    }

    #[tokio::test]
    async fn test_fetch_filters_and_pages() {
        let (_dir, source) = source_with(USERS).await;
        let docs = source
            .fetch("AuthApp_usermodel", &SourceFilter::active(), 0, 10)
            .await
            .unwrap();
        let names: Vec<_> = docs.iter().filter_map(|d| d.text("username")).collect();
        assert_eq!(names, vec!["ada", "cy"]);

        let page = source
            .fetch("AuthApp_usermodel", &SourceFilter::active(), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].text("username").as_deref(), Some("cy"));
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let (_dir, source) = source_with(USERS).await;
        assert_eq!(
            source
                .count("authapp_booksmodel", &SourceFilter::all())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_corrupt_line_is_fatal() {
        let (_dir, source) = source_with("{\"_id\": 1}\nnot json\n").await;
        let err = source
            .fetch("AuthApp_usermodel", &SourceFilter::all(), 0, 10)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_open_missing_dir_fails() {
        let err = JsonlSource::open("/definitely/not/here").await.unwrap_err();
        assert!(matches!(err, AppError::SourceConnection(_)));
    }
}
