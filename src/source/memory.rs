//! In-memory legacy source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::LegacyDocument;
use crate::source::{LegacySource, SourceFilter};

/// Collections held in memory, returned in insertion order.
#[derive(Debug, Default)]
pub struct MemorySource {
    collections: HashMap<String, Vec<LegacyDocument>>,
    closed: AtomicBool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends documents to a collection.
    pub fn with_documents(
        mut self,
        collection: &str,
        docs: impl IntoIterator<Item = LegacyDocument>,
    ) -> Self {
        self.insert(collection, docs);
        self
    }

    pub fn insert(&mut self, collection: &str, docs: impl IntoIterator<Item = LegacyDocument>) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// Names of the loaded collections, sorted.
    pub fn collection_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.collections.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        if self.is_closed() {
            return Err(AppError::SourceConnection("source already closed".to_string()));
        }
        Ok(())
    }

    fn matching<'a>(
        &'a self,
        collection: &str,
        filter: &'a SourceFilter,
    ) -> impl Iterator<Item = &'a LegacyDocument> + 'a {
        self.collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(move |doc| filter.matches(doc))
    }
}

#[async_trait]
impl LegacySource for MemorySource {
    fn describe(&self) -> String {
        format!("in-memory ({} collections)", self.collections.len())
    }

    async fn fetch(
        &self,
        collection: &str,
        filter: &SourceFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<LegacyDocument>, AppError> {
        self.ensure_open()?;
        Ok(self
            .matching(collection, filter)
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, collection: &str, filter: &SourceFilter) -> Result<u64, AppError> {
        self.ensure_open()?;
        Ok(self.matching(collection, filter).count() as u64)
    }

    async fn close(&self) -> Result<(), AppError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
