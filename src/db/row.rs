//! Result rows and positional parameters.
//!
//! Column values travel as JSON so repositories can decode either single
//! columns or a whole row into a `Deserialize` model.

use std::pin::Pin;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;

/// Positional parameters for SQL statements, bound as `$1..$n`.
pub type Params = Vec<JsonValue>;

/// Rows fetched on demand from an open statement.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, AppError>> + Send + 'a>>;

/// One result row, columns in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Map<String, JsonValue>,
}

fn decode_error(what: &str, err: serde_json::Error) -> AppError {
    AppError::Internal(format!("failed to decode {what}: {err}"))
}

impl Row {
    pub fn new(columns: Map<String, JsonValue>) -> Self {
        Self { columns }
    }

    /// Decodes one column. A missing column is an error.
    ///
    /// ```ignore
    /// let created_at: DateTime<Utc> = row.get("created_at")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, column: &str) -> Result<T, AppError> {
        let value = self
            .columns
            .get(column)
            .ok_or_else(|| AppError::Internal(format!("column not found: {column}")))?;
        T::deserialize(value).map_err(|e| decode_error(&format!("column '{column}'"), e))
    }

    /// Decodes one column, treating NULL and absence alike.
    pub fn get_opt<T: DeserializeOwned>(&self, column: &str) -> Result<Option<T>, AppError> {
        match self.columns.get(column) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| decode_error(&format!("column '{column}'"), e)),
        }
    }

    /// Decodes the whole row into a model whose fields match the column names.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        T::deserialize(&JsonValue::Object(self.columns.clone()))
            .map_err(|e| decode_error("row", e))
    }

    /// Reads a `COUNT(*)` style column; NULL reads as zero.
    pub fn count(&self, column: &str) -> Result<u64, AppError> {
        let count: Option<i64> = self.get_opt(column)?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    pub fn get_raw(&self, column: &str) -> Option<&JsonValue> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, JsonValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, JsonValue)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
