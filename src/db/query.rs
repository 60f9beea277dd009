//! Query builder for fluent SQL statement construction.

use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::db::row::{Params, Row, RowStream};
use crate::db::traits::SqlExecutor;
use crate::error::AppError;

/// A builder for binding parameters and executing SQL against any
/// [`SqlExecutor`].
///
/// Values are bound positionally: the first `bind` is `$1`.
///
/// ```ignore
/// let rows = Query::new(&client, "SELECT id FROM users WHERE phone_number = $1")
///     .bind("+18479873207")
///     .fetch_all()
///     .await?;
/// ```
pub struct Query<'a, E: SqlExecutor + ?Sized> {
    executor: &'a E,
    sql: String,
    params: Params,
    bind_error: Option<AppError>,
}

impl<'a, E: SqlExecutor + ?Sized> Query<'a, E> {
    /// Creates a new query builder.
    pub fn new(executor: &'a E, sql: &str) -> Self {
        Self {
            executor,
            sql: sql.to_string(),
            params: Params::new(),
            bind_error: None,
        }
    }

    /// Binds the next positional parameter.
    ///
    /// A value that fails to serialize is reported when the query runs.
    pub fn bind<T: Serialize>(mut self, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => self.params.push(json),
            Err(e) => {
                if self.bind_error.is_none() {
                    self.bind_error = Some(AppError::Internal(format!(
                        "failed to serialize parameter ${}: {}",
                        self.params.len() + 1,
                        e
                    )));
                }
                self.params.push(JsonValue::Null);
            }
        }
        self
    }

    /// Binds a parameter that's already a JSON value.
    pub fn bind_raw(mut self, value: JsonValue) -> Self {
        self.params.push(value);
        self
    }

    /// Executes the query and returns a stream of rows.
    pub async fn stream(self) -> Result<RowStream<'a>, AppError> {
        if let Some(err) = self.bind_error {
            return Err(err);
        }
        self.executor.query_sql(&self.sql, self.params).await
    }

    /// Executes the query and collects all rows into a vector.
    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        self.stream().await?.try_collect().await
    }

    /// Executes the query and returns the first row, if any.
    pub async fn fetch_one(self) -> Result<Option<Row>, AppError> {
        use futures::StreamExt;
        let mut stream = self.stream().await?;
        stream.next().await.transpose()
    }

    /// Executes a statement and returns the number of affected rows.
    pub async fn execute(self) -> Result<u64, AppError> {
        if let Some(err) = self.bind_error {
            return Err(err);
        }
        self.executor.execute_sql(&self.sql, self.params).await
    }
}

/// Extension trait providing `executor.query("...")`.
pub trait QueryExt: SqlExecutor {
    /// Creates a new query builder for this executor.
    fn query(&self, sql: &str) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self, sql)
    }
}

// Blanket implementation for all SqlExecutor types
impl<E: SqlExecutor> QueryExt for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Mock executor asserting the exact statement and parameters
    struct MockExecutor {
        expected_sql: String,
        expected_params: Params,
    }

    #[async_trait::async_trait]
    impl SqlExecutor for MockExecutor {
        async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
            assert_eq!(sql, self.expected_sql);
            assert_eq!(params, self.expected_params);
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
            assert_eq!(sql, self.expected_sql);
            assert_eq!(params, self.expected_params);
            Ok(1)
        }

        async fn batch_sql(&self, _sql: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_query_no_params() {
        let executor = MockExecutor {
            expected_sql: "SELECT COUNT(*) AS count FROM users".to_string(),
            expected_params: vec![],
        };

        let rows = executor
            .query("SELECT COUNT(*) AS count FROM users")
            .fetch_all()
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_query_binds_in_order() {
        let executor = MockExecutor {
            expected_sql: "SELECT id FROM users WHERE phone_number = $1 OR old_user_id = $2"
                .to_string(),
            expected_params: vec![json!("+18479873207"), json!("5f1a")],
        };

        let row = executor
            .query("SELECT id FROM users WHERE phone_number = $1 OR old_user_id = $2")
            .bind("+18479873207")
            .bind("5f1a")
            .fetch_one()
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_execute_returns_affected_rows() {
        let executor = MockExecutor {
            expected_sql: "DELETE FROM users WHERE id = $1".to_string(),
            expected_params: vec![json!("01H")],
        };

        let affected = executor
            .query("DELETE FROM users WHERE id = $1")
            .bind("01H")
            .execute()
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_optional_binds_as_null() {
        let executor = MockExecutor {
            expected_sql: "UPDATE users SET email = $1".to_string(),
            expected_params: vec![JsonValue::Null],
        };

        let email: Option<&str> = None;
        executor
            .query("UPDATE users SET email = $1")
            .bind(email)
            .execute()
            .await
            .unwrap();
    }
}
