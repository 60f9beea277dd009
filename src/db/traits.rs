//! Backend contract for the target store.

use async_trait::async_trait;

use crate::db::row::{Params, RowStream};
use crate::error::AppError;

/// Runs SQL with `$n` positional parameters.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Rows are streamed; collect or take the first as needed.
    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError>;

    /// Returns the affected row count.
    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError>;

    /// Parameterless multi-statement script, used for schema DDL.
    async fn batch_sql(&self, sql: &str) -> Result<(), AppError>;
}

/// An open transaction. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn commit(self) -> Result<(), AppError>;
    async fn rollback(self) -> Result<(), AppError>;
}

/// A pooled client. Statements on the client itself auto-commit.
#[async_trait]
pub trait DbClient: SqlExecutor {
    type Tx<'a>: Transaction + SqlExecutor
    where
        Self: 'a;

    /// Checks out a connection and issues `BEGIN`.
    async fn begin(&self) -> Result<Self::Tx<'_>, AppError>;
}
