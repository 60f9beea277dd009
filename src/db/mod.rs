//! Target-store access.
//!
//! Repositories talk to a [`Db`] wrapping some [`DbClient`]; the only
//! backend is Postgres ([`backends::postgres`]). Values cross the boundary
//! as JSON and are coerced to the column types the server reports.
//!
//! ```ignore
//! let existing = sql!(db, "SELECT id FROM users WHERE phone_number = $1", phone)
//!     .fetch_one()
//!     .await?;
//! ```

mod macros;
mod query;
mod row;
mod traits;

pub mod backends;

pub use query::{Query, QueryExt};
pub use row::{Params, Row, RowStream};
pub use traits::{DbClient, SqlExecutor, Transaction};

#[doc(inline)]
pub use crate::sql;

use std::future::Future;

use crate::error::AppError;

/// Repository-facing handle over a pooled client.
pub struct Db<C: DbClient> {
    client: C,
}

impl<C: DbClient> Db<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Auto-commit statement builder.
    pub fn query(&self, sql: &str) -> Query<'_, C> {
        Query::new(&self.client, sql)
    }

    /// Runs `f` inside one transaction. `f` owns the transaction and must
    /// commit it; returning without committing rolls back on drop.
    ///
    /// ```ignore
    /// db.transaction(|txn| async move {
    ///     txn.query(INSERT_USER).bind(&id).execute().await?;
    ///     txn.query(INSERT_PROFILE).bind(&id).execute().await?;
    ///     txn.commit().await
    /// })
    /// .await?;
    /// ```
    pub async fn transaction<F, R, Fut>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(C::Tx<'_>) -> Fut,
        Fut: Future<Output = Result<R, AppError>>,
    {
        let txn = self.client.begin().await?;
        f(txn).await
    }
}

#[async_trait::async_trait]
impl<C: DbClient> SqlExecutor for Db<C> {
    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
        self.client.query_sql(sql, params).await
    }

    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
        self.client.execute_sql(sql, params).await
    }

    async fn batch_sql(&self, sql: &str) -> Result<(), AppError> {
        self.client.batch_sql(sql).await
    }
}
