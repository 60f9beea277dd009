//! PostgreSQL backend implementation.
//!
//! Connection pooling via deadpool-postgres; parameters are sent as typed
//! binary values through the extended query protocol.
//!
//! # Example
//!
//! ```ignore
//! use biograph_migrate::db::backends::postgres::PostgresClient;
//! use biograph_migrate::db::{Db, QueryExt};
//!
//! let client = PostgresClient::connect("postgresql://localhost/biograph", 4).await?;
//! client.ping().await?;
//! let db = Db::new(client);
//!
//! let rows = db.query("SELECT id, username FROM users WHERE migrated_from_old_system")
//!     .fetch_all()
//!     .await?;
//! ```

use std::error::Error;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use futures::TryStreamExt;
use serde_json::Value as JsonValue;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::NoTls;

use crate::db::row::{Params, Row, RowStream};
use crate::db::traits::{DbClient, SqlExecutor, Transaction};
use crate::error::AppError;

// ----------------------------------------------------------------------------
// Dynamic parameter binding
// ----------------------------------------------------------------------------

/// A JSON parameter encoded according to the column type Postgres inferred
/// for its placeholder.
///
/// Strings bound to `timestamptz` or `date` placeholders are parsed as
/// RFC 3339 timestamps or `YYYY-MM-DD` dates; objects and arrays are only
/// accepted by `json`/`jsonb` placeholders.
#[derive(Debug, Clone)]
struct SqlParam(JsonValue);

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for SqlParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if *ty == Type::JSON || *ty == Type::JSONB {
            return self.0.to_sql(ty, out);
        }

        match &self.0 {
            JsonValue::Null => Ok(IsNull::Yes),
            JsonValue::Bool(b) => b.to_sql(ty, out),
            JsonValue::Number(n) => {
                if *ty == Type::INT2 {
                    i16::try_from(as_i64(n)?)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(as_i64(n)?)?.to_sql(ty, out)
                } else if *ty == Type::INT8 {
                    as_i64(n)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (as_f64(n)? as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    as_f64(n)?.to_sql(ty, out)
                } else if *ty == Type::TEXT || *ty == Type::VARCHAR {
                    n.to_string().to_sql(ty, out)
                } else {
                    Err(format!("cannot bind number to {}", ty).into())
                }
            }
            JsonValue::String(s) => {
                if *ty == Type::TIMESTAMPTZ {
                    DateTime::parse_from_rfc3339(s)?
                        .with_timezone(&Utc)
                        .to_sql(ty, out)
                } else if *ty == Type::TIMESTAMP {
                    DateTime::parse_from_rfc3339(s)?.naive_utc().to_sql(ty, out)
                } else if *ty == Type::DATE {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql(ty, out)
                } else {
                    s.as_str().to_sql(ty, out)
                }
            }
            JsonValue::Array(_) | JsonValue::Object(_) => {
                Err(format!("cannot bind structured value to {}", ty).into())
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // The placeholder type decides the encoding in `to_sql`
        true
    }

    to_sql_checked!();
}

fn as_i64(n: &serde_json::Number) -> Result<i64, BoxError> {
    n.as_i64()
        .ok_or_else(|| format!("{} is not an integer", n).into())
}

fn as_f64(n: &serde_json::Number) -> Result<f64, BoxError> {
    n.as_f64()
        .ok_or_else(|| format!("{} is not a float", n).into())
}

fn to_sql_params(params: Params) -> Vec<SqlParam> {
    params.into_iter().map(SqlParam).collect()
}

/// PostgreSQL client for the target store.
///
/// This type is cheap to clone - the underlying connection pool is `Arc`-based.
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Creates a new PostgreSQL client with connection pooling.
    ///
    /// No connection is opened until first use; call [`ping`](Self::ping)
    /// to fail fast on unreachable databases.
    pub async fn connect(connection_string: &str, pool_size: usize) -> Result<Self, AppError> {
        let pg_config: tokio_postgres::Config = connection_string.parse().map_err(|e| {
            AppError::Connection(format!("Invalid PostgreSQL connection string: {}", e))
        })?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(pool_size.max(1))
            .build()
            .map_err(|e| AppError::Connection(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Gets a connection from the pool.
    async fn get_connection(&self) -> Result<Object, AppError> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Connection(format!("Failed to get connection from pool: {}", e)))
    }

    /// Round-trips a trivial query to verify the database is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        let conn = self.get_connection().await?;
        conn.batch_execute("SELECT 1")
            .await
            .map_err(|e| AppError::Connection(format!("Ping failed: {}", e)))
    }

    /// Closes the pool. Outstanding connections are dropped when returned.
    pub fn close(&self) {
        self.pool.close();
    }
}

#[async_trait]
impl SqlExecutor for PostgresClient {
    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
        let conn = self.get_connection().await?;
        query_owned(conn, sql.to_string(), to_sql_params(params))
    }

    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
        let conn = self.get_connection().await?;
        execute_pg(&conn, sql, &to_sql_params(params)).await
    }

    async fn batch_sql(&self, sql: &str) -> Result<(), AppError> {
        let conn = self.get_connection().await?;
        batch_pg(&conn, sql).await
    }
}

#[async_trait]
impl DbClient for PostgresClient {
    type Tx<'a> = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Tx<'_>, AppError> {
        let conn = self.get_connection().await?;

        conn.batch_execute("BEGIN")
            .await
            .map_err(|e| AppError::Connection(format!("Failed to begin transaction: {}", e)))?;

        Ok(PostgresTransaction { conn: Some(conn) })
    }
}

/// A transaction pinned to one pooled connection.
///
/// An unfinished transaction is detached from the pool on drop, which
/// closes the connection and lets the server abort it.
pub struct PostgresTransaction {
    conn: Option<Object>,
}

impl PostgresTransaction {
    fn conn(&self) -> Result<&Object, AppError> {
        self.conn
            .as_ref()
            .ok_or_else(|| AppError::Internal("transaction already finished".to_string()))
    }

    async fn finish(&mut self, statement: &str) -> Result<(), AppError> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| AppError::Internal("transaction already finished".to_string()))?;
        conn.batch_execute(statement)
            .await
            .map_err(|e| AppError::Connection(format!("{statement} failed: {e}")))
    }
}

#[async_trait]
impl SqlExecutor for PostgresTransaction {
    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
        let params = to_sql_params(params);
        let stream = self
            .conn()?
            .query_raw(sql, params.iter())
            .await
            .map_err(|e| query_error(e, sql))?;

        Ok(Box::pin(stream.map_ok(|row| parse_pg_row(&row)).map_err(
            |e| AppError::Internal(format!("Failed to fetch row: {}", e)),
        )))
    }

    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
        execute_pg(self.conn()?, sql, &to_sql_params(params)).await
    }

    async fn batch_sql(&self, sql: &str) -> Result<(), AppError> {
        batch_pg(self.conn()?, sql).await
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(mut self) -> Result<(), AppError> {
        self.finish("COMMIT").await
    }

    async fn rollback(mut self) -> Result<(), AppError> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Transaction dropped while open; discarding its connection");
            drop(Object::take(conn));
        }
    }
}

/// Maps a driver error to `AppError`, keeping the server's diagnostic.
///
/// Errors without a database payload mean the connection itself failed.
/// Unique violations surface as [`AppError::Duplicate`].
fn query_error(e: tokio_postgres::Error, sql: &str) -> AppError {
    match e.as_db_error() {
        Some(db_err) if db_err.code() == &SqlState::UNIQUE_VIOLATION => AppError::Duplicate(
            db_err
                .detail()
                .unwrap_or_else(|| db_err.message())
                .to_string(),
        ),
        Some(db_err) => AppError::Query {
            message: format!(
                "{}: {} [{}] (detail: {:?})",
                db_err.severity(),
                db_err.message(),
                db_err.code().code(),
                db_err.detail()
            ),
            query: sql.to_string(),
        },
        None if e.is_closed() => AppError::Connection(e.to_string()),
        None => AppError::Query {
            message: e.to_string(),
            query: sql.to_string(),
        },
    }
}

async fn execute_pg(conn: &Object, sql: &str, params: &[SqlParam]) -> Result<u64, AppError> {
    conn.execute_raw(sql, params.iter())
        .await
        .map_err(|e| query_error(e, sql))
}

async fn batch_pg(conn: &Object, sql: &str) -> Result<(), AppError> {
    conn.batch_execute(sql).await.map_err(|e| query_error(e, sql))
}

/// Runs a query on an owned connection.
///
/// Used for auto-commit queries on the client, where the connection must
/// live as long as the returned stream.
fn query_owned(
    conn: Object,
    sql: String,
    params: Vec<SqlParam>,
) -> Result<RowStream<'static>, AppError> {
    use async_stream::try_stream;

    Ok(Box::pin(try_stream! {
        // conn is captured by the generator and kept alive
        let stream = conn
            .query_raw(sql.as_str(), params.iter())
            .await
            .map_err(|e| query_error(e, &sql))?;

        futures::pin_mut!(stream);
        while let Some(pg_row) = stream.try_next().await.map_err(|e| {
            AppError::Internal(format!("Failed to fetch row: {}", e))
        })? {
            yield parse_pg_row(&pg_row);
        }
    }))
}

/// Parses a PostgreSQL row into our generic Row type.
///
/// Values are converted to their JSON equivalents; timestamps become
/// RFC 3339 strings and dates `YYYY-MM-DD`.
fn parse_pg_row(pg_row: &tokio_postgres::Row) -> Row {
    let mut columns = serde_json::Map::new();

    for (idx, column) in pg_row.columns().iter().enumerate() {
        let name = column.name().to_string();

        let value = match column.type_().name() {
            "int2" => pg_row
                .try_get::<_, Option<i16>>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::Number(v.into())),
            "int4" => pg_row
                .try_get::<_, Option<i32>>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::Number(v.into())),
            "int8" => pg_row
                .try_get::<_, Option<i64>>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::Number(v.into())),
            "float8" => pg_row
                .try_get::<_, Option<f64>>(idx)
                .ok()
                .flatten()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number),
            "bool" => pg_row
                .try_get::<_, Option<bool>>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool),
            "json" | "jsonb" => pg_row.try_get::<_, Option<JsonValue>>(idx).ok().flatten(),
            "_text" => pg_row
                .try_get::<_, Option<Vec<String>>>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::Array(v.into_iter().map(JsonValue::String).collect())),
            "timestamptz" => pg_row
                .try_get::<_, Option<DateTime<Utc>>>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_rfc3339())),
            "timestamp" => pg_row
                .try_get::<_, Option<NaiveDateTime>>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.and_utc().to_rfc3339())),
            "date" => pg_row
                .try_get::<_, Option<NaiveDate>>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.format("%Y-%m-%d").to_string())),
            _ => pg_row
                .try_get::<_, Option<String>>(idx)
                .ok()
                .flatten()
                .map(JsonValue::String),
        };

        columns.insert(name, value.unwrap_or(JsonValue::Null));
    }

    Row::new(columns)
}
