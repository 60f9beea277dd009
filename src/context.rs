//! Application context providing the dependency injection root.

use std::sync::Arc;

use crate::config::Config;
use crate::db::backends::postgres::PostgresClient;
use crate::db::Db;
use crate::di::Context as ContextDerive;
use crate::error::AppError;

/// Shared handle to the target store.
pub type AppDb = Arc<Db<PostgresClient>>;

/// Root application context.
///
/// `#[derive(Context)]` generates `FromRef` implementations for each
/// field, so repositories can be resolved with `Repo::from_ref(&ctx)`.
#[derive(ContextDerive, Clone)]
pub struct Context {
    /// Pooled Postgres connection.
    pub db: AppDb,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    /// Creates a context from already-open dependencies.
    pub fn new(client: PostgresClient, config: Config) -> Self {
        Self {
            db: Arc::new(Db::new(client)),
            config: Arc::new(config),
        }
    }

    /// Opens the target store and verifies it answers before returning.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let client = PostgresClient::connect(&config.postgres.uri, config.postgres.pool_size).await?;
        client.ping().await?;
        Ok(Self::new(client, config))
    }

    /// Closes the connection pool. Checked-out connections finish their work first.
    pub fn close(&self) {
        self.db.client().close();
    }
}
