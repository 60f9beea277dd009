//! Applies pending migrations and tracks the schema version.
//!
//! The version row lives in `schema_version` and is bumped inside the same
//! transaction as the migration it records, so a failed step leaves both
//! the tables and the version at the last good state.

use futures::TryStreamExt;
use serde_json::json;

use crate::db::{DbClient, SqlExecutor, Transaction};
use crate::error::AppError;
use crate::migrations::{create_register, Migration};

/// Outcome of an `init` run.
#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub previous_version: u32,
    pub current_version: u32,
    /// Ids of the steps applied by this call, oldest first.
    pub applied_migrations: Vec<String>,
}

const VERSION_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY DEFAULT 1 CHECK (id = 1),
    version INTEGER NOT NULL DEFAULT 0,
    applied_migrations TEXT[] NOT NULL DEFAULT '{}',
    last_applied_at TIMESTAMPTZ DEFAULT NOW()
);

INSERT INTO schema_version (id, version) VALUES (1, 0)
ON CONFLICT (id) DO NOTHING;
"#;

const RECORD_VERSION: &str = "UPDATE schema_version
    SET version = $1,
        applied_migrations = array_append(applied_migrations, $2),
        last_applied_at = NOW()
    WHERE id = 1";

/// Brings the target schema up to the latest version.
pub async fn run_migrations<C: DbClient>(client: &C) -> Result<MigrationResult, AppError> {
    client.batch_sql(VERSION_TABLE_DDL).await?;

    let previous_version = current_version(client).await?;
    let register = create_register();
    let mut result = MigrationResult {
        previous_version,
        current_version: previous_version,
        applied_migrations: Vec::new(),
    };

    for migration in register.pending(previous_version) {
        tracing::info!(
            id = migration.id(),
            version = migration.version(),
            "Applying migration: {}",
            migration.description()
        );
        apply(client, migration).await?;
        result.current_version = migration.version();
        result.applied_migrations.push(migration.id().to_string());
    }

    Ok(result)
}

async fn apply<C: DbClient>(client: &C, migration: &dyn Migration) -> Result<(), AppError> {
    let txn = client.begin().await?;
    let outcome = async {
        migration.up(&txn).await?;
        txn.execute_sql(
            RECORD_VERSION,
            vec![json!(migration.version()), json!(migration.id())],
        )
        .await
    }
    .await;

    match outcome {
        Ok(_) => txn.commit().await,
        Err(e) => {
            tracing::error!(id = migration.id(), "Migration failed: {}", e);
            txn.rollback().await?;
            Err(e)
        }
    }
}

/// Stored schema version; 0 when nothing has been applied.
pub async fn current_version<E>(executor: &E) -> Result<u32, AppError>
where
    E: SqlExecutor + ?Sized,
{
    let row = executor
        .query_sql("SELECT version FROM schema_version WHERE id = 1", Vec::new())
        .await?
        .try_next()
        .await?;
    Ok(row.map(|r| r.count("version")).transpose()?.unwrap_or(0) as u32)
}
