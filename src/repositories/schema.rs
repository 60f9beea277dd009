//! Schema version and row counts for the `status` command.

use crate::context::{AppDb, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::migrations::current_version;
use crate::models::ContentKind;
use crate::sql;

#[derive(FromContext, Clone)]
pub struct SchemaRepository {
    db: AppDb,
}

/// Snapshot of the target store.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub schema_version: u32,
    pub applied_migrations: Vec<String>,
    pub migrated_users: u64,
    pub total_users: u64,
    /// Rows per content table, in migration order.
    pub content: Vec<(ContentKind, u64)>,
}

impl SchemaRepository {
    /// Whether `init` has run at least once.
    pub async fn is_initialized(&self) -> Result<bool, AppError> {
        let row = sql!(
            self.db,
            "SELECT to_regclass('public.schema_version') IS NOT NULL AS present"
        )
        .fetch_one()
        .await?;
        Ok(row.map(|r| r.get::<bool>("present")).transpose()?.unwrap_or(false))
    }

    pub async fn get_applied_migrations(&self) -> Result<Vec<String>, AppError> {
        let row = sql!(
            self.db,
            "SELECT applied_migrations FROM schema_version WHERE id = 1"
        )
        .fetch_one()
        .await?;
        match row {
            Some(row) => Ok(row.get_opt("applied_migrations")?.unwrap_or_default()),
            None => Ok(vec![]),
        }
    }

    pub async fn get_stats(&self) -> Result<StoreStats, AppError> {
        let schema_version = current_version(&*self.db).await?;
        let applied_migrations = self.get_applied_migrations().await?;

        let row = sql!(
            self.db,
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE migrated_from_old_system) AS migrated
             FROM users"
        )
        .fetch_one()
        .await?;
        let (total_users, migrated_users) = match row {
            Some(row) => (row.count("total")?, row.count("migrated")?),
            None => (0, 0),
        };

        let mut content = Vec::with_capacity(ContentKind::all().len());
        for kind in ContentKind::all() {
            let query = format!("SELECT COUNT(*) AS count FROM {}", kind.table());
            let row = sql!(self.db, &query).fetch_one().await?;
            let rows = row.map(|r| r.count("count")).transpose()?.unwrap_or(0);
            content.push((*kind, rows));
        }

        Ok(StoreStats {
            schema_version,
            applied_migrations,
            migrated_users,
            total_users,
            content,
        })
    }
}

