//! Content tables, one per legacy content collection.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::db::SqlExecutor;
use crate::error::AppError;
use crate::migrations::Migration;
use crate::models::ContentKind;

/// Biographs, books, notifications, recorded times and subscriptions.
///
/// Kind-specific fields live in the `data` JSONB column; owner links and
/// the legacy back-reference are real columns.
pub struct M002Content;

impl M002Content {
    fn table_ddl(kind: ContentKind) -> String {
        let owners = kind
            .owner_fields()
            .iter()
            .map(|owner| {
                format!(
                    "{} TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,",
                    owner.column
                )
            })
            .collect::<Vec<_>>()
            .join("\n    ");

        format!(
            r#"
CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    {owners}
    {legacy} TEXT NOT NULL UNIQUE,
    migrated_from_old_system BOOLEAN NOT NULL DEFAULT TRUE,
    data JSONB NOT NULL DEFAULT '{{}}',
    created_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#,
            table = kind.table(),
            owners = owners,
            legacy = kind.legacy_id_column(),
        )
    }
}

impl Migration for M002Content {
    fn id(&self) -> &'static str {
        "m002_content"
    }

    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Content tables keyed to migrated users"
    }

    fn up<'a>(&'a self, ctx: &'a (dyn SqlExecutor + Sync)) -> BoxFuture<'a, Result<(), AppError>> {
        async move {
            for kind in ContentKind::all() {
                ctx.batch_sql(&Self::table_ddl(*kind)).await?;
            }
            Ok(())
        }
        .boxed()
    }
}
