//! Postgres content repository.
//!
//! Table and column names come from the static [`ContentKind`] tables,
//! never from legacy data, so they are safe to format into statements.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::context::{AppDb, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{generate_ulid, ContentKind, NewContent};
use crate::repositories::ContentStore;
use crate::sql;

#[derive(FromContext, Clone)]
pub struct ContentRepository {
    db: AppDb,
}

/// Builds the INSERT for a kind: id, owners, legacy id, data, dates.
fn insert_statement(kind: ContentKind) -> String {
    let mut columns = vec!["id"];
    columns.extend(kind.owner_fields().iter().map(|o| o.column));
    columns.extend([kind.legacy_id_column(), "data", "created_date", "updated_date"]);

    let n = columns.len();
    let mut values: Vec<String> = (1..=n - 2).map(|i| format!("${i}")).collect();
    values.push(format!("COALESCE(${}, NOW())", n - 1));
    values.push(format!("COALESCE(${}, NOW())", n));

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        kind.table(),
        columns.join(", "),
        values.join(", ")
    )
}

#[async_trait]
impl ContentStore for ContentRepository {
    async fn user_id_for_legacy(&self, old_user_id: &str) -> Result<Option<String>, AppError> {
        let row = sql!(
            self.db,
            "SELECT id FROM users WHERE old_user_id = $1 LIMIT 1",
            old_user_id
        )
        .fetch_one()
        .await?;
        row.map(|r| r.get("id")).transpose()
    }

    async fn find_id(&self, kind: ContentKind, old_id: &str) -> Result<Option<String>, AppError> {
        let query = format!(
            "SELECT id FROM {} WHERE {} = $1 LIMIT 1",
            kind.table(),
            kind.legacy_id_column()
        );
        let row = sql!(self.db, &query, old_id).fetch_one().await?;
        row.map(|r| r.get("id")).transpose()
    }

    async fn create(&self, content: &NewContent) -> Result<String, AppError> {
        let id = generate_ulid();
        let statement = insert_statement(content.kind);

        let mut query = self.db.query(&statement).bind(&id);
        for (_, user_id) in &content.owners {
            query = query.bind(user_id);
        }
        query
            .bind(&content.old_id)
            .bind_raw(JsonValue::Object(content.data.clone()))
            .bind(content.created_date)
            .bind(content.updated_date)
            .execute()
            .await?;
        Ok(id)
    }

    async fn count(&self, kind: ContentKind) -> Result<u64, AppError> {
        let query = format!("SELECT COUNT(*) AS count FROM {}", kind.table());
        let row = sql!(self.db, &query).fetch_one().await?;
        Ok(row.map(|r| r.count("count")).transpose()?.unwrap_or(0))
    }
}
