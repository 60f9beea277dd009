//! Users and profiles.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::db::SqlExecutor;
use crate::error::AppError;
use crate::migrations::Migration;

/// Migrated users with their one-to-one profile rows.
pub struct M001Users;

impl Migration for M001Users {
    fn id(&self) -> &'static str {
        "m001_users"
    }

    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &'static str {
        "Users and user profiles with legacy back-references"
    }

    fn up<'a>(&'a self, ctx: &'a (dyn SqlExecutor + Sync)) -> BoxFuture<'a, Result<(), AppError>> {
        async move {
            ctx.batch_sql(
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL,
                    phone_number TEXT NOT NULL UNIQUE,
                    country_code TEXT NOT NULL,
                    first_name TEXT NOT NULL DEFAULT '',
                    last_name TEXT NOT NULL DEFAULT '',
                    email TEXT,
                    profile_picture TEXT,
                    is_phone_verified BOOLEAN NOT NULL DEFAULT FALSE,
                    is_premium_member BOOLEAN NOT NULL DEFAULT FALSE,
                    migrated_from_old_system BOOLEAN NOT NULL DEFAULT FALSE,
                    old_user_id TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- At most one migrated user per legacy id
                CREATE UNIQUE INDEX IF NOT EXISTS users_old_user_id_idx
                ON users (old_user_id) WHERE old_user_id IS NOT NULL;

                CREATE TABLE IF NOT EXISTS user_profiles (
                    user_id TEXT PRIMARY KEY REFERENCES users (id) ON DELETE CASCADE,
                    profile_visibility TEXT NOT NULL DEFAULT 'friends',
                    email_notifications BOOLEAN NOT NULL DEFAULT TRUE,
                    push_notifications BOOLEAN NOT NULL DEFAULT TRUE,
                    sms_notifications BOOLEAN NOT NULL DEFAULT FALSE,
                    theme TEXT NOT NULL DEFAULT 'auto'
                );
                "#,
            )
            .await?;

            Ok(())
        }
        .boxed()
    }
}
