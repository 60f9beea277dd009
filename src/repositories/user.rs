//! Postgres user repository.

use async_trait::async_trait;

use crate::context::{AppDb, Context};
use crate::db::{QueryExt, Transaction};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{MigratedUser, NewMigratedUser};
use crate::repositories::UserStore;
use crate::sql;

const USER_COLUMNS: &str = "id, username, phone_number, country_code, first_name, last_name, \
     email, migrated_from_old_system, old_user_id, created_at";

/// Users and their profiles in the target store.
#[derive(FromContext, Clone)]
pub struct UserRepository {
    db: AppDb,
}

impl UserRepository {
    async fn find_one(&self, column: &str, value: &str) -> Result<Option<MigratedUser>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 LIMIT 1");
        let row = sql!(self.db, &query, value).fetch_one().await?;
        row.map(|r| r.decode()).transpose()
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<MigratedUser>, AppError> {
        self.find_one("phone_number", phone).await
    }

    async fn find_by_old_user_id(
        &self,
        old_user_id: &str,
    ) -> Result<Option<MigratedUser>, AppError> {
        self.find_one("old_user_id", old_user_id).await
    }

    async fn create(&self, new: &NewMigratedUser) -> Result<MigratedUser, AppError> {
        let user = MigratedUser::from_new(new);
        let updated_at = new.updated_at.unwrap_or(user.created_at);
        let profile = &new.profile;

        self.db
            .transaction(|txn| async move {
                let inserted = async {
                    sql!(
                        txn,
                        "INSERT INTO users (
                            id, username, phone_number, country_code, first_name, last_name,
                            email, profile_picture, is_phone_verified, is_premium_member,
                            migrated_from_old_system, old_user_id, created_at, updated_at
                         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, TRUE, $10, $11, $12)",
                        &user.id,
                        &user.username,
                        &user.phone_number,
                        &user.country_code,
                        &user.first_name,
                        &user.last_name,
                        &user.email,
                        &new.profile_picture,
                        new.is_premium_member,
                        &new.old_user_id,
                        user.created_at,
                        updated_at
                    )
                    .execute()
                    .await?;

                    sql!(
                        txn,
                        "INSERT INTO user_profiles (
                            user_id, profile_visibility, email_notifications,
                            push_notifications, sms_notifications, theme
                         ) VALUES ($1, $2, $3, $4, $5, $6)",
                        &user.id,
                        profile.profile_visibility.as_str(),
                        profile.email_notifications,
                        profile.push_notifications,
                        profile.sms_notifications,
                        &profile.theme
                    )
                    .execute()
                    .await?;
                    Ok::<_, AppError>(())
                }
                .await;

                match inserted {
                    Ok(()) => {
                        txn.commit().await?;
                        Ok(user)
                    }
                    Err(e) => {
                        txn.rollback().await?;
                        Err(e)
                    }
                }
            })
            .await
    }

    async fn count_migrated(&self) -> Result<u64, AppError> {
        let row = sql!(
            self.db,
            "SELECT COUNT(*) AS count FROM users WHERE migrated_from_old_system"
        )
        .fetch_one()
        .await?;
        Ok(row.map(|r| r.count("count")).transpose()?.unwrap_or(0))
    }
}
