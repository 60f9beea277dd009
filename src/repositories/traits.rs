//! Store seams used by the migration services.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{ContentKind, MigratedUser, NewContent, NewMigratedUser};

/// Target user store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by normalized phone number.
    async fn find_by_phone(&self, phone: &str) -> Result<Option<MigratedUser>, AppError>;

    /// Finds a user by legacy `_id`.
    async fn find_by_old_user_id(&self, old_user_id: &str)
        -> Result<Option<MigratedUser>, AppError>;

    /// Creates the user and its profile atomically.
    ///
    /// A uniqueness conflict is reported as [`AppError::Duplicate`].
    async fn create(&self, user: &NewMigratedUser) -> Result<MigratedUser, AppError>;

    /// Number of users carrying the migration marker.
    async fn count_migrated(&self) -> Result<u64, AppError>;
}

/// Target content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Migrated user id for a legacy user `_id`.
    async fn user_id_for_legacy(&self, old_user_id: &str) -> Result<Option<String>, AppError>;

    /// Id of an already migrated content row.
    async fn find_id(&self, kind: ContentKind, old_id: &str) -> Result<Option<String>, AppError>;

    /// Inserts a content row, returning its new id.
    async fn create(&self, content: &NewContent) -> Result<String, AppError>;

    async fn count(&self, kind: ContentKind) -> Result<u64, AppError>;
}
