//! In-memory stores with the same uniqueness rules as the Postgres schema.
//!
//! Used by dry runs in tests and by the pipeline tests under `tests/`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{generate_ulid, ContentKind, MigratedUser, NewContent, NewMigratedUser};
use crate::repositories::{ContentStore, UserStore};

#[derive(Debug, Clone)]
pub struct StoredContent {
    pub id: String,
    pub content: NewContent,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<MigratedUser>,
    content: HashMap<ContentKind, Vec<StoredContent>>,
}

/// Users and content kept in a mutex-guarded vector.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an existing (non-migrated) user, e.g. someone who signed up
    /// on the new platform before the migration.
    pub fn seed_user(&self, user: MigratedUser) {
        self.lock().users.push(user);
    }

    pub fn users(&self) -> Vec<MigratedUser> {
        self.lock().users.clone()
    }

    pub fn content(&self, kind: ContentKind) -> Vec<StoredContent> {
        self.lock().content.get(&kind).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-insert.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<MigratedUser>, AppError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.phone_number == phone)
            .cloned())
    }

    async fn find_by_old_user_id(
        &self,
        old_user_id: &str,
    ) -> Result<Option<MigratedUser>, AppError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.old_user_id.as_deref() == Some(old_user_id))
            .cloned())
    }

    async fn create(&self, new: &NewMigratedUser) -> Result<MigratedUser, AppError> {
        let mut state = self.lock();
        if state.users.iter().any(|u| u.phone_number == new.phone_number) {
            return Err(AppError::Duplicate(format!(
                "Key (phone_number)=({}) already exists.",
                new.phone_number
            )));
        }
        if state
            .users
            .iter()
            .any(|u| u.old_user_id.as_deref() == Some(new.old_user_id.as_str()))
        {
            return Err(AppError::Duplicate(format!(
                "Key (old_user_id)=({}) already exists.",
                new.old_user_id
            )));
        }
        let user = MigratedUser::from_new(new);
        state.users.push(user.clone());
        Ok(user)
    }

    async fn count_migrated(&self) -> Result<u64, AppError> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|u| u.migrated_from_old_system)
            .count() as u64)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn user_id_for_legacy(&self, old_user_id: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .find_by_old_user_id(old_user_id)
            .await?
            .map(|u| u.id))
    }

    async fn find_id(&self, kind: ContentKind, old_id: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .lock()
            .content
            .get(&kind)
            .and_then(|rows| rows.iter().find(|r| r.content.old_id == old_id))
            .map(|r| r.id.clone()))
    }

    async fn create(&self, content: &NewContent) -> Result<String, AppError> {
        let mut state = self.lock();
        let rows = state.content.entry(content.kind).or_default();
        if rows.iter().any(|r| r.content.old_id == content.old_id) {
            return Err(AppError::Duplicate(format!(
                "Key ({})=({}) already exists.",
                content.kind.legacy_id_column(),
                content.old_id
            )));
        }
        let id = generate_ulid();
        rows.push(StoredContent {
            id: id.clone(),
            content: content.clone(),
        });
        Ok(id)
    }

    async fn count(&self, kind: ContentKind) -> Result<u64, AppError> {
        Ok(self.lock().content.get(&kind).map_or(0, |rows| rows.len()) as u64)
    }
}
