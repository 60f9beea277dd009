//! Duplicate detection for user records.

use std::collections::HashSet;

use crate::error::AppError;
use crate::models::{MigratedUser, NewMigratedUser};
use crate::repositories::UserStore;

/// Why a record counts as already migrated.
#[derive(Debug, Clone, PartialEq)]
pub enum Duplicate {
    /// A stored user already has this phone number or legacy id.
    Existing(MigratedUser),
    /// Claimed earlier in the same run but not written (dry run).
    ClaimedInRun,
}

impl Duplicate {
    pub fn existing_id(&self) -> Option<String> {
        match self {
            Duplicate::Existing(user) => Some(user.id.clone()),
            Duplicate::ClaimedInRun => None,
        }
    }
}

/// Checks candidates against the target store and against keys claimed
/// earlier in the current run.
///
/// The normalized phone is the canonical key; the legacy id is checked too
/// so a record whose phone changed between runs is not migrated twice.
pub struct DuplicateGuard<'a, U: UserStore + ?Sized> {
    store: &'a U,
    claimed_phones: HashSet<String>,
    claimed_ids: HashSet<String>,
}

impl<'a, U: UserStore + ?Sized> DuplicateGuard<'a, U> {
    pub fn new(store: &'a U) -> Self {
        Self {
            store,
            claimed_phones: HashSet::new(),
            claimed_ids: HashSet::new(),
        }
    }

    pub async fn check(&self, user: &NewMigratedUser) -> Result<Option<Duplicate>, AppError> {
        if self.claimed_phones.contains(&user.phone_number)
            || self.claimed_ids.contains(&user.old_user_id)
        {
            return Ok(Some(Duplicate::ClaimedInRun));
        }
        if let Some(existing) = self.store.find_by_phone(&user.phone_number).await? {
            return Ok(Some(Duplicate::Existing(existing)));
        }
        if let Some(existing) = self.store.find_by_old_user_id(&user.old_user_id).await? {
            return Ok(Some(Duplicate::Existing(existing)));
        }
        Ok(None)
    }

    /// Marks a record as taken for the rest of the run.
    pub fn claim(&mut self, user: &NewMigratedUser) {
        self.claimed_phones.insert(user.phone_number.clone());
        self.claimed_ids.insert(user.old_user_id.clone());
    }
}
