//! Migrated user model and its creation payload.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Profile visibility in the new schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    Public,
    Friends,
    Private,
}

impl ProfileVisibility {
    /// Maps a legacy `profile_settings` code.
    ///
    /// `P` (public), `F` (friends) and `O` (only me) are the only codes the
    /// old service wrote; anything else falls back to friends.
    pub fn from_legacy_code(code: Option<&str>) -> Self {
        match code {
            Some("P") => ProfileVisibility::Public,
            Some("F") => ProfileVisibility::Friends,
            Some("O") => ProfileVisibility::Private,
            _ => ProfileVisibility::Friends,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileVisibility::Public => "public",
            ProfileVisibility::Friends => "friends",
            ProfileVisibility::Private => "private",
        }
    }
}

impl std::fmt::Display for ProfileVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(ProfileVisibility::Public),
            "friends" => Ok(ProfileVisibility::Friends),
            "private" => Ok(ProfileVisibility::Private),
            _ => Err(format!(
                "Invalid profile visibility '{}'. Valid values: public, friends, private",
                s
            )),
        }
    }
}

/// Profile row created alongside every migrated user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUserProfile {
    pub profile_visibility: ProfileVisibility,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub sms_notifications: bool,
    pub theme: String,
}

impl Default for NewUserProfile {
    fn default() -> Self {
        Self {
            profile_visibility: ProfileVisibility::Friends,
            email_notifications: true,
            push_notifications: true,
            sms_notifications: false,
            theme: "auto".to_string(),
        }
    }
}

/// Creation payload produced by the record mapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMigratedUser {
    pub username: String,
    /// Normalized `+<digits>` phone number; the canonical dedup key.
    pub phone_number: String,
    pub country_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub is_premium_member: bool,
    /// Legacy `_id`, kept for traceability and content ownership lookups.
    pub old_user_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub profile: NewUserProfile,
}

/// A user row in the target store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratedUser {
    pub id: String,
    pub username: String,
    pub phone_number: String,
    pub country_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub migrated_from_old_system: bool,
    pub old_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MigratedUser {
    /// Materializes a creation payload under a freshly generated id.
    pub fn from_new(new: &NewMigratedUser) -> Self {
        Self {
            id: generate_ulid(),
            username: new.username.clone(),
            phone_number: new.phone_number.clone(),
            country_code: new.country_code.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            migrated_from_old_system: true,
            old_user_id: Some(new.old_user_id.clone()),
            created_at: new.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Generates a new ULID string.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_mapping() {
        assert_eq!(
            ProfileVisibility::from_legacy_code(Some("P")),
            ProfileVisibility::Public
        );
        assert_eq!(
            ProfileVisibility::from_legacy_code(Some("F")),
            ProfileVisibility::Friends
        );
        assert_eq!(
            ProfileVisibility::from_legacy_code(Some("O")),
            ProfileVisibility::Private
        );
    }

    #[test]
    fn test_unknown_privacy_defaults_to_friends() {
        assert_eq!(
            ProfileVisibility::from_legacy_code(Some("X")),
            ProfileVisibility::Friends
        );
        assert_eq!(
            ProfileVisibility::from_legacy_code(Some("p")),
            ProfileVisibility::Friends
        );
        assert_eq!(
            ProfileVisibility::from_legacy_code(None),
            ProfileVisibility::Friends
        );
    }

    #[test]
    fn test_visibility_round_trips_through_str() {
        for v in [
            ProfileVisibility::Public,
            ProfileVisibility::Friends,
            ProfileVisibility::Private,
        ] {
            assert_eq!(v.as_str().parse::<ProfileVisibility>().unwrap(), v);
        }
        assert!("everyone".parse::<ProfileVisibility>().is_err());
    }
}
