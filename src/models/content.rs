//! Legacy content kinds and their field-mapping tables.
//!
//! Every content collection follows the same shape: one or two owner
//! references to legacy users, a legacy `_id`, created/updated dates, and
//! a set of kind-specific fields. The kind-specific fields are described
//! by a [`FieldMapping`] table and assembled into the row's `data` column.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Expected type of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Number,
    Bool,
    /// Any JSON value (arrays, sub-documents), Extended JSON stripped.
    Json,
    /// Calendar date, stored as `YYYY-MM-DD`.
    Date,
}

/// Value used when the legacy field is absent or null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Text(&'static str),
    Integer(i64),
    Bool(bool),
    EmptyArray,
    EmptyObject,
    /// The run date.
    Today,
}

/// One legacy field → target key rule.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub legacy: &'static str,
    pub target: &'static str,
    pub kind: FieldType,
    pub default: FieldDefault,
}

const fn field(
    legacy: &'static str,
    target: &'static str,
    kind: FieldType,
    default: FieldDefault,
) -> FieldMapping {
    FieldMapping {
        legacy,
        target,
        kind,
        default,
    }
}

use FieldDefault as D;
use FieldType as T;

const BIOGRAPH_FIELDS: &[FieldMapping] = &[
    field("title", "title", T::Text, D::Text("")),
    field("record_text", "record_text", T::Text, D::Text("")),
    field("record_time", "record_time", T::Number, D::Integer(0)),
    field("words_count", "words_count", T::Text, D::Text("")),
    field("photo_url", "photo_url", T::Text, D::Text("")),
    field("record_url", "record_url", T::Text, D::Text("")),
    field("video_url", "video_url", T::Text, D::Text("")),
    field("biograph_type", "biograph_type", T::Text, D::Text("1")),
    field("allKeywords", "all_keywords", T::Json, D::EmptyArray),
    field("location", "location", T::Text, D::Text("")),
    field("co_authors", "co_authors", T::Json, D::EmptyArray),
    field("books", "books", T::Json, D::EmptyArray),
    field("monologues", "monologues", T::Json, D::EmptyObject),
    field("is_published", "is_published", T::Bool, D::Bool(false)),
    field("is_removed", "is_removed", T::Bool, D::Bool(false)),
    field("status_key", "status_key", T::Integer, D::Integer(1)),
    field("last_played_record", "last_played_record", T::Text, D::Text("")),
    field("last_updated_title", "last_updated_title", T::Json, D::EmptyObject),
];

const BOOK_FIELDS: &[FieldMapping] = &[
    field("title", "title", T::Text, D::Text("")),
    field("synopsis", "synopsis", T::Text, D::Text("")),
    field("biographs", "biographs", T::Json, D::EmptyArray),
    field("is_published", "is_published", T::Bool, D::Bool(false)),
    field("is_removed", "is_removed", T::Bool, D::Bool(false)),
    field("status_key", "status_key", T::Integer, D::Integer(1)),
];

const NOTIFICATION_FIELDS: &[FieldMapping] = &[
    field("notification_type", "notification_type", T::Integer, D::Integer(1)),
    field("is_read", "is_read", T::Bool, D::Bool(false)),
    field("is_removed", "is_removed", T::Bool, D::Bool(false)),
    field("status_key", "status_key", T::Integer, D::Integer(1)),
];

const RECORDED_TIME_FIELDS: &[FieldMapping] = &[
    field("listening_time", "listening_time", T::Number, D::Integer(0)),
    field("date_of_listening", "date_of_listening", T::Date, D::Today),
    field("is_removed", "is_removed", T::Bool, D::Bool(false)),
    field("status_key", "status_key", T::Integer, D::Integer(1)),
];

const SUBSCRIPTION_FIELDS: &[FieldMapping] = &[
    field("receipt_id", "receipt_id", T::Text, D::Text("")),
    field("duration", "duration", T::Integer, D::Integer(0)),
    field("product_id", "product_id", T::Text, D::Text("")),
    field("start_date", "start_date", T::Date, D::Today),
    field("end_date", "end_date", T::Date, D::Today),
];

/// A reference from a content document to its owning legacy user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerField {
    /// Legacy field holding the owner's legacy `_id`.
    pub legacy: &'static str,
    /// Target column holding the migrated user's id.
    pub column: &'static str,
}

const USER_OWNER: &[OwnerField] = &[OwnerField {
    legacy: "user_id",
    column: "user_id",
}];

const NOTIFICATION_OWNERS: &[OwnerField] = &[
    OwnerField {
        legacy: "from_id",
        column: "from_user_id",
    },
    OwnerField {
        legacy: "to_id",
        column: "to_user_id",
    },
];

/// Legacy content collections, in migration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Biograph,
    Book,
    Notification,
    RecordedTime,
    Subscription,
}

impl ContentKind {
    /// All kinds in dependency-safe migration order.
    pub fn all() -> &'static [ContentKind] {
        &[
            ContentKind::Biograph,
            ContentKind::Book,
            ContentKind::Notification,
            ContentKind::RecordedTime,
            ContentKind::Subscription,
        ]
    }

    /// Legacy collection name.
    pub fn collection(&self) -> &'static str {
        match self {
            ContentKind::Biograph => "biographapp_biographmodel",
            ContentKind::Book => "authapp_booksmodel",
            ContentKind::Notification => "authapp_notifcationmodel",
            ContentKind::RecordedTime => "authapp_recordedtimemodel",
            ContentKind::Subscription => "authapp_subscription",
        }
    }

    /// Target table name.
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Biograph => "biographs",
            ContentKind::Book => "books",
            ContentKind::Notification => "notifications",
            ContentKind::RecordedTime => "recorded_times",
            ContentKind::Subscription => "subscriptions",
        }
    }

    /// Column holding the legacy `_id`.
    pub fn legacy_id_column(&self) -> &'static str {
        match self {
            ContentKind::Biograph => "old_biograph_id",
            ContentKind::Book => "old_book_id",
            ContentKind::Notification => "old_notification_id",
            ContentKind::RecordedTime => "old_recorded_time_id",
            ContentKind::Subscription => "old_subscription_id",
        }
    }

    pub fn owner_fields(&self) -> &'static [OwnerField] {
        match self {
            ContentKind::Notification => NOTIFICATION_OWNERS,
            _ => USER_OWNER,
        }
    }

    pub fn fields(&self) -> &'static [FieldMapping] {
        match self {
            ContentKind::Biograph => BIOGRAPH_FIELDS,
            ContentKind::Book => BOOK_FIELDS,
            ContentKind::Notification => NOTIFICATION_FIELDS,
            ContentKind::RecordedTime => RECORDED_TIME_FIELDS,
            ContentKind::Subscription => SUBSCRIPTION_FIELDS,
        }
    }

    /// Legacy field used as a human-readable label in logs, if any.
    pub fn label_field(&self) -> Option<&'static str> {
        match self {
            ContentKind::Biograph | ContentKind::Book => Some("title"),
            _ => None,
        }
    }

    /// Name used for CLI selection and run log files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Biograph => "biographs",
            ContentKind::Book => "books",
            ContentKind::Notification => "notifications",
            ContentKind::RecordedTime => "recorded_times",
            ContentKind::Subscription => "subscriptions",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "biographs" | "biograph" => Ok(ContentKind::Biograph),
            "books" | "book" => Ok(ContentKind::Book),
            "notifications" | "notification" => Ok(ContentKind::Notification),
            "recorded_times" | "recorded_time" => Ok(ContentKind::RecordedTime),
            "subscriptions" | "subscription" => Ok(ContentKind::Subscription),
            _ => Err(format!(
                "Invalid content kind '{}'. Valid values: biographs, books, notifications, recorded_times, subscriptions",
                s
            )),
        }
    }
}

/// A content row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewContent {
    pub kind: ContentKind,
    /// (target column, migrated user id) per owner field.
    pub owners: Vec<(&'static str, String)>,
    pub old_id: String,
    pub data: Map<String, JsonValue>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
}
