//! Legacy documents as read from the old document store.
//!
//! Documents arrive as MongoDB Extended JSON (relaxed or canonical), so
//! accessors see through `{"$oid": ..}`, `{"$date": ..}` and
//! `{"$numberLong": ..}` wrappers.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;

/// A single read-only legacy document.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyDocument(Map<String, JsonValue>);

impl LegacyDocument {
    /// Wraps a JSON object. Anything else is rejected.
    pub fn from_value(value: JsonValue) -> Result<Self, AppError> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(AppError::MalformedDocument {
                id: "<unknown>".to_string(),
                reason: format!("expected an object, got {}", other),
            }),
        }
    }

    /// Source-native id rendered as a string (ObjectId hex, string or number).
    pub fn id(&self) -> Option<String> {
        self.string("_id")
    }

    /// Raw value at `key`; dotted keys descend into sub-documents.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        let mut parts = key.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Value at `key` with Extended JSON wrappers removed. Null reads as absent.
    pub fn plain(&self, key: &str) -> Option<JsonValue> {
        self.get(key).map(plain_value).filter(|v| !v.is_null())
    }

    /// String view of a scalar field. Numbers and ids are stringified.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.plain(key)? {
            JsonValue::String(s) => Some(s),
            JsonValue::Number(n) => Some(match n.as_f64() {
                // Integral doubles (phone numbers stored as floats) render without ".0"
                Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                    format!("{}", f as i64)
                }
                _ => n.to_string(),
            }),
            JsonValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Trimmed, non-empty string.
    pub fn text(&self, key: &str) -> Option<String> {
        self.string(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.plain(key)?.as_bool()
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        match self.plain(key)? {
            JsonValue::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        parse_datetime(self.get(key)?)
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }
}

/// Strips Extended JSON type wrappers, recursively.
///
/// Dates become RFC 3339 strings, ObjectIds their hex string, and wrapped
/// numbers plain numbers.
pub fn plain_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) if map.len() == 1 => {
            let (key, inner) = map.iter().next().map(|(k, v)| (k.as_str(), v)).unwrap_or(("", value));
            match key {
                "$oid" | "$symbol" => inner.clone(),
                "$date" => parse_datetime(value)
                    .map(|d| JsonValue::String(d.to_rfc3339()))
                    .unwrap_or(JsonValue::Null),
                "$numberInt" | "$numberLong" => inner
                    .as_str()
                    .and_then(|s| s.parse::<i64>().ok())
                    .map(JsonValue::from)
                    .unwrap_or(JsonValue::Null),
                "$numberDouble" | "$numberDecimal" => inner
                    .as_str()
                    .and_then(|s| s.parse::<f64>().ok())
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null),
                _ => JsonValue::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), plain_value(v)))
                        .collect(),
                ),
            }
        }
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), plain_value(v)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(plain_value).collect()),
        other => other.clone(),
    }
}

/// Parses the date shapes found in legacy exports.
///
/// Accepts `{"$date": "<rfc3339>"}`, `{"$date": {"$numberLong": "<ms>"}}`,
/// `{"$date": <ms>}`, bare RFC 3339 strings and bare `YYYY-MM-DD` dates.
pub fn parse_datetime(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::Object(map) => {
            let inner = map.get("$date")?;
            match inner {
                JsonValue::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
                JsonValue::Object(_) => match plain_value(inner) {
                    JsonValue::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
                    _ => None,
                },
                other => parse_datetime(other),
            }
        }
        JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
            }),
        _ => None,
    }
}

/// A legacy user as stored in `AuthApp_usermodel`.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyUserRecord {
    pub legacy_id: String,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub country_code: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_settings: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub updated_time: Option<DateTime<Utc>>,
    pub profile_pic_url: Option<String>,
    pub is_premium_member: bool,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

impl LegacyUserRecord {
    /// Reads the user fields from a document. Only `_id` is mandatory here;
    /// field validation belongs to the record mapper.
    pub fn from_document(doc: &LegacyDocument) -> Result<Self, AppError> {
        let legacy_id = doc.id().ok_or_else(|| AppError::MalformedDocument {
            id: "<unknown>".to_string(),
            reason: "missing _id".to_string(),
        })?;

        Ok(Self {
            legacy_id,
            username: doc.text("username"),
            phone_number: doc.string("phone_number"),
            country_code: doc.string("country_code"),
            name: doc.text("name"),
            email: doc.text("email"),
            profile_settings: doc.text("profile_settings"),
            created_time: doc.datetime("created_time"),
            updated_time: doc.datetime("updated_time"),
            profile_pic_url: doc.text("profile_pic_url"),
            is_premium_member: doc.bool("is_premium_member").unwrap_or(false),
            email_notifications: doc.bool("email_notification.all"),
            push_notifications: doc.bool("push_notification.all"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: JsonValue) -> LegacyDocument {
        LegacyDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_object_id_unwrapped() {
        let d = doc(json!({"_id": {"$oid": "5f1a2b3c4d5e6f7a8b9c0d1e"}}));
        assert_eq!(d.id().as_deref(), Some("5f1a2b3c4d5e6f7a8b9c0d1e"));
    }

    #[test]
    fn test_numeric_phone_is_stringified() {
        let d = doc(json!({"_id": 7, "phone_number": 8479873207i64, "country_code": 1}));
        assert_eq!(d.string("phone_number").as_deref(), Some("8479873207"));
        assert_eq!(d.string("country_code").as_deref(), Some("1"));
        assert_eq!(d.id().as_deref(), Some("7"));

        let d = doc(json!({"phone_number": 8479873207.0}));
        assert_eq!(d.string("phone_number").as_deref(), Some("8479873207"));
    }

    #[test]
    fn test_dates_in_every_export_shape() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let ms = expected.timestamp_millis();

        let d = doc(json!({
            "relaxed": {"$date": "2020-01-02T03:04:05Z"},
            "canonical": {"$date": {"$numberLong": ms.to_string()}},
            "millis": {"$date": ms},
            "bare": "2020-01-02T03:04:05+00:00",
        }));
        assert_eq!(d.datetime("relaxed"), Some(expected));
        assert_eq!(d.datetime("canonical"), Some(expected));
        assert_eq!(d.datetime("millis"), Some(expected));
        assert_eq!(d.datetime("bare"), Some(expected));
        assert_eq!(d.datetime("missing"), None);
    }

    #[test]
    fn test_dotted_path() {
        let d = doc(json!({"email_notification": {"all": false}}));
        assert_eq!(d.bool("email_notification.all"), Some(false));
        assert_eq!(d.bool("push_notification.all"), None);
    }

    #[test]
    fn test_plain_value_recurses() {
        let value = json!({
            "ids": [{"$oid": "abc"}, {"$oid": "def"}],
            "count": {"$numberLong": "12"},
            "nested": {"at": {"$date": "2020-01-02T03:04:05Z"}}
        });
        assert_eq!(
            plain_value(&value),
            json!({
                "ids": ["abc", "def"],
                "count": 12,
                "nested": {"at": "2020-01-02T03:04:05+00:00"}
            })
        );
    }

    #[test]
    fn test_i64_accepts_wrapped_and_string_numbers() {
        let d = doc(json!({"a": {"$numberInt": "3"}, "b": "4", "c": 5.0, "d": 5.5}));
        assert_eq!(d.i64("a"), Some(3));
        assert_eq!(d.i64("b"), Some(4));
        assert_eq!(d.i64("c"), Some(5));
        assert_eq!(d.i64("d"), None);
    }

    #[test]
    fn test_user_record_from_document() {
        let d = doc(json!({
            "_id": {"$oid": "5f1a"},
            "username": "  ada  ",
            "phone_number": "(847) 987-3207",
            "country_code": "1",
            "name": "Ada King Lovelace",
            "email": "",
            "profile_settings": "P",
            "created_time": {"$date": "2019-05-06T07:08:09Z"},
            "is_premium_member": true,
            "push_notification": {"all": false}
        }));
        let user = LegacyUserRecord::from_document(&d).unwrap();
        assert_eq!(user.legacy_id, "5f1a");
        assert_eq!(user.username.as_deref(), Some("ada"));
        assert_eq!(user.email, None);
        assert_eq!(user.profile_settings.as_deref(), Some("P"));
        assert!(user.is_premium_member);
        assert_eq!(user.push_notifications, Some(false));
        assert_eq!(user.email_notifications, None);
        assert!(user.created_time.is_some());
    }

    #[test]
    fn test_user_record_requires_id() {
        let d = doc(json!({"username": "ada"}));
        assert!(LegacyUserRecord::from_document(&d).is_err());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(LegacyDocument::from_value(json!([1, 2])).is_err());
    }
}
