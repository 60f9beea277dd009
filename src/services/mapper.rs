//! Legacy document → creation payload.

use chrono::NaiveDate;
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::RecordError;
use crate::models::{
    ContentKind, FieldDefault, FieldMapping, FieldType, LegacyDocument, LegacyUserRecord,
    NewContent, NewMigratedUser, NewUserProfile, ProfileVisibility,
};
use crate::services::normalize::{accept_email, normalize_phone, split_name};

/// Maps a legacy user to a user + profile creation request.
pub fn map_user(
    record: &LegacyUserRecord,
    default_country_code: &str,
) -> Result<NewMigratedUser, RecordError> {
    let username = record
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(RecordError::MissingRequiredField("username"))?;

    let phone = normalize_phone(
        record.phone_number.as_deref(),
        record.country_code.as_deref(),
        default_country_code,
    )?;

    let (first_name, last_name) = split_name(record.name.as_deref());
    let defaults = NewUserProfile::default();

    Ok(NewMigratedUser {
        username: username.to_string(),
        phone_number: phone.full_phone,
        country_code: phone.country_code,
        first_name,
        last_name,
        email: accept_email(record.email.as_deref()),
        profile_picture: record.profile_pic_url.clone(),
        is_premium_member: record.is_premium_member,
        old_user_id: record.legacy_id.clone(),
        created_at: record.created_time,
        updated_at: record.updated_time,
        profile: NewUserProfile {
            profile_visibility: ProfileVisibility::from_legacy_code(
                record.profile_settings.as_deref(),
            ),
            email_notifications: record
                .email_notifications
                .unwrap_or(defaults.email_notifications),
            push_notifications: record
                .push_notifications
                .unwrap_or(defaults.push_notifications),
            ..defaults
        },
    })
}

/// Builds the `data` object for a content row from its mapping table.
///
/// Absent, null or wrongly typed legacy values fall back to the field's
/// default, so assembly never fails.
pub fn assemble_fields(
    fields: &[FieldMapping],
    doc: &LegacyDocument,
    today: NaiveDate,
) -> Map<String, JsonValue> {
    fields
        .iter()
        .map(|field| {
            let value = coerce(field, doc).unwrap_or_else(|| default_value(field.default, today));
            (field.target.to_string(), value)
        })
        .collect()
}

fn coerce(field: &FieldMapping, doc: &LegacyDocument) -> Option<JsonValue> {
    match field.kind {
        FieldType::Text => doc.string(field.legacy).map(JsonValue::String),
        FieldType::Integer => doc.i64(field.legacy).map(JsonValue::from),
        FieldType::Number => match doc.plain(field.legacy)? {
            JsonValue::Number(n) => Some(JsonValue::Number(n)),
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(JsonValue::Number),
            _ => None,
        },
        FieldType::Bool => match doc.plain(field.legacy)? {
            JsonValue::Bool(b) => Some(JsonValue::Bool(b)),
            JsonValue::Number(n) => n.as_i64().map(|i| JsonValue::Bool(i != 0)),
            JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(JsonValue::Bool(true)),
                "false" => Some(JsonValue::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        FieldType::Json => doc.plain(field.legacy),
        FieldType::Date => doc
            .datetime(field.legacy)
            .map(|dt| JsonValue::String(dt.date_naive().format("%Y-%m-%d").to_string())),
    }
}

fn default_value(default: FieldDefault, today: NaiveDate) -> JsonValue {
    match default {
        FieldDefault::Text(s) => JsonValue::String(s.to_string()),
        FieldDefault::Integer(i) => JsonValue::from(i),
        FieldDefault::Bool(b) => JsonValue::Bool(b),
        FieldDefault::EmptyArray => JsonValue::Array(Vec::new()),
        FieldDefault::EmptyObject => JsonValue::Object(Map::new()),
        FieldDefault::Today => JsonValue::String(today.format("%Y-%m-%d").to_string()),
    }
}

/// Maps a content document whose owners are already resolved.
///
/// `owners` pairs each of the kind's owner columns with a migrated user id.
pub fn map_content(
    kind: ContentKind,
    doc: &LegacyDocument,
    owners: Vec<(&'static str, String)>,
    today: NaiveDate,
) -> Result<NewContent, RecordError> {
    let old_id = doc.id().ok_or(RecordError::MissingRequiredField("_id"))?;
    Ok(NewContent {
        kind,
        owners,
        old_id,
        data: assemble_fields(kind.fields(), doc, today),
        created_date: doc.datetime("created_date"),
        updated_date: doc.datetime("updated_date"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(value: JsonValue) -> LegacyUserRecord {
        LegacyUserRecord::from_document(&LegacyDocument::from_value(value).unwrap()).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_full_user_mapping() {
        let user = map_user(
            &record(json!({
                "_id": {"$oid": "5f1a2b3c4d5e6f7a8b9c0d1e"},
                "username": " ada ",
                "phone_number": "(847) 987-3207",
                "country_code": "1",
                "name": "Ada King Lovelace",
                "email": "ada@example.com",
                "profile_settings": "P",
                "created_time": {"$date": "2020-01-02T03:04:05Z"},
                "is_premium_member": true,
                "email_notification": {"all": false},
            })),
            "1",
        )
        .unwrap();

        assert_eq!(user.username, "ada");
        assert_eq!(user.phone_number, "+18479873207");
        assert_eq!(user.country_code, "1");
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.last_name, "King Lovelace");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.old_user_id, "5f1a2b3c4d5e6f7a8b9c0d1e");
        assert!(user.is_premium_member);
        assert_eq!(
            user.created_at,
            Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(user.profile.profile_visibility, ProfileVisibility::Public);
        assert!(!user.profile.email_notifications);
        assert!(user.profile.push_notifications);
        assert!(!user.profile.sms_notifications);
        assert_eq!(user.profile.theme, "auto");
    }

    #[test]
    fn test_missing_username_rejected() {
        for username in [json!(null), json!(""), json!("   ")] {
            let err = map_user(
                &record(json!({"_id": "1", "username": username, "phone_number": "8479873207"})),
                "1",
            )
            .unwrap_err();
            assert_eq!(err, RecordError::MissingRequiredField("username"));
        }
    }

    #[test]
    fn test_invalid_phone_rejected() {
        let err = map_user(
            &record(json!({"_id": "1", "username": "ada", "phone_number": "12345"})),
            "1",
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidPhoneFormat(_)));
    }

    #[test]
    fn test_bad_email_dropped() {
        let user = map_user(
            &record(json!({
                "_id": "1", "username": "ada", "phone_number": 8479873207i64, "email": "n/a"
            })),
            "1",
        )
        .unwrap();
        assert_eq!(user.email, None);
        assert_eq!(user.profile.profile_visibility, ProfileVisibility::Friends);
    }

    #[test]
    fn test_assemble_applies_defaults_and_renames() {
        let doc = LegacyDocument::from_value(json!({
            "_id": {"$oid": "64b0c0ffee0000000000000a"},
            "title": "Childhood",
            "record_time": "12.5",
            "allKeywords": ["home", "summer"],
            "is_published": 1,
            "status_key": {"$numberInt": "2"},
            "monologues": null,
        }))
        .unwrap();

        let data = assemble_fields(ContentKind::Biograph.fields(), &doc, today());
        assert_eq!(data["title"], json!("Childhood"));
        assert_eq!(data["record_time"], json!(12.5));
        assert_eq!(data["all_keywords"], json!(["home", "summer"]));
        assert_eq!(data["is_published"], json!(true));
        assert_eq!(data["status_key"], json!(2));
        assert_eq!(data["monologues"], json!({}));
        assert_eq!(data["co_authors"], json!([]));
        assert_eq!(data["biograph_type"], json!("1"));
        assert!(!data.contains_key("allKeywords"));
    }

    #[test]
    fn test_date_fields_default_to_today() {
        let doc = LegacyDocument::from_value(json!({
            "_id": "s1",
            "start_date": {"$date": "2023-02-03T10:00:00Z"},
        }))
        .unwrap();
        let data = assemble_fields(ContentKind::Subscription.fields(), &doc, today());
        assert_eq!(data["start_date"], json!("2023-02-03"));
        assert_eq!(data["end_date"], json!("2024-06-01"));
    }

    #[test]
    fn test_map_content_keeps_owners_and_dates() {
        let doc = LegacyDocument::from_value(json!({
            "_id": "b1",
            "user_id": "legacy-user",
            "created_date": {"$date": "2021-05-06T07:08:09Z"},
        }))
        .unwrap();
        let content = map_content(
            ContentKind::Book,
            &doc,
            vec![("user_id", "01HX".to_string())],
            today(),
        )
        .unwrap();
        assert_eq!(content.old_id, "b1");
        assert_eq!(content.owners, vec![("user_id", "01HX".to_string())]);
        assert!(content.created_date.is_some());
        assert_eq!(content.updated_date, None);
        assert_eq!(content.data["synopsis"], json!(""));
    }
}
