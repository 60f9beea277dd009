//! End-to-end batch runs over in-memory and JSONL sources.

use biograph_migrate::error::AppError;
use biograph_migrate::models::{
    ContentKind, LegacyDocument, MigratedUser, MigrationOutcome, MigrationRunStats, NewMigratedUser,
};
use biograph_migrate::repositories::{ContentStore, MemoryStore, UserStore};
use biograph_migrate::services::{
    normalize_phone, BatchOptions, ContentMigrationService, RunReport, UserMigrationService,
};
use biograph_migrate::source::{JsonlSource, LegacySource, MemorySource};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;

const USERS: &str = "AuthApp_usermodel";

fn legacy_user(id: &str, username: &str, phone: &str) -> LegacyDocument {
    LegacyDocument::from_value(json!({
        "_id": {"$oid": id},
        "username": username,
        "phone_number": phone,
        "country_code": "1",
        "name": format!("{username} Example"),
        "status_key": 1,
        "is_removed": false,
    }))
    .unwrap()
}

fn options(start_offset: u64, batch_size: u64, dry_run: bool) -> BatchOptions {
    BatchOptions {
        start_offset,
        batch_size,
        dry_run,
    }
}

async fn run_users(
    source: &MemorySource,
    store: &MemoryStore,
    options: &BatchOptions,
) -> MigrationRunStats {
    UserMigrationService::new(source, store)
        .run(options)
        .await
        .unwrap()
}

fn counters(stats: &MigrationRunStats) -> JsonValue {
    json!({
        "total_found": stats.total_found,
        "migrated": stats.migrated,
        "skipped": stats.skipped,
        "duplicates": stats.duplicates,
        "errors": stats.errors,
    })
}

#[test]
fn test_formatted_phone_example() {
    let phone = normalize_phone(Some("(847) 987-3207"), Some("1"), "1").unwrap();
    assert_eq!(phone.full_phone, "+18479873207");
    assert_eq!(phone.country_code, "1");
}

#[tokio::test]
async fn test_existing_phone_counts_as_duplicate() {
    let store = MemoryStore::new();
    store.seed_user(MigratedUser {
        id: "01HEXISTING".to_string(),
        username: "already-here".to_string(),
        phone_number: "+18479873207".to_string(),
        country_code: "1".to_string(),
        first_name: "Already".to_string(),
        last_name: "Here".to_string(),
        email: None,
        migrated_from_old_system: false,
        old_user_id: None,
        created_at: Utc::now(),
    });
    let source = MemorySource::new().with_documents(
        USERS,
        vec![
            legacy_user("64b0c0ffee00000000000001", "ada", "(847) 987-3207"),
            legacy_user("64b0c0ffee00000000000002", "bob", "847-987-3208"),
        ],
    );

    let stats = run_users(&source, &store, &options(0, 2, false)).await;

    assert_eq!(
        counters(&stats),
        json!({"total_found": 2, "migrated": 1, "skipped": 0, "duplicates": 1, "errors": 0})
    );
    assert_eq!(
        stats.log[0].outcome,
        MigrationOutcome::SkippedDuplicate {
            existing_id: Some("01HEXISTING".to_string())
        }
    );
}

#[tokio::test]
async fn test_second_run_is_all_duplicates() {
    let source = MemorySource::new().with_documents(
        USERS,
        (1..=5).map(|i| {
            legacy_user(
                &format!("64b0c0ffee0000000000000{i}"),
                &format!("user{i}"),
                &format!("555 010 000{i}"),
            )
        }),
    );
    let store = MemoryStore::new();

    let first = run_users(&source, &store, &options(0, 10, false)).await;
    let second = run_users(&source, &store, &options(0, 10, false)).await;

    assert_eq!(first.migrated, 5);
    assert_eq!(second.migrated, 0);
    assert_eq!(second.duplicates, first.migrated);
    assert_eq!(store.count_migrated().await.unwrap(), 5);
}

#[tokio::test]
async fn test_dry_run_leaves_store_unchanged() {
    let source = MemorySource::new().with_documents(
        USERS,
        vec![
            legacy_user("64b0c0ffee00000000000001", "ada", "8479873207"),
            legacy_user("64b0c0ffee00000000000002", "bob", "8479873208"),
        ],
    );
    let store = MemoryStore::new();

    let dry = run_users(&source, &store, &options(0, 10, true)).await;
    assert_eq!(dry.migrated, 2);
    assert!(dry.log.iter().all(|e| e.new_id.is_none()));
    assert_eq!(store.count_migrated().await.unwrap(), 0);

    let live = run_users(&source, &store, &options(0, 10, false)).await;
    assert_eq!(counters(&live), counters(&dry));
}

#[tokio::test]
async fn test_missing_username_is_never_migrated() {
    let source = MemorySource::new().with_documents(
        USERS,
        vec![legacy_user("64b0c0ffee00000000000001", "  ", "8479873207")],
    );
    let store = MemoryStore::new();

    let stats = run_users(&source, &store, &options(0, 10, false)).await;
    assert_eq!(stats.migrated, 0);
    assert_eq!(stats.skipped, 1);
    assert!(store.find_by_phone("+18479873207").await.unwrap().is_none());
}

#[tokio::test]
async fn test_offsets_walk_the_collection() {
    let source = MemorySource::new().with_documents(
        USERS,
        (1..=5).map(|i| {
            legacy_user(
                &format!("64b0c0ffee0000000000000{i}"),
                &format!("user{i}"),
                &format!("555 010 000{i}"),
            )
        }),
    );
    let store = MemoryStore::new();

    let mut offset = 0;
    loop {
        let stats = run_users(&source, &store, &options(offset, 2, false)).await;
        if stats.total_found == 0 {
            break;
        }
        offset += stats.total_found;
    }
    assert_eq!(offset, 5);
    assert_eq!(store.users().len(), 5);
}

/// Store whose writes fail for one phone number, as a constraint or
/// trigger failure would.
struct FlakyStore {
    inner: MemoryStore,
    failing_phone: &'static str,
}

#[async_trait::async_trait]
impl UserStore for FlakyStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<MigratedUser>, AppError> {
        self.inner.find_by_phone(phone).await
    }

    async fn find_by_old_user_id(&self, id: &str) -> Result<Option<MigratedUser>, AppError> {
        self.inner.find_by_old_user_id(id).await
    }

    async fn create(&self, user: &NewMigratedUser) -> Result<MigratedUser, AppError> {
        if user.phone_number == self.failing_phone {
            return Err(AppError::Query {
                message: "ERROR: value too long for type character varying(150)".to_string(),
                query: "INSERT INTO users".to_string(),
            });
        }
        UserStore::create(&self.inner, user).await
    }

    async fn count_migrated(&self) -> Result<u64, AppError> {
        self.inner.count_migrated().await
    }
}

#[tokio::test]
async fn test_store_error_does_not_abort_batch() {
    let source = MemorySource::new().with_documents(
        USERS,
        vec![
            legacy_user("64b0c0ffee00000000000001", "ada", "8479873207"),
            legacy_user("64b0c0ffee00000000000002", "bob", "8479873208"),
            legacy_user("64b0c0ffee00000000000003", "cy", "8479873209"),
        ],
    );
    let store = FlakyStore {
        inner: MemoryStore::new(),
        failing_phone: "+18479873208",
    };

    let stats = UserMigrationService::new(&source, &store)
        .run(&options(0, 10, false))
        .await
        .unwrap();
    assert_eq!(stats.migrated, 2);
    assert_eq!(stats.errors, 1);
    assert!(stats.error_messages[0].starts_with("Error migrating bob"));
    assert!(stats.error_messages[0].contains("[QUERY_ERROR]"));
}

#[tokio::test]
async fn test_jsonl_export_users_then_content() {
    let export = TempDir::new().unwrap();
    std::fs::write(
        export.path().join("AuthApp_usermodel.jsonl"),
        concat!(
            r#"{"_id":{"$oid":"64b0c0ffee00000000000001"},"username":"ada","phone_number":8479873207,"country_code":1,"status_key":1,"is_removed":false,"profile_settings":"O"}"#,
            "\n",
            r#"{"_id":{"$oid":"64b0c0ffee00000000000002"},"username":"gone","phone_number":"8479873208","status_key":1,"is_removed":true}"#,
            "\n",
        ),
    )
    .unwrap();
    std::fs::write(
        export.path().join("biographapp_biographmodel.jsonl"),
        concat!(
            r#"{"_id":{"$oid":"64b0c0ffee000000000000b1"},"user_id":"64b0c0ffee00000000000001","title":"Childhood","allKeywords":["home"],"created_date":{"$date":"2021-05-06T07:08:09Z"}}"#,
            "\n",
            r#"{"_id":{"$oid":"64b0c0ffee000000000000b2"},"user_id":"64b0c0ffee00000000000002","title":"Removed author"}"#,
            "\n",
        ),
    )
    .unwrap();

    let source = JsonlSource::open(export.path()).await.unwrap();
    let store = MemoryStore::new();

    let users = UserMigrationService::new(&source, &store)
        .run(&options(0, 100, false))
        .await
        .unwrap();
    assert_eq!(users.total_found, 1);
    assert_eq!(users.migrated, 1);

    let biographs = ContentMigrationService::new(&source, &store)
        .run(ContentKind::Biograph, &options(0, 100, false))
        .await
        .unwrap();
    assert_eq!(biographs.migrated, 1);
    assert_eq!(biographs.skipped, 1);
    assert_eq!(store.count(ContentKind::Biograph).await.unwrap(), 1);

    let row = &store.content(ContentKind::Biograph)[0];
    assert_eq!(row.content.old_id, "64b0c0ffee000000000000b1");
    assert_eq!(row.content.data["all_keywords"], json!(["home"]));

    source.close().await.unwrap();
}

#[tokio::test]
async fn test_report_written_for_run() {
    let logs = TempDir::new().unwrap();
    let source = MemorySource::new().with_documents(
        USERS,
        vec![legacy_user("64b0c0ffee00000000000001", "ada", "8479873207")],
    );
    let store = MemoryStore::new();
    let opts = options(0, 10, true);
    let stats = run_users(&source, &store, &opts).await;

    let report = RunReport::new("users", &opts, &stats);
    let mut summary = Vec::new();
    report.print_summary(&mut summary).unwrap();
    assert!(String::from_utf8(summary).unwrap().contains("Would migrate: 1"));

    let path = report.save_log(logs.path()).unwrap();
    let log: JsonValue = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(log["subject"], json!("users"));
    assert_eq!(log["migration_log"][0]["phone"], json!("+18479873207"));
    assert_eq!(log["migration_log"][0]["outcome"]["status"], json!("migrated"));
}
