//! Integration tests for the SQLite note store.

use serde_json::json;
use snapnote_db::test_fixtures::{sample_note, MEMORY_DATABASE_URL};
use snapnote_db::{
    apply_schema, create_pool, Database, NoteStore, NoteUpdate, SqliteNoteStore,
};
use uuid::Uuid;

async fn memory_db() -> Database {
    Database::connect(MEMORY_DATABASE_URL)
        .await
        .expect("Failed to open in-memory database")
}

#[tokio::test]
async fn test_create_and_get() {
    let db = memory_db().await;
    let id = db
        .notes
        .create(sample_note(
            "Invoice due Friday. Pay at https://pay.example.com",
            0,
        ))
        .await
        .unwrap();

    let note = db.notes.get(id).await.unwrap().expect("note exists");
    assert_eq!(note.id, id);
    assert_eq!(note.title, "Invoice due Friday");
    assert_eq!(note.extracted_data.urls, vec!["https://pay.example.com"]);
    assert_eq!(note.tags, note.extracted_data.keywords);
    assert!(note.updated_at.is_none());
}

#[tokio::test]
async fn test_get_unknown_is_none() {
    let db = memory_db().await;
    assert!(db.notes.get(Uuid::now_v7()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_orders_newest_first() {
    let db = memory_db().await;
    let first = db.notes.create(sample_note("first note body", 0)).await.unwrap();
    let third = db.notes.create(sample_note("third note body", 120)).await.unwrap();
    let second = db.notes.create(sample_note("second note body", 60)).await.unwrap();

    let ids: Vec<Uuid> = db.notes.list().await.unwrap().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![third, second, first]);
}

#[tokio::test]
async fn test_update_refreshes_updated_at_and_tags() {
    let db = memory_db().await;
    let id = db
        .notes
        .create(sample_note("Quarterly planning meeting agenda", 0))
        .await
        .unwrap();

    let changed = db
        .notes
        .update(
            id,
            NoteUpdate::default()
                .title("Planning")
                .tags(vec!["work".into(), "q3".into(), "work".into()]),
        )
        .await
        .unwrap();
    assert_eq!(changed, 1);

    let note = db.notes.get(id).await.unwrap().unwrap();
    assert_eq!(note.title, "Planning");
    assert_eq!(note.tags, vec!["work", "q3"]);
    assert!(note.updated_at.is_some());
    assert!(note.updated_at.unwrap() >= note.created_at);

    let tagged = db.notes.list_by_tag("q3").await.unwrap();
    assert_eq!(tagged.len(), 1);
    assert!(db.notes.list_by_tag("planning").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_unknown_returns_zero() {
    let db = memory_db().await;
    let changed = db
        .notes
        .update(Uuid::now_v7(), NoteUpdate::default().content("x"))
        .await
        .unwrap();
    assert_eq!(changed, 0);
    assert_eq!(db.notes.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_removes_note_and_tags() {
    let db = memory_db().await;
    let id = db
        .notes
        .create(sample_note("Grocery list: apples bananas apples", 0))
        .await
        .unwrap();
    assert!(!db.notes.list_by_tag("apples").await.unwrap().is_empty());

    db.notes.delete(id).await.unwrap();
    assert!(db.notes.get(id).await.unwrap().is_none());
    assert!(db.notes.list_by_tag("apples").await.unwrap().is_empty());

    // Unknown id is a no-op.
    db.notes.delete(id).await.unwrap();
}

#[tokio::test]
async fn test_search_matches_title_tags_and_content() {
    let db = memory_db().await;
    db.notes
        .create(sample_note("Flight confirmation for Lisbon trip", 0))
        .await
        .unwrap();
    db.notes
        .create(sample_note("Dentist appointment reminder", 10))
        .await
        .unwrap();

    assert_eq!(db.notes.search("LISBON").await.unwrap().len(), 1);
    assert_eq!(db.notes.search("appointment").await.unwrap().len(), 1);
    assert_eq!(db.notes.search("o").await.unwrap().len(), 2);
    assert!(db.notes.search("zebra").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_filter_with_predicate() {
    let db = memory_db().await;
    db.notes
        .create(sample_note("Email me at sam@example.org today", 0))
        .await
        .unwrap();
    db.notes
        .create(sample_note("No contact details here at all", 10))
        .await
        .unwrap();

    let with_email = db
        .notes
        .filter(&|n| !n.extracted_data.emails.is_empty())
        .await
        .unwrap();
    assert_eq!(with_email.len(), 1);
    assert_eq!(with_email[0].extracted_data.emails, vec!["sam@example.org"]);
}

#[tokio::test]
async fn test_open_upgrades_v1_records() {
    let pool = create_pool(MEMORY_DATABASE_URL).await.unwrap();
    apply_schema(&pool).await.unwrap();

    let id = Uuid::now_v7();
    let record = json!({
        "id": id,
        "title": "Legacy",
        "content": "written before tags existed",
        "extractedData": {"urls": [], "emails": [], "keywords": ["legacy"], "sentences": []},
        "createdAt": "2023-07-01T12:00:00Z"
    });
    sqlx::query(
        "INSERT INTO notes (id, title, created_at, updated_at, schema_version, record)
         VALUES (?, ?, ?, NULL, 1, ?)",
    )
    .bind(id.to_string())
    .bind("Legacy")
    .bind("2023-07-01T12:00:00.000000Z")
    .bind(record.to_string())
    .execute(&pool)
    .await
    .unwrap();

    let store = SqliteNoteStore::open(pool.clone()).await.unwrap();
    let note = store.get(id).await.unwrap().unwrap();
    assert!(note.tags.is_empty());
    assert_eq!(note.updated_at, Some(note.created_at));
    assert!(note.vision_caption.is_none());

    let version: i64 = sqlx::query_scalar("SELECT schema_version FROM notes WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, 3);

    // Second open finds nothing left to upgrade.
    assert_eq!(store.migrate_records().await.unwrap(), 0);
}

#[tokio::test]
async fn test_file_database_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let id = {
        let db = Database::open(&path).await.unwrap();
        let id = db
            .notes
            .create(sample_note("Persisted across restarts", 0))
            .await
            .unwrap();
        db.pool.close().await;
        id
    };

    let db = Database::open(&path).await.unwrap();
    let note = db.notes.get(id).await.unwrap().expect("note survives reopen");
    assert_eq!(note.title, "Persisted across restarts");
}
