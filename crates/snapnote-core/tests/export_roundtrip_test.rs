//! Export → parse round trip over realistic notes.

use chrono::{TimeZone, Utc};
use snapnote_core::{export_notes, parse_export, structure, NewNote, Note};
use uuid::Uuid;

fn note(title: &str, text: &str, caption: Option<&str>, edited: bool) -> Note {
    let facts = structure(text);
    let created = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
    NewNote {
        title: title.to_string(),
        content: text.to_string(),
        original_image: Some("data:image/jpeg;base64,/9j/4AAQ".to_string()),
        tags: facts.keywords.clone(),
        extracted_data: facts,
        vision_caption: caption.map(str::to_string),
        created_at: created,
        updated_at: edited.then(|| Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()),
    }
    .with_id(Uuid::now_v7())
}

#[test]
fn test_export_roundtrip_preserves_notes() {
    let notes = vec![
        note("Receipt", "Total due 42.00. Pay to billing@shop.io", None, false),
        note(
            "Article",
            "Read https://blog.example.com/post today",
            Some("Content detected: web site, monitor"),
            true,
        ),
    ];

    let json = export_notes(&notes).unwrap();
    assert!(json.starts_with("[\n"), "export must be pretty-printed");

    let parsed = parse_export(&json).unwrap();
    assert_eq!(parsed.len(), notes.len());
    for (original, restored) in notes.iter().zip(parsed.iter()) {
        assert_eq!(original.id, restored.id);
        assert_eq!(original, restored);
    }
}

#[test]
fn test_export_tolerates_missing_optional_fields() {
    let json = r#"[{
        "id": "01890a5d-ac96-774b-bcce-b302099a8057",
        "title": "Legacy",
        "content": "old content",
        "extractedData": {"urls": [], "emails": [], "keywords": [], "sentences": []},
        "tags": [],
        "createdAt": "2023-07-01T12:00:00Z"
    }]"#;
    let notes = parse_export(json).unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].vision_caption.is_none());
    assert!(notes[0].updated_at.is_none());
    assert!(notes[0].original_image.is_none());
}
