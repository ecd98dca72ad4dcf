//! Clipboard paste ingestion.

use tracing::debug;

use snapnote_core::{Note, Result, UploadFile};

use crate::orchestrator::ExtractionOrchestrator;

/// One item from a paste event.
#[derive(Debug, Clone)]
pub struct ClipboardItem {
    /// Declared MIME type of the item.
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ClipboardItem {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// True when the declared type is an image.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    fn into_upload(self, index: usize) -> UploadFile {
        let extension = self
            .mime_type
            .strip_prefix("image/")
            .map(|s| if s == "jpeg" { "jpg" } else { s })
            .unwrap_or("bin");
        UploadFile::new(
            format!("pasted-{}.{}", index + 1, extension),
            Some(self.mime_type),
            self.data,
        )
    }
}

/// Route every image item of a paste into the pipeline, in order. Non-image
/// items are skipped. Returns one outcome per processed item.
pub async fn process_clipboard(
    orchestrator: &ExtractionOrchestrator,
    items: Vec<ClipboardItem>,
    credential: Option<&str>,
) -> Vec<Result<Note>> {
    let mut outcomes = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_image() {
            debug!(
                subsystem = "pipeline",
                component = "clipboard",
                mime_type = %item.mime_type,
                "Skipping non-image clipboard item"
            );
            continue;
        }
        let file = item.into_upload(index);
        outcomes.push(orchestrator.process(file, credential).await);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(ClipboardItem::new("image/png", vec![]).is_image());
        assert!(!ClipboardItem::new("text/plain", vec![]).is_image());
        assert!(!ClipboardItem::new("application/image", vec![]).is_image());
    }

    #[test]
    fn test_into_upload_names_by_type() {
        let upload = ClipboardItem::new("image/jpeg", vec![1, 2]).into_upload(0);
        assert_eq!(upload.name, "pasted-1.jpg");
        assert_eq!(upload.declared_mime.as_deref(), Some("image/jpeg"));
        assert_eq!(upload.size(), 2);
    }
}
