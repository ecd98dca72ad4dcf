//! Tag normalization and editing.
//!
//! Tags on a note are an ordered list, unique by exact value. Matching is
//! case-sensitive so that a user can keep both `Rust` and `rust` if they want;
//! keyword-derived tags are already lowercase.

use crate::error::{Error, Result};

/// Maximum tag length in characters.
pub const MAX_TAG_LEN: usize = 100;

/// Validate a user-supplied tag.
///
/// Rules:
/// - Non-empty after trimming
/// - At most [`MAX_TAG_LEN`] characters
/// - No control characters
pub fn validate_tag(tag: &str) -> Result<()> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Tag cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TAG_LEN {
        return Err(Error::Validation(format!(
            "Tag must be {} characters or less",
            MAX_TAG_LEN
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::Validation(
            "Tag cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Trim, drop empties, and deduplicate while keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// Append a tag unless already present. Returns true when the list changed.
pub fn add_tag(tags: &mut Vec<String>, tag: &str) -> Result<bool> {
    validate_tag(tag)?;
    let tag = tag.trim();
    if tags.iter().any(|t| t == tag) {
        return Ok(false);
    }
    tags.push(tag.to_string());
    Ok(true)
}

/// Remove a tag. Returns true when the list changed.
pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let before = tags.len();
    tags.retain(|t| t != tag.trim());
    tags.len() != before
}
