//! Stored file metadata and the stored-name format
//!
//! Uploads are written under a generated name of the form
//! `<unix-millis>-<8 hex chars>-<original name>`. The prefix keeps names unique
//! even when the same file is uploaded twice in the same millisecond; the
//! suffix keeps the original extension and lets a listing show the name the
//! user chose without any side index.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Length of the random hex segment of a stored name.
pub const RANDOM_SUFFIX_LENGTH: usize = 8;

/// Metadata for one file in a user's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Name as uploaded, for display
    pub name: String,
    /// Generated on-disk name; a stable identifier for this upload
    pub stored_name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Lowercased extension without the dot, or `unknown`
    #[serde(rename = "type")]
    pub file_type: String,
}

/// Lowercased extension of `name`, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// The `type` field shown to clients.
pub fn file_type_of(name: &str) -> String {
    extension_of(name).unwrap_or_else(|| "unknown".to_string())
}

/// Build a stored name from its parts.
pub(crate) fn encode_stored_name(millis: u64, suffix: &str, original: &str) -> String {
    format!("{millis}-{suffix}-{original}")
}

/// Parsed form of a generated stored name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredName<'a> {
    pub millis: u64,
    pub original: &'a str,
}

/// Split a stored name back into its parts.
///
/// Returns `None` for anything that was not produced by
/// [`encode_stored_name`], e.g. files dropped into the directory by hand.
pub(crate) fn decode_stored_name(stored: &str) -> Option<StoredName<'_>> {
    let mut parts = stored.splitn(3, '-');
    let millis = parts.next()?;
    let suffix = parts.next()?;
    let original = parts.next()?;

    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if suffix.len() != RANDOM_SUFFIX_LENGTH || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if original.is_empty() {
        return None;
    }

    Some(StoredName {
        millis: millis.parse().ok()?,
        original,
    })
}

/// Display name for a directory entry.
pub(crate) fn display_name(stored: &str) -> &str {
    decode_stored_name(stored)
        .map(|parsed| parsed.original)
        .unwrap_or(stored)
}
