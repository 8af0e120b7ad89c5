//! Inline preview classification
//!
//! An allow-list: only images, PDFs and plain text are ever served inline.
//! Everything else is refused rather than guessed at.

use serde::Serialize;

use super::{errors::FileError, types::extension_of};
use crate::Result;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "json", "xml", "csv"];

/// What kind of inline preview a file gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Pdf,
    Text,
}

/// A preview decision: the kind plus the exact content type to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewType {
    pub kind: ContentKind,
    pub content_type: &'static str,
}

/// Classify a filename by its extension (case-insensitive).
pub fn previewable(filename: &str) -> Result<PreviewType> {
    let ext = extension_of(filename).unwrap_or_default();

    let preview = if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        PreviewType {
            kind: ContentKind::Image,
            content_type: match ext.as_str() {
                "jpg" | "jpeg" => "image/jpeg",
                "png" => "image/png",
                "gif" => "image/gif",
                "bmp" => "image/bmp",
                _ => "image/webp",
            },
        }
    } else if ext == "pdf" {
        PreviewType {
            kind: ContentKind::Pdf,
            content_type: "application/pdf",
        }
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        // Served as plain text whatever the flavour, so markup is never rendered.
        PreviewType {
            kind: ContentKind::Text,
            content_type: "text/plain; charset=utf-8",
        }
    } else {
        return Err(FileError::UnsupportedPreview {
            name: filename.to_string(),
        }
        .into());
    };

    Ok(preview)
}
