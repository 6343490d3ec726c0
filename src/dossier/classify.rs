//! Payload classification.
//!
//! The file-name extension decides how a payload is merged. Magic bytes are
//! only read to enrich failure messages when the two disagree.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Pdf,
    Png,
    Jpeg,
    Unsupported,
}

impl PayloadKind {
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Classify by extension, case-insensitively.
pub fn classify(file_name: &str) -> PayloadKind {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => PayloadKind::Pdf,
        Some("png") => PayloadKind::Png,
        Some("jpg") | Some("jpeg") => PayloadKind::Jpeg,
        _ => PayloadKind::Unsupported,
    }
}

/// What the leading bytes look like, if recognizable.
pub fn sniff(payload: &[u8]) -> Option<PayloadKind> {
    match payload {
        // %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => Some(PayloadKind::Pdf),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(PayloadKind::Png),
        [0xFF, 0xD8, 0xFF, ..] => Some(PayloadKind::Jpeg),
        _ => None,
    }
}

/// Hint appended to a failure when content and extension disagree.
pub fn mismatch_hint(declared: PayloadKind, payload: &[u8]) -> Option<String> {
    match sniff(payload) {
        Some(actual) if actual != declared => Some(format!("content looks like {}", actual.as_str())),
        _ => None,
    }
}
