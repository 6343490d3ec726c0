use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a slot's file could not be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    UnreadablePdf,
    PasswordProtectedPdf,
    EmptyPdf,
    UnreadableImage,
    UnsupportedFormat,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnreadablePdf => "unreadable PDF",
            Self::PasswordProtectedPdf => "password-protected PDF",
            Self::EmptyPdf => "PDF has no pages",
            Self::UnreadableImage => "unreadable image",
            Self::UnsupportedFormat => "unsupported format",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slot whose record was present but could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFailure {
    pub slot_id: String,
    pub reason: FailureReason,
    /// Underlying parser/decoder message, for the operator.
    pub detail: Option<String>,
}

impl SlotFailure {
    pub fn new(slot_id: &str, reason: FailureReason, detail: Option<String>) -> Self {
        Self {
            slot_id: slot_id.to_string(),
            reason,
            detail,
        }
    }
}

impl fmt::Display for SlotFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {} ({detail})", self.slot_id, self.reason),
            None => write!(f, "{}: {}", self.slot_id, self.reason),
        }
    }
}

/// What happened to one catalog slot during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotOutcome {
    /// No record for this slot: not yet issued. Not a failure.
    Missing { slot_id: String },
    Merged { slot_id: String, pages: usize },
    Failed(SlotFailure),
}

impl SlotOutcome {
    pub fn slot_id(&self) -> &str {
        match self {
            Self::Missing { slot_id } | Self::Merged { slot_id, .. } => slot_id,
            Self::Failed(failure) => &failure.slot_id,
        }
    }
}

/// Result of a successful assembly run.
#[derive(Clone, PartialEq)]
pub struct Assembly {
    /// Serialized PDF.
    pub bytes: Vec<u8>,
    /// Slots whose file was appended.
    pub merged_count: usize,
    /// Pages in the output document.
    pub page_count: usize,
    /// Per-slot failures, in catalog order.
    pub failures: Vec<SlotFailure>,
    /// One entry per catalog slot, in catalog order.
    pub outcomes: Vec<SlotOutcome>,
}

impl Assembly {
    pub fn missing_slots(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SlotOutcome::Missing { .. }))
            .map(SlotOutcome::slot_id)
            .collect()
    }

    /// Every catalog slot was merged.
    pub fn is_complete(&self) -> bool {
        self.merged_count == self.outcomes.len()
    }
}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembly")
            .field("bytes_len", &self.bytes.len())
            .field("merged_count", &self.merged_count)
            .field("page_count", &self.page_count)
            .field("failures", &self.failures)
            .field("outcomes", &self.outcomes)
            .finish()
    }
}
