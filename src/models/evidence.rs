use std::fmt;
use std::path::Path;

use base64::Engine;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::cycle::Cycle;
use super::enums::EmissionStatus;

/// One uploaded certificate file for (company, slot, cycle).
///
/// At most one record exists per triple; a new upload replaces the old one.
#[derive(Clone, PartialEq)]
pub struct EvidenceRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub slot_id: String,
    pub cycle: Cycle,
    pub status: EmissionStatus,
    pub issued_at: NaiveDateTime,
    pub file_name: String,
    /// SHA-256 of the payload, base64.
    pub content_hash: String,
    pub payload: Vec<u8>,
}

impl EvidenceRecord {
    /// Record for a fresh upload, stamped now.
    pub fn new_upload(
        company_id: Uuid,
        slot_id: &str,
        cycle: Cycle,
        file_name: &str,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            slot_id: slot_id.to_string(),
            cycle,
            status: EmissionStatus::Issued,
            issued_at: Local::now().naive_local(),
            file_name: sanitize_file_name(file_name),
            content_hash: content_hash(&payload),
            payload,
        }
    }

    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            id: self.id,
            company_id: self.company_id,
            slot_id: self.slot_id.clone(),
            cycle: self.cycle,
            status: self.status,
            issued_at: self.issued_at,
            file_name: self.file_name.clone(),
            content_hash: self.content_hash.clone(),
            size_bytes: self.payload.len() as u64,
        }
    }
}

impl fmt::Debug for EvidenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceRecord")
            .field("id", &self.id)
            .field("company_id", &self.company_id)
            .field("slot_id", &self.slot_id)
            .field("cycle", &self.cycle)
            .field("status", &self.status)
            .field("issued_at", &self.issued_at)
            .field("file_name", &self.file_name)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Payload-free view of a record, for listings and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: Uuid,
    pub company_id: Uuid,
    pub slot_id: String,
    pub cycle: Cycle,
    pub status: EmissionStatus,
    pub issued_at: NaiveDateTime,
    pub file_name: String,
    pub content_hash: String,
    pub size_bytes: u64,
}

/// SHA-256 content hash, base64.
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_file_name(original: &str) -> String {
    let last = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("certificado");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "certificado".to_string()
    } else {
        clean
    }
}
