//! Merges a company's evidence for one cycle into a single dossier PDF.
//!
//! Slots are visited in catalog order. A slot without a record is skipped;
//! a record that cannot be merged becomes a [`SlotFailure`] and the run goes
//! on. Only a run where nothing could be merged is an error.
//!
//! Decoding (`prepare_slot`) is independent per slot and may happen on
//! worker threads; appending to the output is always serial, in slot order.

use std::collections::BTreeMap;

use lopdf::Document;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use super::classify::{classify, mismatch_hint, PayloadKind};
use super::image_page::{decode_image, DecodedImage};
use super::layout::fit_label;
use super::pdf_merge::{DossierBuilder, SourcePdf, SourceRejection};
use super::types::{Assembly, FailureReason, SlotFailure, SlotOutcome};
use super::DossierError;
use crate::config::AssemblyConfig;
use crate::models::{EvidenceRecord, SlotDefinition};

/// A source file decoded and ready to append.
#[derive(Debug)]
pub enum PreparedSource {
    Pdf(SourcePdf),
    Image(DecodedImage),
}

/// Parse or decode one record. Pure; touches no shared state.
pub fn prepare_slot(record: &EvidenceRecord) -> Result<PreparedSource, SlotFailure> {
    prepare_payload(&record.slot_id, &record.file_name, &record.payload)
}

fn prepare_payload(slot_id: &str, file_name: &str, payload: &[u8]) -> Result<PreparedSource, SlotFailure> {
    let kind = classify(file_name);
    let fail = |reason: FailureReason, detail: Option<String>| {
        let detail = match (detail, mismatch_hint(kind, payload)) {
            (Some(d), Some(hint)) => Some(format!("{d}; {hint}")),
            (d, hint) => d.or(hint),
        };
        SlotFailure::new(slot_id, reason, detail)
    };

    match kind {
        PayloadKind::Pdf => {
            let doc = match Document::load_mem(payload) {
                Ok(doc) => doc,
                Err(e) if contains(payload, b"/Encrypt") => {
                    return Err(fail(FailureReason::PasswordProtectedPdf, Some(e.to_string())));
                }
                Err(e) => return Err(fail(FailureReason::UnreadablePdf, Some(e.to_string()))),
            };
            SourcePdf::new(doc).map(PreparedSource::Pdf).map_err(|rejection| match rejection {
                SourceRejection::Encrypted => fail(FailureReason::PasswordProtectedPdf, None),
                SourceRejection::NoPages => fail(FailureReason::EmptyPdf, None),
            })
        }
        PayloadKind::Png | PayloadKind::Jpeg => decode_image(payload, kind)
            .map(PreparedSource::Image)
            .map_err(|e| fail(FailureReason::UnreadableImage, Some(e))),
        PayloadKind::Unsupported => Err(fail(
            FailureReason::UnsupportedFormat,
            Some(format!("file '{file_name}'")),
        )),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Assemble on the calling thread.
pub fn assemble(
    slots: &[SlotDefinition],
    records: &BTreeMap<String, EvidenceRecord>,
    entity_label: &str,
    config: &AssemblyConfig,
) -> Result<Assembly, DossierError> {
    let mut run = Run::start(slots, records, entity_label, config)?;
    for slot in slots {
        let prepared = records.get(&slot.id).map(prepare_slot);
        run.append(slot, prepared);
    }
    run.finish()
}

/// Assemble with one blocking decode task per present record. Produces the
/// same bytes as [`assemble`].
pub async fn assemble_parallel(
    slots: &[SlotDefinition],
    records: &BTreeMap<String, EvidenceRecord>,
    entity_label: &str,
    config: &AssemblyConfig,
) -> Result<Assembly, DossierError> {
    let mut run = Run::start(slots, records, entity_label, config)?;

    let handles: Vec<_> = slots
        .iter()
        .map(|slot| {
            records.get(&slot.id).map(|record| {
                let slot_id = record.slot_id.clone();
                let file_name = record.file_name.clone();
                let payload = record.payload.clone();
                let handle =
                    tokio::task::spawn_blocking(move || prepare_payload(&slot_id, &file_name, &payload));
                (record, handle)
            })
        })
        .collect();

    for (slot, handle) in slots.iter().zip(handles) {
        let prepared = match handle {
            Some((record, handle)) => Some(settle(&record.slot_id, &record.file_name, handle.await)),
            None => None,
        };
        run.append(slot, prepared);
    }
    run.finish()
}

/// A decode task that died takes down only its own slot.
fn settle(
    slot_id: &str,
    file_name: &str,
    joined: Result<Result<PreparedSource, SlotFailure>, JoinError>,
) -> Result<PreparedSource, SlotFailure> {
    joined.unwrap_or_else(|e| {
        let reason = match classify(file_name) {
            PayloadKind::Pdf => FailureReason::UnreadablePdf,
            PayloadKind::Png | PayloadKind::Jpeg => FailureReason::UnreadableImage,
            PayloadKind::Unsupported => FailureReason::UnsupportedFormat,
        };
        let detail = if e.is_panic() {
            "decoder panicked".to_string()
        } else {
            format!("decoder stopped: {e}")
        };
        Err(SlotFailure::new(slot_id, reason, Some(detail)))
    })
}

/// Serial half of an assembly: owns the output and the bookkeeping.
struct Run<'a> {
    builder: DossierBuilder,
    entity_label: &'a str,
    config: &'a AssemblyConfig,
    merged_count: usize,
    failures: Vec<SlotFailure>,
    outcomes: Vec<SlotOutcome>,
}

impl<'a> Run<'a> {
    fn start(
        slots: &[SlotDefinition],
        records: &BTreeMap<String, EvidenceRecord>,
        entity_label: &'a str,
        config: &'a AssemblyConfig,
    ) -> Result<Self, DossierError> {
        if slots.is_empty() {
            return Err(DossierError::EmptyCatalog);
        }
        config.validate().map_err(DossierError::InvalidConfig)?;

        info!(
            entity = entity_label,
            slots = slots.len(),
            records = records.len(),
            "assembling dossier"
        );
        Ok(Self {
            builder: DossierBuilder::new(),
            entity_label,
            config,
            merged_count: 0,
            failures: Vec::new(),
            outcomes: Vec::with_capacity(slots.len()),
        })
    }

    fn append(&mut self, slot: &SlotDefinition, prepared: Option<Result<PreparedSource, SlotFailure>>) {
        let outcome = match prepared {
            None => SlotOutcome::Missing {
                slot_id: slot.id.clone(),
            },
            Some(Err(failure)) => SlotOutcome::Failed(failure),
            Some(Ok(PreparedSource::Pdf(source))) => SlotOutcome::Merged {
                slot_id: slot.id.clone(),
                pages: self.builder.append_pdf(source),
            },
            Some(Ok(PreparedSource::Image(image))) => {
                let label = fit_label(&format!("{} - {}", slot.name, self.entity_label), self.config);
                match self.builder.append_image_page(&image, &label, self.config) {
                    Ok(()) => SlotOutcome::Merged {
                        slot_id: slot.id.clone(),
                        pages: 1,
                    },
                    Err(e) => SlotOutcome::Failed(SlotFailure::new(
                        &slot.id,
                        FailureReason::UnreadableImage,
                        Some(e.to_string()),
                    )),
                }
            }
        };

        match &outcome {
            SlotOutcome::Missing { slot_id } => debug!(slot_id = %slot_id, "no record, slot skipped"),
            SlotOutcome::Merged { slot_id, pages } => {
                self.merged_count += 1;
                debug!(slot_id = %slot_id, pages, "slot merged");
            }
            SlotOutcome::Failed(failure) => {
                warn!(
                    slot_id = %failure.slot_id,
                    reason = %failure.reason,
                    detail = failure.detail.as_deref().unwrap_or(""),
                    "slot could not be merged"
                );
                self.failures.push(failure.clone());
            }
        }
        self.outcomes.push(outcome);
    }

    fn finish(self) -> Result<Assembly, DossierError> {
        if self.merged_count == 0 {
            warn!(failures = self.failures.len(), "nothing mergeable");
            return Err(DossierError::NothingMergeable {
                failures: self.failures,
            });
        }

        let page_count = self.builder.page_count();
        let title = format!("Dossiê de certidões - {}", self.entity_label);
        let bytes = self
            .builder
            .finish(&title)
            .map_err(|e| DossierError::Serialization(e.to_string()))?;

        info!(
            merged = self.merged_count,
            pages = page_count,
            failures = self.failures.len(),
            bytes = bytes.len(),
            "dossier assembled"
        );
        Ok(Assembly {
            bytes,
            merged_count: self.merged_count,
            page_count,
            failures: self.failures,
            outcomes: self.outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dossier::fixtures;
    use crate::models::{CertificateCategory, Cycle};
    use uuid::Uuid;

    fn slot(id: &str, name: &str) -> SlotDefinition {
        SlotDefinition::new(id, name, CertificateCategory::Federal, "https://example.gov.br")
    }

    fn abc() -> Vec<SlotDefinition> {
        vec![slot("a", "Slot A"), slot("b", "Slot B"), slot("c", "Slot C")]
    }

    fn record(slot_id: &str, file_name: &str, payload: Vec<u8>) -> (String, EvidenceRecord) {
        let cycle: Cycle = "2024-03".parse().unwrap();
        let rec = EvidenceRecord::new_upload(Uuid::nil(), slot_id, cycle, file_name, payload);
        (slot_id.to_string(), rec)
    }

    fn run(slots: &[SlotDefinition], records: &BTreeMap<String, EvidenceRecord>) -> Result<Assembly, DossierError> {
        assemble(slots, records, "Acme", &AssemblyConfig::default())
    }

    #[test]
    fn pdf_and_image_merge_in_catalog_order() {
        let records = BTreeMap::from([
            record("a", "a.pdf", fixtures::pdf("A", 2)),
            record("c", "c.png", fixtures::png(40, 20)),
        ]);
        let out = run(&abc(), &records).unwrap();

        assert_eq!(out.merged_count, 2);
        assert_eq!(out.page_count, 3);
        assert!(out.failures.is_empty());
        assert_eq!(out.missing_slots(), vec!["b"]);
        assert!(!out.is_complete());

        let texts = fixtures::page_texts(&out.bytes);
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("(A-1)"));
        assert!(texts[1].contains("(A-2)"));
        assert!(texts[2].contains("Slot C - Acme"));
    }

    #[test]
    fn corrupt_pdf_is_recorded_and_run_continues() {
        let records = BTreeMap::from([
            record("a", "a.pdf", b"%PDF-1.4 this is not really a pdf".to_vec()),
            record("c", "c.png", fixtures::png(40, 20)),
        ]);
        let out = run(&abc(), &records).unwrap();

        assert_eq!(out.merged_count, 1);
        assert_eq!(out.page_count, 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].slot_id, "a");
        assert_eq!(out.failures[0].reason, FailureReason::UnreadablePdf);
    }

    #[test]
    fn failure_in_the_middle_does_not_block_neighbours() {
        let records = BTreeMap::from([
            record("a", "a.pdf", fixtures::pdf("A", 1)),
            record("b", "b.jpg", b"not a jpeg".to_vec()),
            record("c", "c.pdf", fixtures::pdf("C", 1)),
        ]);
        let out = run(&abc(), &records).unwrap();

        assert_eq!(out.merged_count, 2);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].slot_id, "b");
        assert_eq!(out.failures[0].reason, FailureReason::UnreadableImage);
        let texts = fixtures::page_texts(&out.bytes);
        assert!(texts[0].contains("(A-1)"));
        assert!(texts[1].contains("(C-1)"));
    }

    #[test]
    fn no_records_is_nothing_mergeable() {
        let err = run(&abc(), &BTreeMap::new()).unwrap_err();
        match err {
            DossierError::NothingMergeable { failures } => assert!(failures.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn only_failures_is_nothing_mergeable_with_details() {
        let records = BTreeMap::from([
            record("a", "a.docx", b"PK\x03\x04".to_vec()),
            record("b", "b.pdf", b"garbage".to_vec()),
        ]);
        let err = run(&abc(), &records).unwrap_err();
        let DossierError::NothingMergeable { failures } = err else {
            panic!("expected NothingMergeable");
        };
        let reasons: Vec<_> = failures.iter().map(|f| f.reason).collect();
        assert_eq!(reasons, vec![FailureReason::UnsupportedFormat, FailureReason::UnreadablePdf]);
    }

    #[test]
    fn page_order_follows_catalog_not_map_or_upload_order() {
        let slots = vec![slot("zeta", "Zeta"), slot("alpha", "Alpha")];
        let records = BTreeMap::from([
            record("alpha", "alpha.pdf", fixtures::pdf("ALPHA", 1)),
            record("zeta", "zeta.pdf", fixtures::pdf("ZETA", 1)),
        ]);
        let out = run(&slots, &records).unwrap();
        let texts = fixtures::page_texts(&out.bytes);
        assert!(texts[0].contains("(ZETA-1)"));
        assert!(texts[1].contains("(ALPHA-1)"));
    }

    #[test]
    fn extension_decides_even_when_content_disagrees() {
        let records = BTreeMap::from([record("a", "scan.pdf", fixtures::png(4, 4))]);
        let err = run(&abc(), &records).unwrap_err();
        let DossierError::NothingMergeable { failures } = err else {
            panic!("expected NothingMergeable");
        };
        assert_eq!(failures[0].reason, FailureReason::UnreadablePdf);
        assert!(failures[0].detail.as_deref().unwrap().contains("content looks like PNG"));
    }

    #[test]
    fn jpeg_and_empty_pdf() {
        let records = BTreeMap::from([
            record("a", "a.pdf", fixtures::empty_pdf()),
            record("b", "b.JPEG", fixtures::jpeg(30, 30)),
        ]);
        let out = run(&abc(), &records).unwrap();
        assert_eq!(out.merged_count, 1);
        assert_eq!(out.failures[0].reason, FailureReason::EmptyPdf);
        assert_eq!(
            out.outcomes,
            vec![
                SlotOutcome::Failed(out.failures[0].clone()),
                SlotOutcome::Merged { slot_id: "b".into(), pages: 1 },
                SlotOutcome::Missing { slot_id: "c".into() },
            ]
        );
    }

    #[test]
    fn all_slots_merged_is_complete() {
        let records = BTreeMap::from([
            record("a", "a.pdf", fixtures::pdf("A", 1)),
            record("b", "b.png", fixtures::png_with_alpha(10, 10)),
            record("c", "c.jpg", fixtures::jpeg(10, 10)),
        ]);
        let out = run(&abc(), &records).unwrap();
        assert!(out.is_complete());
        assert_eq!(out.page_count, 3);
    }

    #[test]
    fn empty_catalog_and_bad_config_are_rejected() {
        assert!(matches!(run(&[], &BTreeMap::new()), Err(DossierError::EmptyCatalog)));

        let config = AssemblyConfig {
            margin: -1.0,
            ..AssemblyConfig::default()
        };
        let err = assemble(&abc(), &BTreeMap::new(), "Acme", &config).unwrap_err();
        assert!(matches!(err, DossierError::InvalidConfig(_)));
    }

    #[test]
    fn encrypted_marker_without_valid_structure_is_password_protected() {
        let payload = b"%PDF-1.4\n1 0 obj << /Filter /Standard >> endobj\ntrailer << /Encrypt 1 0 R >>".to_vec();
        let records = BTreeMap::from([
            record("a", "a.pdf", payload),
            record("b", "b.pdf", fixtures::pdf("B", 1)),
        ]);
        let out = run(&abc(), &records).unwrap();
        assert_eq!(out.failures[0].reason, FailureReason::PasswordProtectedPdf);
    }

    #[tokio::test]
    async fn parallel_decode_matches_sequential() {
        let records = BTreeMap::from([
            record("a", "a.pdf", fixtures::pdf("A", 3)),
            record("b", "b.bmp", vec![0x42, 0x4D]),
            record("c", "c.png", fixtures::png(64, 48)),
        ]);
        let config = AssemblyConfig::default();
        let sequential = assemble(&abc(), &records, "Acme", &config).unwrap();
        let parallel = assemble_parallel(&abc(), &records, "Acme", &config).await.unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.page_count, 4);
        assert_eq!(parallel.failures[0].reason, FailureReason::UnsupportedFormat);
    }

    #[tokio::test]
    async fn crashed_decoder_fails_only_its_slot() {
        let joined = tokio::task::spawn_blocking(|| -> Result<PreparedSource, SlotFailure> {
            panic!("decoder bug")
        })
        .await;
        let crashed = settle("b", "b.png", joined);

        let slots = abc();
        let records = BTreeMap::from([record("a", "a.pdf", fixtures::pdf("A", 2))]);
        let config = AssemblyConfig::default();
        let mut run = Run::start(&slots, &records, "Acme", &config).unwrap();
        run.append(&slots[0], Some(prepare_slot(&records["a"])));
        run.append(&slots[1], Some(crashed));
        run.append(&slots[2], None);
        let assembly = run.finish().unwrap();

        assert_eq!(assembly.merged_count, 1);
        assert_eq!(assembly.page_count, 2);
        assert_eq!(assembly.failures.len(), 1);
        assert_eq!(assembly.failures[0].slot_id, "b");
        assert_eq!(assembly.failures[0].reason, FailureReason::UnreadableImage);
        assert_eq!(assembly.failures[0].detail.as_deref(), Some("decoder panicked"));
    }

    #[tokio::test]
    async fn parallel_nothing_mergeable() {
        let err = assemble_parallel(&abc(), &BTreeMap::new(), "Acme", &AssemblyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DossierError::NothingMergeable { .. }));
    }
}
