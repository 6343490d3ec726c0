//! Where finished dossiers go.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::Cycle;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error writing dossier: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid export file name: {0}")]
    InvalidFileName(String),
}

/// A completed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Path or other sink-specific locator.
    pub location: String,
    pub bytes: usize,
}

/// Receives the serialized dossier. The assembler never writes anywhere
/// itself; persistence is the sink's business.
pub trait ExportSink {
    fn deliver(&self, bytes: &[u8], suggested_file_name: &str) -> Result<Delivery, ExportError>;
}

/// `Dossie_<label>_<YYYY-MM>.pdf`, with whitespace runs collapsed to `_` and
/// path separators replaced by `-`.
pub fn suggested_file_name(entity_label: &str, cycle: &Cycle) -> String {
    let label = entity_label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace(['/', '\\'], "-");
    format!("Dossie_{label}_{cycle}.pdf")
}

/// A bare file name: no separators, not empty, not `.` or `..`.
fn check_file_name(name: &str) -> Result<(), ExportError> {
    let bare = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if name.is_empty() || !bare || name.contains(['/', '\\']) {
        return Err(ExportError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Writes dossiers into a directory, atomically (temp file, then rename).
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectorySink {
    fn deliver(&self, bytes: &[u8], suggested_file_name: &str) -> Result<Delivery, ExportError> {
        check_file_name(suggested_file_name)?;
        std::fs::create_dir_all(&self.dir)?;

        let target = self.dir.join(suggested_file_name);
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file_mut().write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| e.error)?;

        tracing::info!(path = %target.display(), bytes = bytes.len(), "dossier exported");
        Ok(Delivery {
            location: target.display().to_string(),
            bytes: bytes.len(),
        })
    }
}

/// Keeps deliveries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub fn deliveries(&self) -> Vec<(String, Vec<u8>)> {
        match self.delivered.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ExportSink for MemorySink {
    fn deliver(&self, bytes: &[u8], suggested_file_name: &str) -> Result<Delivery, ExportError> {
        check_file_name(suggested_file_name)?;
        let mut delivered = self
            .delivered
            .lock()
            .map_err(|_| ExportError::Io(std::io::Error::other("memory sink lock poisoned")))?;
        delivered.push((suggested_file_name.to_string(), bytes.to_vec()));
        Ok(Delivery {
            location: format!("memory:{suggested_file_name}"),
            bytes: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march() -> Cycle {
        "2024-03".parse().unwrap()
    }

    #[test]
    fn file_name_replaces_spaces() {
        assert_eq!(suggested_file_name("Acme Ltda", &march()), "Dossie_Acme_Ltda_2024-03.pdf");
        assert_eq!(
            suggested_file_name("  Acme   Comércio  Ltda ", &march()),
            "Dossie_Acme_Comércio_Ltda_2024-03.pdf"
        );
    }

    #[test]
    fn file_name_never_contains_separators() {
        let name = suggested_file_name("Acme S/A", &march());
        assert_eq!(name, "Dossie_Acme_S-A_2024-03.pdf");
        assert!(check_file_name(&name).is_ok());
    }

    #[test]
    fn rejects_paths_as_file_names() {
        for bad in ["", "..", "../x.pdf", "a/b.pdf", "a\\b.pdf"] {
            assert!(check_file_name(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("exports"));
        let delivery = sink.deliver(b"%PDF-1.7 test", "Dossie_Acme_2024-03.pdf").unwrap();

        let path = dir.path().join("exports").join("Dossie_Acme_2024-03.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 test");
        assert_eq!(delivery.bytes, 13);
        assert_eq!(delivery.location, path.display().to_string());
    }

    #[test]
    fn directory_sink_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.deliver(b"first", "d.pdf").unwrap();
        sink.deliver(b"second", "d.pdf").unwrap();

        assert_eq!(std::fs::read(dir.path().join("d.pdf")).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn memory_sink_records_deliveries() {
        let sink = MemorySink::new();
        sink.deliver(b"abc", "one.pdf").unwrap();
        sink.deliver(b"de", "two.pdf").unwrap();
        let got = sink.deliveries();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1], ("two.pdf".to_string(), b"de".to_vec()));
    }
}
