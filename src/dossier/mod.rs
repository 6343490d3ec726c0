pub mod assembler;
pub mod classify;
pub mod export;
pub mod image_page;
pub mod layout;
pub mod pdf_merge;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assembler::*;
pub use classify::*;
pub use export::*;
pub use service::*;
pub use types::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum DossierError {
    #[error("Nothing mergeable: no certificate could be added to the dossier ({} file(s) failed)", .failures.len())]
    NothingMergeable { failures: Vec<SlotFailure> },

    #[error("Slot catalog is empty")]
    EmptyCatalog,

    #[error("Invalid assembly configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not serialize dossier: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Store(#[from] DatabaseError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}
