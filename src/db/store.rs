//! Record store handle.
//!
//! `Store` owns one SQLite connection for the life of the process. It is
//! opened explicitly at startup, handed to whoever needs it and closed at
//! shutdown; there is no global connection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use super::{repository, sqlite, DatabaseError};
use crate::format::normalize_cnpj;
use crate::models::{Company, Cycle, EvidenceRecord, RecordSummary};

pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the store at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::InvalidInput(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = sqlite::open_database(path)?;
        tracing::info!(path = %path.display(), "record store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(sqlite::open_memory_database()?),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the underlying connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<(), DatabaseError> {
        let conn = self.conn.into_inner().map_err(|_| DatabaseError::LockPoisoned)?;
        conn.close().map_err(|(_, e)| DatabaseError::Sqlite(e))?;
        tracing::debug!("record store closed");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    // ── Companies ───────────────────────────────────────────

    pub fn insert_company(&self, company: &Company) -> Result<(), DatabaseError> {
        repository::insert_company(&*self.conn()?, company)?;
        tracing::info!(company_id = %company.id, "company registered");
        Ok(())
    }

    pub fn get_company(&self, id: &Uuid) -> Result<Option<Company>, DatabaseError> {
        repository::get_company(&*self.conn()?, id)
    }

    /// Like `get_company`, but a missing company is an error.
    pub fn require_company(&self, id: &Uuid) -> Result<Company, DatabaseError> {
        self.get_company(id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "Company".into(),
            id: id.to_string(),
        })
    }

    /// Look up by CNPJ, formatted or digits only.
    pub fn find_company_by_cnpj(&self, cnpj: &str) -> Result<Option<Company>, DatabaseError> {
        repository::find_company_by_cnpj(&*self.conn()?, &normalize_cnpj(cnpj))
    }

    pub fn list_companies(&self) -> Result<Vec<Company>, DatabaseError> {
        repository::list_companies(&*self.conn()?)
    }

    pub fn delete_company(&self, id: &Uuid) -> Result<(), DatabaseError> {
        repository::delete_company(&*self.conn()?, id)?;
        tracing::info!(company_id = %id, "company deleted with its records");
        Ok(())
    }

    // ── Evidence records ────────────────────────────────────

    /// Store a record, replacing the one sharing (company, slot, cycle).
    /// Returns `true` when a previous record was replaced.
    pub fn put_record(&self, record: &EvidenceRecord) -> Result<bool, DatabaseError> {
        let replaced = repository::replace_record(&*self.conn()?, record)?;
        tracing::info!(
            company_id = %record.company_id,
            slot_id = %record.slot_id,
            cycle = %record.cycle,
            replaced = replaced.is_some(),
            "evidence record stored"
        );
        Ok(replaced.is_some())
    }

    /// Snapshot of one company's records for a cycle, keyed by slot id.
    pub fn get_records(
        &self,
        company_id: &Uuid,
        cycle: &Cycle,
    ) -> Result<BTreeMap<String, EvidenceRecord>, DatabaseError> {
        repository::get_records(&*self.conn()?, company_id, cycle)
    }

    pub fn delete_record(&self, company_id: &Uuid, slot_id: &str, cycle: &Cycle) -> Result<bool, DatabaseError> {
        repository::delete_record(&*self.conn()?, company_id, slot_id, cycle)
    }

    pub fn list_company_summaries(
        &self,
        company_id: &Uuid,
        cycle: &Cycle,
    ) -> Result<Vec<RecordSummary>, DatabaseError> {
        repository::list_company_summaries(&*self.conn()?, company_id, cycle)
    }

    pub fn list_cycle_summaries(&self, cycle: &Cycle) -> Result<Vec<RecordSummary>, DatabaseError> {
        repository::list_cycle_summaries(&*self.conn()?, cycle)
    }

    pub fn company_cycles(&self, company_id: &Uuid) -> Result<Vec<Cycle>, DatabaseError> {
        repository::company_cycles(&*self.conn()?, company_id)
    }
}
