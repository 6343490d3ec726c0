use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

use super::{parse_timestamp, parse_uuid, TS_FORMAT};

const RECORD_COLUMNS: &str =
    "id, company_id, slot_id, cycle, status, issued_at, file_name, content_hash, payload";

const SUMMARY_COLUMNS: &str =
    "id, company_id, slot_id, cycle, status, issued_at, file_name, content_hash, length(payload)";

/// Store `record`, replacing any record with the same (company, slot, cycle).
///
/// Delete and insert run in one transaction. Returns the id of the replaced
/// record, if there was one.
pub fn replace_record(conn: &Connection, record: &EvidenceRecord) -> Result<Option<Uuid>, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let cycle = record.cycle.to_string();
    let company_id = record.company_id.to_string();

    let previous: Option<String> = match tx.query_row(
        "SELECT id FROM emissions WHERE company_id = ?1 AND slot_id = ?2 AND cycle = ?3",
        params![company_id, record.slot_id, cycle],
        |row| row.get(0),
    ) {
        Ok(id) => Some(id),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    if let Some(ref id) = previous {
        tx.execute("DELETE FROM emissions WHERE id = ?1", params![id])?;
    }

    tx.execute(
        "INSERT INTO emissions (id, company_id, slot_id, cycle, status, issued_at, file_name,
         content_hash, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id.to_string(),
            company_id,
            record.slot_id,
            cycle,
            record.status.as_str(),
            record.issued_at.format(TS_FORMAT).to_string(),
            record.file_name,
            record.content_hash,
            record.payload,
        ],
    )?;
    tx.commit()?;

    previous.map(|id| parse_uuid(&id)).transpose()
}

/// All records of a company for one cycle, keyed by slot id.
///
/// A single SELECT, so the result is a consistent snapshot even while
/// uploads are happening on other connections.
pub fn get_records(
    conn: &Connection,
    company_id: &Uuid,
    cycle: &Cycle,
) -> Result<BTreeMap<String, EvidenceRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM emissions WHERE company_id = ?1 AND cycle = ?2"
    ))?;
    let rows = stmt.query_map(params![company_id.to_string(), cycle.to_string()], read_record_row)?;

    let mut records = BTreeMap::new();
    for row in rows {
        let record = record_from_row(row?)?;
        records.insert(record.slot_id.clone(), record);
    }
    Ok(records)
}

#[cfg(test)]
pub fn get_record(
    conn: &Connection,
    company_id: &Uuid,
    slot_id: &str,
    cycle: &Cycle,
) -> Result<Option<EvidenceRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM emissions
         WHERE company_id = ?1 AND slot_id = ?2 AND cycle = ?3"
    ))?;
    let result = stmt.query_row(
        params![company_id.to_string(), slot_id, cycle.to_string()],
        read_record_row,
    );
    match result {
        Ok(row) => Ok(Some(record_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove the record for (company, slot, cycle). Returns whether one existed.
pub fn delete_record(
    conn: &Connection,
    company_id: &Uuid,
    slot_id: &str,
    cycle: &Cycle,
) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM emissions WHERE company_id = ?1 AND slot_id = ?2 AND cycle = ?3",
        params![company_id.to_string(), slot_id, cycle.to_string()],
    )?;
    Ok(rows > 0)
}

/// Payload-free summaries of one company's records in a cycle.
pub fn list_company_summaries(
    conn: &Connection,
    company_id: &Uuid,
    cycle: &Cycle,
) -> Result<Vec<RecordSummary>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM emissions
         WHERE company_id = ?1 AND cycle = ?2 ORDER BY issued_at"
    ))?;
    let rows = stmt.query_map(params![company_id.to_string(), cycle.to_string()], read_summary_row)?;
    collect_summaries(rows)
}

/// Payload-free summaries of every record in a cycle, across companies.
pub fn list_cycle_summaries(conn: &Connection, cycle: &Cycle) -> Result<Vec<RecordSummary>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM emissions WHERE cycle = ?1 ORDER BY company_id, issued_at"
    ))?;
    let rows = stmt.query_map(params![cycle.to_string()], read_summary_row)?;
    collect_summaries(rows)
}

/// Cycles in which a company has at least one record, newest first.
pub fn company_cycles(conn: &Connection, company_id: &Uuid) -> Result<Vec<Cycle>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT cycle FROM emissions WHERE company_id = ?1 ORDER BY cycle DESC",
    )?;
    let rows = stmt.query_map(params![company_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut cycles = Vec::new();
    for row in rows {
        cycles.push(Cycle::from_str(&row?)?);
    }
    Ok(cycles)
}

struct RecordRow {
    id: String,
    company_id: String,
    slot_id: String,
    cycle: String,
    status: String,
    issued_at: String,
    file_name: String,
    content_hash: String,
    payload: Vec<u8>,
}

struct SummaryRow {
    id: String,
    company_id: String,
    slot_id: String,
    cycle: String,
    status: String,
    issued_at: String,
    file_name: String,
    content_hash: String,
    size_bytes: i64,
}

fn read_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        company_id: row.get(1)?,
        slot_id: row.get(2)?,
        cycle: row.get(3)?,
        status: row.get(4)?,
        issued_at: row.get(5)?,
        file_name: row.get(6)?,
        content_hash: row.get(7)?,
        payload: row.get(8)?,
    })
}

fn read_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok(SummaryRow {
        id: row.get(0)?,
        company_id: row.get(1)?,
        slot_id: row.get(2)?,
        cycle: row.get(3)?,
        status: row.get(4)?,
        issued_at: row.get(5)?,
        file_name: row.get(6)?,
        content_hash: row.get(7)?,
        size_bytes: row.get(8)?,
    })
}

fn record_from_row(row: RecordRow) -> Result<EvidenceRecord, DatabaseError> {
    Ok(EvidenceRecord {
        id: parse_uuid(&row.id)?,
        company_id: parse_uuid(&row.company_id)?,
        slot_id: row.slot_id,
        cycle: Cycle::from_str(&row.cycle)?,
        status: EmissionStatus::from_str(&row.status)?,
        issued_at: parse_timestamp(&row.issued_at).unwrap_or_default(),
        file_name: row.file_name,
        content_hash: row.content_hash,
        payload: row.payload,
    })
}

fn summary_from_row(row: SummaryRow) -> Result<RecordSummary, DatabaseError> {
    Ok(RecordSummary {
        id: parse_uuid(&row.id)?,
        company_id: parse_uuid(&row.company_id)?,
        slot_id: row.slot_id,
        cycle: Cycle::from_str(&row.cycle)?,
        status: EmissionStatus::from_str(&row.status)?,
        issued_at: parse_timestamp(&row.issued_at).unwrap_or_default(),
        file_name: row.file_name,
        content_hash: row.content_hash,
        size_bytes: row.size_bytes.max(0) as u64,
    })
}

fn collect_summaries(
    rows: impl Iterator<Item = rusqlite::Result<SummaryRow>>,
) -> Result<Vec<RecordSummary>, DatabaseError> {
    let mut summaries = Vec::new();
    for row in rows {
        summaries.push(summary_from_row(row?)?);
    }
    Ok(summaries)
}
