use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

use super::{parse_timestamp, parse_uuid, TS_FORMAT};

/// Insert a company. The CNPJ is the business identifier and must be unique.
pub fn insert_company(conn: &Connection, company: &Company) -> Result<(), DatabaseError> {
    if find_company_by_cnpj(conn, &company.cnpj)?.is_some() {
        return Err(DatabaseError::DuplicateCompany {
            cnpj: company.formatted_cnpj(),
        });
    }
    conn.execute(
        "INSERT INTO companies (id, legal_name, cnpj, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            company.id.to_string(),
            company.legal_name,
            company.cnpj,
            company.created_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_company(conn: &Connection, id: &Uuid) -> Result<Option<Company>, DatabaseError> {
    query_one(
        conn,
        "SELECT id, legal_name, cnpj, created_at FROM companies WHERE id = ?1",
        &id.to_string(),
    )
}

pub fn find_company_by_cnpj(conn: &Connection, cnpj: &str) -> Result<Option<Company>, DatabaseError> {
    query_one(
        conn,
        "SELECT id, legal_name, cnpj, created_at FROM companies WHERE cnpj = ?1",
        cnpj,
    )
}

/// All companies, ordered by legal name.
pub fn list_companies(conn: &Connection) -> Result<Vec<Company>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, legal_name, cnpj, created_at FROM companies
         ORDER BY legal_name COLLATE NOCASE, created_at",
    )?;
    let rows = stmt.query_map([], read_row)?;

    let mut companies = Vec::new();
    for row in rows {
        companies.push(company_from_row(row?)?);
    }
    Ok(companies)
}

/// Delete a company. Its evidence records go with it (ON DELETE CASCADE).
pub fn delete_company(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute("DELETE FROM companies WHERE id = ?1", params![id.to_string()])?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Company".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

struct CompanyRow {
    id: String,
    legal_name: String,
    cnpj: String,
    created_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompanyRow> {
    Ok(CompanyRow {
        id: row.get(0)?,
        legal_name: row.get(1)?,
        cnpj: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn query_one(conn: &Connection, sql: &str, key: &str) -> Result<Option<Company>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    match stmt.query_row(params![key], read_row) {
        Ok(row) => Ok(Some(company_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn company_from_row(row: CompanyRow) -> Result<Company, DatabaseError> {
    Ok(Company {
        id: parse_uuid(&row.id)?,
        legal_name: row.legal_name,
        cnpj: row.cnpj,
        created_at: parse_timestamp(&row.created_at).unwrap_or_default(),
    })
}
