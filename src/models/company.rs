use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::format::{format_cnpj, normalize_cnpj, CNPJ_DIGITS};

/// A company whose monthly certificates are tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub legal_name: String,
    /// Digits only.
    pub cnpj: String,
    pub created_at: NaiveDateTime,
}

impl Company {
    /// Build a new company from operator input.
    pub fn new(legal_name: &str, cnpj: &str) -> Result<Self, DatabaseError> {
        let legal_name = legal_name.trim();
        if legal_name.is_empty() {
            return Err(DatabaseError::InvalidInput("legal name is required".into()));
        }
        let cnpj = normalize_cnpj(cnpj);
        if cnpj.len() != CNPJ_DIGITS {
            return Err(DatabaseError::InvalidInput(format!(
                "CNPJ must have {CNPJ_DIGITS} digits, got {}",
                cnpj.len()
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            legal_name: legal_name.to_string(),
            cnpj,
            created_at: Local::now().naive_local(),
        })
    }

    pub fn formatted_cnpj(&self) -> String {
        format_cnpj(&self.cnpj)
    }

    /// Case-insensitive match on the name, or digit match on the CNPJ.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        if self.legal_name.to_lowercase().contains(&term.to_lowercase()) {
            return true;
        }
        let digits = normalize_cnpj(term);
        !digits.is_empty() && self.cnpj.contains(&digits)
    }
}
