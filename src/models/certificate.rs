use serde::{Deserialize, Serialize};

use super::company::Company;
use super::enums::CertificateCategory;
use crate::format::cnpj_base;

/// What the operator copies before opening the issuing portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyValue {
    /// Full CNPJ, digits only.
    Cnpj,
    /// First 8 digits of the CNPJ.
    CnpjBase,
    /// Legal name; the CNPJ is offered as a secondary value.
    LegalName,
}

/// Where and how a certificate is obtained by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionHint {
    pub url: String,
    pub copy: CopyValue,
    /// Extra instruction shown after copying, if any.
    pub note: Option<String>,
}

impl AcquisitionHint {
    /// Primary value to place on the clipboard for `company`.
    pub fn clipboard_value(&self, company: &Company) -> String {
        match self.copy {
            CopyValue::Cnpj => company.cnpj.clone(),
            CopyValue::CnpjBase => cnpj_base(&company.cnpj),
            CopyValue::LegalName => company.legal_name.clone(),
        }
    }

    /// Secondary value, when the portal asks for more than one field.
    pub fn secondary_value(&self, company: &Company) -> Option<String> {
        match self.copy {
            CopyValue::LegalName => Some(company.cnpj.clone()),
            CopyValue::Cnpj | CopyValue::CnpjBase => None,
        }
    }
}

/// One entry of the certificate checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub id: String,
    pub name: String,
    pub category: CertificateCategory,
    pub hint: AcquisitionHint,
}

impl SlotDefinition {
    pub fn new(id: &str, name: &str, category: CertificateCategory, url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            hint: AcquisitionHint {
                url: url.to_string(),
                copy: CopyValue::Cnpj,
                note: None,
            },
        }
    }

    pub fn with_copy(mut self, copy: CopyValue) -> Self {
        self.hint.copy = copy;
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.hint.note = Some(note.to_string());
        self
    }
}
