//! Completion bookkeeping for the portfolio view and the per-company checklist.
//!
//! Only records whose slot is in the catalog and whose status is `issued`
//! count as completed; anything else is pending.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::SlotCatalog;
use crate::db::{DatabaseError, Store};
use crate::format::shorten;
use crate::models::{Company, Cycle, EmissionStatus, RecordSummary, SlotDefinition};

/// Company names in the portfolio chart are cut to this many characters.
const CHART_NAME_CHARS: usize = 18;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Portfolio totals for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub cycle: Cycle,
    pub total_companies: u32,
    pub total_certificates_in_cycle: u32,
    pub completed_certificates: u32,
    pub pending_certificates: u32,
    pub compliance_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProgress {
    pub company_id: Uuid,
    pub name: String,
    pub completed: u32,
    pub pending: u32,
    pub full_completion: bool,
}

/// Portfolio view: totals plus one bar per company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub companies: Vec<CompanyProgress>,
}

/// One company's progress in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProgress {
    pub total: u32,
    pub completed: u32,
    pub pending: u32,
    pub percent: u8,
    /// A dossier built now would miss at least one slot.
    pub incomplete: bool,
}

/// One line of the certificate checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistRow {
    /// 1-based position, zero-padded ("01").
    pub index: String,
    pub slot_id: String,
    pub name: String,
    pub category: String,
    pub status: EmissionStatus,
    pub issued_at: Option<NaiveDateTime>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub company_id: Uuid,
    pub cycle: Cycle,
    pub progress: CycleProgress,
    pub rows: Vec<ChecklistRow>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

fn percent(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

fn counts_as_completed(summary: &RecordSummary, slot_ids: &HashSet<&str>) -> bool {
    summary.status == EmissionStatus::Issued && slot_ids.contains(summary.slot_id.as_str())
}

/// Build the portfolio dashboard from companies and the cycle's summaries.
pub fn compute_dashboard(
    companies: &[Company],
    summaries: &[RecordSummary],
    catalog: &SlotCatalog,
    cycle: Cycle,
) -> Dashboard {
    let slot_ids: HashSet<&str> = catalog.iter().map(|s| s.id.as_str()).collect();
    let per_slot = catalog.len() as u32;

    let mut completed_by_company: HashMap<Uuid, u32> = HashMap::new();
    for summary in summaries.iter().filter(|s| counts_as_completed(s, &slot_ids)) {
        *completed_by_company.entry(summary.company_id).or_default() += 1;
    }

    let progress: Vec<CompanyProgress> = companies
        .iter()
        .map(|company| {
            let completed = completed_by_company.get(&company.id).copied().unwrap_or(0);
            CompanyProgress {
                company_id: company.id,
                name: shorten(&company.legal_name, CHART_NAME_CHARS),
                completed,
                pending: per_slot - completed,
                full_completion: completed == per_slot,
            }
        })
        .collect();

    let total = companies.len() as u32 * per_slot;
    let completed: u32 = progress.iter().map(|p| p.completed).sum();

    Dashboard {
        stats: DashboardStats {
            cycle,
            total_companies: companies.len() as u32,
            total_certificates_in_cycle: total,
            completed_certificates: completed,
            pending_certificates: total - completed,
            compliance_percent: percent(completed, total),
        },
        companies: progress,
    }
}

/// Checklist rows in catalog order, with the matching record if any.
pub fn compute_checklist(
    company_id: Uuid,
    cycle: Cycle,
    summaries: &[RecordSummary],
    catalog: &SlotCatalog,
) -> Checklist {
    let by_slot: HashMap<&str, &RecordSummary> = summaries
        .iter()
        .filter(|s| s.company_id == company_id && s.cycle == cycle)
        .map(|s| (s.slot_id.as_str(), s))
        .collect();

    let rows: Vec<ChecklistRow> = catalog
        .iter()
        .enumerate()
        .map(|(i, slot)| checklist_row(i, slot, by_slot.get(slot.id.as_str()).copied()))
        .collect();

    let total = rows.len() as u32;
    let completed = rows.iter().filter(|r| r.status == EmissionStatus::Issued).count() as u32;

    Checklist {
        company_id,
        cycle,
        progress: CycleProgress {
            total,
            completed,
            pending: total - completed,
            percent: percent(completed, total),
            incomplete: completed < total,
        },
        rows,
    }
}

fn checklist_row(position: usize, slot: &SlotDefinition, record: Option<&RecordSummary>) -> ChecklistRow {
    ChecklistRow {
        index: format!("{:02}", position + 1),
        slot_id: slot.id.clone(),
        name: slot.name.clone(),
        category: slot.category.label().to_string(),
        status: record.map(|r| r.status).unwrap_or(EmissionStatus::Pending),
        issued_at: record.map(|r| r.issued_at),
        file_name: record.map(|r| r.file_name.clone()),
    }
}

// ---------------------------------------------------------------------------
// Store-backed fetches
// ---------------------------------------------------------------------------

pub fn fetch_dashboard(store: &Store, catalog: &SlotCatalog, cycle: Cycle) -> Result<Dashboard, DatabaseError> {
    let companies = store.list_companies()?;
    let summaries = store.list_cycle_summaries(&cycle)?;
    Ok(compute_dashboard(&companies, &summaries, catalog, cycle))
}

pub fn fetch_checklist(
    store: &Store,
    catalog: &SlotCatalog,
    company_id: &Uuid,
    cycle: Cycle,
) -> Result<Checklist, DatabaseError> {
    store.require_company(company_id)?;
    let summaries = store.list_company_summaries(company_id, &cycle)?;
    Ok(compute_checklist(*company_id, cycle, &summaries, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvidenceRecord;

    fn march() -> Cycle {
        "2024-03".parse().unwrap()
    }

    fn seeded() -> (Store, SlotCatalog, Company, Company) {
        let store = Store::open_in_memory().unwrap();
        let catalog = SlotCatalog::standard();
        let acme = Company::new("Acme Comércio e Representações Ltda", "12345678000195").unwrap();
        let beta = Company::new("Beta SA", "98765432000110").unwrap();
        store.insert_company(&acme).unwrap();
        store.insert_company(&beta).unwrap();
        (store, catalog, acme, beta)
    }

    fn upload(store: &Store, company: &Company, slot: &str, cycle: Cycle) {
        store
            .put_record(&EvidenceRecord::new_upload(company.id, slot, cycle, "c.pdf", b"%PDF".to_vec()))
            .unwrap();
    }

    #[test]
    fn percent_rounds_and_handles_zero_total() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(13, 13), 100);
    }

    #[test]
    fn dashboard_counts_per_company_and_totals() {
        let (store, catalog, acme, beta) = seeded();
        for slot in catalog.iter() {
            upload(&store, &acme, &slot.id, march());
        }
        upload(&store, &beta, &catalog.slots()[0].id, march());
        upload(&store, &beta, &catalog.slots()[1].id, "2024-02".parse().unwrap());

        let dash = fetch_dashboard(&store, &catalog, march()).unwrap();
        let n = catalog.len() as u32;
        assert_eq!(dash.stats.total_companies, 2);
        assert_eq!(dash.stats.total_certificates_in_cycle, 2 * n);
        assert_eq!(dash.stats.completed_certificates, n + 1);
        assert_eq!(dash.stats.pending_certificates, n - 1);

        let acme_bar = dash.companies.iter().find(|c| c.company_id == acme.id).unwrap();
        assert!(acme_bar.full_completion);
        assert_eq!(acme_bar.pending, 0);
        assert!(acme_bar.name.ends_with("..."));

        let beta_bar = dash.companies.iter().find(|c| c.company_id == beta.id).unwrap();
        assert_eq!(beta_bar.completed, 1);
        assert!(!beta_bar.full_completion);
    }

    #[test]
    fn records_for_unknown_slots_do_not_count() {
        let (store, catalog, acme, _) = seeded();
        upload(&store, &acme, "retired-slot", march());
        let dash = fetch_dashboard(&store, &catalog, march()).unwrap();
        assert_eq!(dash.stats.completed_certificates, 0);
    }

    #[test]
    fn empty_portfolio_is_zero_percent() {
        let store = Store::open_in_memory().unwrap();
        let dash = fetch_dashboard(&store, &SlotCatalog::standard(), march()).unwrap();
        assert_eq!(dash.stats.total_certificates_in_cycle, 0);
        assert_eq!(dash.stats.compliance_percent, 0);
    }

    #[test]
    fn checklist_rows_follow_catalog_with_padded_index() {
        let (store, catalog, acme, _) = seeded();
        let second = catalog.slots()[1].id.clone();
        upload(&store, &acme, &second, march());

        let checklist = fetch_checklist(&store, &catalog, &acme.id, march()).unwrap();
        assert_eq!(checklist.rows.len(), catalog.len());
        assert_eq!(checklist.rows[0].index, "01");
        assert_eq!(checklist.rows[9].index, "10");
        assert_eq!(checklist.rows[0].status, EmissionStatus::Pending);
        assert_eq!(checklist.rows[1].status, EmissionStatus::Issued);
        assert_eq!(checklist.rows[1].file_name.as_deref(), Some("c.pdf"));
        assert_eq!(checklist.progress.completed, 1);
        assert!(checklist.progress.incomplete);
    }

    #[test]
    fn checklist_for_unknown_company_fails() {
        let (store, catalog, _, _) = seeded();
        assert!(fetch_checklist(&store, &catalog, &Uuid::new_v4(), march()).is_err());
    }
}
