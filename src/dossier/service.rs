use serde::Serialize;
use uuid::Uuid;

use super::assembler::{assemble, assemble_parallel};
use super::export::{suggested_file_name, Delivery, ExportSink};
use super::types::{Assembly, SlotFailure};
use super::DossierError;
use crate::catalog::SlotCatalog;
use crate::config::AssemblyConfig;
use crate::db::Store;
use crate::models::{Company, Cycle};

/// What the operator is told after a dossier run.
#[derive(Debug, Clone, Serialize)]
pub struct DossierReport {
    pub company_id: Uuid,
    pub cycle: Cycle,
    pub file_name: String,
    pub delivery: Delivery,
    pub merged_count: usize,
    pub page_count: usize,
    pub failures: Vec<SlotFailure>,
    pub missing_slots: Vec<String>,
    /// Every catalog slot made it into the document.
    pub complete: bool,
}

/// Reads a company's records, assembles them and hands the result to a sink.
pub struct DossierService<'a> {
    store: &'a Store,
    catalog: &'a SlotCatalog,
    config: AssemblyConfig,
}

impl<'a> DossierService<'a> {
    pub fn new(store: &'a Store, catalog: &'a SlotCatalog, config: AssemblyConfig) -> Self {
        Self { store, catalog, config }
    }

    /// Assemble on the calling thread and deliver.
    pub fn build(
        &self,
        company_id: &Uuid,
        cycle: &Cycle,
        sink: &dyn ExportSink,
    ) -> Result<DossierReport, DossierError> {
        let company = self.store.require_company(company_id)?;
        let records = self.store.get_records(company_id, cycle)?;
        let assembly = assemble(self.catalog.slots(), &records, &company.legal_name, &self.config)?;
        self.deliver(&company, cycle, assembly, sink)
    }

    /// Like [`build`](Self::build), decoding sources on blocking worker
    /// threads when `parallel_decode` is on.
    pub async fn build_async(
        &self,
        company_id: &Uuid,
        cycle: &Cycle,
        sink: &dyn ExportSink,
    ) -> Result<DossierReport, DossierError> {
        let company = self.store.require_company(company_id)?;
        // Read once; uploads landing mid-run are not part of this dossier.
        let records = self.store.get_records(company_id, cycle)?;
        let slots = self.catalog.slots();
        let assembly = if self.config.parallel_decode {
            assemble_parallel(slots, &records, &company.legal_name, &self.config).await?
        } else {
            assemble(slots, &records, &company.legal_name, &self.config)?
        };
        self.deliver(&company, cycle, assembly, sink)
    }

    fn deliver(
        &self,
        company: &Company,
        cycle: &Cycle,
        assembly: Assembly,
        sink: &dyn ExportSink,
    ) -> Result<DossierReport, DossierError> {
        let file_name = suggested_file_name(&company.legal_name, cycle);
        let delivery = sink.deliver(&assembly.bytes, &file_name)?;
        let complete = assembly.is_complete();
        if !complete {
            tracing::warn!(
                company_id = %company.id,
                cycle = %cycle,
                failures = assembly.failures.len(),
                missing = assembly.missing_slots().len(),
                "delivered an incomplete dossier"
            );
        }

        Ok(DossierReport {
            company_id: company.id,
            cycle: *cycle,
            file_name,
            delivery,
            merged_count: assembly.merged_count,
            page_count: assembly.page_count,
            missing_slots: assembly.missing_slots().into_iter().map(String::from).collect(),
            failures: assembly.failures,
            complete,
        })
    }
}
