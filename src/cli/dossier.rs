use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use super::{cycle_or_current, Context, EXIT_NOTHING_READY, EXIT_PARTIAL};
use crate::config::{self, AssemblyConfig};
use crate::dashboard::fetch_dashboard;
use crate::dossier::{DirectorySink, DossierError, DossierReport, DossierService};
use crate::models::Cycle;

#[derive(Args, Debug)]
pub struct DossierArgs {
    /// Company id or CNPJ.
    pub company: String,

    /// Cycle as YYYY-MM (defaults to the current month).
    #[arg(long)]
    pub cycle: Option<Cycle>,

    /// Output directory (defaults to <data dir>/exports).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Decode sources on the calling thread only.
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Args, Debug)]
pub struct DashboardArgs {
    #[arg(long)]
    pub cycle: Option<Cycle>,
}

pub fn run_dossier(ctx: &Context, args: &DossierArgs) -> Result<u8> {
    let company = ctx.resolve_company(&args.company)?;
    let cycle = cycle_or_current(args.cycle);
    let out_dir = args.out.clone().unwrap_or_else(|| config::exports_dir(&ctx.data_dir));
    let sink = DirectorySink::new(out_dir);
    let assembly_config = AssemblyConfig {
        parallel_decode: !args.sequential,
        ..AssemblyConfig::default()
    };
    let service = DossierService::new(&ctx.store, &ctx.catalog, assembly_config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start worker runtime")?;
    let result = runtime.block_on(service.build_async(&company.id, &cycle, &sink));

    match result {
        Ok(report) => {
            if ctx.json {
                ctx.print_json(&report)?;
            } else {
                print_report(&report, &company.legal_name);
            }
            Ok(if report.failures.is_empty() { 0 } else { EXIT_PARTIAL })
        }
        Err(DossierError::NothingMergeable { failures }) => {
            eprintln!(
                "No certificates ready: nothing for {} in {} could be merged.",
                company.legal_name,
                cycle.label()
            );
            for failure in &failures {
                eprintln!("  {failure}");
            }
            Ok(EXIT_NOTHING_READY)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &DossierReport, company_name: &str) {
    println!("Dossier for {company_name} ({})", report.cycle.label());
    println!("  file:   {}", report.delivery.location);
    println!(
        "  merged: {} certificate(s), {} page(s)",
        report.merged_count, report.page_count
    );
    if !report.failures.is_empty() {
        println!("Dossier has {} issue(s):", report.failures.len());
        for failure in &report.failures {
            println!("  {failure}");
        }
    }
    if !report.missing_slots.is_empty() {
        println!("Not yet issued: {}", report.missing_slots.join(", "));
    }
    if !report.complete {
        println!("(incomplete)");
    }
}

pub fn run_dashboard(ctx: &Context, args: &DashboardArgs) -> Result<u8> {
    let cycle = cycle_or_current(args.cycle);
    let dashboard = fetch_dashboard(&ctx.store, &ctx.catalog, cycle)?;
    if ctx.json {
        return ctx.print_json(&dashboard).map(|_| 0);
    }

    let s = &dashboard.stats;
    println!("Cycle {}", cycle.label());
    println!("  companies:    {}", s.total_companies);
    println!("  certificates: {}/{} issued", s.completed_certificates, s.total_certificates_in_cycle);
    println!("  pending:      {}", s.pending_certificates);
    println!("  compliance:   {}%", s.compliance_percent);
    for company in &dashboard.companies {
        println!(
            "  {:<18} {:>2}/{:<2} {}",
            company.name,
            company.completed,
            company.completed + company.pending,
            if company.full_completion { "complete" } else { "" }
        );
    }
    Ok(0)
}
