use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use super::{cycle_or_current, Context};
use crate::dashboard::{fetch_checklist, Checklist};
use crate::dossier::{classify, PayloadKind};
use crate::format::shorten;
use crate::models::{Cycle, EmissionStatus, EvidenceRecord};

#[derive(Args, Debug)]
pub struct CertArgs {
    #[command(subcommand)]
    pub command: CertCommand,
}

#[derive(Subcommand, Debug)]
pub enum CertCommand {
    /// Show the checklist for a company and cycle.
    List {
        /// Company id or CNPJ.
        company: String,
        /// Cycle as YYYY-MM (defaults to the current month).
        #[arg(long)]
        cycle: Option<Cycle>,
    },

    /// Show where to issue a certificate and what to paste there.
    Hint {
        company: String,
        /// Certificate id or checklist position.
        slot: String,
    },

    /// Attach an issued certificate file, replacing any previous upload.
    Upload {
        company: String,
        slot: String,
        /// PDF, PNG or JPEG file.
        file: PathBuf,
        #[arg(long)]
        cycle: Option<Cycle>,
    },

    /// Remove an uploaded certificate.
    Remove {
        company: String,
        slot: String,
        #[arg(long)]
        cycle: Option<Cycle>,
    },

    /// Cycles that have at least one upload, newest first.
    Cycles { company: String },
}

pub fn run_cert(ctx: &Context, args: &CertArgs) -> Result<u8> {
    match &args.command {
        CertCommand::List { company, cycle } => cmd_list(ctx, company, cycle_or_current(*cycle)),
        CertCommand::Hint { company, slot } => cmd_hint(ctx, company, slot),
        CertCommand::Upload {
            company,
            slot,
            file,
            cycle,
        } => cmd_upload(ctx, company, slot, file, cycle_or_current(*cycle)),
        CertCommand::Remove { company, slot, cycle } => {
            cmd_remove(ctx, company, slot, cycle_or_current(*cycle))
        }
        CertCommand::Cycles { company } => cmd_cycles(ctx, company),
    }
}

fn cmd_list(ctx: &Context, reference: &str, cycle: Cycle) -> Result<u8> {
    let company = ctx.resolve_company(reference)?;
    let checklist = fetch_checklist(&ctx.store, &ctx.catalog, &company.id, cycle)?;
    if ctx.json {
        return ctx.print_json(&checklist).map(|_| 0);
    }

    println!("{} ({}) - {}", company.legal_name, company.formatted_cnpj(), cycle.label());
    print_checklist(&checklist);
    Ok(0)
}

fn print_checklist(checklist: &Checklist) {
    for row in &checklist.rows {
        let mark = match row.status {
            EmissionStatus::Issued => "[x]",
            EmissionStatus::Expired => "[!]",
            EmissionStatus::Pending => "[ ]",
        };
        let detail = match (&row.file_name, row.issued_at) {
            (Some(file), Some(at)) => format!("{} ({})", shorten(file, 32), at.format("%d/%m/%Y %H:%M")),
            _ => String::new(),
        };
        println!("{} {} {:<42} {:<11} {}", row.index, mark, row.name, row.category, detail);
    }
    let p = &checklist.progress;
    println!(
        "{}/{} issued, {} pending ({}%){}",
        p.completed,
        p.total,
        p.pending,
        p.percent,
        if p.incomplete { " - incomplete" } else { "" }
    );
}

#[derive(Serialize)]
struct HintView<'a> {
    slot_id: &'a str,
    name: &'a str,
    url: &'a str,
    copy: String,
    secondary: Option<String>,
    note: Option<&'a str>,
}

fn cmd_hint(ctx: &Context, company_ref: &str, slot_ref: &str) -> Result<u8> {
    let company = ctx.resolve_company(company_ref)?;
    let slot = ctx.resolve_slot(slot_ref)?;
    let view = HintView {
        slot_id: &slot.id,
        name: &slot.name,
        url: &slot.hint.url,
        copy: slot.hint.clipboard_value(&company),
        secondary: slot.hint.secondary_value(&company),
        note: slot.hint.note.as_deref(),
    };
    if ctx.json {
        return ctx.print_json(&view).map(|_| 0);
    }

    println!("{}", view.name);
    println!("  portal: {}", view.url);
    println!("  copy:   {}", view.copy);
    if let Some(secondary) = &view.secondary {
        println!("  also:   {secondary}");
    }
    if let Some(note) = view.note {
        println!("  note:   {note}");
    }
    Ok(0)
}

fn cmd_upload(ctx: &Context, company_ref: &str, slot_ref: &str, file: &Path, cycle: Cycle) -> Result<u8> {
    let company = ctx.resolve_company(company_ref)?;
    let slot = ctx.resolve_slot(slot_ref)?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} is not a file path", file.display()))?;
    let payload = std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
    if payload.is_empty() {
        bail!("{} is empty", file.display());
    }

    if classify(file_name) == PayloadKind::Unsupported {
        tracing::warn!(file = file_name, "not a PDF or image; it will be reported when building the dossier");
    }

    let record = EvidenceRecord::new_upload(company.id, &slot.id, cycle, file_name, payload);
    let replaced = ctx.store.put_record(&record)?;
    if ctx.json {
        return ctx.print_json(&record.summary()).map(|_| 0);
    }
    println!(
        "OK: {} {} for {} ({})",
        if replaced { "replaced" } else { "stored" },
        slot.name,
        company.legal_name,
        cycle.label()
    );
    Ok(0)
}

fn cmd_remove(ctx: &Context, company_ref: &str, slot_ref: &str, cycle: Cycle) -> Result<u8> {
    let company = ctx.resolve_company(company_ref)?;
    let slot = ctx.resolve_slot(slot_ref)?;
    if !ctx.store.delete_record(&company.id, &slot.id, &cycle)? {
        bail!("no upload for {} in {}", slot.name, cycle.label());
    }
    println!("OK: removed {} ({})", slot.name, cycle.label());
    Ok(0)
}

fn cmd_cycles(ctx: &Context, reference: &str) -> Result<u8> {
    let company = ctx.resolve_company(reference)?;
    let cycles = ctx.store.company_cycles(&company.id)?;
    if ctx.json {
        return ctx.print_json(&cycles).map(|_| 0);
    }
    if cycles.is_empty() {
        println!("No uploads yet for {}.", company.legal_name);
    }
    for cycle in cycles {
        println!("{cycle}  {}", cycle.label());
    }
    Ok(0)
}
