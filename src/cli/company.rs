use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use super::Context;
use crate::format::shorten;
use crate::models::Company;

#[derive(Args, Debug)]
pub struct CompanyArgs {
    #[command(subcommand)]
    pub command: CompanyCommand,
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    /// Register a company.
    Add {
        /// Legal name (razão social).
        #[arg(long)]
        name: String,
        /// CNPJ, formatted or digits only.
        #[arg(long)]
        cnpj: String,
    },

    /// List registered companies.
    List {
        /// Filter by name or CNPJ fragment.
        #[arg(long)]
        search: Option<String>,
    },

    /// Remove a company and every certificate uploaded for it.
    Remove {
        /// Company id or CNPJ.
        company: String,
    },
}

#[derive(Serialize)]
struct CompanyView<'a> {
    id: String,
    legal_name: &'a str,
    cnpj: String,
    created_at: String,
}

impl<'a> From<&'a Company> for CompanyView<'a> {
    fn from(c: &'a Company) -> Self {
        Self {
            id: c.id.to_string(),
            legal_name: &c.legal_name,
            cnpj: c.formatted_cnpj(),
            created_at: c.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

pub fn run_company(ctx: &Context, args: &CompanyArgs) -> Result<u8> {
    match &args.command {
        CompanyCommand::Add { name, cnpj } => cmd_add(ctx, name, cnpj),
        CompanyCommand::List { search } => cmd_list(ctx, search.as_deref()),
        CompanyCommand::Remove { company } => cmd_remove(ctx, company),
    }
}

fn cmd_add(ctx: &Context, name: &str, cnpj: &str) -> Result<u8> {
    let company = Company::new(name, cnpj)?;
    ctx.store.insert_company(&company)?;
    if ctx.json {
        ctx.print_json(&CompanyView::from(&company))?;
    } else {
        println!("OK: registered {} ({})", company.legal_name, company.formatted_cnpj());
        println!("  id: {}", company.id);
    }
    Ok(0)
}

fn cmd_list(ctx: &Context, search: Option<&str>) -> Result<u8> {
    let companies: Vec<Company> = ctx
        .store
        .list_companies()?
        .into_iter()
        .filter(|c| search.map_or(true, |term| c.matches(term)))
        .collect();

    if ctx.json {
        let views: Vec<CompanyView<'_>> = companies.iter().map(CompanyView::from).collect();
        return ctx.print_json(&views).map(|_| 0);
    }

    if companies.is_empty() {
        println!("No companies registered.");
        return Ok(0);
    }
    for company in &companies {
        println!(
            "{:<40} {:<18} {}",
            shorten(&company.legal_name, 40),
            company.formatted_cnpj(),
            company.id
        );
    }
    println!("{} company(ies)", companies.len());
    Ok(0)
}

fn cmd_remove(ctx: &Context, reference: &str) -> Result<u8> {
    let company = ctx.resolve_company(reference)?;
    ctx.store.delete_company(&company.id)?;
    println!("OK: removed {} and its certificates", company.legal_name);
    Ok(0)
}
