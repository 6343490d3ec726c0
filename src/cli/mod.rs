//! Command-line surface of the `certigest` binary.

pub mod cert;
pub mod company;
pub mod dossier;

use std::path::PathBuf;

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::SlotCatalog;
use crate::config;
use crate::db::Store;
use crate::models::{Company, Cycle, SlotDefinition};

use cert::CertArgs;
use company::CompanyArgs;
use dossier::{DashboardArgs, DossierArgs};

/// Exit code when a dossier was delivered but some files could not be merged.
pub const EXIT_PARTIAL: u8 = 2;
/// Exit code when no certificate could be merged at all.
pub const EXIT_NOTHING_READY: u8 = 3;

/// Monthly clearance-certificate checklist and dossier builder.
#[derive(Parser, Debug)]
#[command(name = "certigest", version, about, long_about = None)]
pub struct Cli {
    /// Verbose logging. Repeat for more (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory holding the database and exports.
    #[arg(long, global = true, env = config::DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register, list and remove companies.
    Company(CompanyArgs),

    /// Work with one company's certificate checklist.
    Cert(CertArgs),

    /// Merge a company's certificates for a cycle into one PDF.
    Dossier(DossierArgs),

    /// Portfolio completion for a cycle.
    Dashboard(DashboardArgs),
}

/// Shared state for one command invocation.
pub struct Context {
    pub store: Store,
    pub catalog: SlotCatalog,
    pub data_dir: PathBuf,
    pub json: bool,
}

impl Context {
    pub fn open(data_dir: PathBuf, json: bool) -> Result<Self> {
        let db_path = config::database_path(&data_dir);
        let store = Store::open(&db_path)
            .with_context(|| format!("cannot open database at {}", db_path.display()))?;
        Ok(Self {
            store,
            catalog: SlotCatalog::standard(),
            data_dir,
            json,
        })
    }

    /// Find a company by id or CNPJ.
    pub fn resolve_company(&self, reference: &str) -> Result<Company> {
        let found = match Uuid::parse_str(reference.trim()) {
            Ok(id) => self.store.get_company(&id)?,
            Err(_) => self.store.find_company_by_cnpj(reference)?,
        };
        found.ok_or_else(|| anyhow!("no company matches '{reference}' (use an id or a CNPJ)"))
    }

    /// Find a slot by id or by its 1-based checklist position ("3", "03").
    pub fn resolve_slot(&self, reference: &str) -> Result<&SlotDefinition> {
        if let Some(slot) = self.catalog.get(reference) {
            return Ok(slot);
        }
        reference
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.catalog.slots().get(i))
            .ok_or_else(|| anyhow!("unknown certificate '{reference}'"))
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub fn cycle_or_current(cycle: Option<Cycle>) -> Cycle {
    cycle.unwrap_or_else(Cycle::current)
}

/// Dispatch a parsed command. Returns the process exit code.
pub fn dispatch(cli: Cli) -> Result<u8> {
    let data_dir = cli.data_dir.unwrap_or_else(config::app_data_dir);
    tracing::debug!(data_dir = %data_dir.display(), "resolved data directory");
    let ctx = Context::open(data_dir, cli.json)?;

    let code = match cli.command {
        Commands::Company(args) => company::run_company(&ctx, &args)?,
        Commands::Cert(args) => cert::run_cert(&ctx, &args)?,
        Commands::Dossier(args) => dossier::run_dossier(&ctx, &args)?,
        Commands::Dashboard(args) => dossier::run_dashboard(&ctx, &args)?,
    };
    ctx.store.close()?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert::CertCommand;
    use company::CompanyCommand;

    #[test]
    fn cli_parse_company_add() {
        let cli = Cli::try_parse_from([
            "certigest",
            "company",
            "add",
            "--name",
            "Acme Ltda",
            "--cnpj",
            "12.345.678/0001-95",
        ])
        .unwrap();
        let Commands::Company(args) = cli.command else {
            panic!("expected company command");
        };
        match args.command {
            CompanyCommand::Add { name, cnpj } => {
                assert_eq!(name, "Acme Ltda");
                assert_eq!(cnpj, "12.345.678/0001-95");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "certigest",
            "dashboard",
            "--cycle",
            "2024-03",
            "--json",
            "-vv",
            "--data-dir",
            "/tmp/cg",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/cg")));
        let Commands::Dashboard(args) = cli.command else {
            panic!("expected dashboard");
        };
        assert_eq!(args.cycle, Some("2024-03".parse().unwrap()));
    }

    #[test]
    fn cli_parse_cert_upload() {
        let cli = Cli::try_parse_from([
            "certigest",
            "cert",
            "upload",
            "12345678000195",
            "crf-fgts",
            "/tmp/crf.pdf",
        ])
        .unwrap();
        let Commands::Cert(args) = cli.command else {
            panic!("expected cert command");
        };
        match args.command {
            CertCommand::Upload { company, slot, file, cycle } => {
                assert_eq!(company, "12345678000195");
                assert_eq!(slot, "crf-fgts");
                assert_eq!(file, PathBuf::from("/tmp/crf.pdf"));
                assert!(cycle.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cli_parse_dossier_with_out_dir() {
        let cli = Cli::try_parse_from(["certigest", "dossier", "acme-id", "--out", "/tmp/out"]).unwrap();
        let Commands::Dossier(args) = cli.command else {
            panic!("expected dossier");
        };
        assert_eq!(args.company, "acme-id");
        assert_eq!(args.out, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn cli_rejects_malformed_cycle() {
        assert!(Cli::try_parse_from(["certigest", "dashboard", "--cycle", "03/2024"]).is_err());
        assert!(Cli::try_parse_from(["certigest", "dashboard", "--cycle", "2024-13"]).is_err());
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["certigest"]).is_err());
    }

    fn temp_context() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::open(dir.path().to_path_buf(), false).unwrap();
        (dir, ctx)
    }

    #[test]
    fn resolve_company_by_id_or_cnpj() {
        let (_dir, ctx) = temp_context();
        let company = Company::new("Acme", "12345678000195").unwrap();
        ctx.store.insert_company(&company).unwrap();

        assert_eq!(ctx.resolve_company(&company.id.to_string()).unwrap().id, company.id);
        assert_eq!(ctx.resolve_company("12.345.678/0001-95").unwrap().id, company.id);
        assert!(ctx.resolve_company("nobody").is_err());
    }

    #[test]
    fn resolve_slot_by_id_or_position() {
        let (_dir, ctx) = temp_context();
        let third = ctx.catalog.slots()[2].id.clone();
        assert_eq!(ctx.resolve_slot(&third).unwrap().id, third);
        assert_eq!(ctx.resolve_slot("03").unwrap().id, third);
        assert!(ctx.resolve_slot("0").is_err());
        assert!(ctx.resolve_slot("99").is_err());
        assert!(ctx.resolve_slot("nope").is_err());
    }
}
