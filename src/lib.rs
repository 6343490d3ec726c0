pub mod catalog;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod dossier;
pub mod format;
pub mod models;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn log_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        1 => EnvFilter::new("certigest=debug,certigest_lib=debug,info"),
        _ => EnvFilter::new("trace"),
    }
}

pub fn run() -> ExitCode {
    let cli = cli::Cli::parse();

    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match cli::dispatch(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            report_error(&e, &mut std::io::stderr());
            ExitCode::from(1)
        }
    }
}

/// Printed as well as logged, so the message survives `RUST_LOG=off`.
fn report_error(err: &anyhow::Error, out: &mut impl Write) {
    tracing::error!("{err:#}");
    let _ = writeln!(out, "error: {err:#}");
}
