use std::fs::File;

use anyhow::{Context, Result};
use fastpay_ledger::{bin_utils::Service, config::LedgerConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let filename = std::env::args()
        .nth(1)
        .context("Expected an operation script as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;
    let config = LedgerConfig::from_env().context("Invalid ledger configuration")?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        config,
        error_printer: Box::new(|line, err| {
            let kind = err.kind();
            eprintln!("Error at line {line} [{kind} {}]: {err}", kind.status_code());
        }),
    };
    service.run()
}
