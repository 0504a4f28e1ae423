use anyhow::Context;
use clap::Parser;
use portsweep::cli::{Cli, Commands};
use portsweep::config::AppSettings;
use portsweep::{logging, output};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = match &cli.config {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AppSettings::load().context("failed to load settings")?,
    };

    match &cli.command {
        Commands::Scan(cmd) => cmd.execute(&settings, cli.verbose, cli.quiet).await?,
        Commands::Services => output::print_services()?,
    }

    Ok(())
}
