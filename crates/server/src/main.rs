use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use siren_server::config::SirenConfig;
use siren_server::{serve, telemetry};

/// Alert routing and escalation control plane.
#[derive(Debug, Parser)]
#[command(name = "siren-server", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();
    let config = match SirenConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = serve(config).await {
        eprintln!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
