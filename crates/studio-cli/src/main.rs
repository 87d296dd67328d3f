mod cli;
mod commands;
mod request;

use std::process::ExitCode;

use clap::Parser;
use studio_core::config::{StudioConfig, load_dotenv};
use tracing::error;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        return ExitCode::from(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "studio=info,studio_core=info".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match StudioConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to read studio config: {err}");
            return ExitCode::from(2);
        }
    };

    match commands::run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
