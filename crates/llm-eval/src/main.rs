mod case;
mod cli;
mod engine;
mod fixture_io;

use clap::Parser;
use cli::CliOptions;
use engine::run_eval;
use studio_core::config::load_dotenv;
use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "llm_eval=info,studio_core=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = CliOptions::parse();

    match run_eval(&options).await {
        Ok(summary) => {
            summary.print();
            if summary.has_failures() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            error!("failed to run generation eval harness: {err}");
            std::process::exit(2);
        }
    }
}
