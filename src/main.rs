//! geosearch - GeoNames state and city lookups from the terminal
//!
//! Responses are cached on disk so repeated identical queries skip the network.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use geosearch::cli::{render_result, Cli, Command};
use geosearch::{GeoNameSearch, SearchStatus};

/// Logs go to stderr, filtered by `RUST_LOG` (default: warnings only)
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let client = match GeoNameSearch::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let result = match &cli.command {
        Command::States { country } => client.states(country).await,
        Command::Cities { state, country } => client.cities(state, country).await,
        Command::Query { text, country } => client.query(text, country).await,
    };

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", render_result(&result));
    }

    if result.status == SearchStatus::TransportError {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
