pub mod aws_client;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod packaging;
pub mod provider;
pub mod vercel_client;

use clap::Parser;
pub use cli::CLI;
use tracing_subscriber::EnvFilter;

pub async fn run() -> std::process::ExitCode {
    let cli = CLI::parse();
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli::execute(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ Error: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
