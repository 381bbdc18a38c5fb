//! httpwatch CLI - static file server with live reload.
//!
//! Serves a directory over HTTP and reloads connected browsers whenever a
//! watched file changes.

mod error;
mod output;
mod serve;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use output::Output;
use serve::ServeArgs;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// httpwatch - serve a directory and reload the browser on change.
#[derive(Parser, Debug)]
#[command(name = "httpwatch", version, about)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to INFO
    let filter = if cli.serve.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    if let Err(err) = rt.block_on(cli.serve.execute(VERSION)) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
