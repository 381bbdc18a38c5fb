//! Serve command implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use hw_config::{CliSettings, Config};
use hw_server::{WatcherServer, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for serving a directory.
#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover httpwatch.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve (overrides config, default: current directory).
    #[arg(long, env = "HTTPWATCH_PATH")]
    path: Option<PathBuf>,

    /// Directory to watch for changes; repeat for several (default: served directory).
    #[arg(short, long = "watch", value_name = "DIR")]
    watch: Vec<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long, env = "HTTPWATCH_HOST")]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long, env = "HTTPWATCH_PORT")]
    port: Option<u16>,

    /// URL prefix the directory is served under (overrides config).
    #[arg(long)]
    base_path: Option<String>,

    /// Seconds to wait between reload broadcasts (overrides config).
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    interval: Option<Duration>,

    /// Watch only the top level of each directory.
    #[arg(long)]
    no_recursive: bool,

    /// Open the site in a browser once the server is up.
    #[arg(long)]
    open: bool,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Load configuration, start the server and run until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.highlight(&format!("httpwatch {version}"));
        output.info(&format!(
            "Serving {} on {}:{}{}",
            config.watch_resolved.root.display(),
            config.server.host,
            config.server.port,
            config.server.base_path,
        ));
        if config.watch_resolved.paths.is_empty() {
            output.info("Watching served directory");
        } else {
            for path in &config.watch_resolved.paths {
                output.info(&format!("Watching {}", path.display()));
            }
        }

        let server_config = server_config_from_config(&config);
        WatcherServer::new(server_config, None)?.run().await?;

        Ok(())
    }

    /// CLI overrides; unset flags leave config values alone.
    pub(crate) fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            base_path: self.base_path.clone(),
            root: self.path.clone(),
            watch_paths: (!self.watch.is_empty()).then(|| self.watch.clone()),
            interval: self.interval,
            recursive: self.no_recursive.then_some(false),
            open_browser: self.open.then_some(true),
        }
    }
}

/// Parse a positive number of seconds.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(format!("`{value}` must be greater than 0")),
    }
}
