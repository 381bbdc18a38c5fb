//! Configuration management for httpwatch.
//!
//! Parses `httpwatch.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `server.base_path`
//! - `watch.root`
//! - `watch.paths`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override base path.
    pub base_path: Option<String>,
    /// Override static root.
    pub root: Option<PathBuf>,
    /// Override extra watch paths.
    pub watch_paths: Option<Vec<PathBuf>>,
    /// Override debounce interval.
    pub interval: Option<Duration>,
    /// Override recursive watching.
    pub recursive: Option<bool>,
    /// Override browser launch.
    pub open_browser: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "httpwatch.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Watch configuration (paths are relative strings from TOML).
    watch: WatchConfigRaw,
    /// Browser configuration (delay in seconds from TOML).
    browser: BrowserConfigRaw,

    /// Resolved watch configuration (set after loading).
    #[serde(skip)]
    pub watch_resolved: WatchConfig,
    /// Resolved browser configuration (set after loading).
    #[serde(skip)]
    pub browser_resolved: BrowserConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to and advertise in injected URLs.
    pub host: String,
    /// Server port (`0` lets the OS pick).
    pub port: u16,
    /// URL prefix for the static root.
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5555,
            base_path: "/".to_owned(),
        }
    }
}

/// Raw watch configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WatchConfigRaw {
    root: Option<String>,
    paths: Option<Vec<String>>,
    interval: Option<f64>,
    recursive: Option<bool>,
}

/// Resolved watch configuration with absolute paths.
#[derive(Debug)]
pub struct WatchConfig {
    /// Static root directory.
    pub root: PathBuf,
    /// Extra directories to watch. Empty means the static root.
    pub paths: Vec<PathBuf>,
    /// Debounce interval.
    pub interval: Duration,
    /// Watch subdirectories too.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            paths: Vec::new(),
            interval: Duration::from_secs(1),
            recursive: true,
        }
    }
}

/// Raw browser configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BrowserConfigRaw {
    open: Option<bool>,
    delay: Option<f64>,
}

/// Resolved browser configuration.
#[derive(Debug)]
pub struct BrowserConfig {
    /// Open a browser once the server is listening.
    pub open: bool,
    /// Delay before opening.
    pub delay: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            open: false,
            delay: Duration::from_secs(1),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`HTTPWATCH_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Convert a seconds value from TOML into a duration.
fn seconds(value: f64, field: &str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ConfigError::Validation(format!("{field} must be a non-negative number of seconds"))
    })
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `httpwatch.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The merged result
    /// is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the merged configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(base_path) = &settings.base_path {
            self.server.base_path.clone_from(base_path);
        }
        if let Some(root) = &settings.root {
            self.watch_resolved.root.clone_from(root);
        }
        if let Some(paths) = &settings.watch_paths {
            self.watch_resolved.paths.clone_from(paths);
        }
        if let Some(interval) = settings.interval {
            self.watch_resolved.interval = interval;
        }
        if let Some(recursive) = settings.recursive {
            self.watch_resolved.recursive = recursive;
        }
        if let Some(open) = settings.open_browser {
            self.browser_resolved.open = open;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            watch: WatchConfigRaw::default(),
            browser: BrowserConfigRaw::default(),
            watch_resolved: WatchConfig {
                root: base.to_path_buf(),
                ..WatchConfig::default()
            },
            browser_resolved: BrowserConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.watch_resolved.interval.is_zero() {
            return Err(ConfigError::Validation(
                "watch.interval must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.server.base_path = expand::expand_env(&self.server.base_path, "server.base_path")?;

        if let Some(ref root) = self.watch.root {
            self.watch.root = Some(expand::expand_env(root, "watch.root")?);
        }
        if let Some(ref mut paths) = self.watch.paths {
            for path in paths.iter_mut() {
                *path = expand::expand_env(path, "watch.paths")?;
            }
        }

        Ok(())
    }

    /// Resolve relative paths against the config directory and convert
    /// second values to durations.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let defaults = WatchConfig::default();
        let interval = match self.watch.interval {
            Some(value) => seconds(value, "watch.interval")?,
            None => defaults.interval,
        };

        self.watch_resolved = WatchConfig {
            root: self
                .watch
                .root
                .as_deref()
                .map_or_else(|| config_dir.to_path_buf(), |root| config_dir.join(root)),
            paths: self
                .watch
                .paths
                .iter()
                .flatten()
                .map(|p| config_dir.join(p))
                .collect(),
            interval,
            recursive: self.watch.recursive.unwrap_or(defaults.recursive),
        };

        let delay = match self.browser.delay {
            Some(value) => seconds(value, "browser.delay")?,
            None => BrowserConfig::default().delay,
        };
        self.browser_resolved = BrowserConfig {
            open: self.browser.open.unwrap_or(false),
            delay,
        };

        Ok(())
    }
}
