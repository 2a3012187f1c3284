//! Configuration management for the `grimm` binary.
//!
//! Two files are involved: the application config (`grimm.toml` by default,
//! written with defaults when absent) and the per-environment settings under
//! `<root>/config/<env>.toml`.

use crate::cli::CliArgs;
use bundle_system::{BundleSources, LoadOrder, StaticBundles, ERRORS_BUNDLE};
use grimm_core::{Environment, LoggerSpec};
use grimm_server::{ErrorPages, GrimmConfig, HttpServer, SocketIoFactory};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub bundles: BundleSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sockets: SocketSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Application root directory
    pub root: PathBuf,
    /// Environment name, selects `<root>/config/<env>.toml`
    pub env: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            env: "dev".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleSettings {
    #[serde(default)]
    pub order: LoadOrder,
}

fn default_reuse_address() -> bool {
    true
}

fn default_backlog() -> i32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_reuse_address")]
    pub reuse_address: bool,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            reuse_address: default_reuse_address(),
            backlog: default_backlog(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketSettings {
    pub enabled: bool,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ping_interval_secs: 25,
            ping_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    /// Sink behind the bundle logger: `console` or `tracing`
    pub sink: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            sink: "console".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, creating it with the defaults if it does not exist.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(root) = &args.root {
            self.app.root = root.clone();
        }
        if let Some(env) = &args.env {
            self.app.env = env.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.app.root.as_os_str().is_empty() {
            return Err("Application root cannot be empty".to_string());
        }
        if self.app.env.is_empty() {
            return Err("Environment name cannot be empty".to_string());
        }
        if self.server.backlog <= 0 {
            return Err(format!("Invalid listen backlog: {}", self.server.backlog));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        LoggerSpec::Named(self.logging.sink.clone())
            .resolve()
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    pub fn environment_path(&self) -> PathBuf {
        self.app
            .root
            .join("config")
            .join(format!("{}.toml", self.app.env))
    }

    /// Reads `<root>/config/<env>.toml`. A missing file yields the defaults
    /// for the configured environment name; the file may omit `env`.
    pub async fn load_environment(&self) -> Result<Environment, Box<dyn std::error::Error>> {
        let path = self.environment_path();
        if !path.exists() {
            info!(
                "No environment file at {}, using defaults for {}",
                path.display(),
                self.app.env
            );
            return Ok(Environment::named(&self.app.env));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let mut table: toml::Table = toml::from_str(&content)?;
        if !table.contains_key("env") {
            table.insert("env".to_string(), toml::Value::String(self.app.env.clone()));
        }
        let environment: Environment = toml::Value::Table(table).try_into()?;
        Ok(environment)
    }

    /// The facade configuration: the stock stack, the built-in `_errors`
    /// bundle behind compiled bundle libraries.
    pub fn to_grimm_config(&self, environment: Environment) -> GrimmConfig {
        let sockets = if self.sockets.enabled {
            SocketIoFactory::default()
                .ping_interval(Duration::from_secs(self.sockets.ping_interval_secs))
                .ping_timeout(Duration::from_secs(self.sockets.ping_timeout_secs))
        } else {
            SocketIoFactory::disabled()
        };

        let bundles = BundleSources::default()
            .with(StaticBundles::new().with(ERRORS_BUNDLE, ErrorPages));

        let mut config = GrimmConfig::standard(&self.app.root, environment)
            .with_logger(LoggerSpec::Named(self.logging.sink.clone()))
            .with_bundles(bundles)
            .with_bundle_order(self.bundles.order);
        config.server = Some(HttpServer::new(
            self.server.reuse_address,
            self.server.backlog,
        ));
        config.sockets = Some(sockets);
        config
    }
}
