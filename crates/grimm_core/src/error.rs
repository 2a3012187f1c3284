//! Error types shared by the host and bundles.

use crate::http::Capability;
use std::fmt;
use std::path::PathBuf;

/// Keys of the configuration record that must be present before the facade
/// can be built, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    App,
    Engine,
    Env,
    Root,
    Server,
    Sockets,
    Templating,
}

impl ConfigKey {
    /// Every required key, in validation order.
    pub const REQUIRED: [ConfigKey; 7] = [
        ConfigKey::App,
        ConfigKey::Engine,
        ConfigKey::Env,
        ConfigKey::Root,
        ConfigKey::Server,
        ConfigKey::Sockets,
        ConfigKey::Templating,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::App => "app",
            ConfigKey::Engine => "engine",
            ConfigKey::Env => "env",
            ConfigKey::Root => "root",
            ConfigKey::Server => "server",
            ConfigKey::Sockets => "sockets",
            ConfigKey::Templating => "templating",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while validating the configuration record.
///
/// These are fatal and never retried: the operator fixes the input and
/// restarts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No configuration record was supplied at all
    #[error("Required configuration object not provided to Grimm")]
    MissingConfig,
    /// A required key is absent or empty
    #[error("Required configuration property [{0}] not provided to Grimm")]
    MissingKey(ConfigKey),
    /// The application handle refuses part of the required capability set
    #[error("Required method not available on the application handle: {0}")]
    MissingCapability(Capability),
    /// A logger was supplied but cannot be used
    #[error("Logger provided but cannot be used: {0}")]
    InvalidLogger(String),
}

/// Errors a bundle reports from its entry point.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// The bundle could not set itself up
    #[error("Bundle initialization failed: {0}")]
    InitializationFailed(String),
    /// The bundle failed while registering routes or handlers
    #[error("Bundle execution error: {0}")]
    ExecutionError(String),
    /// A view the bundle depends on is broken
    #[error(transparent)]
    View(#[from] ViewError),
}

/// A registered route the HTTP router refused, such as two parameter
/// segments competing for the same position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot route {path}: {message}")]
pub struct RouteError {
    pub path: String,
    pub message: String,
}

/// Errors from view lookup and rendering.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Unknown layout: {0}")]
    UnknownLayout(String),
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Template error in {name}: {message}")]
    Template { name: String, message: String },
    #[error("Failed to render {name}: {message}")]
    Render { name: String, message: String },
}
