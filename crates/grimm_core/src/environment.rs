//! Per-environment settings, read from `<root>/config/<env>.toml`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSettings {
    /// Interface to bind; all interfaces when absent
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
        }
    }
}

/// A user or group, by numeric id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdSpec {
    Id(u32),
    Name(String),
}

impl IdSpec {
    /// `"1000"` is treated as an id, anything else as a name.
    pub fn parse(raw: &str) -> Self {
        raw.parse().map(IdSpec::Id).unwrap_or_else(|_| IdSpec::Name(raw.to_string()))
    }

    /// Numeric id, either given directly or spelled as digits.
    pub fn as_id(&self) -> Option<u32> {
        match self {
            IdSpec::Id(id) => Some(*id),
            IdSpec::Name(name) => name.parse().ok(),
        }
    }
}

impl std::fmt::Display for IdSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdSpec::Id(id) => write!(f, "{id}"),
            IdSpec::Name(name) => f.write_str(name),
        }
    }
}

/// Identity the process switches to once the listener is bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub user: IdSpec,
    pub group: IdSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Environment name; `dev` disables the view cache
    pub env: String,
    #[serde(default)]
    pub web: WebSettings,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    /// Free-form settings for bundles
    #[serde(default)]
    pub settings: Value,
}

impl Environment {
    pub fn named(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            web: WebSettings::default(),
            permissions: None,
            settings: Value::Null,
        }
    }

    pub fn is_dev(&self) -> bool {
        self.env == "dev"
    }

    /// Host as shown in the listening log line.
    pub fn display_host(&self) -> &str {
        self.web.host.as_deref().unwrap_or("*")
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}
