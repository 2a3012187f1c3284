use crate::privileges::PrivilegeError;
use bundle_system::LoadError;
use grimm_core::{ConfigError, RouteError, ViewError};

/// Exit status when the process refuses to keep running privileged.
pub const EXIT_PRIVILEGE_DROP: i32 = 4;

/// Anything that stops the host from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bundles(#[from] LoadError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Routes(#[from] RouteError),
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to drop privileges: {0}")]
    PrivilegeDrop(#[source] PrivilegeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StartupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Bundles(e) => e.exit_code(),
            StartupError::PrivilegeDrop(_) => EXIT_PRIVILEGE_DROP,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimm_core::ConfigKey;

    #[test]
    fn test_exit_codes() {
        assert_eq!(StartupError::from(ConfigError::MissingKey(ConfigKey::Root)).exit_code(), 1);
        assert_eq!(
            StartupError::PrivilegeDrop(PrivilegeError::StillRoot).exit_code(),
            EXIT_PRIVILEGE_DROP
        );
        let unreadable = LoadError::RootUnreadable {
            path: "/nope".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(StartupError::from(unreadable).exit_code(), 2);
        let conflict = RouteError {
            path: "/users/:name".into(),
            message: "conflict".into(),
        };
        assert_eq!(StartupError::from(conflict).exit_code(), 1);
    }
}
