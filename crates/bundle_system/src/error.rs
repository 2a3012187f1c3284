use grimm_core::BundleError;
use std::path::PathBuf;

/// Exit status for a bundles root that cannot be listed.
pub const EXIT_ROOT_UNREADABLE: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("No bundles found at {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No bundle source can load {name} from {}", path.display())]
    Unresolved { name: String, path: PathBuf },
    #[error("Failed to load bundle library {}: {message}", path.display())]
    Library { path: PathBuf, message: String },
    #[error("Bundle {name} failed to mount: {source}")]
    Bundle {
        name: String,
        #[source]
        source: BundleError,
    },
}

impl LoadError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::RootUnreadable { .. } => EXIT_ROOT_UNREADABLE,
            _ => 1,
        }
    }
}
