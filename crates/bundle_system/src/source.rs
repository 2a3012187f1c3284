//! Turning a bundle's entry file into a callable [`Bundle`].

use crate::error::LoadError;
use dashmap::DashMap;
use grimm_core::{Bundle, ENTRY_SYMBOL};
use libloading::{Library, Symbol};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Resolves the entry file of a bundle.
///
/// `Ok(None)` means "not mine": the next source is asked.
pub trait BundleSource: Send + Sync {
    fn resolve(&self, name: &str, entry: &Path) -> Result<Option<Arc<dyn Bundle>>, LoadError>;
}

const LIBRARY_EXTENSIONS: [&str; 3] = ["so", "dylib", "dll"];

/// Loads `index.so` / `index.dylib` / `index.dll` entry files.
///
/// Loaded libraries are never unloaded: the bundles they produced are shared
/// with the router and may be called until the process exits.
#[derive(Default)]
pub struct LibrarySource {
    libraries: Mutex<Vec<Library>>,
}

impl LibrarySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_library(entry: &Path) -> bool {
        entry
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| LIBRARY_EXTENSIONS.contains(&ext))
    }

    pub fn loaded(&self) -> usize {
        self.libraries.lock().len()
    }
}

impl BundleSource for LibrarySource {
    fn resolve(&self, name: &str, entry: &Path) -> Result<Option<Arc<dyn Bundle>>, LoadError> {
        if !Self::is_library(entry) {
            return Ok(None);
        }

        debug!("Loading bundle library for {} from {}", name, entry.display());

        let library_error = |message: String| LoadError::Library {
            path: entry.to_path_buf(),
            message,
        };

        let library = unsafe {
            Library::new(entry).map_err(|e| library_error(format!("Failed to load library: {}", e)))?
        };

        let bundle_ptr = {
            let create: Symbol<unsafe extern "C" fn() -> *mut dyn Bundle> = unsafe {
                library.get(ENTRY_SYMBOL).map_err(|e| {
                    library_error(format!("Failed to find grimm_bundle_entry function: {}", e))
                })?
            };
            unsafe { create() }
        };

        if bundle_ptr.is_null() {
            return Err(library_error(
                "grimm_bundle_entry returned null pointer".to_string(),
            ));
        }

        let bundle: Arc<dyn Bundle> = Arc::from(unsafe { Box::from_raw(bundle_ptr) });
        self.libraries.lock().push(library);
        Ok(Some(bundle))
    }
}

/// Bundles linked into the host, looked up by directory name.
///
/// A registered bundle still needs an `index` entry file in its directory;
/// the file's content is not read.
#[derive(Default, Clone)]
pub struct StaticBundles {
    bundles: Arc<DashMap<String, Arc<dyn Bundle>>>,
}

impl StaticBundles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: impl Into<String>, bundle: impl Bundle + 'static) -> Self {
        self.register(name, bundle);
        self
    }

    pub fn register(&self, name: impl Into<String>, bundle: impl Bundle + 'static) {
        self.bundles.insert(name.into(), Arc::new(bundle));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }
}

impl BundleSource for StaticBundles {
    fn resolve(&self, name: &str, _entry: &Path) -> Result<Option<Arc<dyn Bundle>>, LoadError> {
        Ok(self.bundles.get(name).map(|bundle| bundle.value().clone()))
    }
}

/// Ordered list of sources; the first one that resolves an entry wins.
#[derive(Clone)]
pub struct BundleSources {
    sources: Vec<Arc<dyn BundleSource>>,
}

impl BundleSources {
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with(mut self, source: impl BundleSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn resolve(&self, name: &str, entry: &Path) -> Result<Option<Arc<dyn Bundle>>, LoadError> {
        for source in &self.sources {
            if let Some(bundle) = source.resolve(name, entry)? {
                return Ok(Some(bundle));
            }
        }
        Ok(None)
    }
}

impl Default for BundleSources {
    fn default() -> Self {
        Self::empty().with(LibrarySource::new())
    }
}

impl std::fmt::Debug for BundleSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleSources")
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimm_core::NullBundle;
    use std::path::PathBuf;

    #[test]
    fn test_library_source_ignores_other_files() {
        let source = LibrarySource::new();

        let resolved = source.resolve("blog", Path::new("/srv/bundles/blog/index")).unwrap();

        assert!(resolved.is_none());
        assert_eq!(source.loaded(), 0);
    }

    #[test]
    fn test_library_source_reports_unloadable_library() {
        let dir = tempfile::TempDir::new().unwrap();
        let entry = dir.path().join("index.so");
        std::fs::write(&entry, b"not a shared object").unwrap();

        let err = LibrarySource::new().resolve("broken", &entry).err().unwrap();

        assert!(matches!(err, LoadError::Library { ref path, .. } if *path == entry));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_static_bundles_resolve_by_name() {
        let bundles = StaticBundles::new().with("_errors", NullBundle);
        let entry = PathBuf::from("index");

        assert!(bundles.resolve("_errors", &entry).unwrap().is_some());
        assert!(bundles.resolve("blog", &entry).unwrap().is_none());
    }

    #[test]
    fn test_first_source_wins() {
        let sources = BundleSources::empty()
            .with(StaticBundles::new())
            .with(StaticBundles::new().with("blog", NullBundle));

        assert!(sources.resolve("blog", Path::new("index")).unwrap().is_some());
        assert!(sources.resolve("shop", Path::new("index")).unwrap().is_none());
    }
}
