//! Bundle discovery and ordered loading.
//!
//! [`BundleLoader`] walks `<root>/bundles`, hands every bundle directory to
//! its entry point and mounts the bundle's `public/` directory. The special
//! `_errors` bundle is always loaded after every other bundle so its
//! catch-all handlers sit behind everything the others registered.
//!
//! Entry points are resolved through [`BundleSources`]: compiled libraries
//! exporting [`grimm_core::export_bundle!`] via [`LibrarySource`], or
//! bundles linked into the host and registered by name in [`StaticBundles`].

pub mod error;
pub mod loader;
pub mod source;

pub use error::LoadError;
pub use loader::{BundleLoader, LoadOrder, LoadPhase, LoadReport, ERRORS_BUNDLE};
pub use source::{BundleSource, BundleSources, LibrarySource, StaticBundles};
