//! The bundle contract.
//!
//! A bundle is handed the host [`Context`] and a fresh [`Locals`] record
//! exactly once, at startup. Whatever it registers during
//! [`Bundle::mount`] is what it serves.

use crate::context::Context;
use crate::error::BundleError;
use crate::file_index::FileIndex;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Symbol exported by dynamic bundle libraries, see [`export_bundle!`].
pub const ENTRY_SYMBOL: &[u8] = b"grimm_bundle_entry";

/// Per-bundle state created by the loader.
#[derive(Debug, Clone, Default)]
pub struct Locals {
    /// Directory name of the bundle
    pub name: String,
    /// The bundle's `views/` directory, indexed
    pub views: FileIndex,
}

#[async_trait]
pub trait Bundle: Send + Sync {
    async fn mount(&self, ctx: Arc<dyn Context>, locals: Locals) -> Result<(), BundleError>;
}

/// Adapts an async closure into a [`Bundle`].
pub struct FnBundle<F>(F);

impl<F, Fut> FnBundle<F>
where
    F: Fn(Arc<dyn Context>, Locals) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BundleError>> + Send,
{
    pub fn new(mount: F) -> Self {
        Self(mount)
    }
}

#[async_trait]
impl<F, Fut> Bundle for FnBundle<F>
where
    F: Fn(Arc<dyn Context>, Locals) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BundleError>> + Send,
{
    async fn mount(&self, ctx: Arc<dyn Context>, locals: Locals) -> Result<(), BundleError> {
        (self.0)(ctx, locals).await
    }
}

/// Placeholder type used to build a null entry pointer.
#[doc(hidden)]
pub struct NullBundle;

#[async_trait]
impl Bundle for NullBundle {
    async fn mount(&self, _ctx: Arc<dyn Context>, _locals: Locals) -> Result<(), BundleError> {
        Ok(())
    }
}

/// Exports a bundle from a `cdylib` so the host can load it from
/// `bundles/<name>/index.so`.
///
/// The expression is evaluated once per load. A panic while constructing it
/// is caught and reported to the host as a null entry.
///
/// The host and the bundle must be built with the same compiler and the same
/// `grimm_core` version; the entry returns a Rust trait object.
#[macro_export]
macro_rules! export_bundle {
    ($ctor:expr) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn grimm_bundle_entry() -> *mut dyn $crate::Bundle {
            match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                let bundle: ::std::boxed::Box<dyn $crate::Bundle> = ::std::boxed::Box::new($ctor);
                ::std::boxed::Box::into_raw(bundle)
            })) {
                Ok(bundle) => bundle,
                Err(_) => ::std::ptr::null_mut::<$crate::NullBundle>() as *mut dyn $crate::Bundle,
            }
        }
    };
}
