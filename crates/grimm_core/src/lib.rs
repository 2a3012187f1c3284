//! # Grimm Core
//!
//! The API shared between the Grimm host and the bundles it loads.
//!
//! A Grimm application is split into *bundles*: directories under
//! `<root>/bundles` that each bring an entry point, their own views and an
//! optional `public/` directory. The host discovers them, hands every bundle
//! a [`Context`] (the facade over the HTTP application, templating, sockets
//! and logging) together with a fresh [`Locals`] record, and the bundle
//! registers whatever routes and middleware it needs.
//!
//! ## What lives here
//!
//! * [`Application`] and [`Engine`] - the HTTP capability set bundles talk to
//! * [`TemplateEngine`] - view rendering and partial registration
//! * [`Context`] / [`Bundle`] / [`Locals`] - the bundle contract
//! * [`FileIndex`] - best-effort discovery of view files on disk
//! * [`Logger`] / [`LogSink`] - the leveled logging capability
//! * [`Environment`] - per-environment settings (`<root>/config/<env>.toml`)
//!
//! ## Writing a bundle
//!
//! ```rust,ignore
//! use grimm_core::*;
//!
//! #[derive(Default)]
//! struct Hello;
//!
//! #[async_trait::async_trait]
//! impl Bundle for Hello {
//!     async fn mount(&self, ctx: Arc<dyn Context>, locals: Locals) -> Result<(), BundleError> {
//!         ctx.get("/hello", RouteHandler::new(|_req| async { "hello" }));
//!         ctx.logger().info(format!("{} ready", locals.name));
//!         Ok(())
//!     }
//! }
//!
//! export_bundle!(Hello::default());
//! ```

pub mod bundle;
pub mod context;
pub mod environment;
pub mod error;
pub mod file_index;
pub mod http;
pub mod logging;
pub mod views;

pub use bundle::{Bundle, FnBundle, Locals, NullBundle, ENTRY_SYMBOL};
pub use context::{register_public, Context, DEFAULT_TITLE};
pub use environment::{Environment, IdSpec, Permissions, WebSettings};
pub use error::{BundleError, ConfigError, ConfigKey, RouteError, ViewError};
pub use file_index::{html_files, Discovered, FileIndex};
pub use http::{
    Application, BoxResponse, Capability, Engine, Middleware, MiddlewareFn, RouteHandler,
    RouteMethod, ViewCache,
};
pub use logging::{ConsoleSink, LogLevel, LogSink, Logger, LoggerSpec, TracingSink};
pub use views::TemplateEngine;

// Bundles build against the same framework versions as the host.
pub use async_trait::async_trait;
pub use axum;
pub use serde_json;
pub use socketioxide;
pub use std::sync::Arc;
