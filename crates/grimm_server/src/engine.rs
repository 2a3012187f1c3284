use grimm_core::{Engine, Middleware};
use std::path::PathBuf;

/// Static file serving backed by `tower_http::services::ServeDir`.
///
/// The middleware it returns is interpreted by [`crate::HttpApp`] when the
/// router is assembled.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticEngine;

impl Engine for StaticEngine {
    fn static_files(&self, prefix: &str, dir: PathBuf) -> Middleware {
        Middleware::Static {
            prefix: prefix.to_string(),
            dir,
        }
    }
}
