//! The facade bundles receive.
//!
//! [`Context`] exposes the collaborators the host was configured with and
//! aliases the application's registration methods, so bundle code reads
//! `ctx.get(..)` rather than `ctx.app().get(..)`.

use crate::environment::Environment;
use crate::error::ViewError;
use crate::file_index::{Discovered, FileIndex};
use crate::http::{Application, Engine, Middleware, RouteHandler, ViewCache};
use crate::logging::Logger;
use crate::views::TemplateEngine;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use serde_json::{Map, Value};
use socketioxide::SocketIo;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Title used by [`Context::page`] when the data does not provide one.
pub const DEFAULT_TITLE: &str = "Default Page Title";

pub trait Context: Send + Sync {
    fn app(&self) -> &Arc<dyn Application>;

    fn engine(&self) -> &Arc<dyn Engine>;

    fn templating(&self) -> &Arc<dyn TemplateEngine>;

    fn logger(&self) -> &Logger;

    fn environment(&self) -> &Environment;

    /// Absolute application root.
    fn root(&self) -> &Path;

    fn layouts(&self) -> &FileIndex;

    fn partials(&self) -> &FileIndex;

    /// Socket.IO server, when sockets are enabled.
    fn sockets(&self) -> Option<&SocketIo>;

    fn env_name(&self) -> &str {
        &self.environment().env
    }

    fn delete(&self, path: &str, handler: RouteHandler) {
        self.app().delete(path, handler)
    }

    fn get(&self, path: &str, handler: RouteHandler) {
        self.app().get(path, handler)
    }

    fn post(&self, path: &str, handler: RouteHandler) {
        self.app().post(path, handler)
    }

    fn put(&self, path: &str, handler: RouteHandler) {
        self.app().put(path, handler)
    }

    fn set(&self, key: &str, value: Value) {
        self.app().set(key, value)
    }

    fn use_middleware(&self, middleware: Middleware) {
        self.app().use_middleware(middleware)
    }

    /// A handler rendering the discovered layout `layout`.
    ///
    /// `data` is merged over `{"title": DEFAULT_TITLE}`. A non-object value
    /// is exposed to the template as `content`.
    fn page(&self, layout: &str, data: Value) -> Result<RouteHandler, ViewError> {
        let path = self
            .layouts()
            .get(layout)
            .ok_or_else(|| ViewError::UnknownLayout(layout.to_string()))?
            .to_path_buf();
        let templating = self.templating().clone();
        let logger = self.logger().clone();
        let data = Arc::new(page_data(data));

        Ok(RouteHandler::new(move |req: Request| {
            let templating = templating.clone();
            let logger = logger.clone();
            let path = path.clone();
            let data = data.clone();
            async move {
                let cache = req.extensions().get::<ViewCache>().is_some();
                match templating.render(&path, &data, cache) {
                    Ok(body) => Html(body).into_response(),
                    Err(e) => {
                        logger.error(e.to_string());
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    }
                }
            }
        }))
    }
}

fn page_data(data: Value) -> Value {
    let mut merged = Map::new();
    merged.insert("title".to_string(), Value::String(DEFAULT_TITLE.to_string()));
    match data {
        Value::Object(fields) => merged.extend(fields),
        Value::Null => {}
        other => {
            merged.insert("content".to_string(), other);
        }
    }
    Value::Object(merged)
}

/// Serves `dir` under `prefix` if the directory exists.
pub async fn register_public(ctx: &dyn Context, prefix: &str, dir: &Path) -> Discovered<PathBuf> {
    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    if !is_dir {
        ctx.logger()
            .info(format!("No public directory found: {}", dir.display()));
        return Discovered::Absent;
    }

    ctx.use_middleware(ctx.engine().static_files(prefix, dir.to_path_buf()));
    ctx.logger()
        .info(format!("Registered public directory: {} at {}", dir.display(), prefix));
    Discovered::Found(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_data_defaults_title() {
        assert_eq!(page_data(Value::Null), json!({"title": DEFAULT_TITLE}));
    }

    #[test]
    fn test_page_data_caller_title_wins() {
        let data = page_data(json!({"title": "Home", "user": "ana"}));
        assert_eq!(data, json!({"title": "Home", "user": "ana"}));
    }

    #[test]
    fn test_page_data_wraps_scalars() {
        let data = page_data(json!("hello"));
        assert_eq!(data["content"], "hello");
        assert_eq!(data["title"], DEFAULT_TITLE);
    }
}
