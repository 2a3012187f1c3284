//! The axum-backed application handle.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Router;
use dashmap::DashMap;
use grimm_core::{
    Application, Capability, Middleware, MiddlewareFn, RouteError, RouteHandler, RouteMethod,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::debug;

/// Collects registrations and assembles them into an [`axum::Router`].
///
/// * routes are keyed by path and method; registering the same pair twice
///   keeps the later handler
/// * static mounts answer whatever no route matched, in mount order
/// * middleware layers wrap everything, the first registered outermost
#[derive(Default)]
pub struct HttpApp {
    routes: DashMap<String, HashMap<RouteMethod, RouteHandler>>,
    middleware: Mutex<Vec<Middleware>>,
    settings: DashMap<String, Value>,
    unsupported: Vec<Capability>,
}

impl HttpApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `capability` as unavailable, for handles fronting a restricted
    /// backend.
    pub fn without(mut self, capability: Capability) -> Self {
        self.unsupported.push(capability);
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.lock().len()
    }
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

impl Application for HttpApp {
    fn route(&self, method: RouteMethod, path: &str, handler: RouteHandler) {
        let path = normalize(path);
        debug!("Route registered: {} {}", method.as_str(), path);
        self.routes.entry(path).or_default().insert(method, handler);
    }

    fn set(&self, key: &str, value: Value) {
        self.settings.insert(key.to_string(), value);
    }

    fn setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key).map(|value| value.value().clone())
    }

    fn use_middleware(&self, middleware: Middleware) {
        self.middleware.lock().push(middleware);
    }

    fn router(&self) -> Result<Router, RouteError> {
        let mut paths: Vec<(String, MethodRouter)> = self
            .routes
            .iter()
            .map(|entry| {
                let mut methods = MethodRouter::new();
                for (method, handler) in entry.value() {
                    let handler = handler.clone();
                    methods =
                        methods.on(method.method_filter(), move |req: Request| handler.call(req));
                }
                (entry.key().clone(), methods)
            })
            .collect();
        paths.sort_by(|a, b| a.0.cmp(&b.0));

        let mut router = Router::new();
        for (path, methods) in paths {
            router = add_route(router, &path, methods)?;
        }

        let chain = self.middleware.lock().clone();
        let mut layers: Vec<MiddlewareFn> = Vec::new();
        let mut mounts: Vec<StaticMount> = Vec::new();
        for middleware in chain {
            match middleware {
                Middleware::Layer(layer) => layers.push(layer),
                Middleware::Static { prefix, dir } => mounts.push(StaticMount { prefix, dir }),
            }
        }

        let mounts: Arc<[StaticMount]> = mounts.into();
        router = router.fallback(move |req: Request| serve_static(mounts.clone(), req));

        for layer in layers.into_iter().rev() {
            router = router.layer(from_fn(move |req: Request, next: Next| layer.call(req, next)));
        }

        Ok(router)
    }

    fn supports(&self, capability: Capability) -> bool {
        !self.unsupported.contains(&capability)
    }
}

/// `Router::route` panics on paths the matcher rejects; the panic is turned
/// into an error naming the path.
fn add_route(router: Router, path: &str, methods: MethodRouter) -> Result<Router, RouteError> {
    panic::catch_unwind(AssertUnwindSafe(move || router.route(path, methods))).map_err(|payload| {
        RouteError {
            path: path.to_string(),
            message: panic_message(payload.as_ref()),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "route rejected by the router".to_string()
    }
}

struct StaticMount {
    prefix: String,
    dir: PathBuf,
}

impl StaticMount {
    /// Path below the mount, or `None` if `path` is outside it.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(prefix) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

async fn serve_static(mounts: Arc<[StaticMount]>, req: Request) -> Response {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = req.uri().path().to_string();
    for mount in mounts.iter() {
        let Some(rest) = mount.strip(&path) else {
            continue;
        };

        let mut inner = Request::new(Body::empty());
        *inner.method_mut() = req.method().clone();
        *inner.headers_mut() = req.headers().clone();
        match rest.parse() {
            Ok(uri) => *inner.uri_mut() = uri,
            Err(_) => continue,
        }

        let response = match ServeDir::new(&mount.dir).oneshot(inner).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() != StatusCode::NOT_FOUND {
            return response.into_response();
        }
    }

    StatusCode::NOT_FOUND.into_response()
}
