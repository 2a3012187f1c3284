//! The HTTP capability set bundles register against.
//!
//! [`Application`] is the subset of an HTTP framework Grimm relies on: routes
//! for four methods, a settings map and a middleware chain. The concrete
//! implementation lives in `grimm_server` and is backed by axum; bundles only
//! ever see this trait.

use crate::error::RouteError;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodFilter;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Boxed future every handler resolves to.
pub type BoxResponse = BoxFuture<'static, Response>;

type HandlerFn = dyn Fn(Request) -> BoxResponse + Send + Sync;
type LayerFn = dyn Fn(Request, Next) -> BoxResponse + Send + Sync;

/// A type-erased request handler.
#[derive(Clone)]
pub struct RouteHandler(Arc<HandlerFn>);

impl RouteHandler {
    pub fn new<F, Fut, R>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        Self(Arc::new(move |req| {
            handler(req).map(IntoResponse::into_response).boxed()
        }))
    }

    pub fn call(&self, req: Request) -> BoxResponse {
        (self.0)(req)
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RouteHandler(..)")
    }
}

/// A type-erased middleware that may short-circuit or call `next`.
#[derive(Clone)]
pub struct MiddlewareFn(Arc<LayerFn>);

impl MiddlewareFn {
    pub fn new<F, Fut, R>(layer: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        Self(Arc::new(move |req, next| {
            layer(req, next).map(IntoResponse::into_response).boxed()
        }))
    }

    pub fn call(&self, req: Request, next: Next) -> BoxResponse {
        (self.0)(req, next)
    }
}

/// An entry in the application's middleware chain.
#[derive(Clone)]
pub enum Middleware {
    /// Wraps every request
    Layer(MiddlewareFn),
    /// Serves files under `dir` for requests below `prefix`
    Static { prefix: String, dir: PathBuf },
}

impl Middleware {
    pub fn layer<F, Fut, R>(layer: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        Middleware::Layer(MiddlewareFn::new(layer))
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Middleware::Layer(_) => f.write_str("Middleware::Layer(..)"),
            Middleware::Static { prefix, dir } => f
                .debug_struct("Middleware::Static")
                .field("prefix", prefix)
                .field("dir", dir)
                .finish(),
        }
    }
}

/// Methods the application handle must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Delete,
    Get,
    Post,
    Put,
    Set,
    Use,
}

impl Capability {
    pub const REQUIRED: [Capability; 6] = [
        Capability::Delete,
        Capability::Get,
        Capability::Post,
        Capability::Put,
        Capability::Set,
        Capability::Use,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Delete => "delete",
            Capability::Get => "get",
            Capability::Post => "post",
            Capability::Put => "put",
            Capability::Set => "set",
            Capability::Use => "use",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Delete,
    Get,
    Post,
    Put,
}

impl RouteMethod {
    pub fn method_filter(self) -> MethodFilter {
        match self {
            RouteMethod::Delete => MethodFilter::DELETE,
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
            RouteMethod::Put => MethodFilter::PUT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteMethod::Delete => "DELETE",
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
        }
    }
}

/// The HTTP application handle.
///
/// Registration calls may happen from any bundle, in any order, until the
/// server starts; the router is assembled from whatever was registered when
/// [`Application::router`] is called.
pub trait Application: Send + Sync {
    fn route(&self, method: RouteMethod, path: &str, handler: RouteHandler);

    fn set(&self, key: &str, value: Value);

    fn setting(&self, key: &str) -> Option<Value>;

    fn use_middleware(&self, middleware: Middleware);

    /// Assembles the router. Fails when the registered paths cannot
    /// coexist.
    fn router(&self) -> Result<axum::Router, RouteError>;

    fn delete(&self, path: &str, handler: RouteHandler) {
        self.route(RouteMethod::Delete, path, handler)
    }

    fn get(&self, path: &str, handler: RouteHandler) {
        self.route(RouteMethod::Get, path, handler)
    }

    fn post(&self, path: &str, handler: RouteHandler) {
        self.route(RouteMethod::Post, path, handler)
    }

    fn put(&self, path: &str, handler: RouteHandler) {
        self.route(RouteMethod::Put, path, handler)
    }

    /// Whether the handle actually honors `capability`.
    ///
    /// Handles that wrap a restricted backend override this; the config
    /// validator refuses any handle missing part of [`Capability::REQUIRED`].
    fn supports(&self, _capability: Capability) -> bool {
        true
    }
}

/// Builds middleware for serving static directories.
pub trait Engine: Send + Sync {
    fn static_files(&self, prefix: &str, dir: PathBuf) -> Middleware;
}

/// Request extension telling views they may use the compiled-template cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewCache;
