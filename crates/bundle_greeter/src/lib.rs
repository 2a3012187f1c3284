//! Example bundle.
//!
//! Build it and copy the library into the bundle directory:
//!
//! ```text
//! cargo build -p bundle_greeter --release
//! cp target/release/libbundle_greeter.so <root>/bundles/greeter/index.so
//! ```
//!
//! Routes:
//! * `GET /greeter` renders the bundle's `hello` view
//! * `POST /greeter/echo` answers `{"echo": <body>, "visits": <n>}`
//!
//! Socket.IO namespace `/greeter`: a `hello` event carrying a name is
//! answered with a `greeting` event.

use async_trait::async_trait;
use grimm_core::axum::body::to_bytes;
use grimm_core::axum::http::StatusCode;
use grimm_core::axum::response::{Html, IntoResponse, Json};
use grimm_core::socketioxide::extract::{Data, SocketRef};
use grimm_core::{export_bundle, Bundle, BundleError, Context, Locals, RouteHandler, ViewCache};
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest request body the echo endpoint accepts.
const ECHO_LIMIT: usize = 64 * 1024;

#[derive(Default)]
pub struct Greeter {
    visits: Arc<AtomicU64>,
}

#[derive(Debug, Serialize)]
struct Echo {
    echo: String,
    visits: u64,
}

pub fn greeting(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        "Hello, stranger!".to_string()
    } else {
        format!("Hello, {}!", name)
    }
}

#[async_trait]
impl Bundle for Greeter {
    async fn mount(&self, ctx: Arc<dyn Context>, locals: Locals) -> Result<(), BundleError> {
        let view = locals
            .views
            .get("hello")
            .map(|path| path.to_path_buf())
            .ok_or_else(|| {
                BundleError::InitializationFailed(format!("{}: missing views/hello.html", locals.name))
            })?;

        let templating = ctx.templating().clone();
        let logger = ctx.logger().clone();
        let visits = self.visits.clone();
        let env = ctx.env_name().to_string();
        ctx.get(
            "/greeter",
            RouteHandler::new(move |req| {
                let count = visits.fetch_add(1, Ordering::Relaxed) + 1;
                let cache = req.extensions().get::<ViewCache>().is_some();
                let data = json!({"title": "Greeter", "visits": count, "env": env});
                let rendered = templating.render(&view, &data, cache);
                let logger = logger.clone();
                async move {
                    match rendered {
                        Ok(body) => Html(body).into_response(),
                        Err(e) => {
                            logger.error(e.to_string());
                            StatusCode::INTERNAL_SERVER_ERROR.into_response()
                        }
                    }
                }
            }),
        );

        let visits = self.visits.clone();
        ctx.post(
            "/greeter/echo",
            RouteHandler::new(move |req| {
                let visits = visits.load(Ordering::Relaxed);
                async move {
                    match to_bytes(req.into_body(), ECHO_LIMIT).await {
                        Ok(body) => Json(Echo {
                            echo: String::from_utf8_lossy(&body).into_owned(),
                            visits,
                        })
                        .into_response(),
                        Err(_) => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
                    }
                }
            }),
        );

        // Logs go through the host logger; this library's own `tracing`
        // dispatcher is not the host's.
        match ctx.sockets() {
            Some(io) => {
                let logger = ctx.logger().clone();
                io.ns("/greeter", move |socket: SocketRef| {
                    logger.debug(format!("greeter socket connected: {}", socket.id));
                    let logger = logger.clone();
                    socket.on("hello", move |socket: SocketRef, Data(name): Data<String>| {
                        if let Err(e) = socket.emit("greeting", &greeting(&name)) {
                            logger.warn(format!("greeter emit failed: {}", e));
                        }
                    });
                });
            }
            None => {
                ctx.logger().info("greeter: sockets disabled, skipping namespace");
            }
        }

        ctx.logger().info(format!("{} mounted", locals.name));
        Ok(())
    }
}

export_bundle!(Greeter::default());
