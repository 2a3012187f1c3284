use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use grimm_core::{async_trait, Bundle, BundleError, Context, Locals, Middleware, ViewCache};
use serde_json::json;
use std::sync::Arc;

/// Built-in `_errors` bundle.
///
/// Replaces the body of any 404 response with the bundle's `404` view,
/// when it has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorPages;

#[async_trait]
impl Bundle for ErrorPages {
    async fn mount(&self, ctx: Arc<dyn Context>, locals: Locals) -> Result<(), BundleError> {
        let Some(view) = locals.views.get("404").map(|path| path.to_path_buf()) else {
            ctx.logger()
                .debug(format!("{}: no 404 view, keeping default responses", locals.name));
            return Ok(());
        };

        let templating = ctx.templating().clone();
        let logger = ctx.logger().clone();
        ctx.use_middleware(Middleware::layer(move |req: Request, next: Next| {
            let templating = templating.clone();
            let logger = logger.clone();
            let view = view.clone();
            async move {
                let path = req.uri().path().to_string();
                let cache = req.extensions().get::<ViewCache>().is_some();
                let response = next.run(req).await;
                if response.status() != StatusCode::NOT_FOUND {
                    return response;
                }
                let data = json!({"title": "Not Found", "path": path});
                match templating.render(&view, &data, cache) {
                    Ok(body) => (StatusCode::NOT_FOUND, Html(body)).into_response(),
                    Err(e) => {
                        logger.error(format!("404 page failed: {}", e));
                        response
                    }
                }
            }
        }));
        Ok(())
    }
}
