use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    BoxError, Extension, Router,
};
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer};

use crate::{issuer::UrlIssuer, routes, types::AppError};

/// Default listen port
pub const DEFAULT_PORT: u16 = 8001;

/// Deadline for a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the application router with its CORS headers, request deadline and panic handling
///
/// The CORS headers are set on every response, including errors, timeouts and caught panics.
#[must_use]
pub fn router(issuer: Arc<UrlIssuer>) -> Router {
    router_with_timeout(issuer, REQUEST_TIMEOUT)
}

/// Builds the application router with a custom request deadline
///
/// A request exceeding `timeout` gets the generic 500 response.
#[must_use]
pub fn router_with_timeout(issuer: Arc<UrlIssuer>, timeout: Duration) -> Router {
    routes::handler()
        .layer(Extension(issuer))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(timeout),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("OPTIONS,POST,GET"),
        ))
}

async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::error!("Request exceeded deadline");
    } else {
        tracing::error!("Unhandled middleware error: {err}");
    }
    AppError::internal()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(fault = "panic", error = %detail, "Handler panicked");

    AppError::internal().into_response()
}

/// Starts the server with the given issuer
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(issuer: Arc<UrlIssuer>) -> anyhow::Result<()> {
    let router = router(issuer)
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default());

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(DEFAULT_PORT), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 URL Issuer started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}
