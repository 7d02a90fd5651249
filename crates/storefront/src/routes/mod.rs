//! HTTP route handlers for the store API.
//!
//! # Route Structure
//!
//! Every API route is mounted twice: under `/api/v1` for mobile clients and
//! under `/api/web` for the web client. Only `POST` is accepted; other
//! methods get a 405 fault.
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (repository ping)
//!
//! POST /api/{v1,web}/product/list      - Products, optional category filter
//! POST /api/{v1,web}/cart/add          - Add a product to a member's cart
//! POST /api/{v1,web}/cart/view         - A member's active cart rows
//! POST /api/{v1,web}/cart/delete       - Deactivate a product in a cart
//! POST /api/{v1,web}/transaction/create - Checkout
//! POST /api/{v1,web}/login             - Issue a session token
//! ```

pub mod auth;
pub mod cart;
pub mod products;
pub mod transactions;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::AppError;
use crate::http::{
    FieldError, RequestContext, action, method_not_allowed, not_found, panic_response,
};
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Message for requests that do not declare a JSON body.
pub const INVALID_CONTENT_TYPE: &str = "invalid content type";

/// API routes, mounted under each audience prefix.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/product/list", post(action(products::list)))
        .route("/cart/add", post(action(cart::add)))
        .route("/cart/view", post(action(cart::view)))
        .route("/cart/delete", post(action(cart::delete)))
        .route("/transaction/create", post(action(transactions::create)))
        .route("/login", post(action(auth::login)))
        // Must come after the routes it applies to.
        .method_not_allowed_fallback(method_not_allowed)
}

/// Build the complete application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/v1", api_routes())
        .nest("/api/web", api_routes())
        .fallback(not_found)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Reject anything but a JSON body with 400 "invalid content type".
pub(crate) fn require_json(ctx: &RequestContext) -> Result<(), AppError> {
    if ctx.is_content_type_json() {
        Ok(())
    } else {
        Err(AppError::BadRequest(INVALID_CONTENT_TYPE.to_string()))
    }
}

/// Required `quantity` field, at least one.
pub(crate) fn positive_quantity(ctx: &RequestContext) -> Result<i32, FieldError> {
    let quantity: i32 = ctx.field("quantity")?;
    if quantity < 1 {
        return Err(FieldError::invalid("quantity", "must be at least 1"));
    }
    Ok(quantity)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the repository is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.service().repository().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
