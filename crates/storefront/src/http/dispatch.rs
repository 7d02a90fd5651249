//! Handler dispatch: panic recovery, request logging and audience rendering.
//!
//! Handlers are plain async functions
//! `(AppState, RequestContext) -> Result<Envelope, AppError>`. Wrapping one
//! with [`action`] produces an axum handler that:
//!
//! 1. runs it, catching any panic and answering a generic 500 fault
//! 2. turns errors into error envelopes
//! 3. renders the envelope for the route's audience, with the configured
//!    version in mobile bodies

use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{Method, StatusCode, Uri, header},
    response::Response,
};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::context::RequestContext;
use super::envelope::{Audience, Envelope};
use crate::error::AppError;
use crate::state::AppState;

/// Message returned when a handler panics.
pub const PANIC_MESSAGE: &str = "Request is halted unexpectedly, please contact the administrator.";

/// Body text for unknown routes.
pub const NOT_FOUND_MESSAGE: &str = "page not found";

/// Fault message for a known route called with the wrong method.
pub const METHOD_NOT_ALLOWED_MESSAGE: &str =
    "Method Not Allowed. This URL can only handle the following request methods: POST";

const MAX_AUTH_LOG_LEN: usize = 16;
const MAX_BACKTRACE_LOG_LEN: usize = 4096;

/// Wrap a handler so it always yields a rendered envelope.
pub fn action<F, Fut>(
    handler: F,
) -> impl Fn(State<AppState>, RequestContext) -> BoxFuture<'static, Response>
+ Clone
+ Send
+ Sync
+ 'static
where
    F: Fn(AppState, RequestContext) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope, AppError>> + Send + 'static,
{
    move |State(state): State<AppState>, ctx: RequestContext| {
        let handler = handler.clone();
        run_action(handler, state, ctx).boxed()
    }
}

async fn run_action<F, Fut>(handler: F, state: AppState, ctx: RequestContext) -> Response
where
    F: Fn(AppState, RequestContext) -> Fut,
    Fut: Future<Output = Result<Envelope, AppError>>,
{
    let method = ctx.method().clone();
    let uri = ctx.uri().clone();
    let audience = ctx.audience();
    let authorization = ctx
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(redact_authorization);
    let info = ctx.request_info();
    let started = std::time::Instant::now();

    let outcome = AssertUnwindSafe(handler(state.clone(), ctx))
        .catch_unwind()
        .await;

    let envelope = match outcome {
        Ok(Ok(envelope)) => envelope,
        Ok(Err(err)) => err.into_envelope(),
        Err(payload) => {
            log_panic(&method, &uri, authorization.as_deref(), payload.as_ref());
            Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, PANIC_MESSAGE)
        }
    };

    if state.config().is_development() {
        tracing::debug!(
            request = %info,
            status = envelope.status.as_u16(),
            latency_ms = started.elapsed().as_millis(),
            "Request handled"
        );
    }

    envelope.render(audience, &state.config().version)
}

fn log_panic(method: &Method, uri: &Uri, authorization: Option<&str>, payload: &(dyn Any + Send)) {
    let message = panic_message(payload);
    let backtrace = truncate(&Backtrace::force_capture().to_string(), MAX_BACKTRACE_LOG_LEN);

    tracing::error!(
        method = %method,
        uri = %uri,
        authorization = authorization.unwrap_or("-"),
        panic = %message,
        backtrace = %backtrace,
        "Handler panicked"
    );
}

/// Extract the text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Keep the scheme and a short prefix of the credential.
fn redact_authorization(value: &str) -> String {
    let (scheme, credential) = value.split_once(' ').unwrap_or(("", value));
    let visible = truncate(credential, MAX_AUTH_LOG_LEN / 2);
    if scheme.is_empty() {
        format!("{visible}...")
    } else {
        format!("{scheme} {visible}...")
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Fallback for unknown routes: 404 "page not found" in the caller's envelope.
pub async fn not_found(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Response {
    AppError::NotFound(NOT_FOUND_MESSAGE.to_string())
        .into_envelope()
        .render(Audience::from_path(uri.path()), &state.config().version)
}

/// Fallback for known routes called with a method other than POST.
///
/// Runs inside the nested router, so the audience comes from the URI before
/// the prefix was stripped.
pub async fn method_not_allowed(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    Envelope::fault(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed",
        METHOD_NOT_ALLOWED_MESSAGE,
        0,
    )
    .render(Audience::from_path(uri.path()), &state.config().version)
}

/// Response for panics that escape dispatch (e.g. raised in middleware).
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
#[allow(clippy::needless_pass_by_value)] // Signature required by CatchPanicLayer
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    tracing::error!(panic = %panic_message(payload.as_ref()), "Request panicked outside dispatch");
    Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, PANIC_MESSAGE)
        .render(Audience::Mobile, "")
}
