//! HTTP middleware stack for the store API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `CatchPanicLayer` (panics outside handler dispatch)
//! 3. `TraceLayer` (request span with `request_id` field)
//! 4. Request ID (add unique ID to each request)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
