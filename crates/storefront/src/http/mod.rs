//! Request parsing and response shaping shared by every route.
//!
//! - `context` - [`RequestContext`]: the parsed body and typed field access
//! - `envelope` - [`Envelope`]: status/message/data rendered per audience
//! - `dispatch` - [`action`]: runs a handler with panic recovery and renders it
//! - `field` - [`FieldError`] and value coercion

pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod field;

pub use context::RequestContext;
pub use dispatch::{PANIC_MESSAGE, action, method_not_allowed, not_found, panic_response};
pub use envelope::{Audience, Envelope, Fault, ResponseType};
pub use field::{FieldError, FieldSource, FromField};
