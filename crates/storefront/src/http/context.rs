//! Per-request context: parsed body, path/query values and request metadata.
//!
//! The body is read exactly once when the context is extracted:
//!
//! - `GET` requests carry no body
//! - `application/json` bodies are decoded into a string-keyed map; an empty
//!   body is not an error, anything else that is not a JSON object is recorded
//!   as a `Malformed` error
//! - any other content type is read as a form (url-encoded or multipart),
//!   last value wins per key
//!
//! Two ways to read fields:
//!
//! - [`RequestContext::field`] and friends return `Result<T, FieldError>` so
//!   handlers stop at the first problem with `?`
//! - the collecting getters (`value_int`, `query_str`, ...) append errors to an
//!   ordered list and return a zero value; after the first error, numeric and
//!   boolean getters return zero without doing any work. Check
//!   [`RequestContext::has_error`] before using their results.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{
        ConnectInfo, FromRequest, FromRequestParts, Multipart, OriginalUri, RawPathParams, Request,
    },
    http::{HeaderMap, Method, Uri, header},
};
use serde_json::{Map, Value};

use super::envelope::Audience;
use super::field::{FieldError, FieldSource, FromField};
use crate::middleware::REQUEST_ID_HEADER;

/// Request body after parsing.
#[derive(Debug, Clone, Default)]
enum BodyData {
    /// `GET`: no body.
    #[default]
    None,
    Json(Map<String, Value>),
    Form(HashMap<String, String>),
}

/// Everything a handler needs to know about one request.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: BodyData,
    path: HashMap<String, String>,
    query: HashMap<String, String>,
    errors: Vec<FieldError>,
    request_id: String,
    ip: String,
    started: Instant,
}

impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let path = RawPathParams::from_request_parts(&mut parts, state)
            .await
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect()
            })
            .unwrap_or_default();

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        // Nested routers strip their prefix from `parts.uri`; the audience
        // depends on the full path.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |OriginalUri(uri)| uri.clone());

        let mut ctx = Self::new(parts.method.clone(), uri, parts.headers.clone());
        ctx.path = path;
        if ctx.ip.is_empty() {
            ctx.ip = peer.unwrap_or_default();
        }

        if ctx.method == Method::GET {
            return Ok(ctx);
        }

        let req = Request::from_parts(parts, body);
        if ctx.is_content_type_json() {
            match Bytes::from_request(req, state).await {
                Ok(bytes) => ctx.parse_json(&bytes),
                Err(e) => ctx.append_error(FieldError::Malformed(format!(
                    "invalid json body request: {e}"
                ))),
            }
        } else if ctx.content_type().starts_with("multipart/form-data") {
            ctx.parse_multipart(req, state).await;
        } else {
            match Bytes::from_request(req, state).await {
                Ok(bytes) => ctx.parse_urlencoded(&bytes),
                Err(e) => ctx.append_error(FieldError::Malformed(format!(
                    "invalid form body request: {e}"
                ))),
            }
        }

        Ok(ctx)
    }
}

impl RequestContext {
    /// A context with request metadata and no body.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let query = uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        let ip = client_ip(&headers).unwrap_or_default();
        let body = if method == Method::GET {
            BodyData::None
        } else {
            BodyData::Form(HashMap::new())
        };

        Self {
            method,
            uri,
            headers,
            body,
            path: HashMap::new(),
            query,
            errors: Vec::new(),
            request_id,
            ip,
            started: Instant::now(),
        }
    }

    // =========================================================================
    // Body parsing
    // =========================================================================

    fn parse_json(&mut self, bytes: &[u8]) {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            self.body = BodyData::Json(Map::new());
            return;
        }

        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => self.body = BodyData::Json(map),
            Ok(other) => {
                self.body = BodyData::Json(Map::new());
                self.append_error(FieldError::Malformed(format!(
                    "invalid json body request: expected an object, got {}",
                    json_type_name(&other)
                )));
            }
            Err(e) => {
                self.body = BodyData::Json(Map::new());
                self.append_error(FieldError::Malformed(format!(
                    "invalid json body request: {e}"
                )));
            }
        }
    }

    fn parse_urlencoded(&mut self, bytes: &[u8]) {
        // Collecting into a map keeps the last value for repeated keys.
        self.body = BodyData::Form(url::form_urlencoded::parse(bytes).into_owned().collect());
    }

    async fn parse_multipart<S: Send + Sync>(&mut self, req: Request, state: &S) {
        let mut form = HashMap::new();

        let mut multipart = match Multipart::from_request(req, state).await {
            Ok(multipart) => multipart,
            Err(e) => {
                self.body = BodyData::Form(form);
                self.append_error(FieldError::Malformed(format!(
                    "invalid form body request: {e}"
                )));
                return;
            }
        };

        loop {
            match multipart.next_field().await {
                Ok(Some(field)) => {
                    let Some(name) = field.name().map(str::to_owned) else {
                        continue;
                    };
                    // Uploaded files are not kept; only text fields are values.
                    if field.file_name().is_some() {
                        continue;
                    }
                    match field.text().await {
                        Ok(text) => {
                            form.insert(name, text);
                        }
                        Err(e) => {
                            self.append_error(FieldError::Malformed(format!(
                                "invalid form body request: {e}"
                            )));
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    self.append_error(FieldError::Malformed(format!(
                        "invalid form body request: {e}"
                    )));
                    break;
                }
            }
        }

        self.body = BodyData::Form(form);
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI including the query string.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of `x-request-id`, empty if none was set.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Client IP from `x-forwarded-for`, `x-real-ip` or the socket.
    #[must_use]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Web or mobile, from the route prefix.
    #[must_use]
    pub fn audience(&self) -> Audience {
        Audience::from_path(self.uri.path())
    }

    /// `Content-Type` header, empty if absent.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Whether the request declared a JSON body.
    #[must_use]
    pub fn is_content_type_json(&self) -> bool {
        self.content_type().contains("application/json")
    }

    /// The decoded JSON body, if the request had one.
    #[must_use]
    pub const fn json_body(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            BodyData::Json(map) => Some(map),
            _ => None,
        }
    }

    /// The decoded form body, if the request had one.
    #[must_use]
    pub const fn form_body(&self) -> Option<&HashMap<String, String>> {
        match &self.body {
            BodyData::Form(map) => Some(map),
            _ => None,
        }
    }

    // =========================================================================
    // Error collection
    // =========================================================================

    /// Record an input error.
    pub fn append_error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Whether any error has been recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The first recorded error; later ones are usually consequences of it.
    #[must_use]
    pub fn first_error(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    /// All recorded errors in order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Err` with the first recorded error, if any.
    ///
    /// # Errors
    ///
    /// Returns the first error appended so far.
    pub fn check(&self) -> Result<(), FieldError> {
        self.first_error().map_or(Ok(()), |e| Err(e.clone()))
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    /// A required body field.
    ///
    /// # Errors
    ///
    /// `Missing` if absent (or the request has no body), `Parse` if the value
    /// does not convert to `T`.
    pub fn field<T: FromField>(&self, key: &str) -> Result<T, FieldError> {
        self.optional_field(key)?
            .ok_or_else(|| FieldError::missing(key, self.body_source()))
    }

    /// An optional body field. JSON `null` counts as absent.
    ///
    /// # Errors
    ///
    /// `Parse` if the value is present but does not convert to `T`.
    pub fn optional_field<T: FromField>(&self, key: &str) -> Result<Option<T>, FieldError> {
        match &self.body {
            BodyData::None => Ok(None),
            BodyData::Json(map) => match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => T::from_json(value)
                    .map(Some)
                    .ok_or_else(|| FieldError::parse(key)),
            },
            BodyData::Form(map) => map
                .get(key)
                .map(|text| T::from_text(text).ok_or_else(|| FieldError::parse(key)))
                .transpose(),
        }
    }

    /// A required query parameter.
    ///
    /// # Errors
    ///
    /// `Missing` if absent, `Parse` if it does not convert to `T`.
    pub fn query_field<T: FromField>(&self, key: &str) -> Result<T, FieldError> {
        text_field(&self.query, key, FieldSource::Query)
    }

    /// A required path variable.
    ///
    /// # Errors
    ///
    /// `Missing` if absent, `Parse` if it does not convert to `T`.
    pub fn path_field<T: FromField>(&self, key: &str) -> Result<T, FieldError> {
        text_field(&self.path, key, FieldSource::Path)
    }

    const fn body_source(&self) -> FieldSource {
        match self.body {
            BodyData::Form(_) => FieldSource::FormBody,
            BodyData::Json(_) | BodyData::None => FieldSource::JsonBody,
        }
    }

    // =========================================================================
    // Collecting getters
    // =========================================================================

    /// Body value as a string; records `Missing`/`Parse` and returns `""`.
    pub fn value_str(&mut self, key: &str) -> String {
        if matches!(self.body, BodyData::None) {
            return String::new();
        }
        let result = self.field(key);
        self.collect(result)
    }

    /// Body value as `i32`.
    pub fn value_int(&mut self, key: &str) -> i32 {
        self.collect_numeric(|ctx| ctx.field(key))
    }

    /// Body value as `i64`.
    pub fn value_i64(&mut self, key: &str) -> i64 {
        self.collect_numeric(|ctx| ctx.field(key))
    }

    /// Body value as `f64`.
    pub fn value_f64(&mut self, key: &str) -> f64 {
        self.collect_numeric(|ctx| ctx.field(key))
    }

    /// Body value as `bool`.
    pub fn value_bool(&mut self, key: &str) -> bool {
        self.collect_numeric(|ctx| ctx.field(key))
    }

    /// Path variable as a string; records `Missing` and returns `""`.
    pub fn var_str(&mut self, key: &str) -> String {
        let result = self.path_field(key);
        self.collect(result)
    }

    /// Path variable as `i32`.
    pub fn var_int(&mut self, key: &str) -> i32 {
        self.collect_numeric(|ctx| ctx.path_field(key))
    }

    /// Path variable as `i64`.
    pub fn var_i64(&mut self, key: &str) -> i64 {
        self.collect_numeric(|ctx| ctx.path_field(key))
    }

    /// Path variable as `f64`.
    pub fn var_f64(&mut self, key: &str) -> f64 {
        self.collect_numeric(|ctx| ctx.path_field(key))
    }

    /// Query parameter as a string; records `Missing` and returns `""`.
    pub fn query_str(&mut self, key: &str) -> String {
        let result = self.query_field(key);
        self.collect(result)
    }

    /// Query parameter as `i32`.
    pub fn query_int(&mut self, key: &str) -> i32 {
        self.collect_numeric(|ctx| ctx.query_field(key))
    }

    /// Query parameter as `i64`.
    pub fn query_i64(&mut self, key: &str) -> i64 {
        self.collect_numeric(|ctx| ctx.query_field(key))
    }

    /// Query parameter as `f64`.
    pub fn query_f64(&mut self, key: &str) -> f64 {
        self.collect_numeric(|ctx| ctx.query_field(key))
    }

    /// Query parameter as `bool`.
    pub fn query_bool(&mut self, key: &str) -> bool {
        self.collect_numeric(|ctx| ctx.query_field(key))
    }

    /// Whether the query string contains `key`.
    #[must_use]
    pub fn has_query(&self, key: &str) -> bool {
        self.query.contains_key(key)
    }

    fn collect<T: Default>(&mut self, result: Result<T, FieldError>) -> T {
        result.unwrap_or_else(|e| {
            self.append_error(e);
            T::default()
        })
    }

    /// Short-circuits once any error is recorded.
    fn collect_numeric<T: Default>(
        &mut self,
        read: impl FnOnce(&Self) -> Result<T, FieldError>,
    ) -> T {
        if self.has_error() {
            return T::default();
        }
        let result = read(self);
        self.collect(result)
    }

    /// One-line summary for request logging.
    #[must_use]
    pub fn request_info(&self) -> String {
        format!(
            "{} {} - elapse: {:?}",
            self.method,
            self.uri,
            self.elapsed()
        )
    }
}

fn text_field<T: FromField>(
    values: &HashMap<String, String>,
    key: &str,
    location: FieldSource,
) -> Result<T, FieldError> {
    let text = values
        .get(key)
        .ok_or_else(|| FieldError::missing(key, location))?;
    T::from_text(text).ok_or_else(|| FieldError::parse(key))
}

/// First hop of `x-forwarded-for`, else `x-real-ip`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        })
        .map(str::to_owned)
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
