//! Uniform response shaping for web and mobile clients.
//!
//! Every handler produces an [`Envelope`] `(status, message, data,
//! response_type)`; [`Envelope::render`] turns it into the HTTP response the
//! audience expects:
//!
//! | Case | Body | HTTP status |
//! |---|---|---|
//! | status >= 500 (unless `MobileStatusOk`) | fault `{name:"Server Error", message, code:0, status}` | real |
//! | `MobileNotAllowed` | fault (the envelope's data) | real |
//! | `Stream` | raw bytes, `application/octet-stream` | 200 |
//! | web | `{status, message, data}` | real |
//! | mobile, `MobileSetStatusCode` | `{message, status, data, version}` | real |
//! | mobile, otherwise | `{message, status, data, version}` | 200 |

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// Name used in the fault body for server errors.
pub const SERVER_ERROR_NAME: &str = "Server Error";

/// Which client family a route serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// `/api/web/...`: real HTTP statuses.
    Web,
    /// Everything else (`/api/v1/...`): HTTP 200 with the status in the body.
    Mobile,
}

impl Audience {
    /// Classify a request path.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path.contains("/api/web/") {
            Self::Web
        } else {
            Self::Mobile
        }
    }
}

/// How an envelope is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Audience-dependent (see module docs).
    Default,
    /// Mobile body at HTTP 200 even for server errors.
    MobileStatusOk,
    /// Mobile body at the real HTTP status.
    MobileSetStatusCode,
    /// Fault body at the real HTTP status.
    MobileNotAllowed,
    /// Binary download.
    Stream,
}

/// Fault body used for server errors and rejected methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub name: String,
    pub message: String,
    pub code: i32,
    pub status: u16,
}

#[derive(Serialize)]
struct WebBody<'a> {
    status: u16,
    message: &'a str,
    data: &'a Value,
}

#[derive(Serialize)]
struct MobileBody<'a> {
    message: &'a str,
    status: u16,
    data: &'a Value,
    version: &'a str,
}

/// A handler's answer, before audience shaping.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub status: StatusCode,
    pub message: String,
    pub data: Value,
    pub response_type: ResponseType,
    stream: Option<Bytes>,
}

impl Envelope {
    fn build(status: StatusCode, message: impl Into<String>, data: Value, kind: ResponseType) -> Self {
        Self {
            status,
            message: message.into(),
            data,
            response_type: kind,
            stream: None,
        }
    }

    /// Success with a serialized payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` fails to serialize.
    pub fn json(
        status: StatusCode,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::build(
            status,
            message,
            serde_json::to_value(data)?,
            ResponseType::Default,
        ))
    }

    /// Success without a payload (`data: null`).
    #[must_use]
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::build(status, message, Value::Null, ResponseType::Default)
    }

    /// Error with the legacy empty-array payload (`data: []`).
    #[must_use]
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::build(
            status,
            message,
            Value::Array(Vec::new()),
            ResponseType::Default,
        )
    }

    /// Mobile body that stays at HTTP 200 even for server errors.
    #[must_use]
    pub fn mobile_status_ok(status: StatusCode, message: impl Into<String>, data: Value) -> Self {
        Self::build(status, message, data, ResponseType::MobileStatusOk)
    }

    /// Mobile body at the real HTTP status.
    #[must_use]
    pub fn mobile_set_status_code(
        status: StatusCode,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self::build(status, message, data, ResponseType::MobileSetStatusCode)
    }

    /// Fault body `{name, message, code, status}` at the real HTTP status.
    #[must_use]
    pub fn fault(status: StatusCode, name: &str, message: &str, code: i32) -> Self {
        let fault = Fault {
            name: name.to_owned(),
            message: message.to_owned(),
            code,
            status: status.as_u16(),
        };
        let data = serde_json::to_value(&fault).unwrap_or(Value::Null);
        Self::build(status, String::new(), data, ResponseType::MobileNotAllowed)
    }

    /// Binary download; `filename` becomes the attachment name.
    #[must_use]
    pub fn stream(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let mut envelope = Self::build(StatusCode::OK, filename, Value::Null, ResponseType::Stream);
        envelope.stream = Some(bytes.into());
        envelope
    }

    /// Shape the envelope for `audience`. `version` is reported in mobile bodies.
    #[must_use]
    pub fn render(self, audience: Audience, version: &str) -> Response {
        let status = self.status;

        if status.is_server_error() && self.response_type != ResponseType::MobileStatusOk {
            let fault = Fault {
                name: SERVER_ERROR_NAME.to_owned(),
                message: self.message,
                code: 0,
                status: status.as_u16(),
            };
            return (status, axum::Json(fault)).into_response();
        }

        match (self.response_type, audience) {
            (ResponseType::MobileNotAllowed, _) => (status, axum::Json(self.data)).into_response(),
            (ResponseType::Stream, _) => {
                stream_response(&self.message, self.stream.unwrap_or_default())
            }
            (_, Audience::Web) => (
                status,
                axum::Json(WebBody {
                    status: status.as_u16(),
                    message: &self.message,
                    data: &self.data,
                }),
            )
                .into_response(),
            (kind, Audience::Mobile) => {
                let http_status = if kind == ResponseType::MobileSetStatusCode {
                    status
                } else {
                    StatusCode::OK
                };
                (
                    http_status,
                    axum::Json(MobileBody {
                        message: &self.message,
                        status: status.as_u16(),
                        data: &self.data,
                        version,
                    }),
                )
                    .into_response()
            }
        }
    }
}

fn stream_response(filename: &str, bytes: Bytes) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = Response::new(Body::from(bytes.clone()));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_audience_from_path() {
        assert_eq!(Audience::from_path("/api/web/cart/add"), Audience::Web);
        assert_eq!(Audience::from_path("/api/v1/cart/add"), Audience::Mobile);
        assert_eq!(Audience::from_path("/unknown"), Audience::Mobile);
    }

    #[tokio::test]
    async fn test_mobile_error_is_http_200() {
        let response =
            Envelope::error(StatusCode::NOT_FOUND, "Product not found").render(Audience::Mobile, "2.1.0");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Product not found", "status": 404, "data": [], "version": "2.1.0"})
        );
    }

    #[tokio::test]
    async fn test_web_error_keeps_status() {
        let response =
            Envelope::error(StatusCode::NOT_FOUND, "Product not found").render(Audience::Web, "2.1.0");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"status": 404, "message": "Product not found", "data": []})
        );
    }

    #[tokio::test]
    async fn test_server_error_is_fault_for_both_audiences() {
        for audience in [Audience::Web, Audience::Mobile] {
            let response = Envelope::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                .render(audience, "2.1.0");

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                body_json(response).await,
                json!({"name": "Server Error", "message": "Internal server error", "code": 0, "status": 500})
            );
        }
    }

    #[tokio::test]
    async fn test_mobile_status_ok_hides_server_error() {
        let response = Envelope::mobile_status_ok(StatusCode::BAD_GATEWAY, "upstream down", json!([]))
            .render(Audience::Mobile, "2.1.0");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], json!(502));
    }

    #[tokio::test]
    async fn test_mobile_set_status_code() {
        let response =
            Envelope::mobile_set_status_code(StatusCode::BAD_REQUEST, "bad", Value::Null)
                .render(Audience::Mobile, "2.1.0");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["version"], json!("2.1.0"));
    }

    #[tokio::test]
    async fn test_fault_uses_real_status() {
        let response = Envelope::fault(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
            "Method Not Allowed. This URL can only handle the following request methods: POST",
            0,
        )
        .render(Audience::Mobile, "2.1.0");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert_eq!(body["name"], json!("Method Not Allowed"));
        assert_eq!(body["status"], json!(405));
        assert_eq!(body["code"], json!(0));
    }

    #[tokio::test]
    async fn test_stream_response() {
        let response = Envelope::stream("report.csv", "id,name\n1,Phone\n").render(Audience::Web, "");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.csv\""
        );
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "16");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"id,name\n1,Phone\n");
    }
}
