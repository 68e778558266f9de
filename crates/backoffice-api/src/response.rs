use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// JSON body shared by every endpoint: `{"code": 0, "msg": "ok", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Successful handler response: the payload wrapped in an [`Envelope`] plus
/// optional extra headers.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value,
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl ApiResponse<()> {
    /// `data: null`, for operations with nothing to return.
    pub fn empty() -> Self {
        Self::ok(())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let (status, body) = match serde_json::to_vec(&Envelope::ok(self.value)) {
            Ok(body) => (self.status, body),
            Err(e) => {
                tracing::error!(error = %e, "response serialization failed");
                let fallback = Envelope::<()>::error(500, "serialization failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::to_vec(&fallback).unwrap_or_else(|_| b"{}".to_vec()),
                )
            }
        };

        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        for (name, value) in self.headers {
            headers.insert(name, value);
        }
        response
    }
}
