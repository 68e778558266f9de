use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::metrics::record_http_request;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Ensure each request carries an `X-Request-Id` and mirror it on the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let req_id_value = match req.headers().get(&header_name) {
        Some(value) => value.clone(),
        None => match HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            Ok(value) => value,
            Err(_) => return next.run(req).await,
        },
    };

    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

/// Count every request by method and final status.
pub async fn http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let res = next.run(req).await;
    record_http_request(method.as_str(), res.status().as_u16());
    res
}
