//! Request ID middleware for request tracing

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header name for request ID
pub const X_REQUEST_ID: &str = "x-request-id";

/// Error bodies are small; anything bigger is passed through untouched.
const ERROR_BODY_LIMIT: usize = 64 * 1024;

/// Creates a layered middleware that:
/// 1. Sets a request ID if not present (using UUID v4)
/// 2. Propagates the request ID to the response
pub fn request_id_layer() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    let header_name = HeaderName::from_static(X_REQUEST_ID);

    (
        SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid),
        PropagateRequestIdLayer::new(header_name),
    )
}

/// Extension trait for extracting request ID from headers
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> Option<&str> {
        self.get(X_REQUEST_ID)?.to_str().ok()
    }
}

/// Copy the request id into JSON error bodies so clients can quote it.
pub async fn stamp_error_bodies(req: Request, next: Next) -> Response {
    let request_id = req.headers().request_id().map(str::to_string);
    let response = next.run(req).await;

    let status = response.status();
    let Some(request_id) = request_id else {
        return response;
    };
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, ERROR_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Could not buffer error body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let stamped = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(mut map)) => {
            map.insert("request_id".to_string(), Value::String(request_id));
            serde_json::to_vec(&map).unwrap_or_else(|_| bytes.to_vec())
        }
        _ => bytes.to_vec(),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(stamped))
}
