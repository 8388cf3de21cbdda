//! Response construction helpers.
//!
//! Handlers answer peers with either a fully formed body or a bare status
//! line; raw fault text never reaches the network.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::stream;

/// A bare status line with an empty body.
pub fn empty(status: StatusCode) -> Response {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .unwrap_or_default()
}

/// A 400 with an explicit zero content length.
pub fn bad_request() -> Response {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header(header::CONTENT_LENGTH, 0)
        .body(Body::empty())
        .unwrap_or_default()
}

/// A 200 whose body is streamed, so the wire uses chunked framing instead
/// of a content length.
pub fn chunked_ok(body: String, content_type: Option<&'static str>) -> Response {
    let stream = stream::once(async move { Ok::<_, std::convert::Infallible>(Bytes::from(body)) });
    let mut builder = Response::builder().status(StatusCode::OK);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from_stream(stream))
        .unwrap_or_default()
}

/// A 200 with an explicit content length.
pub fn sized_ok(body: Vec<u8>, content_type: Option<&'static str>) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, HeaderValue::from(body.len() as u64));
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_has_zero_length() {
        let response = bad_request();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH).unwrap(),
            "0"
        );
    }

    #[test]
    fn test_sized_ok_sets_exact_length() {
        let response = sized_ok(b"abcde".to_vec(), Some("text/plain"));
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH).unwrap(),
            "5"
        );
    }

    #[test]
    fn test_chunked_ok_has_no_length() {
        let response = chunked_ok("{}".into(), Some("application/json"));
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    }
}
