//! HTTP response building module
//!
//! Holds the per-request response accumulator and the builders used by the
//! file streamer and the transport host.

use super::mime::MimeError;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};

/// A response that has left the pipeline and can no longer change
pub type FinalizedResponse = Response<Full<Bytes>>;

/// Mutable accumulator for status, headers and body of one request
///
/// Starts as `200` with no headers. [`ResponseState::finish`] consumes it,
/// so nothing can be written after finalization.
#[derive(Debug, Clone)]
pub struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseState {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Current `Content-Type`, if set and valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn set_content_type(&mut self, value: &str) -> Result<(), MimeError> {
        let header = HeaderValue::from_str(value)
            .map_err(|_| MimeError::InvalidHeaderValue(value.to_string()))?;
        self.headers.insert(CONTENT_TYPE, header);
        Ok(())
    }

    /// Append bytes to the body
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Hand the headers set so far to another producer (the file streamer)
    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }

    /// Finalize into a wire-level response
    pub fn finish(self) -> FinalizedResponse {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Build 304 Not Modified response
pub fn build_304_response(headers: HeaderMap, etag: &str) -> FinalizedResponse {
    let mut builder = Response::builder()
        .status(304)
        .header("ETag", etag)
        .header("Cache-Control", "no-cache");
    if let Some(h) = builder.headers_mut() {
        h.extend(without_content_type(headers));
    }
    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("304", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 404 Not Found response for a file that vanished from disk
pub fn build_404_response() -> FinalizedResponse {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("File not found")))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from("File not found")))
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> FinalizedResponse {
    Response::builder()
        .status(416)
        .header("Content-Type", "text/plain")
        .header("Content-Range", format!("bytes */{file_size}"))
        .body(Full::new(Bytes::from("Range Not Satisfiable")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::from("Range Not Satisfiable")))
        })
}

/// Build generic 500 response for failures the dispatcher does not recover
pub fn build_500_response() -> FinalizedResponse {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("Internal Server Error")))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(Full::new(Bytes::from("Internal Server Error")))
        })
}

/// Build a full file response on top of `headers`
pub fn build_file_response(
    headers: HeaderMap,
    data: Bytes,
    etag: &str,
    is_head: bool,
) -> FinalizedResponse {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    let mut builder = Response::builder()
        .status(200)
        .header("Content-Length", content_length)
        .header("Accept-Ranges", "bytes")
        .header("ETag", etag)
        .header("Cache-Control", "no-cache");
    if let Some(h) = builder.headers_mut() {
        h.extend(headers);
    }
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 206 Partial Content response on top of `headers`
pub fn build_partial_response(
    headers: HeaderMap,
    data: Bytes,
    etag: &str,
    start: usize,
    end: usize,
    total_size: usize,
    is_head: bool,
) -> FinalizedResponse {
    let content_length = end - start + 1;
    let body = if is_head { Bytes::new() } else { data };

    let mut builder = Response::builder()
        .status(206)
        .header("Content-Length", content_length)
        .header("Content-Range", format!("bytes {start}-{end}/{total_size}"))
        .header("Accept-Ranges", "bytes")
        .header("ETag", etag)
        .header("Cache-Control", "no-cache");
    if let Some(h) = builder.headers_mut() {
        h.extend(headers);
    }
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("206", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

fn without_content_type(mut headers: HeaderMap) -> HeaderMap {
    headers.remove(CONTENT_TYPE);
    headers
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
