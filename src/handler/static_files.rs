//! Static file serving module
//!
//! [`StaticSender`] decides the media type of a static resource and
//! [`FileStreamer`] moves the bytes, handling conditional and range requests.

use crate::handler::context::{RawEnvironment, RequestContext};
use crate::http::cache::{etag_for, is_not_modified};
use crate::http::mime::{MimeError, MimeRegistry, OCTET_STREAM};
use crate::http::range::{evaluate_range, RangeOutcome};
use crate::http::response::{
    build_304_response, build_404_response, build_416_response, build_file_response,
    build_partial_response, FinalizedResponse,
};
use crate::http::{set_content_type, ContentTypeOptions};
use crate::logger;
use crate::sitemap::extension_of;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_ENCODING};
use hyper::StatusCode;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

/// Extensions whose files are stored gzip-compressed on disk
const PRECOMPRESSED_EXTENSIONS: &[&str] = &[".svgz"];

/// Streams a file from disk as a response
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStreamer;

impl FileStreamer {
    /// Serve `path`, layering the streamer's headers over `headers`
    pub async fn serve(
        &self,
        path: &Path,
        env: &RawEnvironment,
        headers: HeaderMap,
    ) -> FinalizedResponse {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
                }
                return build_404_response();
            }
        };

        let etag = etag_for(&data);
        if is_not_modified(env.header("if-none-match"), &etag) {
            return build_304_response(headers, &etag);
        }

        let total_size = data.len();
        match evaluate_range(env.header("range"), total_size) {
            RangeOutcome::Partial(range) => {
                let body = Bytes::from(data).slice(range.start..=range.end);
                build_partial_response(
                    headers,
                    body,
                    &etag,
                    range.start,
                    range.end,
                    total_size,
                    env.is_head(),
                )
            }
            RangeOutcome::NotSatisfiable => build_416_response(total_size),
            RangeOutcome::Full => build_file_response(headers, Bytes::from(data), &etag, env.is_head()),
        }
    }
}

/// Sends static resources straight from disk
#[derive(Debug, Clone)]
pub struct StaticSender {
    registry: Arc<MimeRegistry>,
    streamer: FileStreamer,
}

impl StaticSender {
    pub const fn new(registry: Arc<MimeRegistry>) -> Self {
        Self {
            registry,
            streamer: FileStreamer,
        }
    }

    /// Serve the file at `path` as the final response of `ctx`
    pub async fn send(
        &self,
        path: &Path,
        ctx: &mut RequestContext,
    ) -> Result<FinalizedResponse, MimeError> {
        let extension = extension_of(path);
        let matched = self
            .registry
            .lookup(extension.as_deref())
            .unwrap_or_else(|| OCTET_STREAM.to_string());
        set_content_type(
            ctx.response_mut(),
            &self.registry,
            Some(&matched),
            &ContentTypeOptions::default(),
        )?;

        let headers = ctx.take_response().into_headers();
        let mut response = self.streamer.serve(path, ctx.env(), headers).await;

        // Already compressed on disk, only the header is missing. Error
        // bodies are plain text and stay unmarked.
        let serves_file = response.status().is_success()
            || response.status() == StatusCode::NOT_MODIFIED;
        if serves_file
            && extension
                .as_deref()
                .is_some_and(|ext| PRECOMPRESSED_EXTENSIONS.contains(&ext))
        {
            response
                .headers_mut()
                .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }
        Ok(response)
    }
}
