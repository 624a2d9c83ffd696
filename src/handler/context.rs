//! Per-request state
//!
//! A [`RequestContext`] is built at the start of every dispatch and dropped
//! once the response is finalized. It is passed down explicitly; nothing
//! request-scoped lives on the dispatcher or in globals.

use crate::http::{FinalizedResponse, ResponseState};
use hyper::header::HeaderMap;
use hyper::http::request::Parts;
use hyper::{Method, Request, Uri, Version};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Transport-level description of the inbound request
#[derive(Debug, Clone)]
pub struct RawEnvironment {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

impl RawEnvironment {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
            remote_addr: None,
        }
    }

    pub fn from_parts(parts: Parts) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            remote_addr: None,
        }
    }

    /// GET request for `uri`, used by tests and tooling
    pub fn get(uri: &str) -> Self {
        Self {
            method: Method::GET,
            uri: uri.parse().unwrap_or_else(|_| Uri::from_static("/")),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            remote_addr: None,
        }
    }

    #[must_use]
    pub const fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Undecoded request path
    pub fn path_info(&self) -> &str {
        self.uri.path()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Structured view of the request: path and query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    path: String,
    params: HashMap<String, String>,
}

impl ParsedRequest {
    pub fn parse(env: &RawEnvironment) -> Self {
        let params = env
            .uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self {
            path: env.path_info().to_string(),
            params,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// State of one in-flight request
///
/// Cloning takes a snapshot, which is how a render running on the blocking
/// pool sees the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    env: RawEnvironment,
    request: ParsedRequest,
    response: ResponseState,
    current_path: Option<String>,
}

impl RequestContext {
    pub fn new(env: RawEnvironment) -> Self {
        let request = ParsedRequest::parse(&env);
        Self {
            env,
            request,
            response: ResponseState::new(),
            current_path: None,
        }
    }

    pub const fn env(&self) -> &RawEnvironment {
        &self.env
    }

    pub const fn request(&self) -> &ParsedRequest {
        &self.request
    }

    pub const fn response(&self) -> &ResponseState {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseState {
        &mut self.response
    }

    /// Normalized path being rendered, readable by renderers
    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn set_current_path(&mut self, path: impl Into<String>) {
        self.current_path = Some(path.into());
    }

    /// Take the response accumulated so far, leaving a fresh one behind
    pub fn take_response(&mut self) -> ResponseState {
        std::mem::take(&mut self.response)
    }

    /// Finalize the accumulated response, ending the request
    pub fn finish(self) -> FinalizedResponse {
        self.response.finish()
    }
}
