// Connection module
// Serves one TCP connection: HTTP/1 framing around Dispatcher::dispatch

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::http::request::Parts;
use hyper::{Request, Version};
use hyper_util::rt::TokioIo;

use crate::config::AppState;
use crate::handler::RawEnvironment;
use crate::http::response::build_500_response;
use crate::http::FinalizedResponse;
use crate::logger::{self, AccessLogEntry};

/// Admit a connection if under the limit, then serve it on the local set
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first, then compare, so two accepts can't both slip under
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            return;
        }
    }

    logger::log_debug(&format!("Accepted connection from {peer_addr}"));
    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(conn_counter));
}

fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);
        let performance = &state.config.performance;
        let timeout_duration = Duration::from_secs(std::cmp::max(
            performance.read_timeout,
            performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move { Ok::<_, Infallible>(serve_request(req, peer_addr, &state).await) }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_debug(&format!(
                "Connection from {peer_addr} closed after {}s timeout",
                timeout_duration.as_secs()
            )),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Service function body for one request
async fn serve_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: &AppState,
) -> FinalizedResponse {
    // Bodies are never read; hyper discards whatever the client still sends
    let (parts, body) = req.into_parts();
    drop(body);
    respond(parts, peer_addr, state).await
}

/// Hand one request to the dispatcher and record it in the access log
async fn respond(parts: Parts, peer_addr: SocketAddr, state: &AppState) -> FinalizedResponse {
    let start = Instant::now();
    let env = RawEnvironment::from_parts(parts).with_remote_addr(peer_addr);
    let entry = state
        .access_log_enabled()
        .then(|| access_entry(&env, peer_addr));

    let response = match state.dispatcher.dispatch(env).await {
        Ok(response) => response,
        Err(e) => {
            logger::log_error(&format!("Request failed: {e}"));
            build_500_response()
        }
    };

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, state.access_log_format());
    }

    response
}

fn access_entry(env: &RawEnvironment, peer_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        env.method.to_string(),
        env.path_info().to_string(),
    );
    entry.query = env.uri.query().map(ToString::to_string);
    entry.http_version = version_label(env.version).to_string();
    entry.referer = env.header("referer").map(ToString::to_string);
    entry.user_agent = env.header("user-agent").map(ToString::to_string);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
