//! Logger module
//!
//! Console logging for the preview server:
//! - server lifecycle
//! - `== Request` / `== Finishing Request` lines per dispatch
//! - access log entries in a configurable format
//! - warnings and errors, optionally to files
//!
//! Before [`init`] runs, everything goes to stdout/stderr and debug lines
//! are dropped.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the process-wide writer from configuration
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        config.logging.level.eq_ignore_ascii_case("debug"),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("== The preview server is now running");
    write_info(&format!("== View your site at \"http://{addr}\""));
    write_info(&format!("== Serving from: {}", config.site.source_dir));
    write_info(&format!("== Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("== Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("== Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("== Error log: {path}"));
    }
}

pub fn log_sitemap_loaded(count: usize) {
    write_info(&format!("== Sitemap: {count} resources"));
}

pub fn log_shutdown() {
    write_info("== The preview server is shutting down");
}

pub fn log_request(path: &str) {
    write_info(&format!("== Request: {path}"));
}

pub fn log_request_finished(path: &str, elapsed: Duration) {
    write_info(&format!(
        "== Finishing Request: {path} ({:.2}s)",
        elapsed.as_secs_f64()
    ));
}

pub fn log_not_found(path: &str) {
    write_info(&format!("== Not found: {path}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Only written when the configured level is `debug`
pub fn log_debug(message: &str) {
    if writer::get().is_some_and(writer::LogWriter::debug_enabled) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}
