//! Access log lines
//!
//! Named formats are `combined`, `common` and `json`. Anything else is
//! treated as a pattern with `$variable` placeholders.

use chrono::{DateTime, Local};
use serde::Serialize;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One served request, as recorded in the access log
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    #[serde(serialize_with = "rfc3339")]
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Without the leading `?`
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

fn rfc3339<S: serde::Serializer>(time: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.to_rfc3339())
}

impl AccessLogEntry {
    /// Entry stamped with the current local time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "common" => self.format_common(),
            "json" => serde_json::to_string(self).unwrap_or_default(),
            pattern => self.format_pattern(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}",
            self.method,
            self.request_uri(),
            self.http_version
        )
    }

    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// Substitute `$variable` placeholders
    ///
    /// Variables: `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$request_time`
    /// (seconds), `$status`, `$body_bytes_sent`, `$http_referer`,
    /// `$http_user_agent`.
    fn format_pattern(&self, pattern: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let seconds = self.request_time_us as f64 / 1_000_000.0;

        // Longer names first: `$request_*` before `$request`
        let substitutions = [
            ("$remote_addr", self.remote_addr.clone()),
            ("$time_local", self.time.format(CLF_TIME).to_string()),
            ("$time_iso8601", self.time.to_rfc3339()),
            ("$request_time", format!("{seconds:.3}")),
            ("$request_method", self.method.clone()),
            ("$request_uri", self.request_uri()),
            ("$request", self.request_line()),
            ("$status", self.status.to_string()),
            ("$body_bytes_sent", self.body_bytes.to_string()),
            (
                "$http_referer",
                self.referer.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "$http_user_agent",
                self.user_agent.clone().unwrap_or_else(|| "-".to_string()),
            ),
        ];

        substitutions
            .iter()
            .fold(pattern.to_string(), |line, (name, value)| {
                line.replace(name, value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "/blog/index.html".to_string(),
        );
        entry.query = Some("draft=1".to_string());
        entry.status = 200;
        entry.body_bytes = 512;
        entry.referer = Some("http://localhost:4567/".to_string());
        entry.user_agent = Some("curl/8.0".to_string());
        entry.request_time_us = 2600;
        entry
    }

    #[test]
    fn test_combined_extends_common() {
        let entry = entry();
        let common = entry.format("common");
        assert!(common.contains("\"GET /blog/index.html?draft=1 HTTP/1.1\" 200 512"));
        assert!(!common.contains("curl/8.0"));

        let combined = entry.format("combined");
        assert!(combined.starts_with(&common));
        assert!(combined.ends_with("\"http://localhost:4567/\" \"curl/8.0\""));
    }

    #[test]
    fn test_json_is_valid() {
        let line = entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["path"], "/blog/index.html");
        assert_eq!(value["status"], 200);
        assert_eq!(value["query"], "draft=1");
        assert!(value["time"].is_string());
    }

    #[test]
    fn test_pattern() {
        let line = entry().format("$request_method $request_uri -> $status in $request_time");
        assert_eq!(line, "GET /blog/index.html?draft=1 -> 200 in 0.003");
    }
}
