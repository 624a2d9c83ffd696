// Configuration types module
// Sections of preview.toml, all serializable for --print-config

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    /// Extension (or media type) to content type overrides
    #[serde(default)]
    pub mime: BTreeMap<String, String>,
}

/// Listen address and runtime sizing
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Where the site lives and how its sources are read
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    pub source_dir: String,
    /// Appended to directory-like request paths
    pub index_file: String,
    /// Suffix marking a source file as a template
    pub template_suffix: String,
    /// Relative to `source_dir`
    pub partials_dir: String,
    /// Destination paths or directories whose resources answer 404
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// combined, common, json, or a `$variable` pattern
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// stdout if not set
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// stderr if not set
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Connection handling limits, in seconds
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}
