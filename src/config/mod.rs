// Configuration module entry point
// Loads preview.toml layered under PREVIEW_* environment variables

mod state;
mod types;

use crate::error::AppError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub use state::AppState;
pub use types::{Config, LoggingConfig, PerformanceConfig, ServerConfig, SiteConfig};

impl Config {
    /// Load configuration from `config_path` (extension optional)
    ///
    /// The file may be absent. Environment variables such as
    /// `PREVIEW_SERVER__PORT` override it.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PREVIEW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 4567)?
            .set_default("site.source_dir", "source")?
            .set_default("site.index_file", "index.html")?
            .set_default("site.template_suffix", ".tmpl")?
            .set_default("site.partials_dir", "_partials")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, AppError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| AppError::Address(addr))
    }

    pub fn source_dir(&self) -> PathBuf {
        PathBuf::from(&self.site.source_dir)
    }

    pub fn partials_dir(&self) -> PathBuf {
        self.source_dir().join(&self.site.partials_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/preview").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.site.index_file, "index.html");
        assert_eq!(cfg.site.template_suffix, ".tmpl");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.site.ignore.is_empty());
        assert!(cfg.mime.is_empty());
        assert_eq!(cfg.partials_dir(), PathBuf::from("source/_partials"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preview.toml");
        std::fs::write(
            &path,
            r#"
[site]
source_dir = "site"
ignore = ["drafts"]

[logging]
level = "debug"
access_log_format = "json"

[mime]
webmanifest = "application/manifest+json"
"#,
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.site.source_dir, "site");
        assert_eq!(cfg.site.partials_dir, "_partials");
        assert_eq!(cfg.site.ignore, vec!["drafts".to_string()]);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.access_log_format, "json");
        assert_eq!(
            cfg.mime.get("webmanifest").map(String::as_str),
            Some("application/manifest+json")
        );
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_from("does-not-exist/preview").unwrap();
        cfg.server.port = 9000;
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 9000);

        cfg.server.host = "not a host".to_string();
        assert!(matches!(cfg.get_socket_addr(), Err(AppError::Address(_))));
    }

    #[test]
    fn test_serializes_to_toml() {
        let cfg = Config::load_from("does-not-exist/preview").unwrap();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("[site]"));
        assert!(text.contains("index_file = \"index.html\""));
    }
}
