//! Error types that cross module boundaries

use crate::http::MimeError;
use crate::render::RenderError;
use crate::sitemap::SitemapError;
use thiserror::Error;

/// Failures that escape [`Dispatcher::dispatch`](crate::handler::Dispatcher::dispatch)
///
/// The transport host turns these into a generic 500.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    MediaType(#[from] MimeError),
}

/// Startup failures of the preview server binary
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address `{0}`")]
    Address(String),

    #[error(transparent)]
    Sitemap(#[from] SitemapError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode configuration: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("failed to encode sitemap: {0}")]
    Json(#[from] serde_json::Error),
}
