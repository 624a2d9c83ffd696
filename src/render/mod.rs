//! Rendering module
//!
//! Turns a templated [`Resource`] into response bytes. The dispatcher only
//! distinguishes [`RenderError::TemplateNotFound`] (answered with a 500
//! page) from everything else (fatal to the request).

mod template;

pub use template::TemplateRenderer;

use crate::handler::RequestContext;
use crate::sitemap::Resource;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A template the page depends on does not exist
    #[error("{0}")]
    TemplateNotFound(String),

    #[error("failed to read template `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template error in `{path}`: {message}")]
    Syntax { path: PathBuf, message: String },

    /// The render task panicked or was cancelled
    #[error("render task failed: {0}")]
    Interrupted(String),
}

impl RenderError {
    /// Only a missing template is turned into a response locally
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::TemplateNotFound(_))
    }
}

/// Produces the body of a templated resource
///
/// Implementations may block; the dispatcher runs them on tokio's blocking
/// pool.
pub trait Renderer: Send + Sync {
    fn render(&self, resource: &Resource, ctx: &RequestContext) -> Result<Vec<u8>, RenderError>;
}
