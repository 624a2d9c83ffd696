//! Sitemap module
//!
//! The dispatcher only needs to ask "which resource serves this destination
//! path?". [`Sitemap`] is that question; [`SourceSitemap`] answers it from a
//! one-off scan of the site's source directory.

mod scan;

pub use scan::{ScanOptions, SitemapError, SourceSitemap};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A logical site entry
///
/// Either static (streamed from `source_file` as-is) or a template (rendered
/// on every request). Never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// URL path it serves, without the leading `/`
    pub destination_path: String,
    pub source_file: PathBuf,
    pub is_template: bool,
    /// Declared content type, if known
    pub mime_type: Option<String>,
    /// Ignored resources answer 404 like missing ones
    pub ignored: bool,
}

impl Resource {
    pub fn static_file(destination_path: &str, source_file: impl Into<PathBuf>) -> Self {
        Self {
            destination_path: normalize_destination(destination_path),
            source_file: source_file.into(),
            is_template: false,
            mime_type: None,
            ignored: false,
        }
    }

    pub fn template(destination_path: &str, source_file: impl Into<PathBuf>) -> Self {
        Self {
            is_template: true,
            ..Self::static_file(destination_path, source_file)
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub const fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub const fn is_static(&self) -> bool {
        !self.is_template
    }

    /// Extension of the destination path, with its leading `.`
    pub fn destination_extension(&self) -> Option<String> {
        extension_of(Path::new(&self.destination_path))
    }
}

/// Lookup from destination path to resource
pub trait Sitemap: Send + Sync {
    /// Leading `/` on `path` is not significant
    fn find_resource_by_destination_path(&self, path: &str) -> Option<Arc<Resource>>;
}

/// Canonical key form of a destination path
pub fn normalize_destination(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// File extension with its leading `.`, the way `File.extname` reports it
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}
