//! MIME type registry
//!
//! Maps file extensions (with their leading `.`) to Content-Type strings.
//! One registry is created at startup and shared by every request; entries
//! can be added or overwritten but never removed.

use dashmap::DashMap;
use thiserror::Error;

/// Fallback type for files whose extension is not registered
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Type used for every HTML-like page served by the preview server
pub const HTML_UTF8: &str = "text/html;charset=utf8";

/// Errors raised while resolving a media type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MimeError {
    #[error("Unknown media type: {0:?}")]
    UnknownMediaType(String),

    #[error("Media type {0:?} is not a valid header value")]
    InvalidHeaderValue(String),
}

/// Baseline extension table, applied before the preview overrides
const BASELINE: &[(&str, &str)] = &[
    // Text
    (".html", "text/html"),
    (".htm", "text/html"),
    (".css", "text/css"),
    (".txt", "text/plain"),
    (".md", "text/markdown"),
    (".csv", "text/csv"),
    (".xml", "application/xml"),
    (".rss", "application/rss+xml"),
    (".atom", "application/atom+xml"),
    // JavaScript/WASM
    (".js", "application/javascript"),
    (".mjs", "application/javascript"),
    (".json", "application/json"),
    (".map", "application/json"),
    (".wasm", "application/wasm"),
    // Images
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".svg", "image/svg+xml"),
    (".svgz", "image/svg+xml"),
    (".ico", "image/vnd.microsoft.icon"),
    (".webp", "image/webp"),
    (".avif", "image/avif"),
    // Video
    (".mp4", "video/mp4"),
    (".webm", "video/webm"),
    (".ogv", "video/ogg"),
    (".mov", "video/quicktime"),
    // Audio
    (".mp3", "audio/mpeg"),
    (".wav", "audio/wav"),
    (".ogg", "audio/ogg"),
    (".flac", "audio/flac"),
    // Fonts
    (".woff", "font/woff"),
    (".woff2", "font/woff2"),
    (".ttf", "font/ttf"),
    (".otf", "font/otf"),
    (".eot", "application/vnd.ms-fontobject"),
    // Documents
    (".pdf", "application/pdf"),
    (".zip", "application/zip"),
    (".gz", "application/gzip"),
    (".tar", "application/x-tar"),
];

/// Classification of a registry key
///
/// A string containing `/` is taken to be a full media type already; anything
/// else is an extension and gets a leading `.` if it lacks one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeKey<'a> {
    Qualified(&'a str),
    Extension(String),
}

impl<'a> MimeKey<'a> {
    pub fn classify(input: &'a str) -> Self {
        if input.contains('/') {
            return Self::Qualified(input);
        }
        let lower = input.to_ascii_lowercase();
        if lower.starts_with('.') {
            Self::Extension(lower)
        } else {
            Self::Extension(format!(".{lower}"))
        }
    }
}

/// Process-wide extension → media type table
#[derive(Debug, Default)]
pub struct MimeRegistry {
    types: DashMap<String, String>,
}

impl MimeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the baseline table and the preview overrides
    ///
    /// # Examples
    /// ```
    /// use site_preview::http::mime::MimeRegistry;
    /// let registry = MimeRegistry::with_defaults();
    /// assert_eq!(registry.lookup(Some("html")).as_deref(), Some("text/html;charset=utf8"));
    /// assert_eq!(registry.lookup(Some(".htc")).as_deref(), Some("text/x-component"));
    /// ```
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for (ext, value) in BASELINE {
            registry.register(ext, Some(*value));
        }
        // CSS3 PIE behaviour files
        registry.register(".htc", Some("text/x-component"));
        // Serve all HTML as UTF-8
        registry.register(".html", Some(HTML_UTF8));
        registry.register(".htm", Some(HTML_UTF8));
        registry
    }

    /// Resolve an extension or media type
    ///
    /// Qualified types come back unchanged, extensions are looked up with or
    /// without their leading `.`.
    pub fn lookup(&self, ext_or_type: Option<&str>) -> Option<String> {
        match MimeKey::classify(ext_or_type?) {
            MimeKey::Qualified(value) => Some(value.to_string()),
            MimeKey::Extension(ext) => self.types.get(&ext).map(|v| v.value().clone()),
        }
    }

    /// Register `value` for an extension, overwriting any earlier mapping
    ///
    /// Without a value this is a lookup. A qualified type as key is returned
    /// as-is and nothing is stored.
    pub fn register(&self, ext_or_type: &str, value: Option<&str>) -> Option<String> {
        let Some(value) = value else {
            return self.lookup(Some(ext_or_type));
        };
        match MimeKey::classify(ext_or_type) {
            MimeKey::Qualified(qualified) => Some(qualified.to_string()),
            MimeKey::Extension(ext) => {
                self.types.insert(ext, value.to_string());
                Some(value.to_string())
            }
        }
    }

    /// Register every `(extension, type)` pair, in iteration order
    pub fn register_all<'a, I>(&self, entries: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (ext, value) in entries {
            self.register(ext, Some(value.as_str()));
        }
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
