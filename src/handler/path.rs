//! Request path decoding and normalization

use percent_encoding::percent_decode_str;

/// Percent-decode a raw request path as UTF-8
///
/// Invalid sequences become U+FFFD rather than failing the request.
pub fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Maps a decoded path onto the form the sitemap is keyed by
pub trait PathNormalizer: Send + Sync {
    fn normalize(&self, decoded: &str) -> String;
}

/// Appends the index document to directory-like paths
///
/// A path is directory-like when it is empty, ends in `/`, or its final
/// segment has no extension.
#[derive(Debug, Clone)]
pub struct IndexNormalizer {
    index_file: String,
}

impl IndexNormalizer {
    pub fn new(index_file: impl Into<String>) -> Self {
        Self {
            index_file: index_file.into(),
        }
    }
}

impl Default for IndexNormalizer {
    fn default() -> Self {
        Self::new("index.html")
    }
}

impl PathNormalizer for IndexNormalizer {
    fn normalize(&self, decoded: &str) -> String {
        let segments: Vec<&str> = decoded.split('/').filter(|s| !s.is_empty()).collect();
        let mut path = format!("/{}", segments.join("/"));

        let directory_like = decoded.ends_with('/')
            || segments.last().is_none_or(|last| !last.contains('.'));
        if directory_like {
            if !path.ends_with('/') {
                path.push('/');
            }
            path.push_str(&self.index_file);
        }
        path
    }
}
