//! Conditional GET support
//!
//! Content-hash `ETag`s for streamed files and `If-None-Match` evaluation.
//! Preview files change constantly, so validators are always recomputed from
//! the bytes on disk.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Quoted `ETag` for `content`, e.g. `"1f3a9c"`
pub fn etag_for(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.len().hash(&mut hasher);
    content.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// Whether the client's cached copy is still current
///
/// Accepts a single tag, a comma separated list, `*`, and weak (`W/`) tags.
pub fn is_not_modified(if_none_match: Option<&str>, etag: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}
