//! Content-Type negotiation
//!
//! Resolves a media type or extension through the [`MimeRegistry`] and
//! composes the final `Content-Type` header value, charset included.

use super::mime::{MimeError, MimeRegistry};
use super::response::ResponseState;

/// Charset appended when the caller does not name one
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Options accepted by [`set_content_type`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypeOptions {
    /// Type used when the registry has no answer
    pub default: Option<String>,
    /// Explicit charset; `None` means utf-8
    pub charset: Option<String>,
    /// Extra `key=value` parameters, emitted in order before the charset
    pub params: Vec<(String, String)>,
}

impl ContentTypeOptions {
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

/// Compose a full `Content-Type` value for `type_or_ext`
///
/// # Examples
/// ```
/// use site_preview::http::content_type::{compose_content_type, ContentTypeOptions};
/// use site_preview::http::mime::MimeRegistry;
///
/// let registry = MimeRegistry::with_defaults();
/// let value = compose_content_type(&registry, "text/plain", &ContentTypeOptions::default());
/// assert_eq!(value.unwrap(), "text/plain;charset=utf-8");
/// ```
pub fn compose_content_type(
    registry: &MimeRegistry,
    type_or_ext: &str,
    options: &ContentTypeOptions,
) -> Result<String, MimeError> {
    let mut mime_type = registry
        .lookup(Some(type_or_ext))
        .or_else(|| options.default.clone())
        .ok_or_else(|| MimeError::UnknownMediaType(type_or_ext.to_string()))?;

    let mut params = options.params.clone();

    // An embedded charset wins over both the caller's and the default one
    if !mime_type.contains("charset") {
        let charset = options
            .charset
            .clone()
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
        params.push(("charset".to_string(), charset));
    }

    if !params.is_empty() {
        mime_type.push_str(if mime_type.contains(';') { ", " } else { ";" });
        let joined = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        mime_type.push_str(&joined);
    }

    Ok(mime_type)
}

/// Set (or read) the response's content type
///
/// With `None` this only returns the current header. Otherwise the composed
/// value is written to the response and returned.
pub fn set_content_type(
    response: &mut ResponseState,
    registry: &MimeRegistry,
    type_or_ext: Option<&str>,
    options: &ContentTypeOptions,
) -> Result<Option<String>, MimeError> {
    let Some(type_or_ext) = type_or_ext else {
        return Ok(response.content_type().map(ToString::to_string));
    };

    let value = compose_content_type(registry, type_or_ext, options)?;
    response.set_content_type(&value)?;
    Ok(Some(value))
}
