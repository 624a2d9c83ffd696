//! HTTP protocol layer module
//!
//! Media types, content-type negotiation, conditional and range requests,
//! and response building. Nothing here knows about the sitemap.

pub mod cache;
pub mod content_type;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use content_type::{set_content_type, ContentTypeOptions};
pub use mime::{MimeError, MimeRegistry};
pub use response::{FinalizedResponse, ResponseState};
