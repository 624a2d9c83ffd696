//! Request handler module
//!
//! Per-request context, path normalization, the dispatcher, and static file
//! delivery.

pub mod context;
pub mod dispatcher;
pub mod path;
pub mod static_files;

pub use context::{ParsedRequest, RawEnvironment, RequestContext};
pub use dispatcher::{Dispatcher, Flow};
pub use path::{IndexNormalizer, PathNormalizer};
pub use static_files::{FileStreamer, StaticSender};
