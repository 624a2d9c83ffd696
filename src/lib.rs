//! Development preview server for static sites
//!
//! Each request is mapped onto the site's sitemap: static resources are
//! streamed from disk, templates are rendered fresh. See
//! [`handler::Dispatcher`] for the entry point.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod http;
pub mod logger;
pub mod render;
pub mod server;
pub mod sitemap;
