//! In-memory sitemap built from the source directory
//!
//! Scanned once at startup. Files ending in the template suffix become
//! templated resources served without the suffix; anything under a path
//! component starting with `_` (partials, drafts) is registered as ignored.

use super::{normalize_destination, Resource, Sitemap};
use crate::http::mime::MimeRegistry;
use crate::logger;
use std::collections::HashMap;
use jwalk::WalkDir;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("source directory `{0}` does not exist")]
    MissingSource(PathBuf),

    #[error("failed to read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Scan settings, taken from the `[site]` section
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Suffix marking a template, e.g. `.tmpl` in `index.html.tmpl`
    pub template_suffix: String,
    /// Destination paths, or directories, whose resources are ignored
    pub ignore: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            template_suffix: ".tmpl".to_string(),
            ignore: Vec::new(),
        }
    }
}

/// Sitemap over a fixed set of resources
#[derive(Debug, Default)]
pub struct SourceSitemap {
    resources: HashMap<String, Arc<Resource>>,
}

impl SourceSitemap {
    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let resources = resources
            .into_iter()
            .map(|r| (r.destination_path.clone(), Arc::new(r)))
            .collect();
        Self { resources }
    }

    /// Walk `source_dir` and register every file found
    pub fn scan(
        source_dir: &Path,
        registry: &MimeRegistry,
        options: &ScanOptions,
    ) -> Result<Self, SitemapError> {
        if !source_dir.is_dir() {
            return Err(SitemapError::MissingSource(source_dir.to_path_buf()));
        }

        let files = collect_files(source_dir)?;

        let mut resources = Vec::with_capacity(files.len());
        for file in files {
            let Ok(relative) = file.strip_prefix(source_dir) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let (destination, is_template) =
                match relative.strip_suffix(options.template_suffix.as_str()) {
                    Some(stripped) if !stripped.is_empty() => (stripped.to_string(), true),
                    _ => (relative.clone(), false),
                };

            let mut resource = if is_template {
                Resource::template(&destination, file)
            } else {
                Resource::static_file(&destination, file)
            };
            resource.mime_type = registry.lookup(resource.destination_extension().as_deref());
            if is_underscored(&destination) || matches_ignore(&destination, &options.ignore) {
                resource.ignored = true;
            }
            resources.push(resource);
        }

        let sitemap = Self::from_resources(resources);
        logger::log_debug(&format!(
            "Sitemap scanned {} resources from {}",
            sitemap.len(),
            source_dir.display()
        ));
        Ok(sitemap)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources ordered by destination path
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        let mut list: Vec<_> = self.resources.values().cloned().collect();
        list.sort_by(|a, b| a.destination_path.cmp(&b.destination_path));
        list
    }

    /// Pretty JSON listing of every resource
    pub fn dump_json(&self) -> serde_json::Result<String> {
        let resources = self.resources();
        let list: Vec<&Resource> = resources.iter().map(|r| &**r).collect();
        serde_json::to_string_pretty(&list)
    }
}

impl Sitemap for SourceSitemap {
    fn find_resource_by_destination_path(&self, path: &str) -> Option<Arc<Resource>> {
        self.resources.get(&normalize_destination(path)).cloned()
    }
}

/// Every regular file under `dir`, in path order
///
/// Hidden entries (dotfiles and dot-directories) are skipped by the walker.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, SitemapError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).skip_hidden(true).sort(true) {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if entry.file_type().is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

fn walk_error(root: &Path, error: jwalk::Error) -> SitemapError {
    let path = error.path().unwrap_or(root).to_path_buf();
    let message = error.to_string();
    let source = error
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    SitemapError::Io { path, source }
}

fn is_underscored(destination: &str) -> bool {
    destination.split('/').any(|segment| segment.starts_with('_'))
}

fn matches_ignore(destination: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        let pattern = normalize_destination(pattern);
        let dir = pattern.trim_end_matches('/');
        destination == dir
            || destination
                .strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}
