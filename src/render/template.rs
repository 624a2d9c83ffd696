//! Preview template engine
//!
//! Deliberately small. Supported tags:
//! - `{{ current_path }}` - normalized path of the page being served
//! - `{{ params.NAME }}` - query parameter, HTML-escaped, empty when absent
//! - `{{> NAME }}` - include a partial from the partials directory

use super::{RenderError, Renderer};
use crate::handler::RequestContext;
use crate::sitemap::Resource;
use std::fs;
use std::path::{Path, PathBuf};

/// Partials may include partials, up to this depth
const MAX_INCLUDE_DEPTH: usize = 8;

/// Renders `.tmpl` sources with partial includes
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    partials_dir: PathBuf,
}

impl TemplateRenderer {
    pub fn new(partials_dir: impl Into<PathBuf>) -> Self {
        Self {
            partials_dir: partials_dir.into(),
        }
    }

    fn render_file(
        &self,
        path: &Path,
        ctx: &RequestContext,
        depth: usize,
    ) -> Result<String, RenderError> {
        let source = fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.expand(&source, path, ctx, depth)
    }

    fn expand(
        &self,
        source: &str,
        origin: &Path,
        ctx: &RequestContext,
        depth: usize,
    ) -> Result<String, RenderError> {
        let mut out = String::with_capacity(source.len());
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                return Err(syntax(origin, "unterminated `{{` tag"));
            };
            let tag = after_open[..close].trim();
            out.push_str(&self.expand_tag(tag, origin, ctx, depth)?);
            rest = &after_open[close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn expand_tag(
        &self,
        tag: &str,
        origin: &Path,
        ctx: &RequestContext,
        depth: usize,
    ) -> Result<String, RenderError> {
        if let Some(name) = tag.strip_prefix('>') {
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(syntax(origin, "partials nested too deeply"));
            }
            let partial = self.locate_partial(name.trim())?;
            return self.render_file(&partial, ctx, depth + 1);
        }

        if tag == "current_path" {
            return Ok(ctx.current_path().unwrap_or_default().to_string());
        }

        if let Some(name) = tag.strip_prefix("params.") {
            let value = ctx.request().param(name.trim()).unwrap_or_default();
            return Ok(escape_html(value));
        }

        Err(syntax(origin, &format!("unknown tag `{tag}`")))
    }

    fn locate_partial(&self, name: &str) -> Result<PathBuf, RenderError> {
        if name.is_empty() || name.contains("..") {
            return Err(RenderError::TemplateNotFound(format!(
                "Could not locate partial: {name:?}"
            )));
        }
        [
            name.to_string(),
            format!("{name}.html"),
            format!("{name}.html.tmpl"),
        ]
        .iter()
        .map(|candidate| self.partials_dir.join(candidate))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            RenderError::TemplateNotFound(format!("Could not locate partial: {name}"))
        })
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, resource: &Resource, ctx: &RequestContext) -> Result<Vec<u8>, RenderError> {
        self.render_file(&resource.source_file, ctx, 0)
            .map(String::into_bytes)
    }
}

fn syntax(origin: &Path, message: &str) -> RenderError {
    RenderError::Syntax {
        path: origin.to_path_buf(),
        message: message.to_string(),
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
