//! Root page and static assets.
//!
//! The web root's contents are whatever the operator deploys next to the
//! gateway; only the index page goes through placeholder substitution.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use axum::http::StatusCode;
use axum::response::Response;

use crate::http::response;
use crate::http::server::AppState;

/// Placeholder values injected into the index template.
///
/// Each `%name%` in the template is replaced with the value its closure
/// produces at request time, so the page always shows live state.
#[derive(Default)]
pub struct TemplateVariables {
    vars: HashMap<String, Box<dyn Fn() -> String + Send + Sync>>,
}

impl TemplateVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a placeholder.
    pub fn set<F>(&mut self, name: impl Into<String>, value: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.vars.insert(name.into(), Box::new(value));
    }

    /// Substitute every registered placeholder in `source`.
    pub fn inject(&self, source: &str) -> String {
        let mut out = source.to_string();
        for (name, value) in &self.vars {
            let needle = format!("%{}%", name);
            if out.contains(&needle) {
                out = out.replace(&needle, &value());
            }
        }
        out
    }
}

/// Serve the index page with placeholders substituted.
pub async fn root(state: &AppState) -> Response {
    let path = Path::new(&state.web_root).join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(template) => response::chunked_ok(state.templates.inject(&template), None),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Could not open index page");
            // The status line was already decided; the peer gets an empty
            // page rather than an error body.
            response::chunked_ok(String::new(), None)
        }
    }
}

/// Serve one static file from the web root.
pub async fn asset(state: &AppState, decoded_path: &str) -> Response {
    let relative = match sanitize(decoded_path) {
        Some(relative) => relative,
        None => {
            tracing::debug!(path = decoded_path, "Asset path escapes the web root");
            return response::empty(StatusCode::NOT_FOUND);
        }
    };

    let full = Path::new(&state.web_root).join(&relative);
    match tokio::fs::read(&full).await {
        Ok(bytes) => {
            let content_type = content_type_for(full.extension().and_then(|e| e.to_str()));
            response::sized_ok(bytes, Some(content_type))
        }
        Err(e) => {
            tracing::error!(path = %full.display(), error = %e, "Could not open asset");
            response::empty(StatusCode::NOT_FOUND)
        }
    }
}

/// Content type served for an asset extension.
pub fn content_type_for(extension: Option<&str>) -> &'static str {
    match extension {
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("png") => "image/png",
        _ => "text/plain",
    }
}

/// Strip the leading slash and refuse parent components.
fn sanitize(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let relative = Path::new(trimmed);
    if relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        Some(relative.to_path_buf())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Some("css")), "text/css");
        assert_eq!(content_type_for(Some("js")), "text/javascript");
        assert_eq!(content_type_for(Some("png")), "image/png");
        assert_eq!(content_type_for(Some("html")), "text/plain");
        assert_eq!(content_type_for(None), "text/plain");
    }

    #[test]
    fn test_inject_replaces_only_known_placeholders() {
        let mut vars = TemplateVariables::new();
        vars.set("HEIGHT", || "42".to_string());

        let page = vars.inject("<b>%HEIGHT%</b> %UNKNOWN%");
        assert_eq!(page, "<b>42</b> %UNKNOWN%");
    }

    #[test]
    fn test_inject_is_live() {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc;

        let height = Arc::new(AtomicU64::new(1));
        let mut vars = TemplateVariables::new();
        let source = height.clone();
        vars.set("HEIGHT", move || source.load(Ordering::Relaxed).to_string());

        assert_eq!(vars.inject("%HEIGHT%"), "1");
        height.store(2, Ordering::Relaxed);
        assert_eq!(vars.inject("%HEIGHT%"), "2");
    }

    #[test]
    fn test_sanitize_refuses_traversal() {
        assert!(sanitize("/css/style.css").is_some());
        assert!(sanitize("/../etc/passwd").is_none());
        assert!(sanitize("/css/../../etc/passwd").is_none());
    }
}
