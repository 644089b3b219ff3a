//! Dashboard page and image assets.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use hashwatch_core::MonitorConfig;
use log::warn;

use crate::error::ApiError;
use crate::{AppContext, no_cache};

const REFRESH_PLACEHOLDER: &str = "__REFRESH_INTERVAL__";
const HOST_PLACEHOLDER: &str = "__BITAXE_IP__";

/// Served when no template file can be found.
pub const FALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>hashwatch</title></head>
<body><h1>hashwatch</h1>
<div>Refresh interval: __REFRESH_INTERVAL__ seconds</div>
<div>BitAxe: __BITAXE_IP__</div>
<pre id="bitaxe"></pre><pre id="avalon"></pre>
<script>
const refreshInterval = __REFRESH_INTERVAL__ * 1000;
const bitaxeIp = '__BITAXE_IP__';
function show(id, url) {
  fetch(url).then(r => r.json()).then(d => {
    document.getElementById(id).textContent = JSON.stringify(d, null, 2);
  });
}
function refresh() { show('bitaxe', '/api/stats'); show('avalon', '/api/avalon/stats'); }
refresh();
setInterval(refresh, refreshInterval);
</script></body></html>
"#;

/// Template locations in lookup order: the configured path, `index.html`
/// next to the executable, `index.html` in the working directory.
pub fn template_candidates(config: &MonitorConfig) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = &config.template {
        candidates.push(path.clone());
    }
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join("index.html"));
    }
    candidates.push(PathBuf::from("index.html"));
    candidates
}

/// First readable template, or [`FALLBACK_PAGE`] if none exists.
pub async fn load_template(config: &MonitorConfig) -> Result<String, ApiError> {
    for path in template_candidates(config) {
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => return Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(source) => return Err(ApiError::Template { path, source }),
        }
    }
    warn!("no dashboard template found, serving the embedded page");
    Ok(FALLBACK_PAGE.to_string())
}

/// Substitute the page placeholders.
pub fn render(template: &str, config: &MonitorConfig) -> String {
    template
        .replace(
            REFRESH_PLACEHOLDER,
            &config.refresh_interval.as_secs().to_string(),
        )
        .replace(HOST_PLACEHOLDER, &config.bitaxe_host.replace('\'', "\\'"))
}

pub(crate) async fn handle_index(State(ctx): State<Arc<AppContext>>) -> Result<Response, ApiError> {
    let template = load_template(ctx.config()).await?;
    let page = render(&template, ctx.config());
    Ok(no_cache(Html(page).into_response()))
}

/// MIME type by extension; unknown extensions are served as JPEG.
pub fn image_content_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// The requested path relative to `images/`, or `None` unless every
/// component is a plain file or directory name.
pub fn asset_path(requested: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(name) => relative.push(name),
            _ => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

pub(crate) async fn handle_image(
    State(ctx): State<Arc<AppContext>>,
    UrlPath(path): UrlPath<String>,
) -> Result<Response, ApiError> {
    let Some(relative) = asset_path(&path) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let full = ctx.config().assets_dir.join("images").join(relative);
    match tokio::fs::read(&full).await {
        Ok(bytes) => {
            let headers = [(header::CONTENT_TYPE, image_content_type(&path))];
            Ok((headers, bytes).into_response())
        }
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            Ok(StatusCode::NOT_FOUND.into_response())
        }
        Err(source) => Err(ApiError::Asset { path: full, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn placeholders_are_substituted() {
        let config = MonitorConfig {
            bitaxe_host: "o'brien.local".into(),
            refresh_interval: Duration::from_secs(7),
            ..Default::default()
        };
        let page = render(FALLBACK_PAGE, &config);
        assert!(page.contains("const refreshInterval = 7 * 1000;"));
        assert!(page.contains(r"const bitaxeIp = 'o\'brien.local';"));
        assert!(!page.contains(REFRESH_PLACEHOLDER));
    }

    #[test]
    fn configured_template_is_tried_first() {
        let config = MonitorConfig {
            template: Some(PathBuf::from("/srv/dash.html")),
            ..Default::default()
        };
        let candidates = template_candidates(&config);
        assert_eq!(candidates[0], PathBuf::from("/srv/dash.html"));
        assert_eq!(candidates.last(), Some(&PathBuf::from("index.html")));
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(image_content_type("a.PNG"), "image/png");
        assert_eq!(image_content_type("b.gif"), "image/gif");
        assert_eq!(image_content_type("c.jpeg"), "image/jpeg");
        assert_eq!(image_content_type("no_extension"), "image/jpeg");
    }

    #[test]
    fn asset_paths_stay_under_images() {
        assert_eq!(asset_path("logo.png"), Some(PathBuf::from("logo.png")));
        assert_eq!(
            asset_path("miners/nano.jpg"),
            Some(PathBuf::from("miners/nano.jpg"))
        );
        assert_eq!(asset_path("/etc/passwd"), None);
        assert_eq!(asset_path("../secret.txt"), None);
        assert_eq!(asset_path("a/../../b.png"), None);
        assert_eq!(asset_path("./logo.png"), None);
        assert_eq!(asset_path(""), None);
    }
}
