//! Static file mount

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};

/// Serves files below a document root
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the document root.
    ///
    /// `None` for any path with a `..` segment.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path.trim_start_matches('/');
        let mut resolved = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        if relative.is_empty() || request_path.ends_with('/') {
            resolved.push("index.html");
        }
        Some(resolved)
    }

    /// File contents and MIME type, or `None` when nothing is served.
    pub async fn load(&self, request_path: &str) -> Option<(Bytes, &'static str)> {
        let path = self.resolve(request_path)?;
        match tokio::fs::read(&path).await {
            Ok(contents) => {
                debug!("Serving static file {}", path.display());
                Some((Bytes::from(contents), mime_for_path(&path)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read static file {}: {}", path.display(), e);
                None
            }
        }
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let files = StaticFiles::new("/srv/www");
        assert_eq!(files.resolve("/"), Some(PathBuf::from("/srv/www/index.html")));
        assert_eq!(
            files.resolve("/css/site.css"),
            Some(PathBuf::from("/srv/www/css/site.css"))
        );
        assert_eq!(
            files.resolve("/docs/"),
            Some(PathBuf::from("/srv/www/docs/index.html"))
        );
        assert_eq!(files.resolve("/../etc/passwd"), None);
        assert_eq!(files.resolve("/a/../../b"), None);
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.HTML")), "text/html; charset=utf-8");
        assert_eq!(mime_for_path(Path::new("x.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        let files = StaticFiles::new(dir.path());

        let (body, mime) = files.load("/").await.unwrap();
        assert_eq!(&body[..], b"<h1>hi</h1>");
        assert_eq!(mime, "text/html; charset=utf-8");
        assert!(files.load("/missing.txt").await.is_none());
    }
}
