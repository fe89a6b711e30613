//! Local asset directory served through the `HttpClient` bridge.
//!
//! Desktop builds ship the `audio/` directory next to the binary. Mapping it
//! behind `HttpClient` lets the engine keep a single fetch path: a missing
//! file answers 404 and the loader moves on to the next candidate.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest, HttpResponse},
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Serves root-relative asset URIs from a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalAssetClient {
    root: PathBuf,
}

impl LocalAssetClient {
    /// `root` plays the role of the site root: `/audio/boot.mp3` maps to
    /// `<root>/audio/boot.mp3`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a URI to a path under the root. `None` for anything that would
    /// escape it.
    fn resolve(&self, uri: &str) -> Option<PathBuf> {
        let path = uri
            .strip_prefix("file://")
            .unwrap_or(uri)
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }
}

/// MIME type for the audio containers the engine asks for.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("m4a") | Some("aac") => "audio/aac",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl HttpClient for LocalAssetClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let Some(path) = self.resolve(&request.url) else {
            return Ok(HttpResponse::new(403, Bytes::new()));
        };

        let content_type = content_type_for(&path);

        let body = match fs::read(&path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?path, "Asset not found");
                return Ok(HttpResponse::new(404, Bytes::new()));
            }
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, bytes = body.len(), "Asset read");
        Ok(HttpResponse::new(200, body).with_header("Content-Type", content_type))
    }
}
