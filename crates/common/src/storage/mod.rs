//! Object storage for uploaded files
//!
//! Documents keep only a URL to their original bytes. Two backends:
//! - `HttpBlobStore`: PUT/GET/DELETE against a blob service with a bearer token
//! - `LocalBlobStore`: files under a root directory, addressed by `file://` URLs

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use uuid::Uuid;

/// Storage for original document bytes
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a relative path and return their URL
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Fetch bytes previously stored at a URL
    async fn get(&self, url: &str) -> Result<Vec<u8>>;

    /// Remove the blob at a URL; missing blobs are not an error
    async fn delete(&self, url: &str) -> Result<()>;
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9.\-]").expect("static regex"));
    re.replace_all(name, "_").into_owned()
}

/// Storage path for an upload: `<workspace>/<unix millis>-<sanitized name>`
pub fn upload_path(workspace_id: Uuid, filename: &str, timestamp_millis: i64) -> String {
    format!(
        "{}/{}-{}",
        workspace_id,
        timestamp_millis,
        sanitize_filename(filename)
    )
}

fn storage_error(message: impl Into<String>) -> AppError {
    AppError::Storage {
        message: message.into(),
    }
}

// ============================================================================
// HTTP blob service
// ============================================================================

pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(base_url: String, token: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let response = self
            .authorize(self.client.put(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| storage_error(format!("Upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(storage_error(format!("Upload rejected with {}", response.status())));
        }

        Ok(url)
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| storage_error(format!("Download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(storage_error(format!("Download rejected with {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| storage_error(format!("Download interrupted: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(|e| storage_error(format!("Delete failed: {}", e)))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(storage_error(format!("Delete rejected with {}", status)))
        }
    }
}

// ============================================================================
// Local filesystem
// ============================================================================

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create the root directory if needed
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let root = std::fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    /// Map a `file://` URL back to a path inside the root
    fn resolve(&self, url: &str) -> Result<PathBuf> {
        let path = url
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| storage_error(format!("Not a local blob URL: {}", url)))?;

        let escapes = path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes || !path.starts_with(&self.root) {
            return Err(storage_error(format!("Blob URL outside storage root: {}", url)));
        }

        Ok(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let target = self.root.join(path.trim_start_matches('/'));
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        Ok(format!("file://{}", target.display()))
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve(url)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| storage_error(format!("Failed to read {}: {}", path.display(), e)))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let path = self.resolve(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Create a blob store based on configuration
pub fn create_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match config.provider.as_str() {
        "http" => {
            let base_url = config.base_url.clone().ok_or_else(|| AppError::Configuration {
                message: "storage.base_url is required for the http provider".into(),
            })?;
            Ok(Arc::new(HttpBlobStore::new(
                base_url,
                config.token.clone(),
                config.timeout_secs,
            )?))
        }
        "local" => Ok(Arc::new(LocalBlobStore::new(&config.local_root)?)),
        other => Err(AppError::Configuration {
            message: format!("Unknown storage provider: {}", other),
        }),
    }
}
