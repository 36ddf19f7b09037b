//! Remote blob store abstraction and the Gemini Files API client.
//!
//! The chat flow needs exactly two capabilities from the remote store:
//! fetch a blob by its deterministic name, and create one under that name —
//! with an atomic "name already taken" signal so concurrent creators can be
//! reconciled by the ingestion protocol. Everything else about the store is
//! out of scope and deliberately not modeled.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Reference to a blob held by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobHandle {
    /// The deterministic name the blob was created under.
    pub name: String,
    /// Store-issued URI used to reference the blob in generation calls.
    pub uri: String,
    pub mime_type: String,
}

/// Result of a create attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(BlobHandle),
    /// A concurrent creator won the race for this name. The caller resolves
    /// this by fetching the winner's copy.
    AlreadyExists,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Narrow interface over the remote blob store.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Fetch a blob by name. `None` means the name is unused.
    async fn fetch(&self, name: &str) -> Result<Option<BlobHandle>, StoreError>;

    /// Create a blob under `name`. Name conflicts are reported as
    /// [`CreateOutcome::AlreadyExists`], never as silent overwrites.
    async fn create(
        &self,
        name: &str,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<CreateOutcome, StoreError>;
}

// ============ Gemini Files API ============

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PDF_MIME: &str = "application/pdf";

/// File resource shape returned by the Files API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

impl FileResource {
    fn into_handle(self) -> BlobHandle {
        BlobHandle {
            name: self.name,
            uri: self.uri,
            mime_type: self.mime_type.unwrap_or_else(|| PDF_MIME.to_string()),
        }
    }
}

/// Blob store backed by the Gemini Files API.
///
/// Uploaded files are addressed as `files/{name}`; the API's resumable
/// upload protocol is used so blobs can be created under an explicit,
/// caller-chosen name. A name conflict comes back as HTTP 409 (or an error
/// payload mentioning the name is taken) and maps to
/// [`CreateOutcome::AlreadyExists`].
pub struct GeminiFileStore {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GeminiFileStore {
    pub fn new(api_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl FileStore for GeminiFileStore {
    async fn fetch(&self, name: &str) -> Result<Option<BlobHandle>, StoreError> {
        let url = format!("{}/v1beta/files/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let resource: FileResource = response
            .json()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Some(resource.into_handle()))
    }

    async fn create(
        &self,
        name: &str,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<CreateOutcome, StoreError> {
        // Step 1: open a resumable upload session carrying the metadata.
        let start_url = format!("{}/upload/v1beta/files", self.base_url);
        let metadata = serde_json::json!({
            "file": {
                "name": format!("files/{name}"),
                "displayName": display_name,
            }
        });

        let start = self
            .client
            .post(&start_url)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
            .json(&metadata)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = start.status();
        if !status.is_success() {
            let message = start.text().await.unwrap_or_default();
            if status.as_u16() == 409 || message.contains("already exists") {
                return Ok(CreateOutcome::AlreadyExists);
            }
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let upload_url = start
            .headers()
            .get("X-Goog-Upload-URL")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::Network("upload session did not return an upload URL".to_string())
            })?;

        // Step 2: send the bytes and finalize.
        let upload = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = upload.status();
        if !status.is_success() {
            let message = upload.text().await.unwrap_or_default();
            if status.as_u16() == 409 || message.contains("already exists") {
                return Ok(CreateOutcome::AlreadyExists);
            }
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = upload
            .json()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(CreateOutcome::Created(uploaded.file.into_handle()))
    }
}
