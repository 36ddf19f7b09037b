//! Document ingestion: the get-or-create protocol against the blob store.
//!
//! Guarantees that a single canonical remote copy of a paper exists under
//! its deterministic blob name, tolerating concurrent creators without a
//! distributed lock: fetch first, download-and-create on miss, and when the
//! create loses a race, treat the conflict as success and fetch the
//! winner's copy. Creating a blob is the only side effect, and the blob is
//! valid regardless of whether the originating request completes, so
//! abandoning an in-flight ingestion is always safe.

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::blobstore::{BlobHandle, CreateOutcome, FileStore};
use crate::config::{Config, IngestConfig};
use crate::error::ChatError;
use crate::papers::{PaperRef, PaperSource};

/// Leading bytes every well-formed PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Result of the get-or-create protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The remote copy already existed (or a concurrent creator made it).
    Found(BlobHandle),
    /// This call downloaded the source document and created the copy.
    CreatedNew(BlobHandle),
}

impl IngestOutcome {
    pub fn handle(&self) -> &BlobHandle {
        match self {
            IngestOutcome::Found(handle) | IngestOutcome::CreatedNew(handle) => handle,
        }
    }

    pub fn into_handle(self) -> BlobHandle {
        match self {
            IngestOutcome::Found(handle) | IngestOutcome::CreatedNew(handle) => handle,
        }
    }
}

/// A downloaded source document, before validation.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub status: u16,
    pub bytes: Vec<u8>,
}

/// Plain HTTP GET of a source document.
///
/// Kept as a trait so tests can substitute canned bytes; the production
/// implementation is [`HttpFetcher`].
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, ChatError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &IngestConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, ChatError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ChatError::Network(format!("download failed: {e}")))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::Network(format!("download interrupted: {e}")))?;

        Ok(FetchedDocument {
            status,
            bytes: bytes.to_vec(),
        })
    }
}

/// Validate downloaded bytes: PDF signature and size bound. Failures are
/// upstream-data errors — retrying a malformed source will not fix it.
pub fn validate_pdf(bytes: &[u8], max_pdf_mb: u64) -> Result<(), ChatError> {
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Err(ChatError::UpstreamData(
            "downloaded content is not a valid PDF file".to_string(),
        ));
    }

    let size_mb = bytes.len() as f64 / (1024.0 * 1024.0);
    if size_mb > max_pdf_mb as f64 {
        return Err(ChatError::UpstreamData(format!(
            "PDF too large ({size_mb:.2} MB); maximum is {max_pdf_mb} MB"
        )));
    }

    Ok(())
}

/// Download the paper's PDF and validate it.
pub async fn download_pdf(
    fetcher: &dyn SourceFetcher,
    paper: &PaperRef,
    limits: &IngestConfig,
) -> Result<Vec<u8>, ChatError> {
    let fetched = fetcher.fetch(&paper.pdf_url()).await?;

    if !(200..300).contains(&fetched.status) {
        return Err(ChatError::UpstreamData(format!(
            "failed to download {} PDF: HTTP {}",
            paper.source.display_name(),
            fetched.status
        )));
    }

    validate_pdf(&fetched.bytes, limits.max_pdf_mb)?;
    Ok(fetched.bytes)
}

/// Ensure the paper has exactly one remote copy and return a handle to it.
///
/// 1. Derive the deterministic blob name.
/// 2. Fetch — a hit returns immediately with no download or upload.
/// 3. Miss: download the source PDF and validate it.
/// 4. Create the blob under the derived name.
/// 5. On a name conflict, a concurrent creator won: fetch its copy and
///    return that. Any other create failure is fatal.
pub async fn ensure_remote_copy(
    store: &dyn FileStore,
    fetcher: &dyn SourceFetcher,
    paper: &PaperRef,
    limits: &IngestConfig,
) -> Result<IngestOutcome, ChatError> {
    let name = paper.blob_name();

    if let Some(handle) = store.fetch(&name).await? {
        return Ok(IngestOutcome::Found(handle));
    }

    let bytes = download_pdf(fetcher, paper, limits).await?;

    match store.create(&name, bytes, &paper.display_label()).await? {
        CreateOutcome::Created(handle) => Ok(IngestOutcome::CreatedNew(handle)),
        CreateOutcome::AlreadyExists => match store.fetch(&name).await? {
            Some(handle) => Ok(IngestOutcome::Found(handle)),
            None => Err(ChatError::Store(format!(
                "blob {name} reported as existing but could not be fetched"
            ))),
        },
    }
}

/// CLI entry point for `pch fetch`.
pub async fn run_fetch(
    config: &Config,
    id: &str,
    source: Option<&str>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let source = match source {
        Some(tag) => PaperSource::parse_tag(tag)
            .ok_or_else(|| anyhow::anyhow!("unknown source tag: {tag}"))?,
        None => PaperSource::detect(id)
            .ok_or_else(|| anyhow::anyhow!("could not infer a source for id: {id}"))?,
    };

    let paper = PaperRef::parse(id, source)?;
    let fetcher = HttpFetcher::new(&config.ingest)?;
    let bytes = download_pdf(&fetcher, &paper, &config.ingest).await?;

    let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.pdf", paper.blob_name())));
    std::fs::write(&out, &bytes)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("fetch {}", paper.id);
    println!("  source: {}", paper.source.display_name());
    println!("  url:    {}", paper.pdf_url());
    println!("  bytes:  {}", bytes.len());
    println!("  wrote:  {}", out.display());
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_are_required() {
        assert!(validate_pdf(b"%PDF-1.7 rest of file", 10).is_ok());
        assert!(matches!(
            validate_pdf(b"<html>not a pdf</html>", 10),
            Err(ChatError::UpstreamData(_))
        ));
        assert!(matches!(
            validate_pdf(b"%P", 10),
            Err(ChatError::UpstreamData(_))
        ));
    }

    #[test]
    fn oversized_documents_are_rejected() {
        let mut big = b"%PDF".to_vec();
        big.resize(2 * 1024 * 1024, b'x');
        assert!(matches!(
            validate_pdf(&big, 1),
            Err(ChatError::UpstreamData(_))
        ));
        assert!(validate_pdf(&big, 3).is_ok());
    }
}
