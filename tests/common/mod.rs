//! Shared test doubles for the external capabilities.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use paper_harness::blobstore::{BlobHandle, CreateOutcome, FileStore, StoreError};
use paper_harness::config::{
    CacheConfig, Config, ExtractionConfig, GenerationConfig, IngestConfig, ServerConfig,
};
use paper_harness::error::ChatError;
use paper_harness::generate::{GenerateError, GenerationBackend, GenerationInput};
use paper_harness::ingest::{FetchedDocument, SourceFetcher};

pub fn test_config(cache_path: PathBuf) -> Config {
    Config {
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        cache: CacheConfig { path: cache_path },
        generation: GenerationConfig::default(),
        ingest: IngestConfig::default(),
        extraction: ExtractionConfig::default(),
    }
}

// ============ Blob store ============

/// In-memory blob store. Creation is atomic: the first create for a name
/// wins, later creates observe `AlreadyExists`.
#[derive(Default)]
pub struct StubStore {
    pub files: Mutex<HashMap<String, BlobHandle>>,
    pub fetch_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
}

impl StubStore {
    pub fn handle_for(name: &str) -> BlobHandle {
        BlobHandle {
            name: format!("files/{name}"),
            uri: format!("stub://{name}"),
            mime_type: "application/pdf".to_string(),
        }
    }

    pub fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl FileStore for StubStore {
    async fn fetch(&self, name: &str) -> Result<Option<BlobHandle>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.lock().unwrap().get(name).cloned())
    }

    async fn create(
        &self,
        name: &str,
        _bytes: Vec<u8>,
        _display_name: &str,
    ) -> Result<CreateOutcome, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut files = self.files.lock().unwrap();
        if files.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let handle = Self::handle_for(name);
        files.insert(name.to_string(), handle.clone());
        Ok(CreateOutcome::Created(handle))
    }
}

// ============ Source fetcher ============

/// Canned HTTP fetcher returning a fixed status and body.
pub struct StubFetcher {
    pub status: u16,
    pub body: Vec<u8>,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn pdf() -> Self {
        Self {
            status: 200,
            body: b"%PDF-1.7 fake paper body".to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedDocument, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedDocument {
            status: self.status,
            bytes: self.body.clone(),
        })
    }
}

// ============ Generation backend ============

/// Backend double that answers schema-constrained calls with conforming
/// JSON (welcome or answer, mirroring the prompt's instruction) and plain
/// calls by echoing a condensed form of the input.
#[derive(Default)]
pub struct StubBackend {
    pub calls: AtomicUsize,
}

#[async_trait]
impl GenerationBackend for StubBackend {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        input: GenerationInput,
        schema: Option<&serde_json::Value>,
    ) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if schema.is_none() {
            // Deterministic per input, distinct across inputs.
            let digest = paper_harness::cache::content_digest(input.text.as_bytes());
            return Ok(format!("condensed guide {}", &digest[..12]));
        }

        if input.text.contains("Set kind to \"welcome\"") {
            Ok(r#"{
                "mainText": "Welcome! This paper proposes a new attention mechanism.",
                "followUps": [
                    {"text": "What problem does it solve?"},
                    {"text": "How was it evaluated?", "description": "Benchmarks"}
                ],
                "kind": "welcome"
            }"#
            .to_string())
        } else {
            Ok(r#"{
                "mainText": "The method is described in the architecture section (page 3).",
                "followUps": [{"text": "What about the results (page 7)?"}],
                "kind": "answer"
            }"#
            .to_string())
        }
    }
}

/// Backend double that violates the response contract.
pub struct NonConformingBackend;

#[async_trait]
impl GenerationBackend for NonConformingBackend {
    fn model_name(&self) -> &str {
        "broken"
    }

    async fn generate(
        &self,
        _input: GenerationInput,
        _schema: Option<&serde_json::Value>,
    ) -> Result<String, GenerateError> {
        Ok("I'm sorry, I can only answer in prose today.".to_string())
    }
}
