//! Chat turn orchestration.
//!
//! One [`ChatService`] instance is shared by the HTTP handlers. It owns the
//! external capabilities (blob store, generation backend, source fetcher,
//! extraction cache) and carries no per-conversation state — everything a
//! turn needs arrives in the request's transcript.

use std::sync::Arc;

use crate::blobstore::FileStore;
use crate::cache::{CacheStats, ExtractCache};
use crate::config::Config;
use crate::contract;
use crate::error::ChatError;
use crate::extract;
use crate::generate::{GenerationBackend, GenerationInput};
use crate::ingest::{self, SourceFetcher};
use crate::models::{ChatRequest, ChatResponse};
use crate::papers::{PaperRef, PaperSource};
use crate::session::{self, TurnPhase};

/// Result of condensing an uploaded schema document.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOutcome {
    pub guide_length: usize,
    pub stats: CacheStats,
}

pub struct ChatService {
    config: Config,
    cache: Arc<ExtractCache>,
    store: Arc<dyn FileStore>,
    backend: Arc<dyn GenerationBackend>,
    fetcher: Arc<dyn SourceFetcher>,
}

impl ChatService {
    pub fn new(
        config: Config,
        cache: Arc<ExtractCache>,
        store: Arc<dyn FileStore>,
        backend: Arc<dyn GenerationBackend>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self {
            config,
            cache,
            store,
            backend,
            fetcher,
        }
    }

    pub fn cache(&self) -> &ExtractCache {
        &self.cache
    }

    fn parse_paper(&self, document_id: &str, source_tag: &str) -> Result<PaperRef, ChatError> {
        let source = PaperSource::parse_tag(source_tag).ok_or_else(|| {
            ChatError::InvalidRequest(format!(
                "unknown source tag: '{source_tag}' (expected arxiv, medrxiv, or biorxiv)"
            ))
        })?;
        PaperRef::parse(document_id, source)
    }

    /// Run one conversation turn.
    ///
    /// The transcript decides the shape of the generation call: on the
    /// first turn the paper is ingested (deduplicated remotely by blob
    /// name) and attached; on follow-ups only the rendered history is sent
    /// and the backend relies on its own retained context for the file.
    pub async fn handle_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let current = session::validate_transcript(&request.transcript)?;
        let paper = self.parse_paper(&request.document_id, &request.source_tag)?;

        let (blob, prompt) = match session::classify_phase(&request.transcript) {
            TurnPhase::FirstTurn => {
                let outcome = ingest::ensure_remote_copy(
                    self.store.as_ref(),
                    self.fetcher.as_ref(),
                    &paper,
                    &self.config.ingest,
                )
                .await?;
                tracing::debug!(
                    blob = %outcome.handle().name,
                    created = matches!(outcome, ingest::IngestOutcome::CreatedNew(_)),
                    "paper ingested"
                );

                let intent = session::classify_intent(&current.content);
                let prompt = session::first_turn_prompt(&paper, intent, &current.content);
                (Some(outcome.into_handle()), prompt)
            }
            TurnPhase::FollowUp => {
                let prompt =
                    session::follow_up_prompt(&paper, &request.transcript, &current.content);
                (None, prompt)
            }
        };

        let schema = contract::response_schema();
        let raw = self
            .backend
            .generate(GenerationInput { blob, text: prompt }, Some(&schema))
            .await?;

        let mut reply = contract::parse_reply(&raw)?;
        contract::link_reply_refs(&mut reply);

        Ok(ChatResponse {
            main_text: reply.main_text.clone(),
            structured: reply,
        })
    }

    /// Validate, download, and check a paper's PDF for the proxy endpoint.
    pub async fn proxy_pdf(
        &self,
        document_id: &str,
        source_tag: &str,
    ) -> Result<(PaperRef, Vec<u8>), ChatError> {
        let paper = self.parse_paper(document_id, source_tag)?;
        let bytes =
            ingest::download_pdf(self.fetcher.as_ref(), &paper, &self.config.ingest).await?;
        Ok((paper, bytes))
    }

    /// Condense an uploaded schema document, using the cache.
    pub async fn condense_upload(
        &self,
        label: &str,
        content: &str,
    ) -> Result<ExtractOutcome, ChatError> {
        let lowered = label.to_lowercase();
        if !(lowered.ends_with(".yaml") || lowered.ends_with(".yml") || lowered.ends_with(".json"))
        {
            return Err(ChatError::InvalidRequest(
                "only YAML and JSON documents are accepted".to_string(),
            ));
        }

        let max_bytes = self.config.extraction.max_upload_mb * 1024 * 1024;
        if content.len() as u64 > max_bytes {
            return Err(ChatError::InvalidRequest(format!(
                "document exceeds the {} MB upload limit",
                self.config.extraction.max_upload_mb
            )));
        }

        let guide = extract::condense_reference(
            &self.cache,
            self.backend.as_ref(),
            content.as_bytes(),
            label,
            &self.config.extraction,
        )
        .await?;

        let stats = self
            .cache
            .stats()
            .await
            .map_err(|e| ChatError::Internal(format!("cache stats unavailable: {e}")))?;

        Ok(ExtractOutcome {
            guide_length: guide.len(),
            stats,
        })
    }
}
