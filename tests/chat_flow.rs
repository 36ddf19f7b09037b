//! End-to-end chat scenarios against stubbed external capabilities.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use paper_harness::cache::ExtractCache;
use paper_harness::chat::ChatService;
use paper_harness::error::ChatError;
use paper_harness::models::{ChatRequest, ChatTurn, ReplyKind};

use common::{test_config, NonConformingBackend, StubBackend, StubFetcher, StubStore};

async fn service_with(
    store: Arc<StubStore>,
    backend: Arc<dyn paper_harness::generate::GenerationBackend>,
    fetcher: Arc<StubFetcher>,
    dir: &tempfile::TempDir,
) -> ChatService {
    let cache_path = dir.path().join("cache.sqlite");
    let cache = Arc::new(ExtractCache::open(&cache_path).await.unwrap());
    ChatService::new(test_config(cache_path), cache, store, backend, fetcher)
}

fn arxiv_request(transcript: Vec<ChatTurn>) -> ChatRequest {
    ChatRequest {
        transcript,
        document_id: "2301.12345".to_string(),
        source_tag: "arxiv".to_string(),
    }
}

#[tokio::test]
async fn cold_cache_first_turn_ingests_and_answers() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(StubStore::default());
    let fetcher = Arc::new(StubFetcher::pdf());
    let service = service_with(store.clone(), Arc::new(StubBackend::default()), fetcher.clone(), &dir).await;

    let request = arxiv_request(vec![ChatTurn::user("What is this paper about?")]);
    let response = service.handle_chat(&request).await.unwrap();

    // The blob was created under the deterministic name.
    assert_eq!(store.stored_names(), vec!["arxiv-2301-12345".to_string()]);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    assert_eq!(response.structured.kind, ReplyKind::Answer);
    assert!(!response.main_text.is_empty());
    assert!(!response.structured.follow_ups.is_empty());
}

#[tokio::test]
async fn follow_up_skips_ingestion_entirely() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(StubStore::default());
    let fetcher = Arc::new(StubFetcher::pdf());
    let service = service_with(store.clone(), Arc::new(StubBackend::default()), fetcher.clone(), &dir).await;

    // First turn populates the remote copy.
    let first = arxiv_request(vec![ChatTurn::user("What is this paper about?")]);
    service.handle_chat(&first).await.unwrap();

    let store_fetches = store.fetch_calls.load(Ordering::SeqCst);
    let downloads = fetcher.calls.load(Ordering::SeqCst);

    // Follow-up turn: transcript has history, so neither the store nor the
    // source is touched.
    let follow_up = arxiv_request(vec![
        ChatTurn::user("What is this paper about?"),
        ChatTurn::assistant("It proposes a new attention mechanism."),
        ChatTurn::user("Which dataset does it use?"),
    ]);
    let response = service.handle_chat(&follow_up).await.unwrap();

    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), store_fetches);
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), downloads);
    assert_eq!(response.structured.kind, ReplyKind::Answer);
}

#[tokio::test]
async fn warm_store_first_turn_reuses_the_remote_copy() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(StubStore::default());
    store.files.lock().unwrap().insert(
        "arxiv-2301-12345".to_string(),
        StubStore::handle_for("arxiv-2301-12345"),
    );
    let fetcher = Arc::new(StubFetcher::pdf());
    let service = service_with(store.clone(), Arc::new(StubBackend::default()), fetcher.clone(), &dir).await;

    let request = arxiv_request(vec![ChatTurn::user("What is this paper about?")]);
    service.handle_chat(&request).await.unwrap();

    // Found remotely: no download, no create.
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn welcome_intent_yields_a_welcome_reply() {
    let dir = tempfile::TempDir::new().unwrap();
    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(StubBackend::default()),
        Arc::new(StubFetcher::pdf()),
        &dir,
    )
    .await;

    let request = arxiv_request(vec![ChatTurn::user(
        "Please give me a welcome message and suggested questions",
    )]);
    let response = service.handle_chat(&request).await.unwrap();

    assert_eq!(response.structured.kind, ReplyKind::Welcome);
    assert!(response.structured.follow_ups.len() >= 2);
}

#[tokio::test]
async fn page_references_are_linked_in_every_text_field() {
    let dir = tempfile::TempDir::new().unwrap();
    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(StubBackend::default()),
        Arc::new(StubFetcher::pdf()),
        &dir,
    )
    .await;

    let request = arxiv_request(vec![ChatTurn::user("Where is the method described?")]);
    let response = service.handle_chat(&request).await.unwrap();

    assert!(response.main_text.contains("([page 3](#page-3))"));
    assert!(response.structured.follow_ups[0]
        .text
        .contains("([page 7](#page-7))"));
}

#[tokio::test]
async fn malformed_transcripts_are_rejected_before_any_network_work() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(StubStore::default());
    let fetcher = Arc::new(StubFetcher::pdf());
    let service = service_with(store.clone(), Arc::new(StubBackend::default()), fetcher.clone(), &dir).await;

    let empty = arxiv_request(vec![]);
    assert!(matches!(
        service.handle_chat(&empty).await.unwrap_err(),
        ChatError::InvalidRequest(_)
    ));

    let assistant_last = arxiv_request(vec![
        ChatTurn::user("hello"),
        ChatTurn::assistant("hi there"),
    ]);
    assert!(matches!(
        service.handle_chat(&assistant_last).await.unwrap_err(),
        ChatError::InvalidRequest(_)
    ));

    assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_identifiers_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(StubBackend::default()),
        Arc::new(StubFetcher::pdf()),
        &dir,
    )
    .await;

    let request = ChatRequest {
        transcript: vec![ChatTurn::user("hi")],
        document_id: "not-an-id".to_string(),
        source_tag: "arxiv".to_string(),
    };
    assert!(matches!(
        service.handle_chat(&request).await.unwrap_err(),
        ChatError::InvalidPaperId { .. }
    ));

    let unknown_tag = ChatRequest {
        transcript: vec![ChatTurn::user("hi")],
        document_id: "2301.12345".to_string(),
        source_tag: "ssrn".to_string(),
    };
    assert!(matches!(
        service.handle_chat(&unknown_tag).await.unwrap_err(),
        ChatError::InvalidRequest(_)
    ));
}

#[tokio::test]
async fn upstream_failures_on_first_turn_fail_the_request() {
    let dir = tempfile::TempDir::new().unwrap();

    // Source serves an error page instead of the PDF.
    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(StubBackend::default()),
        Arc::new(StubFetcher::with_response(404, b"not found")),
        &dir,
    )
    .await;

    let request = arxiv_request(vec![ChatTurn::user("What is this paper about?")]);
    assert!(matches!(
        service.handle_chat(&request).await.unwrap_err(),
        ChatError::UpstreamData(_)
    ));

    // Source serves HTML with a 200 status.
    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(StubBackend::default()),
        Arc::new(StubFetcher::with_response(200, b"<html>rate limited</html>")),
        &dir,
    )
    .await;
    assert!(matches!(
        service.handle_chat(&request).await.unwrap_err(),
        ChatError::UpstreamData(_)
    ));
}

#[tokio::test]
async fn contract_violations_surface_as_explicit_errors() {
    let dir = tempfile::TempDir::new().unwrap();
    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(NonConformingBackend),
        Arc::new(StubFetcher::pdf()),
        &dir,
    )
    .await;

    let request = arxiv_request(vec![ChatTurn::user("What is this paper about?")]);
    let err = service.handle_chat(&request).await.unwrap_err();

    // No placeholder reply is fabricated; the violation is explicit.
    assert!(matches!(err, ChatError::ContractViolation(_)));
}

#[tokio::test]
async fn proxy_returns_validated_bytes() {
    let dir = tempfile::TempDir::new().unwrap();
    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(StubBackend::default()),
        Arc::new(StubFetcher::pdf()),
        &dir,
    )
    .await;

    let (paper, bytes) = service.proxy_pdf("2301.12345", "arxiv").await.unwrap();
    assert_eq!(paper.blob_name(), "arxiv-2301-12345");
    assert!(bytes.starts_with(b"%PDF"));

    let service = service_with(
        Arc::new(StubStore::default()),
        Arc::new(StubBackend::default()),
        Arc::new(StubFetcher::with_response(200, b"<html></html>")),
        &dir,
    )
    .await;
    assert!(matches!(
        service.proxy_pdf("2301.12345", "arxiv").await.unwrap_err(),
        ChatError::UpstreamData(_)
    ));
}
