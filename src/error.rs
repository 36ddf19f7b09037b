//! Request-level error taxonomy with stable machine codes.
//!
//! One enum, [`ChatError`], spans every failure a request can produce.
//! Each variant carries a human-readable message and maps to a stable
//! machine code through [`ChatError::code`]. The HTTP layer translates
//! these into status codes and the `{error, code, details?}` wire shape;
//! see [`crate::server`].

use std::fmt;

use crate::blobstore::StoreError;
use crate::generate::GenerateError;

/// Errors surfaced while handling a chat/extraction request.
///
/// The variants mirror the taxonomy in `spec.md` §7: validation,
/// upstream-data, network, store, generation, contract, and internal
/// failures. Variant shapes are consumed throughout the crate (see the
/// call sites in `papers`, `ingest`, `contract`, `server`, …).
#[derive(Debug)]
pub enum ChatError {
    /// A malformed or incomplete request (bad fields, empty transcript,
    /// unknown source tag). Surfaced to the caller as a 4xx.
    InvalidRequest(String),

    /// A paper identifier that does not match the expected pattern for
    /// its source.
    InvalidPaperId {
        /// The source the identifier was parsed against (e.g. `arxiv`).
        source: String,
        /// The raw identifier that failed validation.
        id: String,
    },

    /// A downloaded document failed format or size validation. Fatal;
    /// not retried.
    UpstreamData(String),

    /// A transient network failure talking to an upstream service.
    Network(String),

    /// The remote blob store returned a failure.
    Store(String),

    /// The generation backend returned a failure.
    Generation(String),

    /// The generation output failed to parse against the required
    /// response schema. Never silently patched into a guessed value.
    ContractViolation(String),

    /// An unexpected internal failure.
    Internal(String),
}

impl ChatError {
    /// A stable, machine-readable code for this error, surfaced in the
    /// `code` field of the HTTP error body so clients can discriminate
    /// failure classes without parsing the message.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::InvalidRequest(_) => "invalid_request",
            ChatError::InvalidPaperId { .. } => "invalid_paper_id",
            ChatError::UpstreamData(_) => "upstream_data",
            ChatError::Network(_) => "network",
            ChatError::Store(_) => "store",
            ChatError::Generation(_) => "generation",
            ChatError::ContractViolation(_) => "contract_violation",
            ChatError::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            ChatError::InvalidPaperId { source, id } => {
                write!(f, "invalid paper id for source '{source}': {id}")
            }
            ChatError::UpstreamData(msg) => write!(f, "upstream data error: {msg}"),
            ChatError::Network(msg) => write!(f, "network error: {msg}"),
            ChatError::Store(msg) => write!(f, "blob store error: {msg}"),
            ChatError::Generation(msg) => write!(f, "generation error: {msg}"),
            ChatError::ContractViolation(msg) => write!(f, "contract violation: {msg}"),
            ChatError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<StoreError> for ChatError {
    fn from(e: StoreError) -> Self {
        ChatError::Store(e.to_string())
    }
}

impl From<GenerateError> for ChatError {
    fn from(e: GenerateError) -> Self {
        ChatError::Generation(e.to_string())
    }
}
