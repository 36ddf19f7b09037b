//! Core data types used throughout Paper Harness.
//!
//! These types represent the chat transcript, the structured replies that
//! flow between the HTTP API, the session layer, and the generation
//! backend, and the wire shapes of the public endpoints.

use serde::{Deserialize, Serialize};

/// Author of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the client-supplied transcript.
///
/// The server holds no session store; the ordered transcript in each
/// request is the only record of what the model has already been told.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub transcript: Vec<ChatTurn>,
    pub document_id: String,
    pub source_tag: String,
}

/// Response category, used by clients for rendering decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Welcome,
    Answer,
    Clarification,
    Error,
}

/// A follow-up question the model suggests to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The schema-enforced reply shape produced by the generation backend.
///
/// Parsing is atomic: either every required field is present or the whole
/// reply is rejected as a contract violation. `follow_ups` may be empty but
/// is always a sequence, never absent, once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReply {
    pub main_text: String,
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
    pub kind: ReplyKind,
}

/// Body of a successful `POST /chat` response.
///
/// `main_text` duplicates `structured.main_text` so plain-text clients can
/// ignore the structured envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub main_text: String,
    pub structured: StructuredReply,
}
