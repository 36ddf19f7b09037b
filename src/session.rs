//! Stateless conversation session handling.
//!
//! The server keeps no per-conversation state: every request carries the
//! full ordered transcript, and this module reconstructs everything the
//! turn needs from it — whether the document still has to be attached
//! (first turn) or is already known to the backend (follow-up), what the
//! user is asking for, and the prompt text for the generation call.

use crate::error::ChatError;
use crate::models::{ChatTurn, Role};
use crate::papers::PaperRef;

/// Whether the current turn is the document's first reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Only the current user message exists; the document must be ingested
    /// and attached to the generation call.
    FirstTurn,
    /// At least one prior turn exists; the backend already holds the
    /// document and only the textual history is sent.
    FollowUp,
}

/// What the user's first message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIntent {
    /// An orientation message with suggested questions, not an answer.
    WelcomeTour,
    /// A substantive question about the paper.
    Question,
}

/// Check the transcript invariants and return the current (last) turn.
///
/// A transcript is malformed when it is empty or when its last turn was not
/// authored by the user; both are protocol errors, surfaced before any
/// network work happens.
pub fn validate_transcript(transcript: &[ChatTurn]) -> Result<&ChatTurn, ChatError> {
    let last = transcript.last().ok_or_else(|| {
        ChatError::InvalidRequest("transcript must contain at least one turn".to_string())
    })?;
    if last.role != Role::User {
        return Err(ChatError::InvalidRequest(
            "last transcript turn must be authored by the user".to_string(),
        ));
    }
    Ok(last)
}

/// FirstTurn iff the transcript holds exactly the current user message.
///
/// Once any further turn exists the session is a follow-up for the rest of
/// the transcript — there is no way to "forget" the document mid-way.
pub fn classify_phase(transcript: &[ChatTurn]) -> TurnPhase {
    if transcript.len() == 1 {
        TurnPhase::FirstTurn
    } else {
        TurnPhase::FollowUp
    }
}

/// Recognize a request for an orientation message.
///
/// Plain substring matching on the fixed phrases clients send; only
/// consulted on the first turn.
pub fn classify_intent(message: &str) -> UserIntent {
    let lowered = message.to_lowercase();
    if lowered.contains("welcome message") || lowered.contains("suggested questions") {
        UserIntent::WelcomeTour
    } else {
        UserIntent::Question
    }
}

/// Serialize every prior turn for inclusion in a follow-up prompt.
///
/// Produces `Human:` / `Assistant:` blocks separated by blank lines and
/// terminated by a divider; empty when there is no history.
pub fn render_history(transcript: &[ChatTurn]) -> String {
    if transcript.len() < 2 {
        return String::new();
    }

    let mut history = transcript[..transcript.len() - 1]
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "Human",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    history.push_str("\n\n---\n\n");
    history
}

const ANSWER_GUIDELINES: &str = "\
Guidelines for the mainText field:
- CRITICAL: Always format page references using EXACTLY this format: (page X) for single \
pages or (page X, page Y) for multiple pages. Examples: \"(page 1)\", \"(page 2, page 6)\". \
NEVER use formats like \"page 1,3\" or \"page 1-3\"
- CRITICAL: ONLY state information you can actually find in the PDF content
- NEVER make assumptions or educated guesses about information not explicitly stated
- If you cannot find specific information, clearly state \"I cannot find this information in the paper\"
- Never fabricate page references - only cite pages where you actually found the information
- Do NOT start responses with \"Based on my analysis\" or \"According to the paper\"
- Use markdown formatting for better readability";

/// Prompt for the first turn, with the document attached to the call.
pub fn first_turn_prompt(paper: &PaperRef, intent: UserIntent, question: &str) -> String {
    let context = paper.prompt_context();
    let source = paper.source.display_name();
    let id = &paper.id;

    match intent {
        UserIntent::WelcomeTour => format!(
            "{context}\n\n\
             You are helping with {source} paper {id}. After analyzing the PDF, create a \
             brief welcome message.\n\n\
             For the mainText field: Provide a brief welcome message with one sentence \
             summary of what this paper is about.\n\n\
             For followUps: Create 4-5 specific questions that users can ask about THIS \
             particular paper. Make them specific to the paper's content, methodology, \
             and findings - not generic questions.\n\n\
             Set kind to \"welcome\"."
        ),
        UserIntent::Question => format!(
            "{context}\n\n\
             You are helping with {source} paper {id}. You are part of Paper Harness, a \
             tool for exploring academic papers.\n\n\
             Answer this question: {question}\n\n\
             {ANSWER_GUIDELINES}\n\n\
             For followUps: Provide 2-4 contextually relevant follow-up questions based \
             on your answer and the current conversation. Make them specific to this \
             paper's content, not generic.\n\n\
             Set kind to \"answer\"."
        ),
    }
}

/// Prompt for a follow-up turn. The document is not re-attached; the
/// rendered history plus the backend's own retained file context carry the
/// conversation.
pub fn follow_up_prompt(paper: &PaperRef, transcript: &[ChatTurn], question: &str) -> String {
    let context = paper.prompt_context();
    let source = paper.source.display_name();
    let id = &paper.id;
    let history = render_history(transcript);

    format!(
        "{context}\n\n\
         Continue our conversation about {source} paper {id}. You have already analyzed \
         the PDF content. You are part of Paper Harness, a tool for exploring academic \
         papers.\n\n\
         {history}Current question: {question}\n\n\
         {ANSWER_GUIDELINES}\n\n\
         For followUps: Provide 2-4 contextually relevant suggested questions based on \
         our conversation history. Make them specific to this paper and our current \
         discussion thread.\n\n\
         Set kind to \"answer\"."
    )
}
