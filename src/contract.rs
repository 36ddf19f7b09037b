//! The structured response contract.
//!
//! Every generation call for a chat turn is issued with a fixed output
//! shape enforced by the backend's schema-constrained decoding — not merely
//! requested in prose. This module owns that shape: the schema sent with
//! the request, the strict parse of what comes back, and the page-reference
//! rewrite applied to the parsed text fields.
//!
//! A reply that fails to parse is a contract violation by the backend, not
//! an ordinary request failure. It is logged with the raw offending text
//! and surfaced as an explicit error; it is never coerced into a
//! best-effort guess, since guessing could present fabricated content as
//! fact.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ChatError;
use crate::models::StructuredReply;

/// The enforced output shape, in the schema dialect the generation backend
/// understands.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "mainText": {
                "type": "STRING",
                "description": "Main response content in markdown format"
            },
            "followUps": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "text": {
                            "type": "STRING",
                            "description": "The suggested question text"
                        },
                        "description": {
                            "type": "STRING",
                            "description": "Optional description of what this question explores"
                        }
                    },
                    "required": ["text"],
                    "propertyOrdering": ["text", "description"]
                },
                "description": "Context-aware suggested questions based on the current conversation"
            },
            "kind": {
                "type": "STRING",
                "enum": ["welcome", "answer", "clarification", "error"],
                "description": "Type of response for UI handling"
            }
        },
        "required": ["mainText", "kind"],
        "propertyOrdering": ["mainText", "followUps", "kind"]
    })
}

/// Parse raw backend output against the contract.
///
/// Atomic: returns a fully valid [`StructuredReply`] or a
/// [`ChatError::ContractViolation`]. Empty output and an empty `mainText`
/// count as violations too.
pub fn parse_reply(raw: &str) -> Result<StructuredReply, ChatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::error!("generation backend returned empty output");
        return Err(ChatError::ContractViolation(
            "backend returned empty output".to_string(),
        ));
    }

    let reply: StructuredReply = serde_json::from_str(trimmed).map_err(|err| {
        tracing::error!(raw = %raw, error = %err, "generation output failed contract parse");
        ChatError::ContractViolation(format!("output does not match the response shape: {err}"))
    })?;

    if reply.main_text.trim().is_empty() {
        tracing::error!(raw = %raw, "generation output has an empty mainText");
        return Err(ChatError::ContractViolation(
            "mainText is empty".to_string(),
        ));
    }

    Ok(reply)
}

/// `(page 3)` or `(page 2, page 6)` — the citation format the prompts
/// request. Already-rewritten text no longer matches, which is what makes
/// [`link_page_refs`] idempotent.
static PAGE_REFS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*page\s+(\d+(?:\s*,\s*page\s+\d+)*)\s*\)").expect("static pattern")
});

static PAGE_NUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static pattern"));

/// Rewrite inline page citations into viewer-addressable links:
/// `(page 3)` becomes `([page 3](#page-3))`. Everything else is left
/// untouched, and re-applying the rewrite is a no-op.
pub fn link_page_refs(text: &str) -> String {
    PAGE_REFS
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let links = PAGE_NUM
                .find_iter(&caps[1])
                .map(|num| format!("[page {0}](#page-{0})", num.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({links})")
        })
        .into_owned()
}

/// Apply the page-reference rewrite to every text field of a reply.
pub fn link_reply_refs(reply: &mut StructuredReply) {
    reply.main_text = link_page_refs(&reply.main_text);
    for follow_up in &mut reply.follow_ups {
        follow_up.text = link_page_refs(&follow_up.text);
        if let Some(description) = &follow_up.description {
            follow_up.description = Some(link_page_refs(description));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReplyKind;

    #[test]
    fn valid_reply_parses_atomically() {
        let raw = r#"{
            "mainText": "The paper introduces a new attention variant.",
            "followUps": [
                {"text": "How is it evaluated?", "description": "Benchmarks and baselines"},
                {"text": "What are the limitations?"}
            ],
            "kind": "answer"
        }"#;

        let reply = parse_reply(raw).unwrap();
        assert_eq!(reply.kind, ReplyKind::Answer);
        assert_eq!(reply.follow_ups.len(), 2);
        assert_eq!(reply.follow_ups[1].description, None);
    }

    #[test]
    fn missing_follow_ups_defaults_to_empty_sequence() {
        let raw = r#"{"mainText": "Short answer.", "kind": "clarification"}"#;
        let reply = parse_reply(raw).unwrap();
        assert!(reply.follow_ups.is_empty());
    }

    #[test]
    fn missing_kind_is_a_violation() {
        let raw = r#"{"mainText": "Answer without a kind."}"#;
        let err = parse_reply(raw).unwrap_err();
        assert!(matches!(err, ChatError::ContractViolation(_)));
    }

    #[test]
    fn non_json_output_is_a_violation() {
        let err = parse_reply("I'm sorry, I can't respond in JSON today.").unwrap_err();
        assert!(matches!(err, ChatError::ContractViolation(_)));
    }

    #[test]
    fn empty_output_is_a_violation() {
        assert!(matches!(
            parse_reply("   \n"),
            Err(ChatError::ContractViolation(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"mainText": "  ", "kind": "answer"}"#),
            Err(ChatError::ContractViolation(_))
        ));
    }

    #[test]
    fn single_page_reference_is_linked() {
        assert_eq!(
            link_page_refs("See results (page 3)."),
            "See results ([page 3](#page-3))."
        );
    }

    #[test]
    fn multi_page_references_are_linked_individually() {
        assert_eq!(
            link_page_refs("Compared in (page 2, page 6)."),
            "Compared in ([page 2](#page-2), [page 6](#page-6))."
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = link_page_refs("See results (page 3) and (page 2, page 6).");
        let twice = link_page_refs(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn unrelated_parentheses_are_untouched() {
        let text = "A result (Theorem 3) on page 4 (not a citation).";
        assert_eq!(link_page_refs(text), text);
    }

    #[test]
    fn rewrite_covers_all_reply_fields() {
        let mut reply = StructuredReply {
            main_text: "Shown in (page 1).".to_string(),
            follow_ups: vec![crate::models::FollowUp {
                text: "What about (page 5)?".to_string(),
                description: Some("Details on (page 5)".to_string()),
            }],
            kind: ReplyKind::Answer,
        };
        link_reply_refs(&mut reply);
        assert_eq!(reply.main_text, "Shown in ([page 1](#page-1)).");
        assert_eq!(reply.follow_ups[0].text, "What about ([page 5](#page-5))?");
        assert_eq!(
            reply.follow_ups[0].description.as_deref(),
            Some("Details on ([page 5](#page-5))")
        );
    }
}
