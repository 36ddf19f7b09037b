//! Condensed reference extraction for schema documents.
//!
//! Turns a raw API description (YAML or JSON, falling back to plain text)
//! into a short reference guide via the generation backend. Results are
//! keyed by content digest in the persistent cache, so byte-identical
//! inputs are normalized and condensed at most once per cold cache; every
//! later call is a local lookup. That at-most-once guarantee is the whole
//! point of this module.

use crate::cache::{content_digest, CacheEntry, ExtractCache};
use crate::config::{Config, ExtractionConfig};
use crate::error::ChatError;
use crate::generate::{create_backend, GenerationBackend, GenerationInput};

/// Declared format of a schema document, inferred from its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
    Text,
}

impl SpecFormat {
    pub fn from_label(label: &str) -> Self {
        let lowered = label.to_lowercase();
        if lowered.ends_with(".yaml") || lowered.ends_with(".yml") {
            SpecFormat::Yaml
        } else if lowered.ends_with(".json") {
            SpecFormat::Json
        } else {
            SpecFormat::Text
        }
    }
}

/// Normalize raw bytes according to the declared format.
///
/// YAML is parsed and re-serialized into one canonical document; JSON is
/// validated and pretty-printed; anything else passes through as text.
/// Parse failures are fatal for the call — malformed input is never cached
/// and never retried.
fn normalize(bytes: &[u8], format: SpecFormat, label: &str) -> Result<String, ChatError> {
    match format {
        SpecFormat::Yaml => {
            let doc: serde_yaml::Value = serde_yaml::from_slice(bytes)
                .map_err(|e| ChatError::InvalidRequest(format!("{label}: malformed YAML: {e}")))?;
            serde_yaml::to_string(&doc)
                .map_err(|e| ChatError::Internal(format!("YAML re-serialization failed: {e}")))
        }
        SpecFormat::Json => {
            let doc: serde_json::Value = serde_json::from_slice(bytes)
                .map_err(|e| ChatError::InvalidRequest(format!("{label}: malformed JSON: {e}")))?;
            serde_json::to_string_pretty(&doc)
                .map_err(|e| ChatError::Internal(format!("JSON re-serialization failed: {e}")))
        }
        SpecFormat::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Longest prefix of `text` within `max_chars` bytes, respecting char
/// boundaries.
fn bounded_prefix(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn condense_prompt(label: &str, max_guide_tokens: usize, body: &str) -> String {
    format!(
        "Produce a condensed reference guide (under {max_guide_tokens} tokens) for the \
         API description below, taken from {label}.\n\n\
         Preserve parameter names, required/optional status, enumerated values, and \
         defaults. Drop prose, examples, and boilerplate. The guide will be used to \
         build API queries, so favor exact field names over explanations.\n\n\
         ---\n\n{body}"
    )
}

/// Produce (or look up) the condensed reference guide for `bytes`.
///
/// For a fixed input the normalize-and-generate path runs at most once per
/// cold cache; all subsequent calls return the cached guide without
/// touching the backend.
pub async fn condense_reference(
    cache: &ExtractCache,
    backend: &dyn GenerationBackend,
    bytes: &[u8],
    label: &str,
    limits: &ExtractionConfig,
) -> Result<String, ChatError> {
    let digest = content_digest(bytes);

    if let Some(hit) = cache.get(&digest).await {
        return Ok(hit.guide);
    }

    let normalized = normalize(bytes, SpecFormat::from_label(label), label)?;
    let prefix = bounded_prefix(&normalized, limits.max_prefix_chars);
    let prompt = condense_prompt(label, limits.max_guide_tokens, prefix);

    let guide = backend
        .generate(GenerationInput::text_only(prompt), None)
        .await?;

    let entry = CacheEntry {
        digest,
        guide: guide.clone(),
        recorded_at: chrono::Utc::now().timestamp(),
        source_label: label.to_string(),
    };
    if let Err(err) = cache.put(&entry).await {
        // The guide is still good; losing the cache write only costs a
        // recomputation later.
        tracing::warn!(error = %err, label, "failed to persist extraction cache entry");
    }

    Ok(guide)
}

/// CLI entry point for `pch extract`.
pub async fn run_extract(
    config: &Config,
    path: &std::path::Path,
    label: Option<&str>,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let label = label
        .map(str::to_string)
        .or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "document".to_string());

    let cache = ExtractCache::open(&config.cache.path).await?;
    let backend = create_backend(&config.generation)?;

    let guide =
        condense_reference(&cache, backend.as_ref(), &bytes, &label, &config.extraction).await?;

    let stats = cache.stats().await?;

    println!("{guide}");
    println!();
    println!(
        "cached as {} ({} entries total)",
        content_digest(&bytes),
        stats.entries
    );

    Ok(())
}
