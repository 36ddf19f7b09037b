//! bioRxiv identifier support.
//!
//! Same versioned-DOI scheme as medRxiv, served from biorxiv.org.

use once_cell::sync::Lazy;
use regex::Regex;

static BIORXIV_DOI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^10\.1101/\d{4}\.\d{2}\.\d{2}\.\d{6}v\d+$").expect("static pattern"));

pub fn is_valid(id: &str) -> bool {
    BIORXIV_DOI.is_match(id)
}

/// Normalize and validate a raw identifier. Returns the id plus its
/// version suffix (e.g. `v2`).
pub fn parse(raw: &str) -> Option<(String, Option<String>)> {
    let id = raw.trim().strip_suffix(".full.pdf").unwrap_or(raw.trim());
    if !is_valid(id) {
        return None;
    }
    let version = id.rfind('v').map(|pos| id[pos..].to_string());
    Some((id.to_string(), version))
}

pub fn pdf_url(id: &str) -> String {
    format!("https://www.biorxiv.org/content/{id}.full.pdf")
}

pub fn abstract_url(id: &str) -> String {
    format!("https://www.biorxiv.org/content/{id}")
}

pub fn prompt_context() -> String {
    "You are a biological sciences expert helping users understand and analyze life \
     sciences research papers. Focus on experimental design, methodology, biological \
     mechanisms, and the significance of the findings. Explain specialist terminology \
     clearly and highlight key takeaways for researchers."
        .to_string()
}
