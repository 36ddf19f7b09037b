//! medRxiv identifier support.
//!
//! medRxiv papers are addressed by a versioned DOI of the form
//! `10.1101/YYYY.MM.DD.NNNNNNNNvN`.

use once_cell::sync::Lazy;
use regex::Regex;

static MEDRXIV_DOI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^10\.1101/\d{4}\.\d{2}\.\d{2}\.\d{8}v\d+$").expect("static pattern"));

pub fn is_valid(id: &str) -> bool {
    MEDRXIV_DOI.is_match(id)
}

/// Normalize and validate a raw identifier. Returns the id plus its
/// version suffix (e.g. `v1`).
pub fn parse(raw: &str) -> Option<(String, Option<String>)> {
    let id = raw.trim().strip_suffix(".full.pdf").unwrap_or(raw.trim());
    if !is_valid(id) {
        return None;
    }
    let version = id.rfind('v').map(|pos| id[pos..].to_string());
    Some((id.to_string(), version))
}

pub fn pdf_url(id: &str) -> String {
    format!("https://www.medrxiv.org/content/{id}.full.pdf")
}

pub fn abstract_url(id: &str) -> String {
    format!("https://www.medrxiv.org/content/{id}")
}

pub fn prompt_context() -> String {
    "You are a medical research expert helping users understand and analyze health \
     sciences research papers. Focus on clinical findings, methodology, study \
     populations, statistical analysis, and clinical implications. Explain medical \
     terminology clearly and highlight key takeaways for healthcare practitioners \
     and researchers."
        .to_string()
}
