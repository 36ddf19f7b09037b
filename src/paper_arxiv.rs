//! arXiv identifier support.
//!
//! Accepts both the post-2007 numeric form (`2301.12345`) and the legacy
//! category-prefixed form (`cs/0211011`). Legacy identifiers carry their
//! category through to the prompt context so the assistant can adopt the
//! matching persona.

use once_cell::sync::Lazy;
use regex::Regex;

/// `YYMM.NNNNN` or `category/YYMMNNN`.
static ARXIV_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{4}\.\d{4,5}|[a-z-]+/\d{7})$").expect("static pattern"));

pub fn is_valid(id: &str) -> bool {
    ARXIV_ID.is_match(id)
}

/// Normalize and validate a raw identifier. Returns the id plus the legacy
/// category, when present.
pub fn parse(raw: &str) -> Option<(String, Option<String>)> {
    let id = raw.trim().strip_suffix(".pdf").unwrap_or(raw.trim());
    if !is_valid(id) {
        return None;
    }
    let category = id.split_once('/').map(|(cat, _)| cat.to_string());
    Some((id.to_string(), category))
}

pub fn pdf_url(id: &str) -> String {
    format!("https://arxiv.org/pdf/{id}")
}

pub fn abstract_url(id: &str) -> String {
    format!("https://arxiv.org/abs/{id}")
}

/// Prompt context, specialized by legacy category when one is known.
pub fn prompt_context(category: Option<&str>) -> String {
    let Some(category) = category else {
        return "You are a research expert helping users understand this arXiv paper. \
                Focus on explaining concepts clearly, highlighting key contributions, \
                and providing context for the research."
            .to_string();
    };

    let specialized = match category {
        "cs" => {
            "You are a Computer Science professor helping a student understand this \
             research paper. Focus on algorithms, computational methods, software \
             engineering principles, and theoretical computer science concepts."
        }
        "math" => {
            "You are a Mathematics professor helping a student understand this research \
             paper. Focus on mathematical proofs, theorems, equations, and mathematical \
             reasoning."
        }
        "physics" => {
            "You are a Physics professor helping a student understand this research \
             paper. Focus on physical principles, experimental methods, and theoretical \
             concepts."
        }
        "astro-ph" => {
            "You are an Astrophysics professor helping a student understand this \
             research paper. Focus on astronomical observations, cosmological models, \
             stellar physics, and observational data."
        }
        "q-bio" => {
            "You are a Quantitative Biology professor helping a student understand this \
             research paper. Focus on biological modeling, computational biology, \
             bioinformatics, and quantitative analysis of biological systems."
        }
        "stat" => {
            "You are a Statistics professor helping a student understand this research \
             paper. Focus on statistical methods, data analysis, probability theory, \
             and statistical inference."
        }
        other => {
            return format!(
                "You are a {other} expert helping users understand this research paper. \
                 Draw upon your expertise in this field to explain concepts clearly and \
                 accurately."
            );
        }
    };

    specialized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_modern_and_legacy_ids() {
        assert_eq!(
            parse("2301.12345"),
            Some(("2301.12345".to_string(), None))
        );
        assert_eq!(
            parse("cs/0211011"),
            Some(("cs/0211011".to_string(), Some("cs".to_string())))
        );
        assert_eq!(
            parse("math-ph/0506203"),
            Some(("math-ph/0506203".to_string(), Some("math-ph".to_string())))
        );
    }

    #[test]
    fn strips_pdf_suffix() {
        assert_eq!(
            parse("1706.03762.pdf"),
            Some(("1706.03762".to_string(), None))
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(parse("").is_none());
        assert!(parse("12345").is_none());
        assert!(parse("2301.123").is_none());
        assert!(parse("cs/12345").is_none());
        assert!(parse("not an id").is_none());
    }

    #[test]
    fn urls_embed_the_id() {
        assert_eq!(pdf_url("2301.12345"), "https://arxiv.org/pdf/2301.12345");
        assert_eq!(
            abstract_url("2301.12345"),
            "https://arxiv.org/abs/2301.12345"
        );
    }

    #[test]
    fn category_context_varies() {
        assert!(prompt_context(Some("cs")).contains("Computer Science"));
        assert!(prompt_context(Some("hep-th")).contains("hep-th expert"));
        assert!(prompt_context(None).contains("research expert"));
    }
}
