//! Unified paper reference handling across arXiv, medRxiv, and bioRxiv.
//!
//! A [`PaperRef`] is the validated form of a `(documentId, sourceTag)` pair:
//! parsing applies the source-specific identifier pattern, and the resulting
//! value derives everything downstream code needs — the upstream PDF and
//! abstract URLs, the deterministic blob name used for remote dedup, and the
//! source-specific prompt context.

use crate::error::ChatError;
use crate::{paper_arxiv, paper_biorxiv, paper_medrxiv};

/// Supported paper sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperSource {
    Arxiv,
    Medrxiv,
    Biorxiv,
}

impl PaperSource {
    /// Parse a request's `sourceTag` value.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag {
            "arxiv" => Some(PaperSource::Arxiv),
            "medrxiv" => Some(PaperSource::Medrxiv),
            "biorxiv" => Some(PaperSource::Biorxiv),
            _ => None,
        }
    }

    /// Infer the source from an identifier's shape, for CLI convenience.
    pub fn detect(id: &str) -> Option<Self> {
        if paper_arxiv::is_valid(id) {
            Some(PaperSource::Arxiv)
        } else if paper_medrxiv::is_valid(id) {
            Some(PaperSource::Medrxiv)
        } else if paper_biorxiv::is_valid(id) {
            Some(PaperSource::Biorxiv)
        } else {
            None
        }
    }

    /// Wire name, matching the accepted `sourceTag` values.
    pub fn name(&self) -> &'static str {
        match self {
            PaperSource::Arxiv => "arxiv",
            PaperSource::Medrxiv => "medrxiv",
            PaperSource::Biorxiv => "biorxiv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaperSource::Arxiv => "arXiv",
            PaperSource::Medrxiv => "medRxiv",
            PaperSource::Biorxiv => "bioRxiv",
        }
    }

    /// Human-readable identifier format hint, for error messages.
    pub fn pattern_hint(&self) -> &'static str {
        match self {
            PaperSource::Arxiv => "e.g. 2301.12345 or cs/0211011",
            PaperSource::Medrxiv => "e.g. 10.1101/2023.12.06.23299426v1",
            PaperSource::Biorxiv => "e.g. 10.1101/2025.03.13.642940v2",
        }
    }
}

/// A validated, immutable reference to one remote paper.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperRef {
    /// Normalized identifier (stripped of download suffixes).
    pub id: String,
    pub source: PaperSource,
    /// Legacy arXiv category, when the identifier carries one.
    pub category: Option<String>,
    /// medRxiv/bioRxiv version suffix (e.g. `v1`).
    pub version: Option<String>,
}

impl PaperRef {
    /// Validate `raw` against the source's identifier pattern.
    pub fn parse(raw: &str, source: PaperSource) -> Result<Self, ChatError> {
        let parsed = match source {
            PaperSource::Arxiv => paper_arxiv::parse(raw),
            PaperSource::Medrxiv => paper_medrxiv::parse(raw),
            PaperSource::Biorxiv => paper_biorxiv::parse(raw),
        };

        let Some((id, meta)) = parsed else {
            return Err(ChatError::InvalidPaperId {
                source: source.name().to_string(),
                id: raw.to_string(),
            });
        };

        let (category, version) = match source {
            PaperSource::Arxiv => (meta, None),
            PaperSource::Medrxiv | PaperSource::Biorxiv => (None, meta),
        };

        Ok(PaperRef {
            id,
            source,
            category,
            version,
        })
    }

    pub fn pdf_url(&self) -> String {
        match self.source {
            PaperSource::Arxiv => paper_arxiv::pdf_url(&self.id),
            PaperSource::Medrxiv => paper_medrxiv::pdf_url(&self.id),
            PaperSource::Biorxiv => paper_biorxiv::pdf_url(&self.id),
        }
    }

    pub fn abstract_url(&self) -> String {
        match self.source {
            PaperSource::Arxiv => paper_arxiv::abstract_url(&self.id),
            PaperSource::Medrxiv => paper_medrxiv::abstract_url(&self.id),
            PaperSource::Biorxiv => paper_biorxiv::abstract_url(&self.id),
        }
    }

    /// Deterministic name for the paper's remote copy.
    ///
    /// Same identifier → same name, always: this is the dedup key shared by
    /// concurrent ingestion requests, distinct from the content digest used
    /// by the extraction cache.
    pub fn blob_name(&self) -> String {
        format!(
            "{}-{}",
            self.source.name(),
            self.id.to_lowercase().replace(['.', '/'], "-")
        )
    }

    /// Human-facing label attached to the remote copy.
    pub fn display_label(&self) -> String {
        format!("{}-{}.pdf", self.source.display_name(), self.id)
    }

    /// Source-specific prompt context for the assistant persona.
    pub fn prompt_context(&self) -> String {
        match self.source {
            PaperSource::Arxiv => paper_arxiv::prompt_context(self.category.as_deref()),
            PaperSource::Medrxiv => paper_medrxiv::prompt_context(),
            PaperSource::Biorxiv => paper_biorxiv::prompt_context(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_routes_by_source() {
        let paper = PaperRef::parse("2301.12345", PaperSource::Arxiv).unwrap();
        assert_eq!(paper.id, "2301.12345");
        assert_eq!(paper.source, PaperSource::Arxiv);
        assert!(paper.category.is_none());

        let err = PaperRef::parse("2301.12345", PaperSource::Medrxiv).unwrap_err();
        assert!(matches!(err, ChatError::InvalidPaperId { .. }));
    }

    #[test]
    fn blob_name_is_deterministic_and_normalized() {
        let paper = PaperRef::parse("2301.12345", PaperSource::Arxiv).unwrap();
        assert_eq!(paper.blob_name(), "arxiv-2301-12345");

        let doi = PaperRef::parse("10.1101/2023.12.06.23299426v1", PaperSource::Medrxiv).unwrap();
        assert_eq!(doi.blob_name(), "medrxiv-10-1101-2023-12-06-23299426v1");

        // Re-parsing the same identifier yields the same name.
        let again = PaperRef::parse("2301.12345", PaperSource::Arxiv).unwrap();
        assert_eq!(paper.blob_name(), again.blob_name());
    }

    #[test]
    fn detect_infers_the_source() {
        assert_eq!(PaperSource::detect("2301.12345"), Some(PaperSource::Arxiv));
        assert_eq!(
            PaperSource::detect("10.1101/2023.12.06.23299426v1"),
            Some(PaperSource::Medrxiv)
        );
        assert_eq!(
            PaperSource::detect("10.1101/2025.03.13.642940v2"),
            Some(PaperSource::Biorxiv)
        );
        assert_eq!(PaperSource::detect("garbage"), None);
    }

    #[test]
    fn legacy_arxiv_category_feeds_context() {
        let paper = PaperRef::parse("cs/0211011", PaperSource::Arxiv).unwrap();
        assert_eq!(paper.category.as_deref(), Some("cs"));
        assert!(paper.prompt_context().contains("Computer Science"));
    }
}
