//! # Paper Harness
//!
//! A caching chat gateway for exploring research papers.
//!
//! Paper Harness lets a client hold a multi-turn conversation about a
//! remote paper (arXiv, medRxiv, bioRxiv) without re-transmitting the
//! document on every turn. Papers are ingested once into a remote blob
//! store under a deterministic name (deduplicated across concurrent
//! requests), expensive schema extractions are memoized in a
//! content-addressed persistent cache, and every generation call is held
//! to a schema-enforced structured response contract.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌────────────┐
//! │ Paper source │──▶│  Ingestion   │──▶│ Blob store │
//! │ arXiv/…      │   │ get-or-create│   │ (remote)   │
//! └──────────────┘   └──────┬──────┘   └─────┬──────┘
//!                           │                │
//!                    ┌──────▼────────────────▼──────┐
//!                    │  Chat service (stateless)    │
//!                    │  session → generate → parse  │
//!                    └──────┬───────────────┬──────┘
//!                           │               │
//!                      ┌────▼───┐     ┌─────▼──────┐
//!                      │  CLI   │     │ HTTP (axum)│
//!                      │ (pch)  │     │ /chat /pdf │
//!                      └────────┘     └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pch serve                                  # start the HTTP API
//! pch fetch 2301.12345 --source arxiv        # download + validate a PDF
//! pch extract ./specs/ctg-oas-v2.yaml        # condense a schema document
//! pch cache stats                            # inspect the extraction cache
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and wire shapes |
//! | [`papers`] | Paper identifier validation and URL derivation |
//! | [`cache`] | Content-addressed persistent extraction cache |
//! | [`extract`] | Schema-document condensing (cache-backed) |
//! | [`ingest`] | Get-or-create ingestion against the blob store |
//! | [`blobstore`] | Remote blob store abstraction + Gemini Files client |
//! | [`generate`] | Generation backend abstraction + Gemini client |
//! | [`session`] | Stateless conversation classification and prompts |
//! | [`contract`] | Structured response schema, parsing, page links |
//! | [`chat`] | Per-request orchestration |
//! | [`server`] | HTTP API server |

pub mod blobstore;
pub mod cache;
pub mod chat;
pub mod config;
pub mod contract;
pub mod error;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod models;
pub mod paper_arxiv;
pub mod paper_biorxiv;
pub mod paper_medrxiv;
pub mod papers;
pub mod server;
pub mod session;
