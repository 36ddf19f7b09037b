use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Generation models the gateway accepts. Anything else is a config error.
pub const SUPPORTED_MODELS: &[&str] =
    &["gemini-2.5-flash-lite", "gemini-2.5-flash", "gemini-2.5-pro"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_generation_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Upper bound on a downloaded paper, in megabytes.
    #[serde(default = "default_max_pdf_mb")]
    pub max_pdf_mb: u64,
    #[serde(default = "default_ingest_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_pdf_mb: default_max_pdf_mb(),
            timeout_secs: default_ingest_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_pdf_mb() -> u64 {
    2048
}
fn default_ingest_timeout() -> u64 {
    60
}
fn default_user_agent() -> String {
    format!("paper-harness/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Longest normalized-document prefix submitted for condensing.
    #[serde(default = "default_max_prefix_chars")]
    pub max_prefix_chars: usize,
    /// Token budget the condensing instruction asks the model to stay under.
    #[serde(default = "default_max_guide_tokens")]
    pub max_guide_tokens: usize,
    /// Upper bound on an uploaded schema document, in megabytes.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_prefix_chars: default_max_prefix_chars(),
            max_guide_tokens: default_max_guide_tokens(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_max_prefix_chars() -> usize {
    120_000
}
fn default_max_guide_tokens() -> usize {
    800
}
fn default_max_upload_mb() -> u64 {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate ingest
    if config.ingest.max_pdf_mb == 0 {
        anyhow::bail!("ingest.max_pdf_mb must be > 0");
    }
    if config.ingest.timeout_secs == 0 {
        anyhow::bail!("ingest.timeout_secs must be > 0");
    }

    // Validate extraction
    if config.extraction.max_prefix_chars == 0 {
        anyhow::bail!("extraction.max_prefix_chars must be > 0");
    }
    if config.extraction.max_upload_mb == 0 {
        anyhow::bail!("extraction.max_upload_mb must be > 0");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "disabled" => {}
        "gemini" => {
            let model = config.generation.model.as_deref().ok_or_else(|| {
                anyhow::anyhow!("generation.model must be specified when provider is 'gemini'")
            })?;
            if !SUPPORTED_MODELS.contains(&model) {
                anyhow::bail!(
                    "Unknown generation model: '{}'. Valid options are: {}",
                    model,
                    SUPPORTED_MODELS.join(", ")
                );
            }
        }
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }

    Ok(config)
}
