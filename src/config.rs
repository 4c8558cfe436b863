use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result as PipelineResult};
use crate::label::orchestrator::LabelingOptions;
use crate::label::speaker::Language;
use crate::render::RenderConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub cache: CacheConfig,
    pub labeling: LabelingConfig,
    pub source: SourceConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Use the raw transcript as output when labeling fails.
    pub allow_raw_fallback: bool,
    /// Minimum labeled/raw length ratio, in (0, 1].
    pub min_ratio: f64,
    /// Character budget per backend call.
    pub max_chunk_chars: usize,
    /// Working language of the labeled output ("es" or "en").
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for LabelingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelingConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Caption languages to try, in order.
    pub languages: Vec<String>,
    pub timedtext_url: String,
    pub timeout_secs: u64,
}

// --- Default implementations ---

impl Default for PipelineConfig {
    fn default() -> Self {
        let options = LabelingOptions::default();
        Self {
            allow_raw_fallback: false,
            min_ratio: options.min_ratio,
            max_chunk_chars: options.max_chunk_chars,
            language: "es".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let directory = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podreader")
            .join("cache");
        Self { directory }
    }
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            model: "models/gemini-2.5-flash".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            timedtext_url: "https://www.youtube.com/api/timedtext".to_string(),
            timeout_secs: 60,
        }
    }
}

impl PipelineConfig {
    pub fn language(&self) -> PipelineResult<Language> {
        self.language.parse()
    }

    pub fn labeling_options(&self) -> LabelingOptions {
        LabelingOptions {
            max_chunk_chars: self.max_chunk_chars,
            min_ratio: self.min_ratio,
        }
    }

    /// Check the `[pipeline]` section on its own.
    pub fn validate(&self) -> PipelineResult<()> {
        let ratio = self.min_ratio;
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            return Err(PipelineError::config(
                "pipeline.min_ratio",
                format!("must be in (0, 1], got {}", ratio),
            ));
        }
        if self.max_chunk_chars == 0 {
            return Err(PipelineError::config(
                "pipeline.max_chunk_chars",
                "must be greater than 0",
            ));
        }
        self.language()?;
        Ok(())
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("podreader.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/podreader/config.toml)
        if let Some(p) = Self::platform_config_path() {
            if p.exists() {
                let content = std::fs::read_to_string(&p)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(p)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    /// Load config (without tracking the resolved path).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    pub fn platform_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("podreader").join("config.toml"))
    }

    /// Apply `PODREADER_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) -> PipelineResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> PipelineResult<()> {
        if let Some(v) = lookup("PODREADER_ALLOW_RAW_FALLBACK") {
            self.pipeline.allow_raw_fallback = v.trim() == "1";
        }
        if let Some(v) = lookup("PODREADER_MIN_RATIO") {
            self.pipeline.min_ratio = v.trim().parse().map_err(|_| {
                PipelineError::config("PODREADER_MIN_RATIO", format!("not a number: '{}'", v))
            })?;
        }
        if let Some(v) = lookup("PODREADER_API_KEY") {
            if self.labeling.api_key.is_empty() {
                self.labeling.api_key = v;
            }
        }
        if let Some(v) = lookup("PODREADER_MODEL") {
            if !v.trim().is_empty() {
                self.labeling.model = v.trim().to_string();
            }
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with. Called before any network
    /// or cache access.
    pub fn validate(&self) -> PipelineResult<()> {
        self.pipeline.validate()?;
        self.render.validate()?;
        Ok(())
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        let cache_dir = CacheConfig::default().directory;
        let cache_dir_str = cache_dir.to_string_lossy().replace('\\', "\\\\");
        let output_dir = RenderConfig::default().output_dir;
        let output_dir_str = output_dir.to_string_lossy().replace('\\', "\\\\");

        format!(
r#"# podreader configuration
# Environment variables PODREADER_ALLOW_RAW_FALLBACK, PODREADER_MIN_RATIO,
# PODREADER_API_KEY and PODREADER_MODEL override the values below.

[pipeline]
# When labeling fails, use the raw (unlabeled) transcript instead of aborting.
# Off by default so documents without speaker labels are never produced silently.
allow_raw_fallback = false
# Minimum labeled/raw length ratio. Output shorter than this is treated as
# truncated or summarized. Must be greater than 0 and at most 1.
min_ratio = 0.85
# Maximum characters per labeling request. Chunks break only on whitespace.
max_chunk_chars = 14000
# Working language of the output and its speaker labels: "es" or "en".
language = "es"

[cache]
# Directory holding cached raw and labeled transcripts, one folder per video.
directory = "{cache_dir}"

[labeling]
# Gemini API base URL.
endpoint = "https://generativelanguage.googleapis.com"
# API key (or set PODREADER_API_KEY environment variable).
# api_key = ""
# Model used for labeling and translation.
model = "models/gemini-2.5-flash"
# HTTP timeout per labeling request, in seconds.
timeout_secs = 300

[source]
# Caption languages to try, in order. The auto-generated track of the first
# language is used when none of them has manual captions.
languages = ["en"]
timedtext_url = "https://www.youtube.com/api/timedtext"
timeout_secs = 60

[render]
# Directory where rendered documents are written.
output_dir = "{output_dir}"
# Characters per line, including both margins.
line_width = 90
# Lines per page, including header and footer.
lines_per_page = 56
# Left/right margin in characters.
margin = 4
# Tokens longer than this are broken up so they can wrap.
max_token_len = 60
# Print a centered "Page N" footer on every page.
footer_page_numbers = true
"#,
            cache_dir = cache_dir_str,
            output_dir = output_dir_str
        )
    }
}
