use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::label::backend::LabelingBackend;
use crate::label::prompt;
use crate::label::speaker::Language;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

/// Labeling backend backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiBackend {
    endpoint: String,
    api_key: String,
    model: String,
    language: Language,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("language", &self.language)
            .finish()
    }
}

impl GeminiBackend {
    /// Create a backend from the `[labeling]` section, after env overrides.
    pub fn from_config(config: &Config) -> Result<Self> {
        let labeling = &config.labeling;

        if labeling.endpoint.is_empty() {
            anyhow::bail!(
                "Labeling endpoint not configured. Set [labeling] endpoint in podreader.toml"
            );
        }
        let endpoint = labeling.endpoint.trim_end_matches('/').to_string();

        if labeling.api_key.is_empty() {
            anyhow::bail!(
                "Labeling API key not configured. Set [labeling] api_key or PODREADER_API_KEY"
            );
        }

        if labeling.model.is_empty() {
            anyhow::bail!("Labeling model not configured. Set [labeling] model in podreader.toml");
        }
        let model = if labeling.model.starts_with("models/") {
            labeling.model.clone()
        } else {
            format!("models/{}", labeling.model)
        };

        let language = config.pipeline.language()?;

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(labeling.timeout_secs))
            .build()?;

        tracing::info!("Labeling backend configured: {} ({})", model, language);

        Ok(Self {
            endpoint,
            api_key: labeling.api_key.clone(),
            model,
            language,
            client,
        })
    }

    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/v1beta/{}:generateContent", self.endpoint, self.model);

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user_prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .context("Failed to send generateContent request")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            anyhow::bail!("Gemini returned HTTP {}: {}", status.as_u16(), error_body);
        }

        let body: GenerateResponse = response
            .json()
            .context("Failed to parse generateContent response")?;

        extract_text(body)
    }
}

fn extract_text(body: GenerateResponse) -> Result<String> {
    if let Some(usage) = &body.usage_metadata {
        tracing::info!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_token_count,
            usage.candidates_token_count,
            usage.total_token_count
        );
    }

    let candidate = body
        .candidates
        .into_iter()
        .next()
        .context("No candidates in generateContent response")?;

    if let Some(reason) = &candidate.finish_reason {
        if reason != "STOP" {
            tracing::warn!("Generation finish_reason: {}", reason);
        }
    }

    Ok(candidate
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join(""))
}

impl LabelingBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn label(&self, chunk_text: &str, index: usize, total: usize) -> Result<String> {
        let (system, user) = prompt::build_chunk_prompt(chunk_text, index, total, self.language);
        self.generate(&system, &user)
            .with_context(|| format!("{} request failed for chunk {}/{}", self.model, index, total))
    }
}
