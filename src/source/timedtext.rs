use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::source::RawTranscriptSource;

#[derive(Debug, Deserialize)]
struct Json3Track {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Fetches YouTube caption tracks from the timedtext endpoint (`fmt=json3`).
pub struct TimedTextSource {
    base_url: String,
    languages: Vec<String>,
    client: reqwest::blocking::Client,
}

impl TimedTextSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        if config.languages.is_empty() {
            anyhow::bail!("No caption languages configured. Set [source] languages");
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.timedtext_url.trim_end_matches('/').to_string(),
            languages: config.languages.clone(),
            client,
        })
    }

    /// Fetch one track. `Ok(None)` means the track does not exist.
    fn fetch_track(&self, video_id: &str, lang: &str, auto_generated: bool) -> Result<Option<String>> {
        let mut query = vec![("v", video_id), ("lang", lang), ("fmt", "json3")];
        if auto_generated {
            query.push(("kind", "asr"));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .with_context(|| format!("Failed to request captions for {}", video_id))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("Caption request returned HTTP {}", status.as_u16());
        }

        let body = response.text().context("Failed to read caption response")?;
        let text = parse_json3(&body)?;
        Ok(text.filter(|t| !t.is_empty()))
    }
}

/// Join every caption segment into one whitespace-normalized string.
/// An empty body (the endpoint's "no such track" answer) yields `None`.
fn parse_json3(body: &str) -> Result<Option<String>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let track: Json3Track = serde_json::from_str(body).context("Malformed json3 caption track")?;
    let joined = track
        .events
        .iter()
        .flat_map(|e| e.segs.iter())
        .map(|s| s.utf8.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(Some(joined.split_whitespace().collect::<Vec<_>>().join(" ")))
}

impl RawTranscriptSource for TimedTextSource {
    fn name(&self) -> &str {
        "youtube-timedtext"
    }

    fn fetch_raw(&self, source_id: &str) -> Result<String> {
        for lang in &self.languages {
            if let Some(text) = self.fetch_track(source_id, lang, false)? {
                tracing::info!("Found '{}' captions for {}", lang, source_id);
                return Ok(text);
            }
            tracing::debug!("No '{}' captions for {}", lang, source_id);
        }

        let first = &self.languages[0];
        if let Some(text) = self.fetch_track(source_id, first, true)? {
            tracing::info!("Using auto-generated '{}' captions for {}", first, source_id);
            return Ok(text);
        }

        anyhow::bail!("source has no available transcript ({})", source_id)
    }
}
