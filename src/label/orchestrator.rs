use crate::error::{PipelineError, Result};
use crate::label::backend::LabelingBackend;
use crate::label::quality::source_ratio;
use crate::segment;

/// Separator placed between consecutive labeled chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Knobs for a single labeling attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelingOptions {
    pub max_chunk_chars: usize,
    pub min_ratio: f64,
}

impl Default for LabelingOptions {
    fn default() -> Self {
        Self {
            max_chunk_chars: 14_000,
            min_ratio: 0.85,
        }
    }
}

/// Ordered concatenation of all labeled chunk outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTranscript {
    pub text: String,
    pub source_ratio: f64,
}

/// Run one labeling attempt over `raw_text`.
///
/// Chunks are sent to the backend strictly in order, one call per chunk. A
/// backend error or a blank chunk response stops the attempt immediately; no
/// partial output is returned. The joined result must reach
/// `options.min_ratio` of the raw length. Retries and fallback are left to
/// the caller.
pub fn produce_labeled(
    raw_text: &str,
    backend: &dyn LabelingBackend,
    options: &LabelingOptions,
) -> Result<LabeledTranscript> {
    if raw_text.trim().is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let chunks = segment::split(raw_text, options.max_chunk_chars);
    if chunks.is_empty() {
        return Err(PipelineError::Chunking {
            chars: raw_text.chars().count(),
        });
    }

    tracing::info!(
        "Labeling {} characters in {} chunk(s) with {}",
        raw_text.chars().count(),
        chunks.len(),
        backend.name()
    );

    let mut parts: Vec<String> = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        tracing::info!(
            "Labeling chunk {}/{} ({} chars)",
            chunk.index,
            chunk.total,
            chunk.char_len()
        );

        let response = backend
            .label(&chunk.text, chunk.index, chunk.total)
            .map_err(|e| {
                PipelineError::backend(format!(
                    "chunk {}/{} failed: {:#}",
                    chunk.index, chunk.total, e
                ))
            })?;

        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::backend(format!(
                "empty response for chunk {}/{}",
                chunk.index, chunk.total
            )));
        }
        parts.push(trimmed.to_string());
    }

    let text = parts.join(CHUNK_SEPARATOR);
    let ratio = source_ratio(&text, raw_text);

    if ratio < options.min_ratio {
        return Err(PipelineError::backend(format!(
            "output looks truncated or summarized: {} of {} characters (ratio {:.2}%, minimum {:.2}%)",
            text.chars().count(),
            raw_text.trim().chars().count(),
            ratio * 100.0,
            options.min_ratio * 100.0
        )));
    }

    tracing::info!(
        "Labeled transcript ready ({} characters, ratio {:.2}%)",
        text.chars().count(),
        ratio * 100.0
    );

    Ok(LabeledTranscript {
        text,
        source_ratio: ratio,
    })
}
