//! Error types for the labeling pipeline.

use thiserror::Error;

use crate::cache::ArtifactKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Raw transcript is empty; nothing to label")]
    EmptyInput,

    #[error("Segmenter produced no chunks for {chars} characters of non-blank input")]
    Chunking { chars: usize },

    #[error("Labeling backend failed: {context}")]
    Backend { context: String },

    #[error("Labeled transcript rejected by quality gate: {reason}")]
    QualityGate { reason: String },

    #[error("Invalid configuration value for {key}: {message}")]
    Configuration { key: String, message: String },

    #[error("Cached {kind} artifact for {source_id} is not valid UTF-8 text")]
    CacheCorruption {
        kind: ArtifactKind,
        source_id: String,
    },

    #[error("Transcript unavailable for {source_id}: {message}")]
    Source { source_id: String, message: String },

    #[error("Cache I/O error: {0}")]
    Cache(#[from] std::io::Error),
}

impl PipelineError {
    pub fn backend(context: impl Into<String>) -> Self {
        Self::Backend {
            context: context.into(),
        }
    }

    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display_carries_context() {
        let err = PipelineError::backend("empty response for chunk 2/2");
        assert_eq!(
            err.to_string(),
            "Labeling backend failed: empty response for chunk 2/2"
        );
    }

    #[test]
    fn test_configuration_display_names_key() {
        let err = PipelineError::config("pipeline.min_ratio", "must be in (0, 1], got 1.5");
        let msg = err.to_string();
        assert!(msg.contains("pipeline.min_ratio"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn test_quality_gate_is_distinct_from_backend() {
        let gate = PipelineError::QualityGate {
            reason: "ratio 50.00% below minimum 85.00%".to_string(),
        };
        assert!(gate.to_string().starts_with("Labeled transcript rejected"));
        assert!(!matches!(gate, PipelineError::Backend { .. }));
    }

    #[test]
    fn test_cache_corruption_names_artifact() {
        let err = PipelineError::CacheCorruption {
            kind: ArtifactKind::Labeled,
            source_id: "abc123".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("labeled"));
        assert!(msg.contains("abc123"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PipelineError = io.into();
        assert!(matches!(err, PipelineError::Cache(_)));
    }
}
