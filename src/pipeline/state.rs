use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one pipeline artifact within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    /// No usable cached copy.
    Missing,
    /// A cached copy exists but is blank or fails the acceptance gate.
    Stale,
    /// Being fetched or generated.
    Producing,
    /// Usable downstream.
    Ready,
    /// Production failed; the run aborts.
    Failed,
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Stale => write!(f, "stale"),
            Self::Producing => write!(f, "producing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of inspecting the cache for a labeled artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum LabeledLookup {
    Missing,
    Stale { reason: String },
    Ready { text: String, ratio: f64 },
}

impl LabeledLookup {
    pub fn state(&self) -> ArtifactState {
        match self {
            Self::Missing => ArtifactState::Missing,
            Self::Stale { .. } => ArtifactState::Stale,
            Self::Ready { .. } => ArtifactState::Ready,
        }
    }
}

/// How the labeled text handed downstream was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum LabeledOutcome {
    /// Cached artifact passed the acceptance gate; no backend call.
    Reused,
    /// Freshly produced by the labeling backend.
    Regenerated,
    /// Labeling failed and the raw transcript stands in for it.
    Degraded { reason: String },
}

impl LabeledOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl fmt::Display for LabeledOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reused => write!(f, "reused from cache"),
            Self::Regenerated => write!(f, "regenerated"),
            Self::Degraded { reason } => write!(f, "degraded fallback (raw text): {}", reason),
        }
    }
}
