use std::fmt;

use crate::label::speaker::{contains_speaker_label, Language};

/// Ratio of labeled-text length to raw-text length, in characters, ignoring
/// surrounding whitespace. A blank raw text counts as length 1.
pub fn source_ratio(labeled: &str, raw: &str) -> f64 {
    let labeled_len = labeled.trim().chars().count();
    let raw_len = raw.trim().chars().count().max(1);
    labeled_len as f64 / raw_len as f64
}

/// Outcome of the acceptance gate for a labeled transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Acceptance {
    Accepted { ratio: f64 },
    Blank,
    MissingLabels { ratio: f64 },
    TooShort { ratio: f64, min_ratio: f64 },
}

impl Acceptance {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted { ratio } => write!(f, "accepted (ratio {:.2}%)", ratio * 100.0),
            Self::Blank => write!(f, "labeled text is blank"),
            Self::MissingLabels { ratio } => write!(
                f,
                "no speaker-label lines found (ratio {:.2}%)",
                ratio * 100.0
            ),
            Self::TooShort { ratio, min_ratio } => write!(
                f,
                "ratio {:.2}% below minimum {:.2}%",
                ratio * 100.0,
                min_ratio * 100.0
            ),
        }
    }
}

/// Combined completeness check: non-blank, at least one speaker label, and
/// `source_ratio >= min_ratio`.
pub fn assess(labeled: &str, raw: &str, language: Language, min_ratio: f64) -> Acceptance {
    if labeled.trim().is_empty() {
        return Acceptance::Blank;
    }
    let ratio = source_ratio(labeled, raw);
    if !contains_speaker_label(labeled, language) {
        return Acceptance::MissingLabels { ratio };
    }
    if ratio < min_ratio {
        return Acceptance::TooShort { ratio, min_ratio };
    }
    Acceptance::Accepted { ratio }
}
