use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Working language of the labeled output. Speaker labels are rendered in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
        }
    }

    /// English name of the language, as used in backend instructions.
    pub fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
        }
    }
}

impl FromStr for Language {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "es" | "spanish" | "español" => Ok(Self::Spanish),
            other => Err(PipelineError::config(
                "pipeline.language",
                format!("unsupported language '{}' (expected \"en\" or \"es\")", other),
            )),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The two roles a labeled transcript may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerLabel {
    Interviewer,
    Guest,
}

impl SpeakerLabel {
    pub const ALL: [SpeakerLabel; 2] = [SpeakerLabel::Interviewer, SpeakerLabel::Guest];

    pub fn token(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Interviewer, Language::English) => "INTERVIEWER",
            (Self::Guest, Language::English) => "GUEST",
            (Self::Interviewer, Language::Spanish) => "ENTREVISTADOR",
            (Self::Guest, Language::Spanish) => "INVITADO",
        }
    }

    /// Recognize a speaker-label line such as `GUEST`, `GUEST:`, `**GUEST**`
    /// or `**GUEST**:`.
    pub fn parse_line(line: &str, language: Language) -> Option<Self> {
        let bare = strip_label_markup(line);
        Self::ALL
            .into_iter()
            .find(|label| bare == label.token(language))
    }
}

/// Remove surrounding whitespace, bold markers and trailing colons, in any
/// nesting order, until nothing changes.
pub fn strip_label_markup(line: &str) -> &str {
    let mut current = line;
    loop {
        let next = current
            .trim()
            .trim_matches('*')
            .trim_end_matches(':')
            .trim();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// True if any line of `text` is a speaker label in `language`.
pub fn contains_speaker_label(text: &str, language: Language) -> bool {
    text.lines()
        .any(|line| SpeakerLabel::parse_line(line, language).is_some())
}
