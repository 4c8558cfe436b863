use crate::label::speaker::{Language, SpeakerLabel};

/// Build the (system, user) prompt pair for one chunk of a longer transcript.
///
/// The chunk is framed as "part N of M" so the backend knows it is looking
/// at a slice, but earlier chunks' output is never included.
pub fn build_chunk_prompt(
    chunk_text: &str,
    index: usize,
    total: usize,
    language: Language,
) -> (String, String) {
    let interviewer = SpeakerLabel::Interviewer.token(language);
    let guest = SpeakerLabel::Guest.token(language);
    let target = language.name();

    let system = format!(
        "You are an assistant that analyzes podcast transcripts recorded as interviews.\n\n\
         You are processing PART {index} of {total} of a longer transcript. \
         Identify the speakers and translate ALL of this part into {target}.\n\n\
         Rules:\n\
         1. The {interviewer} asks questions, introduces topics and hands over the floor.\n\
         2. The {guest} answers, develops ideas and shares experiences.\n\
         3. Every time the speaker changes, put their label on its own line, in capitals.\n\
         4. Translate everything into natural {target}, keeping the original meaning.\n\
         5. Do not summarize or omit anything; keep the complete content.\n\
         6. If there is an introduction or presentation at the start, assign it to the {interviewer}.\n\
         7. Do not add explanations, headings or extra comments; output only the reformatted transcript.\n\n\
         Output format:\n\
         {interviewer}\n\
         [text in {target}]\n\n\
         {guest}\n\
         [text in {target}]",
    );

    let user = format!("TRANSCRIPT PART {index}/{total}:\n{chunk_text}");

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_frames_position() {
        let (system, user) = build_chunk_prompt("hello world", 2, 5, Language::English);
        assert!(system.contains("PART 2 of 5"));
        assert!(user.starts_with("TRANSCRIPT PART 2/5:"));
        assert!(user.ends_with("hello world"));
    }

    #[test]
    fn test_prompt_uses_language_tokens() {
        let (system, _) = build_chunk_prompt("hola", 1, 1, Language::Spanish);
        assert!(system.contains("ENTREVISTADOR"));
        assert!(system.contains("INVITADO"));
        assert!(system.contains("into Spanish"));
        assert!(!system.contains("INTERVIEWER"));
    }

    #[test]
    fn test_prompt_forbids_summarizing() {
        let (system, _) = build_chunk_prompt("x", 1, 1, Language::English);
        assert!(system.contains("Do not summarize or omit"));
    }
}
