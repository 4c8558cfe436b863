//! Plain-text paginated rendering of a labeled transcript.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::label::speaker::{strip_label_markup, Language, SpeakerLabel};

const PAGE_BREAK: &str = "\u{000C}";
const HEADER_LINES: usize = 4;
const FOOTER_LINES: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub output_dir: PathBuf,
    /// Characters per line including both margins.
    pub line_width: usize,
    /// Lines per page including header and footer.
    pub lines_per_page: usize,
    pub margin: usize,
    pub max_token_len: usize,
    pub footer_page_numbers: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let output_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podreader");
        Self {
            output_dir,
            line_width: 90,
            lines_per_page: 56,
            margin: 4,
            max_token_len: 60,
            footer_page_numbers: true,
        }
    }
}

impl RenderConfig {
    fn text_width(&self) -> usize {
        self.line_width.saturating_sub(2 * self.margin)
    }

    fn footer_lines(&self) -> usize {
        if self.footer_page_numbers {
            FOOTER_LINES
        } else {
            0
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.text_width() < 20 {
            return Err(PipelineError::config(
                "render.line_width",
                format!(
                    "line_width {} leaves less than 20 columns after margins of {}",
                    self.line_width, self.margin
                ),
            ));
        }
        if self.lines_per_page < HEADER_LINES + self.footer_lines() + 4 {
            return Err(PipelineError::config(
                "render.lines_per_page",
                format!("{} is too small to fit header and footer", self.lines_per_page),
            ));
        }
        if self.max_token_len == 0 || self.max_token_len > self.text_width() {
            return Err(PipelineError::config(
                "render.max_token_len",
                format!("must be between 1 and {}", self.text_width()),
            ));
        }
        Ok(())
    }
}

/// A paginated document ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub title: String,
    pub pages: Vec<Vec<String>>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages joined with form feeds.
    pub fn to_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.join("\n"))
            .collect::<Vec<_>>()
            .join(&format!("\n{}", PAGE_BREAK))
    }
}

/// Replace typographic characters with plain equivalents.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2013}' | '\u{2014}' | '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{00A0}' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

/// Break any whitespace-separated token longer than `max_len` chars into
/// `max_len`-sized pieces so it can wrap.
fn split_long_tokens(line: &str, max_len: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in line.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() <= max_len {
            tokens.push(word.to_string());
        } else {
            tokens.extend(chars.chunks(max_len).map(|c| c.iter().collect::<String>()));
        }
    }
    tokens
}

fn wrap(tokens: &[String], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for token in tokens {
        let len = token.chars().count();
        if current_len > 0 && current_len + 1 + len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(token);
        current_len += len;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn is_label_line(line: &str) -> bool {
    [Language::English, Language::Spanish]
        .into_iter()
        .any(|lang| SpeakerLabel::parse_line(line, lang).is_some())
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    format!("{}{}", " ".repeat((width - len) / 2), text)
}

/// Lay out body lines: wrapped prose, speaker labels set apart by a blank
/// line, runs of blank lines collapsed.
fn layout_body(text: &str, config: &RenderConfig) -> Vec<String> {
    let indent = " ".repeat(config.margin);
    let width = config.text_width();
    let mut body: Vec<String> = Vec::new();
    let last_is_blank = |body: &Vec<String>| body.last().map_or(true, |l| l.is_empty());

    for raw_line in normalize_text(text).lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            if !last_is_blank(&body) {
                body.push(String::new());
            }
            continue;
        }
        if is_label_line(line) {
            if !last_is_blank(&body) {
                body.push(String::new());
            }
            body.push(format!("{}{}", indent, strip_label_markup(line)));
            continue;
        }
        let tokens = split_long_tokens(line, config.max_token_len);
        body.extend(wrap(&tokens, width).into_iter().map(|l| format!("{}{}", indent, l)));
    }

    while body.last().is_some_and(|l| l.is_empty()) {
        body.pop();
    }
    body
}

/// Render labeled text into pages, with a title header on the first page
/// (dated `generated`) and an optional page-number footer.
pub fn render_on(
    text: &str,
    title: &str,
    config: &RenderConfig,
    generated: NaiveDate,
) -> RenderedDocument {
    let title = normalize_text(title.trim());
    let body = layout_body(text, config);
    let mut pages: Vec<Vec<String>> = Vec::new();
    let mut lines = body.into_iter().peekable();

    loop {
        let mut page: Vec<String> = Vec::new();
        if pages.is_empty() {
            page.push(center(&title, config.line_width));
            page.push(center(
                &format!("Generated {}", generated.format("%Y-%m-%d")),
                config.line_width,
            ));
            page.push(format!(
                "{}{}",
                " ".repeat(config.margin),
                "=".repeat(config.text_width())
            ));
            page.push(String::new());
        }

        let capacity = config
            .lines_per_page
            .saturating_sub(config.footer_lines() + page.len())
            .max(1);
        let mut used = 0;
        while used < capacity {
            match lines.next() {
                // no blank line at the top of a page
                Some(l) if l.is_empty() && used == 0 && !pages.is_empty() => continue,
                Some(l) => {
                    page.push(l);
                    used += 1;
                }
                None => break,
            }
        }

        if config.footer_page_numbers {
            while page.len() < config.lines_per_page.saturating_sub(FOOTER_LINES) {
                page.push(String::new());
            }
            page.push(String::new());
            page.push(center(&format!("Page {}", pages.len() + 1), config.line_width));
        }
        pages.push(page);

        if lines.peek().is_none() {
            break;
        }
    }

    RenderedDocument { title, pages }
}

/// Render with today's date in the header.
pub fn render(text: &str, title: &str, config: &RenderConfig) -> RenderedDocument {
    render_on(text, title, config, chrono::Local::now().date_naive())
}

/// Write the document to `<output_dir>/<file_stem>.txt`.
pub fn write_document(doc: &RenderedDocument, output_dir: &Path, file_stem: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(format!("{}.txt", file_stem));
    std::fs::write(&path, doc.to_text())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Document written to {} ({} pages)", path.display(), doc.page_count());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RenderConfig {
        RenderConfig {
            output_dir: PathBuf::from("."),
            line_width: 40,
            lines_per_page: 12,
            margin: 2,
            max_token_len: 10,
            footer_page_numbers: true,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("\u{201C}Hi\u{201D} \u{2014} it\u{2019}s\u{2026}"),
            "\"Hi\" - it's..."
        );
    }

    #[test]
    fn test_split_long_tokens() {
        let tokens = split_long_tokens("short abcdefghijklmnop", 5);
        assert_eq!(tokens, vec!["short", "abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn test_wrap_respects_width() {
        let tokens: Vec<String> = "the quick brown fox jumps over the lazy dog"
            .split(' ')
            .map(String::from)
            .collect();
        let lines = wrap(&tokens, 10);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_tiny_pages() {
        let mut config = small_config();
        config.lines_per_page = 5;
        assert!(config.validate().is_err());
        let mut config = small_config();
        config.margin = 15;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_labels_are_set_apart() {
        let text = "**INTERVIEWER**:\nWelcome to the show.\nGUEST:\nThanks for having me.";
        let body = layout_body(text, &small_config());
        assert_eq!(
            body,
            vec![
                "  INTERVIEWER",
                "  Welcome to the show.",
                "",
                "  GUEST",
                "  Thanks for having me.",
            ]
        );
    }

    #[test]
    fn test_single_page_layout() {
        let doc = render_on("GUEST\nhello", "My Podcast", &small_config(), date());
        assert_eq!(doc.page_count(), 1);
        let page = &doc.pages[0];
        assert_eq!(page.len(), 12);
        assert!(page[0].contains("My Podcast"));
        assert!(page[1].contains("Generated 2026-03-01"));
        assert!(page[11].trim() == "Page 1");
    }

    #[test]
    fn test_paginates_long_text() {
        let prose = "word ".repeat(400);
        let text = format!("INTERVIEWER\n{}\n\nGUEST\n{}", prose, prose);
        let config = small_config();
        let doc = render_on(&text, "Title", &config, date());
        assert!(doc.page_count() > 2);
        for (i, page) in doc.pages.iter().enumerate() {
            assert_eq!(page.len(), config.lines_per_page);
            assert_eq!(page.last().unwrap().trim(), format!("Page {}", i + 1));
            assert!(page.iter().all(|l| l.chars().count() <= config.line_width));
        }
        let rendered = doc.to_text();
        assert_eq!(rendered.matches(PAGE_BREAK).count(), doc.page_count() - 1);
    }

    #[test]
    fn test_no_footer_when_disabled() {
        let mut config = small_config();
        config.footer_page_numbers = false;
        let doc = render_on("GUEST\nhi", "T", &config, date());
        assert!(!doc.to_text().contains("Page 1"));
    }

    #[test]
    fn test_write_document() {
        let tmp = tempfile::TempDir::new().unwrap();
        let doc = render_on("GUEST\nhello", "T", &small_config(), date());
        let path = write_document(&doc, &tmp.path().join("out"), "abc123").unwrap();
        assert_eq!(path, tmp.path().join("out").join("abc123.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), doc.to_text());
    }
}
