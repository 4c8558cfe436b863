pub mod timedtext;

use anyhow::Result;

/// Produces the raw transcript text for a recording.
pub trait RawTranscriptSource: Send {
    fn name(&self) -> &str;
    /// Fetch the full transcript for `source_id`. Fails when the recording
    /// has no available transcript.
    fn fetch_raw(&self, source_id: &str) -> Result<String>;
}

const VIDEO_ID_LEN: usize = 11;

fn is_video_id(s: &str) -> bool {
    s.len() == VIDEO_ID_LEN
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the video id used as cache key from a YouTube locator.
///
/// Accepts `watch?v=`, `youtu.be/`, `shorts/`, `embed/` and `live/` URLs, or
/// a bare 11-character id.
pub fn video_id_from_url(locator: &str) -> Result<String> {
    let locator = locator.trim();
    if is_video_id(locator) {
        return Ok(locator.to_string());
    }

    let parsed = url::Url::parse(locator)
        .map_err(|e| anyhow::anyhow!("Not a valid YouTube URL '{}': {}", locator, e))?;
    let host = parsed.host_str().unwrap_or("");
    let host = host
        .trim_start_matches("www.")
        .trim_start_matches("m.")
        .trim_start_matches("music.");

    let mut segments = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("shorts") | Some("embed") | Some("live") | Some("v") => {
                segments.next().map(str::to_string)
            }
            _ => None,
        },
        _ => None,
    };

    match candidate {
        Some(id) if is_video_id(&id) => Ok(id),
        Some(id) => anyhow::bail!("Malformed YouTube video id '{}' in {}", id, locator),
        None => anyhow::bail!("Could not find a YouTube video id in {}", locator),
    }
}
