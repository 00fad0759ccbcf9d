//! Input-selection glue for the CLI's `--from-url`/`--from-json`/
//! `--from-files`/`--channel-url` flags (spec.md §6). Channel enumeration
//! itself is an external collaborator (spec.md §1's Non-goals list
//! "local-file listing" and channel listing as out of scope); this module
//! only turns already-resolved input into `VideoDescriptor`s.
use std::path::Path;

use anyhow::{bail, Context, Result};
use ingest_common::model::VideoDescriptor;
use serde::Deserialize;

/// Accepts a bare video id, a `youtube.com/watch?v=...` URL, or a
/// `youtu.be/...` short link.
#[must_use]
pub fn extract_video_id(url_or_id: &str) -> String {
    let trimmed = url_or_id.trim();
    if let Some(rest) = trimmed.split("youtu.be/").nth(1) {
        return rest.split(['?', '&']).next().unwrap_or(rest).to_string();
    }
    if let Some(query_start) = trimmed.find("watch?v=") {
        let rest = &trimmed[query_start + "watch?v=".len()..];
        return rest.split('&').next().unwrap_or(rest).to_string();
    }
    trimmed.to_string()
}

/// One entry in a `--from-json` file: a relaxed subset of `VideoDescriptor`,
/// letting callers supply only what they know ahead of acquisition.
#[derive(Debug, Deserialize)]
struct JsonVideoEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    publish_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    duration_s: Option<f64>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl From<JsonVideoEntry> for VideoDescriptor {
    fn from(entry: JsonVideoEntry) -> Self {
        Self {
            title: entry.title.clone().unwrap_or_else(|| entry.id.clone()),
            id: entry.id,
            publish_time: entry.publish_time,
            duration_s: entry.duration_s,
            channel: entry.channel,
            view_count: entry.view_count,
            tags: entry.tags,
        }
    }
}

/// Load candidates from a JSON file containing an array of video entries.
pub fn load_from_json(path: &Path) -> Result<Vec<VideoDescriptor>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading --from-json file {}", path.display()))?;
    let entries: Vec<JsonVideoEntry> =
        serde_json::from_str(&contents).with_context(|| format!("parsing --from-json file {}", path.display()))?;
    Ok(entries.into_iter().map(VideoDescriptor::from).collect())
}

/// Load candidates from a plain-text file, one id or URL per line. Blank
/// lines and `#`-prefixed comments are skipped.
pub fn load_from_files(path: &Path) -> Result<Vec<VideoDescriptor>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading --from-files file {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| minimal_descriptor(&extract_video_id(line)))
        .collect())
}

/// Load candidates given directly via one or more `--from-url` flags.
#[must_use]
pub fn load_from_urls(urls: &[String]) -> Vec<VideoDescriptor> {
    urls.iter().map(|u| minimal_descriptor(&extract_video_id(u))).collect()
}

fn minimal_descriptor(id: &str) -> VideoDescriptor {
    VideoDescriptor {
        id: id.to_string(),
        title: id.to_string(),
        publish_time: None,
        duration_s: None,
        channel: None,
        view_count: None,
        tags: None,
    }
}

/// `--channel-url` names a source whose enumeration happens outside this
/// workspace (spec.md §1); the CLI can only refuse cleanly when it's passed
/// without a resolved listing to accompany it.
pub fn reject_unresolved_channel_url(channel_url: Option<&str>, have_other_input: bool) -> Result<()> {
    if channel_url.is_some() && !have_other_input {
        bail!(
            "--channel-url only names a source; channel enumeration is an external collaborator. \
             Pass the already-listed videos via --from-json or --from-files alongside it."
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_watch_url() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=abc123&t=5s"), "abc123");
    }

    #[test]
    fn extracts_id_from_short_link() {
        assert_eq!(extract_video_id("https://youtu.be/abc123?t=5"), "abc123");
    }

    #[test]
    fn passes_through_bare_id() {
        assert_eq!(extract_video_id("abc123"), "abc123");
    }

    #[test]
    fn channel_url_alone_is_rejected() {
        assert!(reject_unresolved_channel_url(Some("https://youtube.com/@x"), false).is_err());
        assert!(reject_unresolved_channel_url(Some("https://youtube.com/@x"), true).is_ok());
        assert!(reject_unresolved_channel_url(None, false).is_ok());
    }
}
