//! Audio Acquirer (C2).
//!
//! For a video id, produce a validated 16 kHz mono PCM file on local disk,
//! or report a terminal failure class, per spec.md §4.1. Subprocess
//! invocation mirrors spec.md §6's stable surface: a YouTube extractor run
//! with an ordered client-strategy list, a demuxer/transcoder, and a probe
//! tool, all invoked as external processes rather than decoded in-process
//! (contrast with the teacher's `crates/ingestion`, which decodes via
//! `ffmpeg-next` bindings directly — this module needs process-isolated,
//! timeout-bounded, classifiable subprocess calls instead).
pub mod classify;
pub mod probe;
pub mod subprocess;
pub mod workdir;

use std::path::Path;
use std::time::Duration;

use ingest_common::error::AcquireError;
use ingest_common::model::AudioArtifact;

use workdir::WorkDir;

const MIN_AUDIO_FILE_BYTES: u64 = 50 * 1024;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const DEMUX_TIMEOUT: Duration = Duration::from_secs(60);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const ACCESSIBILITY_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Client strategy list tried in order, per spec.md §6.
const CLIENT_STRATEGIES: &[&str] = &["web", "android", "default"];

#[derive(Clone)]
pub struct AcquirerConfig {
    pub downloader_bin: String,
    pub demuxer_bin: String,
    pub prober_bin: String,
    pub proxy: Option<String>,
    pub cookies_file: Option<String>,
    pub download_retries: u32,
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        Self {
            downloader_bin: "yt-dlp".to_string(),
            demuxer_bin: "ffmpeg".to_string(),
            prober_bin: "ffprobe".to_string(),
            proxy: None,
            cookies_file: None,
            download_retries: 10,
        }
    }
}

/// Download the best audio-only stream for `video_id` into `work_dir`,
/// trying each client strategy in order until one succeeds or all are
/// exhausted. Matches spec.md §4.1 step 2.
async fn download_audio(
    config: &AcquirerConfig,
    video_id: &str,
    work_dir: &Path,
) -> Result<std::path::PathBuf, AcquireError> {
    let output_template = work_dir.join("%(id)s.%(ext)s");
    let mut last_err: Option<AcquireError> = None;

    for client in CLIENT_STRATEGIES {
        let url = format!("https://www.youtube.com/watch?v={video_id}");
        let mut args: Vec<String> = vec![
            "-f".into(),
            "bestaudio".into(),
            "--extractor-args".into(),
            format!("youtube:player_client={client}"),
            "--force-ipv4".into(),
            "--user-agent".into(),
            "Mozilla/5.0".into(),
            "--referer".into(),
            "https://www.youtube.com/".into(),
            "-o".into(),
            output_template.display().to_string(),
        ];
        if let Some(proxy) = &config.proxy {
            args.push("--proxy".into());
            args.push(proxy.clone());
        }
        if let Some(cookies) = &config.cookies_file {
            args.push("--cookies".into());
            args.push(cookies.clone());
        }
        args.push(url);

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        match subprocess::run_with_timeout(&config.downloader_bin, &arg_refs, DOWNLOAD_TIMEOUT).await {
            Ok(out) if out.success => {
                if let Some(found) = find_downloaded_file(work_dir) {
                    return Ok(found);
                }
                last_err = Some(AcquireError::DownloadFailed(
                    "downloader reported success but no output file was found".into(),
                ));
            }
            Ok(out) => {
                if let Some(class) = classify::classify_stderr(&out.stderr) {
                    return Err(match class {
                        ingest_common::error::TerminalClass::Unavailable => {
                            AcquireError::Unavailable(out.stderr)
                        }
                        ingest_common::error::TerminalClass::MembersOnly => {
                            AcquireError::MembersOnly(out.stderr)
                        }
                        ingest_common::error::TerminalClass::RateLimited => {
                            AcquireError::RateLimited(out.stderr)
                        }
                        _ => AcquireError::DownloadFailed(out.stderr),
                    });
                }
                tracing::warn!(video_id, client, stderr = %out.stderr, "download attempt failed, trying next client strategy");
                last_err = Some(AcquireError::DownloadFailed(out.stderr));
            }
            Err(subprocess::SubprocessError::Timeout(d)) => {
                last_err = Some(AcquireError::Timeout(d.as_secs()));
            }
            Err(subprocess::SubprocessError::Spawn(e)) => {
                last_err = Some(AcquireError::Io(e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AcquireError::DownloadFailed("all client strategies exhausted".into())))
}

fn find_downloaded_file(dir: &Path) -> Option<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .find(|p| p.is_file())
}

/// Transcode `input` into a 16 kHz mono PCM s16le WAV at `output`.
async fn demux_to_wav(
    config: &AcquirerConfig,
    input: &Path,
    output: &Path,
) -> Result<(), AcquireError> {
    let args = [
        "-y",
        "-i",
        input.to_str().unwrap_or_default(),
        "-ac",
        "1",
        "-ar",
        "16000",
        "-c:a",
        "pcm_s16le",
        output.to_str().unwrap_or_default(),
    ];
    let out = subprocess::run_with_timeout(&config.demuxer_bin, &args, DEMUX_TIMEOUT)
        .await
        .map_err(|e| match e {
            subprocess::SubprocessError::Timeout(d) => AcquireError::Timeout(d.as_secs()),
            subprocess::SubprocessError::Spawn(io) => AcquireError::Io(io),
        })?;
    if !out.success {
        return Err(AcquireError::DownloadFailed(out.stderr));
    }
    Ok(())
}

/// Validate the demuxed output: exists, is large enough, and has an audio
/// stream when probed. Returns the probed duration on success.
async fn validate_output(config: &AcquirerConfig, path: &Path) -> Result<f64, AcquireError> {
    let metadata = std::fs::metadata(path).map_err(AcquireError::Io)?;
    if metadata.len() < MIN_AUDIO_FILE_BYTES {
        return Err(AcquireError::NoAudio(format!(
            "output file too small: {} bytes",
            metadata.len()
        )));
    }

    let args = [
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
        path.to_str().unwrap_or_default(),
    ];
    let out = subprocess::run_with_timeout(&config.prober_bin, &args, PROBE_TIMEOUT)
        .await
        .map_err(|e| match e {
            subprocess::SubprocessError::Timeout(d) => AcquireError::Timeout(d.as_secs()),
            subprocess::SubprocessError::Spawn(io) => AcquireError::Io(io),
        })?;
    if !out.success {
        return Err(AcquireError::DownloadFailed(out.stderr));
    }
    let parsed = probe::parse_probe_json(&out.stdout)
        .ok_or_else(|| AcquireError::DownloadFailed("could not parse probe output".into()))?;
    if !parsed.has_audio {
        return Err(AcquireError::NoAudio("no audio stream detected by probe".into()));
    }
    Ok(parsed.duration_s.unwrap_or(0.0))
}

/// Full acquisition pipeline for one video id, per spec.md §4.1.
///
/// `temp_base` is the parent directory under which a unique per-call work
/// directory is created; it is removed on every exit path via `WorkDir`'s
/// `Drop` impl. On success, the returned `AudioArtifact`'s path lives inside
/// a directory that is *not* cleaned up (the caller, i.e. the orchestrator's
/// DB worker, deletes it after persistence per spec.md §3's lifecycle note)
/// — callers must move or copy the file out of the scoped work dir before it
/// is dropped, or retain the `WorkDir` guard alongside the artifact.
pub async fn acquire(
    config: &AcquirerConfig,
    temp_base: &Path,
    video_id: &str,
) -> Result<(AudioArtifact, WorkDir), AcquireError> {
    let work_dir = WorkDir::create(temp_base, video_id)?;

    let downloaded = download_audio(config, video_id, work_dir.path()).await?;
    let wav_path = work_dir.path().join(format!("{video_id}.wav"));
    demux_to_wav(config, &downloaded, &wav_path).await?;
    let duration_s = validate_output(config, &wav_path).await?;

    Ok((AudioArtifact::new(wav_path, duration_s), work_dir))
}

/// Pre-filtering accessibility probe, per spec.md §4.8: a simulated
/// download (`--simulate --skip-download`, never writing a file) that
/// reports whether `video_id` is reachable, reusing `download_audio`'s own
/// stderr classification. Returns `Some(class)` for a classified terminal
/// failure (`MembersOnly`/`Unavailable`/...), `None` when the video looks
/// accessible or the probe itself is inconclusive (timeout, spawn failure,
/// an unclassified error) — an inconclusive probe must never drop a video
/// that a real download attempt might still succeed on.
pub async fn probe_accessibility(config: &AcquirerConfig, video_id: &str) -> Option<ingest_common::error::TerminalClass> {
    let url = format!("https://www.youtube.com/watch?v={video_id}");
    let mut args: Vec<String> = vec!["--simulate".into(), "--skip-download".into(), "--no-warnings".into()];
    if let Some(proxy) = &config.proxy {
        args.push("--proxy".into());
        args.push(proxy.clone());
    }
    args.push(url);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

    match subprocess::run_with_timeout(&config.downloader_bin, &arg_refs, ACCESSIBILITY_PROBE_TIMEOUT).await {
        Ok(out) if out.success => None,
        Ok(out) => classify::classify_stderr(&out.stderr),
        Err(e) => {
            tracing::debug!(video_id, error = %e, "accessibility probe inconclusive, keeping video");
            None
        }
    }
}

/// Content-hash dedup key, per spec.md §9's open question: `md5(video_id +
/// publish_time_iso? + md5(first_120s_of_audio)?)`. This is a cheap
/// intra-run dedup, not a cryptographic contract — callers keep the result
/// in an in-run `HashSet`, never persisted.
#[must_use]
pub fn content_hash(video_id: &str, publish_time_iso: Option<&str>, first_120s_digest: Option<&str>) -> String {
    use md5::{Digest, Md5};
    let mut hasher = Md5::new();
    hasher.update(video_id.as_bytes());
    if let Some(pt) = publish_time_iso {
        hasher.update(pt.as_bytes());
    }
    if let Some(digest) = first_120s_digest {
        hasher.update(digest.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// MD5 digest of the first 120 s of PCM samples in an already-demuxed WAV,
/// used as an input to `content_hash`.
#[must_use]
pub fn first_120s_digest(samples: &[i16]) -> String {
    use md5::{Digest, Md5};
    const SAMPLE_RATE: usize = 16_000;
    const WINDOW: usize = SAMPLE_RATE * 120;
    let slice = &samples[..samples.len().min(WINDOW)];
    let mut hasher = Md5::new();
    for s in slice {
        hasher.update(s.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accessibility_probe_is_inconclusive_on_spawn_failure() {
        let config = AcquirerConfig { downloader_bin: "definitely-not-a-real-binary".into(), ..AcquirerConfig::default() };
        assert_eq!(probe_accessibility(&config, "abc123").await, None);
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash("abc123", Some("2024-01-01T00:00:00Z"), Some("deadbeef"));
        let b = content_hash("abc123", Some("2024-01-01T00:00:00Z"), Some("deadbeef"));
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_by_video_id() {
        let a = content_hash("abc123", None, None);
        let b = content_hash("xyz789", None, None);
        assert_ne!(a, b);
    }

    #[test]
    fn first_120s_digest_truncates_long_input() {
        let short = vec![0i16; 1000];
        let long = vec![0i16; 16_000 * 200];
        // The long sample beyond 120s of silence should still hash the same
        // as a 120s-exact all-zero buffer, proving it truncates.
        let exact = vec![0i16; 16_000 * 120];
        assert_eq!(first_120s_digest(&long), first_120s_digest(&exact));
        assert_ne!(first_120s_digest(&short), first_120s_digest(&exact));
    }
}
