//! Parse the probe tool's JSON output for audio-stream presence and duration.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

pub struct ProbeResult {
    pub has_audio: bool,
    pub duration_s: Option<f64>,
}

/// Parse ffprobe-style JSON (`format.duration`, `streams[].codec_type`).
#[must_use]
pub fn parse_probe_json(raw: &str) -> Option<ProbeResult> {
    let parsed: ProbeOutput = serde_json::from_str(raw).ok()?;
    let has_audio = parsed.streams.iter().any(|s| s.codec_type == "audio");
    let duration_s = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok());
    Some(ProbeResult { has_audio, duration_s })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_audio_stream_and_duration() {
        let raw = r#"{
            "streams": [{"codec_type": "audio"}],
            "format": {"duration": "123.456000"}
        }"#;
        let result = parse_probe_json(raw).unwrap();
        assert!(result.has_audio);
        assert!((result.duration_s.unwrap() - 123.456).abs() < 1e-6);
    }

    #[test]
    fn video_only_stream_has_no_audio() {
        let raw = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "10.0"}}"#;
        let result = parse_probe_json(raw).unwrap();
        assert!(!result.has_audio);
    }

    #[test]
    fn malformed_json_returns_none() {
        assert!(parse_probe_json("not json").is_none());
    }
}
