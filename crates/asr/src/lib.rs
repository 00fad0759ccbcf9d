//! ASR Engine (C3): two-stage routing and refinement, per spec.md §4.2.
pub mod backend;
pub mod refine;
pub mod router;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ingest_common::config::AsrConfig;
use ingest_common::model::Word;

use backend::{AsrBackend, BackendError, RawSegment};
use router::Preset;

#[derive(Debug, thiserror::Error)]
pub enum AsrEngineError {
    #[error("stage 1 transcription failed: {0}")]
    Stage1Failed(String),
}

/// Output of the full two-stage engine, matching spec.md §4.2's contract.
pub struct TranscriptionResult {
    pub segments: Vec<RawSegment>,
    pub words: Vec<Word>,
    pub language: Option<String>,
    pub audio_duration_s: f64,
    pub processing_time_s: f64,
}

impl TranscriptionResult {
    #[must_use]
    pub fn real_time_factor(&self) -> f64 {
        if self.audio_duration_s <= 0.0 {
            return 0.0;
        }
        self.processing_time_s / self.audio_duration_s
    }
}

pub struct AsrEngine {
    primary: Arc<dyn AsrBackend>,
    refine: Arc<dyn AsrBackend>,
    config: AsrConfig,
}

impl AsrEngine {
    #[must_use]
    pub fn new(primary: Arc<dyn AsrBackend>, refine: Arc<dyn AsrBackend>, config: AsrConfig) -> Self {
        Self { primary, refine, config }
    }

    /// Transcribe `audio_path`. Returns `None` (per spec.md §4.2's failure
    /// semantics: "if stage 1 fails ... the orchestrator treats the video as
    /// errored") when stage 1 itself fails; a stage 2 failure on an
    /// individual span degrades to keeping the original segments and is
    /// logged as a warning, never surfaced as an engine failure.
    pub async fn transcribe(
        &self,
        audio_path: &Path,
        audio_duration_s: f64,
        is_interview: bool,
    ) -> Result<TranscriptionResult, AsrEngineError> {
        let started = Instant::now();
        let duration_minutes = audio_duration_s / 60.0;
        let preset = router::route(&self.config, duration_minutes, is_interview);

        let stage1 = self
            .primary
            .transcribe(audio_path, &preset)
            .await
            .map_err(|e| AsrEngineError::Stage1Failed(e.to_string()))?;

        let mut segments = stage1.segments;

        if self.config.qa_two_pass {
            self.refine_low_quality_spans(audio_path, &mut segments).await;
        }

        let words: Vec<Word> = segments.iter().flat_map(|s| s.words.clone()).collect();
        let processing_time_s = started.elapsed().as_secs_f64();

        Ok(TranscriptionResult {
            segments,
            words,
            language: stage1.language,
            audio_duration_s,
            processing_time_s,
        })
    }

    async fn refine_low_quality_spans(&self, audio_path: &Path, segments: &mut Vec<RawSegment>) {
        let spans = refine::compute_refinement_spans(&self.config, segments.as_mut_slice());
        if spans.is_empty() {
            return;
        }

        let refine_preset = Preset {
            kind: router::PresetKind::Interview,
            model_key: self.config.whisper_refine_model.clone(),
            compute: self.config.whisper_compute.clone(),
            beam_size: self.config.qa_retry_beam,
            temperature_schedule: self.config.qa_retry_temps.clone(),
            max_chunk_len_s: self.config.whisper_chunk,
            word_timestamps: true,
        };

        for span in &spans {
            match extract_subaudio(audio_path, span.start_s, span.end_s).await {
                Ok(sub_path) => match self.refine.transcribe(&sub_path, &refine_preset).await {
                    Ok(refined) => {
                        let text = refined
                            .segments
                            .iter()
                            .map(|s| s.text.as_str())
                            .collect::<Vec<_>>()
                            .join(" ");
                        refine::apply_span_replacement(segments, span, text);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, start_s = span.start_s, end_s = span.end_s, "stage 2 refinement failed, keeping original segments");
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, start_s = span.start_s, end_s = span.end_s, "failed to extract refinement sub-audio, keeping original segments");
                }
            }
        }
    }
}

async fn extract_subaudio(audio_path: &Path, start_s: f64, end_s: f64) -> Result<std::path::PathBuf, BackendError> {
    let out_path = std::env::temp_dir().join(format!(
        "refine-{:x}-{start_s:.2}-{end_s:.2}.wav",
        rough_hash(audio_path)
    ));
    let out = tokio::process::Command::new("ffmpeg")
        .args([
            "-y",
            "-i",
            audio_path.to_str().unwrap_or_default(),
            "-ss",
            &start_s.to_string(),
            "-to",
            &end_s.to_string(),
            "-ac",
            "1",
            "-ar",
            "16000",
            "-c:a",
            "pcm_s16le",
            out_path.to_str().unwrap_or_default(),
        ])
        .kill_on_drop(true)
        .output()
        .await?;
    if !out.status.success() {
        return Err(BackendError::Inference(String::from_utf8_lossy(&out.stderr).into_owned()));
    }
    Ok(out_path)
}

fn rough_hash(p: &Path) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut h = DefaultHasher::new();
    p.hash(&mut h);
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::FakeBackend;
    use ingest_common::model::AsrQuality;

    fn cfg(two_pass: bool) -> AsrConfig {
        AsrConfig {
            whisper_model: "medium.en".into(),
            whisper_refine_model: "large-v3".into(),
            whisper_device: "cuda".into(),
            whisper_compute: "float16".into(),
            whisper_beam: 5,
            whisper_chunk: 30,
            whisper_temps: vec![0.0],
            whisper_vad: true,
            whisper_lang: None,
            domain_prompt: None,
            qa_low_logprob: -0.35,
            qa_low_compression: 2.4,
            qa_two_pass: two_pass,
            qa_retry_beam: 8,
            qa_retry_temps: vec![0.0],
        }
    }

    #[tokio::test]
    async fn stage1_only_when_no_refinement_needed() {
        let good = AsrQuality { avg_logprob: Some(-0.1), compression_ratio: Some(1.5), no_speech_prob: Some(0.1) };
        let primary = Arc::new(FakeBackend {
            segments: vec![RawSegment {
                start_s: 0.0,
                end_s: 5.0,
                text: "hello world".into(),
                words: vec![],
                quality: good,
                re_asr: false,
                needs_refinement: false,
            }],
        });
        let refine = Arc::new(FakeBackend { segments: vec![] });
        let engine = AsrEngine::new(primary, refine, cfg(true));

        let result = engine.transcribe(Path::new("/tmp/fake.wav"), 5.0, false).await.unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].text, "hello world");
        assert!(!result.segments[0].re_asr);
    }

    #[tokio::test]
    async fn real_time_factor_computation() {
        let primary = Arc::new(FakeBackend { segments: vec![] });
        let refine = Arc::new(FakeBackend { segments: vec![] });
        let engine = AsrEngine::new(primary, refine, cfg(false));
        let result = engine.transcribe(Path::new("/tmp/fake.wav"), 10.0, false).await.unwrap();
        assert!(result.real_time_factor() >= 0.0);
    }
}
