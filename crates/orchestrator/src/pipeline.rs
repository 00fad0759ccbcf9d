//! Per-video processing chain (C9), wiring the Audio Acquirer through the
//! Persistence Layer, per spec.md §4.8's stage list:
//! `acquire -> asr -> diarize -> identify -> segment -> embed -> persist`.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ingest_acquirer::workdir::WorkDir;
use ingest_acquirer::AcquirerConfig;
use ingest_asr::{router, AsrEngine};
use ingest_common::config::IngestConfig;
use ingest_common::error::TerminalClass;
use ingest_common::model::{AsrSegment, AudioArtifact, SourceRecord, TranscriptSegment, VideoDescriptor};
use ingest_diarization::{self as diarization, DiarizationBackend, DiarizationParams, IdentifyContext, VoiceEmbedder};
use ingest_embeddings::EmbeddingBatcher;
use ingest_storage::{PersistOptions, Storage};
use ingest_voices::VoiceProfileStore;
use tokio::sync::Mutex;

use crate::skip::ContentHashDedup;
use crate::types::{VideoOutcome, VideoState};

/// A video that has cleared acquisition, handed from an I/O worker to an
/// ASR worker over Q1.
pub struct AcquiredVideo {
    pub video: VideoDescriptor,
    pub artifact: AudioArtifact,
    pub work_dir: WorkDir,
    pub started: Instant,
}

/// A video whose GPU-bound stages (ASR, diarization, identification,
/// segmentation, embedding) are all complete, handed from an ASR worker to
/// a DB worker over Q2. All of these stages share the same `AsrEngine`
/// pool-sizing rationale in spec.md §4.8 ("ASR workers ... drives the
/// single GPU serially"): diarization and embedding contend for the same
/// GPU lock, so they run inside the ASR worker pool rather than a queue
/// stage of their own.
pub struct AnalyzedVideo {
    pub video: VideoDescriptor,
    pub artifact: AudioArtifact,
    pub preset_kind: router::PresetKind,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub started: Instant,
}

/// Everything a worker needs to process one video, shared read-only (or
/// behind internal locking/pooling) across every worker in every pool.
pub struct PipelineServices {
    pub config: Arc<IngestConfig>,
    pub acquirer_config: Arc<AcquirerConfig>,
    pub temp_base: PathBuf,
    pub asr: Arc<AsrEngine>,
    pub diarization_backend: Arc<dyn DiarizationBackend>,
    pub voice_embedder: Arc<dyn VoiceEmbedder>,
    pub voices: &'static VoiceProfileStore,
    pub embeddings: Arc<EmbeddingBatcher>,
    pub storage: Arc<Storage>,
}

/// First 60 s of transcript text, used by `router::looks_like_interview` to
/// drive the diarization speaker-count hint. ASR's own preset routing for
/// this same video already ran with `is_interview=false`: the duration
/// bucket alone decides `FastShort` for anything under 20 minutes, and
/// `Interview` vs `LongMonologue` differ only in `max_chunk_len_s`, so
/// re-routing after the fact is unnecessary — only diarization needs this
/// value, via `auto_hints`.
fn first_60s_text(words: &[ingest_common::model::Word]) -> String {
    words
        .iter()
        .filter(|w| w.start_s < 60.0)
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// I/O worker stage: acquire the audio artifact for one video, then check it
/// against the in-run content-hash dedup set (spec.md §4.8/§9: "Content-hash
/// skip (optional)"). Produces the Q1 item consumed by an ASR worker.
pub async fn acquire_stage(
    services: &PipelineServices,
    video: VideoDescriptor,
    dedup: &Mutex<ContentHashDedup>,
) -> Result<AcquiredVideo, VideoOutcome> {
    let started = Instant::now();
    match ingest_acquirer::acquire(&services.acquirer_config, &services.temp_base, &video.id).await {
        Ok((artifact, work_dir)) => {
            let publish_time_iso = video.publish_time.map(|t| t.to_rfc3339());
            let hash = ingest_acquirer::content_hash(&video.id, publish_time_iso.as_deref(), None);
            if dedup.lock().await.check_and_insert(hash) {
                tracing::info!(video_id = %video.id, "content-hash duplicate, skipping");
                return Err(VideoOutcome::skipped(video.id));
            }
            Ok(AcquiredVideo { video, artifact, work_dir, started })
        }
        Err(e) => {
            tracing::warn!(video_id = %video.id, error = %e, "acquisition failed");
            Err(VideoOutcome::errored(video.id, e.terminal_class()))
        }
    }
}

/// ASR worker stage: transcription, diarization, speaker identification,
/// segment building, and embedding, all behind the single GPU lock. Produces
/// the Q2 item consumed by a DB worker.
pub async fn analyze_stage(services: &PipelineServices, acquired: AcquiredVideo) -> Result<AnalyzedVideo, VideoOutcome> {
    let AcquiredVideo { video, artifact, work_dir, started } = acquired;

    let transcription = match services.asr.transcribe(&artifact.path, artifact.duration_s, false).await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(video_id = %video.id, error = %e, "asr stage 1 failed");
            return Err(VideoOutcome::errored(video.id, TerminalClass::AsrFailed));
        }
    };

    let is_interview = router::looks_like_interview(&first_60s_text(&transcription.words));
    let preset_kind = router::route(&services.config.asr, artifact.duration_s / 60.0, is_interview).kind;

    let hints = diarization::auto_hints(is_interview);
    let params = DiarizationParams {
        clustering_threshold: services.config.diarization.pyannote_clustering_threshold,
        ..DiarizationParams::default()
    };
    let turns = diarization::diarize(
        services.diarization_backend.as_ref(),
        &artifact.path,
        artifact.duration_s,
        hints,
        params,
    )
    .await;

    let identify_ctx = IdentifyContext {
        profiles: services.voices.profiles(),
        known_profile: services.voices.find(&services.config.speaker_id.known_name),
        config: &services.config.speaker_id,
    };
    let speaker_segments =
        diarization::identify(services.voice_embedder.as_ref(), &artifact.path, &turns, &identify_ctx).await;

    let mut asr_segments: Vec<AsrSegment> = transcription.segments.into_iter().map(AsrSegment::from).collect();
    for asr_seg in &mut asr_segments {
        diarization::attribute_words(&mut asr_seg.words, &turns, &speaker_segments, &services.config.speaker_id);
        if let Some(majority) = diarization::majority_label(&asr_seg.words) {
            tracing::debug!(video_id = %video.id, start_s = asr_seg.start_s, speaker = %majority, "asr segment word-majority speaker");
        }
    }
    let mut transcript_segments =
        ingest_segments::build_segments(&asr_segments, &speaker_segments, &turns, &services.config.segment_builder);

    match services.embeddings.embed_segments(&transcript_segments).await {
        Ok(embedded) => {
            for (seg, emb) in transcript_segments.iter_mut().zip(embedded) {
                seg.embedding = emb;
            }
        }
        Err(e) => {
            tracing::warn!(video_id = %video.id, error = %e, "embedding failed, persisting segments without vectors");
        }
    }

    // The scoped work dir is no longer needed once its file has been
    // consumed by every upstream stage; drop it explicitly so the disk
    // space is reclaimed before the (potentially slow) persistence call.
    drop(work_dir);

    Ok(AnalyzedVideo { video, artifact, preset_kind, transcript_segments, started })
}

/// DB worker stage: persist the video's source row, segments, and
/// embeddings as a single transaction, and produce the final outcome.
/// `processing_time_s` is measured from `analyzed.started`, i.e. from the
/// moment acquisition began for this video, not from when it reached this
/// stage.
pub async fn persist_stage(services: &PipelineServices, analyzed: AnalyzedVideo) -> VideoOutcome {
    let AnalyzedVideo { video, artifact, preset_kind, transcript_segments, started } = analyzed;
    let processing_time_s = started.elapsed().as_secs_f64();

    let source = SourceRecord {
        external_id: video.id.clone(),
        title: video.title.clone(),
        source_kind: "youtube".to_string(),
        publish_time: video.publish_time,
        duration_s: Some(artifact.duration_s),
        counters: std::collections::HashMap::new(),
        url: None,
        tags: video.tags.clone(),
        provenance_metadata: serde_json::json!({ "preset": format!("{preset_kind:?}") }),
    };
    let opts = PersistOptions { store_known_only: services.config.embedding.embed_known_only };

    match services
        .storage
        .persist_video(
            &source,
            &transcript_segments,
            services.embeddings.model_key(),
            &services.config.speaker_id.known_name,
            opts,
        )
        .await
    {
        Ok(stats) => VideoOutcome {
            external_id: video.id,
            state: VideoState::Done,
            terminal_class: None,
            preset_kind: Some(preset_kind),
            segments_known: stats.segments_known,
            segments_guest: stats.segments_guest,
            segments_unknown: stats.segments_unknown,
            audio_duration_s: artifact.duration_s,
            processing_time_s,
        },
        Err(e) => {
            tracing::error!(video_id = %video.id, error = %e, "persistence failed");
            VideoOutcome::errored(video.id, TerminalClass::PersistFailed)
        }
    }
}

/// Run the full acquire -> asr -> diarize -> identify -> segment -> embed ->
/// persist chain for one video in a single call (used by tests and by any
/// caller that doesn't need cross-stage pipelining). Never panics; every
/// failure is mapped to a terminal `VideoOutcome`.
pub async fn process_video(services: &PipelineServices, video: &VideoDescriptor) -> VideoOutcome {
    let dedup = Mutex::new(ContentHashDedup::new());
    let acquired = match acquire_stage(services, video.clone(), &dedup).await {
        Ok(a) => a,
        Err(outcome) => return outcome,
    };
    let analyzed = match analyze_stage(services, acquired).await {
        Ok(a) => a,
        Err(outcome) => return outcome,
    };
    persist_stage(services, analyzed).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_60s_text_excludes_later_words() {
        let words = vec![
            ingest_common::model::Word { start_s: 10.0, end_s: 10.5, text: "early".into(), confidence: None, speaker_label: None, is_overlap: false },
            ingest_common::model::Word { start_s: 90.0, end_s: 90.5, text: "late".into(), confidence: None, speaker_label: None, is_overlap: false },
        ];
        let text = first_60s_text(&words);
        assert!(text.contains("early"));
        assert!(!text.contains("late"));
    }
}
