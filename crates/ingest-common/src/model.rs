//! Shared data model for the ingestion pipeline.
use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::speaker_label::SpeakerLabel;

/// Immutable input describing one video to ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub id: String,
    pub title: String,
    pub publish_time: Option<DateTime<Utc>>,
    pub duration_s: Option<f64>,
    pub channel: Option<String>,
    pub view_count: Option<u64>,
    pub tags: Option<Vec<String>>,
}

impl VideoDescriptor {
    /// `id` must be non-empty and at most 32 characters, per the data model.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && self.id.len() <= 32
    }
}

/// A validated local audio file produced by the acquirer (C2).
///
/// Owned exclusively by whichever in-flight video produced it; the orchestrator
/// is responsible for deleting the file at `path` on every terminal outcome.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub codec: &'static str,
    pub sample_rate: u32,
    pub channels: u8,
    pub duration_s: f64,
    pub content_fingerprint: Option<String>,
}

impl AudioArtifact {
    #[must_use]
    pub fn new(path: PathBuf, duration_s: f64) -> Self {
        Self {
            path,
            codec: "pcm_s16le",
            sample_rate: 16_000,
            channels: 1,
            duration_s,
            content_fingerprint: None,
        }
    }
}

/// A single transcribed word with timing and optional speaker attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
    pub confidence: Option<f32>,
    pub speaker_label: Option<SpeakerLabel>,
    /// True when more than one diarization turn overlapped this word.
    pub is_overlap: bool,
}

impl Word {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start_s <= self.end_s && !self.text.trim().is_empty()
    }
}

/// A non-overlapping diarization turn (exclusive mode).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiarizationTurn {
    pub start_s: f64,
    pub end_s: f64,
    pub cluster_id: i64,
}

impl DiarizationTurn {
    #[must_use]
    pub fn duration_s(&self) -> f64 {
        (self.end_s - self.start_s).max(0.0)
    }

    #[must_use]
    pub fn contains_midpoint(&self, midpoint: f64) -> bool {
        self.start_s <= midpoint && midpoint < self.end_s
    }
}

/// Quality metrics reported by the ASR engine for one segment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AsrQuality {
    pub avg_logprob: Option<f32>,
    pub compression_ratio: Option<f32>,
    pub no_speech_prob: Option<f32>,
}

/// One segment emitted by the ASR engine before speaker boundary splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
    pub words: Vec<Word>,
    pub quality: AsrQuality,
    pub re_asr: bool,
    pub needs_refinement: bool,
}

/// Output of C5: a speaker assigned to one diarization cluster (or sub-chunk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub speaker_label: SpeakerLabel,
    pub confidence: f32,
    pub margin: f32,
    pub cluster_id: i64,
    pub voice_embedding: Option<Vec<f32>>,
}

/// The persisted transcript unit, output of the Segment Builder (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
    pub speaker_label: SpeakerLabel,
    pub speaker_confidence: Option<f32>,
    pub asr_quality: AsrQuality,
    pub re_asr: bool,
    pub needs_refinement: bool,
    pub is_overlap: bool,
    pub embedding: Option<Vec<f32>>,
}

impl TranscriptSegment {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start_s < self.end_s && !self.text.trim().is_empty()
    }
}

/// A persisted speaker voice centroid, read-only at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub name: String,
    pub centroid: Vec<f32>,
    pub threshold: f32,
    pub metadata: HashMap<String, String>,
}

impl VoiceProfile {
    /// Returns an L2-normalised copy of the centroid.
    #[must_use]
    pub fn normalised_centroid(&self) -> Vec<f32> {
        l2_normalise(&self.centroid)
    }
}

/// L2-normalise a vector; returns the input unchanged if its norm is ~0.
#[must_use]
pub fn l2_normalise(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < 1e-12 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na < 1e-12 || nb < 1e-12 {
        return 0.0;
    }
    dot / (na * nb)
}

/// A persisted source row, unique by `external_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub external_id: String,
    pub title: String,
    pub source_kind: String,
    pub publish_time: Option<DateTime<Utc>>,
    pub duration_s: Option<f64>,
    pub counters: HashMap<String, i64>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub provenance_metadata: serde_json::Value,
}

/// A persisted embedding row, unique on `(segment_id, model_key)`.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub segment_id: i64,
    pub model_key: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// In-memory, per-run counters. Protected by a single mutex at the
/// orchestrator level; all updates here are simple integer adds.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IngestionStats {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub errored: u64,
    pub no_audio: u64,

    pub unavailable: u64,
    pub members_only: u64,
    pub rate_limited: u64,
    pub download_failed: u64,
    pub asr_failed: u64,
    pub persist_failed: u64,

    pub fast_short_count: u64,
    pub interview_count: u64,
    pub long_monologue_count: u64,

    pub segments_known: u64,
    pub segments_guest: u64,
    pub segments_unknown: u64,

    pub q1_peak: usize,
    pub q2_peak: usize,

    pub total_processing_time_s: f64,
    pub total_audio_s: f64,
}

impl IngestionStats {
    #[must_use]
    pub fn real_time_factor(&self) -> f64 {
        if self.total_audio_s <= 0.0 {
            return 0.0;
        }
        self.total_processing_time_s / self.total_audio_s
    }

    #[must_use]
    pub fn hours_per_hour(&self) -> f64 {
        let rtf = self.real_time_factor();
        if rtf <= 0.0 {
            return 0.0;
        }
        1.0 / rtf
    }

    /// Hours of a 1200-hour corpus this run's observed throughput would cover
    /// in 24 wall-clock hours.
    #[must_use]
    pub fn projected_24h_hours(&self) -> f64 {
        self.hours_per_hour() * 24.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_descriptor_id_length_bound() {
        let short = VideoDescriptor {
            id: "abc123".into(),
            title: "t".into(),
            publish_time: None,
            duration_s: None,
            channel: None,
            view_count: None,
            tags: None,
        };
        assert!(short.is_valid());

        let long = VideoDescriptor {
            id: "x".repeat(33),
            ..short
        };
        assert!(!long.is_valid());
    }

    #[test]
    fn transcript_segment_invariants() {
        let seg = TranscriptSegment {
            start_s: 1.0,
            end_s: 2.0,
            text: "hello".into(),
            speaker_label: SpeakerLabel::Unknown,
            speaker_confidence: None,
            asr_quality: AsrQuality::default(),
            re_asr: false,
            needs_refinement: false,
            is_overlap: false,
            embedding: None,
        };
        assert!(seg.is_valid());

        let empty = TranscriptSegment {
            text: "   ".into(),
            ..seg
        };
        assert!(!empty.is_valid());
    }

    #[test]
    fn l2_normalise_unit_norm() {
        let v = vec![3.0, 4.0];
        let n = l2_normalise(&v);
        let norm = n.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_identical_vectors() {
        let v = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn real_time_factor_zero_audio() {
        let stats = IngestionStats::default();
        assert_eq!(stats.real_time_factor(), 0.0);
    }
}
