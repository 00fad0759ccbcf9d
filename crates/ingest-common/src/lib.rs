//! Shared types, configuration, and error taxonomy for the ingestion pipeline.
pub mod config;
pub mod error;
pub mod model;
pub mod speaker_label;

pub use config::IngestConfig;
pub use model::*;
pub use speaker_label::SpeakerLabel;

/// Cluster-level evidence collected during speaker identification (C5).
///
/// Replaces the mixed-type "embedding list" pattern (numeric vectors with an
/// occasional `('split_cluster', ...)` sentinel) from the original
/// implementation with a tagged variant, per spec.md DESIGN NOTES §9. The
/// cluster-level mean is computed only over `EmbeddingVec` entries; the
/// presence of any `OverMergeMarker` forces per-segment identification.
#[derive(Debug, Clone)]
pub enum ClusterEvidence {
    EmbeddingVec(Vec<f32>),
    OverMergeMarker,
}

impl ClusterEvidence {
    #[must_use]
    pub fn as_embedding(&self) -> Option<&[f32]> {
        match self {
            Self::EmbeddingVec(v) => Some(v),
            Self::OverMergeMarker => None,
        }
    }

    #[must_use]
    pub fn is_over_merge_marker(&self) -> bool {
        matches!(self, Self::OverMergeMarker)
    }
}
