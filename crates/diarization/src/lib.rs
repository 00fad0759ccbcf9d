//! Diarization Engine (C4) and Speaker Identification (C5).
pub mod embed;
pub mod identify;
pub mod turns;
pub mod windows;

pub use embed::{embed_batched, EmbedError, OnnxVoiceEmbedder, VoiceEmbedder};
pub use identify::{attribute_words, identify, majority_label, IdentifyContext};
pub use turns::{
    auto_hints, diarize, fallback_single_turn, is_exclusive, DiarizationBackend, DiarizationParams, DiarizeError,
    PyannoteBackend, SpeakerHints,
};
