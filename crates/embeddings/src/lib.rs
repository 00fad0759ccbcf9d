//! Embedding Batcher (C7), per spec.md §4.6.
pub mod backend;

use std::sync::Arc;
use std::time::Instant;

use ingest_common::config::EmbeddingConfig;
use ingest_common::model::{l2_normalise, TranscriptSegment};
use once_cell::sync::OnceCell;

pub use backend::{EmbedTextError, OnnxTextEmbedder, TextEmbedder};

static GLOBAL_EMBEDDER: OnceCell<Arc<dyn TextEmbedder>> = OnceCell::new();

/// Load the process-wide embedding model exactly once. Subsequent calls
/// return the cached instance regardless of `loader`, mirroring
/// `VoiceProfileStore::global`'s singleton pattern.
pub fn global_embedder(
    loader: impl FnOnce() -> Result<Arc<dyn TextEmbedder>, EmbedTextError>,
) -> Result<Arc<dyn TextEmbedder>, EmbedTextError> {
    if let Some(existing) = GLOBAL_EMBEDDER.get() {
        return Ok(existing.clone());
    }
    let embedder = loader()?;
    Ok(GLOBAL_EMBEDDER.get_or_init(|| embedder).clone())
}

/// Attempt to place the primary embedder on GPU; on any failure, log a
/// warning and fall back to a CPU-loaded variant. `gpu_loader`/`cpu_loader`
/// are provided by the caller since the concrete backend (ONNX session,
/// device selection) lives outside this crate's model-agnostic glue.
pub fn load_with_gpu_fallback(
    want_gpu: bool,
    gpu_loader: impl FnOnce() -> Result<Arc<dyn TextEmbedder>, EmbedTextError>,
    cpu_loader: impl FnOnce() -> Result<Arc<dyn TextEmbedder>, EmbedTextError>,
) -> Result<Arc<dyn TextEmbedder>, EmbedTextError> {
    if want_gpu {
        match gpu_loader() {
            Ok(embedder) => return Ok(embedder),
            Err(e) => tracing::warn!(error = %e, "GPU embedding model load failed, falling back to CPU"),
        }
    }
    cpu_loader()
}

/// Load an optional reranker; on out-of-memory, retry with `fallback_loader`
/// (a smaller variant), per spec.md §4.6.
pub fn load_reranker_with_oom_fallback(
    loader: impl FnOnce() -> Result<Arc<dyn TextEmbedder>, EmbedTextError>,
    fallback_loader: impl FnOnce() -> Result<Arc<dyn TextEmbedder>, EmbedTextError>,
) -> Result<Arc<dyn TextEmbedder>, EmbedTextError> {
    match loader() {
        Ok(embedder) => Ok(embedder),
        Err(EmbedTextError::OutOfMemory(variant)) => {
            tracing::warn!(variant, "reranker out of memory, retrying with a smaller variant");
            fallback_loader()
        }
        Err(e) => Err(e),
    }
}

pub struct EmbeddingBatcher {
    primary: Arc<dyn TextEmbedder>,
    reranker: Option<Arc<dyn TextEmbedder>>,
    config: EmbeddingConfig,
    known_name: String,
}

impl EmbeddingBatcher {
    #[must_use]
    pub fn new(primary: Arc<dyn TextEmbedder>, reranker: Option<Arc<dyn TextEmbedder>>, config: EmbeddingConfig, known_name: String) -> Self {
        Self { primary, reranker, config, known_name }
    }

    #[must_use]
    pub fn reranker(&self) -> Option<&Arc<dyn TextEmbedder>> {
        self.reranker.as_ref()
    }

    /// Embed every segment's text, honouring the known-speaker-only policy:
    /// segments whose speaker is not the known name get `None` and are never
    /// sent to the model. Returns one entry per input segment, in order.
    pub async fn embed_segments(&self, segments: &[TranscriptSegment]) -> Result<Vec<Option<Vec<f32>>>, EmbedTextError> {
        let mut indices_to_embed = Vec::new();
        let mut texts = Vec::new();
        for (i, seg) in segments.iter().enumerate() {
            if self.config.embed_known_only && !seg.speaker_label.is_known(&self.known_name) {
                continue;
            }
            indices_to_embed.push(i);
            texts.push(seg.text.clone());
        }

        let mut embedded: Vec<Option<Vec<f32>>> = vec![None; segments.len()];
        for (idx_chunk, text_chunk) in indices_to_embed.chunks(self.config.batch_size).zip(texts.chunks(self.config.batch_size)) {
            let started = Instant::now();
            let vectors = self.primary.embed_batch(text_chunk).await?;
            let wall_seconds = started.elapsed().as_secs_f64();
            let texts_per_second = if wall_seconds > 0.0 { text_chunk.len() as f64 / wall_seconds } else { 0.0 };
            tracing::info!(texts = text_chunk.len(), wall_seconds, texts_per_second, "embedding batch complete");

            for (&idx, vector) in idx_chunk.iter().zip(vectors) {
                embedded[idx] = Some(l2_normalise(&vector));
            }
        }
        Ok(embedded)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.primary.dimension()
    }

    #[must_use]
    pub fn model_key(&self) -> &str {
        self.primary.model_key()
    }
}
