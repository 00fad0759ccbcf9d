//! Ingestion CLI binary: parses arguments, resolves fatal preconditions, and
//! drives the orchestrator, per SPEC_FULL.md §6/§7. Mirrors the teacher's
//! `crates/orchestrator/src/main.rs` split between `tracing_subscriber::fmt()`
//! setup, explicit `std::process::exit` on fatal failure, and a thin `match`
//! over the run result — generalised to this binary's richer flag surface via
//! `clap::Parser` in the style of `crates/video-extract-cli/src/main.rs`.
mod cli;
mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use ingest_acquirer::AcquirerConfig;
use ingest_asr::backend::WhisperBackend;
use ingest_asr::AsrEngine;
use ingest_common::config::IngestConfig;
use ingest_common::model::VideoDescriptor;
use ingest_diarization::{DiarizationBackend, OnnxVoiceEmbedder, PyannoteBackend, VoiceEmbedder};
use ingest_embeddings::{EmbeddingBatcher, OnnxTextEmbedder};
use ingest_orchestrator::pipeline::PipelineServices;
use ingest_orchestrator::skip::SkipPolicy;
use ingest_orchestrator::{Orchestrator, RunOptions};
use ingest_storage::Storage;
use ingest_voices::VoiceProfileStore;
use tokio_postgres::NoTls;

/// `bge-small-en-v1.5`'s output dimension, the default `EMBEDDING_MODEL_KEY`.
const TEXT_EMBED_DIM: usize = 384;
/// Speaker-embedding dimension for the voice-identification backend.
const VOICE_EMBED_DIM: usize = 256;

fn build_pool(database_url: &str) -> Result<Pool> {
    let pg_config: tokio_postgres::Config = database_url.parse().context("parsing DATABASE_URL")?;
    let manager = Manager::from_config(pg_config, NoTls, ManagerConfig { recycling_method: RecyclingMethod::Fast });
    Pool::builder(manager).max_size(32).build().context("building connection pool")
}

fn load_videos(cli: &cli::Cli) -> Result<Vec<VideoDescriptor>> {
    input::reject_unresolved_channel_url(
        cli.channel_url.as_deref(),
        cli.from_json.is_some() || cli.from_files.is_some() || !cli.from_url.is_empty(),
    )?;

    let mut videos = Vec::new();
    if let Some(path) = &cli.from_json {
        videos.extend(input::load_from_json(path)?);
    }
    if let Some(path) = &cli.from_files {
        videos.extend(input::load_from_files(path)?);
    }
    if !cli.from_url.is_empty() {
        videos.extend(input::load_from_urls(&cli.from_url));
    }
    if let Some(since) = cli.since_published {
        videos.retain(|v| v.publish_time.map_or(true, |pt| pt >= since));
    }
    Ok(videos)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    for (key, value) in &cli.set {
        std::env::set_var(key, value);
    }

    let videos = match load_videos(&cli) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "failed to resolve input");
            std::process::exit(1);
        }
    };
    if videos.is_empty() {
        tracing::error!("no input videos resolved from --from-url/--from-json/--from-files");
        std::process::exit(1);
    }

    let config = match IngestConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!(error = %e, "fatal configuration error");
            std::process::exit(1);
        }
    };
    tracing::info!(?config, "loaded configuration");

    let voices_dir = PathBuf::from(&config.speaker_id.voices_dir);
    let voices = match VoiceProfileStore::global(&voices_dir) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "failed to load voice profile store");
            std::process::exit(1);
        }
    };
    if let Err(e) = ingest_voices::require_known_profile(
        voices,
        &config.speaker_id.known_name,
        config.auto_bootstrap_chaffee,
    ) {
        tracing::error!(error = %e, "fatal precondition failed");
        std::process::exit(1);
    }

    let pool = match build_pool(&config.database_url) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "fatal: could not build database pool");
            std::process::exit(1);
        }
    };
    let storage = Arc::new(Storage::new(pool));
    if let Err(e) = storage.init_schema().await {
        tracing::error!(error = %e, "fatal: schema initialisation failed");
        std::process::exit(1);
    }
    if let Err(e) = storage
        .ensure_embedding_table(TEXT_EMBED_DIM, config.is_production(), config.auto_create_embedding_tables)
        .await
    {
        tracing::error!(error = %e, "fatal: embedding table unavailable");
        std::process::exit(1);
    }

    if cli.dry_run {
        match storage.storage_status().await {
            Ok(status) => tracing::info!(?status, "dry run: storage status"),
            Err(e) => tracing::warn!(error = %e, "dry run: could not read storage status"),
        }
    }

    let asr = Arc::new(AsrEngine::new(
        Arc::new(WhisperBackend::new(config.asr.whisper_model.clone())),
        Arc::new(WhisperBackend::new(config.asr.whisper_refine_model.clone())),
        config.asr.clone(),
    ));
    let diarization_backend: Arc<dyn DiarizationBackend> =
        Arc::new(PyannoteBackend::new(config.diarization.diarize_model.clone()));
    let voice_embedder: Arc<dyn VoiceEmbedder> = Arc::new(OnnxVoiceEmbedder::new("voice-embedder", VOICE_EMBED_DIM));
    let embeddings = Arc::new(EmbeddingBatcher::new(
        Arc::new(OnnxTextEmbedder::new(config.embedding.embedding_model_key.clone(), TEXT_EMBED_DIM)),
        None,
        config.embedding.clone(),
        config.speaker_id.known_name.clone(),
    ));

    let services = Arc::new(PipelineServices {
        config: config.clone(),
        acquirer_config: Arc::new(AcquirerConfig {
            proxy: config.acquisition.ytdlp_proxy.clone(),
            ..AcquirerConfig::default()
        }),
        temp_base: std::env::temp_dir(),
        asr,
        diarization_backend,
        voice_embedder,
        voices,
        embeddings,
        storage,
    });

    let orchestrator = Orchestrator::new(services, config.orchestrator.clone());
    let opts = RunOptions {
        limit: cli.limit,
        limit_unprocessed: cli.limit_unprocessed,
        skip_policy: SkipPolicy { force_reprocess: cli.force, skip_existing: !cli.no_skip_existing },
        dry_run: cli.dry_run,
    };

    let (stats, interrupted) = orchestrator.run(videos, opts).await;
    println!("{}", ingest_orchestrator::summary::format_report(&stats));

    if interrupted {
        std::process::exit(1);
    }
    Ok(())
}
