//! Shared error taxonomy.
//!
//! Mirrors the teacher's `ProcessingError`/`PluginError` shape: one
//! `thiserror` enum per failure class, `#[from]` conversions for the
//! underlying library errors, nothing here ever panics.
use thiserror::Error;

/// Terminal-per-video failure classes (spec.md §7). Each is counted, never
/// retried within a run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalClass {
    #[error("video unavailable")]
    Unavailable,
    #[error("members-only content")]
    MembersOnly,
    #[error("no audio stream present")]
    NoAudio,
    #[error("rate limited")]
    RateLimited,
    #[error("download failed")]
    DownloadFailed,
    #[error("asr failed")]
    AsrFailed,
    #[error("persistence failed")]
    PersistFailed,
}

/// Errors surfaced by the audio acquirer (C2).
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("video unavailable: {0}")]
    Unavailable(String),
    #[error("members-only content: {0}")]
    MembersOnly(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("no audio stream: {0}")]
    NoAudio(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("subprocess timed out after {0}s")]
    Timeout(u64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquireError {
    #[must_use]
    pub fn terminal_class(&self) -> TerminalClass {
        match self {
            Self::Unavailable(_) => TerminalClass::Unavailable,
            Self::MembersOnly(_) => TerminalClass::MembersOnly,
            Self::RateLimited(_) => TerminalClass::RateLimited,
            Self::NoAudio(_) => TerminalClass::NoAudio,
            Self::DownloadFailed(_) | Self::Timeout(_) | Self::Io(_) => {
                TerminalClass::DownloadFailed
            }
        }
    }
}

/// Errors surfaced by the ASR engine (C3).
#[derive(Error, Debug)]
pub enum AsrError {
    #[error("model execution failed: {0}")]
    ExecutionFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the storage layer (C8).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("postgres error: {0}")]
    Postgres(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("embedding table missing in production mode: {0}")]
    ProductionTableMissing(String),
    #[error("embedding table missing and auto-create disabled: {0}")]
    AutoCreateDisabled(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level fatal conditions that abort the whole run (spec.md §7).
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("missing required configuration: {0}")]
    MissingConfig(String),
    #[error("known-speaker profile missing and AUTO_BOOTSTRAP_CHAFFEE is not set")]
    MissingKnownProfile,
    #[error("production mode requires embedding table {0}, which does not exist")]
    ProductionTableMissing(String),
    #[error("gpu initialisation failed: {0}")]
    GpuInit(String),
}
