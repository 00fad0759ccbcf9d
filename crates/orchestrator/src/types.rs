use ingest_common::error::TerminalClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoState {
    Queued,
    Acquiring,
    Asr,
    Persisting,
    Done,
    Errored,
    Skipped,
    NoAudio,
}

#[derive(Debug, Clone)]
pub struct VideoOutcome {
    pub external_id: String,
    pub state: VideoState,
    pub terminal_class: Option<TerminalClass>,
    pub preset_kind: Option<ingest_asr::router::PresetKind>,
    pub segments_known: u64,
    pub segments_guest: u64,
    pub segments_unknown: u64,
    pub audio_duration_s: f64,
    pub processing_time_s: f64,
}

impl VideoOutcome {
    #[must_use]
    pub fn skipped(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            state: VideoState::Skipped,
            terminal_class: None,
            preset_kind: None,
            segments_known: 0,
            segments_guest: 0,
            segments_unknown: 0,
            audio_duration_s: 0.0,
            processing_time_s: 0.0,
        }
    }

    #[must_use]
    pub fn errored(external_id: impl Into<String>, class: TerminalClass) -> Self {
        let state = if class == TerminalClass::NoAudio { VideoState::NoAudio } else { VideoState::Errored };
        Self {
            external_id: external_id.into(),
            state,
            terminal_class: Some(class),
            preset_kind: None,
            segments_known: 0,
            segments_guest: 0,
            segments_unknown: 0,
            audio_duration_s: 0.0,
            processing_time_s: 0.0,
        }
    }
}
