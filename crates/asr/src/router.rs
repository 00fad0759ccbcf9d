//! Preset router (C3).
//!
//! Picks a preset by `(duration_minutes, is_interview)`, per spec.md §4.2.
//! All presets use word-level timestamps.
use ingest_common::config::AsrConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKind {
    FastShort,
    Interview,
    LongMonologue,
}

#[derive(Debug, Clone)]
pub struct Preset {
    pub kind: PresetKind,
    pub model_key: String,
    pub compute: String,
    pub beam_size: u32,
    pub temperature_schedule: Vec<f32>,
    pub max_chunk_len_s: u32,
    pub word_timestamps: bool,
}

/// Route to a preset. `duration_minutes` is the audio's total duration;
/// `is_interview` is the conversational-markers heuristic computed by the
/// diarization crate over the first 60 s of transcript text.
#[must_use]
pub fn route(config: &AsrConfig, duration_minutes: f64, is_interview: bool) -> Preset {
    let kind = if duration_minutes <= 20.0 {
        PresetKind::FastShort
    } else if is_interview {
        PresetKind::Interview
    } else {
        PresetKind::LongMonologue
    };

    match kind {
        PresetKind::FastShort => Preset {
            kind,
            model_key: config.whisper_model.clone(),
            compute: config.whisper_compute.clone(),
            beam_size: config.whisper_beam.min(3).max(1),
            temperature_schedule: vec![0.0],
            max_chunk_len_s: config.whisper_chunk,
            word_timestamps: true,
        },
        PresetKind::Interview => Preset {
            kind,
            model_key: config.whisper_model.clone(),
            compute: config.whisper_compute.clone(),
            beam_size: config.whisper_beam,
            temperature_schedule: config.whisper_temps.clone(),
            max_chunk_len_s: config.whisper_chunk,
            word_timestamps: true,
        },
        PresetKind::LongMonologue => Preset {
            kind,
            model_key: config.whisper_model.clone(),
            compute: config.whisper_compute.clone(),
            beam_size: config.whisper_beam,
            temperature_schedule: config.whisper_temps.clone(),
            max_chunk_len_s: config.whisper_chunk.max(45),
            word_timestamps: true,
        },
    }
}

const QUESTION_MARK_THRESHOLD: usize = 3;
const SECOND_PERSON_THRESHOLD: usize = 4;
const AFFIRMATION_THRESHOLD: usize = 3;

const SECOND_PERSON_TOKENS: &[&str] = &["you", "your", "you're", "yours"];
const AFFIRMATION_TOKENS: &[&str] = &["yeah", "right", "exactly", "mhm", "uh-huh", "totally", "absolutely"];

/// Conversational-markers heuristic over the first 60 s of transcript text,
/// per spec.md §4.3: frequent `?`, frequent second-person address, many
/// affirmation tokens.
#[must_use]
pub fn looks_like_interview(first_60s_text: &str) -> bool {
    let lower = first_60s_text.to_lowercase();
    let question_marks = lower.matches('?').count();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let second_person = words.iter().filter(|w| SECOND_PERSON_TOKENS.contains(w)).count();
    let affirmations = words.iter().filter(|w| AFFIRMATION_TOKENS.contains(w)).count();

    question_marks >= QUESTION_MARK_THRESHOLD
        || second_person >= SECOND_PERSON_THRESHOLD
        || affirmations >= AFFIRMATION_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> AsrConfig {
        AsrConfig {
            whisper_model: "medium.en".into(),
            whisper_refine_model: "large-v3".into(),
            whisper_device: "cuda".into(),
            whisper_compute: "float16".into(),
            whisper_beam: 5,
            whisper_chunk: 30,
            whisper_temps: vec![0.0, 0.2],
            whisper_vad: true,
            whisper_lang: None,
            domain_prompt: None,
            qa_low_logprob: -0.35,
            qa_low_compression: 2.4,
            qa_two_pass: true,
            qa_retry_beam: 8,
            qa_retry_temps: vec![0.0, 0.2, 0.4],
        }
    }

    #[test]
    fn short_audio_routes_to_fast_short() {
        let preset = route(&cfg(), 15.0, false);
        assert_eq!(preset.kind, PresetKind::FastShort);
    }

    #[test]
    fn long_interview_routes_to_interview() {
        let preset = route(&cfg(), 65.0, true);
        assert_eq!(preset.kind, PresetKind::Interview);
    }

    #[test]
    fn long_monologue_routes_to_long_monologue() {
        let preset = route(&cfg(), 65.0, false);
        assert_eq!(preset.kind, PresetKind::LongMonologue);
    }

    #[test]
    fn short_audio_wins_over_interview_heuristic() {
        // Duration bucket takes priority per spec.md's (duration, is_interview) routing.
        let preset = route(&cfg(), 10.0, true);
        assert_eq!(preset.kind, PresetKind::FastShort);
    }

    #[test]
    fn interview_heuristic_detects_question_marks() {
        let text = "What do you think? Why is that? How does it work?";
        assert!(looks_like_interview(text));
    }

    #[test]
    fn monologue_text_is_not_interview() {
        let text = "Today I want to talk about the history of ancient Rome and its empire.";
        assert!(!looks_like_interview(text));
    }
}
