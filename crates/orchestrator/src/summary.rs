//! Final run summary, per spec.md §4.8 / §7's user-visible failure
//! behaviour: "the run always prints a final summary including totals,
//! per-class counts, real-time factor, throughput in hours per hour, and a
//! projection for a 1200-hour corpus."
use ingest_asr::router::PresetKind;
use ingest_common::error::TerminalClass;
use ingest_common::model::IngestionStats;

use crate::types::{VideoOutcome, VideoState};

/// Fold one video's terminal outcome into the run-wide stats.
pub fn record_outcome(stats: &mut IngestionStats, outcome: &VideoOutcome) {
    stats.total += 1;
    match outcome.state {
        VideoState::Done => {
            stats.processed += 1;
            stats.total_processing_time_s += outcome.processing_time_s;
            stats.total_audio_s += outcome.audio_duration_s;
            stats.segments_known += outcome.segments_known;
            stats.segments_guest += outcome.segments_guest;
            stats.segments_unknown += outcome.segments_unknown;
            match outcome.preset_kind {
                Some(PresetKind::FastShort) => stats.fast_short_count += 1,
                Some(PresetKind::Interview) => stats.interview_count += 1,
                Some(PresetKind::LongMonologue) => stats.long_monologue_count += 1,
                None => {}
            }
        }
        VideoState::Skipped => stats.skipped += 1,
        VideoState::NoAudio | VideoState::Errored => {
            stats.errored += 1;
            match outcome.terminal_class {
                Some(TerminalClass::Unavailable) => stats.unavailable += 1,
                Some(TerminalClass::MembersOnly) => stats.members_only += 1,
                Some(TerminalClass::NoAudio) => stats.no_audio += 1,
                Some(TerminalClass::RateLimited) => stats.rate_limited += 1,
                Some(TerminalClass::DownloadFailed) => stats.download_failed += 1,
                Some(TerminalClass::AsrFailed) => stats.asr_failed += 1,
                Some(TerminalClass::PersistFailed) => stats.persist_failed += 1,
                None => {}
            }
        }
        VideoState::Queued | VideoState::Acquiring | VideoState::Asr | VideoState::Persisting => {
            unreachable!("record_outcome called on a non-terminal state")
        }
    }
}

/// Percentage of known-speaker segments among all attributed segments,
/// matching the "chaffee-percentage" figure referenced by the golden-path
/// acceptance test in spec.md §10.
#[must_use]
pub fn known_speaker_pct(stats: &IngestionStats) -> f64 {
    let total = stats.segments_known + stats.segments_guest + stats.segments_unknown;
    if total == 0 {
        return 0.0;
    }
    (stats.segments_known as f64 / total as f64) * 100.0
}

#[must_use]
pub fn format_report(stats: &IngestionStats) -> String {
    let mut out = String::new();
    out.push_str("=== ingestion run summary ===\n");
    out.push_str(&format!(
        "total={} processed={} skipped={} errored={} no_audio={}\n",
        stats.total, stats.processed, stats.skipped, stats.errored, stats.no_audio
    ));
    out.push_str(&format!(
        "failure classes: unavailable={} members_only={} rate_limited={} download_failed={} asr_failed={} persist_failed={}\n",
        stats.unavailable,
        stats.members_only,
        stats.rate_limited,
        stats.download_failed,
        stats.asr_failed,
        stats.persist_failed
    ));
    out.push_str(&format!(
        "presets: fast_short={} interview={} long_monologue={}\n",
        stats.fast_short_count, stats.interview_count, stats.long_monologue_count
    ));
    out.push_str(&format!(
        "segments: known={} guest={} unknown={} (known={:.1}%)\n",
        stats.segments_known,
        stats.segments_guest,
        stats.segments_unknown,
        known_speaker_pct(stats)
    ));
    out.push_str(&format!(
        "throughput: rtf={:.3} hours_per_hour={:.2} projected_24h_hours={:.1} (target 1200)\n",
        stats.real_time_factor(),
        stats.hours_per_hour(),
        stats.projected_24h_hours()
    ));
    out.push_str(&format!("queue peaks: q1={} q2={}\n", stats.q1_peak, stats.q2_peak));

    if stats.processed == 0 && stats.skipped > 0 {
        out.push_str(
            "hint: everything eligible was already processed. Try --limit-unprocessed, --force, or a larger --limit.\n",
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(audio_s: f64, proc_s: f64, known: u64, guest: u64, unknown: u64) -> VideoOutcome {
        VideoOutcome {
            external_id: "v1".into(),
            state: VideoState::Done,
            terminal_class: None,
            preset_kind: None,
            segments_known: known,
            segments_guest: guest,
            segments_unknown: unknown,
            audio_duration_s: audio_s,
            processing_time_s: proc_s,
        }
    }

    #[test]
    fn record_outcome_tallies_preset_kind() {
        let mut stats = IngestionStats::default();
        record_outcome(&mut stats, &VideoOutcome { preset_kind: Some(PresetKind::FastShort), ..done(60.0, 6.0, 1, 0, 0) });
        record_outcome(&mut stats, &VideoOutcome { preset_kind: Some(PresetKind::Interview), ..done(60.0, 6.0, 1, 0, 0) });
        record_outcome(&mut stats, &VideoOutcome { preset_kind: Some(PresetKind::Interview), ..done(60.0, 6.0, 1, 0, 0) });
        record_outcome(&mut stats, &VideoOutcome { preset_kind: Some(PresetKind::LongMonologue), ..done(60.0, 6.0, 1, 0, 0) });
        assert_eq!(stats.fast_short_count, 1);
        assert_eq!(stats.interview_count, 2);
        assert_eq!(stats.long_monologue_count, 1);
    }

    #[test]
    fn record_outcome_accumulates_done_stats() {
        let mut stats = IngestionStats::default();
        record_outcome(&mut stats, &done(1080.0, 108.0, 10, 0, 0));
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.total, 1);
        assert!((stats.real_time_factor() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn record_outcome_counts_skipped_separately_from_errored() {
        let mut stats = IngestionStats::default();
        record_outcome(&mut stats, &VideoOutcome::skipped("v1"));
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errored, 0);
    }

    #[test]
    fn known_speaker_pct_is_100_for_pure_monologue() {
        let mut stats = IngestionStats::default();
        record_outcome(&mut stats, &done(1080.0, 108.0, 42, 0, 0));
        assert!((known_speaker_pct(&stats) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn report_suggests_limit_unprocessed_when_nothing_processed() {
        let mut stats = IngestionStats::default();
        record_outcome(&mut stats, &VideoOutcome::skipped("v1"));
        let report = format_report(&stats);
        assert!(report.contains("--limit-unprocessed"));
    }

    #[test]
    fn report_omits_hint_when_videos_were_processed() {
        let mut stats = IngestionStats::default();
        record_outcome(&mut stats, &done(60.0, 6.0, 1, 0, 0));
        let report = format_report(&stats);
        assert!(!report.contains("--limit-unprocessed"));
    }
}
