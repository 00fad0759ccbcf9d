//! Stage 2 quality refinement (C3).
//!
//! Materialises stage 1 into an indexed list, computes a disjoint set of
//! refinement spans by merging adjacent flagged segments, and applies
//! replacements in order — the strategy spec.md DESIGN NOTES §9 calls for
//! in place of a "two-pass quality refinement over a generator".
use ingest_common::config::AsrConfig;

use crate::backend::RawSegment;

const MERGE_GAP_S: f64 = 2.0;

#[must_use]
pub fn is_low_quality(config: &AsrConfig, seg: &RawSegment) -> bool {
    let logprob_bad = seg.quality.avg_logprob.map(|v| v <= config.qa_low_logprob).unwrap_or(false);
    let compression_bad = seg
        .quality
        .compression_ratio
        .map(|v| v >= config.qa_low_compression)
        .unwrap_or(false);
    let no_speech_bad = seg.quality.no_speech_prob.map(|v| v >= 0.8).unwrap_or(false);
    logprob_bad || compression_bad || no_speech_bad
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementSpan {
    pub start_s: f64,
    pub end_s: f64,
    /// Indices into the stage-1 segment list covered by this span, in order.
    pub segment_indices: Vec<usize>,
}

/// Merge adjacent flagged segments within `MERGE_GAP_S` of each other into
/// disjoint refinement spans, per spec.md §4.2. Every flagged segment is
/// marked `needs_refinement=true` here, independent of whether the span's
/// re-transcription attempt later succeeds — it records that the segment
/// *was* low-quality, not that it was fixed.
#[must_use]
pub fn compute_refinement_spans(config: &AsrConfig, segments: &mut [RawSegment]) -> Vec<RefinementSpan> {
    let mut spans: Vec<RefinementSpan> = Vec::new();
    let mut current: Option<RefinementSpan> = None;

    for (idx, seg) in segments.iter_mut().enumerate() {
        if !is_low_quality(config, seg) {
            continue;
        }
        seg.needs_refinement = true;
        match &mut current {
            Some(span) if seg.start_s - span.end_s <= MERGE_GAP_S => {
                span.end_s = span.end_s.max(seg.end_s);
                span.segment_indices.push(idx);
            }
            _ => {
                if let Some(span) = current.take() {
                    spans.push(span);
                }
                current = Some(RefinementSpan {
                    start_s: seg.start_s,
                    end_s: seg.end_s,
                    segment_indices: vec![idx],
                });
            }
        }
    }
    if let Some(span) = current.take() {
        spans.push(span);
    }
    spans
}

/// Apply a successfully re-transcribed span's replacement text: the first
/// overlapping original absorbs the refined segment and is marked
/// `re_asr=true`; subsequent originals in the span are blanked (their text
/// becomes empty, they carry no words) and are dropped by later stages that
/// filter empty segments. This is the "first-segment-absorbs-span" policy
/// recorded as a deliberate choice in `SPEC_FULL.md`'s open-question
/// decisions.
pub fn apply_span_replacement(segments: &mut [RawSegment], span: &RefinementSpan, replacement_text: String) {
    let Some((&first, rest)) = span.segment_indices.split_first() else {
        return;
    };
    segments[first].text = replacement_text;
    segments[first].re_asr = true;
    for &idx in rest {
        segments[idx].text.clear();
        segments[idx].words.clear();
        segments[idx].re_asr = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_common::model::AsrQuality;

    fn cfg() -> AsrConfig {
        AsrConfig {
            whisper_model: "medium.en".into(),
            whisper_refine_model: "large-v3".into(),
            whisper_device: "cuda".into(),
            whisper_compute: "float16".into(),
            whisper_beam: 5,
            whisper_chunk: 30,
            whisper_temps: vec![0.0],
            whisper_vad: true,
            whisper_lang: None,
            domain_prompt: None,
            qa_low_logprob: -0.35,
            qa_low_compression: 2.4,
            qa_two_pass: true,
            qa_retry_beam: 8,
            qa_retry_temps: vec![0.0],
        }
    }

    fn seg(start: f64, end: f64, quality: AsrQuality) -> RawSegment {
        RawSegment { start_s: start, end_s: end, text: "x".into(), words: vec![], quality, re_asr: false, needs_refinement: false }
    }

    fn good_quality() -> AsrQuality {
        AsrQuality { avg_logprob: Some(-0.1), compression_ratio: Some(1.5), no_speech_prob: Some(0.1) }
    }

    fn bad_quality() -> AsrQuality {
        AsrQuality { avg_logprob: Some(-0.5), compression_ratio: Some(1.5), no_speech_prob: Some(0.1) }
    }

    #[test]
    fn flags_low_logprob() {
        assert!(is_low_quality(&cfg(), &seg(0.0, 1.0, bad_quality())));
        assert!(!is_low_quality(&cfg(), &seg(0.0, 1.0, good_quality())));
    }

    #[test]
    fn flags_high_compression_ratio() {
        let q = AsrQuality { avg_logprob: Some(-0.1), compression_ratio: Some(2.5), no_speech_prob: Some(0.1) };
        assert!(is_low_quality(&cfg(), &seg(0.0, 1.0, q)));
    }

    #[test]
    fn adjacent_flagged_segments_merge_into_one_span() {
        let mut segments = vec![
            seg(0.0, 2.0, bad_quality()),
            seg(3.0, 4.0, bad_quality()), // gap of 1.0s <= 2.0s merge threshold
            seg(10.0, 11.0, bad_quality()), // gap of 6.0s, new span
        ];
        let spans = compute_refinement_spans(&cfg(), &mut segments);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].segment_indices, vec![0, 1]);
        assert_eq!(spans[0].start_s, 0.0);
        assert_eq!(spans[0].end_s, 4.0);
        assert_eq!(spans[1].segment_indices, vec![2]);
        assert!(segments.iter().all(|s| s.needs_refinement));
    }

    #[test]
    fn good_quality_segments_produce_no_spans() {
        let mut segments = vec![seg(0.0, 2.0, good_quality()), seg(3.0, 4.0, good_quality())];
        assert!(compute_refinement_spans(&cfg(), &mut segments).is_empty());
        assert!(segments.iter().all(|s| !s.needs_refinement));
    }

    #[test]
    fn replacement_absorbs_into_first_and_blanks_rest() {
        let mut segments = vec![
            seg(0.0, 2.0, bad_quality()),
            seg(3.0, 4.0, bad_quality()),
        ];
        let span = RefinementSpan { start_s: 0.0, end_s: 4.0, segment_indices: vec![0, 1] };
        apply_span_replacement(&mut segments, &span, "refined text".to_string());

        assert_eq!(segments[0].text, "refined text");
        assert!(segments[0].re_asr);
        assert!(segments[1].text.is_empty());
        assert!(segments[1].re_asr);
    }
}
