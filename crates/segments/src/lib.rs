//! Segment Builder (C6), per spec.md §4.5.
use ingest_common::config::SegmentBuilderConfig;
use ingest_common::model::{AsrQuality, AsrSegment, DiarizationTurn, SpeakerSegment, TranscriptSegment, Word};
use ingest_common::speaker_label::SpeakerLabel;

const SENTENCE_END: [char; 3] = ['.', '!', '?'];
const MIN_TRAILING_FRAGMENT_CHARS: usize = 150;

/// Run the full builder: boundary split, speaker assignment, retrieval-unit
/// grouping, empty-unit drop.
#[must_use]
pub fn build_segments(
    asr_segments: &[AsrSegment],
    speaker_segments: &[SpeakerSegment],
    turns: &[DiarizationTurn],
    config: &SegmentBuilderConfig,
) -> Vec<TranscriptSegment> {
    let points = split_points(turns);
    let split = boundary_split(asr_segments, &points);
    let labelled = assign_speakers(split, speaker_segments);
    let units = group_into_retrieval_units(labelled, config);
    units.into_iter().filter(|u| !u.text.trim().is_empty()).collect()
}

fn split_points(turns: &[DiarizationTurn]) -> Vec<f64> {
    let mut points = vec![0.0];
    for t in turns {
        points.push(t.start_s);
        points.push(t.end_s);
    }
    points.sort_by(|a, b| a.partial_cmp(b).unwrap());
    points.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    points
}

/// A segment after boundary splitting but before speaker assignment.
struct SplitSegment {
    start_s: f64,
    end_s: f64,
    text: String,
    words: Vec<Word>,
    quality: AsrQuality,
    re_asr: bool,
    needs_refinement: bool,
}

/// Cut each ASR segment at any split-point strictly inside its range, using
/// word timestamps to decide which side of a cut each word falls on.
fn boundary_split(asr_segments: &[AsrSegment], points: &[f64]) -> Vec<SplitSegment> {
    let mut out = Vec::new();
    for seg in asr_segments {
        let mut cuts: Vec<f64> = points
            .iter()
            .copied()
            .filter(|p| *p > seg.start_s && *p < seg.end_s)
            .collect();
        if cuts.is_empty() {
            out.push(SplitSegment {
                start_s: seg.start_s,
                end_s: seg.end_s,
                text: seg.text.clone(),
                words: seg.words.clone(),
                quality: seg.quality,
                re_asr: seg.re_asr,
                needs_refinement: seg.needs_refinement,
            });
            continue;
        }

        let mut boundaries = vec![seg.start_s];
        boundaries.append(&mut cuts);
        boundaries.push(seg.end_s);

        for window in boundaries.windows(2) {
            let (p0, p1) = (window[0], window[1]);
            let words: Vec<Word> = seg
                .words
                .iter()
                .filter(|w| w.start_s >= p0 && w.start_s < p1)
                .cloned()
                .collect();
            if words.is_empty() {
                continue;
            }
            let text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
            out.push(SplitSegment {
                start_s: p0,
                end_s: p1,
                text,
                words,
                quality: seg.quality,
                re_asr: seg.re_asr,
                needs_refinement: seg.needs_refinement,
            });
        }
    }
    out
}

/// A split segment with its assigned speaker.
struct LabelledSegment {
    start_s: f64,
    end_s: f64,
    text: String,
    speaker_label: SpeakerLabel,
    speaker_confidence: Option<f32>,
    quality: AsrQuality,
    re_asr: bool,
    needs_refinement: bool,
    is_overlap: bool,
}

fn assign_speakers(segments: Vec<SplitSegment>, speaker_segments: &[SpeakerSegment]) -> Vec<LabelledSegment> {
    segments
        .into_iter()
        .map(|seg| {
            let dominant = speaker_segments
                .iter()
                .map(|s| (s, overlap_s(seg.start_s, seg.end_s, s.start_s, s.end_s)))
                .filter(|(_, overlap)| *overlap > 0.0)
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

            let (speaker_label, speaker_confidence) = match dominant {
                Some((s, _)) => (s.speaker_label.clone(), Some(s.confidence)),
                None => (SpeakerLabel::Unknown, None),
            };
            let is_overlap = seg.words.iter().any(|w| w.is_overlap);
            LabelledSegment {
                start_s: seg.start_s,
                end_s: seg.end_s,
                text: seg.text,
                speaker_label,
                speaker_confidence,
                quality: seg.quality,
                re_asr: seg.re_asr,
                needs_refinement: seg.needs_refinement,
                is_overlap,
            }
        })
        .collect()
}

fn overlap_s(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

/// Group consecutive same-speaker segments into retrieval units targeting
/// `target_min_chars..target_max_chars`, breaking on sentence boundaries
/// where possible and never crossing a speaker change, per spec.md §4.5
/// step 3.
fn group_into_retrieval_units(segments: Vec<LabelledSegment>, config: &SegmentBuilderConfig) -> Vec<TranscriptSegment> {
    let mut units = Vec::new();
    let mut run_start = 0;
    while run_start < segments.len() {
        let mut run_end = run_start + 1;
        while run_end < segments.len() && segments[run_end].speaker_label == segments[run_start].speaker_label {
            run_end += 1;
        }
        units.extend(build_units_for_run(&segments[run_start..run_end], config));
        run_start = run_end;
    }
    units
}

fn build_units_for_run(run: &[LabelledSegment], config: &SegmentBuilderConfig) -> Vec<TranscriptSegment> {
    let mut out: Vec<TranscriptSegment> = Vec::new();
    let mut acc: Option<TranscriptSegment> = None;

    for seg in run {
        acc = Some(match acc.take() {
            None => TranscriptSegment {
                start_s: seg.start_s,
                end_s: seg.end_s,
                text: seg.text.clone(),
                speaker_label: seg.speaker_label.clone(),
                speaker_confidence: seg.speaker_confidence,
                asr_quality: seg.quality,
                re_asr: seg.re_asr,
                needs_refinement: seg.needs_refinement,
                is_overlap: seg.is_overlap,
                embedding: None,
            },
            Some(mut unit) => {
                unit.end_s = seg.end_s;
                if !unit.text.is_empty() {
                    unit.text.push(' ');
                }
                unit.text.push_str(&seg.text);
                unit.re_asr = unit.re_asr || seg.re_asr;
                unit.needs_refinement = unit.needs_refinement || seg.needs_refinement;
                unit.is_overlap = unit.is_overlap || seg.is_overlap;
                unit
            }
        });

        let unit = acc.as_ref().unwrap();
        let ends_sentence = unit.text.trim_end().ends_with(SENTENCE_END);
        if unit.text.len() >= config.target_max_chars
            || (unit.text.len() >= config.target_min_chars && ends_sentence)
        {
            out.push(acc.take().unwrap());
        }
    }
    if let Some(mut last) = acc {
        if last.text.len() < MIN_TRAILING_FRAGMENT_CHARS {
            if let Some(prev) = out.last_mut() {
                prev.end_s = last.end_s;
                prev.text.push(' ');
                prev.text.push_str(&last.text);
                prev.re_asr = prev.re_asr || last.re_asr;
                prev.needs_refinement = prev.needs_refinement || last.needs_refinement;
                prev.is_overlap = prev.is_overlap || last.is_overlap;
                return out;
            }
        }
        last.text = last.text.trim().to_string();
        out.push(last);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(start: f64, end: f64, text: &str) -> Word {
        Word { start_s: start, end_s: end, text: text.into(), confidence: None, speaker_label: None, is_overlap: false }
    }

    fn asr_seg(start: f64, end: f64, words: Vec<Word>) -> AsrSegment {
        let text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
        AsrSegment { start_s: start, end_s: end, text, words, quality: AsrQuality::default(), re_asr: false, needs_refinement: false }
    }

    fn speaker_seg(start: f64, end: f64, label: SpeakerLabel) -> SpeakerSegment {
        SpeakerSegment { start_s: start, end_s: end, speaker_label: label, confidence: 0.9, margin: 0.1, cluster_id: 0, voice_embedding: None }
    }

    fn turn(start: f64, end: f64, cluster_id: i64) -> DiarizationTurn {
        DiarizationTurn { start_s: start, end_s: end, cluster_id }
    }

    #[test]
    fn boundary_split_cuts_segment_at_turn_change() {
        let words = vec![word(0.0, 1.0, "hello"), word(4.0, 5.0, "world"), word(5.0, 6.0, "there")];
        let segs = vec![asr_seg(0.0, 6.0, words)];
        let points = split_points(&[turn(0.0, 5.0, 0), turn(5.0, 6.0, 1)]);
        let split = boundary_split(&segs, &points);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].text, "hello");
        assert_eq!(split[1].text, "world there");
    }

    #[test]
    fn speaker_assignment_picks_dominant_overlap() {
        let split = vec![SplitSegment {
            start_s: 0.0,
            end_s: 10.0,
            text: "hi".into(),
            words: vec![],
            quality: AsrQuality::default(),
            re_asr: false,
            needs_refinement: false,
        }];
        let speakers = vec![
            speaker_seg(0.0, 3.0, SpeakerLabel::Guest),
            speaker_seg(3.0, 10.0, SpeakerLabel::Known("testspeaker".into())),
        ];
        let labelled = assign_speakers(split, &speakers);
        assert_eq!(labelled[0].speaker_label, SpeakerLabel::Known("testspeaker".into()));
    }

    #[test]
    fn speaker_change_forces_new_unit_even_if_short() {
        let config = SegmentBuilderConfig { target_min_chars: 1100, target_max_chars: 1400 };
        let segments = vec![
            LabelledSegment {
                start_s: 0.0,
                end_s: 1.0,
                text: "hi".into(),
                speaker_label: SpeakerLabel::Known("testspeaker".into()),
                speaker_confidence: Some(0.9),
                quality: AsrQuality::default(),
                re_asr: false,
                needs_refinement: false,
                is_overlap: false,
            },
            LabelledSegment {
                start_s: 1.0,
                end_s: 2.0,
                text: "hey".into(),
                speaker_label: SpeakerLabel::Guest,
                speaker_confidence: Some(0.8),
                quality: AsrQuality::default(),
                re_asr: false,
                needs_refinement: false,
                is_overlap: false,
            },
        ];
        let units = group_into_retrieval_units(segments, &config);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].speaker_label, SpeakerLabel::Known("testspeaker".into()));
        assert_eq!(units[1].speaker_label, SpeakerLabel::Guest);
    }

    #[test]
    fn unit_closes_at_sentence_boundary_past_min_chars() {
        let config = SegmentBuilderConfig { target_min_chars: 10, target_max_chars: 1000 };
        let label = SpeakerLabel::Unknown;
        let segments = vec![
            LabelledSegment {
                start_s: 0.0,
                end_s: 1.0,
                text: "this is long enough now.".into(),
                speaker_label: label.clone(),
                speaker_confidence: None,
                quality: AsrQuality::default(),
                re_asr: false,
                needs_refinement: false,
                is_overlap: false,
            },
            LabelledSegment {
                start_s: 1.0,
                end_s: 2.0,
                text: "a new unit starts here".into(),
                speaker_label: label,
                speaker_confidence: None,
                quality: AsrQuality::default(),
                re_asr: false,
                needs_refinement: false,
                is_overlap: false,
            },
        ];
        let units = group_into_retrieval_units(segments, &config);
        assert_eq!(units.len(), 2);
        assert!(units[0].text.ends_with('.'));
    }

    #[test]
    fn empty_units_are_dropped() {
        let words = vec![word(0.0, 1.0, "   ")];
        let asr_segments = vec![AsrSegment { start_s: 0.0, end_s: 1.0, text: "   ".into(), words, quality: AsrQuality::default(), re_asr: false, needs_refinement: false }];
        let config = SegmentBuilderConfig { target_min_chars: 1100, target_max_chars: 1400 };
        let out = build_segments(&asr_segments, &[], &[], &config);
        assert!(out.iter().all(|u| !u.text.trim().is_empty()));
    }
}
