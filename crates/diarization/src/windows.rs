//! Sub-window sampling for per-cluster voice embedding extraction.
//!
//! Grounded on spec.md §4.4 step b: up to 10 sub-windows (>=0.5s each, <=3s
//! window, 1.5s hop) across a cluster's turns; a single turn >300s ("over-
//! merged") is instead split uniformly into ten chunks across its duration.
use ingest_common::model::DiarizationTurn;

const MAX_WINDOWS: usize = 10;
const WINDOW_LEN_S: f64 = 3.0;
const MIN_WINDOW_LEN_S: f64 = 0.5;
const HOP_S: f64 = 1.5;
pub const OVER_MERGED_SINGLE_TURN_THRESHOLD_S: f64 = 300.0;

/// `true` exactly when the cluster is the "over-merged single turn" special
/// case: exactly one turn, longer than 300 s.
#[must_use]
pub fn is_single_over_merged_turn(turns: &[DiarizationTurn]) -> bool {
    turns.len() == 1 && turns[0].duration_s() > OVER_MERGED_SINGLE_TURN_THRESHOLD_S
}

/// Sample up to `MAX_WINDOWS` sub-windows across `turns`, per spec.md §4.4
/// step b.
#[must_use]
pub fn sample_windows(turns: &[DiarizationTurn]) -> Vec<(f64, f64)> {
    if is_single_over_merged_turn(turns) {
        return uniform_chunks(turns[0].start_s, turns[0].end_s, MAX_WINDOWS);
    }

    let mut sorted: Vec<&DiarizationTurn> = turns.iter().collect();
    sorted.sort_by(|a, b| a.start_s.partial_cmp(&b.start_s).unwrap());

    let mut out = Vec::new();
    'turns: for turn in sorted {
        let mut cursor = turn.start_s;
        while cursor < turn.end_s {
            let end = (cursor + WINDOW_LEN_S).min(turn.end_s);
            let len = end - cursor;
            if len >= MIN_WINDOW_LEN_S {
                out.push((cursor, end));
                if out.len() >= MAX_WINDOWS {
                    break 'turns;
                }
            }
            cursor += HOP_S;
        }
    }
    out
}

/// Split `[start, end)` into `n` equal-length chunks.
#[must_use]
pub fn uniform_chunks(start: f64, end: f64, n: usize) -> Vec<(f64, f64)> {
    if n == 0 || end <= start {
        return Vec::new();
    }
    let chunk_len = (end - start) / n as f64;
    (0..n)
        .map(|i| (start + i as f64 * chunk_len, start + (i + 1) as f64 * chunk_len))
        .collect()
}

/// Chunk a cluster's turns into ~30s pieces for per-segment re-identification
/// (spec.md §4.4 step f). Pieces never cross a turn boundary.
#[must_use]
pub fn chunk_30s(turns: &[DiarizationTurn]) -> Vec<(f64, f64)> {
    const CHUNK_LEN_S: f64 = 30.0;
    let mut sorted: Vec<&DiarizationTurn> = turns.iter().collect();
    sorted.sort_by(|a, b| a.start_s.partial_cmp(&b.start_s).unwrap());

    let mut out = Vec::new();
    for turn in sorted {
        let mut cursor = turn.start_s;
        while cursor < turn.end_s {
            let end = (cursor + CHUNK_LEN_S).min(turn.end_s);
            out.push((cursor, end));
            cursor = end;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(start: f64, end: f64, cluster_id: i64) -> DiarizationTurn {
        DiarizationTurn { start_s: start, end_s: end, cluster_id }
    }

    #[test]
    fn single_over_merged_turn_detected() {
        assert!(is_single_over_merged_turn(&[turn(0.0, 400.0, 0)]));
        assert!(!is_single_over_merged_turn(&[turn(0.0, 200.0, 0)]));
        assert!(!is_single_over_merged_turn(&[turn(0.0, 400.0, 0), turn(400.0, 500.0, 0)]));
    }

    #[test]
    fn over_merged_turn_splits_into_ten_uniform_chunks() {
        let turns = vec![turn(0.0, 400.0, 0)];
        let windows = sample_windows(&turns);
        assert_eq!(windows.len(), 10);
        assert_eq!(windows[0].0, 0.0);
        assert!((windows[9].1 - 400.0).abs() < 1e-6);
    }

    #[test]
    fn normal_cluster_caps_at_ten_windows() {
        let turns = vec![turn(0.0, 100.0, 0)];
        let windows = sample_windows(&turns);
        assert_eq!(windows.len(), 10);
        for (s, e) in &windows {
            assert!(*e - *s >= 0.5 - 1e-9);
            assert!(*e - *s <= 3.0 + 1e-9);
        }
    }

    #[test]
    fn short_cluster_produces_fewer_windows() {
        let turns = vec![turn(0.0, 2.0, 0)];
        let windows = sample_windows(&turns);
        assert!(!windows.is_empty());
        assert!(windows.len() < 10);
    }

    #[test]
    fn chunk_30s_never_crosses_turn_boundary() {
        let turns = vec![turn(0.0, 45.0, 0), turn(45.0, 70.0, 0)];
        let chunks = chunk_30s(&turns);
        assert!(chunks.iter().all(|(s, e)| *s >= 0.0 && *e <= 70.0));
        assert!(chunks.iter().any(|(s, e)| (*s - 45.0).abs() < 1e-9 || (*e - 45.0).abs() < 1e-9));
    }
}
