//! Pre-enqueue skip logic, per spec.md §4.8.
use std::collections::HashSet;

use ingest_common::model::VideoDescriptor;

#[derive(Debug, Clone, Copy)]
pub struct SkipPolicy {
    pub force_reprocess: bool,
    pub skip_existing: bool,
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self { force_reprocess: false, skip_existing: true }
    }
}

/// `true` when a video with existing persisted segments should be skipped
/// rather than re-enqueued.
#[must_use]
pub fn should_skip(has_existing_segments: bool, policy: SkipPolicy) -> bool {
    has_existing_segments && !policy.force_reprocess && policy.skip_existing
}

/// "Smart limit" mode: walk `candidates` in order, probing each with
/// `is_processed`, and stop once `limit` not-yet-processed videos have been
/// collected or the list is exhausted.
pub fn collect_unprocessed<'a>(
    candidates: &'a [VideoDescriptor],
    limit: usize,
    mut is_processed: impl FnMut(&VideoDescriptor) -> bool,
) -> Vec<&'a VideoDescriptor> {
    let mut out = Vec::with_capacity(limit.min(candidates.len()));
    for candidate in candidates {
        if out.len() >= limit {
            break;
        }
        if !is_processed(candidate) {
            out.push(candidate);
        }
    }
    out
}

/// In-run-only content-hash dedup set, per spec.md §9's open question
/// (never persisted across runs).
#[derive(Default)]
pub struct ContentHashDedup {
    seen: HashSet<String>,
}

impl ContentHashDedup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `hash` had already been seen this run (caller
    /// should discard the artifact and mark the video skipped).
    pub fn check_and_insert(&mut self, hash: String) -> bool {
        !self.seen.insert(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str) -> VideoDescriptor {
        VideoDescriptor { id: id.into(), title: "t".into(), publish_time: None, duration_s: None, channel: None, view_count: None, tags: None }
    }

    #[test]
    fn existing_segments_are_skipped_by_default() {
        assert!(should_skip(true, SkipPolicy::default()));
    }

    #[test]
    fn force_reprocess_overrides_skip() {
        let policy = SkipPolicy { force_reprocess: true, skip_existing: true };
        assert!(!should_skip(true, policy));
    }

    #[test]
    fn no_existing_segments_never_skips() {
        assert!(!should_skip(false, SkipPolicy::default()));
    }

    #[test]
    fn smart_limit_stops_once_target_reached() {
        let candidates = vec![video("a"), video("b"), video("c"), video("d")];
        let mut calls = 0;
        let result = collect_unprocessed(&candidates, 2, |v| {
            calls += 1;
            v.id == "a"
        });
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "b");
        assert_eq!(result[1].id, "c");
        assert_eq!(calls, 3);
    }

    #[test]
    fn content_hash_dedup_flags_repeat() {
        let mut dedup = ContentHashDedup::new();
        assert!(!dedup.check_and_insert("abc".to_string()));
        assert!(dedup.check_and_insert("abc".to_string()));
    }
}
