//! Classify downloader stderr text into terminal error classes.
//!
//! Grounded on spec.md §4.1 step 2: "errors whose text matches known
//! unavailable/members-only/rate-limit patterns short-circuit to the
//! corresponding terminal class; other errors fall through to the next
//! strategy."
use ingest_common::error::TerminalClass;

const UNAVAILABLE_PATTERNS: &[&str] = &[
    "video unavailable",
    "has been removed",
    "private video",
    "account terminated",
    "this video is not available",
];

const MEMBERS_ONLY_PATTERNS: &[&str] = &["members-only", "join this channel", "members only"];

const RATE_LIMITED_PATTERNS: &[&str] = &[
    "429",
    "too many requests",
    "rate limit",
    "http error 429",
];

/// Returns `Some(class)` when `stderr_text` matches a known terminal
/// pattern, `None` if the attempt should fall through to the next client
/// strategy.
#[must_use]
pub fn classify_stderr(stderr_text: &str) -> Option<TerminalClass> {
    let lower = stderr_text.to_lowercase();
    if UNAVAILABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(TerminalClass::Unavailable);
    }
    if MEMBERS_ONLY_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(TerminalClass::MembersOnly);
    }
    if RATE_LIMITED_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(TerminalClass::RateLimited);
    }
    None
}
