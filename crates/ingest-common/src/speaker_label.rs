//! Canonical speaker label type.
//!
//! Replaces the "speaker label enum with aliases" pattern from the original
//! implementation (`"CH"`, `"CHAFFEE"`, `"Chaffee"` all meaning the same
//! known speaker) with a single sum type constructed at the boundary. All
//! string forms are normalised before comparison.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name")]
pub enum SpeakerLabel {
    Known(String),
    Guest,
    Unknown,
}

impl SpeakerLabel {
    /// Build a canonical label from a raw string against the configured
    /// `known_name`, collapsing known aliases and case differences.
    #[must_use]
    pub fn from_raw(raw: &str, known_name: &str) -> Self {
        let normalised = raw.trim().to_lowercase();
        if normalised.is_empty() || normalised == "unknown" {
            return Self::Unknown;
        }
        if normalised == "guest" {
            return Self::Guest;
        }
        if normalised == known_name.to_lowercase() {
            return Self::Known(known_name.to_string());
        }
        Self::Unknown
    }

    #[must_use]
    pub fn is_known(&self, known_name: &str) -> bool {
        matches!(self, Self::Known(n) if n.eq_ignore_ascii_case(known_name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(name) => name,
            Self::Guest => "GUEST",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for SpeakerLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_case_variants() {
        let known = "chaffee";
        assert_eq!(
            SpeakerLabel::from_raw("CHAFFEE", known),
            SpeakerLabel::Known("chaffee".into())
        );
        assert_eq!(
            SpeakerLabel::from_raw("Chaffee", known),
            SpeakerLabel::Known("chaffee".into())
        );
    }

    #[test]
    fn unrecognised_name_is_unknown() {
        assert_eq!(
            SpeakerLabel::from_raw("some-other-speaker", "chaffee"),
            SpeakerLabel::Unknown
        );
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(SpeakerLabel::from_raw("", "chaffee"), SpeakerLabel::Unknown);
        assert_eq!(
            SpeakerLabel::from_raw("   ", "chaffee"),
            SpeakerLabel::Unknown
        );
    }

    #[test]
    fn guest_is_recognised() {
        assert_eq!(SpeakerLabel::from_raw("GUEST", "chaffee"), SpeakerLabel::Guest);
    }
}
