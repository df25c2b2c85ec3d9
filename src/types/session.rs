//! Session phase classification types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse session phase derived from the producer's raw session code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionPhase {
    #[default]
    #[serde(rename = "TEST")]
    TestDay,
    #[serde(rename = "PRACTICE")]
    Practice,
    #[serde(rename = "QUALIFY")]
    Qualify,
    #[serde(rename = "WARMUP")]
    Warmup,
    #[serde(rename = "RACE")]
    Race,
}

impl SessionPhase {
    /// Maps a raw session code onto its phase. Codes are disjoint ranges:
    /// 1-4 practice, 5-8 qualifying, 9 warmup, 10 and up race; anything
    /// else (including 0) is a test day.
    pub fn classify(code: i32) -> Self {
        match code {
            1..=4 => SessionPhase::Practice,
            5..=8 => SessionPhase::Qualify,
            9 => SessionPhase::Warmup,
            c if c >= 10 => SessionPhase::Race,
            _ => SessionPhase::TestDay,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::TestDay => "TEST",
            SessionPhase::Practice => "PRACTICE",
            SessionPhase::Qualify => "QUALIFY",
            SessionPhase::Warmup => "WARMUP",
            SessionPhase::Race => "RACE",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active session as seen by the aggregation path.
///
/// `history_id` is regenerated exactly once per session-code change and keys
/// all recorded data for the session; a change invalidates every per-session
/// tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionContext {
    pub code: i32,
    pub phase: SessionPhase,
    pub history_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_ranges_are_disjoint() {
        assert_eq!(SessionPhase::classify(0), SessionPhase::TestDay);
        assert_eq!(SessionPhase::classify(-3), SessionPhase::TestDay);
        for code in 1..=4 {
            assert_eq!(SessionPhase::classify(code), SessionPhase::Practice);
        }
        for code in 5..=8 {
            assert_eq!(SessionPhase::classify(code), SessionPhase::Qualify);
        }
        assert_eq!(SessionPhase::classify(9), SessionPhase::Warmup);
        assert_eq!(SessionPhase::classify(10), SessionPhase::Race);
        assert_eq!(SessionPhase::classify(13), SessionPhase::Race);
    }

    #[test]
    fn phase_serializes_as_wire_string() {
        let json = serde_json::to_string(&SessionPhase::TestDay).unwrap();
        assert_eq!(json, "\"TEST\"");
        let json = serde_json::to_string(&SessionPhase::Race).unwrap();
        assert_eq!(json, "\"RACE\"");
    }
}
