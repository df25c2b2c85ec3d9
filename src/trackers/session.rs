//! Session transition detection
//!
//! Watches the raw session-type code from scoring and, on any change from
//! the immediately preceding code, opens a fresh session context with a
//! newly minted history identifier. Downstream per-session state (stint
//! map, consumption baseline, lap buffer) is invalidated on the caller's
//! side exactly once per transition, even when a code toggles back to a
//! value seen earlier in the run.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::types::{SessionContext, SessionPhase};

/// Stateful watcher around [`SessionPhase::classify`].
#[derive(Debug, Default)]
pub struct SessionClassifier {
    current: Option<SessionContext>,
}

impl SessionClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the session code for this tick. Returns the fresh context on
    /// a transition, including the very first observation.
    pub fn observe(&mut self, code: i32, team_id: &str) -> Option<SessionContext> {
        if self.current.as_ref().map(|context| context.code) == Some(code) {
            return None;
        }

        let phase = SessionPhase::classify(code);
        let context = SessionContext {
            code,
            phase,
            history_id: format!("{}_{}_{}", team_id, phase.as_str(), unix_seconds()),
        };
        info!(code, phase = %phase, history_id = %context.history_id, "session transition");
        self.current = Some(context.clone());
        Some(context)
    }

    pub fn current(&self) -> Option<&SessionContext> {
        self.current.as_ref()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_opens_a_session() {
        let mut classifier = SessionClassifier::new();
        let context = classifier.observe(1, "we-race").unwrap();
        assert_eq!(context.phase, SessionPhase::Practice);
        assert!(context.history_id.starts_with("we-race_PRACTICE_"));

        let stamp: u64 = context
            .history_id
            .rsplit('_')
            .next()
            .unwrap()
            .parse()
            .expect("identifier ends in a unix timestamp");
        assert!(stamp > 1_600_000_000);
    }

    #[test]
    fn unchanged_code_is_silent() {
        let mut classifier = SessionClassifier::new();
        classifier.observe(5, "t");
        assert!(classifier.observe(5, "t").is_none());
        assert!(classifier.observe(5, "t").is_none());
        assert_eq!(classifier.current().unwrap().phase, SessionPhase::Qualify);
    }

    #[test]
    fn each_code_change_is_a_fresh_transition() {
        let mut classifier = SessionClassifier::new();
        let first = classifier.observe(1, "t").unwrap();
        let second = classifier.observe(10, "t").unwrap();
        assert_ne!(first.history_id, second.history_id);
        assert_eq!(second.phase, SessionPhase::Race);

        // Toggling back to an earlier code still counts as a transition.
        let third = classifier.observe(1, "t").unwrap();
        assert_eq!(third.phase, SessionPhase::Practice);
        assert_eq!(classifier.current().unwrap().code, 1);
    }

    #[test]
    fn phases_flow_into_the_identifier() {
        let mut classifier = SessionClassifier::new();
        assert!(classifier.observe(9, "t").unwrap().history_id.contains("_WARMUP_"));
        assert!(classifier.observe(0, "t").unwrap().history_id.contains("_TEST_"));
    }

    #[test]
    fn reset_makes_the_next_observation_a_transition() {
        let mut classifier = SessionClassifier::new();
        classifier.observe(3, "t");
        assert!(classifier.observe(3, "t").is_none());

        classifier.reset();
        assert!(classifier.current().is_none());
        assert!(classifier.observe(3, "t").is_some());
    }
}
