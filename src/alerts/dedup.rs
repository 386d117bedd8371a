//! Session-lifetime deduplication of alert conditions
//!
//! Repeated polls of an unchanged condition must not re-notify: once a
//! `(kind, identity)` pair has surfaced, subsequent occurrences are
//! suppressed for the rest of the session. The set grows monotonically and
//! is reset only by process restart. A condition that clears and later
//! recurs is therefore not re-notified either; that is the deliberate
//! notify-once-per-session policy, not an accident.

use crate::alerts::conditions::{AlertCondition, AlertKind};
use std::collections::HashSet;

/// Memory of which alert conditions have already produced a notification
#[derive(Debug, Default)]
pub struct SeenSet {
    seen: HashSet<(AlertKind, String)>,
}

impl SeenSet {
    /// Create an empty seen-set
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the conditions not seen before and record them as seen
    ///
    /// Filtering and recording happen in one step so that a single poll
    /// cycle observes each condition as new exactly once. Callers on a
    /// multithreaded runtime must serialize access to the set.
    pub fn filter_new(&mut self, conditions: &[AlertCondition]) -> Vec<AlertCondition> {
        let mut fresh = Vec::new();
        for condition in conditions {
            let key = (condition.kind, condition.identity.clone());
            if self.seen.insert(key) {
                fresh.push(condition.clone());
            }
        }
        fresh
    }

    /// Whether a condition's occurrence has already been recorded
    pub fn contains(&self, condition: &AlertCondition) -> bool {
        self.seen
            .contains(&(condition.kind, condition.identity.clone()))
    }

    /// Number of recorded occurrences
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no occurrence has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget all recorded occurrences
    ///
    /// Not wired into the poll loop; exists for tests and for a future
    /// re-notification policy.
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(kind: AlertKind, identity: &str, message: &str) -> AlertCondition {
        AlertCondition {
            kind,
            identity: identity.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_first_occurrence_is_new() {
        let mut seen = SeenSet::new();
        let conditions = vec![condition(AlertKind::HighAqi, "high-aqi", "AQI is 160")];

        let fresh = seen.filter_new(&conditions);
        assert_eq!(fresh.len(), 1);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_filter_is_idempotent_across_calls() {
        let mut seen = SeenSet::new();
        let conditions = vec![
            condition(AlertKind::CriticalOutbreak, "o1", "outbreak"),
            condition(AlertKind::HighNoise, "high-noise", "noisy"),
        ];

        let first = seen.filter_new(&conditions);
        assert_eq!(first.len(), 2);

        let second = seen.filter_new(&conditions);
        assert!(second.is_empty());
    }

    #[test]
    fn test_identity_not_message_determines_duplication() {
        let mut seen = SeenSet::new();

        // AQI 160 then AQI 170: same (kind, identity), different message
        let first = seen.filter_new(&[condition(AlertKind::HighAqi, "high-aqi", "AQI is 160")]);
        assert_eq!(first.len(), 1);

        let second = seen.filter_new(&[condition(AlertKind::HighAqi, "high-aqi", "AQI is 170")]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_distinct_identities_of_same_kind_are_distinct() {
        let mut seen = SeenSet::new();
        let first = seen.filter_new(&[condition(AlertKind::CriticalOutbreak, "o1", "a")]);
        let second = seen.filter_new(&[condition(AlertKind::CriticalOutbreak, "o2", "b")]);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_same_identity_different_kind_is_distinct() {
        let mut seen = SeenSet::new();
        seen.filter_new(&[condition(AlertKind::Heatwave, "heatwave", "hot")]);
        let fresh = seen.filter_new(&[condition(AlertKind::FloodForecast, "heatwave", "odd")]);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn test_duplicate_within_single_call_surfaces_once() {
        let mut seen = SeenSet::new();
        let conditions = vec![
            condition(AlertKind::HighAqi, "high-aqi", "AQI is 160"),
            condition(AlertKind::HighAqi, "high-aqi", "AQI is 160"),
        ];
        let fresh = seen.filter_new(&conditions);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn test_reset_allows_renotification() {
        let mut seen = SeenSet::new();
        let conditions = vec![condition(AlertKind::HighNoise, "high-noise", "noisy")];

        seen.filter_new(&conditions);
        assert!(seen.filter_new(&conditions).is_empty());

        seen.reset();
        assert!(seen.is_empty());
        assert_eq!(seen.filter_new(&conditions).len(), 1);
    }
}

// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for AlertKind {
        fn arbitrary(g: &mut Gen) -> Self {
            let choices = [
                AlertKind::CriticalOutbreak,
                AlertKind::HighAqi,
                AlertKind::WaterPhOutOfRange,
                AlertKind::HighNoise,
                AlertKind::Heatwave,
                AlertKind::FloodForecast,
            ];
            *g.choose(&choices).unwrap()
        }
    }

    impl Arbitrary for AlertCondition {
        fn arbitrary(g: &mut Gen) -> Self {
            AlertCondition {
                kind: AlertKind::arbitrary(g),
                identity: format!("id-{}", u8::arbitrary(g) % 8),
                message: String::arbitrary(g),
            }
        }
    }

    #[quickcheck]
    fn prop_second_pass_is_always_empty(conditions: Vec<AlertCondition>) -> bool {
        let mut seen = SeenSet::new();
        seen.filter_new(&conditions);
        seen.filter_new(&conditions).is_empty()
    }

    #[quickcheck]
    fn prop_first_pass_preserves_distinct_keys(conditions: Vec<AlertCondition>) -> bool {
        let mut seen = SeenSet::new();
        let fresh = seen.filter_new(&conditions);

        let mut distinct: std::collections::HashSet<(AlertKind, String)> =
            std::collections::HashSet::new();
        for condition in &conditions {
            distinct.insert((condition.kind, condition.identity.clone()));
        }
        fresh.len() == distinct.len() && seen.len() == distinct.len()
    }

    #[quickcheck]
    fn prop_everything_filtered_is_contained(conditions: Vec<AlertCondition>) -> bool {
        let mut seen = SeenSet::new();
        let fresh = seen.filter_new(&conditions);
        fresh.iter().all(|c| seen.contains(c))
    }
}
