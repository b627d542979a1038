//! Decides whether a scheduled time of day is due at a given instant.

use crate::config::MidnightPolicy;
use crate::constants::DEFAULT_TOLERANCE_MINUTES;
use chrono::{NaiveTime, TimeDelta};

/// Tolerance window around "now".
///
/// A scheduled time is due when its distance from `now` is strictly less than the tolerance,
/// so with the default one-minute window an entry exactly one minute away is not due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    tolerance: TimeDelta,
    policy: MidnightPolicy,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(
            TimeDelta::minutes(DEFAULT_TOLERANCE_MINUTES),
            MidnightPolicy::SameDay,
        )
    }
}

impl TimeWindow {
    pub fn new(tolerance: TimeDelta, policy: MidnightPolicy) -> Self {
        Self { tolerance, policy }
    }

    pub fn tolerance(&self) -> TimeDelta {
        self.tolerance
    }

    pub fn policy(&self) -> MidnightPolicy {
        self.policy
    }

    /// Absolute distance between two times of day under the configured midnight policy.
    pub fn distance(&self, scheduled: NaiveTime, now: NaiveTime) -> TimeDelta {
        let diff = scheduled - now;
        let diff = if diff < TimeDelta::zero() { -diff } else { diff };

        match self.policy {
            MidnightPolicy::SameDay => diff,
            MidnightPolicy::Wraparound => diff.min(TimeDelta::days(1) - diff),
        }
    }

    pub fn is_due(&self, scheduled: NaiveTime, now: NaiveTime) -> bool {
        self.distance(scheduled, now) < self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn exact_match_is_due() {
        assert!(TimeWindow::default().is_due(t(9, 0, 0), t(9, 0, 0)));
    }

    #[test]
    fn inside_window_on_either_side_is_due() {
        let window = TimeWindow::default();
        assert!(window.is_due(t(9, 0, 0), t(9, 0, 30)));
        assert!(window.is_due(t(9, 0, 0), t(8, 59, 1)));
    }

    #[test]
    fn boundary_is_exclusive() {
        let window = TimeWindow::default();
        assert!(!window.is_due(t(9, 0, 0), t(9, 1, 0)));
        assert!(!window.is_due(t(9, 0, 0), t(8, 59, 0)));

        let just_inside = NaiveTime::from_hms_milli_opt(9, 0, 59, 940).unwrap();
        assert!(window.is_due(t(9, 0, 0), just_inside));
    }

    #[test]
    fn two_minutes_away_is_not_due() {
        assert!(!TimeWindow::default().is_due(t(9, 0, 0), t(9, 2, 0)));
    }

    #[test]
    fn same_day_policy_does_not_wrap_midnight() {
        let window = TimeWindow::default();
        assert!(!window.is_due(t(23, 59, 30), t(0, 0, 0)));
        assert_eq!(
            window.distance(t(23, 59, 0), t(0, 0, 0)),
            TimeDelta::minutes(1439)
        );
    }

    #[test]
    fn wraparound_policy_spans_midnight() {
        let window = TimeWindow::new(TimeDelta::minutes(1), MidnightPolicy::Wraparound);
        assert!(window.is_due(t(23, 59, 30), t(0, 0, 0)));
        assert!(window.is_due(t(0, 0, 20), t(23, 59, 50)));
        assert!(!window.is_due(t(23, 59, 0), t(0, 0, 0)));
        assert_eq!(
            window.distance(t(23, 59, 0), t(0, 0, 0)),
            TimeDelta::minutes(1)
        );
    }

    #[test]
    fn wider_tolerance_is_respected() {
        let window = TimeWindow::new(TimeDelta::minutes(5), MidnightPolicy::SameDay);
        assert!(window.is_due(t(9, 0, 0), t(9, 4, 59)));
        assert!(!window.is_due(t(9, 0, 0), t(9, 5, 0)));
    }
}
