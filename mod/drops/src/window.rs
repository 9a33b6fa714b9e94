//! Time window evaluation.
//!
//! Pure function of `(now, start, end)` — no clock access, no caching.
//! Callers re-evaluate at every decision point since `now` advances.

use chrono::{DateTime, Utc};

use crate::model::DropStatus;

/// Map a claim window and an instant to the drop's lifecycle status.
///
/// Both window edges are inclusive of OPEN: equality to `start` or `end`
/// counts as open. The three cases are exhaustive and non-overlapping.
pub fn status(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> DropStatus {
    if now < start {
        DropStatus::Upcoming
    } else if now <= end {
        DropStatus::Open
    } else {
        DropStatus::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn before_start_is_upcoming() {
        let start = t("2026-06-01T12:00:00Z");
        let end = t("2026-06-01T14:00:00Z");
        assert_eq!(status(start - Duration::seconds(1), start, end), DropStatus::Upcoming);
        assert_eq!(status(start - Duration::days(30), start, end), DropStatus::Upcoming);
    }

    #[test]
    fn edges_are_inclusive_of_open() {
        let start = t("2026-06-01T12:00:00Z");
        let end = t("2026-06-01T14:00:00Z");
        assert_eq!(status(start, start, end), DropStatus::Open);
        assert_eq!(status(end, start, end), DropStatus::Open);
        assert_eq!(status(start + Duration::minutes(30), start, end), DropStatus::Open);
    }

    #[test]
    fn after_end_is_closed() {
        let start = t("2026-06-01T12:00:00Z");
        let end = t("2026-06-01T14:00:00Z");
        assert_eq!(status(end + Duration::seconds(1), start, end), DropStatus::Closed);
        assert_eq!(status(end + Duration::days(365), start, end), DropStatus::Closed);
    }

    #[test]
    fn exhaustive_over_a_sweep() {
        // Walk a minute-granularity sweep across the window and check the
        // three cases partition the timeline with no overlap.
        let start = t("2026-06-01T12:00:00Z");
        let end = t("2026-06-01T13:00:00Z");
        let mut now = start - Duration::minutes(10);
        while now <= end + Duration::minutes(10) {
            let s = status(now, start, end);
            if now < start {
                assert_eq!(s, DropStatus::Upcoming);
            } else if now <= end {
                assert_eq!(s, DropStatus::Open);
            } else {
                assert_eq!(s, DropStatus::Closed);
            }
            now += Duration::minutes(1);
        }
    }
}
