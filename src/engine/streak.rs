/// Streak calculation over UTC calendar days
///
/// A streak counts consecutive calendar days with recorded activity. Days are
/// taken in UTC so the result does not depend on where the client runs.

use chrono::{DateTime, NaiveDate, Utc};

/// Streak fields after an activity has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak_days: u32,
    pub last_activity: DateTime<Utc>,
}

/// Apply one activity at `at` to the current streak
///
/// - first activity ever starts a streak of 1
/// - same day leaves the count unchanged
/// - the next calendar day extends it by one
/// - a gap of two or more days restarts it at 1
/// - an activity on an earlier day than the last one is ignored for streak purposes
pub fn advance_streak(
    streak_days: u32,
    last_activity: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
) -> StreakUpdate {
    let last = match last_activity {
        None => {
            return StreakUpdate {
                streak_days: 1,
                last_activity: at,
            }
        }
        Some(last) => last,
    };

    match day_gap(last.date_naive(), at.date_naive()) {
        gap if gap < 0 => StreakUpdate {
            streak_days,
            last_activity: last,
        },
        0 => StreakUpdate {
            streak_days: streak_days.max(1),
            last_activity: last.max(at),
        },
        1 => StreakUpdate {
            streak_days: streak_days.saturating_add(1),
            last_activity: at,
        },
        _ => StreakUpdate {
            streak_days: 1,
            last_activity: at,
        },
    }
}

/// Whether a streak is still alive on `today`
///
/// The stored count only changes when activity is recorded, so a streak whose
/// last day is before yesterday is already broken even though the count stays.
pub fn is_streak_alive(last_activity: Option<DateTime<Utc>>, today: NaiveDate) -> bool {
    match last_activity {
        None => false,
        Some(last) => (0..=1).contains(&day_gap(last.date_naive(), today)),
    }
}

fn day_gap(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
