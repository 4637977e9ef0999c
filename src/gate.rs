//! Decision gate: at most one sizing decision per UTC calendar day, and
//! never inside the settlement buffer right after midnight (upstream venues
//! need a moment to finalize the prior day's bar).

use chrono::{DateTime, NaiveDate, Timelike, Utc};

use crate::state::BotState;

/// Current UTC calendar day.
pub fn utc_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Whether the wall clock is past the post-midnight settlement buffer.
pub fn past_settlement_buffer(now: DateTime<Utc>, buffer_minutes: u32) -> bool {
    now.hour() == 0 && now.minute() >= buffer_minutes || now.hour() > 0
}

/// Whether a new sizing decision is permitted right now.
pub fn is_decision_due(state: &BotState, now: DateTime<Utc>, buffer_minutes: u32) -> bool {
    state.last_decision_day != Some(utc_day(now)) && past_settlement_buffer(now, buffer_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, h, m, 0).unwrap()
    }

    #[test]
    fn test_buffer_edges() {
        assert!(!past_settlement_buffer(at(0, 0), 10));
        assert!(!past_settlement_buffer(at(0, 9), 10));
        assert!(past_settlement_buffer(at(0, 10), 10));
        assert!(past_settlement_buffer(at(1, 0), 10));
        assert!(past_settlement_buffer(at(23, 59), 10));
    }

    #[test]
    fn test_zero_buffer_is_always_past() {
        assert!(past_settlement_buffer(at(0, 0), 0));
    }

    #[test]
    fn test_due_on_fresh_day() {
        let state = BotState::default();
        assert!(is_decision_due(&state, at(12, 0), 10));
    }

    #[test]
    fn test_not_due_inside_buffer() {
        let state = BotState::default();
        assert!(!is_decision_due(&state, at(0, 5), 10));
    }

    #[test]
    fn test_idempotent_within_a_day() {
        let mut state = BotState::default();
        let now = at(12, 0);
        assert!(is_decision_due(&state, now, 10));

        // A decision records the day; the gate stays closed for the rest of it.
        state.last_decision_day = Some(utc_day(now));
        assert!(!is_decision_due(&state, now, 10));
        assert!(!is_decision_due(&state, at(23, 59), 10));
    }

    #[test]
    fn test_reopens_next_day() {
        let state = BotState {
            last_decision_day: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..BotState::default()
        };
        assert!(is_decision_due(&state, at(0, 15), 10));
    }
}
