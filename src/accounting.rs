//! Mark-to-market accounting and the daily-loss kill switch.

use tracing::warn;

use crate::state::BotState;

/// What a single mark observation did to the state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkOutcome {
    /// The return computed for the interval, None on the first-ever mark
    pub daily_return: Option<f64>,

    /// Whether this observation tripped the kill switch
    pub tripped_kill_switch: bool,
}

/// Update equity/return history from the latest mark price and the position
/// held over the elapsed interval.
///
/// The very first observation only records the price: there is no prior
/// baseline to compute a return from. Afterwards the simple return is
/// `held_position * (price / last_price - 1)` -- the position is signed, so
/// a short profits from a price decline. The position applied is whatever is
/// held *now*, including any change made by the previous cycle's decision;
/// that sequencing is part of the equity-curve semantics and must not change.
///
/// The kill switch trips when the computed return is at or below the
/// negative loss limit. It is never cleared here; unhalting requires manual
/// intervention on the state record.
pub fn mark_to_market(
    state: &mut BotState,
    price: f64,
    held_position: f64,
    max_daily_loss_pct: f64,
) -> MarkOutcome {
    let Some(last_price) = state.last_price else {
        state.last_price = Some(price);
        return MarkOutcome {
            daily_return: None,
            tripped_kill_switch: false,
        };
    };

    let ret = held_position * (price / last_price - 1.0);
    state.daily_returns.push(ret);
    let prev_equity = state.current_equity();
    state.equity_curve.push(prev_equity * (1.0 + ret));
    state.last_price = Some(price);

    let mut tripped = false;
    if ret <= -max_daily_loss_pct.abs() {
        if !state.halted {
            warn!(
                daily_return = ret,
                limit = max_daily_loss_pct,
                "Daily loss limit breached, halting"
            );
            tripped = true;
        }
        state.halted = true;
    }

    MarkOutcome {
        daily_return: Some(ret),
        tripped_kill_switch: tripped,
    }
}
