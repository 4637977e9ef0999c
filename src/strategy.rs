//! Pure sizing model: dual-momentum consensus with trend dampening,
//! volatility targeting, and a two-tier drawdown overlay.
//!
//! `compute_target_exposure` is a pure function of its inputs: no clock, no
//! randomness, no hidden state. Insufficient history never errors; it just
//! degrades the signal toward flat.

use statrs::statistics::Statistics;

use crate::config::StrategyParams;

/// Calendar days used to annualize daily volatility (crypto trades 24/7).
const DAYS_PER_YEAR: f64 = 365.0;

/// Realized volatility below this is treated as no signal at all.
const MIN_REALIZED_VOL: f64 = 1e-9;

/// Simple moving average over the last `n` values.
pub fn sma(values: &[f64], n: usize) -> Option<f64> {
    if n == 0 || values.len() < n {
        return None;
    }
    Some(values[values.len() - n..].iter().mean())
}

/// Annualized realized volatility over the last `lookback` daily returns,
/// computed as the root mean square of the window.
pub fn realized_vol_annual(daily_returns: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || daily_returns.len() < lookback {
        return None;
    }
    let window = &daily_returns[daily_returns.len() - lookback..];
    let rv_daily = window.iter().map(|r| r * r).mean().sqrt();
    Some(rv_daily * DAYS_PER_YEAR.sqrt())
}

/// Maximum peak-to-trough drawdown of an equity curve, as a fraction of the
/// running peak. Returns 0.0 for an empty curve.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut mdd = 0.0f64;
    for &x in equity_curve {
        if x > peak {
            peak = x;
        }
        let dd = if peak > 0.0 { 1.0 - x / peak } else { 0.0 };
        mdd = mdd.max(dd);
    }
    mdd
}

/// Turn a completed-bar close series and an equity history into a target
/// exposure in `[-maxlev, maxlev]`.
///
/// Callers must pass completed daily bars only; an in-progress bar would
/// leak future information into the momentum terms.
pub fn compute_target_exposure(
    closes: &[f64],
    equity_curve: &[f64],
    params: &StrategyParams,
) -> f64 {
    let need = params
        .momentum_short
        .max(params.momentum_long)
        .max(params.trend_window)
        .max(params.vol_window)
        + 2;
    if closes.len() < need {
        return 0.0;
    }

    let last = closes[closes.len() - 1];

    // Dual-momentum consensus: both lookbacks must agree in sign, and an
    // exactly-zero move counts as disagreement.
    let mom_s = last / closes[closes.len() - 1 - params.momentum_short] - 1.0;
    let mom_l = last / closes[closes.len() - 1 - params.momentum_long] - 1.0;
    let mut base = if mom_s > 0.0 && mom_l > 0.0 {
        1.0
    } else if mom_s < 0.0 && mom_l < 0.0 {
        -1.0
    } else {
        0.0
    };

    // Trend dampening: counter-trend shorts are cut harder than
    // counter-trend longs.
    if let Some(trend_ma) = sma(closes, params.trend_window) {
        let bull = last >= trend_ma;
        if bull && base < 0.0 {
            base *= 0.5;
        }
        if !bull && base > 0.0 {
            base *= 0.75;
        }
    }

    // Volatility targeting over the full return series.
    let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let lev = match realized_vol_annual(&returns, params.vol_window) {
        Some(rv) if rv > MIN_REALIZED_VOL => {
            (params.target_vol / rv).clamp(0.0, params.max_leverage)
        }
        _ => 0.0,
    };

    let mut target = base * lev;

    // Drawdown overlay from strategy equity; tier-2 first, tiers are not
    // cumulative.
    if !equity_curve.is_empty() {
        let mdd = max_drawdown(equity_curve);
        if mdd >= params.drawdown_tier2 {
            target = 0.0;
        } else if mdd >= params.drawdown_tier1 {
            target *= 0.5;
        }
    }

    target.clamp(-params.max_leverage, params.max_leverage)
}
