//! Venue adapters: the price/position/order capabilities the engine needs,
//! with one variant per backing venue.

mod aster;
mod paper;

pub use aster::AsterExchange;
pub use paper::PaperExchange;

use anyhow::Result;
use serde::Serialize;

/// Inspectable record of a position-adjustment submission.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    /// Whether the venue accepted the adjustment
    pub ok: bool,

    /// Which venue handled it ("paper" or "live")
    pub mode: String,

    pub symbol: String,

    /// Requested signed position in base units
    pub target_base_qty: f64,

    /// Quantity actually traded to reach the target (signed)
    pub delta: f64,

    /// Venue order id, when an order was placed
    pub order_id: Option<String>,

    pub reduce_only: bool,
}

/// A trading venue. Exactly one variant is live per deployment; dispatch is
/// by match rather than trait objects so the venue set stays closed.
pub enum Exchange {
    Paper(PaperExchange),
    Aster(AsterExchange),
}

impl Exchange {
    /// Current reference price for the instrument.
    pub async fn get_mark_price(&self, symbol: &str) -> Result<f64> {
        match self {
            Exchange::Paper(venue) => venue.get_mark_price(symbol),
            Exchange::Aster(venue) => venue.get_mark_price(symbol).await,
        }
    }

    /// Completed daily close prices, oldest first, most recent last.
    /// Never includes a still-forming bar.
    pub async fn fetch_daily_closes(&self, symbol: &str, limit: usize) -> Result<Vec<f64>> {
        match self {
            Exchange::Paper(venue) => venue.fetch_daily_closes(symbol, limit),
            Exchange::Aster(venue) => venue.fetch_daily_closes(symbol, limit).await,
        }
    }

    /// Current signed position in base units.
    pub async fn get_position(&self, symbol: &str) -> Result<f64> {
        match self {
            Exchange::Paper(venue) => venue.get_position(symbol),
            Exchange::Aster(venue) => venue.get_position(symbol).await,
        }
    }

    /// Adjust the position toward a signed target quantity.
    pub async fn set_target_position(
        &mut self,
        symbol: &str,
        target_base_qty: f64,
        reduce_only: bool,
    ) -> Result<OrderResult> {
        match self {
            Exchange::Paper(venue) => venue.set_target_position(symbol, target_base_qty, reduce_only),
            Exchange::Aster(venue) => {
                venue
                    .set_target_position(symbol, target_base_qty, reduce_only)
                    .await
            }
        }
    }
}
