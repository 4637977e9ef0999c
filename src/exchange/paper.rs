//! Paper venue: daily closes from a CSV history file, position held in
//! memory. No orders leave the process.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use super::OrderResult;

/// One row of the close-history file. Extra columns (date, OHLV) are ignored.
#[derive(Debug, Deserialize)]
struct CloseRow {
    #[serde(rename = "Close")]
    close: f64,
}

/// Simulated venue backed by a fixed daily close series.
pub struct PaperExchange {
    closes: Vec<f64>,
    position: f64,
}

impl PaperExchange {
    /// Load the close history from a CSV file with a `Close` column,
    /// oldest row first.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open close history {}", path.display()))?;

        let mut closes = Vec::new();
        for row in reader.deserialize() {
            let row: CloseRow = row
                .with_context(|| format!("Malformed row in close history {}", path.display()))?;
            closes.push(row.close);
        }

        if closes.is_empty() {
            bail!("Close history {} contains no rows", path.display());
        }

        info!(bars = closes.len(), path = %path.display(), "Loaded paper close history");
        Ok(Self {
            closes,
            position: 0.0,
        })
    }

    /// Build a venue directly from a close series (tests).
    pub fn with_closes(closes: Vec<f64>) -> Self {
        Self {
            closes,
            position: 0.0,
        }
    }

    pub fn get_mark_price(&self, _symbol: &str) -> Result<f64> {
        match self.closes.last() {
            Some(&px) => Ok(px),
            None => bail!("Paper venue has no price history"),
        }
    }

    pub fn fetch_daily_closes(&self, _symbol: &str, limit: usize) -> Result<Vec<f64>> {
        let start = self.closes.len().saturating_sub(limit);
        Ok(self.closes[start..].to_vec())
    }

    pub fn get_position(&self, _symbol: &str) -> Result<f64> {
        Ok(self.position)
    }

    pub fn set_target_position(
        &mut self,
        symbol: &str,
        target_base_qty: f64,
        reduce_only: bool,
    ) -> Result<OrderResult> {
        let delta = target_base_qty - self.position;
        self.position = target_base_qty;

        Ok(OrderResult {
            ok: true,
            mode: "paper".to_string(),
            symbol: symbol.to_string(),
            target_base_qty,
            delta,
            order_id: None,
            reduce_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_price_is_latest_close() {
        let venue = PaperExchange::with_closes(vec![100.0, 101.0, 99.5]);
        assert_eq!(venue.get_mark_price("BTCUSDT").unwrap(), 99.5);
    }

    #[test]
    fn test_fetch_closes_tail() {
        let venue = PaperExchange::with_closes(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            venue.fetch_daily_closes("BTCUSDT", 2).unwrap(),
            vec![3.0, 4.0]
        );
        // Asking for more than exists returns everything.
        assert_eq!(venue.fetch_daily_closes("BTCUSDT", 10).unwrap().len(), 4);
    }

    #[test]
    fn test_position_tracks_target() {
        let mut venue = PaperExchange::with_closes(vec![100.0]);
        let result = venue.set_target_position("BTCUSDT", 0.5, false).unwrap();
        assert!(result.ok);
        assert_eq!(result.delta, 0.5);
        assert_eq!(venue.get_position("BTCUSDT").unwrap(), 0.5);

        let result = venue.set_target_position("BTCUSDT", -0.25, false).unwrap();
        assert_eq!(result.delta, -0.75);
        assert_eq!(venue.get_position("BTCUSDT").unwrap(), -0.25);
    }

    #[test]
    fn test_from_csv() {
        let path = std::env::temp_dir().join(format!(
            "asterbot_paper_test_{}.csv",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "Date,Open,High,Low,Close\n2024-05-01,99,102,98,100.5\n2024-05-02,100.5,104,100,103.25\n",
        )
        .unwrap();

        let venue = PaperExchange::from_csv(&path).unwrap();
        assert_eq!(venue.get_mark_price("BTCUSDT").unwrap(), 103.25);
        assert_eq!(
            venue.fetch_daily_closes("BTCUSDT", 10).unwrap(),
            vec![100.5, 103.25]
        );

        let _ = std::fs::remove_file(&path);
    }
}
