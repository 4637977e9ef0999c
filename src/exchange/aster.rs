//! Live venue client for the Aster perpetual futures REST API
//! (Binance-futures-compatible surface).
//!
//! Public endpoints serve the mark price and daily klines; position and
//! order endpoints are signed with HMAC-SHA256 over the query string.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

use super::OrderResult;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const RECV_WINDOW_MS: u64 = 5_000;

/// Smallest BTCUSDT order the venue accepts, in base units.
const MIN_ORDER_QTY: f64 = 0.001;

/// Quantity step for BTCUSDT (3 decimals).
const QTY_DECIMALS: u32 = 3;

type HmacSha256 = Hmac<Sha256>;

/// Client for the Aster futures API.
pub struct AsterExchange {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    mark_price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionRisk {
    position_amt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    order_id: i64,
}

impl AsterExchange {
    /// Build a client from `ASTER_API_KEY` / `ASTER_API_SECRET`.
    pub fn from_env(base_url: String) -> Result<Self> {
        let api_key = std::env::var("ASTER_API_KEY")
            .context("ASTER_API_KEY environment variable not set")?;
        let api_secret = std::env::var("ASTER_API_SECRET")
            .context("ASTER_API_SECRET environment variable not set")?;

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            api_secret,
        })
    }

    pub async fn get_mark_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/fapi/v1/premiumIndex?symbol={}", self.base_url, symbol);
        debug!(url = %url, "Fetching mark price");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to fetch mark price")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Mark price request failed: {} - {}", status, body);
        }

        let index: PremiumIndex = response
            .json()
            .await
            .context("Failed to parse mark price response")?;
        index
            .mark_price
            .parse()
            .context("Venue returned a non-numeric mark price")
    }

    /// Completed daily closes, oldest first. The venue's kline endpoint
    /// includes the still-forming bar as its final entry; one extra bar is
    /// requested and the last entry dropped so callers only see closed days.
    pub async fn fetch_daily_closes(&self, symbol: &str, limit: usize) -> Result<Vec<f64>> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval=1d&limit={}",
            self.base_url,
            symbol,
            limit + 1
        );
        debug!(url = %url, "Fetching daily klines");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to fetch daily klines")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Klines request failed: {} - {}", status, body);
        }

        let rows: Vec<Vec<serde_json::Value>> = response
            .json()
            .await
            .context("Failed to parse klines response")?;

        let mut closes = Vec::with_capacity(rows.len());
        for row in &rows {
            let close = row
                .get(4)
                .ok_or_else(|| anyhow!("Kline row missing close field"))?;
            let close = match close {
                serde_json::Value::String(s) => s
                    .parse::<f64>()
                    .context("Venue returned a non-numeric close")?,
                serde_json::Value::Number(n) => n
                    .as_f64()
                    .ok_or_else(|| anyhow!("Kline close out of f64 range"))?,
                other => bail!("Unexpected kline close value: {}", other),
            };
            closes.push(close);
        }

        // Drop the in-progress bar.
        closes.pop();
        Ok(closes)
    }

    pub async fn get_position(&self, symbol: &str) -> Result<f64> {
        let query = format!(
            "symbol={}&recvWindow={}&timestamp={}",
            symbol,
            RECV_WINDOW_MS,
            Utc::now().timestamp_millis()
        );
        let url = format!(
            "{}/fapi/v2/positionRisk?{}&signature={}",
            self.base_url,
            query,
            sign(&self.api_secret, &query)
        );

        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .context("Failed to fetch position")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Position request failed: {} - {}", status, body);
        }

        let positions: Vec<PositionRisk> = response
            .json()
            .await
            .context("Failed to parse position response")?;

        // One-way position mode: at most one entry per symbol.
        let amt = match positions.first() {
            Some(p) => p
                .position_amt
                .parse()
                .context("Venue returned a non-numeric position")?,
            None => 0.0,
        };
        Ok(amt)
    }

    /// Move the position to the signed target quantity with a single
    /// market order for the delta.
    pub async fn set_target_position(
        &mut self,
        symbol: &str,
        target_base_qty: f64,
        reduce_only: bool,
    ) -> Result<OrderResult> {
        let current = self.get_position(symbol).await?;
        let delta = quantize(target_base_qty - current, QTY_DECIMALS);

        if delta.abs() < MIN_ORDER_QTY {
            debug!(symbol = %symbol, target = target_base_qty, "Already at target, no order");
            return Ok(OrderResult {
                ok: true,
                mode: "live".to_string(),
                symbol: symbol.to_string(),
                target_base_qty,
                delta: 0.0,
                order_id: None,
                reduce_only,
            });
        }

        let side = if delta > 0.0 { "BUY" } else { "SELL" };
        let client_order_id = uuid::Uuid::new_v4().simple().to_string();
        let query = format!(
            "symbol={}&side={}&type=MARKET&quantity={:.3}&reduceOnly={}&newClientOrderId={}&recvWindow={}&timestamp={}",
            symbol,
            side,
            delta.abs(),
            reduce_only,
            client_order_id,
            RECV_WINDOW_MS,
            Utc::now().timestamp_millis()
        );
        let url = format!(
            "{}/fapi/v1/order?{}&signature={}",
            self.base_url,
            query,
            sign(&self.api_secret, &query)
        );

        info!(symbol = %symbol, side = side, qty = delta.abs(), "Submitting market order");

        let response = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .context("Failed to submit order")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Order submission failed: {} - {}", status, body);
        }

        let ack: OrderAck = response
            .json()
            .await
            .context("Failed to parse order response")?;

        Ok(OrderResult {
            ok: true,
            mode: "live".to_string(),
            symbol: symbol.to_string(),
            target_base_qty,
            delta,
            order_id: Some(ack.order_id.to_string()),
            reduce_only,
        })
    }
}

/// HMAC-SHA256 signature over a query string, hex encoded.
fn sign(secret: &str, query: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Round a signed quantity to the venue's step size.
fn quantize(qty: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (qty * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_matches_reference_vector() {
        // Reference vector from the venue's signed-endpoint documentation.
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign(secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_quantize_to_step() {
        assert_eq!(quantize(0.12349, 3), 0.123);
        assert_eq!(quantize(0.1235, 3), 0.124);
        assert_eq!(quantize(-0.0004, 3), -0.0);
        assert!(quantize(-0.0004, 3).abs() < MIN_ORDER_QTY);
    }
}
