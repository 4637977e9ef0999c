//! Bot configuration: loaded once from a JSON file, validated at startup,
//! read-only afterwards.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// The only instrument this bot is allowed to trade.
pub const SUPPORTED_SYMBOL: &str = "BTCUSDT";

/// Which venue backs the exchange interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueMode {
    /// Simulated venue: CSV close history, in-memory position
    Paper,
    /// Live venue: Aster perpetual futures REST API
    Live,
}

impl std::fmt::Display for VenueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenueMode::Paper => write!(f, "paper"),
            VenueMode::Live => write!(f, "live"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Instrument symbol; only BTCUSDT is supported
    pub symbol: String,

    /// Master switch; when false every cycle short-circuits immediately
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Venue selection (paper or live)
    #[serde(default = "default_mode")]
    pub mode: VenueMode,

    /// Continuous-mode polling cadence in seconds
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,

    /// Minutes past UTC midnight before a new day's decision may run
    #[serde(default = "default_decision_buffer_minutes")]
    pub decision_buffer_minutes: u32,

    /// Where the persisted state document lives
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Risk limits
    pub risk: RiskConfig,

    /// Sizing model parameters
    pub strategy: StrategyParams,

    /// Paper venue settings (required in paper mode)
    #[serde(default)]
    pub paper: Option<PaperConfig>,

    /// Live venue settings
    #[serde(default)]
    pub live: Option<LiveConfig>,
}

/// Risk limits applied by the accountant and the quantity conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// One-day loss (as a fraction of equity) that trips the kill switch
    pub max_daily_loss_pct: f64,

    /// Notional in USD corresponding to 1.0x exposure
    pub notional_usd: f64,
}

/// Parameters of the sizing model. Field keys match the config file's
/// short names; the Rust names spell them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Short momentum lookback in days
    #[serde(rename = "ms")]
    pub momentum_short: usize,

    /// Long momentum lookback in days
    #[serde(rename = "ml")]
    pub momentum_long: usize,

    /// Trend filter SMA window in days
    #[serde(rename = "tr")]
    pub trend_window: usize,

    /// Realized-volatility lookback in days
    #[serde(rename = "v")]
    pub vol_window: usize,

    /// Target annualized volatility
    #[serde(rename = "tv")]
    pub target_vol: f64,

    /// Tier-1 drawdown threshold (halve exposure)
    #[serde(rename = "dd1")]
    pub drawdown_tier1: f64,

    /// Tier-2 drawdown threshold (flatten entirely)
    #[serde(rename = "dd2")]
    pub drawdown_tier2: f64,

    /// Hard leverage cap
    #[serde(rename = "maxlev")]
    pub max_leverage: f64,
}

/// Paper venue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// CSV file with a `Close` column of daily closes, oldest first
    pub closes_csv: PathBuf,
}

/// Live venue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// REST API base URL
    #[serde(default = "default_live_base_url")]
    pub base_url: String,
}

fn default_enabled() -> bool {
    true
}

fn default_mode() -> VenueMode {
    VenueMode::Paper
}

fn default_poll_seconds() -> u64 {
    60
}

fn default_decision_buffer_minutes() -> u32 {
    10
}

fn default_state_path() -> PathBuf {
    PathBuf::from("asterbot_state.json")
}

fn default_live_base_url() -> String {
    "https://fapi.asterdex.com".to_string()
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bot must not run with.
    pub fn validate(&self) -> Result<()> {
        if self.symbol != SUPPORTED_SYMBOL {
            bail!(
                "Unsupported symbol {:?}: this bot is restricted to {} by design",
                self.symbol,
                SUPPORTED_SYMBOL
            );
        }
        if self.risk.max_daily_loss_pct <= 0.0 {
            bail!("risk.max_daily_loss_pct must be positive");
        }
        if self.risk.notional_usd <= 0.0 {
            bail!("risk.notional_usd must be positive");
        }
        if self.strategy.max_leverage <= 0.0 {
            bail!("strategy.maxlev must be positive");
        }
        if self.strategy.target_vol <= 0.0 {
            bail!("strategy.tv must be positive");
        }
        if self.mode == VenueMode::Paper && self.paper.is_none() {
            bail!("paper mode requires a [paper] section with closes_csv");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "symbol": "BTCUSDT",
            "mode": "paper",
            "risk": { "max_daily_loss_pct": 0.05, "notional_usd": 1000.0 },
            "strategy": {
                "ms": 5, "ml": 10, "tr": 100, "v": 20,
                "tv": 0.5, "dd1": 0.1, "dd2": 0.2, "maxlev": 3.0
            },
            "paper": { "closes_csv": "data/btc_daily.csv" }
        }"#
    }

    #[test]
    fn test_parse_with_defaults() {
        let config: Config = serde_json::from_str(sample_json()).unwrap();
        assert!(config.enabled);
        assert_eq!(config.poll_seconds, 60);
        assert_eq!(config.decision_buffer_minutes, 10);
        assert_eq!(config.strategy.momentum_short, 5);
        assert_eq!(config.strategy.max_leverage, 3.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_other_symbols() {
        let mut config: Config = serde_json::from_str(sample_json()).unwrap();
        config.symbol = "ETHUSDT".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_missing_risk_params() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "risk": { "notional_usd": 1000.0 },
            "strategy": {
                "ms": 5, "ml": 10, "tr": 100, "v": 20,
                "tv": 0.5, "dd1": 0.1, "dd2": 0.2, "maxlev": 3.0
            }
        }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_rejects_nonpositive_limits() {
        let mut config: Config = serde_json::from_str(sample_json()).unwrap();
        config.risk.max_daily_loss_pct = 0.0;
        assert!(config.validate().is_err());
    }
}
