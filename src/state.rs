//! Durable decision state, persisted as a single JSON document.
//!
//! Stores everything needed to resume after restart:
//! - The last UTC day a sizing decision was made
//! - The strategy equity curve and daily return history
//! - The last observed mark price
//! - The kill-switch flag
//!
//! The document is human-inspectable and forward compatible: missing
//! optional fields take their defaults on load, unknown fields are ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted per-deployment state, one record per instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotState {
    /// UTC day (YYYY-MM-DD) of the most recent sizing decision
    #[serde(default)]
    pub last_decision_day: Option<NaiveDate>,

    /// Strategy equity curve, baseline 1.0 at index 0; append-only, never empty
    #[serde(default = "initial_equity_curve")]
    pub equity_curve: Vec<f64>,

    /// Daily returns, parallel to the equity curve offset by one
    #[serde(default)]
    pub daily_returns: Vec<f64>,

    /// Most recently observed mark price; None before the first mark
    #[serde(default)]
    pub last_price: Option<f64>,

    /// Kill switch; once set it is never cleared by the bot itself
    #[serde(default)]
    pub halted: bool,
}

fn initial_equity_curve() -> Vec<f64> {
    vec![1.0]
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            last_decision_day: None,
            equity_curve: initial_equity_curve(),
            daily_returns: Vec::new(),
            last_price: None,
            halted: false,
        }
    }
}

impl BotState {
    /// Latest equity value. The curve is never empty by construction.
    pub fn current_equity(&self) -> f64 {
        *self.equity_curve.last().unwrap_or(&1.0)
    }
}

/// File-backed store for [`BotState`].
///
/// Saves are atomic: the document is written to a sibling temp file and
/// renamed over the target, so a crash mid-write cannot corrupt the record.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, or the defaults if no record exists yet.
    pub fn load(&self) -> Result<BotState> {
        if !self.path.exists() {
            return Ok(BotState::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse state file {}", self.path.display()))
    }

    /// Persist the state, creating parent directories as needed.
    pub fn save(&self, state: &BotState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create state directory {}", parent.display())
                })?;
            }
        }

        let raw = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)
            .with_context(|| format!("Failed to write state file {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace state file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = BotState::default();
        assert_eq!(state.equity_curve, vec![1.0]);
        assert!(state.daily_returns.is_empty());
        assert!(state.last_price.is_none());
        assert!(state.last_decision_day.is_none());
        assert!(!state.halted);
    }

    #[test]
    fn test_serde_round_trip() {
        let state = BotState {
            last_decision_day: NaiveDate::from_ymd_opt(2024, 5, 2),
            equity_curve: vec![1.0, 1.01, 0.99],
            daily_returns: vec![0.01, -0.0198],
            last_price: Some(64_250.5),
            halted: true,
        };

        let raw = serde_json::to_string(&state).unwrap();
        let restored: BotState = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, state);

        // The decision day serializes in calendar form.
        assert!(raw.contains("2024-05-02"));
    }

    #[test]
    fn test_forward_compatible_load() {
        // Missing optional fields default; unknown fields are ignored.
        let raw = r#"{ "equity_curve": [1.0, 1.02], "future_field": 7 }"#;
        let state: BotState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.equity_curve, vec![1.0, 1.02]);
        assert!(state.last_price.is_none());
        assert!(!state.halted);
    }

    #[test]
    fn test_store_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "asterbot_state_test_{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let store = StateStore::new(&path);

        // No file yet: defaults.
        let state = store.load().unwrap();
        assert_eq!(state, BotState::default());

        let mut state = state;
        state.last_price = Some(50_000.0);
        state.daily_returns.push(0.002);
        state.equity_curve.push(1.002);
        store.save(&state).unwrap();

        let restored = store.load().unwrap();
        assert_eq!(restored, state);

        let _ = std::fs::remove_file(&path);
    }
}
