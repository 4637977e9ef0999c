//! Cycle orchestrator: ties accounting, the decision gate, the sizing model,
//! and the venue together, once per invocation.
//!
//! One cycle is a strictly sequential run of blocking steps: load state is
//! done once at construction, then per cycle fetch mark price, mark to
//! market, gate, size, submit, persist. The engine is the single writer of
//! the persisted record; overlapping invocations against the same state
//! file are not supported.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::accounting::mark_to_market;
use crate::config::Config;
use crate::exchange::{Exchange, OrderResult};
use crate::gate;
use crate::state::{BotState, StateStore};
use crate::strategy::compute_target_exposure;

/// How many completed daily bars to request for the sizing model.
const CLOSES_LOOKBACK: usize = 500;

/// Structured outcome of one decision cycle.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Configuration switch is off; nothing ran, nothing persisted
    Disabled,

    /// Kill switch tripped on an earlier cycle; checked before any venue
    /// call, and the record is left untouched
    Halted,

    /// Mark-to-market ran, but today's decision already happened
    AlreadyDecidedToday,

    /// Mark-to-market ran, but the post-midnight settlement buffer has not
    /// elapsed yet
    WaitingForDailyCloseBuffer,

    /// Full decision path executed
    #[serde(rename = "ok")]
    Decided {
        symbol: String,
        price: f64,
        target_exposure: f64,
        target_base_qty: f64,
        order: OrderResult,
    },
}

/// Owns the in-memory state for the lifetime of the process and drives the
/// per-cycle control flow.
pub struct Engine {
    config: Config,
    exchange: Exchange,
    store: StateStore,
    state: BotState,
}

impl Engine {
    /// Load (or initialize) the persisted state and build an engine.
    pub fn new(config: Config, exchange: Exchange) -> Result<Self> {
        let store = StateStore::new(config.state_path.clone());
        let state = store.load()?;

        info!(
            state_path = %store.path().display(),
            equity = state.current_equity(),
            halted = state.halted,
            "Engine initialized"
        );

        Ok(Self {
            config,
            exchange,
            store,
            state,
        })
    }

    /// Run one decision cycle against the current wall clock.
    pub async fn run_once(&mut self) -> Result<CycleOutcome> {
        self.cycle(Utc::now()).await
    }

    /// One cycle at an explicit instant. Any venue or persistence failure
    /// aborts before the end-of-cycle save, leaving the previous durable
    /// record unchanged.
    async fn cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        if !self.config.enabled {
            return Ok(CycleOutcome::Disabled);
        }
        if self.state.halted {
            return Ok(CycleOutcome::Halted);
        }

        let symbol = self.config.symbol.clone();

        let price = self.exchange.get_mark_price(&symbol).await?;
        let held = self.exchange.get_position(&symbol).await?;
        let mark = mark_to_market(
            &mut self.state,
            price,
            held,
            self.config.risk.max_daily_loss_pct,
        );
        if let Some(ret) = mark.daily_return {
            debug!(
                price = price,
                held_position = held,
                daily_return = ret,
                equity = self.state.current_equity(),
                "Marked to market"
            );
        }

        let today = gate::utc_day(now);
        if self.state.last_decision_day == Some(today) {
            self.store.save(&self.state)?;
            return Ok(CycleOutcome::AlreadyDecidedToday);
        }
        if !gate::past_settlement_buffer(now, self.config.decision_buffer_minutes) {
            self.store.save(&self.state)?;
            return Ok(CycleOutcome::WaitingForDailyCloseBuffer);
        }

        let closes = self
            .exchange
            .fetch_daily_closes(&symbol, CLOSES_LOOKBACK)
            .await?;
        let target_exposure =
            compute_target_exposure(&closes, &self.state.equity_curve, &self.config.strategy);

        let target_base_qty = if price > 0.0 {
            target_exposure * self.config.risk.notional_usd / price
        } else {
            0.0
        };

        info!(
            symbol = %symbol,
            price = price,
            target_exposure = target_exposure,
            target_base_qty = target_base_qty,
            "Daily decision"
        );

        let order = self
            .exchange
            .set_target_position(&symbol, target_base_qty, false)
            .await?;

        self.state.last_decision_day = Some(today);
        self.store.save(&self.state)?;

        Ok(CycleOutcome::Decided {
            symbol,
            price,
            target_exposure,
            target_base_qty,
            order,
        })
    }

    /// Continuous mode: one cycle per `poll_seconds`, printing each outcome,
    /// until Ctrl-C. A cycle failure is fatal to the loop; there is no
    /// internal retry.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            poll_seconds = self.config.poll_seconds,
            "Starting continuous run loop"
        );

        let mut ticker = interval(Duration::from_secs(self.config.poll_seconds.max(1)));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.run_once().await?;
                    println!("{}", serde_json::to_string(&outcome)?);

                    if matches!(outcome, CycleOutcome::Halted) {
                        warn!("Bot is halted; cycles will no-op until the state record is cleared manually");
                    }
                }
            }
        }

        Ok(())
    }

    /// Read-only view of the current state (status reporting).
    pub fn state(&self) -> &BotState {
        &self.state
    }
}
