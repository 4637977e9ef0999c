//! Daily systematic BTC bot for Aster perpetuals.
//!
//! One sizing decision per UTC day: dual-momentum direction, volatility
//! targeting, drawdown de-risking, and a daily-loss kill switch, with
//! decision state persisted across restarts.

mod accounting;
mod config;
mod engine;
mod exchange;
mod gate;
mod state;
mod strategy;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Config, VenueMode};
use crate::engine::Engine;
use crate::exchange::{AsterExchange, Exchange, PaperExchange};
use crate::state::StateStore;
use crate::strategy::max_drawdown;

/// Daily BTC trend bot CLI.
#[derive(Parser)]
#[command(name = "asterbot")]
#[command(about = "Daily systematic BTC position sizing with risk overlays", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision cycle and print the outcome
    Once,

    /// Run cycles continuously on the configured poll cadence
    Run,

    /// Show the loaded configuration
    Config,

    /// Show the persisted bot state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Once => {
            let mut engine = Engine::new(config.clone(), build_exchange(&config)?)?;
            let outcome = engine.run_once().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Commands::Run => {
            info!(
                symbol = %config.symbol,
                mode = %config.mode,
                poll_seconds = config.poll_seconds,
                "Starting bot"
            );

            println!("\n=== Aster Daily BTC Bot ===");
            println!("Symbol:          {}", config.symbol);
            println!("Mode:            {}", config.mode);
            println!("Poll interval:   {}s", config.poll_seconds);
            println!(
                "Decision buffer: {}m after UTC midnight",
                config.decision_buffer_minutes
            );
            println!("\nPress Ctrl+C to stop.\n");

            let mut engine = Engine::new(config.clone(), build_exchange(&config)?)?;
            engine.run().await?;
        }

        Commands::Config => {
            println!("\n=== Bot Configuration ===\n");
            println!("Symbol:               {}", config.symbol);
            println!("Enabled:              {}", config.enabled);
            println!("Mode:                 {}", config.mode);
            println!("Poll Interval:        {}s", config.poll_seconds);
            println!("Decision Buffer:      {}m", config.decision_buffer_minutes);
            println!("State Path:           {}", config.state_path.display());

            println!("\nRisk:");
            println!(
                "  Max Daily Loss:     {:.1}%",
                config.risk.max_daily_loss_pct * 100.0
            );
            println!("  Notional:           ${:.2}", config.risk.notional_usd);

            let s = &config.strategy;
            println!("\nStrategy:");
            println!(
                "  Momentum Windows:   {}d / {}d",
                s.momentum_short, s.momentum_long
            );
            println!("  Trend Window:       {}d", s.trend_window);
            println!("  Vol Window:         {}d", s.vol_window);
            println!("  Target Vol:         {:.0}%", s.target_vol * 100.0);
            println!(
                "  Drawdown Tiers:     {:.0}% / {:.0}%",
                s.drawdown_tier1 * 100.0,
                s.drawdown_tier2 * 100.0
            );
            println!("  Max Leverage:       {:.1}x", s.max_leverage);
        }

        Commands::Status => {
            let store = StateStore::new(config.state_path.clone());
            let state = store.load()?;

            println!("\n=== Bot Status ===");
            println!("Halted:           {}", if state.halted { "YES" } else { "no" });
            println!(
                "Last Decision:    {}",
                state
                    .last_decision_day
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "never".to_string())
            );
            println!(
                "Last Mark Price:  {}",
                state
                    .last_price
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "none".to_string())
            );

            println!("\n=== Equity ===");
            println!("Current Equity:   {:.4}", state.current_equity());
            println!(
                "Max Drawdown:     {:.2}%",
                max_drawdown(&state.equity_curve) * 100.0
            );
            println!("Recorded Days:    {}", state.daily_returns.len());
            if let Some(ret) = state.daily_returns.last() {
                println!("Last Return:      {:+.4}%", ret * 100.0);
            }
        }
    }

    Ok(())
}

/// Build the venue selected by the configuration.
fn build_exchange(config: &Config) -> Result<Exchange> {
    match config.mode {
        VenueMode::Paper => {
            let paper = config
                .paper
                .as_ref()
                .context("paper mode requires a [paper] section")?;
            Ok(Exchange::Paper(PaperExchange::from_csv(&paper.closes_csv)?))
        }
        VenueMode::Live => {
            let base_url = config
                .live
                .as_ref()
                .map(|l| l.base_url.clone())
                .unwrap_or_else(|| "https://fapi.asterdex.com".to_string());
            Ok(Exchange::Aster(AsterExchange::from_env(base_url)?))
        }
    }
}
