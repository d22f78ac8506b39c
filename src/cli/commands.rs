//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{AutopilotEngine, Scheduler};
use crate::events::spawn_event_logger;
use crate::lifecycle::{ExitStrategy, TimeTravelScenario};
use crate::pilot::{PilotPreferences, PlainEnglishLevel};
use crate::strategy::types::RiskDna;

const DEMO_RISKS: [RiskDna; 6] = [
    RiskDna::UltraSafe,
    RiskDna::Careful,
    RiskDna::Balanced,
    RiskDna::Growth,
    RiskDna::Aggressive,
    RiskDna::Yolo,
];

/// Run the engine with its scheduler until Ctrl-C
pub async fn run(config: &Config, demo_pilots: usize) -> Result<()> {
    info!("Starting AutoPilot engine...");

    let engine = AutopilotEngine::builder(config.clone()).build().await?;
    let logger = spawn_event_logger(engine.events(), engine.shutdown_token());

    for i in 0..demo_pilots {
        let risk = DEMO_RISKS[i % DEMO_RISKS.len()];
        let deposit = 1_000.0 * (1 + i % 5) as f64;
        let pilot = engine
            .create_pilot(
                &format!("demo-user-{}", i + 1),
                deposit,
                PilotPreferences::default().with_risk(risk),
            )
            .await?;
        engine.enable_watch_mode(&pilot.id).await?;
    }

    let mut scheduler = Scheduler::new(engine.clone());
    scheduler.start();
    info!("Engine running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    scheduler.stop().await;
    engine.shutdown().await;
    if let Err(e) = logger.await {
        warn!("Event logger ended abnormally: {}", e);
    }

    print_stats(&engine).await;
    Ok(())
}

/// Drive one pilot through a number of cycles without waiting on timers
pub async fn simulate(config: &Config, deposit: f64, risk: &str, cycles: usize) -> Result<()> {
    let risk: RiskDna = risk
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let mut config = config.clone();
    config.scheduler.execution_delay_ms = 0;
    config.storage.path = None;

    let engine = AutopilotEngine::builder(config).build().await?;
    let pilot = engine
        .create_pilot(
            "simulation",
            deposit,
            PilotPreferences {
                plain_english_level: Some(PlainEnglishLevel::Beginner),
                ..PilotPreferences::default().with_risk(risk)
            },
        )
        .await?;

    println!("\n=== SIMULATION ===\n");
    println!("Pilot: {} ({}, ${:.2})", pilot.id, risk, deposit);

    for cycle in 1..=cycles {
        let report = engine.run_trading_cycle().await;
        engine.run_learning_cycle().await;
        if report.trades_executed > 0 {
            println!("  cycle {:>3}: {} trade(s) executed", cycle, report.trades_executed);
        }
    }
    engine.run_social_proof_cycle().await;

    let snapshot = engine.get_snapshot(&pilot.id).await?;
    let p = &snapshot.pilot;
    println!("\n=== RESULT ===\n");
    println!("Value: ${:.2}", p.current_value);
    println!("Return: ${:.2} ({:+.2}%)", p.total_return, p.total_return_percent);
    println!("Trades: {}  Win rate: {:.0}%", p.total_trades, p.win_rate * 100.0);

    println!("\n=== RECENT TRADES ===\n");
    if snapshot.recent_trades.is_empty() {
        println!("No trades executed.");
    }
    for trade in snapshot.recent_trades.iter().take(5) {
        println!(
            "#{} {} {:.4} {} @ ${:.2} ({})",
            trade.id, trade.side, trade.quantity, trade.asset, trade.price, trade.strategy_id
        );
        println!("    {}", trade.narrative.beginner);
    }

    if let Some(discovery) = &snapshot.discovery {
        println!("\n=== RISK DNA ===\n");
        println!(
            "Declared {} -> discovered {} ({:.0}% confidence)",
            discovery.declared_risk,
            discovery.discovered_risk,
            discovery.confidence * 100.0
        );
        println!("{}", discovery.explanation);
    }

    let travel = engine
        .time_travel(&pilot.id, TimeTravelScenario::LastYear, None)
        .await?;
    println!("\n=== TIME TRAVEL ({}) ===\n", travel.scenario);
    println!(
        "Had you started {}: ${:.2} ({:+.2}%)",
        travel.start_date.format("%Y-%m-%d"),
        travel.hypothetical_value,
        travel.hypothetical_return_percent
    );

    let ramp = engine
        .initiate_exit_ramp(&pilot.id, ExitStrategy::Optimal)
        .await?;
    println!("\n=== EXIT RAMP ===\n");
    println!(
        "{} exit by {}; estimated tax savings ${:.2}",
        ramp.strategy,
        ramp.target_exit_date.format("%Y-%m-%d"),
        ramp.estimated_tax_savings
    );

    Ok(())
}

/// List the absorbed strategy catalog, best ranked first
pub async fn strategies(config: &Config) -> Result<()> {
    let engine = AutopilotEngine::builder(config.clone()).build().await?;
    let mut all: Vec<_> = engine.get_absorbed_strategies().iter().collect();
    all.sort_by(|a, b| b.ranking_score().total_cmp(&a.ranking_score()));

    println!("\n=== ABSORBED STRATEGIES ({}) ===\n", all.len());
    println!(
        "{:<24} {:<12} {:>6} {:>8} {:>7}  {}",
        "ID", "RISK", "WIN", "AVG", "DD", "SOURCE"
    );
    for s in all {
        println!(
            "{:<24} {:<12} {:>5.0}% {:>7.2}% {:>6.0}%  {}",
            s.id,
            s.risk_level.as_str(),
            s.win_rate * 100.0,
            s.avg_return * 100.0,
            s.max_drawdown * 100.0,
            s.source
        );
    }
    Ok(())
}

/// Show persisted pilots and engine-wide totals
pub async fn status(config: &Config) -> Result<()> {
    if config.storage.path.is_none() {
        warn!("No storage.path configured - nothing persisted to report");
    }
    let engine = AutopilotEngine::builder(config.clone()).build().await?;
    print_stats(&engine).await;
    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.summary());
    Ok(())
}

async fn print_stats(engine: &Arc<AutopilotEngine>) {
    let stats = engine.get_global_stats().await;
    println!("\n=== AUTOPILOT STATUS ===\n");
    println!("Pilots: {} ({} active)", stats.total_pilots, stats.active_pilots);
    println!("Trades: {}", stats.total_trades);
    println!("Deposited: ${:.2}", stats.total_deposited);
    println!("Value: ${:.2}", stats.total_value);
    println!("Average return: {:+.2}%", stats.average_return_percent);
    println!("Strategies absorbed: {}", stats.strategies_absorbed);
}
