//! Engine cycles
//!
//! Each cycle walks every pilot. Pilot locks are held only for short
//! synchronous sections: evaluation, quoting and the execution delay all
//! happen with the lock released, and state is re-validated on relock.

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AutopilotEngine;
use crate::events::EngineEvent;
use crate::learning::apply_learning;
use crate::pilot::{AssetMix, Pilot, PilotStatus, TradeStatus};
use crate::social::{rank_all, Standing};
use crate::store::PilotHandle;
use crate::strategy::admission::SignalDecision;
use crate::strategy::selector::select_strategies_for_pilot;
use crate::strategy::types::{AssetClass, Strategy};

/// Tally of one trading cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub pilots_evaluated: usize,
    pub trades_queued: usize,
    pub trades_executed: usize,
    /// Admitted signals dropped for lack of an asset, a quote or a size
    pub trades_skipped: usize,
    /// Pending trades dropped because the pilot paused or exited
    pub trades_cancelled: usize,
    pub trades_failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutionOutcome {
    Executed,
    Cancelled,
    Failed,
}

/// Asset class a strategy trades for a pilot. Single-class mixes pin the class.
fn trade_class(strategy: &Strategy, mix: AssetMix) -> AssetClass {
    let pinned = match mix {
        AssetMix::StocksOnly => Some(AssetClass::Stocks),
        AssetMix::CryptoOnly => Some(AssetClass::Crypto),
        AssetMix::ForexOnly => Some(AssetClass::Forex),
        _ => None,
    };
    match pinned {
        Some(class) if strategy.supports(class) => class,
        _ => strategy.primary_asset_class(),
    }
}

impl AutopilotEngine {
    /// One trading pass over every pilot. Queued trades execute after the
    /// configured delay; the cycle returns once all of them settle.
    pub async fn run_trading_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let mut executions = Vec::new();

        for pilot_id in self.pilots.ids().await {
            let Some(handle) = self.pilots.get(&pilot_id).await else {
                continue;
            };

            let pilot = {
                let mut state = handle.lock().await;
                if state.pilot.status == PilotStatus::Paused {
                    state.behavior.record_missed();
                }
                if !state.pilot.is_tradeable() {
                    continue;
                }
                state.pilot.clone()
            };
            report.pilots_evaluated += 1;

            let token = self.pilot_token(&pilot_id);
            let queued = self.queue_trades(&handle, &pilot, &mut report).await;
            for trade_id in queued {
                executions.push(self.execute_pending(handle.clone(), trade_id, token.clone()));
            }
        }

        for outcome in join_all(executions).await {
            match outcome {
                ExecutionOutcome::Executed => report.trades_executed += 1,
                ExecutionOutcome::Cancelled => report.trades_cancelled += 1,
                ExecutionOutcome::Failed => report.trades_failed += 1,
            }
        }

        if report.trades_queued > 0 {
            self.persist().await;
        }
        if report.trades_executed > 0 {
            info!(
                "Trading cycle: {} pilots, {} executed, {} cancelled",
                report.pilots_evaluated, report.trades_executed, report.trades_cancelled
            );
        }
        report
    }

    /// Evaluate ranked strategies and queue admitted trades. Returns queued ids.
    async fn queue_trades(&self, handle: &PilotHandle, pilot: &Pilot, report: &mut CycleReport) -> Vec<u64> {
        let config = self.executor.config();
        let mut queued = Vec::new();
        if config.max_trades_per_cycle == 0 {
            return queued;
        }

        let candidates: Vec<&Strategy> = select_strategies_for_pilot(pilot, &self.catalog)
            .into_iter()
            .take(config.top_n)
            .collect();

        for strategy in candidates {
            let side = match self.evaluator.evaluate(strategy, pilot).await {
                SignalDecision::Accept { side } => side,
                SignalDecision::Reject => continue,
            };

            let class = trade_class(strategy, pilot.asset_mix);
            let Some(asset) = self.oracle.pick_asset(class, strategy).await else {
                debug!(pilot_id = %pilot.id, strategy = %strategy.id, %class, "No asset to trade");
                report.trades_skipped += 1;
                continue;
            };
            let quote = match self.oracle.quote(&asset).await {
                Some(q) if q.price.is_finite() && q.price > 0.0 => q,
                _ => {
                    debug!(pilot_id = %pilot.id, %asset, "No usable quote");
                    report.trades_skipped += 1;
                    continue;
                }
            };
            let sizing = self.executor.explain_size(pilot);
            let Some(value) = sizing.final_size else {
                debug!(pilot_id = %pilot.id, "Portfolio too small to size\n{}", sizing);
                report.trades_skipped += 1;
                break;
            };

            let trade = self.executor.build_pending(
                self.allocate_trade_id(),
                pilot,
                strategy,
                side,
                &quote,
                value,
                Utc::now(),
            );

            {
                let mut state = handle.lock().await;
                // Paused or exited while we were evaluating
                if !state.pilot.is_tradeable() {
                    report.trades_cancelled += 1;
                    break;
                }
                state.watch.comment(
                    Some(trade.id),
                    format!(
                        "Queued {} of {} (${:.2}) via {}",
                        trade.side, trade.asset, trade.value, strategy.name
                    ),
                );
                queued.push(trade.id);
                state.watch.queue(trade);
            }
            report.trades_queued += 1;

            if queued.len() >= config.max_trades_per_cycle {
                break;
            }
        }
        queued
    }

    /// Wait out the execution delay, then execute the trade if it is still
    /// pending and the pilot is still tradeable.
    async fn execute_pending(&self, handle: PilotHandle, trade_id: u64, token: CancellationToken) -> ExecutionOutcome {
        let delay = self.config.scheduler.execution_delay();
        if !delay.is_zero() {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let mut state = handle.lock().await;
        let Some(mut trade) = state.watch.take_pending(trade_id) else {
            return ExecutionOutcome::Cancelled;
        };
        if token.is_cancelled() || !state.pilot.is_tradeable() {
            state.watch.comment(Some(trade_id), "Trade cancelled before execution");
            return ExecutionOutcome::Cancelled;
        }

        trade.status = TradeStatus::Executed;
        trade.executed_at = Some(Utc::now());
        if let Err(e) = self.trades.append(trade.clone()).await {
            warn!(pilot_id = %trade.pilot_id, trade_id, "Failed to record trade: {}", e);
            state.watch.comment(Some(trade_id), "Trade failed to record");
            return ExecutionOutcome::Failed;
        }

        state.pilot.total_trades += 1;
        state.pilot.updated_at = Utc::now();
        let level = state.pilot.plain_english_level;
        let line = trade.narrative.for_level(level).to_string();
        state.watch.comment(Some(trade_id), line);
        state.watch.push_executed(trade.clone());
        self.executed_trades.fetch_add(1, Ordering::SeqCst);

        debug!(
            pilot_id = %trade.pilot_id,
            trade_id,
            side = %trade.side,
            asset = %trade.asset,
            value = trade.value,
            "Trade executed"
        );
        self.events.publish(EngineEvent::TradeExecuted {
            pilot_id: trade.pilot_id.clone(),
            trade: Box::new(trade),
        });
        ExecutionOutcome::Executed
    }

    /// Daily return, win rate and risk discovery for every pilot with enough
    /// trades. Returns the number of pilots updated.
    pub async fn run_learning_cycle(&self) -> usize {
        let min_trades = self.config.learning.min_trades;
        let mut updated = 0;

        for pilot_id in self.pilots.ids().await {
            let Some(handle) = self.pilots.get(&pilot_id).await else {
                continue;
            };
            let pilot = {
                let state = handle.lock().await;
                if state.pilot.status == PilotStatus::Closed || state.pilot.total_trades < min_trades {
                    continue;
                }
                state.pilot.clone()
            };

            let trades = self.trades.for_pilot(&pilot_id).await;
            let quotes = self.quotes_for(&trades).await;
            let day_return = self.returns.daily_return(&pilot).await;

            let outcome = {
                let mut state = handle.lock().await;
                apply_learning(
                    &mut state,
                    &trades,
                    &quotes,
                    day_return,
                    &self.config.learning,
                    Utc::now(),
                )
            };

            if let Some(outcome) = outcome {
                debug!(
                    pilot_id = %pilot_id,
                    win_rate = outcome.win_rate,
                    day_return = outcome.day_return,
                    discovered = %outcome.discovered_risk,
                    "Learning updated"
                );
                updated += 1;
                self.events.publish(EngineEvent::LearningUpdated {
                    pilot_id: pilot_id.clone(),
                    outcome,
                });
            }
        }

        if updated > 0 {
            self.persist().await;
        }
        updated
    }

    /// Rank every open pilot against its deposit cohort. Returns the number
    /// of pilots ranked.
    pub async fn run_social_proof_cycle(&self) -> usize {
        let mut standings = Vec::new();
        let mut handles = Vec::new();

        for pilot_id in self.pilots.ids().await {
            let Some(handle) = self.pilots.get(&pilot_id).await else {
                continue;
            };
            {
                let state = handle.lock().await;
                if state.pilot.status == PilotStatus::Closed {
                    continue;
                }
                standings.push(Standing {
                    pilot_id: pilot_id.clone(),
                    total_deposited: state.pilot.total_deposited,
                    total_return_percent: state.pilot.total_return_percent,
                });
            }
            handles.push(handle);
        }

        let proofs = rank_all(&standings, self.config.social_proof.cohort_band, Utc::now());
        let ranked = proofs.len();

        for (handle, proof) in handles.into_iter().zip(proofs) {
            {
                let mut state = handle.lock().await;
                state.social_proof = Some(proof.clone());
            }
            self.events.publish(EngineEvent::SocialProofUpdated {
                pilot_id: proof.pilot_id.clone(),
                social_proof: proof,
            });
        }

        if ranked > 0 {
            self.persist().await;
        }
        ranked
    }
}
