//! Scheduler
//!
//! Drives the three periodic loops (trading, learning, social proof) on
//! independent intervals. Each loop stops when the scheduler's token is
//! cancelled; a cycle already running finishes first.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AutopilotEngine;

/// Tick periods and execution delay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_trading_interval_secs")]
    pub trading_interval_secs: u64,

    #[serde(default = "default_learning_interval_secs")]
    pub learning_interval_secs: u64,

    #[serde(default = "default_social_proof_interval_secs")]
    pub social_proof_interval_secs: u64,

    /// Time a trade stays pending before it is executed
    #[serde(default = "default_execution_delay_ms")]
    pub execution_delay_ms: u64,
}

fn default_trading_interval_secs() -> u64 {
    60
}

fn default_learning_interval_secs() -> u64 {
    300
}

fn default_social_proof_interval_secs() -> u64 {
    60
}

fn default_execution_delay_ms() -> u64 {
    2000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            trading_interval_secs: default_trading_interval_secs(),
            learning_interval_secs: default_learning_interval_secs(),
            social_proof_interval_secs: default_social_proof_interval_secs(),
            execution_delay_ms: default_execution_delay_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn trading_interval(&self) -> Duration {
        Duration::from_secs(self.trading_interval_secs)
    }

    pub fn learning_interval(&self) -> Duration {
        Duration::from_secs(self.learning_interval_secs)
    }

    pub fn social_proof_interval(&self) -> Duration {
        Duration::from_secs(self.social_proof_interval_secs)
    }

    pub fn execution_delay(&self) -> Duration {
        Duration::from_millis(self.execution_delay_ms)
    }
}

/// Owner of the periodic engine tasks
pub struct Scheduler {
    engine: Arc<AutopilotEngine>,
    config: SchedulerConfig,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(engine: Arc<AutopilotEngine>) -> Self {
        let config = engine.config().scheduler.clone();
        let cancel = engine.shutdown_token().child_token();
        Self {
            engine,
            config,
            cancel,
            handles: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty() && !self.cancel.is_cancelled()
    }

    /// Spawn the loops. The first tick of each fires one period after start.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("Scheduler already running");
            return;
        }
        if self.cancel.is_cancelled() {
            self.cancel = self.engine.shutdown_token().child_token();
        }

        info!(
            "Starting scheduler: trading every {}s, learning every {}s, social proof every {}s",
            self.config.trading_interval_secs,
            self.config.learning_interval_secs,
            self.config.social_proof_interval_secs
        );

        let engine = self.engine.clone();
        self.handles.push(spawn_loop(
            "trading",
            self.config.trading_interval(),
            self.cancel.clone(),
            move || {
                let engine = engine.clone();
                async move {
                    let report = engine.run_trading_cycle().await;
                    debug!(?report, "Trading cycle finished");
                }
            },
        ));

        let engine = self.engine.clone();
        self.handles.push(spawn_loop(
            "learning",
            self.config.learning_interval(),
            self.cancel.clone(),
            move || {
                let engine = engine.clone();
                async move {
                    let updated = engine.run_learning_cycle().await;
                    debug!(updated, "Learning cycle finished");
                }
            },
        ));

        let engine = self.engine.clone();
        self.handles.push(spawn_loop(
            "social_proof",
            self.config.social_proof_interval(),
            self.cancel.clone(),
            move || {
                let engine = engine.clone();
                async move {
                    let ranked = engine.run_social_proof_cycle().await;
                    debug!(ranked, "Social proof cycle finished");
                }
            },
        ));
    }

    /// Cancel the loops and wait for them to exit
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("Scheduler task ended abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
    }
}

fn spawn_loop<F, Fut>(name: &'static str, period: Duration, cancel: CancellationToken, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let period = period.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(loop_name = name, "Loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    tick().await;
                }
            }
        }
    })
}
