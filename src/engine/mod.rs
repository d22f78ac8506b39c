//! AutoPilot Engine
//!
//! The engine owns the catalog, the repositories and every collaborator
//! (oracle, signal evaluator, return model, event bus). It is built
//! explicitly through `EngineBuilder`; nothing is global, so tests can run
//! several isolated engines side by side.
//!
//! ## Components
//! - `executor` - Pending trade construction (sizing, fees, narration)
//! - `cycles` - Trading, learning and social-proof passes
//! - `scheduler` - Periodic driver for the cycles

pub mod cycles;
pub mod executor;
pub mod scheduler;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{EngineEvent, EventBus};
use crate::learning::{ReturnModel, RiskDnaDiscovery, SimulatedReturnModel};
use crate::lifecycle::exit_ramp::{self, ExitRamp, ExitStrategy};
use crate::lifecycle::time_travel::{self, TimeTravelInput, TimeTravelResult, TimeTravelScenario};
use crate::oracle::{PriceOracle, StaticPriceOracle};
use crate::pilot::{
    Pilot, PilotPreferences, PilotSnapshot, PilotState, PilotStatus, Trade, WatchStream,
};
use crate::social::SocialProof;
use crate::store::{JsonFileStore, MemoryStore, PilotHandle, PilotStore, TradeStore};
use crate::strategy::admission::{ProbabilisticSignalEvaluator, SignalEvaluator};
use crate::strategy::catalog::StrategyCatalog;
use crate::strategy::randomization::Randomizer;
use crate::strategy::types::Strategy;

pub use cycles::CycleReport;
pub use executor::{TradeExecutor, TradingConfig};
pub use scheduler::{Scheduler, SchedulerConfig};

/// Engine-wide totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_pilots: usize,
    pub active_pilots: usize,
    pub total_trades: u64,
    pub total_deposited: f64,
    pub total_value: f64,
    pub average_return_percent: f64,
    pub strategies_absorbed: usize,
}

/// Builder for `AutopilotEngine`. Unset collaborators get production defaults.
pub struct EngineBuilder {
    config: Config,
    catalog: Option<StrategyCatalog>,
    pilots: Option<Arc<dyn PilotStore>>,
    trades: Option<Arc<dyn TradeStore>>,
    shared_store: bool,
    oracle: Option<Arc<dyn PriceOracle>>,
    evaluator: Option<Arc<dyn SignalEvaluator>>,
    returns: Option<Arc<dyn ReturnModel>>,
    events: Option<EventBus>,
}

impl EngineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            catalog: None,
            pilots: None,
            trades: None,
            shared_store: false,
            oracle: None,
            evaluator: None,
            returns: None,
            events: None,
        }
    }

    pub fn catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use one object for both pilots and trades
    pub fn store<S>(mut self, store: Arc<S>) -> Self
    where
        S: PilotStore + TradeStore + 'static,
    {
        self.pilots = Some(store.clone());
        self.trades = Some(store);
        self.shared_store = true;
        self
    }

    pub fn pilot_store(mut self, store: Arc<dyn PilotStore>) -> Self {
        self.pilots = Some(store);
        self.shared_store = false;
        self
    }

    pub fn trade_store(mut self, store: Arc<dyn TradeStore>) -> Self {
        self.trades = Some(store);
        self.shared_store = false;
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn signal_evaluator(mut self, evaluator: Arc<dyn SignalEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn return_model(mut self, returns: Arc<dyn ReturnModel>) -> Self {
        self.returns = Some(returns);
        self
    }

    /// Share an existing bus, e.g. one already subscribed to
    pub fn event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn build(self) -> Result<Arc<AutopilotEngine>> {
        let config = self.config;
        let randomizer = Arc::new(Mutex::new(Randomizer::new(config.randomization.clone())));

        let (pilots, trades, shared_store) = match (self.pilots, self.trades) {
            (Some(p), Some(t)) => (p, t, self.shared_store),
            (None, None) => match &config.storage.path {
                Some(path) => {
                    let store = Arc::new(JsonFileStore::open(path).await?);
                    info!("Using JSON store at {}", path);
                    (store.clone() as Arc<dyn PilotStore>, store as Arc<dyn TradeStore>, true)
                }
                None => {
                    let store = Arc::new(MemoryStore::new());
                    (store.clone() as Arc<dyn PilotStore>, store as Arc<dyn TradeStore>, true)
                }
            },
            _ => {
                return Err(Error::Config(
                    "pilot and trade stores must be provided together".to_string(),
                ))
            }
        };

        let evaluator = self.evaluator.unwrap_or_else(|| {
            Arc::new(ProbabilisticSignalEvaluator::new(
                config.trading.admission_factor,
                config.trading.buy_bias,
                randomizer.clone(),
            ))
        });
        let returns = self
            .returns
            .unwrap_or_else(|| Arc::new(SimulatedReturnModel::new(randomizer.clone())));
        let oracle = self.oracle.unwrap_or_else(|| Arc::new(StaticPriceOracle::new()));
        let events = self
            .events
            .unwrap_or_else(|| EventBus::new(config.events.channel_capacity));
        let catalog = Arc::new(self.catalog.unwrap_or_else(StrategyCatalog::builtin));

        let (highest_pending, dropped) = drop_stale_pending(pilots.as_ref()).await;
        let last_trade_id = trades.last_trade_id().await.max(highest_pending);
        let executed = trades.count().await;
        let pilot_count = pilots.len().await;

        info!(
            strategies = catalog.len(),
            pilots = pilot_count,
            evaluator = evaluator.name(),
            oracle = oracle.name(),
            returns = returns.name(),
            "AutoPilot engine initialized"
        );

        let engine = Arc::new(AutopilotEngine {
            executor: TradeExecutor::new(config.trading.clone()),
            config,
            catalog,
            pilots,
            trades,
            shared_store,
            oracle,
            evaluator,
            returns,
            randomizer,
            events,
            next_trade_id: AtomicU64::new(last_trade_id),
            executed_trades: AtomicU64::new(executed),
            pilot_tokens: DashMap::new(),
            shutdown: CancellationToken::new(),
        });

        if dropped > 0 {
            warn!("Dropped {} pending trades left over from a previous run", dropped);
            engine.persist().await;
        }

        engine.events.publish(EngineEvent::Initialized {
            strategies: engine.catalog.len(),
            pilots: pilot_count,
        });
        Ok(engine)
    }
}

/// Pending trades never survive a restart: their execution timers are gone.
/// Clears them from every stored pilot and returns the highest id seen along
/// with how many were dropped.
async fn drop_stale_pending(pilots: &dyn PilotStore) -> (u64, usize) {
    let mut highest = 0;
    let mut dropped = 0;
    for pilot_id in pilots.ids().await {
        let Some(handle) = pilots.get(&pilot_id).await else {
            continue;
        };
        let mut state = handle.lock().await;
        for trade in state.watch.drain_pending() {
            highest = highest.max(trade.id);
            dropped += 1;
            state
                .watch
                .comment(Some(trade.id), "Trade cancelled: engine restarted before execution");
        }
    }
    (highest, dropped)
}

/// Per-user automated portfolio manager
pub struct AutopilotEngine {
    config: Config,
    catalog: Arc<StrategyCatalog>,
    pilots: Arc<dyn PilotStore>,
    trades: Arc<dyn TradeStore>,
    /// Both repositories are the same object; flush once
    shared_store: bool,
    oracle: Arc<dyn PriceOracle>,
    evaluator: Arc<dyn SignalEvaluator>,
    returns: Arc<dyn ReturnModel>,
    randomizer: Arc<Mutex<Randomizer>>,
    executor: TradeExecutor,
    events: EventBus,
    next_trade_id: AtomicU64,
    executed_trades: AtomicU64,
    /// Cancelled on pause/exit so sleeping executions wake and drop their trade
    pilot_tokens: DashMap<String, CancellationToken>,
    shutdown: CancellationToken,
}

impl AutopilotEngine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every pending execution and persist state
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.persist().await;
        info!("AutoPilot engine shut down");
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    async fn handle(&self, pilot_id: &str) -> Result<PilotHandle> {
        self.pilots
            .get(pilot_id)
            .await
            .ok_or_else(|| Error::PilotNotFound(pilot_id.to_string()))
    }

    fn allocate_trade_id(&self) -> u64 {
        self.next_trade_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn pilot_token(&self, pilot_id: &str) -> CancellationToken {
        self.pilot_tokens
            .entry(pilot_id.to_string())
            .or_insert_with(|| self.shutdown.child_token())
            .clone()
    }

    fn cancel_pilot_executions(&self, pilot_id: &str) {
        if let Some((_, token)) = self.pilot_tokens.remove(pilot_id) {
            token.cancel();
        }
    }

    /// Current price for every asset in `trades`
    async fn quotes_for(&self, trades: &[Trade]) -> HashMap<String, f64> {
        let assets: HashSet<&str> = trades.iter().map(|t| t.asset.as_str()).collect();
        let mut quotes = HashMap::new();
        for asset in assets {
            match self.oracle.quote(asset).await {
                Some(q) => {
                    quotes.insert(asset.to_string(), q.price);
                }
                None => debug!(asset, "No quote available"),
            }
        }
        quotes
    }

    /// Flush repositories. Failures are logged; the next flush retries.
    /// Never call while holding a pilot lock.
    async fn persist(&self) {
        if let Err(e) = self.pilots.flush().await {
            warn!("Failed to persist pilots: {}", e);
        }
        if !self.shared_store {
            if let Err(e) = self.trades.flush().await {
                warn!("Failed to persist trades: {}", e);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Pilot registry
    // ---------------------------------------------------------------------

    /// Create an active pilot with autopilot on
    pub async fn create_pilot(
        &self,
        user_id: &str,
        initial_deposit: f64,
        preferences: PilotPreferences,
    ) -> Result<Pilot> {
        if !initial_deposit.is_finite() || initial_deposit <= 0.0 {
            return Err(Error::InvalidDeposit(initial_deposit));
        }
        if user_id.trim().is_empty() {
            return Err(Error::InvalidInput("user_id must not be empty".to_string()));
        }

        let pilot = Pilot::new(user_id, initial_deposit, &preferences);
        let state = PilotState::new(
            pilot.clone(),
            self.config.watch.recent_capacity,
            self.config.watch.commentary_capacity,
        );
        self.pilots.insert(state).await?;

        info!(
            pilot_id = %pilot.id,
            user_id,
            risk = %pilot.risk_dna,
            deposit = initial_deposit,
            "Pilot created"
        );
        self.events.publish(EngineEvent::PilotCreated {
            pilot_id: pilot.id.clone(),
            user_id: user_id.to_string(),
            risk_dna: pilot.risk_dna,
            initial_deposit,
        });
        self.persist().await;
        Ok(pilot)
    }

    pub async fn get_pilot(&self, pilot_id: &str) -> Result<Pilot> {
        let handle = self.handle(pilot_id).await?;
        let state = handle.lock().await;
        Ok(state.pilot.clone())
    }

    /// Executed trades, newest first
    pub async fn get_pilot_trades(&self, pilot_id: &str, limit: Option<usize>) -> Result<Vec<Trade>> {
        self.handle(pilot_id).await?;
        let mut trades = self.trades.for_pilot(pilot_id).await;
        trades.reverse();
        if let Some(limit) = limit {
            trades.truncate(limit);
        }
        Ok(trades)
    }

    /// Watch stream copy. Counts as the user checking in.
    pub async fn get_watch_stream(&self, pilot_id: &str) -> Result<WatchStream> {
        let handle = self.handle(pilot_id).await?;
        let mut state = handle.lock().await;
        state.behavior.record_check(Utc::now());
        Ok(state.watch.clone())
    }

    /// Full read-only view. Counts as the user checking in.
    pub async fn get_snapshot(&self, pilot_id: &str) -> Result<PilotSnapshot> {
        let handle = self.handle(pilot_id).await?;
        let mut state = handle.lock().await;
        state.behavior.record_check(Utc::now());
        Ok(PilotSnapshot::from(&*state))
    }

    pub async fn enable_watch_mode(&self, pilot_id: &str) -> Result<()> {
        self.set_watch_mode(pilot_id, true).await
    }

    pub async fn disable_watch_mode(&self, pilot_id: &str) -> Result<()> {
        self.set_watch_mode(pilot_id, false).await
    }

    async fn set_watch_mode(&self, pilot_id: &str, enabled: bool) -> Result<()> {
        let handle = self.handle(pilot_id).await?;
        let changed = {
            let mut state = handle.lock().await;
            let changed = state.watch.enabled != enabled;
            state.watch.enabled = enabled;
            changed
        };
        if changed {
            let event = if enabled {
                EngineEvent::WatchModeEnabled {
                    pilot_id: pilot_id.to_string(),
                }
            } else {
                EngineEvent::WatchModeDisabled {
                    pilot_id: pilot_id.to_string(),
                }
            };
            self.events.publish(event);
            self.persist().await;
        }
        Ok(())
    }

    /// Stop trading without leaving. Pending trades are cancelled.
    pub async fn pause_pilot(&self, pilot_id: &str) -> Result<Pilot> {
        let handle = self.handle(pilot_id).await?;
        let (pilot, cancelled) = {
            let mut state = handle.lock().await;
            state.pilot.transition(PilotStatus::Paused)?;
            if state.pilot.total_return_percent < 0.0 {
                state.behavior.record_panic();
            }
            let cancelled = state.watch.drain_pending();
            state.watch.comment(None, "Autopilot paused");
            (state.pilot.clone(), cancelled.len())
        };
        self.cancel_pilot_executions(pilot_id);

        info!(pilot_id, cancelled, "Pilot paused");
        self.events.publish(EngineEvent::PilotPaused {
            pilot_id: pilot_id.to_string(),
        });
        self.persist().await;
        Ok(pilot)
    }

    pub async fn resume_pilot(&self, pilot_id: &str) -> Result<Pilot> {
        let handle = self.handle(pilot_id).await?;
        let pilot = {
            let mut state = handle.lock().await;
            state.pilot.transition(PilotStatus::Active)?;
            state.watch.comment(None, "Autopilot resumed");
            state.pilot.clone()
        };

        info!(pilot_id, "Pilot resumed");
        self.events.publish(EngineEvent::PilotResumed {
            pilot_id: pilot_id.to_string(),
        });
        self.persist().await;
        Ok(pilot)
    }

    /// Add capital to an active or paused pilot
    pub async fn deposit(&self, pilot_id: &str, amount: f64) -> Result<Pilot> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidDeposit(amount));
        }
        let handle = self.handle(pilot_id).await?;
        let pilot = {
            let mut state = handle.lock().await;
            if matches!(state.pilot.status, PilotStatus::Exiting | PilotStatus::Closed) {
                return Err(Error::invalid_state(
                    pilot_id,
                    format!("cannot deposit while {}", state.pilot.status),
                ));
            }
            state.pilot.record_deposit(amount);
            state.watch.comment(None, format!("Deposit of ${:.2} received", amount));
            state.pilot.clone()
        };

        self.events.publish(EngineEvent::DepositReceived {
            pilot_id: pilot_id.to_string(),
            amount,
            total_deposited: pilot.total_deposited,
        });
        self.persist().await;
        Ok(pilot)
    }

    pub async fn get_risk_discovery(&self, pilot_id: &str) -> Result<Option<RiskDnaDiscovery>> {
        let handle = self.handle(pilot_id).await?;
        let state = handle.lock().await;
        Ok(state.discovery.clone())
    }

    pub async fn get_social_proof(&self, pilot_id: &str) -> Result<Option<SocialProof>> {
        let handle = self.handle(pilot_id).await?;
        let state = handle.lock().await;
        Ok(state.social_proof.clone())
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Counterfactual projection over a past window
    pub async fn time_travel(
        &self,
        pilot_id: &str,
        scenario: TimeTravelScenario,
        custom_start_date: Option<DateTime<Utc>>,
    ) -> Result<TimeTravelResult> {
        let pilot = self.get_pilot(pilot_id).await?;
        let now = Utc::now();
        let start = time_travel::resolve_start(scenario, custom_start_date, now)?;

        let trades = self.trades.for_pilot(pilot_id).await;
        let quotes = self.quotes_for(&trades).await;
        let jitter = self.randomizer.lock().await.time_travel_jitter();

        let result = time_travel::simulate(
            &pilot,
            TimeTravelInput {
                scenario,
                start,
                now,
                jitter,
                trades: &trades,
                quotes: &quotes,
            },
        );
        debug!(
            pilot_id,
            %scenario,
            hypothetical = result.hypothetical_value,
            actual = result.actual_value,
            "Time travel simulated"
        );
        Ok(result)
    }

    /// Start winding the pilot down. Trading stops immediately.
    pub async fn initiate_exit_ramp(&self, pilot_id: &str, strategy: ExitStrategy) -> Result<ExitRamp> {
        let handle = self.handle(pilot_id).await?;
        let trades = self.trades.for_pilot(pilot_id).await;

        let (ramp, cancelled) = {
            let mut state = handle.lock().await;
            exit_ramp::begin_exit(&mut state, strategy, &trades, Utc::now())?
        };
        self.cancel_pilot_executions(pilot_id);

        info!(
            pilot_id,
            %strategy,
            cancelled = cancelled.len(),
            target = %ramp.target_exit_date,
            "Exit ramp initiated"
        );
        self.events.publish(EngineEvent::ExitRampInitiated {
            pilot_id: pilot_id.to_string(),
            exit_ramp: ramp.clone(),
        });
        self.persist().await;
        Ok(ramp)
    }

    /// Close out an exiting pilot
    pub async fn complete_exit(&self, pilot_id: &str) -> Result<ExitRamp> {
        let handle = self.handle(pilot_id).await?;
        let ramp = {
            let mut state = handle.lock().await;
            exit_ramp::finish_exit(&mut state, Utc::now())?
        };

        info!(pilot_id, "Exit completed");
        self.events.publish(EngineEvent::ExitCompleted {
            pilot_id: pilot_id.to_string(),
            exit_ramp: ramp.clone(),
        });
        self.persist().await;
        Ok(ramp)
    }

    pub async fn get_exit_ramp(&self, pilot_id: &str) -> Result<Option<ExitRamp>> {
        let handle = self.handle(pilot_id).await?;
        let state = handle.lock().await;
        Ok(state.exit_ramp.clone())
    }

    // ---------------------------------------------------------------------
    // Aggregates
    // ---------------------------------------------------------------------

    pub async fn get_global_stats(&self) -> GlobalStats {
        let mut stats = GlobalStats {
            total_pilots: 0,
            active_pilots: 0,
            total_trades: self.executed_trades.load(Ordering::SeqCst),
            total_deposited: 0.0,
            total_value: 0.0,
            average_return_percent: 0.0,
            strategies_absorbed: self.catalog.len(),
        };

        let mut return_sum = 0.0;
        for id in self.pilots.ids().await {
            let Some(handle) = self.pilots.get(&id).await else {
                continue;
            };
            let state = handle.lock().await;
            stats.total_pilots += 1;
            if state.pilot.status == PilotStatus::Active {
                stats.active_pilots += 1;
            }
            stats.total_deposited += state.pilot.total_deposited;
            stats.total_value += state.pilot.current_value;
            return_sum += state.pilot.total_return_percent;
        }
        if stats.total_pilots > 0 {
            stats.average_return_percent = return_sum / stats.total_pilots as f64;
        }
        stats
    }

    /// Every strategy in the catalog, in catalog order
    pub fn get_absorbed_strategies(&self) -> &[Strategy] {
        self.catalog.all()
    }
}
