//! Engine events
//!
//! Typed events published over a broadcast channel. Publishing never blocks
//! and never fails for lack of subscribers; slow subscribers see `Lagged`
//! and skip ahead.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::learning::LearningOutcome;
use crate::lifecycle::exit_ramp::ExitRamp;
use crate::pilot::Trade;
use crate::social::SocialProof;
use crate::strategy::types::RiskDna;

/// Event channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Initialized {
        strategies: usize,
        pilots: usize,
    },
    PilotCreated {
        pilot_id: String,
        user_id: String,
        risk_dna: RiskDna,
        initial_deposit: f64,
    },
    TradeExecuted {
        pilot_id: String,
        trade: Box<Trade>,
    },
    ExitRampInitiated {
        pilot_id: String,
        exit_ramp: ExitRamp,
    },
    SocialProofUpdated {
        pilot_id: String,
        social_proof: SocialProof,
    },
    WatchModeEnabled {
        pilot_id: String,
    },
    WatchModeDisabled {
        pilot_id: String,
    },
    PilotPaused {
        pilot_id: String,
    },
    PilotResumed {
        pilot_id: String,
    },
    DepositReceived {
        pilot_id: String,
        amount: f64,
        total_deposited: f64,
    },
    LearningUpdated {
        pilot_id: String,
        outcome: LearningOutcome,
    },
    ExitCompleted {
        pilot_id: String,
        exit_ramp: ExitRamp,
    },
}

impl EngineEvent {
    /// Wire name, matching the serde tag
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Initialized { .. } => "initialized",
            EngineEvent::PilotCreated { .. } => "pilot_created",
            EngineEvent::TradeExecuted { .. } => "trade_executed",
            EngineEvent::ExitRampInitiated { .. } => "exit_ramp_initiated",
            EngineEvent::SocialProofUpdated { .. } => "social_proof_updated",
            EngineEvent::WatchModeEnabled { .. } => "watch_mode_enabled",
            EngineEvent::WatchModeDisabled { .. } => "watch_mode_disabled",
            EngineEvent::PilotPaused { .. } => "pilot_paused",
            EngineEvent::PilotResumed { .. } => "pilot_resumed",
            EngineEvent::DepositReceived { .. } => "deposit_received",
            EngineEvent::LearningUpdated { .. } => "learning_updated",
            EngineEvent::ExitCompleted { .. } => "exit_completed",
        }
    }

    pub fn pilot_id(&self) -> Option<&str> {
        match self {
            EngineEvent::Initialized { .. } => None,
            EngineEvent::PilotCreated { pilot_id, .. }
            | EngineEvent::TradeExecuted { pilot_id, .. }
            | EngineEvent::ExitRampInitiated { pilot_id, .. }
            | EngineEvent::SocialProofUpdated { pilot_id, .. }
            | EngineEvent::WatchModeEnabled { pilot_id }
            | EngineEvent::WatchModeDisabled { pilot_id }
            | EngineEvent::PilotPaused { pilot_id }
            | EngineEvent::PilotResumed { pilot_id }
            | EngineEvent::DepositReceived { pilot_id, .. }
            | EngineEvent::LearningUpdated { pilot_id, .. }
            | EngineEvent::ExitCompleted { pilot_id, .. } => Some(pilot_id),
        }
    }
}

/// Fan-out channel for engine events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(16));
        Self { tx }
    }

    /// Publish to current subscribers. Returns how many received it.
    pub fn publish(&self, event: EngineEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                debug!(event = event.name(), "No event subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(default_channel_capacity())
    }
}

/// Log every event until cancelled
pub fn spawn_event_logger(bus: &EventBus, cancel: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Event logger shutting down");
                    break;
                }
                received = rx.recv() => match received {
                    Ok(event) => log_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event logger lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::TradeExecuted { pilot_id, trade } => info!(
            pilot_id = %pilot_id,
            trade_id = trade.id,
            strategy = %trade.strategy_id,
            asset = %trade.asset,
            side = %trade.side,
            value = trade.value,
            "trade_executed"
        ),
        EngineEvent::ExitRampInitiated { pilot_id, exit_ramp } => info!(
            pilot_id = %pilot_id,
            strategy = %exit_ramp.strategy,
            target = %exit_ramp.target_exit_date,
            "exit_ramp_initiated"
        ),
        EngineEvent::SocialProofUpdated { pilot_id, social_proof } => debug!(
            pilot_id = %pilot_id,
            tier = %social_proof.tier,
            beating = social_proof.beating_percent,
            "social_proof_updated"
        ),
        other => info!(event = other.name(), pilot_id = ?other.pilot_id(), "engine event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();
        let delivered = bus.publish(EngineEvent::WatchModeEnabled {
            pilot_id: "p1".to_string(),
        });
        assert_eq!(delivered, 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "watch_mode_enabled");
        assert_eq!(event.pilot_id(), Some("p1"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.receiver_count(), 0);
        assert_eq!(
            bus.publish(EngineEvent::Initialized {
                strategies: 1,
                pilots: 0
            }),
            0
        );
    }

    #[test]
    fn test_serde_tag_matches_name() {
        let event = EngineEvent::PilotPaused {
            pilot_id: "p".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pilot_paused");
        assert_eq!(json["pilot_id"], "p");
    }

    #[tokio::test]
    async fn test_event_logger_stops_on_cancel() {
        let bus = EventBus::new(16);
        let cancel = CancellationToken::new();
        let handle = spawn_event_logger(&bus, cancel.clone());
        bus.publish(EngineEvent::PilotResumed {
            pilot_id: "p".to_string(),
        });
        cancel.cancel();
        handle.await.unwrap();
    }
}
