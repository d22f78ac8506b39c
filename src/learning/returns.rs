//! Daily return sources for the learning loop

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::pilot::Pilot;
use crate::strategy::randomization::Randomizer;

/// Produces the day's portfolio return (as a fraction) for a pilot
#[async_trait]
pub trait ReturnModel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn daily_return(&self, pilot: &Pilot) -> f64;
}

/// Random walk scaled by the pilot's risk score
pub struct SimulatedReturnModel {
    randomizer: Arc<Mutex<Randomizer>>,
}

impl SimulatedReturnModel {
    pub fn new(randomizer: Arc<Mutex<Randomizer>>) -> Self {
        Self { randomizer }
    }
}

#[async_trait]
impl ReturnModel for SimulatedReturnModel {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn daily_return(&self, pilot: &Pilot) -> f64 {
        self.randomizer.lock().await.daily_return(pilot.risk_score)
    }
}

/// Same return every day
#[derive(Debug, Clone, Copy)]
pub struct FixedReturnModel(pub f64);

#[async_trait]
impl ReturnModel for FixedReturnModel {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn daily_return(&self, _pilot: &Pilot) -> f64 {
        self.0
    }
}
