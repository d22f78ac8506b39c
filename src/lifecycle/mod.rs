//! On-demand pilot lifecycle operations: counterfactual projections and the exit ramp

pub mod exit_ramp;
pub mod time_travel;

pub use exit_ramp::{begin_exit, finish_exit, plan_exit, ExitRamp, ExitStrategy, TAX_SAVINGS_RATE};
pub use time_travel::{
    base_annual_return, resolve_start, simulate, TimeTravelInput, TimeTravelResult, TimeTravelScenario,
};
