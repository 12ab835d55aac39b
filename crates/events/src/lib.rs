//! Run progress events.
//!
//! The orchestrator publishes a [`RunEvent`] for every stage change,
//! iteration, cadence firing, procedure result and status report. Any
//! number of observers (the CLI summary, tests) can subscribe.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
