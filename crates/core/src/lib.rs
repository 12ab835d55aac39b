//! Domain types shared by the loadrig crates.
//!
//! Nothing in here performs I/O: the control-plane store, the workload host
//! adapter and the orchestrator all speak in these types.

pub mod domain;
mod error;

pub use domain::*;
pub use error::{CoreError, Result};
