pub mod client;
pub mod error;
pub mod traits;
pub mod types;

pub use client::HttpWorkloadHost;
pub use error::{HostError, Result};
pub use traits::WorkloadHost;
pub use types::*;
