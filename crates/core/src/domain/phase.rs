use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A stage of a run with its own batch of procedures.
///
/// The catalog stores phases under their short codes (`PSO`, `START`, ...);
/// any other code is rejected when the catalog is loaded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Runs once before the first outer iteration
    #[serde(rename = "PSO")]
    PreStartOnce,
    /// Runs once at the top of every outer iteration
    #[serde(rename = "START")]
    Start,
    /// Runs on every inner-loop tick, throttled per procedure
    #[serde(rename = "INNER")]
    Inner,
    /// Runs once at the bottom of every outer iteration
    #[serde(rename = "END")]
    End,
    /// Runs whenever the second cadence fires inside the inner loop
    #[serde(rename = "SECOND_END")]
    SecondEnd,
    /// Runs once after the main loop, however it ended
    #[serde(rename = "PSC")]
    PostCloseOnce,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::PreStartOnce,
        Phase::Start,
        Phase::Inner,
        Phase::End,
        Phase::SecondEnd,
        Phase::PostCloseOnce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreStartOnce => "PSO",
            Self::Start => "START",
            Self::Inner => "INNER",
            Self::End => "END",
            Self::SecondEnd => "SECOND_END",
            Self::PostCloseOnce => "PSC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PSO" => Some(Self::PreStartOnce),
            "START" => Some(Self::Start),
            "INNER" => Some(Self::Inner),
            "END" => Some(Self::End),
            "SECOND_END" => Some(Self::SecondEnd),
            "PSC" => Some(Self::PostCloseOnce),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim()).ok_or_else(|| CoreError::UnknownPhase(s.to_string()))
    }
}
