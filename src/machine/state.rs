use std::fmt;

use serde::{Deserialize, Serialize};

/// The three mutually exclusive states of the machine.
///
/// Each admitted job moves the machine through:
/// `Available` → `Brewing` → `Blocked` → `Available`.
/// `Blocked` means the brew finished but nobody has retrieved it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    Available,
    Brewing,
    Blocked,
}

impl MachineState {
    /// Gauge value exported on `/metrics`.
    pub fn code(&self) -> u8 {
        match self {
            MachineState::Available => 0,
            MachineState::Brewing => 1,
            MachineState::Blocked => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineState::Available => "available",
            MachineState::Brewing => "brewing",
            MachineState::Blocked => "blocked",
        }
    }

    /// Whether a new job can be admitted in this state.
    pub fn accepts_jobs(&self) -> bool {
        matches!(self, MachineState::Available)
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
