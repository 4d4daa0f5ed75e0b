use std::fmt;

use serde::{Deserialize, Serialize};

/// The one locomotion mode a player is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocomotionState {
    /// Normal walking/driving; the controller does nothing.
    #[default]
    Grounded,
    Piloting,
    Drifting,
    Mining,
    Repairing,
}

impl LocomotionState {
    pub const ALL: [LocomotionState; 5] = [
        LocomotionState::Grounded,
        LocomotionState::Piloting,
        LocomotionState::Drifting,
        LocomotionState::Mining,
        LocomotionState::Repairing,
    ];

    /// Wire code written into the shared buffer.
    pub fn code(self) -> u8 {
        match self {
            LocomotionState::Grounded => 0,
            LocomotionState::Piloting => 1,
            LocomotionState::Drifting => 2,
            LocomotionState::Mining => 3,
            LocomotionState::Repairing => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Mining and Repairing: scripted docking tasks.
    pub fn is_task(self) -> bool {
        matches!(self, LocomotionState::Mining | LocomotionState::Repairing)
    }
}

impl fmt::Display for LocomotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocomotionState::Grounded => "grounded",
            LocomotionState::Piloting => "piloting",
            LocomotionState::Drifting => "drifting",
            LocomotionState::Mining => "mining",
            LocomotionState::Repairing => "repairing",
        };
        f.write_str(name)
    }
}
