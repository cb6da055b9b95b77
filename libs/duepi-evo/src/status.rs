//! Status word decoding

use std::fmt;

use crate::constants::status_flags::{CLEANING, COOLING, ECO, IGNITION, OFF, WORKING};

/// Operating state derived from the status word
///
/// Several bits may be set at once; the first match in the order
/// Working, Ignition, Cleaning, Cooling, Eco Standby, Off wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoveState {
    Working,
    Ignition,
    Cleaning,
    Cooling,
    EcoStandby,
    Off,
    Unknown(u32),
}

impl StoveState {
    /// Numeric state used by the web dashboard
    pub fn ui_code(&self) -> u8 {
        match self {
            StoveState::Working => 4,
            StoveState::Ignition => 1,
            StoveState::Cleaning => 5,
            StoveState::Cooling => 8,
            StoveState::EcoStandby => 7,
            StoveState::Off | StoveState::Unknown(_) => 0,
        }
    }
}

impl fmt::Display for StoveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoveState::Working => f.write_str("Working"),
            StoveState::Ignition => f.write_str("Ignition"),
            StoveState::Cleaning => f.write_str("Cleaning"),
            StoveState::Cooling => f.write_str("Cooling"),
            StoveState::EcoStandby => f.write_str("Eco Standby"),
            StoveState::Off => f.write_str("Off"),
            StoveState::Unknown(raw) => write!(f, "Unknown (0x{:08x})", raw),
        }
    }
}

/// Raw 32-bit status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusWord(pub u32);

impl StatusWord {
    pub fn raw(&self) -> u32 {
        self.0
    }

    fn has(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn state(&self) -> StoveState {
        if self.has(WORKING) {
            StoveState::Working
        } else if self.has(IGNITION) {
            StoveState::Ignition
        } else if self.has(CLEANING) {
            StoveState::Cleaning
        } else if self.has(COOLING) {
            StoveState::Cooling
        } else if self.has(ECO) {
            StoveState::EcoStandby
        } else if self.has(OFF) || self.0 == 0 {
            StoveState::Off
        } else {
            StoveState::Unknown(self.0)
        }
    }

    pub fn text(&self) -> String {
        self.state().to_string()
    }

    /// Working, igniting or cleaning
    pub fn is_on(&self) -> bool {
        self.has(WORKING | IGNITION | CLEANING)
    }

    /// Working or igniting
    pub fn is_heating(&self) -> bool {
        self.has(WORKING | IGNITION)
    }
}
