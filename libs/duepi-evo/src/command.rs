//! Command codes
//!
//! Every request on the wire carries a fixed five-character ASCII code. Reads
//! and the simple writes are fixed constants; power level and setpoint writes
//! embed their argument in the code itself.

use std::fmt;
use std::str::FromStr;

use crate::constants::{CODE_LEN, MAX_POWER, MAX_TEMP, MIN_POWER, MIN_TEMP};
use crate::error::DuepiError;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A validated five-character command code
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode([u8; CODE_LEN]);

impl CommandCode {
    // Reads
    pub const GET_STATUS: Self = Self(*b"D9000");
    pub const GET_ROOM_TEMP: Self = Self(*b"D1000");
    pub const GET_FUMES_TEMP: Self = Self(*b"D0000");
    pub const GET_POWER_LEVEL: Self = Self(*b"D3000");
    pub const GET_PELLET_SPEED: Self = Self(*b"D4000");
    pub const GET_EXHAUST_FAN: Self = Self(*b"EF000");
    pub const GET_ERROR: Self = Self(*b"DA000");
    pub const GET_SETPOINT: Self = Self(*b"C6000");

    // Auxiliary reads seen from the vendor app
    pub const GET_FIRMWARE_VERSION: Self = Self(*b"DC000");
    pub const GET_BOARD_TEMP: Self = Self(*b"DF000");
    pub const GET_AMBIENT_FAN: Self = Self(*b"D2000");
    pub const GET_HOPPER_LEVEL: Self = Self(*b"DB000");

    // Writes
    pub const POWER_OFF: Self = Self(*b"F0000");
    pub const POWER_ON: Self = Self(*b"F0010");
    pub const RESET_ERROR: Self = Self(*b"D6000");

    /// The eight reads of a full poll, in wire order
    pub const POLL_SEQUENCE: [Self; 8] = [
        Self::GET_STATUS,
        Self::GET_ROOM_TEMP,
        Self::GET_FUMES_TEMP,
        Self::GET_POWER_LEVEL,
        Self::GET_PELLET_SPEED,
        Self::GET_EXHAUST_FAN,
        Self::GET_ERROR,
        Self::GET_SETPOINT,
    ];

    /// `F00{n}0` with `n` clamped to 0..=6
    pub fn set_power_level(level: i32) -> Self {
        let level = level.clamp(MIN_POWER, MAX_POWER) as u8;
        Self([b'F', b'0', b'0', b'0' + level, b'0'])
    }

    /// `F2{hh}0` with the temperature rounded half-to-even, then clamped to 10..=35
    pub fn set_target_temperature(temp: f64) -> Self {
        let temp = (temp.round_ties_even() as i32).clamp(MIN_TEMP, MAX_TEMP) as usize;
        Self([
            b'F',
            b'2',
            HEX_DIGITS[temp >> 4],
            HEX_DIGITS[temp & 0x0F],
            b'0',
        ])
    }

    pub fn as_bytes(&self) -> &[u8; CODE_LEN] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for CommandCode {
    type Err = DuepiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != CODE_LEN || !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(DuepiError::InvalidCommand(s.to_string()));
        }

        let mut code = [0u8; CODE_LEN];
        code.copy_from_slice(bytes);
        Ok(Self(code))
    }
}

impl TryFrom<&str> for CommandCode {
    type Error = DuepiError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandCode({})", self.as_str())
    }
}
