//! Protocol constants observed on the Duepi EVO wire

use std::time::Duration;

/// Default cloud relay host
pub const DEFAULT_HOST: &str = "duepiwebserver2.com";
/// Default relay port
pub const DEFAULT_PORT: u16 = 3000;

/// Connect and read timeout
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);
/// Settle time after the handshake; the device sends no acknowledgement
pub const HANDSHAKE_DELAY: Duration = Duration::from_millis(500);
/// Pause after every command before the next one may be sent
pub const COMMAND_DELAY: Duration = Duration::from_millis(200);
/// Default poll cadence
pub const SCAN_INTERVAL: Duration = Duration::from_secs(12);

/// Every response is exactly this many ASCII bytes
pub const RESPONSE_LEN: usize = 10;
/// Command code length
pub const CODE_LEN: usize = 5;
/// Frame start byte (ESC)
pub const FRAME_START: u8 = 0x1B;
/// Frame end byte
pub const FRAME_END: u8 = b'&';
/// Register prefix, included in the checksum
pub const FRAME_PREFIX: u8 = b'R';

pub const MIN_TEMP: i32 = 10;
pub const MAX_TEMP: i32 = 35;
pub const MIN_POWER: i32 = 0;
pub const MAX_POWER: i32 = 6;

/// Status word bits
pub mod status_flags {
    pub const OFF: u32 = 0x0000_0020;
    pub const IGNITION: u32 = 0x0100_0000;
    pub const WORKING: u32 = 0x0200_0000;
    pub const CLEANING: u32 = 0x0400_0000;
    pub const COOLING: u32 = 0x0800_0000;
    pub const ECO: u32 = 0x1000_0000;
}

/// Alarm code to text, `"Error {code}"` for codes outside the table
pub fn alarm_text(code: i32) -> String {
    let text = match code {
        0 => "No error",
        1 => "No ignition",
        2 => "No flame",
        3 => "Overheating",
        4 => "Exhaust probe error",
        5 => "No flame (timeout)",
        6 => "Pellet jam",
        7 => "Door open",
        8 => "Pressure switch",
        9 => "Clean brazier",
        10 => "Water pressure low",
        11 => "Water too hot",
        12 => "Safety thermostat",
        13 => "Blackout",
        14 => "Air probe error",
        _ => return format!("Error {}", code),
    };
    text.to_string()
}

/// Power level label; level 6 is the stove's automatic mode
pub fn power_label(level: i32) -> Option<&'static str> {
    match level {
        0 => Some("Off"),
        1 => Some("Min"),
        2 => Some("Low"),
        3 => Some("Medium"),
        4 => Some("High"),
        5 => Some("Max"),
        6 => Some("Auto"),
        _ => None,
    }
}
