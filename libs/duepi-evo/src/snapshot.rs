//! Consolidated stove state from one full poll

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::alarm_text;
use crate::status::StatusWord;

/// Decoded register values of one poll, before derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRegisters {
    pub status: u32,
    pub room_temp: i32,
    pub fumes_temp: i32,
    pub power_level: i32,
    pub pellet_speed: i32,
    pub exhaust_fan: i32,
    pub error_code: i32,
    pub setpoint: i32,
}

/// Immutable stove state; only ever built from a complete set of reads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoveSnapshot {
    pub status_raw: u32,
    pub status_text: String,
    pub status_code: u8,
    pub is_on: bool,
    pub is_heating: bool,
    pub room_temp_c: f64,
    pub target_temp_c: i32,
    pub fumes_temp_c: i32,
    pub power_level: i32,
    pub pellet_speed: i32,
    pub fan_rpm: i32,
    pub alarm_code: i32,
    pub alarm_text: String,
    pub has_alarm: bool,
    pub raw_registers: RawRegisters,
    pub updated_at: DateTime<Utc>,
}

impl StoveSnapshot {
    pub fn from_registers(raw: RawRegisters) -> Self {
        Self::from_registers_at(raw, Utc::now())
    }

    pub fn from_registers_at(raw: RawRegisters, updated_at: DateTime<Utc>) -> Self {
        let status = StatusWord(raw.status);
        let state = status.state();

        Self {
            status_raw: raw.status,
            status_text: state.to_string(),
            status_code: state.ui_code(),
            is_on: status.is_on(),
            is_heating: status.is_heating(),
            room_temp_c: f64::from(raw.room_temp) / 10.0,
            target_temp_c: raw.setpoint,
            fumes_temp_c: raw.fumes_temp,
            power_level: raw.power_level,
            pellet_speed: raw.pellet_speed,
            fan_rpm: raw.exhaust_fan * 10,
            alarm_code: raw.error_code,
            alarm_text: alarm_text(raw.error_code),
            has_alarm: raw.error_code > 0,
            raw_registers: raw,
            updated_at,
        }
    }
}
