//! Read-only entity views over the latest snapshot
//!
//! Every view tolerates a missing snapshot: values become `None` and the
//! climate action reads `off` until the first successful poll.

use duepi_evo::constants::{MAX_POWER, MAX_TEMP, MIN_POWER, MIN_TEMP};
use duepi_evo::{power_label, StoveSnapshot};
use serde::{Deserialize, Serialize};

pub const MANUFACTURER: &str = "Kalor";
pub const MODEL: &str = "Petit";
pub const DEVICE_NAME: &str = "Kalor Petit";

/// Stable entity id scoped by device code
pub fn unique_id(device_code: &str, key: &str) -> String {
    format!("{}-{}", device_code, key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    Heat,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacAction {
    Heating,
    Idle,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl DeviceInfo {
    pub fn for_device(device_code: &str) -> Self {
        Self {
            identifier: device_code.to_string(),
            name: DEVICE_NAME,
            manufacturer: MANUFACTURER,
            model: MODEL,
        }
    }
}

// ============================================================================
// Climate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateView {
    pub unique_id: String,
    pub hvac_mode: HvacMode,
    pub hvac_action: HvacAction,
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub min_temp: f64,
    pub max_temp: f64,
    pub target_temperature_step: f64,
}

impl ClimateView {
    pub fn new(device_code: &str, snapshot: Option<&StoveSnapshot>) -> Self {
        let hvac_mode = match snapshot {
            Some(s) if s.is_on => HvacMode::Heat,
            _ => HvacMode::Off,
        };
        let hvac_action = match snapshot {
            Some(s) if s.is_heating => HvacAction::Heating,
            Some(s) if s.is_on => HvacAction::Idle,
            _ => HvacAction::Off,
        };

        Self {
            unique_id: unique_id(device_code, "climate"),
            hvac_mode,
            hvac_action,
            current_temperature: snapshot.map(|s| s.room_temp_c),
            target_temperature: snapshot.map(|s| f64::from(s.target_temp_c)),
            min_temp: f64::from(MIN_TEMP),
            max_temp: f64::from(MAX_TEMP),
            target_temperature_step: 1.0,
        }
    }
}

// ============================================================================
// Sensors
// ============================================================================

/// Static description of one sensor
#[derive(Debug, Clone, Copy)]
pub struct SensorDescription {
    pub key: &'static str,
    pub unit: Option<&'static str>,
    pub precision: Option<u8>,
    value: fn(&StoveSnapshot) -> SensorValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

pub const SENSORS: [SensorDescription; 6] = [
    SensorDescription {
        key: "room_temperature",
        unit: Some("°C"),
        precision: Some(1),
        value: |s| SensorValue::Number(s.room_temp_c),
    },
    SensorDescription {
        key: "fumes_temperature",
        unit: Some("°C"),
        precision: Some(0),
        value: |s| SensorValue::Number(f64::from(s.fumes_temp_c)),
    },
    SensorDescription {
        key: "exhaust_fan_speed",
        unit: Some("rpm"),
        precision: Some(0),
        value: |s| SensorValue::Number(f64::from(s.fan_rpm)),
    },
    SensorDescription {
        key: "power_level",
        unit: None,
        precision: None,
        value: |s| SensorValue::Number(f64::from(s.power_level)),
    },
    SensorDescription {
        key: "pellet_feed_speed",
        unit: None,
        precision: None,
        value: |s| SensorValue::Number(f64::from(s.pellet_speed)),
    },
    SensorDescription {
        key: "status",
        unit: None,
        precision: None,
        value: |s| SensorValue::Text(s.status_text.clone()),
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub unique_id: String,
    pub key: &'static str,
    pub value: Option<SensorValue>,
    pub unit: Option<&'static str>,
    pub precision: Option<u8>,
}

impl SensorDescription {
    pub fn read(&self, device_code: &str, snapshot: Option<&StoveSnapshot>) -> SensorReading {
        SensorReading {
            unique_id: unique_id(device_code, self.key),
            key: self.key,
            value: snapshot.map(self.value),
            unit: self.unit,
            precision: self.precision,
        }
    }
}

pub fn sensor_readings(device_code: &str, snapshot: Option<&StoveSnapshot>) -> Vec<SensorReading> {
    SENSORS
        .iter()
        .map(|sensor| sensor.read(device_code, snapshot))
        .collect()
}

// ============================================================================
// Alarm, power level, reset
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmView {
    pub unique_id: String,
    pub is_on: Option<bool>,
    pub alarm_code: Option<i32>,
    pub alarm_text: Option<String>,
}

impl AlarmView {
    pub fn new(device_code: &str, snapshot: Option<&StoveSnapshot>) -> Self {
        Self {
            unique_id: unique_id(device_code, "alarm"),
            is_on: snapshot.map(|s| s.has_alarm),
            alarm_code: snapshot.map(|s| s.alarm_code),
            alarm_text: snapshot.map(|s| s.alarm_text.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerLevelControl {
    pub unique_id: String,
    pub value: Option<i32>,
    pub label: Option<&'static str>,
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub mode: &'static str,
}

impl PowerLevelControl {
    pub fn new(device_code: &str, snapshot: Option<&StoveSnapshot>) -> Self {
        let value = snapshot.map(|s| s.power_level);
        Self {
            unique_id: unique_id(device_code, "power_level_ctrl"),
            value,
            label: value.and_then(power_label),
            min: MIN_POWER,
            max: MAX_POWER,
            step: 1,
            mode: "slider",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetButton {
    pub unique_id: String,
}

impl ResetButton {
    pub fn new(device_code: &str) -> Self {
        Self {
            unique_id: unique_id(device_code, "reset_error"),
        }
    }
}

/// Every entity the service exposes for one stove
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityViews {
    pub device: DeviceInfo,
    pub climate: ClimateView,
    pub sensors: Vec<SensorReading>,
    pub alarm: AlarmView,
    pub power_level: PowerLevelControl,
    pub reset_error: ResetButton,
}

impl EntityViews {
    pub fn new(device_code: &str, snapshot: Option<&StoveSnapshot>) -> Self {
        Self {
            device: DeviceInfo::for_device(device_code),
            climate: ClimateView::new(device_code, snapshot),
            sensors: sensor_readings(device_code, snapshot),
            alarm: AlarmView::new(device_code, snapshot),
            power_level: PowerLevelControl::new(device_code, snapshot),
            reset_error: ResetButton::new(device_code),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use duepi_evo::constants::status_flags::{CLEANING, ECO, OFF, WORKING};
    use duepi_evo::RawRegisters;

    fn snapshot(status: u32, error_code: i32) -> StoveSnapshot {
        StoveSnapshot::from_registers(RawRegisters {
            status,
            room_temp: 205,
            fumes_temp: 140,
            power_level: 3,
            pellet_speed: 25,
            exhaust_fan: 120,
            error_code,
            setpoint: 21,
        })
    }

    // ========================================================================
    // Climate Tests
    // ========================================================================

    #[test]
    fn test_climate_working() {
        let snap = snapshot(WORKING, 0);
        let view = ClimateView::new("ABC123", Some(&snap));
        assert_eq!(view.unique_id, "ABC123-climate");
        assert_eq!(view.hvac_mode, HvacMode::Heat);
        assert_eq!(view.hvac_action, HvacAction::Heating);
        assert_eq!(view.current_temperature, Some(20.5));
        assert_eq!(view.target_temperature, Some(21.0));
        assert_eq!(view.min_temp, 10.0);
        assert_eq!(view.max_temp, 35.0);
    }

    #[test]
    fn test_climate_cleaning_is_idle() {
        let snap = snapshot(CLEANING, 0);
        let view = ClimateView::new("ABC123", Some(&snap));
        assert_eq!(view.hvac_mode, HvacMode::Heat);
        assert_eq!(view.hvac_action, HvacAction::Idle);
    }

    #[test]
    fn test_climate_eco_standby_is_off() {
        let snap = snapshot(ECO, 0);
        let view = ClimateView::new("ABC123", Some(&snap));
        assert_eq!(view.hvac_mode, HvacMode::Off);
        assert_eq!(view.hvac_action, HvacAction::Off);
    }

    #[test]
    fn test_climate_without_data_is_off() {
        let view = ClimateView::new("ABC123", None);
        assert_eq!(view.hvac_mode, HvacMode::Off);
        assert_eq!(view.hvac_action, HvacAction::Off);
        assert_eq!(view.current_temperature, None);

        let snap = snapshot(OFF, 0);
        let view = ClimateView::new("ABC123", Some(&snap));
        assert_eq!(view.hvac_action, HvacAction::Off);
    }

    // ========================================================================
    // Sensor Tests
    // ========================================================================

    #[test]
    fn test_sensor_readings() {
        let snap = snapshot(WORKING, 0);
        let readings = sensor_readings("ABC123", Some(&snap));
        assert_eq!(readings.len(), 6);

        let keys: Vec<_> = readings.iter().map(|r| r.key).collect();
        assert_eq!(
            keys,
            [
                "room_temperature",
                "fumes_temperature",
                "exhaust_fan_speed",
                "power_level",
                "pellet_feed_speed",
                "status"
            ]
        );
        assert_eq!(readings[0].unique_id, "ABC123-room_temperature");
        assert_eq!(readings[0].value, Some(SensorValue::Number(20.5)));
        assert_eq!(readings[0].precision, Some(1));
        assert_eq!(readings[2].value, Some(SensorValue::Number(1200.0)));
        assert_eq!(readings[2].unit, Some("rpm"));
        assert_eq!(
            readings[5].value,
            Some(SensorValue::Text("Working".to_string()))
        );
    }

    #[test]
    fn test_sensors_without_data() {
        let readings = sensor_readings("ABC123", None);
        assert!(readings.iter().all(|r| r.value.is_none()));
    }

    // ========================================================================
    // Alarm / Control Tests
    // ========================================================================

    #[test]
    fn test_alarm_view() {
        let snap = snapshot(OFF, 7);
        let alarm = AlarmView::new("ABC123", Some(&snap));
        assert_eq!(alarm.unique_id, "ABC123-alarm");
        assert_eq!(alarm.is_on, Some(true));
        assert_eq!(alarm.alarm_code, Some(7));
        assert_eq!(alarm.alarm_text.as_deref(), Some("Door open"));

        let alarm = AlarmView::new("ABC123", None);
        assert_eq!(alarm.is_on, None);
        assert_eq!(alarm.alarm_text, None);
    }

    #[test]
    fn test_power_level_control() {
        let snap = snapshot(WORKING, 0);
        let control = PowerLevelControl::new("ABC123", Some(&snap));
        assert_eq!(control.unique_id, "ABC123-power_level_ctrl");
        assert_eq!(control.value, Some(3));
        assert_eq!(control.label, Some("Medium"));
        assert_eq!((control.min, control.max, control.step), (0, 6, 1));
    }

    #[test]
    fn test_entity_views_serialize() {
        let snap = snapshot(WORKING, 0);
        let views = EntityViews::new("ABC123", Some(&snap));
        let json = serde_json::to_value(&views).unwrap();

        assert_eq!(json["device"]["manufacturer"], "Kalor");
        assert_eq!(json["device"]["model"], "Petit");
        assert_eq!(json["device"]["name"], "Kalor Petit");
        assert_eq!(json["device"]["identifier"], "ABC123");
        assert_eq!(json["climate"]["hvacMode"], "heat");
        assert_eq!(json["climate"]["hvacAction"], "heating");
        assert!(json["climate"].get("hvac_mode").is_none());
        assert_eq!(json["sensors"][5]["value"], "Working");
        assert_eq!(json["resetError"]["uniqueId"], "ABC123-reset_error");
        assert!(json.get("reset_error").is_none());
    }
}
