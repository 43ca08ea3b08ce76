//! Board settings.
//!
//! Every struct deserializes with serde and falls back to the values the
//! firmware ships with, so a partial JSON document is enough to override one
//! field.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::utils::connection::softap::AccessPointConfig;

/// Everything the demos can be tuned with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub access_point: AccessPointConfig,
    pub broker: BrokerConfig,
    pub door: DoorConfig,
    pub game: GameConfig,
}

/// Message broker connection used by the sensor bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub uri: String<64>,
    pub username: Option<String<32>>,
    pub password: Option<String<64>>,
    /// Seconds between climate publications.
    pub climate_period_s: u32,
    /// Seconds between acceleration publications.
    pub motion_period_s: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        let mut uri = String::new();
        let _ = uri.push_str("mqtt://localhost:1883");
        Self {
            uri,
            username: None,
            password: None,
            climate_period_s: 5,
            motion_period_s: 1,
        }
    }
}

/// Servo calibration and timing for the RFID door lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Delay between removing a tag and closing the latch.
    pub close_delay_ms: u32,
    /// Servo angle that really corresponds to 0°.
    pub calibration_0: u16,
    /// Servo angle that really corresponds to 180°.
    pub calibration_180: u16,
    pub closed_offset: u16,
    pub opened_offset: u16,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            close_delay_ms: 1000,
            calibration_0: 0,
            calibration_180: 180,
            closed_offset: 0,
            opened_offset: 0,
        }
    }
}

impl DoorConfig {
    pub fn closed_angle(&self) -> u16 {
        self.calibration_0.saturating_add(self.closed_offset)
    }

    /// A quarter turn back from the calibrated 180°.
    pub fn open_angle(&self) -> u16 {
        self.calibration_180
            .saturating_sub(90)
            .saturating_add(self.opened_offset)
    }
}

/// Loop timing for the button games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Button polling period shared by the snake and toggle demos.
    pub poll_ms: u64,
    /// The snake moves once every this many polls.
    pub snake_step_polls: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            poll_ms: 100,
            snake_step_polls: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"door":{"close_delay_ms":2500},"game":{"poll_ms":50}}"#)
                .unwrap();
        assert_eq!(s.door.close_delay_ms, 2500);
        assert_eq!(s.door.calibration_180, 180);
        assert_eq!(s.game.poll_ms, 50);
        assert_eq!(s.game.snake_step_polls, 4);
        assert_eq!(s.broker.uri.as_str(), "mqtt://localhost:1883");
        assert_eq!(s.access_point.ssid.as_str(), "ESP32-AP");
    }

    #[test]
    fn test_door_angles() {
        let d = DoorConfig::default();
        assert_eq!(d.closed_angle(), 0);
        assert_eq!(d.open_angle(), 90);
        let d = DoorConfig {
            closed_offset: 5,
            opened_offset: 10,
            ..DoorConfig::default()
        };
        assert_eq!(d.closed_angle(), 5);
        assert_eq!(d.open_angle(), 100);
    }

    #[test]
    fn test_door_angles_saturate_on_huge_offsets() {
        let s: Settings = serde_json::from_str(
            r#"{"door":{"calibration_0":65535,"closed_offset":1,"opened_offset":65535}}"#,
        )
        .unwrap();
        assert_eq!(s.door.closed_angle(), u16::MAX);
        assert_eq!(s.door.open_angle(), u16::MAX);
    }
}
