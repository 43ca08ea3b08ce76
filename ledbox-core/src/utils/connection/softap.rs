//! WiFi soft access point settings and station events.
//!
//! The radio itself belongs to the vendor HAL; this module only validates the
//! configuration handed to it and keeps track of the stations it reports.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Highest 2.4 GHz channel accepted.
pub const MAX_CHANNEL: u8 = 13;
/// Station limit of the ESP soft AP.
pub const MAX_STATIONS: u8 = 10;
/// WPA2 passphrases are at least eight characters.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Open,
    WpaWpa2Personal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    SsidEmpty,
    PasswordTooShort(usize),
    BadChannel(u8),
    BadStationLimit(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPointConfig {
    pub ssid: String<32>,
    pub password: String<64>,
    pub channel: u8,
    pub max_connections: u8,
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        let mut ssid = String::new();
        let _ = ssid.push_str("ESP32-AP");
        let mut password = String::new();
        let _ = password.push_str("12345678");
        Self {
            ssid,
            password,
            channel: 1,
            max_connections: 4,
        }
    }
}

impl AccessPointConfig {
    /// An empty password means an open network.
    pub fn auth_method(&self) -> AuthMethod {
        if self.password.is_empty() {
            AuthMethod::Open
        } else {
            AuthMethod::WpaWpa2Personal
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() {
            return Err(ConfigError::SsidEmpty);
        }
        if !self.password.is_empty() && self.password.len() < MIN_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooShort(self.password.len()));
        }
        if !(1..=MAX_CHANNEL).contains(&self.channel) {
            return Err(ConfigError::BadChannel(self.channel));
        }
        if !(1..=MAX_STATIONS).contains(&self.max_connections) {
            return Err(ConfigError::BadStationLimit(self.max_connections));
        }
        Ok(())
    }
}

/// Station events raised by the WiFi driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApEvent {
    StationJoined { mac: [u8; 6], aid: u16 },
    StationLeft { mac: [u8; 6], aid: u16, reason: u16 },
}

struct Mac<'a>(&'a [u8; 6]);

impl core::fmt::Display for Mac<'_> {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Counts associated stations.
#[derive(Debug, Default)]
pub struct ApMonitor {
    stations: u8,
}

impl ApMonitor {
    pub fn stations(&self) -> u8 {
        self.stations
    }

    pub fn dispatch(
        &mut self,
        event: ApEvent,
    ) {
        match event {
            ApEvent::StationJoined { mac, aid } => {
                self.stations = self.stations.saturating_add(1);
                tracing::info!(mac = %Mac(&mac), aid, "station joined");
            }
            ApEvent::StationLeft { mac, aid, reason } => {
                self.stations = self.stations.saturating_sub(1);
                tracing::info!(mac = %Mac(&mac), aid, reason, "station left");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        password: &str,
        channel: u8,
    ) -> AccessPointConfig {
        let mut cfg = AccessPointConfig::default();
        cfg.password.clear();
        cfg.password.push_str(password).unwrap();
        cfg.channel = channel;
        cfg
    }

    #[test]
    fn test_auth_method_follows_password() {
        assert_eq!(config("", 1).auth_method(), AuthMethod::Open);
        assert_eq!(config("12345678", 1).auth_method(), AuthMethod::WpaWpa2Personal);
    }

    #[test]
    fn test_validate() {
        assert_eq!(AccessPointConfig::default().validate(), Ok(()));
        assert_eq!(config("", 6).validate(), Ok(()));
        assert_eq!(config("short", 1).validate(), Err(ConfigError::PasswordTooShort(5)));
        assert_eq!(config("12345678", 14).validate(), Err(ConfigError::BadChannel(14)));
        let mut cfg = AccessPointConfig::default();
        cfg.max_connections = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::BadStationLimit(0)));
        cfg.ssid.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::SsidEmpty));
    }

    #[test]
    fn test_monitor_counts_stations() {
        let mut mon = ApMonitor::default();
        let mac = [0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22];
        mon.dispatch(ApEvent::StationJoined { mac, aid: 1 });
        mon.dispatch(ApEvent::StationJoined { mac, aid: 2 });
        mon.dispatch(ApEvent::StationLeft {
            mac,
            aid: 1,
            reason: 8,
        });
        assert_eq!(mon.stations(), 1);
        mon.dispatch(ApEvent::StationLeft {
            mac,
            aid: 2,
            reason: 8,
        });
        mon.dispatch(ApEvent::StationLeft {
            mac,
            aid: 2,
            reason: 8,
        });
        assert_eq!(mon.stations(), 0);
    }
}
