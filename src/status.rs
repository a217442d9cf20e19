//! Charge status snapshots and their display precedence.
//!
//! These types match what `GET /chargestatus/{evseId}` returns. The backend
//! serializes its flags as integers (`0`/`1`); JSON booleans are accepted too.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of one charging point, as used in backend paths.
pub type EvseId = u32;

/// One point-in-time status reading for an EVSE.
///
/// Replaced wholesale on each successful poll. The flags are independent;
/// [`StatusSnapshot::display_status`] decides which one dominates.
///
/// # Example
///
/// ```
/// use evse_kiosk::{DisplayStatus, StatusSnapshot};
///
/// let json = r#"{
///     "isError": 0,
///     "isCharging": 1,
///     "isChargingEnabled": 1,
///     "isEVConnected": 1,
///     "powerActiveImport_kw_float": 7.2,
///     "energyActiveNet_kwh_float": 12.5
/// }"#;
///
/// let snapshot: StatusSnapshot = serde_json::from_str(json).unwrap();
/// assert_eq!(snapshot.display_status(), DisplayStatus::Charging);
/// assert_eq!(snapshot.power_text(), "7.200 kW");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Backend reports a fault on this EVSE
    #[serde(rename = "isError", with = "flag")]
    pub is_error: bool,

    /// Energy is flowing
    #[serde(rename = "isCharging", with = "flag")]
    pub is_charging: bool,

    /// Session authorized, waiting for the vehicle to draw power
    #[serde(rename = "isChargingEnabled", with = "flag")]
    pub is_charging_enabled: bool,

    /// A vehicle is plugged in
    #[serde(rename = "isEVConnected", with = "flag")]
    pub is_ev_connected: bool,

    /// Active import power in kW
    #[serde(rename = "powerActiveImport_kw_float")]
    pub active_power_kw: f64,

    /// Net energy of the session in kWh
    #[serde(rename = "energyActiveNet_kwh_float")]
    pub net_energy_kwh: f64,
}

impl StatusSnapshot {
    /// The dominant condition for display.
    ///
    /// Precedence, highest first: error, charging, charging enabled,
    /// connected, not connected.
    pub fn display_status(&self) -> DisplayStatus {
        if self.is_error {
            DisplayStatus::Error
        } else if self.is_charging {
            DisplayStatus::Charging
        } else if self.is_charging_enabled {
            DisplayStatus::WaitingToStart
        } else if self.is_ev_connected {
            DisplayStatus::Connected
        } else {
            DisplayStatus::NotConnected
        }
    }

    /// Active power fixed to 3 decimals, e.g. `"7.200 kW"`.
    pub fn power_text(&self) -> String {
        format!("{:.3} kW", self.active_power_kw)
    }

    /// Net energy fixed to 3 decimals, e.g. `"12.500 kWh"`.
    pub fn energy_text(&self) -> String {
        format!("{:.3} kWh", self.net_energy_kwh)
    }
}

/// The single status line shown for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayStatus {
    /// Backend reports `isError`
    Error,
    /// Energy is flowing
    Charging,
    /// Charging enabled but not yet drawing power
    WaitingToStart,
    /// Vehicle plugged in, nothing authorized
    Connected,
    /// No vehicle
    NotConnected,
}

impl DisplayStatus {
    /// Upper-case label shown on the kiosk.
    pub fn label(&self) -> &'static str {
        match self {
            DisplayStatus::Error => "ERROR",
            DisplayStatus::Charging => "CHARGING",
            DisplayStatus::WaitingToStart => "WAITING TO START",
            DisplayStatus::Connected => "CONNECTED",
            DisplayStatus::NotConnected => "NOT CONNECTED",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serde adapter for flags sent as `0`/`1` (or as booleans).
mod flag {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Bool(bool),
        Int(i64),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Wire::deserialize(deserializer)? {
            Wire::Bool(b) => Ok(b),
            // The backend only sends 0 and 1; anything non-zero counts as set.
            Wire::Int(i) => Ok(i != 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(error: bool, charging: bool, enabled: bool, connected: bool) -> StatusSnapshot {
        StatusSnapshot {
            is_error: error,
            is_charging: charging,
            is_charging_enabled: enabled,
            is_ev_connected: connected,
            ..Default::default()
        }
    }

    #[test]
    fn test_display_precedence() {
        assert_eq!(
            snapshot(false, true, true, true).display_status(),
            DisplayStatus::Charging
        );
        assert_eq!(
            snapshot(false, false, true, true).display_status(),
            DisplayStatus::WaitingToStart
        );
        assert_eq!(
            snapshot(false, false, false, true).display_status(),
            DisplayStatus::Connected
        );
        assert_eq!(
            snapshot(false, false, false, false).display_status(),
            DisplayStatus::NotConnected
        );
    }

    #[test]
    fn test_error_flag_wins_over_everything() {
        for bits in 0..8u8 {
            let s = snapshot(true, bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            assert_eq!(s.display_status(), DisplayStatus::Error);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(DisplayStatus::WaitingToStart.to_string(), "WAITING TO START");
        assert_eq!(DisplayStatus::NotConnected.label(), "NOT CONNECTED");
    }

    #[test]
    fn test_parse_integer_flags() {
        let json = r#"{"isEVConnected":1,"isChargingEnabled":0,"isCharging":0,"isError":0,
            "energyActiveNet_kwh_float":0.5,"powerActiveImport_kw_float":0}"#;
        let s: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert!(s.is_ev_connected);
        assert!(!s.is_charging_enabled);
        assert_eq!(s.display_status(), DisplayStatus::Connected);
        assert_eq!(s.energy_text(), "0.500 kWh");
        assert_eq!(s.power_text(), "0.000 kW");
    }

    #[test]
    fn test_parse_boolean_flags() {
        let json = r#"{"isEVConnected":true,"isChargingEnabled":true,"isCharging":false,
            "isError":false,"energyActiveNet_kwh_float":1.0,"powerActiveImport_kw_float":3.7}"#;
        let s: StatusSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.display_status(), DisplayStatus::WaitingToStart);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{"isError":0,"isCharging":1}"#;
        assert!(serde_json::from_str::<StatusSnapshot>(json).is_err());
    }

    #[test]
    fn test_serializes_flags_as_integers() {
        let json = serde_json::to_string(&snapshot(false, true, false, true)).unwrap();
        assert!(json.contains("\"isCharging\":1"));
        assert!(json.contains("\"isError\":0"));
        assert!(json.contains("\"powerActiveImport_kw_float\""));
    }
}
