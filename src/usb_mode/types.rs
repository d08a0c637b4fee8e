//! USB network mode types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UsbModeError;

/// Value reported as `mode_value` when no mode is configured
pub const ABSENT_MODE_VALUE: i32 = -1;

/// Name reported for any value that is not a valid mode
pub const UNKNOWN_MODE_NAME: &str = "unknown";

/// USB gadget network function emulated towards the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsbMode {
    /// CDC Network Control Model
    CdcNcm = 1,
    /// CDC Ethernet Control Model
    CdcEcm = 2,
    /// Microsoft Remote NDIS
    Rndis = 3,
}

impl UsbMode {
    /// All modes, in persisted value order
    pub const ALL: [UsbMode; 3] = [UsbMode::CdcNcm, UsbMode::CdcEcm, UsbMode::Rndis];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            UsbMode::CdcNcm => "cdc_ncm",
            UsbMode::CdcEcm => "cdc_ecm",
            UsbMode::Rndis => "rndis",
        }
    }

    /// Integer stored in the mode files
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Comma separated list of the accepted names
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for UsbMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UsbMode {
    type Err = UsbModeError;

    /// Exact, case-sensitive match against the canonical names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UsbMode::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| UsbModeError::InvalidName(s.to_string()))
    }
}

impl TryFrom<i32> for UsbMode {
    type Error = UsbModeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(UsbMode::CdcNcm),
            2 => Ok(UsbMode::CdcEcm),
            3 => Ok(UsbMode::Rndis),
            other => Err(UsbModeError::InvalidMode(other)),
        }
    }
}

/// Display name for a raw stored value, `"unknown"` when it is not a mode
pub fn mode_name(value: i32) -> &'static str {
    UsbMode::try_from(value)
        .map(UsbMode::name)
        .unwrap_or(UNKNOWN_MODE_NAME)
}

/// Persisted record slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeSlot {
    /// Trial override, takes precedence while present
    Temporary,
    /// Durable baseline
    Permanent,
}

impl fmt::Display for ModeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSlot::Temporary => f.write_str("temporary"),
            ModeSlot::Permanent => f.write_str("permanent"),
        }
    }
}

/// Resolved mode state as seen by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbModeStatus {
    /// Effective mode, `None` when nothing valid is configured
    pub mode: Option<UsbMode>,
    /// Whether a temporary record exists, whatever its content
    pub is_temporary: bool,
}

impl UsbModeStatus {
    pub fn mode_name(&self) -> &'static str {
        self.mode.map(UsbMode::name).unwrap_or(UNKNOWN_MODE_NAME)
    }

    pub fn mode_value(&self) -> i32 {
        self.mode.map(UsbMode::value).unwrap_or(ABSENT_MODE_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for mode in UsbMode::ALL {
            assert_eq!(mode.name().parse::<UsbMode>().unwrap(), mode);
            assert_eq!(UsbMode::try_from(mode.value()).unwrap(), mode);
        }
    }

    #[test]
    fn test_parse_is_exact() {
        for input in ["", "RNDIS", "Cdc_Ncm", " rndis", "rndis ", "cdc-ncm", "ncm", "unknown"] {
            match input.parse::<UsbMode>() {
                Err(UsbModeError::InvalidName(name)) => assert_eq!(name, input),
                other => panic!("{:?} parsed as {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_mode_name_of_raw_values() {
        assert_eq!(mode_name(1), "cdc_ncm");
        assert_eq!(mode_name(2), "cdc_ecm");
        assert_eq!(mode_name(3), "rndis");
        assert_eq!(mode_name(0), "unknown");
        assert_eq!(mode_name(4), "unknown");
        assert_eq!(mode_name(ABSENT_MODE_VALUE), "unknown");
    }

    #[test]
    fn test_invalid_value() {
        assert!(matches!(
            UsbMode::try_from(99),
            Err(UsbModeError::InvalidMode(99))
        ));
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        assert_eq!(serde_json::to_string(&UsbMode::CdcEcm).unwrap(), "\"cdc_ecm\"");
        let mode: UsbMode = serde_json::from_str("\"rndis\"").unwrap();
        assert_eq!(mode, UsbMode::Rndis);
    }

    #[test]
    fn test_absent_status() {
        let status = UsbModeStatus {
            mode: None,
            is_temporary: false,
        };
        assert_eq!(status.mode_name(), "unknown");
        assert!(status.mode_value() < 0);
        assert_eq!(UsbMode::valid_names(), "cdc_ncm, cdc_ecm, rndis");
    }
}
