//! Recorder configuration.
//!
//! [`BlackboxConfig`] carries the settings a pilot can change: which device to
//! log to, how many inter frames to write per intra frame, whether to log the
//! accelerometer and when logging should start.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Logging device selection.
///
/// The numeric values match the persisted configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum DeviceKind {
    /// Logging disabled.
    None = 0,
    /// On-board SPI flash.
    Flash = 1,
    /// SD card.
    SdCard = 2,
    /// External logger on a serial port.
    #[default]
    Serial = 3,
}

impl DeviceKind {
    /// Convert a raw configuration value, falling back to `None` for unknown values.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => DeviceKind::Flash,
            2 => DeviceKind::SdCard,
            3 => DeviceKind::Serial,
            _ => DeviceKind::None,
        }
    }
}

/// When a logging session is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum LoggingMode {
    /// Log while armed.
    #[default]
    Normal = 0,
    /// Also log while motors are spun up from the configurator on the bench.
    MotorTest = 1,
    /// Log from power-on.
    AlwaysOn = 2,
}

/// Blackbox settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlackboxConfig {
    /// Target device.
    pub device: DeviceKind,
    /// Inter frames per intra interval. `0` logs intra frames only.
    pub p_ratio: u16,
    /// Log accelerometer samples when the sensor is present.
    pub record_acc: bool,
    /// Session start policy.
    pub mode: LoggingMode,
}

impl Default for BlackboxConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Serial,
            p_ratio: 32,
            record_acc: true,
            mode: LoggingMode::Normal,
        }
    }
}

impl BlackboxConfig {
    /// Replace an unsupported device selection with the serial logger.
    ///
    /// `DeviceKind::None` is left alone since it switches logging off rather
    /// than naming a device, and `Serial` is already the fallback. Returns
    /// `true` if the configuration was changed.
    pub fn validate(&mut self, supported: &[DeviceKind]) -> bool {
        if matches!(self.device, DeviceKind::None | DeviceKind::Serial)
            || supported.contains(&self.device)
        {
            return false;
        }
        log::warn!(
            "Blackbox device {:?} not supported, falling back to serial",
            self.device
        );
        self.device = DeviceKind::Serial;
        true
    }

    /// Whether only intra frames are written.
    #[inline]
    pub fn intra_only(&self) -> bool {
        self.p_ratio == 0
    }

    /// Load a configuration from JSON. Missing keys keep their defaults.
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BlackboxConfig::default();
        assert_eq!(config.device, DeviceKind::Serial);
        assert_eq!(config.p_ratio, 32);
        assert!(config.record_acc);
        assert_eq!(config.mode, LoggingMode::Normal);
        assert!(!config.intra_only());
    }

    #[test]
    fn test_validate_downgrades_unsupported_device() {
        let mut config = BlackboxConfig {
            device: DeviceKind::Flash,
            ..Default::default()
        };
        assert!(config.validate(&[DeviceKind::Serial, DeviceKind::SdCard]));
        assert_eq!(config.device, DeviceKind::Serial);

        let mut config = BlackboxConfig {
            device: DeviceKind::SdCard,
            ..Default::default()
        };
        assert!(!config.validate(&[DeviceKind::Serial, DeviceKind::SdCard]));
        assert_eq!(config.device, DeviceKind::SdCard);
    }

    #[test]
    fn test_validate_keeps_serial_fallback() {
        let mut config = BlackboxConfig::default();
        assert!(!config.validate(&[DeviceKind::SdCard]));
        assert_eq!(config.device, DeviceKind::Serial);
    }

    #[test]
    fn test_validate_keeps_none() {
        let mut config = BlackboxConfig {
            device: DeviceKind::None,
            ..Default::default()
        };
        assert!(!config.validate(&[DeviceKind::Serial]));
        assert_eq!(config.device, DeviceKind::None);
    }

    #[test]
    fn test_device_kind_from_u8() {
        assert_eq!(DeviceKind::from_u8(1), DeviceKind::Flash);
        assert_eq!(DeviceKind::from_u8(3), DeviceKind::Serial);
        assert_eq!(DeviceKind::from_u8(42), DeviceKind::None);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_from_json_partial() {
        let config = BlackboxConfig::from_json(r#"{"p_ratio": 0, "mode": "always_on"}"#).unwrap();
        assert_eq!(config.p_ratio, 0);
        assert_eq!(config.mode, LoggingMode::AlwaysOn);
        assert_eq!(config.device, DeviceKind::Serial);

        assert!(matches!(
            BlackboxConfig::from_json("{\"p_ratio\": -1}"),
            Err(crate::Error::ConfigParse(_))
        ));
    }
}
