//! Craft configuration read by the recorder.
//!
//! The recorder does not own these settings; it only reads them when a
//! session starts, to decide which optional fields exist and to fill the
//! system information header lines.

use alloc::string::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Firmware identity written at the top of the sysinfo header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FirmwareInfo {
    pub name: String,
    pub version: String,
    pub git_revision: String,
    pub target: String,
    pub build_date: String,
    pub build_time: String,
    pub manufacturer_id: String,
    pub board_name: String,
}

impl Default for FirmwareInfo {
    fn default() -> Self {
        Self {
            name: "Rotorflight".into(),
            version: "0.0.0".into(),
            git_revision: "0000000".into(),
            target: "GENERIC".into(),
            build_date: "Jan  1 2000".into(),
            build_time: "00:00:00".into(),
            manufacturer_id: String::new(),
            board_name: String::new(),
        }
    }
}

/// Which sensors were detected at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Sensors {
    pub acc: bool,
    pub mag: bool,
    pub baro: bool,
    pub rangefinder: bool,
    pub gps: bool,
    /// Accelerometer 1G reference in raw units.
    pub acc_1g: u16,
    pub acc_hardware: u8,
    pub baro_hardware: u8,
    pub mag_hardware: u8,
}

impl Default for Sensors {
    fn default() -> Self {
        Self {
            acc: true,
            mag: false,
            baro: false,
            rangefinder: false,
            gps: false,
            acc_1g: 2048,
            acc_hardware: 0,
            baro_hardware: 0,
            mag_hardware: 0,
        }
    }
}

/// Voltage meter source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VoltageMeter {
    None,
    #[default]
    Adc,
    Esc,
}

/// Current meter source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CurrentMeter {
    #[default]
    None,
    Adc,
    Virtual,
    Esc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatteryConfig {
    pub voltage_meter: VoltageMeter,
    pub current_meter: CurrentMeter,
    pub vbat_scale: u8,
    /// Cell voltages in 0.01 V.
    pub min_cell_voltage: u16,
    pub warning_cell_voltage: u16,
    pub max_cell_voltage: u16,
    pub current_offset: i16,
    pub current_scale: i16,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            voltage_meter: VoltageMeter::Adc,
            current_meter: CurrentMeter::None,
            vbat_scale: 110,
            min_cell_voltage: 330,
            warning_cell_voltage: 350,
            max_cell_voltage: 430,
            current_offset: 0,
            current_scale: 400,
        }
    }
}

/// Gains of one PID axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidGains {
    pub p: u16,
    pub i: u16,
    pub d: u16,
    pub f: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PidProfile {
    /// Roll, pitch, yaw.
    pub axis: [PidGains; 3],
    pub iterm_relax: u8,
    pub iterm_relax_type: u8,
    pub iterm_relax_cutoff: u8,
    pub ff_boost: u8,
}

impl Default for PidProfile {
    fn default() -> Self {
        Self {
            axis: [
                PidGains { p: 50, i: 100, d: 0, f: 100 },
                PidGains { p: 50, i: 100, d: 0, f: 100 },
                PidGains { p: 80, i: 120, d: 10, f: 0 },
            ],
            iterm_relax: 1,
            iterm_relax_type: 1,
            iterm_relax_cutoff: 10,
            ff_boost: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RateProfile {
    pub rates_type: u8,
    pub rc_rates: [u8; 3],
    pub rc_expo: [u8; 3],
    pub rates: [u8; 3],
    pub rate_limits: [u16; 3],
}

impl Default for RateProfile {
    fn default() -> Self {
        Self {
            rates_type: 4,
            rc_rates: [36, 36, 36],
            rc_expo: [0, 0, 0],
            rates: [36, 36, 36],
            rate_limits: [1998, 1998, 1998],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterConfig {
    pub gyro_hardware_lpf: u8,
    pub gyro_lowpass_type: u8,
    pub gyro_lowpass_hz: u16,
    pub gyro_lowpass2_type: u8,
    pub gyro_lowpass2_hz: u16,
    pub gyro_notch_hz: [u16; 2],
    pub gyro_notch_cutoff: [u16; 2],
    pub dterm_filter_type: u8,
    pub dterm_lowpass_hz: u16,
    pub dterm_filter2_type: u8,
    pub dterm_lowpass2_hz: u16,
    pub dterm_notch_hz: u16,
    pub dterm_notch_cutoff: u16,
    /// Accelerometer low pass in 0.01 Hz.
    pub acc_lpf_hz: u16,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gyro_hardware_lpf: 0,
            gyro_lowpass_type: 0,
            gyro_lowpass_hz: 100,
            gyro_lowpass2_type: 0,
            gyro_lowpass2_hz: 0,
            gyro_notch_hz: [0, 0],
            gyro_notch_cutoff: [0, 0],
            dterm_filter_type: 0,
            dterm_lowpass_hz: 100,
            dterm_filter2_type: 0,
            dterm_lowpass2_hz: 0,
            dterm_notch_hz: 0,
            dterm_notch_cutoff: 0,
            acc_lpf_hz: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotorConfig {
    /// Number of motors driven by the mixer.
    pub count: u8,
    pub min_throttle: u16,
    pub max_throttle: u16,
    pub pwm_protocol: u8,
    pub pwm_rate: u16,
    pub use_unsynced_pwm: bool,
    pub dshot_bidir: bool,
    pub dshot_idle_value: u16,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            count: 1,
            min_throttle: 1070,
            max_throttle: 2000,
            pwm_protocol: 0,
            pwm_rate: 480,
            use_unsynced_pwm: false,
            dshot_bidir: false,
            dshot_idle_value: 450,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RxConfig {
    pub serialrx_provider: u8,
    pub rc_interpolation: u8,
    pub rc_interpolation_interval: u8,
    pub rc_interpolation_channels: u8,
    pub rssi_configured: bool,
    pub deadband: u8,
    pub yaw_deadband: u8,
}

impl Default for RxConfig {
    fn default() -> Self {
        Self {
            serialrx_provider: 0,
            rc_interpolation: 2,
            rc_interpolation_interval: 19,
            rc_interpolation_channels: 0,
            rssi_configured: false,
            deadband: 2,
            yaw_deadband: 2,
        }
    }
}

/// Everything the recorder reads from the rest of the firmware configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SystemConfig {
    pub firmware: FirmwareInfo,
    pub craft_name: String,
    /// Wall clock at session start, ISO 8601. `None` when no RTC is set.
    pub start_datetime: Option<String>,
    /// Control loop period in microseconds.
    pub looptime_us: u32,
    pub pid_process_denom: u8,
    pub debug_mode: u8,
    /// Enabled feature bitmask.
    pub features: u32,
    pub gyro_cal_on_first_arm: bool,
    pub sensors: Sensors,
    pub battery: BatteryConfig,
    pub pid: PidProfile,
    pub rates: RateProfile,
    pub filters: FilterConfig,
    pub motor: MotorConfig,
    pub rx: RxConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            firmware: FirmwareInfo::default(),
            craft_name: String::new(),
            start_datetime: None,
            looptime_us: 1000,
            pid_process_denom: 1,
            debug_mode: 0,
            features: 0,
            gyro_cal_on_first_arm: false,
            sensors: Sensors::default(),
            battery: BatteryConfig::default(),
            pid: PidProfile::default(),
            rates: RateProfile::default(),
            filters: FilterConfig::default(),
            motor: MotorConfig::default(),
            rx: RxConfig::default(),
        }
    }
}

impl SystemConfig {
    /// `features` bit for the GPS feature.
    pub const FEATURE_GPS: u32 = 1 << 7;

    /// Whether GPS frames should be logged.
    pub fn gps_enabled(&self) -> bool {
        cfg!(feature = "gps") && self.features & Self::FEATURE_GPS != 0 && self.sensors.gps
    }

    /// Load from JSON. Missing keys keep their defaults.
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let system: Self = serde_json::from_str(json)?;
        if system.looptime_us == 0 {
            return Err(crate::Error::InvalidConfig("looptime_us must be non-zero".into()));
        }
        Ok(system)
    }
}
