//! Field presence conditions.
//!
//! Every catalog entry names a [`Condition`]. When a session starts the
//! recorder evaluates each condition once against the current configuration
//! and stores the results in a [`ConditionCache`]. Header emission and frame
//! encoding both consult the cache, never the live configuration, so a field
//! declared in the header is present in every frame of that session.

use crate::config::BlackboxConfig;
use crate::system::{CurrentMeter, SystemConfig, VoltageMeter};

/// Reasons a field may be left out of the log.
///
/// The discriminant is the bit index in the [`ConditionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Condition {
    Always = 0,
    AtLeastMotors1,
    AtLeastMotors2,
    AtLeastMotors3,
    AtLeastMotors4,
    AtLeastMotors5,
    AtLeastMotors6,
    AtLeastMotors7,
    AtLeastMotors8,
    Tricopter,
    NonzeroPidD0,
    NonzeroPidD1,
    NonzeroPidD2,
    Mag,
    Baro,
    Vbat,
    AmperageAdc,
    Rangefinder,
    Rssi,
    /// `p_ratio != 1`, so GPS frames need their own timestamp.
    NotLoggingEveryFrame,
    Acc,
    Debug,
    Never,
}

impl Condition {
    /// All conditions in bit order.
    pub const ALL: [Condition; 23] = [
        Condition::Always,
        Condition::AtLeastMotors1,
        Condition::AtLeastMotors2,
        Condition::AtLeastMotors3,
        Condition::AtLeastMotors4,
        Condition::AtLeastMotors5,
        Condition::AtLeastMotors6,
        Condition::AtLeastMotors7,
        Condition::AtLeastMotors8,
        Condition::Tricopter,
        Condition::NonzeroPidD0,
        Condition::NonzeroPidD1,
        Condition::NonzeroPidD2,
        Condition::Mag,
        Condition::Baro,
        Condition::Vbat,
        Condition::AmperageAdc,
        Condition::Rangefinder,
        Condition::Rssi,
        Condition::NotLoggingEveryFrame,
        Condition::Acc,
        Condition::Debug,
        Condition::Never,
    ];

    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u8)
    }

    /// Evaluate against live configuration.
    fn evaluate(self, config: &BlackboxConfig, system: &SystemConfig) -> bool {
        use Condition::*;

        match self {
            Always => true,
            AtLeastMotors1 | AtLeastMotors2 | AtLeastMotors3 | AtLeastMotors4 | AtLeastMotors5
            | AtLeastMotors6 | AtLeastMotors7 | AtLeastMotors8 => {
                let needed = self as u8 - AtLeastMotors1 as u8 + 1;
                system.motor.count >= needed
            }
            Tricopter => false,
            NonzeroPidD0 | NonzeroPidD1 | NonzeroPidD2 => {
                let axis = (self as u8 - NonzeroPidD0 as u8) as usize;
                system.pid.axis[axis].d != 0
            }
            Mag => cfg!(feature = "mag") && system.sensors.mag,
            Baro => cfg!(feature = "baro") && system.sensors.baro,
            Vbat => system.battery.voltage_meter != VoltageMeter::None,
            AmperageAdc => system.battery.current_meter != CurrentMeter::None,
            Rangefinder => cfg!(feature = "rangefinder") && system.sensors.rangefinder,
            Rssi => system.rx.rssi_configured,
            NotLoggingEveryFrame => config.p_ratio != 1,
            // Sensor presence and the user toggle are independent checks.
            Acc => system.sensors.acc && config.record_acc,
            Debug => system.debug_mode != 0,
            Never => false,
        }
    }
}

/// Session-lifetime snapshot of every [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionCache(u32);

impl ConditionCache {
    /// Evaluate every condition once.
    pub fn build(config: &BlackboxConfig, system: &SystemConfig) -> Self {
        let bits = Condition::ALL
            .iter()
            .filter(|c| c.evaluate(config, system))
            .fold(0u32, |acc, c| acc | c.bit());
        Self(bits)
    }

    /// Cached result for `condition`.
    #[inline]
    pub const fn test(&self, condition: Condition) -> bool {
        self.0 & condition.bit() != 0
    }

    /// Raw bitmask, one bit per condition.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fits_in_cache() {
        assert!(Condition::ALL.len() <= 32);
        for (i, c) in Condition::ALL.iter().enumerate() {
            assert_eq!(*c as usize, i);
        }
    }

    #[test]
    fn test_motor_count() {
        let config = BlackboxConfig::default();
        let mut system = SystemConfig::default();
        system.motor.count = 2;
        let cache = ConditionCache::build(&config, &system);

        assert!(cache.test(Condition::AtLeastMotors1));
        assert!(cache.test(Condition::AtLeastMotors2));
        assert!(!cache.test(Condition::AtLeastMotors3));
        assert!(!cache.test(Condition::AtLeastMotors8));
    }

    #[test]
    fn test_pid_d_and_fixed_conditions() {
        let config = BlackboxConfig::default();
        let mut system = SystemConfig::default();
        system.pid.axis[1].d = 5;
        let cache = ConditionCache::build(&config, &system);

        assert!(cache.test(Condition::Always));
        assert!(!cache.test(Condition::Never));
        assert!(!cache.test(Condition::Tricopter));
        assert!(!cache.test(Condition::NonzeroPidD0));
        assert!(cache.test(Condition::NonzeroPidD1));
    }

    #[test]
    fn test_acc_needs_sensor_and_toggle() {
        let mut config = BlackboxConfig::default();
        let mut system = SystemConfig::default();
        assert!(ConditionCache::build(&config, &system).test(Condition::Acc));

        config.record_acc = false;
        assert!(!ConditionCache::build(&config, &system).test(Condition::Acc));

        config.record_acc = true;
        system.sensors.acc = false;
        assert!(!ConditionCache::build(&config, &system).test(Condition::Acc));
    }

    #[test]
    fn test_not_logging_every_frame() {
        let system = SystemConfig::default();
        let mut config = BlackboxConfig::default();
        assert!(ConditionCache::build(&config, &system).test(Condition::NotLoggingEveryFrame));

        config.p_ratio = 1;
        assert!(!ConditionCache::build(&config, &system).test(Condition::NotLoggingEveryFrame));
    }

    #[test]
    fn test_cache_ignores_later_changes() {
        let config = BlackboxConfig::default();
        let mut system = SystemConfig::default();
        let cache = ConditionCache::build(&config, &system);

        system.debug_mode = 3;
        system.battery.voltage_meter = VoltageMeter::None;
        assert!(!cache.test(Condition::Debug));
        assert!(cache.test(Condition::Vbat));
    }
}
