//! Static field catalogs.
//!
//! Table order is wire order. Consecutive fields sharing a tag encoding are
//! packed into one group, so the grouping below is part of the format.

use super::{Encoding, FieldCoding, FieldDefinition, Predictor};
use crate::condition::Condition;
use crate::state::{GpsSolution, GpsState, MainState, SlowState};

const SIGNED: bool = true;
const UNSIGNED: bool = false;

const ZERO_UVB: FieldCoding = FieldCoding::new(Predictor::Zero, Encoding::UnsignedVb);
const ZERO_SVB: FieldCoding = FieldCoding::new(Predictor::Zero, Encoding::SignedVb);
const ZERO_TAG2: FieldCoding = FieldCoding::new(Predictor::Zero, Encoding::Tag2_3S32);
const INC_NULL: FieldCoding = FieldCoding::new(Predictor::Inc, Encoding::Null);
const LINE_SVB: FieldCoding = FieldCoding::new(Predictor::StraightLine, Encoding::SignedVb);
const PREV_SVB: FieldCoding = FieldCoding::new(Predictor::Previous, Encoding::SignedVb);
const PREV_TAG2: FieldCoding = FieldCoding::new(Predictor::Previous, Encoding::Tag2_3S32);
const PREV_TAG4: FieldCoding = FieldCoding::new(Predictor::Previous, Encoding::Tag8_4S16);
const PREV_TAG8: FieldCoding = FieldCoding::new(Predictor::Previous, Encoding::Tag8_8Svb);
const AVG_SVB: FieldCoding = FieldCoding::new(Predictor::Average2, Encoding::SignedVb);
const VBAT_NEG14: FieldCoding = FieldCoding::new(Predictor::VbatRef, Encoding::Neg14Bit);
const HOME_SVB: FieldCoding = FieldCoding::new(Predictor::HomeCoord, Encoding::SignedVb);
const MAIN_TIME_UVB: FieldCoding =
    FieldCoding::new(Predictor::LastMainFrameTime, Encoding::UnsignedVb);

macro_rules! field_index {
    () => {
        None
    };
    ($index:literal) => {
        Some($index)
    };
}

/// Field with separate intra and inter coding.
macro_rules! delta_field {
    ($state:ty; $name:literal $([$index:literal])?, $signed:expr, $intra:expr, $inter:expr, $cond:ident, |$s:ident| $value:expr) => {
        FieldDefinition::<$state> {
            name: $name,
            index: field_index!($($index)?),
            signed: $signed,
            intra: $intra,
            inter: $inter,
            condition: Condition::$cond,
            value: |$s: &$state| ($value) as i64,
        }
    };
}

/// Field of a frame that is never delta coded.
macro_rules! simple_field {
    ($state:ty; $name:literal $([$index:literal])?, $signed:expr, $coding:expr, $cond:ident, |$s:ident| $value:expr) => {
        delta_field!($state; $name $([$index])?, $signed, $coding, $coding, $cond, |$s| $value)
    };
}

/// Fields of `I` and `P` frames.
pub static MAIN_FIELDS: &[FieldDefinition<MainState>] = &[
    // Always increments by one, so P frames carry nothing.
    delta_field!(MainState; "loopIteration", UNSIGNED, ZERO_UVB, INC_NULL, Always, |s| s.iteration),
    delta_field!(MainState; "time", UNSIGNED, ZERO_UVB, LINE_SVB, Always, |s| s.time),
    delta_field!(MainState; "axisP"[0], SIGNED, ZERO_SVB, PREV_SVB, Always, |s| s.axis_p[0]),
    delta_field!(MainState; "axisP"[1], SIGNED, ZERO_SVB, PREV_SVB, Always, |s| s.axis_p[1]),
    delta_field!(MainState; "axisP"[2], SIGNED, ZERO_SVB, PREV_SVB, Always, |s| s.axis_p[2]),
    delta_field!(MainState; "axisI"[0], SIGNED, ZERO_SVB, PREV_TAG2, Always, |s| s.axis_i[0]),
    delta_field!(MainState; "axisI"[1], SIGNED, ZERO_SVB, PREV_TAG2, Always, |s| s.axis_i[1]),
    delta_field!(MainState; "axisI"[2], SIGNED, ZERO_SVB, PREV_TAG2, Always, |s| s.axis_i[2]),
    delta_field!(MainState; "axisD"[0], SIGNED, ZERO_SVB, PREV_SVB, NonzeroPidD0, |s| s.axis_d[0]),
    delta_field!(MainState; "axisD"[1], SIGNED, ZERO_SVB, PREV_SVB, NonzeroPidD1, |s| s.axis_d[1]),
    delta_field!(MainState; "axisD"[2], SIGNED, ZERO_SVB, PREV_SVB, NonzeroPidD2, |s| s.axis_d[2]),
    delta_field!(MainState; "axisF"[0], SIGNED, ZERO_SVB, PREV_SVB, Always, |s| s.axis_f[0]),
    delta_field!(MainState; "axisF"[1], SIGNED, ZERO_SVB, PREV_SVB, Always, |s| s.axis_f[1]),
    delta_field!(MainState; "axisF"[2], SIGNED, ZERO_SVB, PREV_SVB, Always, |s| s.axis_f[2]),
    delta_field!(MainState; "rcCommand"[0], SIGNED, ZERO_SVB, PREV_TAG4, Always, |s| s.rc_command[0]),
    delta_field!(MainState; "rcCommand"[1], SIGNED, ZERO_SVB, PREV_TAG4, Always, |s| s.rc_command[1]),
    delta_field!(MainState; "rcCommand"[2], SIGNED, ZERO_SVB, PREV_TAG4, Always, |s| s.rc_command[2]),
    delta_field!(MainState; "rcCommand"[3], UNSIGNED, ZERO_UVB, PREV_TAG4, Always, |s| s.rc_command[3]),
    delta_field!(MainState; "rcCommand"[4], SIGNED, ZERO_SVB, PREV_SVB, Always, |s| s.rc_command[4]),
    delta_field!(MainState; "setpoint"[0], SIGNED, ZERO_SVB, PREV_TAG4, Always, |s| s.setpoint[0]),
    delta_field!(MainState; "setpoint"[1], SIGNED, ZERO_SVB, PREV_TAG4, Always, |s| s.setpoint[1]),
    delta_field!(MainState; "setpoint"[2], SIGNED, ZERO_SVB, PREV_TAG4, Always, |s| s.setpoint[2]),
    delta_field!(MainState; "setpoint"[3], SIGNED, ZERO_SVB, PREV_TAG4, Always, |s| s.setpoint[3]),
    // Periodically updated sensors share one tag group in P frames.
    delta_field!(MainState; "vbatLatest", UNSIGNED, VBAT_NEG14, PREV_TAG8, Vbat, |s| s.vbat_latest),
    delta_field!(MainState; "amperageLatest", SIGNED, ZERO_SVB, PREV_TAG8, AmperageAdc, |s| s.amperage_latest),
    #[cfg(feature = "mag")]
    delta_field!(MainState; "magADC"[0], SIGNED, ZERO_SVB, PREV_TAG8, Mag, |s| s.mag_adc[0]),
    #[cfg(feature = "mag")]
    delta_field!(MainState; "magADC"[1], SIGNED, ZERO_SVB, PREV_TAG8, Mag, |s| s.mag_adc[1]),
    #[cfg(feature = "mag")]
    delta_field!(MainState; "magADC"[2], SIGNED, ZERO_SVB, PREV_TAG8, Mag, |s| s.mag_adc[2]),
    #[cfg(feature = "baro")]
    delta_field!(MainState; "BaroAlt", SIGNED, ZERO_SVB, PREV_TAG8, Baro, |s| s.baro_alt),
    #[cfg(feature = "rangefinder")]
    delta_field!(MainState; "surfaceRaw", SIGNED, ZERO_SVB, PREV_TAG8, Rangefinder, |s| s.surface_raw),
    delta_field!(MainState; "rssi", UNSIGNED, ZERO_UVB, PREV_TAG8, Rssi, |s| s.rssi),
    delta_field!(MainState; "gyroADC"[0], SIGNED, ZERO_SVB, AVG_SVB, Always, |s| s.gyro_adc[0]),
    delta_field!(MainState; "gyroADC"[1], SIGNED, ZERO_SVB, AVG_SVB, Always, |s| s.gyro_adc[1]),
    delta_field!(MainState; "gyroADC"[2], SIGNED, ZERO_SVB, AVG_SVB, Always, |s| s.gyro_adc[2]),
    delta_field!(MainState; "accSmooth"[0], SIGNED, ZERO_SVB, AVG_SVB, Acc, |s| s.acc_adc[0]),
    delta_field!(MainState; "accSmooth"[1], SIGNED, ZERO_SVB, AVG_SVB, Acc, |s| s.acc_adc[1]),
    delta_field!(MainState; "accSmooth"[2], SIGNED, ZERO_SVB, AVG_SVB, Acc, |s| s.acc_adc[2]),
    delta_field!(MainState; "motor"[0], UNSIGNED, ZERO_UVB, PREV_SVB, AtLeastMotors1, |s| s.motor[0]),
    delta_field!(MainState; "motor"[1], UNSIGNED, ZERO_UVB, PREV_SVB, AtLeastMotors2, |s| s.motor[1]),
    delta_field!(MainState; "motor"[2], UNSIGNED, ZERO_UVB, PREV_SVB, AtLeastMotors3, |s| s.motor[2]),
    delta_field!(MainState; "motor"[3], UNSIGNED, ZERO_UVB, PREV_SVB, AtLeastMotors4, |s| s.motor[3]),
    delta_field!(MainState; "servo"[0], UNSIGNED, ZERO_UVB, PREV_TAG4, Always, |s| s.servo[0]),
    delta_field!(MainState; "servo"[1], UNSIGNED, ZERO_UVB, PREV_TAG4, Always, |s| s.servo[1]),
    delta_field!(MainState; "servo"[2], UNSIGNED, ZERO_UVB, PREV_TAG4, Always, |s| s.servo[2]),
    delta_field!(MainState; "servo"[3], UNSIGNED, ZERO_UVB, PREV_TAG4, Always, |s| s.servo[3]),
    delta_field!(MainState; "headspeed", UNSIGNED, ZERO_UVB, PREV_SVB, Always, |s| s.headspeed),
    delta_field!(MainState; "debug"[0], SIGNED, ZERO_SVB, AVG_SVB, Debug, |s| s.debug[0]),
    delta_field!(MainState; "debug"[1], SIGNED, ZERO_SVB, AVG_SVB, Debug, |s| s.debug[1]),
    delta_field!(MainState; "debug"[2], SIGNED, ZERO_SVB, AVG_SVB, Debug, |s| s.debug[2]),
    delta_field!(MainState; "debug"[3], SIGNED, ZERO_SVB, AVG_SVB, Debug, |s| s.debug[3]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[0], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[0]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[1], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[1]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[2], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[2]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[3], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[3]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[4], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[4]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[5], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[5]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[6], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[6]),
    #[cfg(feature = "debug32")]
    delta_field!(MainState; "debug32"[7], SIGNED, ZERO_SVB, PREV_SVB, Debug, |s| s.debug32[7]),
];

/// Fields of `G` frames.
pub static GPS_FIELDS: &[FieldDefinition<GpsSolution>] = &[
    // With every iteration logged the preceding main frame already carries the time.
    simple_field!(GpsSolution; "time", UNSIGNED, MAIN_TIME_UVB, NotLoggingEveryFrame, |s| s.time),
    simple_field!(GpsSolution; "GPS_numSat", UNSIGNED, ZERO_UVB, Always, |s| s.num_sat),
    simple_field!(GpsSolution; "GPS_coord"[0], SIGNED, HOME_SVB, Always, |s| s.coord[0]),
    simple_field!(GpsSolution; "GPS_coord"[1], SIGNED, HOME_SVB, Always, |s| s.coord[1]),
    simple_field!(GpsSolution; "GPS_altitude", UNSIGNED, ZERO_UVB, Always, |s| s.alt_cm / 10),
    simple_field!(GpsSolution; "GPS_speed", UNSIGNED, ZERO_UVB, Always, |s| s.ground_speed),
    simple_field!(GpsSolution; "GPS_ground_course", UNSIGNED, ZERO_UVB, Always, |s| s.ground_course),
];

/// Fields of `H` frames.
pub static GPS_HOME_FIELDS: &[FieldDefinition<GpsState>] = &[
    simple_field!(GpsState; "GPS_home"[0], SIGNED, ZERO_SVB, Always, |s| s.home[0]),
    simple_field!(GpsState; "GPS_home"[1], SIGNED, ZERO_SVB, Always, |s| s.home[1]),
];

/// Fields of `S` frames.
pub static SLOW_FIELDS: &[FieldDefinition<SlowState>] = &[
    simple_field!(SlowState; "flightModeFlags", UNSIGNED, ZERO_UVB, Always, |s| s.flight_mode_flags),
    simple_field!(SlowState; "stateFlags", UNSIGNED, ZERO_UVB, Always, |s| s.state_flags),
    simple_field!(SlowState; "failsafePhase", UNSIGNED, ZERO_TAG2, Always, |s| s.failsafe_phase),
    simple_field!(SlowState; "rxSignalReceived", UNSIGNED, ZERO_TAG2, Always, |s| s.rx_signal_received),
    simple_field!(SlowState; "rxFlightChannelsValid", UNSIGNED, ZERO_TAG2, Always, |s| s.rx_flight_channels_valid),
];
