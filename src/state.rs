//! Snapshots of the values written to the log.

/// Roll, pitch and yaw.
pub const AXIS_COUNT: usize = 3;
/// Motor outputs carried in every main frame.
pub const MOTOR_COUNT: usize = 4;
/// Servo outputs carried in every main frame.
pub const SERVO_COUNT: usize = 4;
pub const DEBUG16_COUNT: usize = 4;
pub const DEBUG32_COUNT: usize = 8;

/// Everything logged in one main (`I` or `P`) frame.
///
/// [`FlightData::load_main`](crate::FlightData::load_main) fills the flight
/// values. `iteration` and `time` belong to the recorder and are overwritten
/// after the source has loaded the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MainState {
    pub iteration: u32,
    /// Microseconds since boot, wrapping.
    pub time: u32,

    pub axis_p: [i32; AXIS_COUNT],
    pub axis_i: [i32; AXIS_COUNT],
    pub axis_d: [i32; AXIS_COUNT],
    pub axis_f: [i32; AXIS_COUNT],

    /// Roll, pitch, yaw, throttle, collective.
    pub rc_command: [i16; 5],
    /// Roll, pitch and yaw setpoints, then mixer throttle.
    pub setpoint: [i16; 4],
    pub gyro_adc: [i16; AXIS_COUNT],
    pub acc_adc: [i16; AXIS_COUNT],

    pub motor: [u16; MOTOR_COUNT],
    pub servo: [u16; SERVO_COUNT],

    /// Battery voltage in 0.01 V.
    pub vbat_latest: u16,
    /// Battery current in 0.01 A.
    pub amperage_latest: i32,

    pub baro_alt: i32,
    pub mag_adc: [i16; AXIS_COUNT],
    pub surface_raw: i32,
    pub rssi: u16,
    pub headspeed: u16,

    pub debug: [i16; DEBUG16_COUNT],
    pub debug32: [i32; DEBUG32_COUNT],
}

/// Rarely changing values, written as `S` frames.
///
/// A new frame is written whenever any member differs from the last one
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlowState {
    pub flight_mode_flags: u32,
    pub state_flags: u8,
    pub failsafe_phase: u8,
    pub rx_signal_received: bool,
    pub rx_flight_channels_valid: bool,
}

/// Latest GPS fix as reported by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsSolution {
    /// Frame time, set by the recorder.
    pub time: u32,
    pub num_sat: u8,
    /// Latitude and longitude in 1e-7 degrees.
    pub coord: [i32; 2],
    /// Altitude in centimetres.
    pub alt_cm: i32,
    /// Ground speed in cm/s.
    pub ground_speed: u16,
    /// Course over ground in 0.1 degrees.
    pub ground_course: u16,
}

/// GPS values last written to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsState {
    pub home: [i32; 2],
    pub coord: [i32; 2],
    pub num_sat: u8,
}

impl GpsState {
    /// Whether `solution` moved or changed satellite count since the last `G` frame.
    pub fn position_changed(&self, solution: &GpsSolution) -> bool {
        self.num_sat != solution.num_sat || self.coord != solution.coord
    }

    /// Remember a written `G` frame.
    pub fn record_position(&mut self, solution: &GpsSolution) {
        self.num_sat = solution.num_sat;
        self.coord = solution.coord;
    }
}
