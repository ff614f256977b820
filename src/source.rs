//! Values the recorder reads from the rest of the flight controller.

use crate::state::{GpsSolution, MainState, SlowState};
use crate::system::SystemConfig;

/// Read access to the live flight state.
///
/// The recorder calls these once per tick from [`Blackbox::update`]. Only the
/// first four methods are required; the rest default to a craft without GPS,
/// without a governor and without mode switches.
///
/// [`Blackbox::update`]: crate::Blackbox::update
pub trait FlightData {
    /// Configuration read when a session starts.
    fn system_config(&self) -> &SystemConfig;

    fn is_armed(&self) -> bool;

    /// Fill the per-iteration values.
    ///
    /// `iteration` and `time` are set by the recorder after this returns.
    fn load_main(&self, state: &mut MainState);

    fn slow_state(&self) -> SlowState;

    /// Current GPS fix, if a receiver is attached.
    fn gps(&self) -> Option<GpsSolution> {
        None
    }

    /// GPS home coordinate (latitude, longitude).
    fn gps_home(&self) -> [i32; 2] {
        [0, 0]
    }

    /// Active flight mode flags, compared each tick to detect mode changes.
    fn flight_mode_flags(&self) -> u32 {
        0
    }

    fn governor_state(&self) -> u8 {
        0
    }

    /// Time of the last arming beep in microseconds, 0 if none.
    fn arming_beep_time(&self) -> u32 {
        0
    }

    /// Battery voltage in units of 0.01 V.
    fn battery_voltage(&self) -> u16 {
        0
    }

    /// Whether a mode switch controls logging.
    fn blackbox_mode_configured(&self) -> bool {
        false
    }

    /// State of the logging mode switch.
    fn blackbox_mode_active(&self) -> bool {
        true
    }

    /// State of the erase mode switch.
    fn erase_mode_active(&self) -> bool {
        false
    }

    /// Motors spinning while disarmed, as in a motor test.
    fn motors_running(&self) -> bool {
        false
    }
}
