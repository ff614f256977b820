//! Out-of-band log events (`E` frames).

use alloc::vec::Vec;

use crate::encoding::{write_f32, write_signed_vb, write_str, write_unsigned_vb};

/// Added to the adjustment function id when the new value is a float.
pub const INFLIGHT_ADJUSTMENT_FLOAT_FLAG: u8 = 128;

/// Payload written after the `E` marker at the end of a session.
pub const LOG_END_MESSAGE: &str = "End of log\0";

/// New value of an in-flight adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdjustmentValue {
    Int(i32),
    Float(f32),
}

/// An event written to the log as soon as it happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightLogEvent {
    /// The arming beep played at `time` microseconds. Used to line up video.
    SyncBeep { time: u32 },
    /// A tuning value was changed from the transmitter.
    InflightAdjustment { function: u8, value: AdjustmentValue },
    /// Logging resumed after a pause.
    LoggingResume { iteration: u32, time: u32 },
    Disarm { reason: u32 },
    /// Mode activation flags changed.
    FlightMode { flags: u32, last_flags: u32 },
    /// Main motor governor changed state.
    GovernorState { state: u8 },
    LogEnd,
}

impl FlightLogEvent {
    /// Event id byte.
    pub const fn id(&self) -> u8 {
        match self {
            FlightLogEvent::SyncBeep { .. } => 0,
            FlightLogEvent::InflightAdjustment { .. } => 13,
            FlightLogEvent::LoggingResume { .. } => 14,
            FlightLogEvent::Disarm { .. } => 15,
            FlightLogEvent::FlightMode { .. } => 30,
            FlightLogEvent::GovernorState { .. } => 40,
            FlightLogEvent::LogEnd => 255,
        }
    }

    /// Append the complete `E` frame to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(b'E');
        buf.push(self.id());

        match *self {
            FlightLogEvent::SyncBeep { time } => write_unsigned_vb(buf, time),
            FlightLogEvent::InflightAdjustment { function, value } => match value {
                AdjustmentValue::Float(v) => {
                    buf.push(function.wrapping_add(INFLIGHT_ADJUSTMENT_FLOAT_FLAG));
                    write_f32(buf, v);
                }
                AdjustmentValue::Int(v) => {
                    buf.push(function);
                    write_signed_vb(buf, v);
                }
            },
            FlightLogEvent::LoggingResume { iteration, time } => {
                write_unsigned_vb(buf, iteration);
                write_unsigned_vb(buf, time);
            }
            FlightLogEvent::Disarm { reason } => write_unsigned_vb(buf, reason),
            FlightLogEvent::FlightMode { flags, last_flags } => {
                write_unsigned_vb(buf, flags);
                write_unsigned_vb(buf, last_flags);
            }
            FlightLogEvent::GovernorState { state } => write_unsigned_vb(buf, u32::from(state)),
            FlightLogEvent::LogEnd => write_str(buf, LOG_END_MESSAGE),
        }
    }
}
