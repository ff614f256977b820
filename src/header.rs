//! Resumable header emitter.
//!
//! The header is plain text and far larger than what may be written in one
//! control-loop tick, so it is sent in pieces. Each sender takes a cursor,
//! writes as many whole tokens as the [`HeaderSink`] accepts, and returns
//! `Ok(true)` once its part is complete. A token is never split: if the sink
//! refuses a reservation the cursor stays on that token and the call returns
//! `Ok(false)`, to be retried on a later tick.
//!
//! The header consists of, in order:
//!
//! | Part | Sender | Example |
//! |------|--------|---------|
//! | Banner | [`send_banner`] | `H Data version:2` |
//! | Field definitions | [`send_field_definitions`] | `H Field I name:loopIteration,time,...` |
//! | System information | [`send_sysinfo`] | `H looptime:1000` |

use alloc::string::String;
use core::fmt::Write as _;

use crate::Result;
use crate::cadence::FrameIntervals;
use crate::condition::{Condition, ConditionCache};
use crate::config::BlackboxConfig;
use crate::device::{BlackboxDevice, HeaderBudget, Reserve};
use crate::fields::{FieldDefinition, FieldFamily};
use crate::system::{CurrentMeter, SystemConfig};

/// Product banner that opens every log.
pub const BANNER: &str = "H Product:Blackbox flight data recorder by Nicholas Sherlock\nH Data version:2\n";

/// Largest banner piece written per tick.
pub const BANNER_CHUNK: usize = 64;

/// Space reserved before each system information line.
pub const SYSINFO_LINE_RESERVE: usize = 64;

/// Names of the `H Field` lines, in order.
const FIELD_LINE_NAMES: [&str; 6] = [
    "name",
    "signed",
    "predictor",
    "encoding",
    "predictor",
    "encoding",
];

/// Destination for header text.
pub trait HeaderSink {
    /// Ask for room for `bytes` more bytes.
    fn reserve(&mut self, bytes: usize) -> Reserve;

    /// Write bytes that were reserved.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Header sink that charges a [`HeaderBudget`] for everything it writes.
pub struct BudgetedSink<'a, D> {
    device: &'a mut D,
    budget: &'a mut HeaderBudget,
}

impl<'a, D: BlackboxDevice> BudgetedSink<'a, D> {
    pub fn new(device: &'a mut D, budget: &'a mut HeaderBudget) -> Self {
        Self { device, budget }
    }
}

impl<D: BlackboxDevice> HeaderSink for BudgetedSink<'_, D> {
    fn reserve(&mut self, bytes: usize) -> Reserve {
        self.budget.reserve(self.device, bytes)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.device.write(bytes)?;
        self.budget.spend(bytes.len());
        Ok(())
    }
}

/// Send the next piece of the banner. `offset` counts bytes already sent.
pub fn send_banner<K: HeaderSink>(sink: &mut K, offset: &mut usize) -> Result<bool> {
    let rest = BANNER.as_bytes().get(*offset..).unwrap_or_default();
    if rest.is_empty() {
        return Ok(true);
    }
    if sink.reserve(BANNER_CHUNK) != Reserve::Success {
        return Ok(false);
    }
    let chunk = &rest[..rest.len().min(BANNER_CHUNK)];
    sink.write(chunk)?;
    *offset += chunk.len();
    Ok(*offset >= BANNER.len())
}

/// Position inside the field definition lines of one family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldCursor {
    line: usize,
    /// `None` until the `H Field` prefix of the line is written.
    field: Option<usize>,
    need_comma: bool,
}

impl FieldCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Send the `H Field` lines describing `table`.
///
/// Only fields present in `cache` are listed, so the header declares exactly
/// the fields the frame encoder will write for the same cache.
pub fn send_field_definitions<S, K: HeaderSink>(
    sink: &mut K,
    family: FieldFamily,
    table: &[FieldDefinition<S>],
    cache: &ConditionCache,
    cursor: &mut FieldCursor,
) -> Result<bool> {
    let lines = family.header_lines();
    let mut token = String::new();

    while cursor.line < lines {
        let mut index = match cursor.field {
            Some(index) => index,
            None => {
                let frame = match family.delta_char() {
                    Some(delta) if cursor.line >= 4 => delta,
                    _ => family.frame_char(),
                };
                token.clear();
                let _ = write!(
                    token,
                    "H Field {} {}:",
                    frame as char, FIELD_LINE_NAMES[cursor.line]
                );
                if !put(sink, &token)? {
                    return Ok(false);
                }
                cursor.need_comma = false;
                0
            }
        };

        while let Some(def) = table.get(index) {
            if cache.test(def.condition) {
                token.clear();
                if cursor.need_comma {
                    token.push(',');
                }
                write_field_value(&mut token, def, cursor.line);
                if !put(sink, &token)? {
                    cursor.field = Some(index);
                    return Ok(false);
                }
                cursor.need_comma = true;
            }
            index += 1;
        }
        cursor.field = Some(index);

        if !put(sink, "\n")? {
            return Ok(false);
        }
        cursor.line += 1;
        cursor.field = None;
    }

    Ok(true)
}

fn write_field_value<S>(out: &mut String, def: &FieldDefinition<S>, line: usize) {
    let _ = match line {
        0 => write!(out, "{def}"),
        1 => write!(out, "{}", u8::from(def.signed)),
        2 => write!(out, "{}", def.intra.predictor as u8),
        3 => write!(out, "{}", def.intra.encoding as u8),
        4 => write!(out, "{}", def.inter.predictor as u8),
        _ => write!(out, "{}", def.inter.encoding as u8),
    };
}

/// Reserve exactly `text.len()` bytes and write them.
fn put<K: HeaderSink>(sink: &mut K, text: &str) -> Result<bool> {
    if sink.reserve(text.len()) != Reserve::Success {
        return Ok(false);
    }
    sink.write(text.as_bytes())?;
    Ok(true)
}

/// Values shown in the system information lines.
#[derive(Debug, Clone, Copy)]
pub struct SysinfoContext<'a> {
    pub system: &'a SystemConfig,
    pub config: &'a BlackboxConfig,
    pub intervals: FrameIntervals,
    pub cache: &'a ConditionCache,
    /// Battery voltage captured at session start.
    pub vbat_ref: u16,
}

type Applies = fn(&SysinfoContext<'_>) -> bool;
type Format = fn(&SysinfoContext<'_>, &mut String);

/// One `H name:value` line.
struct SysinfoLine {
    name: &'static str,
    applies: Applies,
    value: Format,
}

fn always(_: &SysinfoContext<'_>) -> bool {
    true
}

fn has_vbat(ctx: &SysinfoContext<'_>) -> bool {
    ctx.cache.test(Condition::Vbat)
}

macro_rules! sysinfo {
    ($name:literal if $applies:expr, $fmt:literal, |$c:ident| $($arg:expr),+) => {
        SysinfoLine {
            name: $name,
            applies: $applies,
            value: |$c, out| {
                let _ = write!(out, $fmt, $($arg),+);
            },
        }
    };
    ($name:literal, $fmt:literal, |$c:ident| $($arg:expr),+) => {
        sysinfo!($name if always, $fmt, |$c| $($arg),+)
    };
}

static SYSINFO_LINES: &[SysinfoLine] = &[
    sysinfo!("Firmware type", "{}", |c| c.system.firmware.name),
    sysinfo!("Firmware revision", "{} {} ({}) {}", |c| c.system.firmware.name,
        c.system.firmware.version, c.system.firmware.git_revision, c.system.firmware.target),
    sysinfo!("Firmware date", "{} {}", |c| c.system.firmware.build_date,
        c.system.firmware.build_time),
    sysinfo!("Board information", "{} {}", |c| c.system.firmware.manufacturer_id,
        c.system.firmware.board_name),
    sysinfo!("Log start datetime", "{}", |c| c
        .system
        .start_datetime
        .as_deref()
        .unwrap_or("0000-01-01T00:00:00.000")),
    sysinfo!("Craft name", "{}", |c| c.system.craft_name),
    sysinfo!("I interval", "{}", |c| c.intervals.intra),
    sysinfo!("P interval", "{}", |c| c.intervals.inter),
    sysinfo!("P ratio", "{}", |c| c.config.p_ratio),
    sysinfo!("minthrottle", "{}", |c| c.system.motor.min_throttle),
    sysinfo!("maxthrottle", "{}", |c| c.system.motor.max_throttle),
    sysinfo!("gyro_scale", "0x{:x}", |_c| 1.0f32.to_bits()),
    sysinfo!("acc_1G" if |c| c.system.sensors.acc, "{}", |c| c.system.sensors.acc_1g),
    sysinfo!("vbat_scale" if has_vbat, "{}", |c| c.system.battery.vbat_scale),
    sysinfo!("vbatcellvoltage" if has_vbat, "{},{},{}", |c| c.system.battery.min_cell_voltage,
        c.system.battery.warning_cell_voltage, c.system.battery.max_cell_voltage),
    sysinfo!("vbatref" if has_vbat, "{}", |c| c.vbat_ref),
    sysinfo!("currentSensor" if |c| c.system.battery.current_meter == CurrentMeter::Adc,
        "{},{}", |c| c.system.battery.current_offset, c.system.battery.current_scale),
    sysinfo!("looptime", "{}", |c| c.system.looptime_us),
    sysinfo!("gyro_sync_denom", "{}", |_c| 1),
    sysinfo!("pid_process_denom", "{}", |c| c.system.pid_process_denom),
    sysinfo!("rc_rates", "{},{},{}", |c| c.system.rates.rc_rates[0],
        c.system.rates.rc_rates[1], c.system.rates.rc_rates[2]),
    sysinfo!("rc_expo", "{},{},{}", |c| c.system.rates.rc_expo[0],
        c.system.rates.rc_expo[1], c.system.rates.rc_expo[2]),
    sysinfo!("rates", "{},{},{}", |c| c.system.rates.rates[0],
        c.system.rates.rates[1], c.system.rates.rates[2]),
    sysinfo!("rate_limits", "{},{},{}", |c| c.system.rates.rate_limits[0],
        c.system.rates.rate_limits[1], c.system.rates.rate_limits[2]),
    sysinfo!("rollPID", "{},{},{}", |c| c.system.pid.axis[0].p, c.system.pid.axis[0].i,
        c.system.pid.axis[0].d),
    sysinfo!("pitchPID", "{},{},{}", |c| c.system.pid.axis[1].p, c.system.pid.axis[1].i,
        c.system.pid.axis[1].d),
    sysinfo!("yawPID", "{},{},{}", |c| c.system.pid.axis[2].p, c.system.pid.axis[2].i,
        c.system.pid.axis[2].d),
    sysinfo!("iterm_relax", "{}", |c| c.system.pid.iterm_relax),
    sysinfo!("iterm_relax_type", "{}", |c| c.system.pid.iterm_relax_type),
    sysinfo!("iterm_relax_cutoff", "{}", |c| c.system.pid.iterm_relax_cutoff),
    sysinfo!("feedforward_weight", "{},{},{}", |c| c.system.pid.axis[0].f,
        c.system.pid.axis[1].f, c.system.pid.axis[2].f),
    sysinfo!("ff_boost", "{}", |c| c.system.pid.ff_boost),
    sysinfo!("deadband", "{}", |c| c.system.rx.deadband),
    sysinfo!("yaw_deadband", "{}", |c| c.system.rx.yaw_deadband),
    sysinfo!("gyro_hardware_lpf", "{}", |c| c.system.filters.gyro_hardware_lpf),
    sysinfo!("gyro_lowpass_type", "{}", |c| c.system.filters.gyro_lowpass_type),
    sysinfo!("gyro_lowpass_hz", "{}", |c| c.system.filters.gyro_lowpass_hz),
    sysinfo!("gyro_lowpass2_type", "{}", |c| c.system.filters.gyro_lowpass2_type),
    sysinfo!("gyro_lowpass2_hz", "{}", |c| c.system.filters.gyro_lowpass2_hz),
    sysinfo!("gyro_notch_hz", "{},{}", |c| c.system.filters.gyro_notch_hz[0],
        c.system.filters.gyro_notch_hz[1]),
    sysinfo!("gyro_notch_cutoff", "{},{}", |c| c.system.filters.gyro_notch_cutoff[0],
        c.system.filters.gyro_notch_cutoff[1]),
    sysinfo!("dterm_filter_type", "{}", |c| c.system.filters.dterm_filter_type),
    sysinfo!("dterm_lowpass_hz", "{}", |c| c.system.filters.dterm_lowpass_hz),
    sysinfo!("dterm_filter2_type", "{}", |c| c.system.filters.dterm_filter2_type),
    sysinfo!("dterm_lowpass2_hz", "{}", |c| c.system.filters.dterm_lowpass2_hz),
    sysinfo!("dterm_notch_hz", "{}", |c| c.system.filters.dterm_notch_hz),
    sysinfo!("dterm_notch_cutoff", "{}", |c| c.system.filters.dterm_notch_cutoff),
    sysinfo!("dshot_bidir", "{}", |c| u8::from(c.system.motor.dshot_bidir)),
    sysinfo!("acc_lpf_hz" if |c| c.system.sensors.acc, "{}", |c| c.system.filters.acc_lpf_hz),
    sysinfo!("acc_hardware" if |c| c.system.sensors.acc, "{}", |c| c.system.sensors.acc_hardware),
    #[cfg(feature = "baro")]
    sysinfo!("baro_hardware", "{}", |c| c.system.sensors.baro_hardware),
    #[cfg(feature = "mag")]
    sysinfo!("mag_hardware", "{}", |c| c.system.sensors.mag_hardware),
    sysinfo!("gyro_cal_on_first_arm", "{}", |c| u8::from(c.system.gyro_cal_on_first_arm)),
    sysinfo!("rc_interpolation", "{}", |c| c.system.rx.rc_interpolation),
    sysinfo!("rc_interpolation_interval", "{}", |c| c.system.rx.rc_interpolation_interval),
    sysinfo!("rc_interpolation_channels", "{}", |c| c.system.rx.rc_interpolation_channels),
    sysinfo!("serialrx_provider", "{}", |c| c.system.rx.serialrx_provider),
    sysinfo!("use_unsynced_pwm", "{}", |c| u8::from(c.system.motor.use_unsynced_pwm)),
    sysinfo!("motor_pwm_protocol", "{}", |c| c.system.motor.pwm_protocol),
    sysinfo!("motor_pwm_rate", "{}", |c| c.system.motor.pwm_rate),
    sysinfo!("dshot_idle_value", "{}", |c| c.system.motor.dshot_idle_value),
    sysinfo!("debug_mode", "{}", |c| c.system.debug_mode),
    sysinfo!("features", "{}", |c| c.system.features),
    sysinfo!("rates_type", "{}", |c| c.system.rates.rates_type),
];

/// Send system information lines starting at `line`.
///
/// Lines whose prerequisite does not hold are skipped. A line longer than
/// the sink could ever accept is dropped with a warning.
pub fn send_sysinfo<K: HeaderSink>(
    sink: &mut K,
    ctx: &SysinfoContext<'_>,
    line: &mut usize,
) -> Result<bool> {
    let mut text = String::with_capacity(SYSINFO_LINE_RESERVE);

    while let Some(entry) = SYSINFO_LINES.get(*line) {
        if !(entry.applies)(ctx) {
            *line += 1;
            continue;
        }

        text.clear();
        let _ = write!(text, "H {}:", entry.name);
        (entry.value)(ctx, &mut text);
        text.push('\n');

        match sink.reserve(text.len().max(SYSINFO_LINE_RESERVE)) {
            Reserve::Success => sink.write(text.as_bytes())?,
            Reserve::Temporary => return Ok(false),
            Reserve::Permanent => log::warn!("Header line '{}' too long, skipped", entry.name),
        }
        *line += 1;
    }

    Ok(true)
}
