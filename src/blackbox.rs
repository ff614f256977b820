//! The logging state machine.
//!
//! [`Blackbox`] is driven by calling [`Blackbox::update`] once per control
//! loop iteration. Every call does a bounded amount of work and never waits:
//! anything slow (opening a log, sending the header, draining buffers,
//! erasing) is spread across ticks by staying in a state until it completes.
//!
//! ```text
//! Stopped -> PrepareLogFile -> SendHeader -> SendMainFieldHeader
//!     -> [SendGpsHHeader -> SendGpsGHeader] -> SendSlowHeader -> CacheFlush
//!     -> SendSysinfo -> CacheFlush -> Running <-> Paused
//!     -> ShuttingDown -> Stopped
//!
//! Stopped -> StartErase -> Erasing -> Erased -> Stopped
//! ```
//!
//! Write failures never reach the caller. The recorder logs a warning, closes
//! the device and returns to [`BlackboxState::Stopped`]; flight control carries
//! on regardless of logging health.

use log::{debug, info, warn};

use crate::Result;
use crate::cadence::{FrameIntervals, IterationTimers};
use crate::condition::ConditionCache;
use crate::config::{BlackboxConfig, DeviceKind, LoggingMode};
use crate::device::{BlackboxDevice, HeaderBudget};
use crate::event::{AdjustmentValue, FlightLogEvent};
use crate::fields::{FieldFamily, GPS_FIELDS, GPS_HOME_FIELDS, MAIN_FIELDS, SLOW_FIELDS};
use crate::frame::FrameEncoder;
use crate::header::{
    BudgetedSink, FieldCursor, SysinfoContext, send_banner, send_field_definitions, send_sysinfo,
};
use crate::history::History;
use crate::predictor::References;
use crate::source::FlightData;
use crate::state::{GpsState, MainState, SlowState};

/// Delay between entering `SendHeader` and the first banner byte.
const HEADER_START_DELAY_MS: u64 = 100;

/// Longest wait for buffered data before the device is released.
const SHUTDOWN_TIMEOUT_MS: u64 = 200;

/// How long motor-test logging continues after the motors stop.
const MOTOR_TEST_LINGER_MS: u64 = 5000;

/// Recorder lifecycle states.
///
/// The order matters: every state after `Stopped` has the device open, and
/// configuration may only change while the state is at most `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlackboxState {
    Disabled,
    Stopped,
    PrepareLogFile,
    SendHeader,
    SendMainFieldHeader,
    SendGpsHHeader,
    SendGpsGHeader,
    SendSlowHeader,
    SendSysinfo,
    CacheFlush,
    Paused,
    Running,
    ShuttingDown,
    StartErase,
    Erasing,
    Erased,
}

impl BlackboxState {
    /// States that own the device for erasing rather than logging.
    pub const fn is_erase(self) -> bool {
        matches!(
            self,
            BlackboxState::StartErase | BlackboxState::Erasing | BlackboxState::Erased
        )
    }

    /// States in which events are written.
    pub const fn is_logging(self) -> bool {
        matches!(self, BlackboxState::Running | BlackboxState::Paused)
    }
}

/// Per-state progress, valid only in the state that set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transmit {
    Idle,
    Banner { started_ms: u64, offset: usize },
    Fields(FieldCursor),
    Sysinfo { line: usize },
    Flush { next: BlackboxState },
    Shutdown { started_ms: u64 },
}

/// Everything that lives for one logging session.
#[derive(Debug, Default)]
struct Session {
    cache: ConditionCache,
    gps_enabled: bool,
    timers: IterationTimers,
    history: History<MainState>,
    last_slow: SlowState,
    gps: GpsState,
    vbat_ref: u16,
    /// A mode switch can pause logging.
    mode_switch_present: bool,
    last_beep: u32,
    last_flight_mode: u32,
    last_governor: u8,
    logged_any: bool,
}

impl Session {
    fn start<F: FlightData>(config: &BlackboxConfig, src: &F) -> Self {
        let system = src.system_config();
        Self {
            cache: ConditionCache::build(config, system),
            gps_enabled: system.gps_enabled(),
            vbat_ref: src.battery_voltage(),
            mode_switch_present: src.blackbox_mode_configured(),
            last_beep: src.arming_beep_time(),
            last_flight_mode: src.flight_mode_flags(),
            last_governor: src.governor_state(),
            ..Self::default()
        }
    }

    fn references(&self) -> References {
        References {
            vbat: self.vbat_ref,
            home: self.gps.home,
            last_main_frame_time: self.history.previous().time,
        }
    }
}

/// Flight data recorder writing to a [`BlackboxDevice`].
#[derive(Debug)]
pub struct Blackbox<D> {
    config: BlackboxConfig,
    device: D,
    intervals: FrameIntervals,
    state: BlackboxState,
    transmit: Transmit,
    budget: HeaderBudget,
    session: Session,
    encoder: FrameEncoder,
    /// Session was started by a logging mode rather than by arming.
    test_mode: bool,
    motor_test_until_ms: u64,
}

impl<D: BlackboxDevice> Blackbox<D> {
    /// Create a recorder for a control loop running every `looptime_us`.
    ///
    /// With `DeviceKind::None` the recorder stays disabled.
    pub fn new(config: BlackboxConfig, device: D, looptime_us: u32) -> Self {
        let intervals = FrameIntervals::new(looptime_us, config.p_ratio);
        let state = if config.device == DeviceKind::None {
            BlackboxState::Disabled
        } else {
            BlackboxState::Stopped
        };
        debug!(
            "Blackbox intervals: I {} P {} S {}",
            intervals.intra, intervals.inter, intervals.slow
        );
        Self {
            config,
            device,
            intervals,
            state,
            transmit: Transmit::Idle,
            budget: HeaderBudget::new(),
            session: Session::default(),
            encoder: FrameEncoder::new(),
            test_mode: false,
            motor_test_until_ms: 0,
        }
    }

    pub fn state(&self) -> BlackboxState {
        self.state
    }

    pub fn config(&self) -> &BlackboxConfig {
        &self.config
    }

    pub fn intervals(&self) -> &FrameIntervals {
        &self.intervals
    }

    pub fn timers(&self) -> &IterationTimers {
        &self.session.timers
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Whether the configuration may be changed now.
    pub fn may_edit_config(&self) -> bool {
        self.state <= BlackboxState::Stopped
    }

    /// Replace the configuration while no session is active.
    ///
    /// Returns `false`, leaving everything unchanged, while logging.
    pub fn set_config(&mut self, config: BlackboxConfig, looptime_us: u32) -> bool {
        if !self.may_edit_config() {
            return false;
        }
        self.intervals = FrameIntervals::new(looptime_us, config.p_ratio);
        self.state = if config.device == DeviceKind::None {
            BlackboxState::Disabled
        } else {
            BlackboxState::Stopped
        };
        self.config = config;
        true
    }

    /// Intra interval scaled by `num / denom`.
    pub fn p_denom(&self, num: u32, denom: u32) -> u32 {
        self.intervals.p_denom(num, denom)
    }

    /// Iterations between inter frames.
    pub fn rate_denom(&self) -> u32 {
        self.intervals.inter
    }

    /// Advance the recorder by one control loop iteration.
    pub fn update<F: FlightData>(&mut self, now_us: u64, src: &F) {
        let now_ms = now_us / 1000;
        let result = self.step(now_us, src);
        self.check(result, now_ms);

        let full = self.device.is_full();
        if full {
            if self.state > BlackboxState::Stopped && !self.state.is_erase() {
                info!("Blackbox device full, logging stopped");
                self.device.close();
                self.set_state(BlackboxState::Stopped, now_ms);
                self.test_mode = false;
            }
            return;
        }

        match self.config.mode {
            LoggingMode::MotorTest => {
                if self.in_motor_test(now_ms, src) {
                    if self.state == BlackboxState::Stopped {
                        self.start_in_test_mode(now_ms, src);
                    }
                } else if self.state != BlackboxState::Stopped {
                    self.stop_in_test_mode(now_us);
                }
            }
            LoggingMode::AlwaysOn => {
                if self.state == BlackboxState::Stopped {
                    self.start_in_test_mode(now_ms, src);
                }
            }
            LoggingMode::Normal => {}
        }
    }

    /// Begin shutting down the current session.
    ///
    /// A running session gets an end-of-log marker first.
    pub fn finish(&mut self, now_us: u64) {
        let now_ms = now_us / 1000;
        match self.state {
            BlackboxState::Disabled | BlackboxState::Stopped | BlackboxState::ShuttingDown => {}
            BlackboxState::Running | BlackboxState::Paused => {
                let result = self.log_event(FlightLogEvent::LogEnd);
                if self.check(result, now_ms) {
                    self.set_state(BlackboxState::ShuttingDown, now_ms);
                }
            }
            _ => self.set_state(BlackboxState::ShuttingDown, now_ms),
        }
    }

    /// Record the disarm reason and finish the session.
    pub fn disarm(&mut self, reason: u32, now_us: u64) {
        let result = self.log_event(FlightLogEvent::Disarm { reason });
        if self.check(result, now_us / 1000) {
            self.finish(now_us);
        }
    }

    /// Record a tuning change made in flight.
    pub fn log_inflight_adjustment(&mut self, function: u8, value: AdjustmentValue, now_us: u64) {
        let result = self.log_event(FlightLogEvent::InflightAdjustment { function, value });
        self.check(result, now_us / 1000);
    }

    /// Write an event now. Ignored unless a session is logging.
    pub fn log_event(&mut self, event: FlightLogEvent) -> Result<()> {
        if !self.state.is_logging() {
            return Ok(());
        }
        let frame = self.encoder.event(&event);
        self.device.write(frame)
    }

    fn step<F: FlightData>(&mut self, now_us: u64, src: &F) -> Result<()> {
        let now_ms = now_us / 1000;

        match self.state {
            BlackboxState::Disabled => {}
            BlackboxState::Stopped => {
                if src.is_armed() && !self.device.is_full() {
                    self.start(now_ms, src);
                }
                if self.state == BlackboxState::Stopped
                    && src.erase_mode_active()
                    && self.device.supports_erase()
                {
                    self.set_state(BlackboxState::StartErase, now_ms);
                }
            }
            BlackboxState::PrepareLogFile => {
                if self.device.begin_log() {
                    self.set_state(BlackboxState::SendHeader, now_ms);
                }
            }
            BlackboxState::SendHeader => {
                self.budget.replenish(self.device.free_space());
                if let Transmit::Banner { started_ms, offset } = &mut self.transmit {
                    if now_ms > *started_ms + HEADER_START_DELAY_MS {
                        let mut sink = BudgetedSink::new(&mut self.device, &mut self.budget);
                        if send_banner(&mut sink, offset)? {
                            self.set_state(BlackboxState::SendMainFieldHeader, now_ms);
                        }
                    }
                }
            }
            BlackboxState::SendMainFieldHeader
            | BlackboxState::SendGpsHHeader
            | BlackboxState::SendGpsGHeader
            | BlackboxState::SendSlowHeader => {
                if self.send_field_header()? {
                    let state = self.state;
                    match state {
                        BlackboxState::SendMainFieldHeader if self.session.gps_enabled => {
                            self.set_state(BlackboxState::SendGpsHHeader, now_ms)
                        }
                        BlackboxState::SendMainFieldHeader | BlackboxState::SendGpsGHeader => {
                            self.set_state(BlackboxState::SendSlowHeader, now_ms)
                        }
                        BlackboxState::SendGpsHHeader => {
                            self.set_state(BlackboxState::SendGpsGHeader, now_ms)
                        }
                        _ => self.flush_then(BlackboxState::SendSysinfo),
                    }
                }
            }
            BlackboxState::SendSysinfo => {
                self.budget.replenish(self.device.free_space());
                if let Transmit::Sysinfo { line } = &mut self.transmit {
                    let ctx = SysinfoContext {
                        system: src.system_config(),
                        config: &self.config,
                        intervals: self.intervals,
                        cache: &self.session.cache,
                        vbat_ref: self.session.vbat_ref,
                    };
                    let mut sink = BudgetedSink::new(&mut self.device, &mut self.budget);
                    if send_sysinfo(&mut sink, &ctx, line)? {
                        // Headers must reach the medium before data can overrun it.
                        self.flush_then(BlackboxState::Running);
                    }
                }
            }
            BlackboxState::CacheFlush => {
                if let Transmit::Flush { next } = self.transmit {
                    if self.device.flush_force_complete() {
                        self.set_state(next, now_ms);
                    }
                }
            }
            BlackboxState::Paused => {
                // Resume only on an intra iteration so the decoder has a base.
                if src.blackbox_mode_active() && self.session.timers.is_intra() {
                    self.log_event(FlightLogEvent::LoggingResume {
                        iteration: self.session.timers.iteration,
                        time: now_us as u32,
                    })?;
                    self.set_state(BlackboxState::Running, now_ms);
                    self.log_iteration(now_us, src)?;
                }
                self.session.timers.advance(&self.intervals);
            }
            BlackboxState::Running => {
                if self.session.mode_switch_present && !src.blackbox_mode_active() && !self.test_mode
                {
                    self.set_state(BlackboxState::Paused, now_ms);
                } else {
                    self.log_iteration(now_us, src)?;
                }
                self.session.timers.advance(&self.intervals);
            }
            BlackboxState::ShuttingDown => {
                if let Transmit::Shutdown { started_ms } = self.transmit {
                    if self.device.end_log(self.session.logged_any)
                        && (now_ms > started_ms + SHUTDOWN_TIMEOUT_MS || self.device.flush_force())
                    {
                        self.device.close();
                        info!("Blackbox log finished");
                        self.set_state(BlackboxState::Stopped, now_ms);
                    }
                }
            }
            BlackboxState::StartErase => {
                self.device.erase_all();
                info!("Blackbox erase started");
                self.set_state(BlackboxState::Erasing, now_ms);
            }
            BlackboxState::Erasing => {
                if self.device.is_erased() {
                    info!("Blackbox erase complete");
                    self.set_state(BlackboxState::Erased, now_ms);
                }
            }
            BlackboxState::Erased => {
                if !src.erase_mode_active() {
                    self.set_state(BlackboxState::Stopped, now_ms);
                }
            }
        }

        Ok(())
    }

    /// Open the device and begin a new session.
    fn start<F: FlightData>(&mut self, now_ms: u64, src: &F) {
        self.config.validate(D::SUPPORTED);

        if let Err(e) = self.device.open() {
            warn!("Blackbox device unavailable: {e}");
            self.set_state(BlackboxState::Disabled, now_ms);
            return;
        }

        self.session = Session::start(&self.config, src);
        info!(
            "Blackbox session started, conditions {:#x}",
            self.session.cache.bits()
        );
        self.set_state(BlackboxState::PrepareLogFile, now_ms);
    }

    fn start_in_test_mode<F: FlightData>(&mut self, now_ms: u64, src: &F) {
        if !self.test_mode {
            self.start(now_ms, src);
            self.test_mode = true;
        }
    }

    fn stop_in_test_mode(&mut self, now_us: u64) {
        if self.test_mode {
            self.finish(now_us);
            self.test_mode = false;
        }
    }

    /// Disarmed motors spinning, or stopped less than five seconds ago.
    fn in_motor_test<F: FlightData>(&mut self, now_ms: u64, src: &F) -> bool {
        if !src.is_armed() && src.motors_running() {
            self.motor_test_until_ms = now_ms + MOTOR_TEST_LINGER_MS;
            true
        } else {
            now_ms < self.motor_test_until_ms
        }
    }

    /// Send the next piece of the field header for the current state.
    fn send_field_header(&mut self) -> Result<bool> {
        self.budget.replenish(self.device.free_space());
        let Transmit::Fields(cursor) = &mut self.transmit else {
            return Ok(false);
        };
        let cache = &self.session.cache;
        let mut sink = BudgetedSink::new(&mut self.device, &mut self.budget);

        match self.state {
            BlackboxState::SendMainFieldHeader => {
                send_field_definitions(&mut sink, FieldFamily::Main, MAIN_FIELDS, cache, cursor)
            }
            BlackboxState::SendGpsHHeader => send_field_definitions(
                &mut sink,
                FieldFamily::GpsHome,
                GPS_HOME_FIELDS,
                cache,
                cursor,
            ),
            BlackboxState::SendGpsGHeader => {
                send_field_definitions(&mut sink, FieldFamily::Gps, GPS_FIELDS, cache, cursor)
            }
            _ => send_field_definitions(&mut sink, FieldFamily::Slow, SLOW_FIELDS, cache, cursor),
        }
    }

    /// Write the frames due on this iteration.
    fn log_iteration<F: FlightData>(&mut self, now_us: u64, src: &F) -> Result<()> {
        let time = now_us as u32;

        if self.session.timers.is_intra() {
            // Without inter frames every intra frame carries the slow state.
            if self.config.intra_only() {
                self.write_slow(src.slow_state())?;
            }
            self.load_main(time, src);
            let refs = self.session.references();
            let frame = self
                .encoder
                .intra(&self.session.cache, &self.session.history, &refs);
            self.device.write(frame)?;
            self.session.history.rotate_intra();
            self.session.logged_any = true;
        } else {
            self.check_events(src)?;

            if self.session.timers.is_inter(&self.intervals) {
                self.write_slow_if_needed(src)?;
                self.load_main(time, src);
                let refs = self.session.references();
                let frame = self
                    .encoder
                    .inter(&self.session.cache, &self.session.history, &refs);
                self.device.write(frame)?;
                self.session.history.rotate_inter();
                self.session.logged_any = true;
            }

            if self.session.gps_enabled {
                self.log_gps(time, src)?;
            }
        }

        self.device.flush()
    }

    fn load_main<F: FlightData>(&mut self, time: u32, src: &F) {
        let iteration = self.session.timers.iteration;
        let state = self.session.history.current_mut();
        src.load_main(state);
        state.iteration = iteration;
        state.time = time;
    }

    /// Write an `S` frame when the slow state changed or the interval expired.
    fn write_slow_if_needed<F: FlightData>(&mut self, src: &F) -> Result<()> {
        let slow = src.slow_state();
        if !self.session.timers.slow_due(&self.intervals) && slow == self.session.last_slow {
            return Ok(());
        }
        self.write_slow(slow)
    }

    fn write_slow(&mut self, slow: SlowState) -> Result<()> {
        self.session.last_slow = slow;
        let frame = self.encoder.slow(&self.session.cache, &slow);
        self.device.write(frame)?;
        self.session.timers.slow_timer = 0;
        Ok(())
    }

    fn log_gps<F: FlightData>(&mut self, time: u32, src: &F) -> Result<()> {
        let Some(mut solution) = src.gps() else {
            return Ok(());
        };
        solution.time = time;

        let home = src.gps_home();
        if home != self.session.gps.home || self.session.timers.gps_home_due(&self.intervals) {
            self.session.gps.home = home;
            let frame = self.encoder.gps_home(&self.session.cache, &self.session.gps);
            self.device.write(frame)?;
        } else if !self.session.gps.position_changed(&solution) {
            return Ok(());
        }

        let refs = self.session.references();
        let frame = self.encoder.gps(&self.session.cache, &solution, &refs);
        self.device.write(frame)?;
        self.session.gps.record_position(&solution);
        Ok(())
    }

    /// Sync beep, flight mode and governor changes.
    fn check_events<F: FlightData>(&mut self, src: &F) -> Result<()> {
        let beep = src.arming_beep_time();
        if beep != self.session.last_beep {
            self.session.last_beep = beep;
            self.log_event(FlightLogEvent::SyncBeep { time: beep })?;
        }

        let flags = src.flight_mode_flags();
        if flags != self.session.last_flight_mode {
            let last_flags = self.session.last_flight_mode;
            self.session.last_flight_mode = flags;
            self.log_event(FlightLogEvent::FlightMode { flags, last_flags })?;
        }

        let governor = src.governor_state();
        if governor != self.session.last_governor {
            self.session.last_governor = governor;
            self.log_event(FlightLogEvent::GovernorState { state: governor })?;
        }
        Ok(())
    }

    fn flush_then(&mut self, next: BlackboxState) {
        debug!("Blackbox {:?} -> {:?} after flush", self.state, next);
        self.transmit = Transmit::Flush { next };
        self.state = BlackboxState::CacheFlush;
    }

    fn set_state(&mut self, next: BlackboxState, now_ms: u64) {
        self.on_enter(next, now_ms);
        debug!("Blackbox {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Set up what `state` expects on entry.
    fn on_enter(&mut self, state: BlackboxState, now_ms: u64) {
        match state {
            BlackboxState::PrepareLogFile => self.session.logged_any = false,
            BlackboxState::SendHeader => {
                self.budget.reset();
                self.transmit = Transmit::Banner {
                    started_ms: now_ms,
                    offset: 0,
                };
            }
            BlackboxState::SendMainFieldHeader
            | BlackboxState::SendGpsHHeader
            | BlackboxState::SendGpsGHeader
            | BlackboxState::SendSlowHeader => {
                self.transmit = Transmit::Fields(FieldCursor::new());
            }
            BlackboxState::SendSysinfo => self.transmit = Transmit::Sysinfo { line: 0 },
            // Force a slow frame on the first iteration.
            BlackboxState::Running => {
                self.session.timers.force_slow(&self.intervals);
                self.transmit = Transmit::Idle;
            }
            BlackboxState::ShuttingDown => {
                self.transmit = Transmit::Shutdown { started_ms: now_ms };
            }
            _ => self.transmit = Transmit::Idle,
        }
    }

    /// Turn a write failure into a stop. Returns `true` if `result` is `Ok`.
    fn check(&mut self, result: Result<()>, now_ms: u64) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Blackbox write failed in {:?}: {e}", self.state);
                self.device.close();
                self.set_state(BlackboxState::Stopped, now_ms);
                self.test_mode = false;
                false
            }
        }
    }
}
