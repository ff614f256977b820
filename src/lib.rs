#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # blackbox-rs
//!
//! A flight data recorder ("blackbox") for flight controllers.
//!
//! The recorder captures the control loop state every iteration (PID terms, RC
//! commands, gyro and accelerometer samples, motor and servo outputs, battery
//! readings) and streams it to a slow, space-limited device as a compact,
//! self-describing binary log.
//!
//! ## How the log is built
//!
//! - A text header declares every field that will appear in the session,
//!   together with the predictor and encoding used for it.
//! - Intra frames (`I`) carry absolute values so a decoder can resynchronise.
//! - Inter frames (`P`) carry only the difference between each value and a
//!   prediction made from the two previously logged iterations.
//! - Slow (`S`), GPS (`G`, `H`) and event (`E`) frames carry rarely changing
//!   data and out-of-band markers.
//!
//! Which optional fields exist is fixed at session start (see
//! [`ConditionCache`]), so the header and every data frame always agree.
//!
//! ## Quick Start
//!
//! ```no_run
//! use blackbox_rs::{
//!     Blackbox, BlackboxConfig, FlightData, MainState, MemoryDevice, SlowState, SystemConfig,
//! };
//!
//! struct Craft {
//!     system: SystemConfig,
//!     armed: bool,
//! }
//!
//! impl FlightData for Craft {
//!     fn system_config(&self) -> &SystemConfig {
//!         &self.system
//!     }
//!     fn is_armed(&self) -> bool {
//!         self.armed
//!     }
//!     fn load_main(&self, state: &mut MainState) {
//!         state.gyro_adc = [12, -4, 1];
//!     }
//!     fn slow_state(&self) -> SlowState {
//!         SlowState::default()
//!     }
//! }
//!
//! let craft = Craft { system: SystemConfig::default(), armed: true };
//! let mut blackbox = Blackbox::new(
//!     BlackboxConfig::default(),
//!     MemoryDevice::new(1 << 20),
//!     craft.system_config().looptime_us,
//! );
//!
//! for tick in 0..10_000u64 {
//!     blackbox.update(tick * 1000, &craft);
//! }
//! println!("{} bytes logged", blackbox.device().as_slice().len());
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`fields`] | Field catalogs, predictor and encoding ids |
//! | [`condition`] | Session-stable field presence cache |
//! | [`encoding`] | Byte-level wire encoders |
//! | [`history`] | Three-generation history ring |
//! | [`frame`] | Frame encoder for `I`, `P`, `S`, `G`, `H` and `E` frames |
//! | [`header`] | Resumable header emitter |
//! | [`device`] | Device trait and adapters |
//! | [`blackbox`] | The logging state machine |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Cargo features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `std` | yes | File device, JSON configuration loading |
//! | `serde` | with `std` | `Serialize`/`Deserialize` on configuration types |
//! | `gps` | yes | GPS home and position frames |
//! | `mag`, `baro`, `rangefinder` | yes | Optional sensor fields |
//! | `debug32` | no | Eight extra 32-bit debug channels |

extern crate alloc;

pub mod blackbox;
pub mod cadence;
pub mod condition;
pub mod config;
pub mod device;
pub mod encoding;
pub mod error;
pub mod event;
pub mod fields;
pub mod frame;
pub mod header;
pub mod history;
pub mod predictor;
pub mod source;
pub mod state;
pub mod system;

pub use blackbox::{Blackbox, BlackboxState};
pub use cadence::{FrameIntervals, IterationTimers};
pub use condition::{Condition, ConditionCache};
pub use config::{BlackboxConfig, DeviceKind, LoggingMode};
#[cfg(feature = "std")]
pub use device::FileDevice;
pub use device::{BlackboxDevice, HeaderBudget, MemoryDevice, Reserve};
pub use error::{Error, Result};
pub use event::{AdjustmentValue, FlightLogEvent};
pub use fields::{Encoding, FieldCoding, FieldDefinition, Predictor};
pub use frame::FrameEncoder;
pub use history::History;
pub use source::FlightData;
pub use state::{GpsSolution, GpsState, MainState, SlowState};
pub use system::SystemConfig;
