//! Logging devices.
//!
//! This module provides the [`BlackboxDevice`] trait the recorder writes
//! through, the [`HeaderBudget`] that paces header transmission, and two
//! implementations:
//!
//! - [`MemoryDevice`]: in-memory storage, available without `std`
//! - [`FileDevice`]: numbered log files in a directory, requires `std`

mod memory;

#[cfg(feature = "std")]
mod file;

pub use memory::MemoryDevice;

#[cfg(feature = "std")]
pub use file::FileDevice;

use crate::Result;
use crate::config::DeviceKind;

/// Outcome of a space reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserve {
    /// The bytes can be written now.
    Success,
    /// Not now; retry on a later tick.
    Temporary,
    /// The request can never be satisfied.
    Permanent,
}

/// A destination for log data.
///
/// Implementations must never block: every call returns immediately and
/// anything that takes time is polled through `begin_log`, `end_log`,
/// `flush_force` and `is_erased`.
pub trait BlackboxDevice {
    /// Device kinds this implementation can stand in for.
    const SUPPORTED: &'static [DeviceKind];

    /// Acquire the device for a session.
    fn open(&mut self) -> Result<()>;

    /// Release the device.
    fn close(&mut self);

    /// Prepare a new log. Returns `true` once ready.
    fn begin_log(&mut self) -> bool;

    /// Finish the current log. Returns `true` once the log is finalized.
    fn end_log(&mut self, logged_any_frames: bool) -> bool;

    /// Check that `bytes` can be written without loss.
    fn reserve_space(&mut self, bytes: usize) -> Reserve;

    /// Bytes that can currently be buffered, used to cap the header budget.
    fn free_space(&self) -> usize {
        usize::MAX
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push buffered bytes toward the medium without waiting.
    fn flush(&mut self) -> Result<()>;

    /// Attempt to drain every buffer. Returns `true` when nothing is pending.
    fn flush_force(&mut self) -> bool;

    /// Like [`flush_force`](Self::flush_force) but also waits for the medium
    /// to acknowledge the data.
    fn flush_force_complete(&mut self) -> bool {
        self.flush_force()
    }

    /// The device cannot take any more data.
    fn is_full(&self) -> bool;

    fn supports_erase(&self) -> bool {
        false
    }

    /// Start erasing all logs.
    fn erase_all(&mut self) {}

    fn is_erased(&self) -> bool {
        true
    }
}

/// Byte budget for header transmission.
///
/// Headers are sent a few dozen bytes per tick so that a slow serial link is
/// not overrun. The budget grows by [`PER_ITERATION`](Self::PER_ITERATION)
/// bytes per tick up to [`MAX_ACCUMULATED`](Self::MAX_ACCUMULATED) and is
/// never larger than what the device can buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderBudget {
    available: usize,
}

impl HeaderBudget {
    pub const PER_ITERATION: usize = 64;
    pub const MAX_ACCUMULATED: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.available
    }

    pub fn reset(&mut self) {
        self.available = 0;
    }

    /// Add one tick's worth of budget.
    pub fn replenish(&mut self, free_space: usize) {
        self.available = (self.available + Self::PER_ITERATION)
            .min(Self::MAX_ACCUMULATED)
            .min(free_space);
    }

    /// Reserve `bytes` from both the budget and the device.
    pub fn reserve<D: BlackboxDevice>(&self, device: &mut D, bytes: usize) -> Reserve {
        if bytes > Self::MAX_ACCUMULATED {
            return Reserve::Permanent;
        }
        if bytes > self.available {
            return Reserve::Temporary;
        }
        device.reserve_space(bytes)
    }

    /// Account for bytes written.
    #[inline]
    pub fn spend(&mut self, bytes: usize) {
        self.available = self.available.saturating_sub(bytes);
    }
}
