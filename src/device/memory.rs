//! In-memory logging device.

use alloc::vec::Vec;

use super::{BlackboxDevice, Reserve};
use crate::config::DeviceKind;
use crate::{Error, Result};

/// A device backed by a `Vec<u8>` of fixed capacity.
///
/// Behaves like on-board flash: writes past the capacity are dropped and the
/// device reports full, and the whole storage can be erased. An optional
/// reserve window limits how many bytes one reservation may ask for, which
/// mimics the transmit buffer of a serial logger.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    data: Vec<u8>,
    capacity: usize,
    window: usize,
    available: bool,
    open: bool,
    in_log: bool,
    logs: usize,
    flushes: usize,
}

impl MemoryDevice {
    /// Create a device holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
            window: usize::MAX,
            available: true,
            open: false,
            in_log: false,
            logs: 0,
            flushes: 0,
        }
    }

    /// Limit each reservation to `window` bytes.
    pub fn with_reserve_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Make subsequent `open` calls fail.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Everything written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of logs finalized with `end_log`.
    pub fn log_count(&self) -> usize {
        self.logs
    }

    /// Number of `flush` calls.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.data.len())
    }
}

impl BlackboxDevice for MemoryDevice {
    const SUPPORTED: &'static [DeviceKind] =
        &[DeviceKind::Flash, DeviceKind::SdCard, DeviceKind::Serial];

    fn open(&mut self) -> Result<()> {
        if !self.available {
            return Err(Error::DeviceUnavailable);
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.in_log = false;
    }

    fn begin_log(&mut self) -> bool {
        if self.open {
            self.in_log = true;
        }
        self.in_log
    }

    fn end_log(&mut self, _logged_any_frames: bool) -> bool {
        if self.in_log {
            self.in_log = false;
            self.logs += 1;
        }
        true
    }

    fn reserve_space(&mut self, bytes: usize) -> Reserve {
        if !self.open || bytes > self.capacity {
            Reserve::Permanent
        } else if bytes > self.window || bytes > self.remaining() {
            Reserve::Temporary
        } else {
            Reserve::Success
        }
    }

    fn free_space(&self) -> usize {
        self.remaining().min(self.window)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::WriteError);
        }
        let take = bytes.len().min(self.remaining());
        self.data.extend_from_slice(&bytes[..take]);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn flush_force(&mut self) -> bool {
        true
    }

    fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    fn supports_erase(&self) -> bool {
        true
    }

    fn erase_all(&mut self) {
        self.data.clear();
        self.logs = 0;
    }

    fn is_erased(&self) -> bool {
        self.data.is_empty()
    }
}
