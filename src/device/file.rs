//! File-backed logging device.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{BlackboxDevice, Reserve};
use crate::config::DeviceKind;
use crate::{Error, Result};

/// Writes each session to a new numbered file (`LOG00001.BFL`, ...) in a
/// directory, the way an SD card logger does.
///
/// Stands in for [`DeviceKind::SdCard`]. A `Serial` selection is kept as is;
/// any other device is downgraded to `Serial` when a session starts.
pub struct FileDevice {
    dir: PathBuf,
    max_size: Option<u64>,
    writer: Option<BufWriter<File>>,
    current: Option<PathBuf>,
    written: u64,
}

impl FileDevice {
    /// Log into `dir`, which is created on `open` if missing.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            max_size: None,
            writer: None,
            current: None,
            written: 0,
        }
    }

    /// Report the device full once a log reaches `bytes`.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    /// Path of the log being written, or of the last one.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn next_log_path(&self) -> Result<PathBuf> {
        let mut highest = 0u32;
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(number) = name
                .strip_prefix("LOG")
                .and_then(|rest| rest.strip_suffix(".BFL"))
                .and_then(|n| n.parse::<u32>().ok())
            {
                highest = highest.max(number);
            }
        }
        Ok(self.dir.join(format!("LOG{:05}.BFL", highest + 1)))
    }

    fn create_log(&mut self) -> Result<()> {
        let path = self.next_log_path()?;
        let file = File::create(&path)?;
        log::info!("Blackbox logging to {}", path.display());
        self.writer = Some(BufWriter::new(file));
        self.current = Some(path);
        self.written = 0;
        Ok(())
    }
}

impl BlackboxDevice for FileDevice {
    const SUPPORTED: &'static [DeviceKind] = &[DeviceKind::SdCard];

    fn open(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                log::warn!("Blackbox file flush on close failed: {e}");
            }
        }
    }

    fn begin_log(&mut self) -> bool {
        if self.writer.is_some() {
            return true;
        }
        match self.create_log() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Blackbox could not create log file: {e}");
                false
            }
        }
    }

    fn end_log(&mut self, logged_any_frames: bool) -> bool {
        let Some(mut writer) = self.writer.take() else {
            return true;
        };
        if let Err(e) = writer.flush() {
            log::warn!("Blackbox file flush failed: {e}");
        }
        drop(writer);

        // A log with only a header is of no use to anyone.
        if !logged_any_frames {
            if let Some(path) = &self.current {
                if let Err(e) = fs::remove_file(path) {
                    log::debug!("Could not remove empty log {}: {e}", path.display());
                }
            }
        }
        true
    }

    fn reserve_space(&mut self, bytes: usize) -> Reserve {
        match self.max_size {
            _ if self.writer.is_none() => Reserve::Temporary,
            Some(max) if self.written + bytes as u64 > max => Reserve::Permanent,
            _ => Reserve::Success,
        }
    }

    /// Bytes past the size limit are dropped; the recorder stops once
    /// `is_full` reports it.
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::WriteError)?;
        let take = match self.max_size {
            Some(max) => (max.saturating_sub(self.written)).min(bytes.len() as u64) as usize,
            None => bytes.len(),
        };
        writer.write_all(&bytes[..take])?;
        self.written += take as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn flush_force(&mut self) -> bool {
        self.flush().is_ok()
    }

    fn is_full(&self) -> bool {
        self.writer.is_some() && self.max_size.is_some_and(|max| self.written >= max)
    }
}
