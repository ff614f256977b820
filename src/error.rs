//! Error types for blackbox operations.
//!
//! This module defines the [`Error`] enum which represents the failures that
//! can occur while opening a logging device, writing frames or loading
//! configuration.
//!
//! The logging state machine never hands these errors to the flight loop:
//! [`Blackbox::update`](crate::Blackbox::update) logs them and falls back to
//! "not logging". They surface directly only from device adapters and the
//! configuration loaders.

use core::fmt;

use alloc::string::String;

/// Errors that can occur during blackbox operations.
#[derive(Debug)]
pub enum Error {
    /// The logging device could not be opened.
    DeviceUnavailable,

    /// The device refused a write.
    ///
    /// Raised by adapters that have no richer error to report.
    WriteError,

    /// An I/O error occurred while writing to a file-backed device.
    ///
    /// Only available with the `std` feature.
    #[cfg(feature = "std")]
    IOError(std::io::Error),

    /// A configuration value is outside the range the recorder supports.
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    ///
    /// Only available with the `std` feature.
    #[cfg(feature = "std")]
    ConfigParse(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DeviceUnavailable => write!(f, "Blackbox device could not be opened"),
            Error::WriteError => write!(f, "Write error"),
            #[cfg(feature = "std")]
            Error::IOError(e) => write!(f, "I/O error: {e}"),
            Error::InvalidConfig(s) => write!(f, "Invalid configuration: {s}"),
            #[cfg(feature = "std")]
            Error::ConfigParse(e) => write!(f, "Configuration parse error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IOError(e) => Some(e),
            Error::ConfigParse(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err)
    }
}

#[cfg(feature = "std")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse(err)
    }
}

/// A specialized Result type for blackbox operations.
pub type Result<T> = core::result::Result<T, Error>;
