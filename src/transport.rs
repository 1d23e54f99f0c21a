//! Serial transport for settings uploads.
//!
//! This module provides [`SerialTransport`], a thin wrapper around a
//! [`serialport`] handle that implements `Read + Write` so it can drive a
//! [`Transfer`](crate::Transfer). It knows nothing about settings; it only
//! opens the port and moves bytes.
//!
//! Enabled with the `serialport` feature.
//!
//! # Example
//!
//! ```no_run
//! use bq_settings::{SerialConfig, SerialTransport, Transfer};
//!
//! let config = SerialConfig::new("/dev/ttyUSB0").with_baud_rate(115_200);
//! let port = SerialTransport::open(&config)?;
//! let mut transfer = Transfer::new(port);
//! # Ok::<(), bq_settings::SettingsError>(())
//! ```

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::Result;

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read/write timeout. An ack that takes longer counts as missing.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read/write timeout.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Creates a configuration with the default baud rate and timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::SerialConfig;
    ///
    /// let config = SerialConfig::new("COM3");
    /// assert_eq!(config.baud_rate, 9600);
    /// ```
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the baud rate (default is 9600).
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Sets the timeout (default is 2 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An open serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Opens the port described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Io` if the port cannot be opened or configured.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(io::Error::from)?;

        log::debug!("opened {} at {} baud", config.port, config.baud_rate);
        Ok(Self { port })
    }

    /// Returns the port name, if the driver knows it.
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.port.name())
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}
