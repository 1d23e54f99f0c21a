//! Stop-and-wait upload of settings to a device.
//!
//! The host writes a 2-byte little-endian record count, then each 7-byte
//! record in order. After every record the device answers with a single
//! acknowledgement byte: [`ACK_OK`] means the record was applied, anything
//! else aborts the transfer.
//!
//! ```text
//! host                      device
//!  | -- count (2 bytes) ------> |
//!  | -- record 1 (7 bytes) ---> |
//!  | <-------------- ack 0x00 - |
//!  | -- record 2 (7 bytes) ---> |
//!  | <-------------- ack 0x00 - |
//!  ...
//! ```
//!
//! Each record gets exactly one write and one ack read. There are no
//! retries; a bad or missing ack ends the transfer.
//!
//! # Example
//!
//! ```no_run
//! use bq_settings::{Setting, Transfer};
//! use std::net::TcpStream;
//!
//! let link = TcpStream::connect("192.168.1.50:7000")?;
//! let mut transfer = Transfer::new(link);
//!
//! let settings = vec![Setting::ram(2, 0x9235, 3500)?];
//! let report = transfer.send(&settings)?;
//! assert_eq!(report.sent, 1);
//! # Ok::<(), bq_settings::SettingsError>(())
//! ```

use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{Result, SettingsError};
use crate::format::{encode_count, Format, COUNT_SIZE};
use crate::pipeline::load;
use crate::setting::{Setting, SETTING_SIZE};
use crate::utils::format_bytes;

/// Acknowledgement byte for an applied record.
pub const ACK_OK: u8 = 0x00;

/// Options for a [`Transfer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferConfig {
    /// Wait for an acknowledgement after the count preamble too.
    ///
    /// Off by default. Some firmware acknowledges the count before it
    /// expects the first record.
    pub ack_count: bool,
}

impl TransferConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the acknowledgement of the count preamble.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::TransferConfig;
    ///
    /// let config = TransferConfig::new().with_count_ack(true);
    /// assert!(config.ack_count);
    /// ```
    pub fn with_count_ack(mut self, ack_count: bool) -> Self {
        self.ack_count = ack_count;
        self
    }
}

/// Outcome of a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Records acknowledged by the device.
    pub sent: usize,
    /// Bytes written to the link, including the count.
    pub bytes_written: usize,
}

/// Stop-and-wait sender over any byte link.
///
/// The link is usually a serial port (see `SerialTransport` with the
/// `serialport` feature) but anything that is `Read + Write` works. Read
/// timeouts are the link's business; a timed out ack read is reported as
/// `SettingsError::ShortResponse`.
#[derive(Debug)]
pub struct Transfer<L> {
    link: L,
    config: TransferConfig,
}

impl<L: Read + Write> Transfer<L> {
    /// Creates a sender with the default configuration.
    pub fn new(link: L) -> Self {
        Self::with_config(link, TransferConfig::default())
    }

    /// Creates a sender with an explicit configuration.
    pub fn with_config(link: L, config: TransferConfig) -> Self {
        Self { link, config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> TransferConfig {
        self.config
    }

    /// Returns the link back.
    pub fn into_inner(self) -> L {
        self.link
    }

    /// Sends all settings in order.
    ///
    /// # Errors
    ///
    /// - `SettingsError::TooManySettings` if the count does not fit in 16 bits
    ///   (nothing is written)
    /// - `SettingsError::Protocol` if the device rejects a record; `record`
    ///   is 1-based, 0 being the count preamble
    /// - `SettingsError::ShortResponse` if an ack never arrives
    /// - `SettingsError::Io` for any other link failure
    ///
    /// No record after a failed one is written.
    pub fn send(&mut self, settings: &[Setting]) -> Result<TransferReport> {
        let count = encode_count(settings.len())?;

        log::info!("sending {} settings", settings.len());
        self.link.write_all(&count)?;
        self.link.flush()?;
        if self.config.ack_count {
            self.wait_ack(0)?;
        }

        for (index, setting) in settings.iter().enumerate() {
            let record = index + 1;
            let bytes = setting.to_bytes();
            log::debug!("record {}: {} ({})", record, format_bytes(&bytes), setting);

            self.link.write_all(&bytes)?;
            self.link.flush()?;
            self.wait_ack(record)?;
        }

        log::info!("transfer complete");
        Ok(TransferReport {
            sent: settings.len(),
            bytes_written: COUNT_SIZE + settings.len() * SETTING_SIZE,
        })
    }

    fn wait_ack(&mut self, record: usize) -> Result<()> {
        let mut ack = [0u8; 1];
        match self.link.read_exact(&mut ack) {
            Ok(()) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::UnexpectedEof | ErrorKind::TimedOut | ErrorKind::WouldBlock
                ) =>
            {
                log::error!("record {}: no acknowledgement", record);
                return Err(SettingsError::ShortResponse { record });
            }
            Err(e) => return Err(SettingsError::Io(e)),
        }

        if ack[0] != ACK_OK {
            log::error!("record {}: device answered {:#04x}", record, ack[0]);
            return Err(SettingsError::Protocol {
                record,
                ack: ack[0],
            });
        }
        Ok(())
    }
}

/// Loads a settings file and sends it over `link`.
///
/// The file format is taken from its name with [`Format::detect_upload`], so
/// `.bin` output of a conversion is sent as is.
pub fn transfer_file<L: Read + Write>(path: impl AsRef<Path>, link: L) -> Result<TransferReport> {
    let path = path.as_ref();
    let settings = load(path, Format::detect_upload(path))?;
    Transfer::new(link).send(&settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::SettingKind;
    use std::collections::VecDeque;
    use std::io;

    /// In-memory device: records every write and serves queued ack bytes.
    #[derive(Default)]
    struct StubLink {
        writes: Vec<Vec<u8>>,
        acks: VecDeque<u8>,
    }

    impl StubLink {
        fn with_acks(acks: &[u8]) -> Self {
            Self {
                writes: Vec::new(),
                acks: acks.iter().copied().collect(),
            }
        }
    }

    impl Read for StubLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.acks.pop_front() {
                Some(ack) if !buf.is_empty() => {
                    buf[0] = ack;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    impl Write for StubLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Link whose reads always time out.
    struct SilentLink;

    impl Read for SilentLink {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::TimedOut, "timed out"))
        }
    }

    impl Write for SilentLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn settings() -> Vec<Setting> {
        vec![
            Setting::ram(2, 0x9235, 3500).unwrap(),
            Setting::new(SettingKind::Subcommand, 0, 0x0093, 0).unwrap(),
            Setting::new(SettingKind::Direct, 1, 0x61, 0x05).unwrap(),
        ]
    }

    #[test]
    fn test_send_all_acked() {
        let mut transfer = Transfer::new(StubLink::with_acks(&[0, 0, 0]));
        let report = transfer.send(&settings()).unwrap();
        assert_eq!(report.sent, 3);
        assert_eq!(report.bytes_written, 23);

        let link = transfer.into_inner();
        assert_eq!(link.writes.len(), 4);
        assert_eq!(link.writes[0], vec![0x03, 0x00]);
        for (write, setting) in link.writes[1..].iter().zip(settings()) {
            assert_eq!(write.as_slice(), &setting.to_bytes());
        }
        assert!(link.acks.is_empty());
    }

    #[test]
    fn test_send_stops_on_nack() {
        let mut transfer = Transfer::new(StubLink::with_acks(&[0x00, 0x01, 0x00]));
        let err = transfer.send(&settings()).unwrap_err();
        assert!(matches!(err, SettingsError::Protocol { record: 2, ack: 0x01 }));

        // count and two records, the third is never written
        let link = transfer.into_inner();
        assert_eq!(link.writes.len(), 3);
        assert_eq!(link.acks.len(), 1);
    }

    #[test]
    fn test_send_missing_ack() {
        let mut transfer = Transfer::new(StubLink::with_acks(&[0x00]));
        let err = transfer.send(&settings()).unwrap_err();
        assert!(matches!(err, SettingsError::ShortResponse { record: 2 }));
    }

    #[test]
    fn test_send_timeout() {
        let mut transfer = Transfer::new(SilentLink);
        let err = transfer.send(&settings()).unwrap_err();
        assert!(matches!(err, SettingsError::ShortResponse { record: 1 }));
    }

    #[test]
    fn test_send_empty() {
        let mut transfer = Transfer::new(StubLink::default());
        let report = transfer.send(&[]).unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(transfer.into_inner().writes, vec![vec![0x00, 0x00]]);
    }

    #[test]
    fn test_send_with_count_ack() {
        let config = TransferConfig::new().with_count_ack(true);
        let mut transfer = Transfer::with_config(StubLink::with_acks(&[0, 0, 0, 0]), config);
        assert_eq!(transfer.send(&settings()).unwrap().sent, 3);
        assert!(transfer.into_inner().acks.is_empty());
    }

    #[test]
    fn test_send_count_rejected() {
        let config = TransferConfig::new().with_count_ack(true);
        let mut transfer = Transfer::with_config(StubLink::with_acks(&[0x7F]), config);
        let err = transfer.send(&settings()).unwrap_err();
        assert!(matches!(err, SettingsError::Protocol { record: 0, ack: 0x7F }));
        assert_eq!(transfer.into_inner().writes.len(), 1);
    }

    #[test]
    fn test_send_too_many_settings() {
        let setting = Setting::ram(1, 0x9234, 0).unwrap();
        let settings = vec![setting; usize::from(u16::MAX) + 1];

        let mut transfer = Transfer::new(StubLink::default());
        let err = transfer.send(&settings).unwrap_err();
        assert!(matches!(err, SettingsError::TooManySettings { count: 65536 }));
        assert!(transfer.into_inner().writes.is_empty());
    }

    #[test]
    fn test_transfer_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bms.csv");
        std::fs::write(&path, "RAM,2,0x9235,3500\nDirect,1,0x61,5\n").unwrap();

        let report = transfer_file(&path, StubLink::with_acks(&[0, 0])).unwrap();
        assert_eq!(report.sent, 2);
    }

    #[test]
    fn test_transfer_converted_binary_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = dir.path().join("bms.csv");
        let bin = dir.path().join("bms.bin");
        std::fs::write(&csv, "RAM,2,0x9235,3500\nDirect,1,0x61,5\n").unwrap();
        crate::convert(&csv, &bin, crate::Target::Binary).unwrap();

        let mut link = StubLink::with_acks(&[0, 0]);
        let report = transfer_file(&bin, &mut link).unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(link.writes[0], vec![0x02, 0x00]);
        assert_eq!(
            link.writes[1].as_slice(),
            &Setting::ram(2, 0x9235, 3500).unwrap().to_bytes()
        );
    }
}
