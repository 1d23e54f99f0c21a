//! Readers and writers for the three settings representations.
//!
//! | Format | Direction | Layout |
//! |--------|-----------|--------|
//! | [`Format::Ti`] | read | TI export, one field per row (see [`crate::ti`]) |
//! | [`Format::Csv`] | read/write | `* Setting Type,...` header, then `Kind,Width,0xAddr,Data` |
//! | [`Format::Binary`] | read/write | Back-to-back 7-byte records, no header |
//!
//! The firmware's EEPROM image (a 2-byte little-endian count followed by the
//! records) is produced by [`encode_image`] and read back by [`decode_image`].
//!
//! # Example
//!
//! ```
//! use bq_settings::format::{read_settings, write_settings, Format, LoadOptions};
//!
//! let csv = "* Setting Type,Number of Bytes,Address,Data\nRAM,2,0x9235,3500\n";
//! let loaded = read_settings(csv.as_bytes(), Format::Csv, &LoadOptions::default()).unwrap();
//! assert_eq!(loaded.settings.len(), 1);
//!
//! let mut binary = Vec::new();
//! write_settings(&mut binary, Format::Binary, &loaded.settings).unwrap();
//! assert_eq!(binary.len(), 7);
//! ```

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::error::{Result, SettingsError};
use crate::setting::{Setting, CSV_HEADER, SETTING_SIZE};
use crate::ti::parse_ti_line;
use crate::utils::is_skippable;

/// File name suffix that marks a TI export.
pub const TI_SUFFIX: &str = ".gg.csv";

/// File name suffix of binary settings files.
pub const BINARY_SUFFIX: &str = ".bin";

/// Size of the count preamble in bytes.
pub const COUNT_SIZE: usize = 2;

/// Settings file representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// TI settings export (input only).
    Ti,
    /// Intermediate CSV.
    Csv,
    /// Binary wire format.
    Binary,
}

impl Format {
    /// Selects the text format of an input file from its name.
    ///
    /// Paths ending in `.gg.csv` are TI exports; every other path is treated
    /// as intermediate CSV.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::Format;
    ///
    /// assert_eq!(Format::detect("bq76952.gg.csv"), Format::Ti);
    /// assert_eq!(Format::detect("bq76952.csv"), Format::Csv);
    /// ```
    pub fn detect(path: impl AsRef<Path>) -> Self {
        let is_ti = path
            .as_ref()
            .to_str()
            .map(|name| name.ends_with(TI_SUFFIX))
            .unwrap_or(false);

        if is_ti {
            Format::Ti
        } else {
            Format::Csv
        }
    }

    /// Selects the format of a file about to be sent to a device.
    ///
    /// Like [`Format::detect`], except that paths ending in `.bin` are read
    /// as binary, the usual output of a conversion.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::Format;
    ///
    /// assert_eq!(Format::detect_upload("bq76952.bin"), Format::Binary);
    /// assert_eq!(Format::detect_upload("bq76952.gg.csv"), Format::Ti);
    /// assert_eq!(Format::detect_upload("bq76952.csv"), Format::Csv);
    /// ```
    pub fn detect_upload(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let is_binary = path
            .to_str()
            .map(|name| name.ends_with(BINARY_SUFFIX))
            .unwrap_or(false);

        if is_binary {
            Format::Binary
        } else {
            Format::detect(path)
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Ti => write!(f, "TI"),
            Format::Csv => write!(f, "CSV"),
            Format::Binary => write!(f, "binary"),
        }
    }
}

/// What to do when a line fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first bad line.
    #[default]
    Abort,
    /// Record the error, skip the line and keep reading.
    Continue,
}

/// Options for reading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Handling of malformed lines.
    pub policy: ErrorPolicy,
}

impl LoadOptions {
    /// Creates options with the default (abort) policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the error policy.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::format::{ErrorPolicy, LoadOptions};
    ///
    /// let options = LoadOptions::new().with_policy(ErrorPolicy::Continue);
    /// assert_eq!(options.policy, ErrorPolicy::Continue);
    /// ```
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Result of reading a settings source.
///
/// `settings` holds every record parsed successfully, in input order. Under
/// [`ErrorPolicy::Abort`] it stops just before the first bad line and
/// `errors` holds that one failure.
#[derive(Debug, Default)]
pub struct Loaded {
    /// Parsed settings in input order.
    pub settings: Vec<Setting>,
    /// Line-level failures, each a [`SettingsError::Parse`].
    pub errors: Vec<SettingsError>,
}

impl Loaded {
    /// Returns whether every line parsed.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the settings, or the first error if any line failed.
    pub fn into_result(self) -> Result<Vec<Setting>> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.settings),
        }
    }

    fn push(&mut self, line: usize, parsed: Result<Setting>, policy: ErrorPolicy) -> bool {
        match parsed {
            Ok(setting) => {
                log::debug!("line {}: {}", line, setting);
                self.settings.push(setting);
                true
            }
            Err(err) => {
                let err = SettingsError::parse(line, err);
                let keep_going = policy == ErrorPolicy::Continue;
                if keep_going {
                    log::warn!("skipping {}", err);
                }
                self.errors.push(err);
                keep_going
            }
        }
    }
}

/// Reads all settings from a source in the given format.
///
/// Text formats skip blank lines and `*` comment lines. For binary input the
/// reported "line" of an error is the 1-based record number.
///
/// # Errors
///
/// Read failures are returned as `SettingsError::Io` regardless of policy.
/// Parse failures are reported through [`Loaded::errors`].
pub fn read_settings<R: Read>(
    mut reader: R,
    format: Format,
    options: &LoadOptions,
) -> Result<Loaded> {
    let mut loaded = Loaded::default();

    match format {
        Format::Ti | Format::Csv => {
            let parse_line: fn(&str) -> Result<Setting> = match format {
                Format::Ti => parse_ti_line,
                _ => Setting::from_csv_strict,
            };

            // Latin-1 unit labels decode lossily; only ASCII columns are used
            let mut lines = BufReader::new(reader);
            let mut raw = Vec::new();
            let mut number = 0;
            loop {
                raw.clear();
                if lines.read_until(b'\n', &mut raw)? == 0 {
                    break;
                }
                number += 1;

                let decoded = String::from_utf8_lossy(&raw);
                let line = decoded.trim_end_matches(['\r', '\n']);
                if is_skippable(line) {
                    continue;
                }
                if !loaded.push(number, parse_line(line), options.policy) {
                    break;
                }
            }
        }
        Format::Binary => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            check_record_length(bytes.len())?;

            for (index, chunk) in bytes.chunks(SETTING_SIZE).enumerate() {
                if !loaded.push(index + 1, Setting::from_bytes(chunk), options.policy) {
                    break;
                }
            }
        }
    }

    log::info!(
        "read {} {} settings ({} errors)",
        loaded.settings.len(),
        format,
        loaded.errors.len()
    );
    Ok(loaded)
}

/// Writes settings in the given format.
///
/// # Errors
///
/// Returns `SettingsError::UnsupportedConversion` for [`Format::Ti`], which
/// is input only, and `SettingsError::Io` on write failure.
pub fn write_settings<W: Write>(writer: W, format: Format, settings: &[Setting]) -> Result<()> {
    match format {
        Format::Csv => write_csv(writer, settings),
        Format::Binary => write_binary(writer, settings),
        Format::Ti => Err(SettingsError::unsupported_conversion("settings", Format::Ti)),
    }
}

/// Writes the CSV header comment followed by one line per setting.
pub fn write_csv<W: Write>(mut writer: W, settings: &[Setting]) -> Result<()> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for setting in settings {
        writeln!(writer, "{}", setting.to_csv())?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes settings as back-to-back 7-byte records.
pub fn write_binary<W: Write>(mut writer: W, settings: &[Setting]) -> Result<()> {
    writer.write_all(&encode_binary(settings))?;
    writer.flush()?;
    Ok(())
}

/// Encodes settings as back-to-back 7-byte records.
pub fn encode_binary(settings: &[Setting]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(settings.len() * SETTING_SIZE);
    for setting in settings {
        bytes.extend_from_slice(&setting.to_bytes());
    }
    bytes
}

/// Decodes back-to-back 7-byte records.
///
/// # Errors
///
/// Returns `SettingsError::Truncated` if the length is not a multiple of 7,
/// or the first record decoding error.
///
/// # Example
///
/// ```
/// use bq_settings::format::{decode_binary, encode_binary};
/// use bq_settings::Setting;
///
/// let settings = vec![Setting::ram(2, 0x9235, 3500).unwrap()];
/// assert_eq!(decode_binary(&encode_binary(&settings)).unwrap(), settings);
/// assert!(decode_binary(&[0x0A, 0x35]).is_err());
/// ```
pub fn decode_binary(bytes: &[u8]) -> Result<Vec<Setting>> {
    check_record_length(bytes.len())?;
    bytes.chunks(SETTING_SIZE).map(Setting::from_bytes).collect()
}

/// Encodes the 2-byte little-endian record count sent ahead of a transfer.
///
/// # Errors
///
/// Returns `SettingsError::TooManySettings` if `count` exceeds `u16::MAX`.
pub fn encode_count(count: usize) -> Result<[u8; COUNT_SIZE]> {
    u16::try_from(count)
        .map(u16::to_le_bytes)
        .map_err(|_| SettingsError::TooManySettings { count })
}

/// Encodes the firmware EEPROM image: record count, then the records.
///
/// # Example
///
/// ```
/// use bq_settings::format::{decode_image, encode_image};
/// use bq_settings::Setting;
///
/// let settings = vec![Setting::ram(1, 0x9234, 0x8C).unwrap()];
/// let image = encode_image(&settings).unwrap();
/// assert_eq!(&image[..2], &[0x01, 0x00]);
/// assert_eq!(decode_image(&image).unwrap(), settings);
/// ```
pub fn encode_image(settings: &[Setting]) -> Result<Vec<u8>> {
    let mut image = Vec::with_capacity(COUNT_SIZE + settings.len() * SETTING_SIZE);
    image.extend_from_slice(&encode_count(settings.len())?);
    image.extend_from_slice(&encode_binary(settings));
    Ok(image)
}

/// Decodes a firmware EEPROM image.
///
/// Bytes after the last counted record are ignored, as EEPROM dumps are
/// usually longer than the stored settings.
///
/// # Errors
///
/// Returns `SettingsError::Truncated` if the image is shorter than its count
/// requires.
pub fn decode_image(image: &[u8]) -> Result<Vec<Setting>> {
    if image.len() < COUNT_SIZE {
        return Err(SettingsError::Truncated {
            expected: COUNT_SIZE,
            actual: image.len(),
        });
    }

    let count = usize::from(u16::from_le_bytes([image[0], image[1]]));
    let expected = COUNT_SIZE + count * SETTING_SIZE;
    if image.len() < expected {
        return Err(SettingsError::Truncated {
            expected,
            actual: image.len(),
        });
    }

    decode_binary(&image[COUNT_SIZE..expected])
}

fn check_record_length(len: usize) -> Result<()> {
    if len % SETTING_SIZE != 0 {
        return Err(SettingsError::Truncated {
            expected: len.div_ceil(SETTING_SIZE) * SETTING_SIZE,
            actual: len,
        });
    }
    Ok(())
}
