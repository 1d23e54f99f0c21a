//! BQ setting record and its binary and CSV encodings.
//!
//! A [`Setting`] is one configuration point for the BQ76952 battery monitor.
//! It is applied by the BMS firmware in one of three ways, selected by its
//! [`SettingKind`].
//!
//! # Binary Layout
//!
//! Every setting encodes to exactly [`SETTING_SIZE`] bytes:
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0 | Command | Bits 0-1: kind, bits 2-4: byte width, bits 5-7: zero |
//! | 1-2 | Address | Little-endian 16-bit address |
//! | 3-6 | Data | Little-endian 32-bit data |
//!
//! Kind codes: `00` Direct, `01` Subcommand, `10` RAM, `11` unused.
//!
//! # CSV Layout
//!
//! `Kind,ByteWidth,0xAddress,Data`, for example `RAM,2,0x9235,3500`.
//!
//! # Example
//!
//! ```
//! use bq_settings::{Setting, SettingKind};
//!
//! let setting = Setting::new(SettingKind::RAM, 2, 0x0020, 10).unwrap();
//!
//! let bytes = setting.to_bytes();
//! assert_eq!(bytes, [0x0A, 0x20, 0x00, 0x0A, 0x00, 0x00, 0x00]);
//! assert_eq!(Setting::from_bytes(&bytes).unwrap(), setting);
//!
//! assert_eq!(setting.to_csv(), "RAM,2,0x20,10");
//! assert_eq!(Setting::from_csv(&setting.to_csv()).unwrap(), setting);
//! ```

use std::str::FromStr;

use crate::error::{Result, SettingsError};
use crate::utils::{parse_address, parse_decimal, split_fields};

/// Encoded size of one setting in bytes.
pub const SETTING_SIZE: usize = 7;

/// Largest byte width representable in the command byte.
pub const MAX_BYTE_WIDTH: u8 = 0x07;

/// Comment line written at the top of intermediate CSV files.
pub const CSV_HEADER: &str = "* Setting Type,Number of Bytes,Address,Data";

const KIND_MASK: u8 = 0x03;
const WIDTH_SHIFT: u8 = 2;
const RESERVED_MASK: u8 = 0xE0;

/// How the firmware applies a setting to the BQ chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKind {
    /// Written directly to an I2C register.
    Direct,
    /// Subcommand address written to the command registers, value to the data buffer.
    Subcommand,
    /// Data memory (RAM) write through the subcommand interface.
    RAM,
}

impl SettingKind {
    /// All kinds, in code order.
    pub const ALL: [SettingKind; 3] = [
        SettingKind::Direct,
        SettingKind::Subcommand,
        SettingKind::RAM,
    ];

    /// Returns the 2-bit code stored in the command byte.
    pub fn code(self) -> u8 {
        match self {
            SettingKind::Direct => 0,
            SettingKind::Subcommand => 1,
            SettingKind::RAM => 2,
        }
    }

    /// Returns the kind for a 2-bit command code.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidField` for the unused code `3` or any
    /// value wider than two bits.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(SettingKind::Direct),
            1 => Ok(SettingKind::Subcommand),
            2 => Ok(SettingKind::RAM),
            _ => Err(SettingsError::invalid_field(
                "setting kind",
                code.to_string(),
                "expected 0 (Direct), 1 (Subcommand) or 2 (RAM)",
            )),
        }
    }
}

impl std::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingKind::Direct => write!(f, "Direct"),
            SettingKind::Subcommand => write!(f, "Subcommand"),
            SettingKind::RAM => write!(f, "RAM"),
        }
    }
}

impl FromStr for SettingKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Direct" => Ok(SettingKind::Direct),
            "Subcommand" => Ok(SettingKind::Subcommand),
            "RAM" => Ok(SettingKind::RAM),
            _ => Err(SettingsError::invalid_field(
                "setting kind",
                s,
                "expected Direct, Subcommand or RAM",
            )),
        }
    }
}

/// One BQ configuration point.
///
/// `data` holds the final bit pattern sent to the device: signed and float
/// values have already been packed (see [`crate::packing`]). Records are
/// immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Setting {
    kind: SettingKind,
    byte_width: u8,
    address: u16,
    data: u32,
}

impl Setting {
    /// Creates a new setting.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidField` if `byte_width` does not fit the
    /// 3-bit width field of the command byte.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::{Setting, SettingKind};
    ///
    /// let setting = Setting::new(SettingKind::Subcommand, 0, 0x0093, 0).unwrap();
    /// assert_eq!(setting.byte_width(), 0);
    ///
    /// assert!(Setting::new(SettingKind::RAM, 8, 0x9235, 0).is_err());
    /// ```
    pub fn new(kind: SettingKind, byte_width: u8, address: u16, data: u32) -> Result<Self> {
        if byte_width > MAX_BYTE_WIDTH {
            return Err(SettingsError::invalid_field(
                "byte width",
                byte_width.to_string(),
                format!("must be 0-{}", MAX_BYTE_WIDTH),
            ));
        }

        Ok(Self {
            kind,
            byte_width,
            address,
            data,
        })
    }

    /// Creates a RAM setting, the kind produced from TI exports.
    pub fn ram(byte_width: u8, address: u16, data: u32) -> Result<Self> {
        Self::new(SettingKind::RAM, byte_width, address, data)
    }

    /// Returns the setting kind.
    pub fn kind(&self) -> SettingKind {
        self.kind
    }

    /// Returns the payload width in bytes (0 = no payload).
    pub fn byte_width(&self) -> u8 {
        self.byte_width
    }

    /// Returns the register or subcommand address.
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Returns the stored 32-bit data.
    pub fn data(&self) -> u32 {
        self.data
    }

    /// Returns the data as the firmware reads it back.
    ///
    /// Widths 1 to 3 mask the data to that many bytes. Width 0 and widths of
    /// 4 or more return the full value.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::Setting;
    ///
    /// let setting = Setting::ram(1, 0x9300, 0x1234).unwrap();
    /// assert_eq!(setting.payload(), 0x34);
    /// ```
    pub fn payload(&self) -> u32 {
        match self.byte_width {
            1..=3 => self.data & ((1u32 << (u32::from(self.byte_width) * 8)) - 1),
            _ => self.data,
        }
    }

    /// Returns the little-endian payload bytes the firmware writes to the chip.
    pub fn payload_bytes(&self) -> Vec<u8> {
        let width = usize::from(self.byte_width).min(4);
        self.data.to_le_bytes()[..width].to_vec()
    }

    /// Returns the command byte (kind in bits 0-1, width in bits 2-4).
    pub fn command_byte(&self) -> u8 {
        (self.byte_width << WIDTH_SHIFT) | self.kind.code()
    }

    /// Serializes the setting to its 7-byte wire form.
    pub fn to_bytes(&self) -> [u8; SETTING_SIZE] {
        let address = self.address.to_le_bytes();
        let data = self.data.to_le_bytes();
        [
            self.command_byte(),
            address[0],
            address[1],
            data[0],
            data[1],
            data[2],
            data[3],
        ]
    }

    /// Parses a setting from its 7-byte wire form.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Truncated` if fewer than 7 bytes are given and
    /// `SettingsError::InvalidField` if the command byte uses the unused kind
    /// code or sets any reserved bit.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::{Setting, SettingKind};
    ///
    /// let setting = Setting::from_bytes(&[0x05, 0x61, 0x00, 0x03, 0x00, 0x00, 0x00]).unwrap();
    /// assert_eq!(setting.kind(), SettingKind::Subcommand);
    /// assert_eq!(setting.byte_width(), 1);
    /// assert_eq!(setting.address(), 0x61);
    /// assert_eq!(setting.data(), 3);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < SETTING_SIZE {
            return Err(SettingsError::Truncated {
                expected: SETTING_SIZE,
                actual: data.len(),
            });
        }

        let command = data[0];
        if command & RESERVED_MASK != 0 {
            return Err(SettingsError::invalid_field(
                "command byte",
                format!("0x{:02X}", command),
                "reserved bits 5-7 must be zero",
            ));
        }

        let kind = SettingKind::from_code(command & KIND_MASK)?;
        let byte_width = command >> WIDTH_SHIFT;
        let address = u16::from_le_bytes([data[1], data[2]]);
        let value = u32::from_le_bytes([data[3], data[4], data[5], data[6]]);

        Self::new(kind, byte_width, address, value)
    }

    /// Renders the setting as one intermediate CSV line (no line terminator).
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{:#x},{}",
            self.kind, self.byte_width, self.address, self.data
        )
    }

    /// Parses one intermediate CSV line.
    ///
    /// An unrecognised kind falls back to [`SettingKind::Direct`]; use
    /// [`Setting::from_csv_strict`] to reject it instead. Fields after the
    /// fourth are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidField` if fewer than four fields are
    /// present or a numeric field does not parse.
    pub fn from_csv(line: &str) -> Result<Self> {
        let fields = csv_fields(line)?;
        let kind = fields[0].parse().unwrap_or(SettingKind::Direct);
        Self::from_csv_fields(kind, &fields)
    }

    /// Parses one intermediate CSV line, rejecting unknown kinds and extra fields.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::Setting;
    ///
    /// assert!(Setting::from_csv_strict("RAM,2,0x9235,3500").is_ok());
    /// assert!(Setting::from_csv_strict("Ram,2,0x9235,3500").is_err());
    /// assert!(Setting::from_csv("Ram,2,0x9235,3500").is_ok());
    /// ```
    pub fn from_csv_strict(line: &str) -> Result<Self> {
        let fields = csv_fields(line)?;
        if fields.len() != 4 {
            return Err(SettingsError::invalid_field(
                "field count",
                fields.len().to_string(),
                "expected exactly 4 fields",
            ));
        }
        let kind = fields[0].parse()?;
        Self::from_csv_fields(kind, &fields)
    }

    fn from_csv_fields(kind: SettingKind, fields: &[String]) -> Result<Self> {
        let byte_width = parse_decimal("byte width", &fields[1])?;
        let address = parse_address("address", &fields[2])?;
        let data = parse_decimal("data", &fields[3])?;
        Self::new(kind, byte_width, address, data)
    }
}

impl std::fmt::Display for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_csv())
    }
}

fn csv_fields(line: &str) -> Result<Vec<String>> {
    let fields = split_fields(line);
    if fields.len() < 4 {
        return Err(SettingsError::invalid_field(
            "field count",
            fields.len().to_string(),
            "expected Kind,ByteWidth,Address,Data",
        ));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> Vec<Setting> {
        vec![
            Setting::new(SettingKind::Direct, 1, 0x61, 0x05).unwrap(),
            Setting::new(SettingKind::Subcommand, 0, 0x0093, 0).unwrap(),
            Setting::new(SettingKind::Subcommand, 4, 0x0082, 0xDEAD_BEEF).unwrap(),
            Setting::new(SettingKind::RAM, 2, 0x9235, 65535).unwrap(),
            Setting::new(SettingKind::RAM, 4, 0xFFFF, u32::MAX).unwrap(),
        ]
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(SettingKind::Direct.code(), 0);
        assert_eq!(SettingKind::Subcommand.code(), 1);
        assert_eq!(SettingKind::RAM.code(), 2);
        assert!(SettingKind::from_code(3).is_err());
    }

    #[test]
    fn test_kind_display_and_parse() {
        for kind in SettingKind::ALL {
            assert_eq!(kind.to_string().parse::<SettingKind>().unwrap(), kind);
        }
        assert!("ram".parse::<SettingKind>().is_err());
    }

    #[test]
    fn test_new_rejects_wide_byte_width() {
        let err = Setting::new(SettingKind::RAM, 8, 0, 0).unwrap_err();
        assert_eq!(err.to_string(), "Invalid byte width '8': must be 0-7");
    }

    #[test]
    fn test_to_bytes_layout() {
        let setting = Setting::new(SettingKind::RAM, 4, 0x9235, 0x1234_5678).unwrap();
        let bytes = setting.to_bytes();

        assert_eq!(bytes.len(), SETTING_SIZE);
        // width 4 in bits 2-4, RAM (0b10) in bits 0-1
        assert_eq!(bytes[0], 0b0001_0010);
        assert_eq!(hex::encode(&bytes[1..3]), "3592");
        assert_eq!(hex::encode(&bytes[3..]), "78563412");
    }

    #[test]
    fn test_command_byte_keeps_width_and_kind() {
        // An AND of width and kind would zero these out
        let direct = Setting::new(SettingKind::Direct, 1, 0, 0).unwrap();
        assert_eq!(direct.command_byte(), 0x04);

        let subcommand = Setting::new(SettingKind::Subcommand, 2, 0, 0).unwrap();
        assert_eq!(subcommand.command_byte(), 0x09);
    }

    #[test]
    fn test_command_byte_reversible_for_all_pairs() {
        for kind in SettingKind::ALL {
            for width in 0..=MAX_BYTE_WIDTH {
                let setting = Setting::new(kind, width, 0x1234, 0).unwrap();
                let decoded = Setting::from_bytes(&setting.to_bytes()).unwrap();
                assert_eq!(decoded.kind(), kind);
                assert_eq!(decoded.byte_width(), width);
            }
        }
    }

    #[test]
    fn test_binary_roundtrip() {
        for setting in sample_settings() {
            let bytes = setting.to_bytes();
            assert_eq!(Setting::from_bytes(&bytes).unwrap(), setting);
        }
    }

    #[test]
    fn test_from_bytes_too_short() {
        let err = Setting::from_bytes(&[0x0A, 0x20, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Truncated {
                expected: 7,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_from_bytes_rejects_unused_kind() {
        let result = Setting::from_bytes(&[0x03, 0, 0, 0, 0, 0, 0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_bytes_rejects_reserved_bits() {
        let result = Setting::from_bytes(&[0x22, 0, 0, 0, 0, 0, 0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_to_csv() {
        let setting = Setting::new(SettingKind::RAM, 2, 0x9235, 3500).unwrap();
        assert_eq!(setting.to_csv(), "RAM,2,0x9235,3500");
        assert_eq!(setting.to_string(), "RAM,2,0x9235,3500");

        let setting = Setting::new(SettingKind::Subcommand, 0, 0x0093, 0).unwrap();
        assert_eq!(setting.to_csv(), "Subcommand,0,0x93,0");
    }

    #[test]
    fn test_csv_roundtrip() {
        for setting in sample_settings() {
            assert_eq!(Setting::from_csv(&setting.to_csv()).unwrap(), setting);
            assert_eq!(Setting::from_csv_strict(&setting.to_csv()).unwrap(), setting);
        }
    }

    #[test]
    fn test_from_csv_unknown_kind_defaults_to_direct() {
        let setting = Setting::from_csv("Bogus,1,0x61,5").unwrap();
        assert_eq!(setting.kind(), SettingKind::Direct);
    }

    #[test]
    fn test_from_csv_strict_rejects_unknown_kind() {
        let err = Setting::from_csv_strict("Bogus,1,0x61,5").unwrap_err();
        assert!(err.to_string().contains("setting kind"));
    }

    #[test]
    fn test_from_csv_tolerates_line_ending() {
        let setting = Setting::from_csv_strict("RAM,1,0x9300,7\r\n").unwrap();
        assert_eq!(setting.data(), 7);
    }

    #[test]
    fn test_from_csv_missing_fields() {
        assert!(Setting::from_csv("RAM,1,0x9300").is_err());
        assert!(Setting::from_csv("").is_err());
    }

    #[test]
    fn test_from_csv_address_must_be_hex() {
        // "20" is read as hex, not decimal
        let setting = Setting::from_csv("RAM,1,20,7").unwrap();
        assert_eq!(setting.address(), 0x20);

        assert!(Setting::from_csv("RAM,1,0xGG,7").is_err());
    }

    #[test]
    fn test_payload_masks_to_width() {
        let setting = Setting::new(SettingKind::RAM, 2, 0, 0xAABB_CCDD).unwrap();
        assert_eq!(setting.payload(), 0xCCDD);
        assert_eq!(setting.payload_bytes(), vec![0xDD, 0xCC]);

        let setting = Setting::new(SettingKind::Subcommand, 0, 0, 0xFF).unwrap();
        assert_eq!(setting.payload(), 0xFF);
        assert!(setting.payload_bytes().is_empty());

        let setting = Setting::new(SettingKind::RAM, 4, 0, 0xAABB_CCDD).unwrap();
        assert_eq!(setting.payload(), 0xAABB_CCDD);
    }
}
