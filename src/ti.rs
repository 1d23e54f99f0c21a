//! Parser for the TI settings export (`*.gg.csv`).
//!
//! The export is a comma-separated table, one data memory field per row.
//! Only a handful of columns matter here:
//!
//! | Column | Content |
//! |--------|---------|
//! | 3 | Units label (`Hex` selects hexadecimal raw values) |
//! | 4 | Data type code (`B`, `I`, `U`, `F`) |
//! | 5 | Byte width |
//! | 6 | Address (hexadecimal) |
//! | 7 | Raw value in user units |
//! | 12 | Conversion expression in `x` |
//!
//! Each row becomes a [`SettingKind::RAM`](crate::SettingKind::RAM) setting
//! whose data is the converted, packed value.
//!
//! # Example
//!
//! ```
//! use bq_settings::ti::parse_ti_line;
//!
//! let line = "\"Settings\",\"Protection\",\"CUV Threshold\",\"mV\",\"U\",\"2\",\"0x20\",\"10\",\"\",\"\",\"\",\"\",\"x\"";
//! let setting = parse_ti_line(line).unwrap();
//! assert_eq!(setting.address(), 0x20);
//! assert_eq!(setting.data(), 10);
//! ```

use crate::error::{Result, SettingsError};
use crate::expression::Expression;
use crate::packing::{DataType, NumericType};
use crate::setting::Setting;
use crate::utils::{parse_address, parse_decimal, parse_hex, split_fields};

/// Units column index.
pub const UNITS_COLUMN: usize = 3;
/// Data type column index.
pub const DATA_TYPE_COLUMN: usize = 4;
/// Byte width column index.
pub const WIDTH_COLUMN: usize = 5;
/// Address column index.
pub const ADDRESS_COLUMN: usize = 6;
/// Raw value column index.
pub const VALUE_COLUMN: usize = 7;
/// Conversion expression column index.
pub const CONVERSION_COLUMN: usize = 12;

/// Units label that marks a hexadecimal raw value.
pub const HEX_UNITS: &str = "Hex";

/// The columns of one TI export row that describe a setting.
#[derive(Debug, Clone, PartialEq)]
pub struct TiRow {
    /// Units label.
    pub units: String,
    /// Declared data type.
    pub data_type: DataType,
    /// Declared byte width.
    pub byte_width: u8,
    /// Data memory address.
    pub address: u16,
    /// Raw value token as exported.
    pub raw_value: String,
    /// Conversion expression.
    pub conversion: String,
}

impl TiRow {
    /// Extracts the relevant columns from one export line.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidField` if the row is too short or the
    /// data type, width or address columns do not parse.
    pub fn parse(line: &str) -> Result<Self> {
        let fields = split_fields(line);
        if fields.len() <= CONVERSION_COLUMN {
            return Err(SettingsError::invalid_field(
                "column count",
                fields.len().to_string(),
                format!("expected at least {} columns", CONVERSION_COLUMN + 1),
            ));
        }

        Ok(Self {
            units: fields[UNITS_COLUMN].clone(),
            data_type: fields[DATA_TYPE_COLUMN].parse()?,
            byte_width: parse_decimal("byte width", &fields[WIDTH_COLUMN])?,
            address: parse_address("address", &fields[ADDRESS_COLUMN])?,
            raw_value: fields[VALUE_COLUMN].clone(),
            conversion: fields[CONVERSION_COLUMN].clone(),
        })
    }

    /// Parses the raw value token into a number.
    pub fn raw(&self) -> Result<f64> {
        parse_raw_value(&self.raw_value, &self.units)
    }

    /// Converts and packs the row into a RAM setting.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::UnsupportedTypeWidth` for an unsupported data
    /// type / width pair, `SettingsError::Expression` if the conversion fails,
    /// and `SettingsError::InvalidField` if the raw or converted value is
    /// unusable.
    pub fn to_setting(&self) -> Result<Setting> {
        let numeric = NumericType::resolve(self.data_type, self.byte_width)?;
        let raw = self.raw()?;
        let converted = Expression::parse(&self.conversion)?.evaluate(raw)?;
        let data = numeric.pack(converted)?;

        log::trace!(
            "TI {:#06x}: raw {} -> {} -> {:#010x} ({:?})",
            self.address,
            raw,
            converted,
            data,
            numeric
        );

        Setting::ram(numeric.width(), self.address, data)
    }
}

/// Parses a raw value token according to the units label.
///
/// A token containing a decimal point is a float; otherwise `Hex` units
/// select hexadecimal and anything else is decimal.
///
/// # Example
///
/// ```
/// use bq_settings::ti::parse_raw_value;
///
/// assert_eq!(parse_raw_value("3.5", "V").unwrap(), 3.5);
/// assert_eq!(parse_raw_value("FF", "Hex").unwrap(), 255.0);
/// assert_eq!(parse_raw_value("42", "mV").unwrap(), 42.0);
/// ```
pub fn parse_raw_value(token: &str, units: &str) -> Result<f64> {
    let token = token.trim();
    if token.contains('.') {
        return token
            .parse::<f64>()
            .map_err(|_| SettingsError::invalid_field("raw value", token, "expected a float"));
    }

    if units == HEX_UNITS {
        // u64 -> f64 is exact for every value a 4-byte field can hold
        return Ok(parse_hex("raw value", token)? as f64);
    }

    let value: i64 = parse_decimal("raw value", token)?;
    Ok(value as f64)
}

/// Parses one TI export line into a setting.
pub fn parse_ti_line(line: &str) -> Result<Setting> {
    TiRow::parse(line)?.to_setting()
}
