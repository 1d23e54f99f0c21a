//! Helpers for splitting text rows and parsing numeric fields.
//!
//! Both text formats (TI export and intermediate CSV) are plain comma-separated
//! lines without escaping. These helpers take care of the small amount of
//! clean-up that both readers need, and produce [`SettingsError::InvalidField`]
//! errors naming the field on failure.
//!
//! # Example
//!
//! ```
//! use bq_settings::utils::{is_skippable, parse_hex, split_fields};
//!
//! assert!(is_skippable("* Setting Type,Number of Bytes,Address,Data"));
//!
//! let fields = split_fields("\"Settings\",\"Fuse\",\"Min Blow Fuse Voltage\",\"mV\"");
//! assert_eq!(fields[3], "mV");
//!
//! assert_eq!(parse_hex("address", "0x9235").unwrap(), 0x9235);
//! ```

use std::str::FromStr;

use crate::error::{Result, SettingsError};

/// Marker that starts a comment line in both text formats.
pub const COMMENT_MARKER: char = '*';

/// Returns whether a text line carries no setting (comment or blank).
///
/// # Example
///
/// ```
/// use bq_settings::utils::is_skippable;
///
/// assert!(is_skippable("*comment"));
/// assert!(is_skippable("   "));
/// assert!(!is_skippable("RAM,2,0x9235,10"));
/// ```
pub fn is_skippable(line: &str) -> bool {
    line.starts_with(COMMENT_MARKER) || line.trim().is_empty()
}

/// Strips double quotes and line terminators, then splits on commas.
///
/// Embedded commas are not supported by either format.
pub fn split_fields(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .replace('"', "")
        .split(',')
        .map(|field| field.trim().to_string())
        .collect()
}

/// Parses a hexadecimal integer, with or without a `0x` prefix.
///
/// # Example
///
/// ```
/// use bq_settings::utils::parse_hex;
///
/// assert_eq!(parse_hex("raw value", "FF").unwrap(), 255);
/// assert_eq!(parse_hex("address", "0X20").unwrap(), 0x20);
/// assert!(parse_hex("address", "0xZZ").is_err());
/// ```
pub fn parse_hex(field: &str, text: &str) -> Result<u64> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u64::from_str_radix(digits, 16)
        .map_err(|_| SettingsError::invalid_field(field, text, "expected a hexadecimal integer"))
}

/// Parses a hexadecimal 16-bit address.
pub fn parse_address(field: &str, text: &str) -> Result<u16> {
    let value = parse_hex(field, text)?;
    u16::try_from(value)
        .map_err(|_| SettingsError::invalid_field(field, text, "address exceeds 16 bits"))
}

/// Parses a decimal value of any integer type.
///
/// # Example
///
/// ```
/// use bq_settings::utils::parse_decimal;
///
/// let width: u8 = parse_decimal("byte width", "2").unwrap();
/// assert_eq!(width, 2);
/// assert!(parse_decimal::<u8>("byte width", "300").is_err());
/// ```
pub fn parse_decimal<T: FromStr>(field: &str, text: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| SettingsError::invalid_field(field, text, "expected a decimal integer"))
}

/// Formats bytes as space-separated uppercase hex pairs.
///
/// # Example
///
/// ```
/// use bq_settings::utils::format_bytes;
///
/// assert_eq!(format_bytes(&[0x0A, 0x20, 0x00]), "0A 20 00");
/// ```
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_skippable() {
        assert!(is_skippable("* Setting Type,Number of Bytes,Address,Data"));
        assert!(is_skippable(""));
        assert!(is_skippable("\r\n"));
        assert!(!is_skippable("Direct,1,0x61,5"));
        // Only a leading marker counts
        assert!(!is_skippable(" *Direct"));
    }

    #[test]
    fn test_split_fields_strips_quotes_and_newline() {
        let fields = split_fields("\"a\",\"b c\", d ,e\r\n");
        assert_eq!(fields, vec!["a", "b c", "d", "e"]);
    }

    #[test]
    fn test_split_fields_keeps_empty_columns() {
        let fields = split_fields("a,,c,");
        assert_eq!(fields, vec!["a", "", "c", ""]);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("f", "ff").unwrap(), 0xFF);
        assert_eq!(parse_hex("f", "0x1234").unwrap(), 0x1234);
        assert_eq!(parse_hex("f", " 0X00AB ").unwrap(), 0xAB);
        assert!(parse_hex("f", "").is_err());
        assert!(parse_hex("f", "0x").is_err());
        assert!(parse_hex("f", "12G").is_err());
    }

    #[test]
    fn test_parse_address_range() {
        assert_eq!(parse_address("address", "0xFFFF").unwrap(), 0xFFFF);
        let err = parse_address("address", "0x10000").unwrap_err();
        assert!(err.to_string().contains("exceeds 16 bits"));
    }

    #[test]
    fn test_parse_decimal_error_names_field() {
        let err = parse_decimal::<u32>("data", "12a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid data '12a': expected a decimal integer"
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(&[]), "");
        assert_eq!(format_bytes(&[0xFF, 0x00, 0x7F]), "FF 00 7F");
    }
}
