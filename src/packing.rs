//! Numeric packing of converted values into the stored bit pattern.
//!
//! TI exports declare each field with a data type code and a byte width. The
//! pair selects a concrete numeric type:
//!
//! | Code | Width 1 | Width 2 | Width 4 |
//! |------|---------|---------|---------|
//! | `B` | u8 | u16 | u32 |
//! | `I` | i8 | i16 | i32 |
//! | `U` | u8 | u16 | u32 |
//! | `F` | - | - | f32 |
//!
//! The value is encoded little-endian in that type and the same bytes are
//! reinterpreted as an unsigned integer, which is what a [`Setting`](crate::Setting)
//! stores.
//!
//! # Example
//!
//! ```
//! use bq_settings::packing::{pack, DataType};
//!
//! assert_eq!(pack(DataType::Signed, 2, -1.0).unwrap(), 0xFFFF);
//! assert_eq!(pack(DataType::Float, 4, 1.5).unwrap(), 1.5f32.to_bits());
//! assert!(pack(DataType::Float, 1, 1.5).is_err());
//! ```

use std::str::FromStr;

use crate::error::{Result, SettingsError};

/// Data type code of a TI export field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `B`: unsigned byte-class value.
    Byte,
    /// `I`: two's complement signed integer.
    Signed,
    /// `U`: unsigned integer.
    Unsigned,
    /// `F`: IEEE-754 single precision float.
    Float,
}

impl DataType {
    /// Returns the single-letter code used in TI exports.
    pub fn code(self) -> &'static str {
        match self {
            DataType::Byte => "B",
            DataType::Signed => "I",
            DataType::Unsigned => "U",
            DataType::Float => "F",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DataType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "B" => Ok(DataType::Byte),
            "I" => Ok(DataType::Signed),
            "U" => Ok(DataType::Unsigned),
            "F" => Ok(DataType::Float),
            _ => Err(SettingsError::invalid_field(
                "data type",
                s,
                "expected B, I, U or F",
            )),
        }
    }
}

/// Concrete numeric type selected by a data type / width pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericType {
    /// 8-bit unsigned.
    U8,
    /// 16-bit unsigned.
    U16,
    /// 32-bit unsigned.
    U32,
    /// 8-bit signed.
    I8,
    /// 16-bit signed.
    I16,
    /// 32-bit signed.
    I32,
    /// 32-bit float.
    F32,
}

impl NumericType {
    /// Looks up the numeric type for a data type and byte width.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::UnsupportedTypeWidth` for pairs outside the table.
    pub fn resolve(data_type: DataType, width: u8) -> Result<Self> {
        match (data_type, width) {
            (DataType::Byte | DataType::Unsigned, 1) => Ok(NumericType::U8),
            (DataType::Byte | DataType::Unsigned, 2) => Ok(NumericType::U16),
            (DataType::Byte | DataType::Unsigned, 4) => Ok(NumericType::U32),
            (DataType::Signed, 1) => Ok(NumericType::I8),
            (DataType::Signed, 2) => Ok(NumericType::I16),
            (DataType::Signed, 4) => Ok(NumericType::I32),
            (DataType::Float, 4) => Ok(NumericType::F32),
            _ => Err(SettingsError::unsupported_type_width(data_type.code(), width)),
        }
    }

    /// Returns the width in bytes.
    pub fn width(self) -> u8 {
        match self {
            NumericType::U8 | NumericType::I8 => 1,
            NumericType::U16 | NumericType::I16 => 2,
            NumericType::U32 | NumericType::I32 | NumericType::F32 => 4,
        }
    }

    fn range(self) -> (f64, f64) {
        match self {
            NumericType::U8 => (0.0, f64::from(u8::MAX)),
            NumericType::U16 => (0.0, f64::from(u16::MAX)),
            NumericType::U32 => (0.0, f64::from(u32::MAX)),
            NumericType::I8 => (f64::from(i8::MIN), f64::from(i8::MAX)),
            NumericType::I16 => (f64::from(i16::MIN), f64::from(i16::MAX)),
            NumericType::I32 => (f64::from(i32::MIN), f64::from(i32::MAX)),
            NumericType::F32 => (f64::from(f32::MIN), f64::from(f32::MAX)),
        }
    }

    /// Encodes a value and returns its little-endian bytes read back as `u32`.
    ///
    /// Integer types truncate toward zero before the range check.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidField` if the value is not finite or
    /// does not fit the type.
    pub fn pack(self, value: f64) -> Result<u32> {
        let value = if self == NumericType::F32 {
            value
        } else {
            value.trunc()
        };

        let (min, max) = self.range();
        if !value.is_finite() || value < min || value > max {
            return Err(SettingsError::invalid_field(
                "converted value",
                value.to_string(),
                format!("out of range for {:?} ({} to {})", self, min, max),
            ));
        }

        let packed = match self {
            NumericType::U8 => u32::from(value as u8),
            NumericType::U16 => u32::from(value as u16),
            NumericType::U32 => value as u32,
            NumericType::I8 => u32::from((value as i8).to_le_bytes()[0]),
            NumericType::I16 => u32::from(u16::from_le_bytes((value as i16).to_le_bytes())),
            NumericType::I32 => u32::from_le_bytes((value as i32).to_le_bytes()),
            NumericType::F32 => u32::from_le_bytes((value as f32).to_le_bytes()),
        };
        Ok(packed)
    }

    /// Interprets a stored bit pattern as this type.
    pub fn unpack(self, raw: u32) -> f64 {
        let bytes = raw.to_le_bytes();
        match self {
            NumericType::U8 => f64::from(bytes[0]),
            NumericType::U16 => f64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            NumericType::U32 => f64::from(raw),
            NumericType::I8 => f64::from(i8::from_le_bytes([bytes[0]])),
            NumericType::I16 => f64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
            NumericType::I32 => f64::from(i32::from_le_bytes(bytes)),
            NumericType::F32 => f64::from(f32::from_le_bytes(bytes)),
        }
    }
}

/// Packs a converted value for the given data type and byte width.
pub fn pack(data_type: DataType, width: u8, value: f64) -> Result<u32> {
    NumericType::resolve(data_type, width)?.pack(value)
}

/// Recovers the human-readable value from a stored bit pattern.
///
/// # Example
///
/// ```
/// use bq_settings::packing::{unpack, DataType};
///
/// assert_eq!(unpack(DataType::Signed, 2, 0xFFFF).unwrap(), -1.0);
/// ```
pub fn unpack(data_type: DataType, width: u8, raw: u32) -> Result<f64> {
    Ok(NumericType::resolve(data_type, width)?.unpack(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_codes() {
        for (code, data_type) in [
            ("B", DataType::Byte),
            ("I", DataType::Signed),
            ("U", DataType::Unsigned),
            ("F", DataType::Float),
        ] {
            assert_eq!(code.parse::<DataType>().unwrap(), data_type);
            assert_eq!(data_type.to_string(), code);
        }
        assert!("X".parse::<DataType>().is_err());
        assert!("".parse::<DataType>().is_err());
    }

    #[test]
    fn test_resolve_table() {
        assert_eq!(NumericType::resolve(DataType::Byte, 1).unwrap(), NumericType::U8);
        assert_eq!(NumericType::resolve(DataType::Unsigned, 2).unwrap(), NumericType::U16);
        assert_eq!(NumericType::resolve(DataType::Unsigned, 4).unwrap(), NumericType::U32);
        assert_eq!(NumericType::resolve(DataType::Signed, 1).unwrap(), NumericType::I8);
        assert_eq!(NumericType::resolve(DataType::Signed, 4).unwrap(), NumericType::I32);
        assert_eq!(NumericType::resolve(DataType::Float, 4).unwrap(), NumericType::F32);
    }

    #[test]
    fn test_numeric_width() {
        assert_eq!(NumericType::resolve(DataType::Byte, 1).unwrap().width(), 1);
        assert_eq!(NumericType::resolve(DataType::Signed, 2).unwrap().width(), 2);
        assert_eq!(NumericType::resolve(DataType::Float, 4).unwrap().width(), 4);
    }

    #[test]
    fn test_resolve_unsupported_pairs() {
        for (data_type, width) in [
            (DataType::Float, 1),
            (DataType::Float, 2),
            (DataType::Unsigned, 3),
            (DataType::Signed, 0),
            (DataType::Byte, 8),
        ] {
            let err = NumericType::resolve(data_type, width).unwrap_err();
            assert!(matches!(err, SettingsError::UnsupportedTypeWidth { .. }));
        }
    }

    #[test]
    fn test_pack_signed_negative_one() {
        assert_eq!(pack(DataType::Signed, 1, -1.0).unwrap(), 0xFF);
        assert_eq!(pack(DataType::Signed, 2, -1.0).unwrap(), 65535);
        assert_eq!(pack(DataType::Signed, 4, -1.0).unwrap(), u32::MAX);
    }

    #[test]
    fn test_pack_signed_bytes() {
        let packed = pack(DataType::Signed, 2, -300.0).unwrap();
        assert_eq!(hex::encode(&packed.to_le_bytes()[..2]), "d4fe");
    }

    #[test]
    fn test_pack_float() {
        let packed = pack(DataType::Float, 4, 1.5).unwrap();
        assert_eq!(hex::encode(packed.to_le_bytes()), "0000c03f");
        assert_eq!(packed, 0x3FC0_0000);
    }

    #[test]
    fn test_pack_truncates_integers() {
        assert_eq!(pack(DataType::Unsigned, 2, 50.9).unwrap(), 50);
        assert_eq!(pack(DataType::Signed, 2, -2.7).unwrap(), 0xFFFE);
    }

    #[test]
    fn test_pack_float_keeps_fraction() {
        let packed = pack(DataType::Float, 4, 0.25).unwrap();
        assert_eq!(f32::from_bits(packed), 0.25);
    }

    #[test]
    fn test_pack_out_of_range() {
        assert!(pack(DataType::Unsigned, 1, 256.0).is_err());
        assert!(pack(DataType::Unsigned, 2, -1.0).is_err());
        assert!(pack(DataType::Signed, 1, 128.0).is_err());
        assert!(pack(DataType::Signed, 1, -129.0).is_err());
        assert!(pack(DataType::Unsigned, 4, f64::NAN).is_err());
    }

    #[test]
    fn test_pack_range_limits() {
        assert_eq!(pack(DataType::Byte, 1, 255.0).unwrap(), 0xFF);
        assert_eq!(pack(DataType::Unsigned, 4, 4294967295.0).unwrap(), u32::MAX);
        assert_eq!(pack(DataType::Signed, 4, -2147483648.0).unwrap(), 0x8000_0000);
    }

    #[test]
    fn test_unpack_inverts_pack() {
        for (data_type, width, value) in [
            (DataType::Signed, 2, -1234.0),
            (DataType::Signed, 1, -5.0),
            (DataType::Unsigned, 2, 3500.0),
            (DataType::Float, 4, 0.125),
        ] {
            let packed = pack(data_type, width, value).unwrap();
            assert_eq!(unpack(data_type, width, packed).unwrap(), value);
        }
    }
}
