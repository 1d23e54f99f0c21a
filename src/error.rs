//! Error types for settings conversion and transfer.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors that can occur while parsing, converting or transferring settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Input file does not exist.
    #[error("Input file does not exist: {}", .path.display())]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// A line of a text input could not be parsed.
    #[error("line {line}: {source}")]
    Parse {
        /// 1-based line number within the input.
        line: usize,
        /// The underlying field-level failure.
        #[source]
        source: Box<SettingsError>,
    },

    /// A field held a value that could not be interpreted.
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// Raw text (or value) found in the field.
        value: String,
        /// Description of what was expected.
        reason: String,
    },

    /// The data type / byte width pair has no packing rule.
    #[error("Unsupported data type '{data_type}' with width {width}")]
    UnsupportedTypeWidth {
        /// Data type code as it appeared in the input.
        data_type: String,
        /// Declared byte width.
        width: u8,
    },

    /// A conversion expression could not be parsed or evaluated.
    #[error("Expression '{expression}': {reason}")]
    Expression {
        /// The expression text.
        expression: String,
        /// Description of the failure.
        reason: String,
    },

    /// No mapping exists between the requested formats.
    #[error("Unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source format name.
        from: String,
        /// Target format name.
        to: String,
    },

    /// I/O error while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The device answered a record with a non-success acknowledgment.
    #[error("Transfer failed at record {record}: device answered 0x{ack:02X}")]
    Protocol {
        /// 1-based position of the record that was rejected (0 = count preamble).
        record: usize,
        /// The acknowledgment byte received.
        ack: u8,
    },

    /// The device closed the link before acknowledging a record.
    #[error("Transfer failed at record {record}: no acknowledgment received")]
    ShortResponse {
        /// 1-based position of the record awaiting acknowledgment (0 = count preamble).
        record: usize,
    },

    /// Too many settings to describe in the 2-byte count preamble.
    #[error("Too many settings to transfer: {count} (maximum {})", u16::MAX)]
    TooManySettings {
        /// Number of settings requested.
        count: usize,
    },

    /// Binary input length is not a whole number of records.
    #[error("Truncated binary input: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },
}

impl SettingsError {
    /// Creates a new `FileNotFound` error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Wraps a field-level error with the line it occurred on.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::SettingsError;
    ///
    /// let err = SettingsError::parse(3, SettingsError::invalid_field("address", "zz", "not hex"));
    /// assert_eq!(err.line(), Some(3));
    /// ```
    pub fn parse(line: usize, source: SettingsError) -> Self {
        Self::Parse {
            line,
            source: Box::new(source),
        }
    }

    /// Creates a new `InvalidField` error.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_settings::SettingsError;
    ///
    /// let err = SettingsError::invalid_field("byte width", "x", "expected a decimal integer");
    /// ```
    pub fn invalid_field(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `UnsupportedTypeWidth` error.
    pub fn unsupported_type_width(data_type: impl Into<String>, width: u8) -> Self {
        Self::UnsupportedTypeWidth {
            data_type: data_type.into(),
            width,
        }
    }

    /// Creates a new `Expression` error.
    pub fn expression(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `UnsupportedConversion` error.
    pub fn unsupported_conversion(from: impl ToString, to: impl ToString) -> Self {
        Self::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns the line number for line-level parse errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_display() {
        let err = SettingsError::file_not_found("settings.gg.csv");
        assert_eq!(
            err.to_string(),
            "Input file does not exist: settings.gg.csv"
        );
    }

    #[test]
    fn test_parse_display_includes_line() {
        let err = SettingsError::parse(
            7,
            SettingsError::invalid_field("address", "0xZZ", "expected a hexadecimal integer"),
        );
        assert_eq!(
            err.to_string(),
            "line 7: Invalid address '0xZZ': expected a hexadecimal integer"
        );
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn test_unsupported_type_width_display() {
        let err = SettingsError::unsupported_type_width("F", 1);
        assert_eq!(err.to_string(), "Unsupported data type 'F' with width 1");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_protocol_display() {
        let err = SettingsError::Protocol { record: 2, ack: 0x01 };
        assert_eq!(
            err.to_string(),
            "Transfer failed at record 2: device answered 0x01"
        );
    }

    #[test]
    fn test_unsupported_conversion_display() {
        let err = SettingsError::unsupported_conversion("CSV", "CSV");
        assert_eq!(err.to_string(), "Unsupported conversion from CSV to CSV");
    }

    #[test]
    fn test_too_many_settings_display() {
        let err = SettingsError::TooManySettings { count: 70000 };
        assert_eq!(
            err.to_string(),
            "Too many settings to transfer: 70000 (maximum 65535)"
        );
    }
}
