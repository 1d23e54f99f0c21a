//! File-level load, save and conversion.
//!
//! Every operation reads its whole input into memory, then writes its whole
//! output. Records keep file order throughout.
//!
//! # Example
//!
//! ```no_run
//! use bq_settings::{convert, Target};
//!
//! // TI export -> intermediate CSV for hand editing
//! convert("bq76952.gg.csv", "bq76952.csv", Target::Csv)?;
//!
//! // Edited CSV -> binary for the BMS
//! convert("bq76952.csv", "bq76952.bin", Target::Binary)?;
//! # Ok::<(), bq_settings::SettingsError>(())
//! ```

use std::fs::File;
use std::io::{BufWriter, ErrorKind};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, SettingsError};
use crate::format::{read_settings, write_settings, ErrorPolicy, Format, LoadOptions, Loaded};
use crate::setting::Setting;

/// Output format of a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Target {
    /// Binary wire format.
    #[default]
    Binary,
    /// Intermediate CSV.
    Csv,
}

impl Target {
    /// Returns the file format written for this target.
    pub fn format(self) -> Format {
        match self {
            Target::Binary => Format::Binary,
            Target::Csv => Format::Csv,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.format().fmt(f)
    }
}

impl FromStr for Target {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Target::Binary),
            "csv" => Ok(Target::Csv),
            _ => Err(SettingsError::invalid_field(
                "target",
                s,
                "expected binary or csv",
            )),
        }
    }
}

/// Summary of a completed conversion.
#[derive(Debug)]
pub struct Conversion {
    /// Format the input was read as.
    pub source: Format,
    /// Format written.
    pub target: Target,
    /// Number of settings written.
    pub written: usize,
    /// Lines skipped under [`ErrorPolicy::Continue`](ErrorPolicy::Continue).
    pub skipped: Vec<SettingsError>,
}

/// Loads all settings from a file, stopping at the first bad line.
///
/// # Errors
///
/// Returns `SettingsError::FileNotFound` if `path` does not exist and
/// `SettingsError::Parse` for the first malformed line.
pub fn load(path: impl AsRef<Path>, format: Format) -> Result<Vec<Setting>> {
    load_with(path, format, &LoadOptions::default())?.into_result()
}

/// Loads settings from a file with explicit options.
///
/// Parse failures are returned in [`Loaded::errors`] together with the
/// settings read before (and, when continuing, after) them.
pub fn load_with(path: impl AsRef<Path>, format: Format, options: &LoadOptions) -> Result<Loaded> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SettingsError::file_not_found(path),
        _ => SettingsError::Io(e),
    })?;

    log::debug!("loading {} as {}", path.display(), format);
    read_settings(file, format, options)
}

/// Writes settings to a file, replacing it.
///
/// # Errors
///
/// Returns `SettingsError::UnsupportedConversion` for [`Format::Ti`] and
/// `SettingsError::Io` if the file cannot be written.
pub fn save(path: impl AsRef<Path>, format: Format, settings: &[Setting]) -> Result<()> {
    let path = path.as_ref();
    if format == Format::Ti {
        return Err(SettingsError::unsupported_conversion("settings", Format::Ti));
    }

    let file = File::create(path)?;
    write_settings(BufWriter::new(file), format, settings)?;
    log::info!(
        "wrote {} settings to {} ({})",
        settings.len(),
        path.display(),
        format
    );
    Ok(())
}

/// Converts a settings file, detecting the input format from its name.
///
/// Inputs ending in `.gg.csv` are read as TI exports, everything else as
/// intermediate CSV. CSV input can only be converted to binary.
///
/// # Errors
///
/// Returns `SettingsError::FileNotFound` if the input is missing,
/// `SettingsError::UnsupportedConversion` for CSV to CSV, and any load or
/// save error. Nothing is written if loading fails.
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target: Target,
) -> Result<Conversion> {
    convert_with(input, output, target, &LoadOptions::default())
}

/// Converts a settings file with explicit load options.
///
/// Under [`ErrorPolicy::Continue`](ErrorPolicy::Continue) the
/// good records are written and the skipped lines are returned in
/// [`Conversion::skipped`].
pub fn convert_with(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target: Target,
    options: &LoadOptions,
) -> Result<Conversion> {
    let input = input.as_ref();
    if !input.exists() {
        return Err(SettingsError::file_not_found(input));
    }

    let source = Format::detect(input);
    if source == target.format() {
        return Err(SettingsError::unsupported_conversion(source, target));
    }

    let Loaded {
        settings,
        mut errors,
    } = load_with(input, source, options)?;
    if options.policy == ErrorPolicy::Abort && !errors.is_empty() {
        return Err(errors.remove(0));
    }

    save(output, target.format(), &settings)?;
    Ok(Conversion {
        source,
        target,
        written: settings.len(),
        skipped: errors,
    })
}
