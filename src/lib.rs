//! # BQ Settings Library
//!
//! A Rust library for reading, converting and uploading configuration settings
//! for the TI BQ76952 battery monitor.
//!
//! Settings travel through three representations:
//!
//! 1. the **TI export** (`*.gg.csv`) written by Battery Management Studio,
//! 2. an **intermediate CSV** that is easy to review and edit by hand,
//! 3. a compact **binary** format of 7-byte records that a microcontroller
//!    applies to the BMS over I2C.
//!
//! ## Features
//!
//! - **Exact wire format**: every record encodes to the same 7 bytes the
//!   firmware decodes
//! - **No panics**: all errors returned as `Result<T, SettingsError>`
//! - **Safe conversions**: TI conversion expressions are parsed and evaluated,
//!   never executed
//! - **Partial loads**: optionally keep the good lines of a damaged file
//! - **Device upload**: stop-and-wait transfer over any `Read + Write` link,
//!   with a serial port transport behind the `serialport` feature
//!
//! ## Quick Start
//!
//! ```no_run
//! use bq_settings::{convert, Target};
//!
//! fn main() -> bq_settings::Result<()> {
//!     // TI export -> intermediate CSV
//!     let conversion = convert("bq76952.gg.csv", "bq76952.csv", Target::Csv)?;
//!     println!("{} settings converted", conversion.written);
//!
//!     // Intermediate CSV -> binary
//!     convert("bq76952.csv", "bq76952.bin", Target::Binary)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Settings
//!
//! A [`Setting`] is one configuration write: a kind, a payload width, an
//! address and up to four bytes of data.
//!
//! | Kind | Code | Meaning |
//! |------|:----:|---------|
//! | [`SettingKind::Direct`] | 0 | Direct command, address is the register |
//! | [`SettingKind::Subcommand`] | 1 | Subcommand, address is the subcommand id |
//! | [`SettingKind::RAM`] | 2 | Data memory write, address is the field |
//!
//! ```
//! use bq_settings::{Setting, SettingKind};
//!
//! let setting = Setting::new(SettingKind::RAM, 2, 0x9235, 3500)?;
//! assert_eq!(setting.to_csv(), "RAM,2,0x9235,3500");
//! assert_eq!(setting.to_bytes(), [0x0A, 0x35, 0x92, 0xAC, 0x0D, 0x00, 0x00]);
//! # Ok::<(), bq_settings::SettingsError>(())
//! ```
//!
//! ### Binary record
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | bits 1:0 kind, bits 4:2 byte width, bits 7:5 zero |
//! | 1-2 | address, little-endian |
//! | 3-6 | data, little-endian |
//!
//! ## Loading Files
//!
//! ```no_run
//! use bq_settings::{load, load_with, ErrorPolicy, Format, LoadOptions};
//!
//! // Stop at the first bad line
//! let settings = load("bq76952.csv", Format::Csv)?;
//!
//! // Keep going and collect the bad lines
//! let options = LoadOptions::new().with_policy(ErrorPolicy::Continue);
//! let loaded = load_with("bq76952.gg.csv", Format::Ti, &options)?;
//! for err in &loaded.errors {
//!     eprintln!("skipped: {}", err);
//! }
//! # Ok::<(), bq_settings::SettingsError>(())
//! ```
//!
//! ## Uploading
//!
//! ```no_run
//! use bq_settings::{load, Format, Transfer, TransferConfig};
//! use std::net::TcpStream;
//!
//! let settings = load("bq76952.bin", Format::Binary)?;
//! let link = TcpStream::connect("192.168.1.50:7000")?;
//!
//! let config = TransferConfig::new().with_count_ack(true);
//! let report = Transfer::with_config(link, config).send(&settings)?;
//! println!("{} records acknowledged", report.sent);
//! # Ok::<(), bq_settings::SettingsError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use bq_settings::{convert, SettingsError, Target};
//!
//! match convert("bq76952.gg.csv", "bq76952.bin", Target::Binary) {
//!     Ok(conversion) => println!("wrote {} settings", conversion.written),
//!     Err(SettingsError::FileNotFound { path }) => {
//!         println!("missing input: {}", path.display());
//!     }
//!     Err(SettingsError::Parse { line, source }) => {
//!         println!("line {}: {}", line, source);
//!     }
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade: a summary per file at `info`,
//! each parsed record at `debug`, and conversion arithmetic at `trace`.
//! Install any logger in the application to see it.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod error;
pub mod expression;
pub mod format;
pub mod packing;
mod pipeline;
mod setting;
pub mod ti;
mod transfer;
#[cfg(feature = "serialport")]
mod transport;
pub mod utils;

// Public re-exports
pub use error::{Result, SettingsError};
pub use expression::Expression;
pub use format::{ErrorPolicy, Format, LoadOptions, Loaded};
pub use packing::{DataType, NumericType};
pub use pipeline::{convert, convert_with, load, load_with, save, Conversion, Target};
pub use setting::{Setting, SettingKind, CSV_HEADER, MAX_BYTE_WIDTH, SETTING_SIZE};
pub use transfer::{transfer_file, Transfer, TransferConfig, TransferReport, ACK_OK};
#[cfg(feature = "serialport")]
pub use transport::{SerialConfig, SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
