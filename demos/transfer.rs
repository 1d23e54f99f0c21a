//! Example: Uploading settings over a serial port
//!
//! Run with: cargo run --example transfer --features serialport -- <port> <file> [baud]
//!
//! This example demonstrates:
//! - Opening a serial port
//! - Loading a settings file in any supported format
//! - Sending it with the stop-and-wait protocol
//!
//! The file format is taken from its extension: `.bin` is binary,
//! `.gg.csv` a TI export, anything else intermediate CSV.

use bq_settings::{
    load, Format, SerialConfig, SerialTransport, SettingsError, Transfer, TransferConfig,
};

fn main() -> bq_settings::Result<()> {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or("info".to_string()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: transfer <port> <file> [baud]");
        std::process::exit(2);
    }

    let mut config = SerialConfig::new(args[0].as_str());
    if let Some(baud) = args.get(2) {
        let baud = baud
            .parse()
            .map_err(|_| SettingsError::invalid_field("baud rate", baud, "expected a number"))?;
        config = config.with_baud_rate(baud);
    }

    let path = &args[1];
    let format = Format::detect_upload(path);
    let settings = load(path, format)?;
    println!("Loaded {} settings from {} ({})", settings.len(), path, format);

    let port = SerialTransport::open(&config)?;
    let mut transfer = Transfer::with_config(port, TransferConfig::new().with_count_ack(true));

    match transfer.send(&settings) {
        Ok(report) => println!(
            "Transfer complete: {} records, {} bytes",
            report.sent, report.bytes_written
        ),
        Err(SettingsError::Protocol { record, ack }) => {
            eprintln!("Device rejected record {} (ack 0x{:02X})", record, ack);
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    }

    Ok(())
}
