//! Example: Converting a settings file
//!
//! Run with: cargo run --example convert -- <input> <output> [binary|csv] [--continue]
//!
//! This example demonstrates:
//! - Converting a TI export to the intermediate CSV
//! - Converting an intermediate CSV to binary
//! - Keeping the good lines of a damaged file
//!
//! Set `RUST_LOG=debug` to see every parsed record.

use bq_settings::{convert_with, ErrorPolicy, LoadOptions, Target};

fn main() -> bq_settings::Result<()> {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or("info".to_string()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let keep_going = args.iter().any(|arg| arg == "--continue");
    let positional: Vec<&String> = args.iter().filter(|arg| !arg.starts_with("--")).collect();

    let (input, output) = match positional.as_slice() {
        [input, output, ..] => (input.as_str(), output.as_str()),
        _ => {
            eprintln!("usage: convert <input> <output> [binary|csv] [--continue]");
            std::process::exit(2);
        }
    };
    let target: Target = match positional.get(2) {
        Some(target) => target.parse()?,
        None => Target::default(),
    };

    let policy = if keep_going {
        ErrorPolicy::Continue
    } else {
        ErrorPolicy::Abort
    };
    let options = LoadOptions::new().with_policy(policy);

    let conversion = convert_with(input, output, target, &options)?;
    println!(
        "{} -> {}: {} settings written ({} input)",
        input, output, conversion.written, conversion.source
    );
    for err in &conversion.skipped {
        println!("  skipped {}", err);
    }

    Ok(())
}
