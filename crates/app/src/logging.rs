//! Logging setup for the terminal front end.
//!
//! Log lines go to stderr through `env_logger`. `RUST_LOG` wins when set;
//! otherwise `--quiet` and `-v` pick the level, defaulting to warnings so the
//! countdown is not drowned out.

use env_logger::Builder;
use log::LevelFilter;
use std::env;

/// Initialize the logger. Call once, before any log macro fires.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    builder.format_timestamp_secs().init();
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
