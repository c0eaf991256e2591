//! Logging setup for the `ddup` binary.
//!
//! Built on the `log` facade with an `env_logger` backend. Level selection,
//! in priority order: `RUST_LOG` if set, then `--quiet` (errors only), then
//! `-v`/`-vv` (debug/trace), default info. Debug builds log with timestamp
//! and module path; release builds use a compact level-and-message format.

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Initialize the logging subsystem from CLI verbosity flags.
///
/// Call once at startup before any logging; `env_logger` panics on a second
/// initialization.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level_for(verbose, quiet));
    }

    if cfg!(debug_assertions) {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                buf.timestamp(),
                record.level(),
                record.module_path().unwrap_or("?"),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| writeln!(buf, "[{:<5}] {}", record.level(), record.args()));
    }

    builder.init();
}

fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
