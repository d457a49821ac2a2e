// src/utils/logging.rs
//! Logging configuration and utilities
//!
//! Uses `env_logger` under the hood. Worker threads are named after their
//! device, so the thread name is part of every line.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes logging at Info unless `RUST_LOG` says otherwise
pub fn init_logging() {
    init_with_default(LevelFilter::Info);
}

/// Initializes logging at Debug unless `RUST_LOG` says otherwise
///
/// Used by `start --verbose` to follow work swaps and window resets.
pub fn init_verbose_logging() {
    init_with_default(LevelFilter::Debug);
}

fn init_with_default(level: LevelFilter) {
    let mut builder = common_log_config();

    if env::var("RUST_LOG").is_err() {
        builder.filter_level(level);
    } else {
        builder.parse_env("RUST_LOG");
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

/// Base builder: `[<ts> <level> <thread> <module>:<line>] <message>` on stdout
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let thread = std::thread::current();
            let thread = thread.name().unwrap_or("main").to_owned();
            let module = record.module_path().unwrap_or_default();
            let line = record.line().unwrap_or(0);

            writeln!(
                buf,
                "[{} {} {} {}:{}] {}",
                ts,
                record.level(),
                thread,
                module,
                line,
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
