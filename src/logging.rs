//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::Env;

/// Setup logging for the server.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` is used.
pub fn setup_logging(default_level: &str) {
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
