//! Logger initialisation for the demo binary and tests.

use env_logger::{Builder, Env};
use log::{debug, LevelFilter};

/// Initialises the global logger. Debug level when `verbose`, info
/// otherwise; `RUST_LOG` overrides either.
///
/// Safe to call more than once: a second initialisation is ignored so
/// tests can each set the logger up without panicking.
pub fn init(verbose: bool) {
    let default = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let env = Env::default().default_filter_or(default.to_string());
    if Builder::from_env(env).try_init().is_err() {
        debug!("logger already initialised, keeping the existing one");
    }
}
