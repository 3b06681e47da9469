//! JSON-lines logging on stderr.

use std::io;

use structured_logger::json::new_writer;
use structured_logger::Builder;

/// Install the global logger. `debug` enables per-entity decision logs.
///
/// Must be called at most once per process.
pub fn init_logging(debug: bool) {
    Builder::with_level(if debug { "debug" } else { "info" })
        .with_target_writer("*", new_writer(io::stderr()))
        .init();
}
