//! Diagnostic logging setup.

use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// The default level is `info`, or `debug` when `verbose` is set.
/// `RUST_LOG` overrides both.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
