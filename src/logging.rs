//! Logging setup.
//!
//! Diagnostics go to stderr through `tracing-subscriber`, leaving stdout for
//! scan output. `RUST_LOG` overrides the level chosen from the CLI flags.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Defaults to `warn`, `debug` with `verbose` and `error` with `quiet`.
/// Calling it twice is harmless.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "portsweep=debug,warn"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
