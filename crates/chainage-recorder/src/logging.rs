/*!
Logging setup for the recorder binary.

Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG`. When `RUST_LOG` is not
set, a default is chosen from the build profile before the filter is read.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Default filter for debug builds
const DEBUG_FILTER: &str = "debug,chainage_lib::matcher=info";
/// Default filter for release builds
const RELEASE_FILTER: &str = "info";

/// Filter directive used when `RUST_LOG` is absent
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        DEBUG_FILTER
    } else {
        RELEASE_FILTER
    }
}

/// Initialize the global subscriber. Safe to call more than once; later calls are ignored.
pub fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter);
    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global subscriber already installed");
    }
}

/// Log the package name and version at startup
pub fn log_version_info() {
    tracing::info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEBUG_FILTER).is_ok());
        assert!(EnvFilter::try_new(RELEASE_FILTER).is_ok());
    }

    #[test]
    fn test_setup_logging_is_idempotent() {
        setup_logging();
        setup_logging();
    }
}
