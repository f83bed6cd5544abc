//! Logging setup for host applications
//!
//! The library only emits `tracing` events. Hosts without their own
//! subscriber can install a formatted one here.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"callvideo=info"`) when the variable is unset or
/// invalid.
///
/// Returns false when a global subscriber was already installed; calling it
/// more than once is harmless.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_logging("callvideo=debug");
        assert!(!init_logging("callvideo=trace"));
    }
}
