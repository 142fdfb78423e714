//! Tracing setup for binaries and tests embedding the pipeline.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "deposit_core=info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a subscriber was already installed, so calling it
/// more than once is harmless.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_FILTER)
}

pub fn init_tracing_with(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .compact()
        .with_target(true)
        .with_env_filter(env_filter)
        .try_init()
        .is_ok()
}
