use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,orma::sql=info";

/// Install the global `tracing` subscriber.
///
/// Uses the `RUST_LOG` environment variable for filtering, falling back to
/// [`DEFAULT_FILTER`]. Statement reports of the data layer are emitted
/// under the `orma::sql` target.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();
}

/// Like [`init_tracing`], but does nothing if a subscriber is already set.
pub fn try_init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .try_init()
        .is_ok()
}
