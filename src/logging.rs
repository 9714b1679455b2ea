use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
