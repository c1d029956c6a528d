//! Tracing subscriber setup for the binary.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`.
///
/// Logs go to stderr so the KPI tables and `--json` output on stdout stay
/// machine-readable.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
