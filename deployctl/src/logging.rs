//! Diagnostic logging for deployctl.
//!
//! Two output channels exist. Tracing events describe how a command was
//! resolved (workspace source, target parsing, routing decisions) and are
//! off below `warn` unless `RUST_LOG` asks for more. Everything a user is
//! meant to read, including errors, goes through [`crate::io::ui::Ui`] so it
//! honours `--plain` and never depends on the log filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the stderr subscriber for the binary.
///
/// ```bash
/// RUST_LOG=deployctl=debug deployctl targets -p shop
/// ```
pub fn init() {
    let filter = filter_from(std::env::var("RUST_LOG").ok().as_deref());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

/// Blank or unparsable directives fall back to `warn`.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
