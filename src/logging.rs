// Tracing subscriber setup shared by the binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "arena_relay=info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `verbose` lowers the crate's own level to debug.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "arena_relay=debug,tower_http=info"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .try_init();
}
