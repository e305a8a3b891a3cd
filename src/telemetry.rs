//! Tracing setup: an `EnvFilter`-driven subscriber writing human-readable
//! logs to stderr. `TWIN2MC_LOG` (falling back to `RUST_LOG`) controls
//! verbosity; default is `info`.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_env("TWIN2MC_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
