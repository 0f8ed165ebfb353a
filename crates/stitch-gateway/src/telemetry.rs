// crates/stitch-gateway/src/telemetry.rs
//
// Tracing subscriber setup for the gateway binary.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `log_level`;
/// `log_format = "json"` switches to one JSON object per event.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if log_format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
