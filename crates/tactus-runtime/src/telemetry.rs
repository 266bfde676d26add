//! Tracing bootstrap for the control loop binary.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies across
//! the workspace crates. `TACTUS_LOG_FORMAT=json` switches the fmt layer to
//! newline-delimited JSON for log shipping; anything else keeps the compact
//! human format.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn json_output() -> bool {
    std::env::var("TACTUS_LOG_FORMAT").as_deref() == Ok("json")
}

/// Install the global subscriber. Call once, before the loop starts.
pub fn init_telemetry(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json_output() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so only
    // the format selection is covered here.
    #[test]
    fn log_format_selection_follows_the_env() {
        // SAFETY: this is the only test in the binary touching
        // TACTUS_LOG_FORMAT; it is set and removed around the assertions.
        unsafe {
            std::env::remove_var("TACTUS_LOG_FORMAT");
        }
        assert!(!json_output());

        // SAFETY: same as above.
        unsafe {
            std::env::set_var("TACTUS_LOG_FORMAT", "json");
        }
        assert!(json_output());

        // SAFETY: same as above.
        unsafe {
            std::env::set_var("TACTUS_LOG_FORMAT", "pretty");
        }
        assert!(!json_output());

        // SAFETY: same as above.
        unsafe {
            std::env::remove_var("TACTUS_LOG_FORMAT");
        }
    }
}
