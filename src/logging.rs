//! Tracing subscriber setup. `RUST_LOG` filters (default `info`);
//! `CASHDROP_LOG_JSON=1` switches to one JSON object per line.

use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_JSON_VAR: &str = "CASHDROP_LOG_JSON";

pub fn json_enabled() -> bool {
    matches!(std::env::var(LOG_JSON_VAR).as_deref(), Ok("1") | Ok("true"))
}

/// Installs the global subscriber on stderr, keeping stdout for command output.
/// A second call is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder().with_env_filter(filter).with_writer(std::io::stderr);

    let _ = if json_enabled() {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.compact().with_target(false).try_init()
    };
}
