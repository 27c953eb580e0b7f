pub mod api;
pub mod core;

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Install the process-wide logger. `RUST_LOG` wins over the `info` default.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .format_timestamp_millis()
        .try_init();
    });
}
