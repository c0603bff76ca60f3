use crate::config::PeripheralConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: session lifecycle at info, other crates quiet
pub const DEFAULT_FILTER: &str = "multi_ble_peripheral=info,warn";

/// Development filter: per-command and routing detail from this crate
pub const DEBUG_FILTER: &str = "multi_ble_peripheral=debug,info";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install a JSON subscriber for peripheral hosts running unattended.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging() -> bool {
    let json = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .with_current_span(false);

    let installed = tracing_subscriber::registry()
        .with(filter_or(DEFAULT_FILTER))
        .with(json)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(filter = DEFAULT_FILTER, "Peripheral logging initialized");
    }
    installed
}

/// Install a human-readable subscriber with session and command detail
pub fn init_logging_pretty() -> bool {
    let pretty = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .pretty();

    let installed = tracing_subscriber::registry()
        .with(filter_or(DEBUG_FILTER))
        .with(pretty)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(filter = DEBUG_FILTER, "Peripheral logging initialized (pretty)");
    }
    installed
}

/// Pick the output format from `BLE_PERIPHERAL_LOG_JSON`
pub fn init_from_config(config: &PeripheralConfig) -> bool {
    if config.log_json {
        init_logging()
    } else {
        init_logging_pretty()
    }
}
