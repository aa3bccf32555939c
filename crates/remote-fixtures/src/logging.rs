//! Tracing subscriber setup for test runs.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

static INIT: OnceLock<bool> = OnceLock::new();

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install a global subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Only the first call in
/// a process does anything; it returns whether a subscriber was installed by
/// this call.
pub fn init_logging(format: LogFormat, default_filter: &str) -> bool {
    let mut installed = false;
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let result = match format {
            LogFormat::Pretty => {
                let layer = fmt::layer().with_target(false).with_thread_names(true);
                tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))
            }
            LogFormat::Json => {
                let layer = fmt::layer().json().with_thread_names(true);
                tracing::subscriber::set_global_default(Registry::default().with(filter).with(layer))
            }
        };
        installed = result.is_ok();
        installed
    });
    installed
}

/// Whether `init_logging` has run in this process
#[must_use]
pub fn is_initialized() -> bool {
    INIT.get().is_some()
}
