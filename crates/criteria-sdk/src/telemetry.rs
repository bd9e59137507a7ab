//! Tracing initialisation

use crate::error::{Result, SdkError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "criteria_sdk=info,criteria_runtime=info,criteria_diff=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| SdkError::TelemetryError(format!("Failed to initialize tracing: {}", e)))
}
