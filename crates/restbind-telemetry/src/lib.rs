//! Observability for restbind.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: request, duration and binding-failure metrics through the
//!   `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use restbind_telemetry::{init_telemetry, LogConfig};
//!
//! init_telemetry(&LogConfig::production()).expect("telemetry");
//! ```

#![doc(html_root_url = "https://docs.rs/restbind-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};
pub use metrics::{describe_metrics, record_binding_failure, record_request, record_shadow_mismatch};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging and registers metric descriptions.
///
/// # Errors
///
/// Returns `TelemetryError` if logging cannot be initialized.
pub fn init_telemetry(logging: &LogConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    describe_metrics();
    Ok(())
}
