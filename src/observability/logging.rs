//! # Structured Logging
//!
//! Span macros and subscriber setup built on the tracing ecosystem. Every
//! provisioning run gets its own span carrying a random `run_id`, so all
//! stage events of one run can be correlated in aggregated logs.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{ObservabilityConfig, ProvisionConfig};

/// Create a tracing span for one provisioning run.
///
/// ```rust,ignore
/// let span = provision_span!(stack_id);
/// let span = provision_span!(stack_id, region = "ca-central-1");
/// ```
#[macro_export]
macro_rules! provision_span {
    ($stack:expr) => {
        tracing::info_span!(
            "provision_run",
            stack = %$stack,
            run_id = %uuid::Uuid::new_v4()
        )
    };
    ($stack:expr, $($field:tt)*) => {
        tracing::info_span!(
            "provision_run",
            stack = %$stack,
            run_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level is used, raised to
/// `debug` when `verbose` is on. Installing twice is ignored so tests and
/// embedding callers can call this freely.
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder().with_env_filter(filter).with_target(false);

    let _ = if config.json_logging {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
}

/// Log the effective configuration at startup
pub fn log_config_info(config: &ProvisionConfig) {
    tracing::info!(
        stack_id = %config.stack_id,
        region = %config.region,
        engine_version = %config.database.engine_version,
        instance_class = %config.database.instance_class,
        allocated_storage_gb = config.database.allocated_storage_gb,
        max_allocated_storage_gb = config.database.max_allocated_storage_gb,
        private_cidrs = config.network.private_cidrs.len(),
        require_tls = config.proxy.require_tls,
        "LAT database provisioner configuration"
    );
}
