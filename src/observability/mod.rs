//! # Observability
//!
//! Structured logging for the provisioner. Each run is wrapped in a
//! [`provision_span!`](crate::provision_span) and every stage emits events
//! with structured fields.

pub mod logging;

pub use logging::{init_logging, log_config_info};
