//! # Error Handling
//!
//! Fatal errors abort the provisioning sequence; warnings are collected and
//! reported alongside the outputs.

pub mod types;

pub use types::{ProvisionError, ProvisionWarning, Result};

/// Short alias used across the crate
pub type Error = ProvisionError;
