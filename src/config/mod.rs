//! # Configuration Management
//!
//! Layered configuration for the provisioner using the `config` crate:
//!
//! 1. Built-in defaults matching the production LAT deployment
//! 2. An optional YAML file
//! 3. Environment overrides prefixed with `LAT__`, nested with `__`
//!    (e.g. `LAT__DATABASE__ALLOCATED_STORAGE_GB=200`)
//!
//! The merged result is validated before it is handed to the orchestrator.

pub mod settings;

pub use settings::{
    DatabaseSettings, NetworkSettings, ObservabilityConfig, ProvisionConfig, ProxySettings,
};

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::errors::Result;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "LAT";

/// Separator between prefix and nested keys
pub const ENV_SEPARATOR: &str = "__";

/// Load and validate the configuration, layering `path` (if any) and the environment over defaults
pub fn load_config(path: Option<&Path>) -> Result<ProvisionConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        debug!(path = %path.display(), "Loading configuration file");
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("network.private_cidrs")
            .with_list_parse_key("network.isolated_subnet_ids")
            .with_list_parse_key("network.additional_security_groups")
            .try_parsing(true),
    );

    let config: ProvisionConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
