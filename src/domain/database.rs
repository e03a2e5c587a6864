//! Managed database instance domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::network::{IsolatedSegment, NetworkAttachment};
use crate::errors::{ProvisionError, Result};

/// Largest storage allocation the platform accepts for a single instance
pub const PLATFORM_STORAGE_LIMIT_GB: u32 = 65_536;

/// Parameter that forces SSL on every engine-level connection
pub const FORCE_SSL_PARAMETER: &str = "rds.force_ssl";

/// Database engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Pinned engine version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engine {
    pub kind: EngineKind,
    pub version: String,
}

impl Engine {
    /// PostgreSQL at a pinned `major.minor` version
    pub fn postgres(version: impl Into<String>) -> Result<Self> {
        let engine = Self { kind: EngineKind::Postgres, version: version.into() };
        engine.major_version()?;
        Ok(engine)
    }

    /// Major component of the version
    pub fn major_version(&self) -> Result<u32> {
        self.version
            .split('.')
            .next()
            .and_then(|major| major.parse().ok())
            .ok_or_else(|| {
                ProvisionError::validation_field(
                    format!("Engine version '{}' has no numeric major component", self.version),
                    "database.engine_version",
                )
            })
    }

    /// Parameter group family, e.g. `postgres16`
    pub fn parameter_family(&self) -> Result<String> {
        Ok(format!("{}{}", self.kind, self.major_version()?))
    }
}

/// Allocated storage and its autoscale ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSpec {
    pub allocated_gb: u32,
    pub max_allocated_gb: u32,
}

impl StorageSpec {
    /// Fail when the request exceeds the ceiling or the ceiling exceeds the platform limit
    pub fn check_capacity(&self) -> Result<()> {
        if self.allocated_gb > self.max_allocated_gb {
            return Err(ProvisionError::capacity_exceeded(self.allocated_gb, self.max_allocated_gb));
        }
        if self.max_allocated_gb > PLATFORM_STORAGE_LIMIT_GB {
            return Err(ProvisionError::capacity_exceeded(
                self.max_allocated_gb,
                PLATFORM_STORAGE_LIMIT_GB,
            ));
        }
        if self.allocated_gb == 0 {
            return Err(ProvisionError::validation_field(
                "Allocated storage must be at least 1 GiB",
                "database.allocated_storage_gb",
            ));
        }
        Ok(())
    }
}

/// Fixed operational policy of the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalPolicy {
    pub multi_az: bool,
    pub backup_retention_days: u16,
    pub delete_automated_backups: bool,
    pub auto_minor_version_upgrade: bool,
    pub allow_major_version_upgrade: bool,
    pub deletion_protection: bool,
    pub storage_encrypted: bool,
    pub monitoring_interval_seconds: u16,
    pub log_retention_days: u16,
    pub publicly_accessible: bool,
}

impl OperationalPolicy {
    /// The policy every LAT instance runs with
    pub const fn standard() -> Self {
        Self {
            multi_az: false,
            backup_retention_days: 7,
            delete_automated_backups: true,
            auto_minor_version_upgrade: true,
            allow_major_version_upgrade: false,
            deletion_protection: true,
            storage_encrypted: true,
            monitoring_interval_seconds: 60,
            log_retention_days: 90,
            publicly_accessible: false,
        }
    }
}

impl Default for OperationalPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Custom engine parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub name: String,
    pub family: String,
    pub description: String,
    pub parameters: BTreeMap<String, String>,
}

impl ParameterGroup {
    /// Parameter group with engine-level SSL enforcement turned off.
    ///
    /// Connections inside the isolated segment are trusted; encryption in
    /// transit, when needed, is enforced at the proxy or network layer.
    pub fn relaxed_ssl(name: impl Into<String>, engine: &Engine) -> Result<Self> {
        let mut parameters = BTreeMap::new();
        parameters.insert(FORCE_SSL_PARAMETER.to_string(), "0".to_string());
        Ok(Self {
            name: name.into(),
            family: engine.parameter_family()?,
            description: "LAT parameter group with engine-level SSL enforcement disabled"
                .to_string(),
            parameters,
        })
    }

    pub fn forces_ssl(&self) -> bool {
        self.parameters.get(FORCE_SSL_PARAMETER).map(|v| v == "1").unwrap_or(false)
    }
}

/// Everything the platform needs to create the instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub identifier: String,
    pub engine: Engine,
    pub instance_class: String,
    pub database_name: String,
    pub port: u16,
    pub master_username: String,
    /// Storage location of the admin secret holding the master password
    pub credentials_secret: String,
    pub storage: StorageSpec,
    pub policy: OperationalPolicy,
    pub parameter_group: String,
    pub segment: IsolatedSegment,
    pub subnet_group: String,
    pub additional_security_groups: Vec<String>,
}

/// A provisioned database instance together with its network attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub identifier: String,
    /// Platform-assigned resource id, used to scope connect permissions
    pub resource_id: String,
    pub engine: Engine,
    pub instance_class: String,
    pub database_name: String,
    pub port: u16,
    pub storage: StorageSpec,
    pub policy: OperationalPolicy,
    pub parameter_group: String,
    pub attachment: NetworkAttachment,
}

impl DatabaseInstance {
    /// Resource pattern covering every database user on this instance
    pub fn connect_resource(&self) -> String {
        format!("dbuser:{}/*", self.resource_id)
    }
}
