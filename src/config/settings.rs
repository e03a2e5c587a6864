//! # Configuration Settings
//!
//! Defines the configuration structure of the provisioner. Defaults mirror the
//! production LAT deployment.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{
    Cidr, Engine, IsolatedSegment, NetworkTopology, StackId, StorageSpec, SubnetId, SubnetKind,
    VpcId,
};
use crate::errors::{ProvisionError, Result};

/// Main provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Deployment identifier; prefix of every resource name
    #[validate(length(min = 1, max = 40, message = "Stack id must be 1 to 40 characters"))]
    pub stack_id: String,

    /// Region the stack is deployed to
    #[validate(length(min = 1, message = "Region cannot be empty"))]
    pub region: String,

    /// Database instance configuration
    #[validate(nested)]
    pub database: DatabaseSettings,

    /// Network topology configuration
    #[validate(nested)]
    pub network: NetworkSettings,

    /// Proxy configuration
    #[validate(nested)]
    pub proxy: ProxySettings,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            stack_id: "DatabaseStack".to_string(),
            region: "ca-central-1".to_string(),
            database: DatabaseSettings::default(),
            network: NetworkSettings::default(),
            proxy: ProxySettings::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProvisionConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(ProvisionError::from)?;
        self.validate_custom()
    }

    /// Checks the validator crate cannot express
    fn validate_custom(&self) -> Result<()> {
        self.stack()?;
        self.database.engine()?;
        self.database.storage().check_capacity()?;

        Cidr::parse(&self.network.perimeter_cidr)?;
        for cidr in &self.network.private_cidrs {
            Cidr::parse(cidr)?;
        }

        Ok(())
    }

    /// Parsed stack identifier
    pub fn stack(&self) -> Result<StackId> {
        StackId::parse(&self.stack_id)
    }
}

/// Database instance configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Pinned PostgreSQL version
    #[validate(length(min = 1, message = "Engine version cannot be empty"))]
    pub engine_version: String,

    /// Instance class
    #[validate(length(min = 1, message = "Instance class cannot be empty"))]
    pub instance_class: String,

    /// Name of the initial database
    #[validate(length(min = 1, max = 63, message = "Database name must be 1 to 63 characters"))]
    pub database_name: String,

    /// Port the engine listens on
    #[validate(range(min = 1150, max = 65535, message = "Port must be between 1150 and 65535"))]
    pub port: u16,

    /// Storage allocated at creation, in GiB
    pub allocated_storage_gb: u32,

    /// Autoscale ceiling, in GiB
    pub max_allocated_storage_gb: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine_version: "16.3".to_string(),
            instance_class: "db.t4g.medium".to_string(),
            database_name: "lat".to_string(),
            port: 5432,
            allocated_storage_gb: 100,
            max_allocated_storage_gb: 150,
        }
    }
}

impl DatabaseSettings {
    pub fn engine(&self) -> Result<Engine> {
        Engine::postgres(self.engine_version.clone())
    }

    pub fn storage(&self) -> StorageSpec {
        StorageSpec {
            allocated_gb: self.allocated_storage_gb,
            max_allocated_gb: self.max_allocated_storage_gb,
        }
    }
}

/// Network topology as supplied by the network stack
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NetworkSettings {
    /// Virtual network id
    #[validate(length(min = 1, message = "VPC id cannot be empty"))]
    pub vpc_id: String,

    /// Subnets of the isolated segment
    #[validate(length(min = 1, message = "At least one isolated subnet is required"))]
    pub isolated_subnet_ids: Vec<String>,

    /// Routing posture of those subnets
    pub subnet_kind: SubnetKind,

    /// Private-subnet CIDRs; empty for a freshly created network
    pub private_cidrs: Vec<String>,

    /// CIDR of the broader network perimeter
    #[validate(length(min = 1, message = "Perimeter CIDR cannot be empty"))]
    pub perimeter_cidr: String,

    /// Extra security groups attached to the instance next to its own
    pub additional_security_groups: Vec<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            vpc_id: "vpc-lat".to_string(),
            isolated_subnet_ids: vec!["subnet-isolated-a".to_string(), "subnet-isolated-b".to_string()],
            subnet_kind: SubnetKind::PrivateIsolated,
            private_cidrs: vec![],
            perimeter_cidr: "10.0.0.0/16".to_string(),
            additional_security_groups: vec![],
        }
    }
}

impl NetworkSettings {
    /// Topology handed to the orchestrator
    pub fn topology(&self) -> NetworkTopology {
        NetworkTopology {
            segment: IsolatedSegment {
                vpc_id: VpcId::new(self.vpc_id.as_str()),
                subnet_ids: self.isolated_subnet_ids.iter().map(|s| SubnetId::new(s.as_str())).collect(),
                subnet_kind: self.subnet_kind,
            },
            private_cidrs: self.private_cidrs.clone(),
            perimeter_cidr: self.perimeter_cidr.clone(),
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProxySettings {
    /// Require TLS between clients and the proxy
    pub require_tls: bool,

    /// Stable name given to every proxy's routing target group
    #[validate(length(min = 1, max = 63, message = "Target group name must be 1 to 63 characters"))]
    pub target_group_name: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self { require_tls: false, target_group_name: "default".to_string() }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}
