//! Deterministic resource naming
//!
//! Every name is a pure function of the deployment identifier, so a re-run
//! after a partial failure addresses exactly the same resources.

use serde::Serialize;
use std::collections::BTreeMap;

use super::id::StackId;
use super::role::Role;

/// Namespace segment shared by every secret path
pub const SECRET_NAMESPACE: &str = "LAT";

/// Trusted principal of the proxy execution identity
pub const PROXY_SERVICE_PRINCIPAL: &str = "rds.amazonaws.com";

/// Storage location of a role's credential secret
pub fn secret_path(stack: &StackId, role: Role) -> String {
    let suffix = match role {
        Role::Admin => "credentials/rdsDbCredential",
        Role::ApplicationUser => "userCredentials/rdsDbCredential",
        Role::TableCreator => "userCredentials/TableCreator",
    };
    format!("{}-{}/{}", stack, SECRET_NAMESPACE, suffix)
}

/// Name of the proxy serving a role
pub fn proxy_name(stack: &StackId, role: Role) -> String {
    match role {
        Role::Admin => format!("{}-proxy-admin", stack),
        Role::ApplicationUser => format!("{}-proxy", stack),
        Role::TableCreator => format!("{}-proxy-table-creator", stack),
    }
}

/// Identifier of the database instance
pub fn instance_identifier(stack: &StackId) -> String {
    format!("{}-database", stack)
}

/// Name of the custom engine parameter group
pub fn parameter_group_name(stack: &StackId) -> String {
    format!("{}-rdsParameterGroup", stack)
}

/// Name of the execution identity shared by all proxies
pub fn execution_identity_name(stack: &StackId) -> String {
    format!("{}-DBProxyRole", stack)
}

/// Name of the subnet group placing the instance in the isolated segment
pub fn subnet_group_name(stack: &StackId) -> String {
    format!("{}-database-subnets", stack)
}

/// Every deterministic name of one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNames {
    pub stack_id: StackId,
    pub instance: String,
    pub parameter_group: String,
    pub subnet_group: String,
    pub execution_identity: String,
    pub secrets: BTreeMap<Role, String>,
    pub proxies: BTreeMap<Role, String>,
}

impl ResourceNames {
    pub fn for_stack(stack: &StackId) -> Self {
        Self {
            stack_id: stack.clone(),
            instance: instance_identifier(stack),
            parameter_group: parameter_group_name(stack),
            subnet_group: subnet_group_name(stack),
            execution_identity: execution_identity_name(stack),
            secrets: Role::ALL.iter().map(|r| (*r, secret_path(stack, *r))).collect(),
            proxies: Role::ALL.iter().map(|r| (*r, proxy_name(stack, *r))).collect(),
        }
    }
}
