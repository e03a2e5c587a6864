//! Execution identity shared by all proxies

use serde::{Deserialize, Serialize};

/// Action allowing a principal to open database connections
pub const CONNECT_ACTION: &str = "rds-db:connect";

/// Role assumed by the proxy service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionIdentity {
    pub name: String,
    pub id: String,
    /// Service principal allowed to assume the role
    pub trusted_principal: String,
}

/// Allow statement attached to an identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl PolicyStatement {
    /// Connect permission on the given resources
    pub fn connect(resources: Vec<String>) -> Self {
        Self { actions: vec![CONNECT_ACTION.to_string()], resources }
    }
}
