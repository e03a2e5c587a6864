//! Connection-pooling proxy domain types
//!
//! A [`Proxy`] can only be built by the registrar after the target group
//! returned at creation time has been renamed, so holding a `Proxy` means its
//! routing target carries the stable identity consumers look up.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::{SecurityGroupId, SubnetId, TargetGroupId};
use super::role::Role;
use super::secret::SecretHandle;

/// Engine family the proxy speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineFamily {
    Postgresql,
}

/// Request to create one proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySpec {
    pub name: String,
    pub role: Role,
    pub engine_family: EngineFamily,
    pub target_instance: String,
    /// The single secret the proxy authenticates with
    pub secret: SecretHandle,
    pub execution_identity: String,
    pub subnet_ids: Vec<SubnetId>,
    pub security_groups: Vec<SecurityGroupId>,
    pub require_tls: bool,
}

/// Platform handle of a created proxy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyHandle {
    pub name: String,
    pub id: String,
}

/// Creation-time handle to the routing target group of one specific proxy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetGroupHandle {
    pub id: TargetGroupId,
    /// Proxy the group was created for
    pub proxy_name: String,
    /// Name the platform assigned
    pub name: String,
}

/// Result of a proxy creation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCreation {
    pub proxy: ProxyHandle,
    pub target_group: TargetGroupHandle,
    /// Secret the existing or new proxy is bound to
    pub bound_secret: SecretHandle,
    /// TLS requirement the proxy actually has
    pub require_tls: bool,
    /// Security groups the proxy actually has
    pub security_groups: Vec<SecurityGroupId>,
}

/// Proxy endpoint as `host:port`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A proxy whose target-group identity has been corrected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proxy {
    role: Role,
    handle: ProxyHandle,
    endpoint: Endpoint,
    target_group: TargetGroupHandle,
    bound_secret: SecretHandle,
    require_tls: bool,
}

impl Proxy {
    pub(crate) fn new(
        role: Role,
        handle: ProxyHandle,
        endpoint: Endpoint,
        target_group: TargetGroupHandle,
        bound_secret: SecretHandle,
        require_tls: bool,
    ) -> Self {
        Self { role, handle, endpoint, target_group, bound_secret, require_tls }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn handle(&self) -> &ProxyHandle {
        &self.handle
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Stable target-group identity
    pub fn target_group(&self) -> &TargetGroupHandle {
        &self.target_group
    }

    pub fn bound_secret(&self) -> &SecretHandle {
        &self.bound_secret
    }

    pub fn require_tls(&self) -> bool {
        self.require_tls
    }
}
