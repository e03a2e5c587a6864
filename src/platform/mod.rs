//! External platform collaborators
//!
//! The provisioning core never talks to a cloud API directly. Each external
//! capability is an async trait so the orchestrator can run against a real
//! backend or the in-memory [`InMemoryPlatform`].
//!
//! Every operation is idempotent by name: creating something that already
//! exists with a compatible shape returns the existing resource.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{
    DatabaseInstance, DatabaseSpec, Endpoint, ExecutionIdentity, IngressRule, ParameterGroup,
    PolicyStatement, ProxyCreation, ProxyHandle, ProxySpec, SecurityGroupId, TargetGroupHandle,
};
use crate::errors::Result;

pub use memory::{FailPoint, InMemoryPlatform};

/// Managed relational database service
#[async_trait]
pub trait DatabasePlatform: Send + Sync {
    /// Create or converge the custom parameter group
    async fn ensure_parameter_group(&self, group: &ParameterGroup) -> Result<()>;

    /// Create the instance, or converge an existing one with the same identifier
    async fn create_instance(&self, spec: &DatabaseSpec) -> Result<DatabaseInstance>;

    /// Create a proxy and return a direct handle to its routing target group.
    ///
    /// An existing proxy with the same name is modified to the requested TLS
    /// and network settings; the returned creation reports what it now has.
    async fn create_proxy(&self, spec: &ProxySpec) -> Result<ProxyCreation>;

    /// Rename exactly the target group behind `handle`
    ///
    /// Returns the handle as it is after the rename. Fails with `NotFound`
    /// when the platform no longer knows the group.
    async fn rename_target_group(
        &self,
        handle: &TargetGroupHandle,
        name: &str,
    ) -> Result<TargetGroupHandle>;

    /// Resolve the connection endpoint of a proxy
    async fn proxy_endpoint(&self, proxy: &ProxyHandle) -> Result<Endpoint>;
}

/// Network perimeter management
#[async_trait]
pub trait NetworkPlatform: Send + Sync {
    /// Authorize an ingress rule; returns `false` if the permission already existed
    async fn authorize_ingress(&self, group: &SecurityGroupId, rule: &IngressRule) -> Result<bool>;
}

/// Role assumption and policy attachment
#[async_trait]
pub trait IdentityPlatform: Send + Sync {
    /// Create or return the role `name` assumable by `principal`
    async fn ensure_role(&self, name: &str, principal: &str) -> Result<ExecutionIdentity>;

    /// Attach an allow statement; attaching the same statement twice is a no-op
    async fn attach_policy(
        &self,
        identity: &ExecutionIdentity,
        statement: &PolicyStatement,
    ) -> Result<()>;
}
