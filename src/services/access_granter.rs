//! Connect permission for the proxy execution identity

use std::sync::Arc;
use tracing::info;

use crate::domain::{DatabaseInstance, ExecutionIdentity, PolicyStatement};
use crate::errors::Result;
use crate::platform::IdentityPlatform;

/// Grants the execution identity permission to connect to the instance
pub struct AccessGranter {
    identity: Arc<dyn IdentityPlatform>,
}

impl AccessGranter {
    pub fn new(identity: Arc<dyn IdentityPlatform>) -> Self {
        Self { identity }
    }

    /// Allow `identity` to connect as any database user on `instance`.
    ///
    /// Scoped to the one instance; re-granting is a no-op.
    pub async fn grant_connect(
        &self,
        instance: &DatabaseInstance,
        identity: &ExecutionIdentity,
    ) -> Result<PolicyStatement> {
        let statement = PolicyStatement::connect(vec![instance.connect_resource()]);
        self.identity.attach_policy(identity, &statement).await?;

        info!(
            identity = %identity.name,
            resource = %instance.connect_resource(),
            "Granted connect permission"
        );
        Ok(statement)
    }
}
