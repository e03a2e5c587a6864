//! Per-role proxy registration
//!
//! Each role gets its own proxy bound to exactly that role's secret. The
//! platform assigns opaque names to proxy target groups, which breaks
//! consumers that look a proxy's routing target up by its stable name, so
//! registration happens in two phases:
//!
//! 1. [`ProxyRegistrar::create_proxy`] creates the proxy and keeps the direct
//!    handle to the target group the platform returned for it
//! 2. [`ProxyRegistrar::correct_target_group`] renames exactly that group and
//!    resolves the endpoint
//!
//! Only phase two produces a [`Proxy`], so an uncorrected proxy cannot be
//! published.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::ProxySettings;
use crate::domain::naming::proxy_name;
use crate::domain::{
    CredentialSecret, DatabaseInstance, EngineFamily, ExecutionIdentity, Proxy, ProxyCreation,
    ProxySpec, Role, StackId,
};
use crate::errors::{ProvisionError, Result};
use crate::platform::DatabasePlatform;

/// A created proxy whose target group still carries the platform-assigned name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProxy {
    pub role: Role,
    pub creation: ProxyCreation,
}

/// Registers one proxy per role in front of the instance
pub struct ProxyRegistrar {
    platform: Arc<dyn DatabasePlatform>,
    stack: StackId,
    settings: ProxySettings,
}

impl ProxyRegistrar {
    pub fn new(platform: Arc<dyn DatabasePlatform>, stack: StackId, settings: ProxySettings) -> Self {
        Self { platform, stack, settings }
    }

    /// Create the proxy serving `role`
    #[instrument(skip(self, instance, secret, identity), fields(stack = %self.stack))]
    pub async fn create_proxy(
        &self,
        instance: &DatabaseInstance,
        role: Role,
        secret: &CredentialSecret,
        identity: &ExecutionIdentity,
    ) -> Result<PendingProxy> {
        if secret.role != role {
            return Err(ProvisionError::internal(format!(
                "Proxy for {} cannot authenticate with the {} secret",
                role, secret.role
            )));
        }

        let spec = ProxySpec {
            name: proxy_name(&self.stack, role),
            role,
            engine_family: EngineFamily::Postgresql,
            target_instance: instance.identifier.clone(),
            secret: secret.handle.clone(),
            execution_identity: identity.name.clone(),
            subnet_ids: instance.attachment.segment.subnet_ids.clone(),
            security_groups: instance.attachment.security_groups.clone(),
            require_tls: self.settings.require_tls,
        };

        let creation = self.platform.create_proxy(&spec).await?;

        if creation.bound_secret != secret.handle {
            return Err(ProvisionError::conflict(
                format!(
                    "Proxy '{}' is bound to secret '{}' instead of '{}'",
                    spec.name,
                    creation.bound_secret.name,
                    secret.storage_location()
                ),
                "proxy",
            ));
        }

        if creation.require_tls != spec.require_tls
            || creation.security_groups != spec.security_groups
        {
            return Err(ProvisionError::conflict(
                format!(
                    "Proxy '{}' kept require_tls={} and security groups {:?} instead of require_tls={} and {:?}",
                    spec.name,
                    creation.require_tls,
                    creation.security_groups,
                    spec.require_tls,
                    spec.security_groups
                ),
                "proxy",
            ));
        }

        if creation.target_group.proxy_name != spec.name {
            return Err(ProvisionError::internal(format!(
                "Platform returned the target group of '{}' for proxy '{}'",
                creation.target_group.proxy_name, spec.name
            )));
        }

        debug!(
            proxy = %spec.name,
            target_group = %creation.target_group.id,
            assigned_name = %creation.target_group.name,
            "Proxy created, target group pending correction"
        );

        Ok(PendingProxy { role, creation })
    }

    /// Rename the proxy's own target group to the stable name and resolve its endpoint
    pub async fn correct_target_group(&self, pending: PendingProxy) -> Result<Proxy> {
        let expected = self.settings.target_group_name.as_str();
        let PendingProxy { role, creation } = pending;

        let target_group = if creation.target_group.name == expected {
            creation.target_group.clone()
        } else {
            self.platform.rename_target_group(&creation.target_group, expected).await?
        };

        if target_group.id != creation.target_group.id
            || target_group.proxy_name != creation.proxy.name
            || target_group.name != expected
        {
            return Err(ProvisionError::internal(format!(
                "Target group {} of proxy '{}' is named '{}' after correction, expected '{}'",
                target_group.id, creation.proxy.name, target_group.name, expected
            )));
        }

        let endpoint = self.platform.proxy_endpoint(&creation.proxy).await?;

        info!(
            role = %role,
            proxy = %creation.proxy.name,
            target_group = %target_group.id,
            endpoint = %endpoint,
            require_tls = creation.require_tls,
            "Proxy registered"
        );

        Ok(Proxy::new(
            role,
            creation.proxy,
            endpoint,
            target_group,
            creation.bound_secret,
            creation.require_tls,
        ))
    }

    /// Create the proxy and correct its target group in one step
    pub async fn attach_proxy(
        &self,
        instance: &DatabaseInstance,
        role: Role,
        secret: &CredentialSecret,
        identity: &ExecutionIdentity,
    ) -> Result<Proxy> {
        let pending = self.create_proxy(instance, role, secret, identity).await?;
        self.correct_target_group(pending).await
    }
}
