//! Database instance provisioning
//!
//! Creates the relaxed-SSL parameter group and the single PostgreSQL instance
//! inside the isolated segment, using the admin secret as master credentials.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DatabaseSettings;
use crate::domain::naming::{instance_identifier, parameter_group_name, subnet_group_name};
use crate::domain::{
    CredentialSecret, DatabaseInstance, DatabaseSpec, IsolatedSegment, OperationalPolicy,
    ParameterGroup, Role, StackId,
};
use crate::errors::{ProvisionError, Result};
use crate::platform::DatabasePlatform;

/// Service provisioning the database instance
pub struct DatabaseProvisioner {
    platform: Arc<dyn DatabasePlatform>,
    stack: StackId,
    settings: DatabaseSettings,
    additional_security_groups: Vec<String>,
}

impl DatabaseProvisioner {
    pub fn new(
        platform: Arc<dyn DatabasePlatform>,
        stack: StackId,
        settings: DatabaseSettings,
        additional_security_groups: Vec<String>,
    ) -> Self {
        Self { platform, stack, settings, additional_security_groups }
    }

    /// Create or converge the instance.
    ///
    /// Storage capacity and segment isolation are checked before anything is
    /// created, so a rejected request leaves no resources behind.
    pub async fn provision(
        &self,
        admin_secret: &CredentialSecret,
        segment: &IsolatedSegment,
    ) -> Result<DatabaseInstance> {
        if admin_secret.role != Role::Admin {
            return Err(ProvisionError::internal(format!(
                "Master credentials must come from the admin secret, got {}",
                admin_secret.role
            )));
        }

        let storage = self.settings.storage();
        storage.check_capacity()?;
        segment.ensure_isolated()?;

        let engine = self.settings.engine()?;
        let parameter_group = ParameterGroup::relaxed_ssl(parameter_group_name(&self.stack), &engine)?;
        self.platform.ensure_parameter_group(&parameter_group).await?;
        debug!(
            parameter_group = %parameter_group.name,
            family = %parameter_group.family,
            "Parameter group ready"
        );

        let spec = DatabaseSpec {
            identifier: instance_identifier(&self.stack),
            engine,
            instance_class: self.settings.instance_class.clone(),
            database_name: self.settings.database_name.clone(),
            port: self.settings.port,
            master_username: admin_secret.username.clone(),
            credentials_secret: admin_secret.storage_location().to_string(),
            storage,
            policy: OperationalPolicy::standard(),
            parameter_group: parameter_group.name,
            segment: segment.clone(),
            subnet_group: subnet_group_name(&self.stack),
            additional_security_groups: self.additional_security_groups.clone(),
        };

        let instance = self.platform.create_instance(&spec).await?;

        info!(
            identifier = %instance.identifier,
            resource_id = %instance.resource_id,
            engine_version = %instance.engine.version,
            allocated_gb = instance.storage.allocated_gb,
            max_allocated_gb = instance.storage.max_allocated_gb,
            security_groups = instance.attachment.security_groups.len(),
            "Database instance provisioned"
        );

        Ok(instance)
    }
}
