//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use lat_provisioner::config::ProvisionConfig;
use lat_provisioner::domain::naming::secret_path;
use lat_provisioner::domain::{Role, StackId};
use lat_provisioner::platform::InMemoryPlatform;
use lat_provisioner::secrets::{InMemorySecretStore, SecretString};
use lat_provisioner::services::ProvisioningOrchestrator;

pub const ADMIN_USERNAME: &str = "postgres";

/// In-memory collaborators plus an orchestrator wired to them
pub struct Harness {
    pub config: ProvisionConfig,
    pub secrets: Arc<InMemorySecretStore>,
    pub platform: Arc<InMemoryPlatform>,
    pub orchestrator: ProvisioningOrchestrator,
}

impl Harness {
    pub fn new(config: ProvisionConfig) -> Self {
        let secrets = Arc::new(InMemorySecretStore::new());
        let platform = Arc::new(InMemoryPlatform::new(config.region.clone()));
        let orchestrator = ProvisioningOrchestrator::new(
            &config,
            secrets.clone(),
            platform.clone(),
            platform.clone(),
            platform.clone(),
        )
        .expect("orchestrator");
        Self { config, secrets, platform, orchestrator }
    }

    /// A second orchestrator over the same collaborators, with different settings
    pub fn orchestrator_with(&self, config: &ProvisionConfig) -> ProvisioningOrchestrator {
        ProvisioningOrchestrator::new(
            config,
            self.secrets.clone(),
            self.platform.clone(),
            self.platform.clone(),
            self.platform.clone(),
        )
        .expect("orchestrator")
    }

    pub fn stack(&self) -> StackId {
        self.config.stack().expect("stack id")
    }

    /// Seed the externally owned admin secret
    pub async fn seed_admin(&self) {
        let value = format!(r#"{{"username":"{}","password":"s3cret"}}"#, ADMIN_USERNAME);
        self.secrets
            .seed_external(&secret_path(&self.stack(), Role::Admin), SecretString::new(value))
            .await;
    }
}

/// Default configuration with the given private CIDRs
pub fn config_with_cidrs(cidrs: &[&str]) -> ProvisionConfig {
    let mut config = ProvisionConfig::default();
    config.network.private_cidrs = cidrs.iter().map(|c| c.to_string()).collect();
    config
}
