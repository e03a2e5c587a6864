//! End-to-end provisioning sequence
//!
//! Runs every stage in dependency order against the configured collaborators:
//!
//! ```text
//! ResolveSecrets -> ProvisionInstance -> ApplyNetworkRules
//!   -> CreateExecutionIdentity -> AttachProxies -> CorrectTargetGroupIdentities
//!   -> GrantAccess -> Publish
//! ```
//!
//! A fatal error stops the run at the failing stage. Nothing already created
//! is rolled back; every stage is idempotent, so re-running with the same
//! inputs converges.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

use super::{
    network_policy, AccessGranter, DatabaseProvisioner, NetworkPolicyBuilder, PendingProxy,
    ProxyRegistrar,
};
use crate::config::ProvisionConfig;
use crate::domain::naming::{execution_identity_name, PROXY_SERVICE_PRINCIPAL};
use crate::domain::{
    CredentialSecret, DatabaseInstance, IngressRule, NetworkTopology, Proxy, Role, SecretHandle,
    StackId,
};
use crate::errors::{ProvisionError, ProvisionWarning, Result};
use crate::platform::{DatabasePlatform, IdentityPlatform, NetworkPlatform};
use crate::secrets::{SecretStore, SecretVault};

/// Stages of a provisioning run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStage {
    ResolveSecrets,
    ProvisionInstance,
    ApplyNetworkRules,
    CreateExecutionIdentity,
    AttachProxies,
    CorrectTargetGroupIdentities,
    GrantAccess,
    Publish,
}

impl ProvisioningStage {
    pub const ALL: [ProvisioningStage; 8] = [
        Self::ResolveSecrets,
        Self::ProvisionInstance,
        Self::ApplyNetworkRules,
        Self::CreateExecutionIdentity,
        Self::AttachProxies,
        Self::CorrectTargetGroupIdentities,
        Self::GrantAccess,
        Self::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveSecrets => "resolve_secrets",
            Self::ProvisionInstance => "provision_instance",
            Self::ApplyNetworkRules => "apply_network_rules",
            Self::CreateExecutionIdentity => "create_execution_identity",
            Self::AttachProxies => "attach_proxies",
            Self::CorrectTargetGroupIdentities => "correct_target_group_identities",
            Self::GrantAccess => "grant_access",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run publishes to downstream consumers
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningOutputs {
    pub stack_id: StackId,
    /// Proxy endpoint (`host:port`) per role
    pub endpoints: BTreeMap<Role, String>,
    /// Storage location of the imported admin secret
    pub admin_secret_name: String,
    pub application_user_secret: SecretHandle,
    pub table_creator_secret: SecretHandle,
    pub instance: DatabaseInstance,
    pub proxies: Vec<Proxy>,
    pub ingress_rules: Vec<IngressRule>,
    pub completed_stages: Vec<ProvisioningStage>,
    pub warnings: Vec<ProvisionWarning>,
}

impl ProvisioningOutputs {
    pub fn endpoint(&self, role: Role) -> Option<&str> {
        self.endpoints.get(&role).map(String::as_str)
    }

    pub fn proxy(&self, role: Role) -> Option<&Proxy> {
        self.proxies.iter().find(|p| p.role() == role)
    }
}

/// Drives one provisioning run
pub struct ProvisioningOrchestrator {
    stack: StackId,
    vault: SecretVault,
    provisioner: DatabaseProvisioner,
    network_policy: NetworkPolicyBuilder,
    registrar: ProxyRegistrar,
    granter: AccessGranter,
    identity: Arc<dyn IdentityPlatform>,
}

impl ProvisioningOrchestrator {
    /// Wire every service from a validated configuration and the collaborators
    pub fn new(
        config: &ProvisionConfig,
        secrets: Arc<dyn SecretStore>,
        database: Arc<dyn DatabasePlatform>,
        network: Arc<dyn NetworkPlatform>,
        identity: Arc<dyn IdentityPlatform>,
    ) -> Result<Self> {
        let stack = config.stack()?;

        Ok(Self {
            vault: SecretVault::new(secrets, stack.clone()),
            provisioner: DatabaseProvisioner::new(
                database.clone(),
                stack.clone(),
                config.database.clone(),
                config.network.additional_security_groups.clone(),
            ),
            network_policy: NetworkPolicyBuilder::new(network, config.database.port),
            registrar: ProxyRegistrar::new(database, stack.clone(), config.proxy.clone()),
            granter: AccessGranter::new(identity.clone()),
            identity,
            stack,
        })
    }

    pub fn stack(&self) -> &StackId {
        &self.stack
    }

    /// Run every stage against `topology`
    pub async fn run(&self, topology: &NetworkTopology) -> Result<ProvisioningOutputs> {
        let span = crate::provision_span!(self.stack);
        async {
            let mut progress = Progress::default();
            match self.run_stages(topology, &mut progress).await {
                Ok(outputs) => {
                    info!(
                        stages = outputs.completed_stages.len(),
                        warnings = outputs.warnings.len(),
                        "Provisioning completed"
                    );
                    Ok(outputs)
                }
                Err(e) => {
                    error!(
                        stage = %progress.current,
                        error_kind = e.kind(),
                        retryable = e.is_retryable(),
                        requires_operator = e.requires_operator(),
                        error = %e,
                        "Provisioning halted"
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        topology: &NetworkTopology,
        progress: &mut Progress,
    ) -> Result<ProvisioningOutputs> {
        let mut warnings = Vec::new();

        progress.enter(ProvisioningStage::ResolveSecrets);
        let secrets = self.resolve_secrets().await?;
        let admin = secrets.get(Role::Admin)?;
        progress.complete();

        progress.enter(ProvisioningStage::ProvisionInstance);
        // Malformed ranges must fail before the instance exists
        let ingress_rules = self
            .network_policy
            .build_ingress_rules(&topology.private_cidrs, &topology.perimeter_cidr)?;
        let instance = self.provisioner.provision(admin, &topology.segment).await?;
        progress.complete();

        progress.enter(ProvisioningStage::ApplyNetworkRules);
        if let Some(gap) = network_policy::policy_gap(&topology.private_cidrs) {
            warn!(warning = %gap, "Ingress policy gap");
            warnings.push(gap);
        }
        self.network_policy.apply_rules(&instance.attachment, &ingress_rules).await?;
        progress.complete();

        progress.enter(ProvisioningStage::CreateExecutionIdentity);
        let identity = self
            .identity
            .ensure_role(&execution_identity_name(&self.stack), PROXY_SERVICE_PRINCIPAL)
            .await?;
        info!(identity = %identity.name, principal = %identity.trusted_principal, "Execution identity ready");
        progress.complete();

        progress.enter(ProvisioningStage::AttachProxies);
        let mut pending: Vec<PendingProxy> = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            let secret = secrets.get(role)?;
            pending.push(self.registrar.create_proxy(&instance, role, secret, &identity).await?);
        }
        progress.complete();

        progress.enter(ProvisioningStage::CorrectTargetGroupIdentities);
        let mut proxies = Vec::with_capacity(pending.len());
        for proxy in pending {
            proxies.push(self.registrar.correct_target_group(proxy).await?);
        }
        progress.complete();

        progress.enter(ProvisioningStage::GrantAccess);
        self.granter.grant_connect(&instance, &identity).await?;
        progress.complete();

        progress.enter(ProvisioningStage::Publish);
        let endpoints: BTreeMap<Role, String> =
            proxies.iter().map(|p| (p.role(), p.endpoint().to_string())).collect();
        for (role, endpoint) in &endpoints {
            info!(role = %role, endpoint = %endpoint, "Published proxy endpoint");
        }
        progress.complete();

        Ok(ProvisioningOutputs {
            stack_id: self.stack.clone(),
            endpoints,
            admin_secret_name: admin.storage_location().to_string(),
            application_user_secret: secrets.get(Role::ApplicationUser)?.handle.clone(),
            table_creator_secret: secrets.get(Role::TableCreator)?.handle.clone(),
            instance,
            proxies,
            ingress_rules,
            completed_stages: progress.completed.clone(),
            warnings,
        })
    }

    async fn resolve_secrets(&self) -> Result<ResolvedSecrets> {
        let mut resolved = BTreeMap::new();
        for role in Role::ALL {
            resolved.insert(role, self.vault.resolve_secret(role).await?);
        }
        Ok(ResolvedSecrets(resolved))
    }
}

struct ResolvedSecrets(BTreeMap<Role, CredentialSecret>);

impl ResolvedSecrets {
    fn get(&self, role: Role) -> Result<&CredentialSecret> {
        self.0
            .get(&role)
            .ok_or_else(|| ProvisionError::internal(format!("No secret resolved for {}", role)))
    }
}

#[derive(Debug)]
struct Progress {
    current: ProvisioningStage,
    completed: Vec<ProvisioningStage>,
}

impl Default for Progress {
    fn default() -> Self {
        Self { current: ProvisioningStage::ResolveSecrets, completed: Vec::new() }
    }
}

impl Progress {
    fn enter(&mut self, stage: ProvisioningStage) {
        info!(stage = %stage, "Entering stage");
        self.current = stage;
    }

    fn complete(&mut self) {
        self.completed.push(self.current);
    }
}
