//! In-memory platform
//!
//! Simulates the database, network and identity services closely enough to
//! exercise the whole provisioning sequence: identifiers derived from names
//! are deterministic, while proxy target groups get opaque, random names the
//! way the real service assigns them. A single call can be made to fail with
//! [`InMemoryPlatform::fail_next`].

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{DatabasePlatform, IdentityPlatform, NetworkPlatform};
use crate::domain::{
    DatabaseInstance, DatabaseSpec, Endpoint, ExecutionIdentity, IngressRule, NetworkAttachment,
    ParameterGroup, PolicyStatement, ProxyCreation, ProxyHandle, ProxySpec, SecurityGroupId,
    TargetGroupHandle, TargetGroupId,
};
use crate::errors::{ProvisionError, Result};

/// Port every PostgreSQL proxy listens on
pub const PROXY_PORT: u16 = 5432;

/// Platform call that [`InMemoryPlatform::fail_next`] can make fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    EnsureParameterGroup,
    CreateInstance,
    CreateProxy,
    RenameTargetGroup,
    AuthorizeIngress,
    EnsureRole,
    AttachPolicy,
}

impl FailPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnsureParameterGroup => "ensure_parameter_group",
            Self::CreateInstance => "create_instance",
            Self::CreateProxy => "create_proxy",
            Self::RenameTargetGroup => "rename_target_group",
            Self::AuthorizeIngress => "authorize_ingress",
            Self::EnsureRole => "ensure_role",
            Self::AttachPolicy => "attach_policy",
        }
    }
}

#[derive(Debug)]
struct StoredProxy {
    spec: ProxySpec,
    handle: ProxyHandle,
    target_group: TargetGroupId,
}

#[derive(Debug, Default)]
struct PlatformState {
    parameter_groups: HashMap<String, ParameterGroup>,
    instances: HashMap<String, DatabaseInstance>,
    proxies: HashMap<String, StoredProxy>,
    target_groups: HashMap<TargetGroupId, TargetGroupHandle>,
    ingress: HashMap<SecurityGroupId, Vec<IngressRule>>,
    roles: HashMap<String, ExecutionIdentity>,
    policies: HashMap<String, BTreeSet<PolicyStatement>>,
    armed_failures: HashSet<FailPoint>,
}

impl PlatformState {
    /// Consume an armed failure for `point`, if any
    fn trip(&mut self, point: FailPoint) -> Result<()> {
        if self.armed_failures.remove(&point) {
            return Err(ProvisionError::platform(point.as_str(), "service temporarily unavailable"));
        }
        Ok(())
    }
}

/// In-memory implementation of every platform collaborator
#[derive(Debug)]
pub struct InMemoryPlatform {
    region: String,
    state: RwLock<PlatformState>,
}

impl InMemoryPlatform {
    pub fn new(region: impl Into<String>) -> Self {
        Self { region: region.into(), state: RwLock::new(PlatformState::default()) }
    }

    /// Make the next call of `point` fail with a retryable platform error
    pub async fn fail_next(&self, point: FailPoint) {
        self.state.write().await.armed_failures.insert(point);
    }

    pub async fn instance_count(&self) -> usize {
        self.state.read().await.instances.len()
    }

    pub async fn proxy_count(&self) -> usize {
        self.state.read().await.proxies.len()
    }

    pub async fn target_group_count(&self) -> usize {
        self.state.read().await.target_groups.len()
    }

    pub async fn role_count(&self) -> usize {
        self.state.read().await.roles.len()
    }

    pub async fn parameter_group(&self, name: &str) -> Option<ParameterGroup> {
        self.state.read().await.parameter_groups.get(name).cloned()
    }

    /// Rules currently authorized on a security group
    pub async fn ingress_rules(&self, group: &SecurityGroupId) -> Vec<IngressRule> {
        self.state.read().await.ingress.get(group).cloned().unwrap_or_default()
    }

    /// Current name of the target group owned by `proxy_name`
    pub async fn target_group_name(&self, proxy_name: &str) -> Option<String> {
        let state = self.state.read().await;
        let proxy = state.proxies.get(proxy_name)?;
        state.target_groups.get(&proxy.target_group).map(|tg| tg.name.clone())
    }

    /// Secret the proxy `proxy_name` authenticates with
    pub async fn proxy_secret(&self, proxy_name: &str) -> Option<String> {
        self.state.read().await.proxies.get(proxy_name).map(|p| p.spec.secret.name.clone())
    }

    /// Whether the proxy `proxy_name` currently requires TLS
    pub async fn proxy_require_tls(&self, proxy_name: &str) -> Option<bool> {
        self.state.read().await.proxies.get(proxy_name).map(|p| p.spec.require_tls)
    }

    pub async fn policies(&self, role_name: &str) -> Vec<PolicyStatement> {
        self.state
            .read()
            .await
            .policies
            .get(role_name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the target group behind a proxy, simulating an out-of-band deletion
    pub async fn forget_target_group(&self, proxy_name: &str) {
        let mut state = self.state.write().await;
        if let Some(id) = state.proxies.get(proxy_name).map(|p| p.target_group.clone()) {
            state.target_groups.remove(&id);
        }
    }

    fn endpoint_for(&self, proxy_name: &str) -> Endpoint {
        Endpoint {
            host: format!(
                "{}.proxy-{}.{}.rds.amazonaws.com",
                proxy_name.to_lowercase(),
                short_hash(proxy_name),
                self.region
            ),
            port: PROXY_PORT,
        }
    }
}

/// First twelve hex characters of the SHA-256 of `value`
fn short_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest)[..12].to_string()
}

fn build_instance(spec: &DatabaseSpec) -> DatabaseInstance {
    let mut security_groups =
        vec![SecurityGroupId::new(format!("sg-{}", short_hash(&spec.identifier)))];
    security_groups
        .extend(spec.additional_security_groups.iter().map(|sg| SecurityGroupId::new(sg.as_str())));

    DatabaseInstance {
        identifier: spec.identifier.clone(),
        resource_id: format!("db-{}", short_hash(&spec.identifier).to_uppercase()),
        engine: spec.engine.clone(),
        instance_class: spec.instance_class.clone(),
        database_name: spec.database_name.clone(),
        port: spec.port,
        storage: spec.storage,
        policy: spec.policy,
        parameter_group: spec.parameter_group.clone(),
        attachment: NetworkAttachment {
            segment: spec.segment.clone(),
            subnet_group: spec.subnet_group.clone(),
            security_groups,
        },
    }
}

#[async_trait]
impl DatabasePlatform for InMemoryPlatform {
    async fn ensure_parameter_group(&self, group: &ParameterGroup) -> Result<()> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::EnsureParameterGroup)?;
        state.parameter_groups.insert(group.name.clone(), group.clone());
        Ok(())
    }

    async fn create_instance(&self, spec: &DatabaseSpec) -> Result<DatabaseInstance> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::CreateInstance)?;

        if !state.parameter_groups.contains_key(&spec.parameter_group) {
            return Err(ProvisionError::not_found("parameter_group", &spec.parameter_group));
        }

        if let Some(existing) = state.instances.get(&spec.identifier) {
            if existing.engine.major_version()? != spec.engine.major_version()? {
                return Err(ProvisionError::conflict(
                    format!(
                        "Instance '{}' runs {} {}; major version upgrades are not allowed",
                        spec.identifier, existing.engine.kind, existing.engine.version
                    ),
                    "database_instance",
                ));
            }
        }

        let mut instance = build_instance(spec);
        for group in &instance.attachment.security_groups {
            state.ingress.entry(group.clone()).or_default();
        }

        if let Some(existing) = state.instances.get(&spec.identifier) {
            instance.resource_id = existing.resource_id.clone();
            debug!(identifier = %spec.identifier, "Converged existing database instance");
        }

        state.instances.insert(spec.identifier.clone(), instance.clone());
        Ok(instance)
    }

    async fn create_proxy(&self, spec: &ProxySpec) -> Result<ProxyCreation> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::CreateProxy)?;

        if !state.instances.contains_key(&spec.target_instance) {
            return Err(ProvisionError::not_found("database_instance", &spec.target_instance));
        }

        if let Some(existing) = state.proxies.get(&spec.name) {
            if existing.spec.secret != spec.secret {
                return Err(ProvisionError::conflict(
                    format!(
                        "Proxy '{}' is bound to secret '{}', not '{}'",
                        spec.name, existing.spec.secret.name, spec.secret.name
                    ),
                    "proxy",
                ));
            }
            if existing.spec.target_instance != spec.target_instance {
                return Err(ProvisionError::conflict(
                    format!(
                        "Proxy '{}' fronts instance '{}', not '{}'",
                        spec.name, existing.spec.target_instance, spec.target_instance
                    ),
                    "proxy",
                ));
            }
        }

        let existing_target_group = state.proxies.get(&spec.name).map(|p| p.target_group.clone());
        if let Some(target_group_id) = existing_target_group {
            let target_group = state
                .target_groups
                .get(&target_group_id)
                .cloned()
                .unwrap_or_else(|| TargetGroupHandle {
                    id: target_group_id.clone(),
                    proxy_name: spec.name.clone(),
                    name: String::new(),
                });

            // Modifiable settings follow the latest request
            let stored = state
                .proxies
                .get_mut(&spec.name)
                .ok_or_else(|| ProvisionError::not_found("proxy", &spec.name))?;
            if stored.spec != *spec {
                debug!(proxy = %spec.name, require_tls = spec.require_tls, "Modified existing proxy");
                stored.spec = spec.clone();
            }

            return Ok(ProxyCreation {
                proxy: stored.handle.clone(),
                target_group,
                bound_secret: stored.spec.secret.clone(),
                require_tls: stored.spec.require_tls,
                security_groups: stored.spec.security_groups.clone(),
            });
        }

        let handle =
            ProxyHandle { name: spec.name.clone(), id: format!("prx-{}", short_hash(&spec.name)) };
        let opaque = Uuid::new_v4().simple().to_string();
        let target_group = TargetGroupHandle {
            id: TargetGroupId::new(format!("prx-tg-{}", &opaque[..16])),
            proxy_name: spec.name.clone(),
            name: format!("tg-{}", &opaque[16..]),
        };

        state.target_groups.insert(target_group.id.clone(), target_group.clone());
        state.proxies.insert(
            spec.name.clone(),
            StoredProxy {
                spec: spec.clone(),
                handle: handle.clone(),
                target_group: target_group.id.clone(),
            },
        );

        Ok(ProxyCreation {
            proxy: handle,
            target_group,
            bound_secret: spec.secret.clone(),
            require_tls: spec.require_tls,
            security_groups: spec.security_groups.clone(),
        })
    }

    async fn rename_target_group(
        &self,
        handle: &TargetGroupHandle,
        name: &str,
    ) -> Result<TargetGroupHandle> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::RenameTargetGroup)?;
        let target_group = state
            .target_groups
            .get_mut(&handle.id)
            .ok_or_else(|| ProvisionError::not_found("target_group", handle.id.as_str()))?;

        if target_group.proxy_name != handle.proxy_name {
            return Err(ProvisionError::conflict(
                format!(
                    "Target group {} belongs to proxy '{}', not '{}'",
                    handle.id, target_group.proxy_name, handle.proxy_name
                ),
                "target_group",
            ));
        }

        target_group.name = name.to_string();
        Ok(target_group.clone())
    }

    async fn proxy_endpoint(&self, proxy: &ProxyHandle) -> Result<Endpoint> {
        let state = self.state.read().await;
        if !state.proxies.contains_key(&proxy.name) {
            return Err(ProvisionError::not_found("proxy", &proxy.name));
        }
        Ok(self.endpoint_for(&proxy.name))
    }
}

#[async_trait]
impl NetworkPlatform for InMemoryPlatform {
    async fn authorize_ingress(&self, group: &SecurityGroupId, rule: &IngressRule) -> Result<bool> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::AuthorizeIngress)?;
        let rules = state
            .ingress
            .get_mut(group)
            .ok_or_else(|| ProvisionError::not_found("security_group", group.as_str()))?;

        if rules.iter().any(|r| r.permission_key() == rule.permission_key()) {
            return Ok(false);
        }
        rules.push(rule.clone());
        Ok(true)
    }
}

#[async_trait]
impl IdentityPlatform for InMemoryPlatform {
    async fn ensure_role(&self, name: &str, principal: &str) -> Result<ExecutionIdentity> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::EnsureRole)?;
        if let Some(existing) = state.roles.get(name) {
            if existing.trusted_principal != principal {
                return Err(ProvisionError::conflict(
                    format!(
                        "Role '{}' trusts '{}', not '{}'",
                        name, existing.trusted_principal, principal
                    ),
                    "execution_identity",
                ));
            }
            return Ok(existing.clone());
        }

        let identity = ExecutionIdentity {
            name: name.to_string(),
            id: format!("role-{}", short_hash(name)),
            trusted_principal: principal.to_string(),
        };
        state.roles.insert(name.to_string(), identity.clone());
        Ok(identity)
    }

    async fn attach_policy(
        &self,
        identity: &ExecutionIdentity,
        statement: &PolicyStatement,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::AttachPolicy)?;
        if !state.roles.contains_key(&identity.name) {
            return Err(ProvisionError::not_found("execution_identity", &identity.name));
        }
        state.policies.entry(identity.name.clone()).or_default().insert(statement.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Cidr, Engine, EngineFamily, IsolatedSegment, OperationalPolicy, Role, SecretHandle,
        StorageSpec, SubnetId, SubnetKind, VpcId,
    };

    fn spec(version: &str) -> DatabaseSpec {
        DatabaseSpec {
            identifier: "stack-database".to_string(),
            engine: Engine::postgres(version).unwrap(),
            instance_class: "db.t4g.medium".to_string(),
            database_name: "lat".to_string(),
            port: 5432,
            master_username: "postgres".to_string(),
            credentials_secret: "stack-LAT/credentials/rdsDbCredential".to_string(),
            storage: StorageSpec { allocated_gb: 100, max_allocated_gb: 150 },
            policy: OperationalPolicy::standard(),
            parameter_group: "pg".to_string(),
            segment: IsolatedSegment {
                vpc_id: VpcId::new("vpc-1"),
                subnet_ids: vec![SubnetId::new("subnet-a")],
                subnet_kind: SubnetKind::PrivateIsolated,
            },
            subnet_group: "stack-database-subnets".to_string(),
            additional_security_groups: vec![],
        }
    }

    async fn platform_with_instance() -> (InMemoryPlatform, DatabaseInstance) {
        let platform = InMemoryPlatform::new("ca-central-1");
        let engine = Engine::postgres("16.3").unwrap();
        platform.ensure_parameter_group(&ParameterGroup::relaxed_ssl("pg", &engine).unwrap()).await.unwrap();
        let instance = platform.create_instance(&spec("16.3")).await.unwrap();
        (platform, instance)
    }

    fn proxy_spec(instance: &DatabaseInstance, name: &str, secret: &str) -> ProxySpec {
        ProxySpec {
            name: name.to_string(),
            role: Role::ApplicationUser,
            engine_family: EngineFamily::Postgresql,
            target_instance: instance.identifier.clone(),
            secret: SecretHandle { name: secret.to_string(), id: format!("secret:{}", secret) },
            execution_identity: "role".to_string(),
            subnet_ids: instance.attachment.segment.subnet_ids.clone(),
            security_groups: instance.attachment.security_groups.clone(),
            require_tls: false,
        }
    }

    #[tokio::test]
    async fn test_instance_requires_parameter_group() {
        let platform = InMemoryPlatform::new("ca-central-1");
        let err = platform.create_instance(&spec("16.3")).await.unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound { .. }));
        assert_eq!(platform.instance_count().await, 0);
    }

    #[tokio::test]
    async fn test_instance_converges_and_rejects_major_upgrade() {
        let (platform, first) = platform_with_instance().await;
        let again = platform.create_instance(&spec("16.4")).await.unwrap();
        assert_eq!(first.resource_id, again.resource_id);
        assert_eq!(platform.instance_count().await, 1);

        let err = platform.create_instance(&spec("17.1")).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_target_groups_are_opaque_and_per_proxy() {
        let (platform, instance) = platform_with_instance().await;
        let a = platform.create_proxy(&proxy_spec(&instance, "a", "s/a")).await.unwrap();
        let b = platform.create_proxy(&proxy_spec(&instance, "b", "s/b")).await.unwrap();

        assert_ne!(a.target_group.id, b.target_group.id);
        assert_ne!(a.target_group.name, "default");
        assert_eq!(a.target_group.proxy_name, "a");

        platform.rename_target_group(&a.target_group, "default").await.unwrap();
        assert_eq!(platform.target_group_name("a").await.as_deref(), Some("default"));
        assert_ne!(platform.target_group_name("b").await.as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn test_proxy_rebinding_conflicts() {
        let (platform, instance) = platform_with_instance().await;
        platform.create_proxy(&proxy_spec(&instance, "a", "s/a")).await.unwrap();
        let again = platform.create_proxy(&proxy_spec(&instance, "a", "s/a")).await.unwrap();
        assert_eq!(again.proxy.name, "a");
        assert_eq!(platform.proxy_count().await, 1);

        let err = platform.create_proxy(&proxy_spec(&instance, "a", "s/other")).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_existing_proxy_converges_to_requested_settings() {
        let (platform, instance) = platform_with_instance().await;
        let first = platform.create_proxy(&proxy_spec(&instance, "a", "s/a")).await.unwrap();
        assert!(!first.require_tls);

        let mut spec = proxy_spec(&instance, "a", "s/a");
        spec.require_tls = true;
        spec.security_groups.push(SecurityGroupId::new("sg-extra"));
        let again = platform.create_proxy(&spec).await.unwrap();

        assert!(again.require_tls);
        assert_eq!(again.security_groups, spec.security_groups);
        assert_eq!(again.target_group.id, first.target_group.id);
        assert_eq!(platform.proxy_require_tls("a").await, Some(true));
        assert_eq!(platform.proxy_count().await, 1);
    }

    #[tokio::test]
    async fn test_armed_failure_fires_once() {
        let (platform, instance) = platform_with_instance().await;
        platform.fail_next(FailPoint::CreateProxy).await;

        let err = platform.create_proxy(&proxy_spec(&instance, "a", "s/a")).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Platform { ref operation, .. } if operation == "create_proxy"));
        assert!(err.is_retryable());
        assert_eq!(platform.proxy_count().await, 0);

        platform.create_proxy(&proxy_spec(&instance, "a", "s/a")).await.unwrap();
        assert_eq!(platform.proxy_count().await, 1);
    }

    #[tokio::test]
    async fn test_rename_forgotten_target_group_is_not_found() {
        let (platform, instance) = platform_with_instance().await;
        let created = platform.create_proxy(&proxy_spec(&instance, "a", "s/a")).await.unwrap();
        platform.forget_target_group("a").await;

        let err = platform.rename_target_group(&created.target_group, "default").await.unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_ingress_authorization_is_idempotent() {
        let (platform, instance) = platform_with_instance().await;
        let group = &instance.attachment.security_groups[0];
        let rule = IngressRule::tcp(Cidr::parse("10.0.0.0/16").unwrap(), 5432, "perimeter");

        assert!(platform.authorize_ingress(group, &rule).await.unwrap());
        assert!(!platform.authorize_ingress(group, &rule).await.unwrap());
        assert_eq!(platform.ingress_rules(group).await.len(), 1);

        let unknown = SecurityGroupId::new("sg-unknown");
        assert!(platform.authorize_ingress(&unknown, &rule).await.is_err());
    }

    #[tokio::test]
    async fn test_roles_and_policies() {
        let platform = InMemoryPlatform::new("ca-central-1");
        let role = platform.ensure_role("stack-DBProxyRole", "rds.amazonaws.com").await.unwrap();
        let again = platform.ensure_role("stack-DBProxyRole", "rds.amazonaws.com").await.unwrap();
        assert_eq!(role, again);
        assert!(platform.ensure_role("stack-DBProxyRole", "ec2.amazonaws.com").await.is_err());

        let statement = PolicyStatement::connect(vec!["dbuser:db-1/*".to_string()]);
        platform.attach_policy(&role, &statement).await.unwrap();
        platform.attach_policy(&role, &statement).await.unwrap();
        assert_eq!(platform.policies("stack-DBProxyRole").await, vec![statement]);
    }
}
