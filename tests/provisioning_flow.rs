//! End-to-end provisioning against the in-memory platform

mod common;

use std::collections::HashSet;

use common::{config_with_cidrs, Harness, ADMIN_USERNAME};
use lat_provisioner::domain::naming::{proxy_name, secret_path};
use lat_provisioner::domain::secret::{PLACEHOLDER_PASSWORD, PLACEHOLDER_USERNAME};
use lat_provisioner::domain::{CredentialPayload, Role, SecretOrigin};
use lat_provisioner::errors::{ProvisionError, ProvisionWarning};
use lat_provisioner::secrets::{SecretStore, SecretString};
use lat_provisioner::services::ProvisioningStage;

#[tokio::test]
async fn test_one_secret_and_one_proxy_per_role() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24", "10.0.2.0/24"]));
    harness.seed_admin().await;

    let outputs = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap();
    let stack = harness.stack();

    assert_eq!(outputs.proxies.len(), 3);
    assert_eq!(harness.platform.proxy_count().await, 3);
    assert_eq!(harness.secrets.len().await, 3);

    let bound: HashSet<_> = outputs.proxies.iter().map(|p| p.bound_secret().name.clone()).collect();
    assert_eq!(bound.len(), 3);

    for role in Role::ALL {
        let proxy = outputs.proxy(role).unwrap();
        assert_eq!(proxy.name(), proxy_name(&stack, role));
        assert_eq!(proxy.bound_secret().name, secret_path(&stack, role));
        assert_eq!(
            harness.platform.proxy_secret(proxy.name()).await.as_deref(),
            Some(secret_path(&stack, role).as_str())
        );
        assert!(outputs.endpoint(role).unwrap().ends_with(":5432"));
    }

    assert_eq!(outputs.admin_secret_name, secret_path(&stack, Role::Admin));
    assert_eq!(outputs.application_user_secret.name, secret_path(&stack, Role::ApplicationUser));
    assert_eq!(outputs.table_creator_secret.name, secret_path(&stack, Role::TableCreator));
    assert_eq!(outputs.completed_stages, ProvisioningStage::ALL.to_vec());
    assert!(outputs.warnings.is_empty());
}

#[tokio::test]
async fn test_created_secrets_hold_placeholders_and_admin_is_master() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24"]));
    harness.seed_admin().await;

    harness.orchestrator.run(&harness.config.network.topology()).await.unwrap();
    let stack = harness.stack();

    for role in [Role::ApplicationUser, Role::TableCreator] {
        let stored = harness.secrets.lookup_secret(&secret_path(&stack, role)).await.unwrap();
        let payload = CredentialPayload::parse(&stored.handle.name, &stored.value).unwrap();
        assert_eq!(payload.username, PLACEHOLDER_USERNAME);
        assert_eq!(payload.password.expose_secret(), PLACEHOLDER_PASSWORD);
    }

    let admin = harness.secrets.lookup_secret(&secret_path(&stack, Role::Admin)).await.unwrap();
    let payload = CredentialPayload::parse(&admin.handle.name, &admin.value).unwrap();
    assert_eq!(payload.username, ADMIN_USERNAME);
}

#[tokio::test]
async fn test_double_run_is_idempotent() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24", "10.0.2.0/24"]));
    harness.seed_admin().await;
    let topology = harness.config.network.topology();

    let first = harness.orchestrator.run(&topology).await.unwrap();

    // Rotation replaces the placeholder between runs; a re-run must keep it.
    let app_secret = secret_path(&harness.stack(), Role::ApplicationUser);
    harness
        .secrets
        .rotate(&app_secret, SecretString::new(r#"{"username":"app","password":"rotated"}"#))
        .await
        .unwrap();

    let second = harness.orchestrator.run(&topology).await.unwrap();

    assert_eq!(first.endpoints, second.endpoints);
    assert_eq!(first.instance.resource_id, second.instance.resource_id);
    assert_eq!(harness.platform.instance_count().await, 1);
    assert_eq!(harness.platform.proxy_count().await, 3);
    assert_eq!(harness.platform.target_group_count().await, 3);
    assert_eq!(harness.platform.role_count().await, 1);
    assert_eq!(harness.secrets.len().await, 3);

    let group = &second.instance.attachment.security_groups[0];
    assert_eq!(harness.platform.ingress_rules(group).await.len(), 3);

    let stored = harness.secrets.lookup_secret(&app_secret).await.unwrap();
    assert!(stored.value.expose_secret().contains("rotated"));
}

#[tokio::test]
async fn test_every_published_proxy_has_corrected_target_group() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24"]));
    harness.seed_admin().await;

    let outputs = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap();

    for proxy in &outputs.proxies {
        assert_eq!(proxy.target_group().name, "default");
        assert_eq!(proxy.target_group().proxy_name, proxy.name());
        assert_eq!(
            harness.platform.target_group_name(proxy.name()).await.as_deref(),
            Some("default")
        );
    }
}

#[tokio::test]
async fn test_storage_above_ceiling_creates_nothing() {
    let mut config = config_with_cidrs(&["10.0.1.0/24"]);
    config.database.allocated_storage_gb = 151;
    let harness = Harness::new(config);
    harness.seed_admin().await;

    let err = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap_err();

    assert!(matches!(err, ProvisionError::CapacityExceeded { requested_gb: 151, ceiling_gb: 150 }));
    assert!(err.requires_operator());
    assert_eq!(harness.platform.instance_count().await, 0);
    assert_eq!(harness.platform.proxy_count().await, 0);
}

#[tokio::test]
async fn test_missing_admin_secret_halts_before_any_resource() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24"]));

    let err = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap_err();

    match err {
        ProvisionError::NotFound { resource_type, name } => {
            assert_eq!(resource_type, "secret");
            assert_eq!(name, secret_path(&harness.stack(), Role::Admin));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(harness.platform.instance_count().await, 0);
    assert_eq!(harness.platform.proxy_count().await, 0);
    assert_eq!(harness.platform.role_count().await, 0);
}

#[tokio::test]
async fn test_empty_cidr_list_is_a_policy_gap_not_an_error() {
    let harness = Harness::new(config_with_cidrs(&[]));
    harness.seed_admin().await;

    let outputs = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap();

    assert_eq!(outputs.ingress_rules.len(), 1);
    assert_eq!(outputs.ingress_rules[0].source.to_string(), harness.config.network.perimeter_cidr);
    assert!(matches!(outputs.warnings.as_slice(), [ProvisionWarning::PolicyGap { .. }]));
}

#[tokio::test]
async fn test_rules_applied_to_every_security_group() {
    let mut config = config_with_cidrs(&["10.0.1.0/24", "10.0.2.0/24"]);
    config.network.additional_security_groups = vec!["sg-shared-monitoring".to_string()];
    let harness = Harness::new(config);
    harness.seed_admin().await;

    let outputs = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap();

    assert_eq!(outputs.instance.attachment.security_groups.len(), 2);
    for group in &outputs.instance.attachment.security_groups {
        assert_eq!(harness.platform.ingress_rules(group).await.len(), 3);
    }
}

#[tokio::test]
async fn test_execution_identity_may_connect_to_instance() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24"]));
    harness.seed_admin().await;

    let outputs = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap();
    let role_name = format!("{}-DBProxyRole", harness.stack());

    let policies = harness.platform.policies(&role_name).await;
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].actions, vec!["rds-db:connect".to_string()]);
    assert_eq!(policies[0].resources, vec![outputs.instance.connect_resource()]);
}

#[tokio::test]
async fn test_incompatible_existing_secret_is_a_conflict() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24"]));
    harness.seed_admin().await;
    harness
        .secrets
        .seed_external(
            &secret_path(&harness.stack(), Role::TableCreator),
            SecretString::new(r#"{"username":"someone","password":"else"}"#),
        )
        .await;

    let err = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap_err();

    assert!(matches!(err, ProvisionError::Conflict { .. }));
    assert_eq!(harness.platform.instance_count().await, 0);
}

#[tokio::test]
async fn test_imported_admin_is_retained() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24"]));
    harness.seed_admin().await;
    let vault = lat_provisioner::secrets::SecretVault::new(harness.secrets.clone(), harness.stack());

    let admin = vault.resolve_secret(Role::Admin).await.unwrap();
    assert_eq!(admin.origin, SecretOrigin::Imported);
    assert_eq!(admin.username, ADMIN_USERNAME);
}

#[tokio::test]
async fn test_required_tls_is_applied_to_every_proxy() {
    let mut config = config_with_cidrs(&["10.0.1.0/24"]);
    config.proxy.require_tls = true;
    let harness = Harness::new(config);
    harness.seed_admin().await;

    let outputs = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap();

    for proxy in &outputs.proxies {
        assert!(proxy.require_tls());
        assert_eq!(harness.platform.proxy_require_tls(proxy.name()).await, Some(true));
    }
}

#[tokio::test]
async fn test_rerun_with_tls_required_tightens_existing_proxies() {
    let harness = Harness::new(config_with_cidrs(&["10.0.1.0/24"]));
    harness.seed_admin().await;
    let topology = harness.config.network.topology();

    let first = harness.orchestrator.run(&topology).await.unwrap();
    assert!(first.proxies.iter().all(|p| !p.require_tls()));

    let mut tightened = harness.config.clone();
    tightened.proxy.require_tls = true;
    let second = harness.orchestrator_with(&tightened).run(&topology).await.unwrap();

    assert_eq!(harness.platform.proxy_count().await, 3);
    for proxy in &second.proxies {
        assert!(proxy.require_tls());
        assert_eq!(harness.platform.proxy_require_tls(proxy.name()).await, Some(true));
    }
    assert_eq!(first.endpoints, second.endpoints);
}

#[tokio::test]
async fn test_cidr_with_host_bits_creates_nothing() {
    let harness = Harness::new(config_with_cidrs(&["10.0.0.1/16"]));
    harness.seed_admin().await;

    let err = harness.orchestrator.run(&harness.config.network.topology()).await.unwrap_err();

    assert!(matches!(err, ProvisionError::Validation { .. }));
    assert_eq!(harness.platform.instance_count().await, 0);
}
