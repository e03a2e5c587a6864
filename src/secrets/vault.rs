//! Per-role credential resolution.
//!
//! The admin secret is imported by name and must already exist. The
//! application-user and table-creator secrets are created with placeholder
//! credentials on first run; later runs return whatever the rotation process
//! has written since.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::client::{CreateSecretRequest, SecretStore, StoredSecret};
use crate::domain::naming::secret_path;
use crate::domain::secret::ROLE_TAG;
use crate::domain::{
    CredentialPayload, CredentialSecret, CredentialSource, RemovalPolicy, Role, SecretOrigin,
    StackId,
};
use crate::errors::{ProvisionError, Result};

/// Resolves one credential secret per role
pub struct SecretVault {
    store: Arc<dyn SecretStore>,
    stack: StackId,
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault").field("stack", &self.stack).finish()
    }
}

impl SecretVault {
    pub fn new(store: Arc<dyn SecretStore>, stack: StackId) -> Self {
        Self { store, stack }
    }

    /// Resolve the credential secret of `role`
    #[instrument(skip(self), fields(stack = %self.stack))]
    pub async fn resolve_secret(&self, role: Role) -> Result<CredentialSecret> {
        let name = secret_path(&self.stack, role);

        match role.credential_source() {
            CredentialSource::Imported => {
                let stored = self.store.lookup_secret(&name).await?;
                debug!(role = %role, secret_name = %name, "Imported existing secret");
                credential_from(role, stored, SecretOrigin::Imported, RemovalPolicy::Retain)
            }
            CredentialSource::Created { description } => {
                let stored = self.ensure_created(role, &name, description).await?;
                credential_from(role, stored, SecretOrigin::Created, RemovalPolicy::Destroy)
            }
        }
    }

    /// Create the secret unless a compatible one already exists under the name
    async fn ensure_created(
        &self,
        role: Role,
        name: &str,
        description: &str,
    ) -> Result<StoredSecret> {
        match self.store.lookup_secret(name).await {
            Ok(existing) => {
                ensure_compatible(role, &existing)?;
                debug!(role = %role, secret_name = %name, "Secret already exists, reusing");
                return Ok(existing);
            }
            Err(ProvisionError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let mut tags = BTreeMap::new();
        tags.insert(ROLE_TAG.to_string(), role.as_str().to_string());

        let created = self
            .store
            .create_secret(CreateSecretRequest {
                name: name.to_string(),
                description: description.to_string(),
                value: CredentialPayload::placeholder().to_secret_value(),
                removal_policy: RemovalPolicy::Destroy,
                tags,
            })
            .await?;

        info!(role = %role, secret_name = %name, "Created credential secret with placeholder values");
        Ok(created)
    }
}

fn ensure_compatible(role: Role, existing: &StoredSecret) -> Result<()> {
    let owner = existing.tag(ROLE_TAG);
    if owner != Some(role.as_str()) {
        return Err(ProvisionError::conflict(
            format!(
                "Secret '{}' exists but belongs to {}, expected {}",
                existing.handle.name,
                owner.unwrap_or("no role"),
                role
            ),
            "secret",
        ));
    }
    if existing.removal_policy != RemovalPolicy::Destroy {
        return Err(ProvisionError::conflict(
            format!(
                "Secret '{}' exists with removal policy {}, expected destroy",
                existing.handle.name, existing.removal_policy
            ),
            "secret",
        ));
    }
    Ok(())
}

fn credential_from(
    role: Role,
    stored: StoredSecret,
    origin: SecretOrigin,
    removal_policy: RemovalPolicy,
) -> Result<CredentialSecret> {
    let payload = CredentialPayload::parse(&stored.handle.name, &stored.value)?;
    Ok(CredentialSecret {
        role,
        username: payload.username,
        password: payload.password,
        handle: stored.handle,
        origin,
        removal_policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::secret::{PLACEHOLDER_PASSWORD, PLACEHOLDER_USERNAME};
    use crate::secrets::{InMemorySecretStore, SecretString};

    fn stack() -> StackId {
        StackId::parse("DatabaseStack").unwrap()
    }

    fn admin_document() -> SecretString {
        SecretString::new(r#"{"username":"postgres","password":"admin-pw"}"#)
    }

    #[tokio::test]
    async fn test_admin_secret_is_imported() {
        let store = Arc::new(InMemorySecretStore::new());
        store.seed_external("DatabaseStack-LAT/credentials/rdsDbCredential", admin_document()).await;
        let vault = SecretVault::new(store.clone(), stack());

        let admin = vault.resolve_secret(Role::Admin).await.unwrap();
        assert_eq!(admin.username, "postgres");
        assert_eq!(admin.origin, SecretOrigin::Imported);
        assert_eq!(admin.removal_policy, RemovalPolicy::Retain);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_admin_secret_is_not_found() {
        let store = Arc::new(InMemorySecretStore::new());
        let vault = SecretVault::new(store.clone(), stack());

        let err = vault.resolve_secret(Role::Admin).await.unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_created_secret_has_placeholders() {
        let store = Arc::new(InMemorySecretStore::new());
        let vault = SecretVault::new(store.clone(), stack());

        let user = vault.resolve_secret(Role::ApplicationUser).await.unwrap();
        assert_eq!(user.username, PLACEHOLDER_USERNAME);
        assert_eq!(user.password.expose_secret(), PLACEHOLDER_PASSWORD);
        assert_eq!(user.origin, SecretOrigin::Created);
        assert_eq!(user.removal_policy, RemovalPolicy::Destroy);
        assert_eq!(user.storage_location(), "DatabaseStack-LAT/userCredentials/rdsDbCredential");
    }

    #[tokio::test]
    async fn test_created_secret_is_idempotent_and_keeps_rotated_value() {
        let store = Arc::new(InMemorySecretStore::new());
        let vault = SecretVault::new(store.clone(), stack());

        let first = vault.resolve_secret(Role::TableCreator).await.unwrap();
        store
            .rotate(
                first.storage_location(),
                SecretString::new(r#"{"username":"creator","password":"rotated"}"#),
            )
            .await
            .unwrap();

        let second = vault.resolve_secret(Role::TableCreator).await.unwrap();
        assert_eq!(first.handle, second.handle);
        assert_eq!(second.username, "creator");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_incompatible_existing_secret_conflicts() {
        let store = Arc::new(InMemorySecretStore::new());
        store
            .seed_external(
                "DatabaseStack-LAT/userCredentials/TableCreator",
                SecretString::new(r#"{"username":"x","password":"y"}"#),
            )
            .await;
        let vault = SecretVault::new(store.clone(), stack());

        let err = vault.resolve_secret(Role::TableCreator).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Conflict { .. }));
    }
}
