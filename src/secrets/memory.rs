//! In-memory secret store.
//!
//! Backs the `synth` command and the test suite. Secrets are keyed by name;
//! creation never overwrites.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use super::client::{CreateSecretRequest, SecretStore, StoredSecret};
use super::types::SecretString;
use crate::domain::{RemovalPolicy, SecretHandle};
use crate::errors::{ProvisionError, Result};

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, StoredSecret>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an externally owned secret, as an out-of-band process would
    pub async fn seed_external(&self, name: &str, value: SecretString) -> SecretHandle {
        let handle = SecretHandle { name: name.to_string(), id: secret_id(name) };
        let stored = StoredSecret {
            handle: handle.clone(),
            description: "Externally managed secret".to_string(),
            value,
            removal_policy: RemovalPolicy::Retain,
            tags: BTreeMap::new(),
            created_at: Utc::now(),
        };
        self.secrets.write().await.insert(name.to_string(), stored);
        handle
    }

    /// Replace a secret value, as the rotation process does
    pub async fn rotate(&self, name: &str, value: SecretString) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let stored =
            secrets.get_mut(name).ok_or_else(|| ProvisionError::not_found("secret", name))?;
        stored.value = value;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.secrets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.secrets.read().await.is_empty()
    }
}

/// Deterministic identifier derived from the secret name
fn secret_id(name: &str) -> String {
    format!("secret:{}", name)
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<StoredSecret> {
        let mut secrets = self.secrets.write().await;
        if secrets.contains_key(&request.name) {
            return Err(ProvisionError::conflict(
                format!("Secret '{}' already exists", request.name),
                "secret",
            ));
        }

        let stored = StoredSecret {
            handle: SecretHandle { name: request.name.clone(), id: secret_id(&request.name) },
            description: request.description,
            value: request.value,
            removal_policy: request.removal_policy,
            tags: request.tags,
            created_at: Utc::now(),
        };
        secrets.insert(request.name.clone(), stored.clone());
        debug!(secret_name = %request.name, "Stored secret");
        Ok(stored)
    }

    async fn lookup_secret(&self, name: &str) -> Result<StoredSecret> {
        self.secrets
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ProvisionError::not_found("secret", name))
    }
}
