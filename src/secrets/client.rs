//! Secret store collaborator trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::SecretString;
use crate::domain::{RemovalPolicy, SecretHandle};
use crate::errors::Result;

/// Request to create a named secret
#[derive(Debug, Clone)]
pub struct CreateSecretRequest {
    pub name: String,
    pub description: String,
    pub value: SecretString,
    pub removal_policy: RemovalPolicy,
    pub tags: BTreeMap<String, String>,
}

/// A secret as held by the store, value included
#[derive(Debug, Clone, Serialize)]
pub struct StoredSecret {
    pub handle: SecretHandle,
    pub description: String,
    pub value: SecretString,
    pub removal_policy: RemovalPolicy,
    pub tags: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl StoredSecret {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Create and lookup-by-name operations of the secret store.
///
/// Implementations MUST NOT log secret values.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create a secret.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::Conflict`](crate::errors::ProvisionError::Conflict)
    ///   if a secret with the same name already exists
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<StoredSecret>;

    /// Look up a secret by its name.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::NotFound`](crate::errors::ProvisionError::NotFound)
    ///   if no secret has that name
    async fn lookup_secret(&self, name: &str) -> Result<StoredSecret>;
}
