//! Credential secret domain types
//!
//! A credential secret is stored as a JSON document with `username` and
//! `password` keys. Imported secrets are read-only references into externally
//! owned storage; created secrets belong to the stack.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::role::Role;
use crate::errors::{ProvisionError, Result};
use crate::secrets::SecretString;

/// Placeholder username written into created secrets; rotated at runtime
pub const PLACEHOLDER_USERNAME: &str = "applicationUsername";

/// Placeholder password written into created secrets; rotated at runtime
pub const PLACEHOLDER_PASSWORD: &str = "applicationPassword";

/// Tag key recording which role a created secret belongs to
pub const ROLE_TAG: &str = "lat:role";

/// What happens to a secret when the stack is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Secret outlives the stack
    Retain,
    /// Secret is deleted with the stack
    Destroy,
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain => write!(f, "retain"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

/// How the stack came to hold a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretOrigin {
    Imported,
    Created,
}

/// JSON body of a credential secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub username: String,
    pub password: SecretString,
}

impl CredentialPayload {
    /// Placeholder credentials for a freshly created secret
    pub fn placeholder() -> Self {
        Self {
            username: PLACEHOLDER_USERNAME.to_string(),
            password: SecretString::new(PLACEHOLDER_PASSWORD),
        }
    }

    /// Parse a stored secret value
    pub fn parse(name: &str, value: &SecretString) -> Result<Self> {
        serde_json::from_str(value.expose_secret()).map_err(|source| {
            ProvisionError::Serialization {
                source,
                context: format!("Secret '{}' is not a username/password document", name),
            }
        })
    }

    /// Serialize with the real password, for writing to the secret store
    pub fn to_secret_value(&self) -> SecretString {
        let document = serde_json::json!({
            "username": self.username,
            "password": self.password.expose_secret(),
        });
        SecretString::new(document.to_string())
    }
}

/// Reference to a secret that downstream consumers can look up at runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretHandle {
    /// Storage location (secret name)
    pub name: String,
    /// Platform-assigned identifier
    pub id: String,
}

/// A role's resolved credential secret
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialSecret {
    pub role: Role,
    pub username: String,
    pub password: SecretString,
    pub handle: SecretHandle,
    pub origin: SecretOrigin,
    pub removal_policy: RemovalPolicy,
}

impl CredentialSecret {
    /// Storage location of the secret
    pub fn storage_location(&self) -> &str {
        &self.handle.name
    }
}
