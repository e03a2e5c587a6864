//! Database access roles
//!
//! Each role owns exactly one credential secret and exactly one proxy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A distinct database-access identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Superuser credentials, owned outside this stack
    Admin,
    /// Credentials used by the application backend
    ApplicationUser,
    /// Credentials used to create tables
    TableCreator,
}

/// Where a role's credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Pre-existing secret imported by name; never created or destroyed here
    Imported,
    /// Secret created by the stack with placeholder values
    Created { description: &'static str },
}

impl Role {
    /// Every role, in provisioning order
    pub const ALL: [Role; 3] = [Role::Admin, Role::ApplicationUser, Role::TableCreator];

    /// Get the string representation of this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::ApplicationUser => "application_user",
            Self::TableCreator => "table_creator",
        }
    }

    /// How the credentials for this role are obtained
    pub fn credential_source(&self) -> CredentialSource {
        match self {
            Self::Admin => CredentialSource::Imported,
            Self::ApplicationUser => {
                CredentialSource::Created { description: "Secrets for clients to connect to RDS" }
            }
            Self::TableCreator => CredentialSource::Created {
                description: "Secrets for TableCreator to connect to RDS",
            },
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "application_user" => Ok(Self::ApplicationUser),
            "table_creator" => Ok(Self::TableCreator),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
