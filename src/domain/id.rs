//! Identifier types with NewType pattern
//!
//! Platform-assigned identifiers are wrapped so a security group id can never
//! be passed where a target group id is expected. The deployment identifier
//! [`StackId`] is validated on construction because every resource name is
//! derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ProvisionError, Result};

/// Maximum length of a stack identifier; keeps derived names under platform limits
pub const MAX_STACK_ID_LEN: usize = 40;

/// Macro to generate NewType wrappers for platform-assigned identifiers
macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier returned by the platform
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

resource_id!(
    /// Security group attached to the instance's network interface
    SecurityGroupId
);
resource_id!(
    /// Subnet inside the isolated network segment
    SubnetId
);
resource_id!(
    /// Virtual network the segment belongs to
    VpcId
);
resource_id!(
    /// Routing target group owned by a single proxy
    TargetGroupId
);

/// Deployment identifier used as the prefix of every resource name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StackId(String);

impl StackId {
    /// Parse and validate a stack identifier
    pub fn parse(value: &str) -> Result<Self> {
        let first = value
            .chars()
            .next()
            .ok_or_else(|| ProvisionError::validation_field("Stack id cannot be empty", "stack_id"))?;

        if !first.is_ascii_alphabetic() {
            return Err(ProvisionError::validation_field(
                format!("Stack id '{}' must start with a letter", value),
                "stack_id",
            ));
        }

        if value.len() > MAX_STACK_ID_LEN {
            return Err(ProvisionError::validation_field(
                format!("Stack id must be at most {} characters", MAX_STACK_ID_LEN),
                "stack_id",
            ));
        }

        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ProvisionError::validation_field(
                format!("Stack id '{}' may only contain letters, digits and hyphens", value),
                "stack_id",
            ));
        }

        if value.ends_with('-') || value.contains("--") {
            return Err(ProvisionError::validation_field(
                format!("Stack id '{}' cannot end with a hyphen or contain two in a row", value),
                "stack_id",
            ));
        }

        Ok(Self(value.to_string()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StackId {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StackId {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<StackId> for String {
    fn from(id: StackId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_id_accepts_hyphenated_names() {
        let id = StackId::parse("LatStack-prod").unwrap();
        assert_eq!(id.as_str(), "LatStack-prod");
        assert_eq!(id.to_string(), "LatStack-prod");
    }

    #[test]
    fn test_stack_id_rejections() {
        assert!(StackId::parse("").is_err());
        assert!(StackId::parse("1stack").is_err());
        assert!(StackId::parse("stack_name").is_err());
        assert!(StackId::parse("stack/LAT").is_err());
        assert!(StackId::parse(&"a".repeat(MAX_STACK_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_stack_id_rejects_hyphens_that_break_derived_names() {
        for bad in ["a-", "Lat--prod", "stack-prod-"] {
            let err = StackId::parse(bad).unwrap_err();
            assert!(matches!(err, ProvisionError::Validation { .. }), "{} should be rejected", bad);
        }
        assert!(StackId::parse("a-b-c").is_ok());
    }

    #[test]
    fn test_stack_id_deserialization_validates() {
        let ok: StackId = serde_json::from_str("\"DatabaseStack\"").unwrap();
        assert_eq!(ok.as_str(), "DatabaseStack");
        assert!(serde_json::from_str::<StackId>("\"9lives\"").is_err());
    }

    #[test]
    fn test_resource_ids_are_transparent() {
        let sg = SecurityGroupId::new("sg-1234");
        assert_eq!(serde_json::to_string(&sg).unwrap(), "\"sg-1234\"");
        assert_eq!(sg.as_str(), "sg-1234");
    }
}
