//! Network domain types
//!
//! Covers the isolated segment the instance is placed in, the attachment the
//! platform returns for it, and the ingress rules applied to that attachment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use super::id::{SecurityGroupId, SubnetId, VpcId};
use crate::errors::{ProvisionError, Result};

/// IPv4 CIDR block in `a.b.c.d/n` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    address: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    /// Parse a CIDR string. The address must be the network address of the block.
    pub fn parse(value: &str) -> Result<Self> {
        let (address, prefix) = value.trim().split_once('/').ok_or_else(|| {
            ProvisionError::validation_field(format!("'{}' is not in a.b.c.d/n form", value), "cidr")
        })?;

        let address: Ipv4Addr = address.parse().map_err(|_| {
            ProvisionError::validation_field(
                format!("'{}' does not contain a valid IPv4 address", value),
                "cidr",
            )
        })?;

        let prefix: u8 = prefix.parse().map_err(|_| {
            ProvisionError::validation_field(format!("'{}' has an invalid prefix length", value), "cidr")
        })?;

        if prefix > 32 {
            return Err(ProvisionError::validation_field(
                format!("'{}' has a prefix length above 32", value),
                "cidr",
            ));
        }

        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) };
        if u32::from(address) & !mask != 0 {
            return Err(ProvisionError::validation_field(
                format!(
                    "'{}' has host bits set; the network address is {}/{}",
                    value,
                    Ipv4Addr::from(u32::from(address) & mask),
                    prefix
                ),
                "cidr",
            ));
        }

        Ok(Self { address, prefix })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}

/// Transport protocol of an ingress rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
}

/// A single inbound permission on a security group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressRule {
    pub source: Cidr,
    pub protocol: Protocol,
    pub port: u16,
    pub description: String,
}

impl IngressRule {
    /// TCP rule on `port` from `source`
    pub fn tcp(source: Cidr, port: u16, description: impl Into<String>) -> Self {
        Self { source, protocol: Protocol::Tcp, port, description: description.into() }
    }

    /// Identity of the permission, ignoring the free-form description
    pub fn permission_key(&self) -> (Cidr, Protocol, u16) {
        (self.source, self.protocol, self.port)
    }
}

/// Routing posture of the subnets a segment is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    /// No route to any gateway
    PrivateIsolated,
    /// Outbound route through a NAT gateway
    PrivateWithEgress,
    /// Route to an internet gateway
    Public,
}

/// The network segment the database is placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolatedSegment {
    pub vpc_id: VpcId,
    pub subnet_ids: Vec<SubnetId>,
    pub subnet_kind: SubnetKind,
}

impl IsolatedSegment {
    /// Reject segments that are not isolated or have no subnets
    pub fn ensure_isolated(&self) -> Result<()> {
        if self.subnet_kind != SubnetKind::PrivateIsolated {
            return Err(ProvisionError::validation_field(
                format!(
                    "Database subnets in {} must be private isolated, got {:?}",
                    self.vpc_id, self.subnet_kind
                ),
                "network.subnet_kind",
            ));
        }
        if self.subnet_ids.is_empty() {
            return Err(ProvisionError::validation_field(
                "Isolated segment has no subnets",
                "network.isolated_subnet_ids",
            ));
        }
        Ok(())
    }
}

/// Network topology supplied by the network collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTopology {
    pub segment: IsolatedSegment,
    /// Private-subnet CIDRs; may be empty for a freshly created network
    pub private_cidrs: Vec<String>,
    /// Range of the broader network the segment sits in
    pub perimeter_cidr: String,
}

/// Network attachment of a database instance, shared read-only by its proxies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub segment: IsolatedSegment,
    pub subnet_group: String,
    pub security_groups: Vec<SecurityGroupId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr_parse() {
        let cidr = Cidr::parse("10.0.1.0/24").unwrap();
        assert_eq!(cidr.address(), Ipv4Addr::new(10, 0, 1, 0));
        assert_eq!(cidr.prefix(), 24);
        assert_eq!(cidr.to_string(), "10.0.1.0/24");
    }

    #[test]
    fn test_cidr_rejections() {
        for bad in ["10.0.0.0", "10.0.0/16", "10.0.0.0/33", "10.0.0.0/x", "fe80::/10", ""] {
            assert!(Cidr::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_cidr_with_host_bits_is_rejected() {
        for bad in ["10.0.0.1/16", "10.0.1.0/16", "10.0.0.128/24", "192.168.1.1/24"] {
            let err = Cidr::parse(bad).unwrap_err();
            assert!(matches!(err, ProvisionError::Validation { .. }), "{} should be rejected", bad);
        }
        let err = Cidr::parse("10.0.1.0/16").unwrap_err();
        assert!(err.to_string().contains("10.0.0.0/16"));

        assert!(Cidr::parse("10.0.0.0/16").is_ok());
        assert!(Cidr::parse("192.168.1.1/32").is_ok());
        assert!(Cidr::parse("0.0.0.0/0").is_ok());
    }

    #[test]
    fn test_segment_must_be_isolated() {
        let mut segment = IsolatedSegment {
            vpc_id: VpcId::new("vpc-1"),
            subnet_ids: vec![SubnetId::new("subnet-a")],
            subnet_kind: SubnetKind::PrivateIsolated,
        };
        assert!(segment.ensure_isolated().is_ok());

        segment.subnet_kind = SubnetKind::Public;
        assert!(segment.ensure_isolated().is_err());

        segment.subnet_kind = SubnetKind::PrivateIsolated;
        segment.subnet_ids.clear();
        assert!(segment.ensure_isolated().is_err());
    }

    #[test]
    fn test_permission_key_ignores_description() {
        let cidr = Cidr::parse("10.0.0.0/16").unwrap();
        let a = IngressRule::tcp(cidr, 5432, "first");
        let b = IngressRule::tcp(cidr, 5432, "second");
        assert_eq!(a.permission_key(), b.permission_key());
        assert_ne!(a, b);
    }
}
