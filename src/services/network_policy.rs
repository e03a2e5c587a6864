//! Ingress rule derivation for the database's network perimeter
//!
//! Rules are derived from the private-subnet CIDRs and the perimeter CIDR
//! supplied by the network topology, then authorized on every security group
//! of the instance's network attachment.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{Cidr, IngressRule, NetworkAttachment};
use crate::errors::{ProvisionWarning, Result};
use crate::platform::NetworkPlatform;

/// Derives and applies ingress rules
pub struct NetworkPolicyBuilder {
    network: Arc<dyn NetworkPlatform>,
    port: u16,
}

impl NetworkPolicyBuilder {
    pub fn new(network: Arc<dyn NetworkPlatform>, port: u16) -> Self {
        Self { network, port }
    }

    /// Derive the ingress rules for the database port
    pub fn build_ingress_rules(
        &self,
        private_cidrs: &[String],
        perimeter_cidr: &str,
    ) -> Result<Vec<IngressRule>> {
        build_ingress_rules(private_cidrs, perimeter_cidr, self.port)
    }

    /// Authorize every rule on every security group of the attachment.
    ///
    /// Returns the number of permissions that were newly added.
    pub async fn apply_rules(
        &self,
        attachment: &NetworkAttachment,
        rules: &[IngressRule],
    ) -> Result<usize> {
        let mut added = 0;
        for group in &attachment.security_groups {
            for rule in rules {
                if self.network.authorize_ingress(group, rule).await? {
                    added += 1;
                    debug!(security_group = %group, source = %rule.source, port = rule.port, "Authorized ingress");
                }
            }
        }

        info!(
            security_groups = attachment.security_groups.len(),
            rules = rules.len(),
            added,
            "Applied ingress rules"
        );
        Ok(added)
    }
}

/// Derive ingress rules: one per distinct private CIDR plus exactly one perimeter rule.
///
/// An empty private list is valid and yields only the perimeter rule. Every
/// CIDR must be a network address, so two spellings of one block cannot slip
/// past de-duplication. Exact repeats collapse, and a private CIDR equal to
/// the perimeter is covered by the perimeter rule.
pub fn build_ingress_rules(
    private_cidrs: &[String],
    perimeter_cidr: &str,
    port: u16,
) -> Result<Vec<IngressRule>> {
    let perimeter = Cidr::parse(perimeter_cidr)?;

    if private_cidrs.is_empty() {
        debug!(
            perimeter = %perimeter,
            "No private subnet CIDR ranges supplied; only the perimeter rule will be applied"
        );
    }

    let mut seen = HashSet::new();
    seen.insert(perimeter);

    let mut rules = Vec::with_capacity(private_cidrs.len() + 1);
    for raw in private_cidrs {
        let cidr = Cidr::parse(raw)?;
        if !seen.insert(cidr) {
            debug!(cidr = %cidr, "Skipping duplicate ingress source");
            continue;
        }
        rules.push(IngressRule::tcp(
            cidr,
            port,
            format!("Allow PostgreSQL traffic from private subnet CIDR range {}", cidr),
        ));
    }

    rules.push(IngressRule::tcp(
        perimeter,
        port,
        format!("Allow PostgreSQL traffic from the network perimeter {}", perimeter),
    ));

    Ok(rules)
}

/// Warning to report when no private CIDRs were supplied
pub fn policy_gap(private_cidrs: &[String]) -> Option<ProvisionWarning> {
    private_cidrs.is_empty().then(|| ProvisionWarning::PolicyGap {
        message: "no private subnet CIDR ranges supplied; perimeter rule only".to_string(),
    })
}
