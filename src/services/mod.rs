//! Provisioning services
//!
//! Each service owns one step of the provisioning workflow and talks to the
//! outside world only through the platform traits.

pub mod access_granter;
pub mod database_provisioner;
pub mod network_policy;
pub mod orchestrator;
pub mod proxy_registrar;

pub use access_granter::AccessGranter;
pub use database_provisioner::DatabaseProvisioner;
pub use network_policy::{build_ingress_rules, NetworkPolicyBuilder};
pub use orchestrator::{ProvisioningOrchestrator, ProvisioningOutputs, ProvisioningStage};
pub use proxy_registrar::{PendingProxy, ProxyRegistrar};
