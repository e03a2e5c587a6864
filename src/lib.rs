//! # LAT Provisioner
//!
//! Provisions the database access layer of LAT: one PostgreSQL instance in an
//! isolated network segment, one credential secret per access role, and one
//! connection-pooling proxy per role in front of the instance.
//!
//! ## Architecture
//!
//! ```text
//! SecretVault ──► DatabaseProvisioner ──► NetworkPolicyBuilder
//!                                              │
//!      AccessGranter ◄── ProxyRegistrar ◄──────┘
//!                 (ProvisioningOrchestrator drives the sequence)
//! ```
//!
//! ## Core Components
//!
//! - **Domain**: roles, secrets, instance, proxies and deterministic naming
//! - **Secrets**: per-role credential resolution over a [`secrets::SecretStore`]
//! - **Platform**: async traits for the database, network and identity services
//! - **Services**: the provisioning steps and the orchestrator composing them
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lat_provisioner::{
//!     config::load_config,
//!     domain::{naming::secret_path, Role},
//!     platform::InMemoryPlatform,
//!     secrets::{InMemorySecretStore, SecretString},
//!     services::ProvisioningOrchestrator,
//!     Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config(None)?;
//!     let secrets = Arc::new(InMemorySecretStore::new());
//!     secrets
//!         .seed_external(
//!             &secret_path(&config.stack()?, Role::Admin),
//!             SecretString::new(r#"{"username":"postgres","password":"change-me"}"#),
//!         )
//!         .await;
//!
//!     let platform = Arc::new(InMemoryPlatform::new(config.region.clone()));
//!     let orchestrator = ProvisioningOrchestrator::new(
//!         &config,
//!         secrets,
//!         platform.clone(),
//!         platform.clone(),
//!         platform,
//!     )?;
//!     let outputs = orchestrator.run(&config.network.topology()).await?;
//!     println!("{:?}", outputs.endpoints);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod platform;
pub mod secrets;
pub mod services;

// Re-export commonly used types and traits
pub use config::{load_config, ProvisionConfig};
pub use errors::{Error, ProvisionError, ProvisionWarning, Result};
pub use services::{ProvisioningOrchestrator, ProvisioningOutputs, ProvisioningStage};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
