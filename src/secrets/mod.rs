//! Credential secrets for the database access roles.
//!
//! # Architecture
//!
//! The [`SecretStore`] trait is the seam to the external secret store and
//! offers only what provisioning needs:
//! - **create_secret**: create a named secret, never overwriting
//! - **lookup_secret**: fetch a secret by name
//!
//! [`SecretVault`] sits on top and maps each [`Role`](crate::domain::Role) to
//! its deterministic storage location, importing the admin secret and creating
//! the others.
//!
//! # Security Considerations
//!
//! - Secret values travel as [`SecretString`] and are never logged
//! - Created secrets hold placeholders until the rotation process replaces them

pub mod client;
pub mod memory;
pub mod types;
pub mod vault;

pub use client::{CreateSecretRequest, SecretStore, StoredSecret};
pub use memory::InMemorySecretStore;
pub use types::SecretString;
pub use vault::SecretVault;
