//! Domain layer
//!
//! Pure provisioning entities with no dependency on any platform. Validation
//! that only needs the values themselves (CIDR syntax, storage bounds, stack
//! id syntax) lives on the types.
//!
//! ## Module Organization
//!
//! - `id`: stack identifier and platform-assigned id newtypes
//! - `naming`: deterministic resource names derived from the stack id
//! - `role`: access roles and where their credentials come from
//! - `secret`: credential secrets and their stored payload
//! - `network`: CIDRs, ingress rules, isolated segment, network attachment
//! - `database`: engine, storage, operational policy, instance
//! - `proxy`: proxy specs, creation handles, corrected proxies
//! - `identity`: proxy execution identity and policy statements

pub mod database;
pub mod id;
pub mod identity;
pub mod naming;
pub mod network;
pub mod proxy;
pub mod role;
pub mod secret;

pub use database::{
    DatabaseInstance, DatabaseSpec, Engine, EngineKind, OperationalPolicy, ParameterGroup,
    StorageSpec,
};
pub use id::{SecurityGroupId, StackId, SubnetId, TargetGroupId, VpcId};
pub use identity::{ExecutionIdentity, PolicyStatement};
pub use network::{
    Cidr, IngressRule, IsolatedSegment, NetworkAttachment, NetworkTopology, SubnetKind,
};
pub use proxy::{
    Endpoint, EngineFamily, Proxy, ProxyCreation, ProxyHandle, ProxySpec, TargetGroupHandle,
};
pub use naming::ResourceNames;
pub use role::{CredentialSource, Role};
pub use secret::{CredentialPayload, CredentialSecret, RemovalPolicy, SecretHandle, SecretOrigin};
