//! # Platform Permissions
//!
//! Capability-based permission engine of the personal-data platform:
//! decides what a bearer credential may do on an instance's documents, and
//! lets top-level grants delegate part of their rules to share recipients.
//!
//! ## Overview
//!
//! The platform-permissions crate handles:
//! - **Credentials**: HS256 tokens whose audience picks the signing secret
//! - **Evaluation**: resolving a credential into a grant and checking it
//! - **Delegation**: share documents with per-recipient codes, one level deep
//! - **Existence**: the verbs stored permissions grant on given documents
//!
//! ## Features
//!
//! - `jwt` (default): token encoding and verification using jsonwebtoken
//!
//! ## Usage
//!
//! ```rust,no_run
//! use platform_permissions::{
//!     api, Instance, InstanceSecrets, JwtCodec, MemoryClientRegistry, MemoryPermissionStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> platform_permissions::PermissionResult<()> {
//! let clients = MemoryClientRegistry::new();
//! clients.register("alice.example.com", "client-1").await;
//!
//! let instance = Instance::new(
//!     "alice.example.com",
//!     InstanceSecrets::generate(),
//!     Arc::new(MemoryPermissionStore::new()),
//!     Arc::new(clients),
//!     Arc::new(JwtCodec::new()),
//! );
//!
//! let token = instance.make_jwt(
//!     platform_permissions::Audience::Access,
//!     "client-1",
//!     "io.cozy.contacts io.cozy.files:GET",
//!     chrono::Utc::now(),
//! )?;
//! let rules = api::get_self(&instance, &token).await?;
//! assert_eq!(rules.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Collaborators
//!
//! Storage, client lookup and credential decoding sit behind the
//! [`PermissionStore`], [`ClientRegistry`] and [`CredentialVerifier`]
//! traits. Every call receives the [`Instance`] it runs for.

pub mod api;
pub mod claims;
pub mod clients;
pub mod codes;
pub mod config;
pub mod context;
pub mod delegation;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod jwt;
pub mod resolver;
pub mod store;

// Re-export main types
pub use claims::{Audience, Claims, GrantSource, SecretKind, Staleness};
pub use clients::{ClientRegistry, MemoryClientRegistry};
pub use config::PermissionsConfig;
pub use context::{Instance, InstanceSecrets};
pub use delegation::Delegations;
pub use document::{PermissionDoc, PermissionPatch, PermissionType};
pub use error::{ErrorBody, PermissionError, PermissionResult};
pub use evaluator::{Evaluator, Grant};
pub use resolver::{ExistenceResolver, RefAndVerbs};
pub use store::{MemoryPermissionStore, PermissionQuery, PermissionStore};

pub use jwt::CredentialVerifier;
#[cfg(feature = "jwt")]
pub use jwt::JwtCodec;

pub use platform_rules;
