//! OAuth client registry
//!
//! Access tokens stay valid only while their client is registered on the
//! instance. The registry is the source of truth for that check.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::PermissionResult;

/// Lookup of registered OAuth clients.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Check if `client_id` is registered on the instance `domain`.
    async fn client_exists(&self, domain: &str, client_id: &str) -> PermissionResult<bool>;
}

/// In-memory client registry.
///
/// Suitable for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryClientRegistry {
    clients: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl MemoryClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client on an instance.
    pub async fn register(&self, domain: &str, client_id: &str) {
        self.clients
            .write()
            .await
            .entry(domain.to_string())
            .or_default()
            .insert(client_id.to_string());
    }

    /// Remove a client. Returns whether it was registered.
    pub async fn remove_client(&self, domain: &str, client_id: &str) -> bool {
        let mut clients = self.clients.write().await;
        match clients.get_mut(domain) {
            Some(ids) => ids.remove(client_id),
            None => false,
        }
    }
}

#[async_trait]
impl ClientRegistry for MemoryClientRegistry {
    async fn client_exists(&self, domain: &str, client_id: &str) -> PermissionResult<bool> {
        let clients = self.clients.read().await;
        Ok(clients
            .get(domain)
            .map(|ids| ids.contains(client_id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = MemoryClientRegistry::new();
        registry.register("alice.example.com", "client-1").await;

        assert!(registry.client_exists("alice.example.com", "client-1").await.unwrap());
        assert!(!registry.client_exists("bob.example.com", "client-1").await.unwrap());

        assert!(registry.remove_client("alice.example.com", "client-1").await);
        assert!(!registry.remove_client("alice.example.com", "client-1").await);
        assert!(!registry.client_exists("alice.example.com", "client-1").await.unwrap());
    }
}
