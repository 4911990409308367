//! Permission document storage
//!
//! This module defines the storage abstraction for permission documents and
//! an in-memory implementation. Writes are guarded by revisions: an update
//! or delete carrying a stale revision fails with a conflict, and the caller
//! is expected to reload and retry.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::PermissionDoc;
use crate::error::{PermissionError, PermissionResult};

/// Selection of permission documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionQuery {
    /// Every document of the instance
    All,
    /// Documents owned by a client
    ByClient(String),
    /// Documents holding a share code
    ByCode(String),
}

impl PermissionQuery {
    /// Check if a document is selected.
    pub fn matches(&self, doc: &PermissionDoc) -> bool {
        match self {
            PermissionQuery::All => true,
            PermissionQuery::ByClient(client_id) => doc.client_id == *client_id,
            PermissionQuery::ByCode(code) => doc.has_code(code),
        }
    }
}

/// Storage of permission documents, partitioned by instance domain.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Save a new document. An id is assigned when empty.
    async fn create(&self, instance: &str, doc: PermissionDoc) -> PermissionResult<PermissionDoc>;

    /// Load a document by id.
    async fn get(&self, instance: &str, id: &str) -> PermissionResult<Option<PermissionDoc>>;

    /// Replace a document. Its revision must be the stored one.
    async fn update(&self, instance: &str, doc: PermissionDoc) -> PermissionResult<PermissionDoc>;

    /// Delete a document. Its revision must be the stored one.
    async fn delete(&self, instance: &str, doc: &PermissionDoc) -> PermissionResult<()>;

    /// List the documents matching a query.
    async fn query(&self, instance: &str, query: &PermissionQuery) -> PermissionResult<Vec<PermissionDoc>>;
}

/// In-memory permission store.
///
/// Revisions look like `<generation>-<digest>`, the digest being computed
/// over the document content.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionStore {
    docs: Arc<RwLock<HashMap<String, HashMap<String, PermissionDoc>>>>,
}

impl MemoryPermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored for an instance.
    pub async fn len(&self, instance: &str) -> usize {
        self.docs.read().await.get(instance).map_or(0, HashMap::len)
    }

    fn next_revision(doc: &PermissionDoc) -> PermissionResult<String> {
        let generation = doc
            .rev
            .as_deref()
            .and_then(|rev| rev.split_once('-'))
            .and_then(|(generation, _)| generation.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;

        let content = serde_json::to_vec(&(&doc.perm_type, &doc.rules, &doc.codes, &doc.client_id))
            .map_err(|e| PermissionError::Store(format!("Failed to serialize document: {}", e)))?;
        let digest = URL_SAFE_NO_PAD.encode(Sha256::digest(&content));

        Ok(format!("{}-{}", generation, &digest[..16]))
    }

    fn check_revision(stored: &PermissionDoc, doc: &PermissionDoc) -> PermissionResult<()> {
        if stored.rev != doc.rev {
            return Err(PermissionError::Conflict(doc.id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn create(&self, instance: &str, mut doc: PermissionDoc) -> PermissionResult<PermissionDoc> {
        if doc.id.is_empty() {
            doc.id = Uuid::now_v7().simple().to_string();
        }
        doc.rev = None;
        doc.rev = Some(Self::next_revision(&doc)?);

        let mut docs = self.docs.write().await;
        let instance_docs = docs.entry(instance.to_string()).or_default();
        if instance_docs.contains_key(&doc.id) {
            return Err(PermissionError::Conflict(doc.id.clone()));
        }
        instance_docs.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn get(&self, instance: &str, id: &str) -> PermissionResult<Option<PermissionDoc>> {
        let docs = self.docs.read().await;
        Ok(docs.get(instance).and_then(|d| d.get(id)).cloned())
    }

    async fn update(&self, instance: &str, mut doc: PermissionDoc) -> PermissionResult<PermissionDoc> {
        let mut docs = self.docs.write().await;
        let stored = docs
            .get_mut(instance)
            .and_then(|d| d.get_mut(&doc.id))
            .ok_or_else(|| PermissionError::NotFound(doc.id.clone()))?;
        Self::check_revision(stored, &doc)?;

        doc.rev = Some(Self::next_revision(&doc)?);
        *stored = doc.clone();
        Ok(doc)
    }

    async fn delete(&self, instance: &str, doc: &PermissionDoc) -> PermissionResult<()> {
        let mut docs = self.docs.write().await;
        let instance_docs = docs
            .get_mut(instance)
            .ok_or_else(|| PermissionError::NotFound(doc.id.clone()))?;
        let stored = instance_docs
            .get(&doc.id)
            .ok_or_else(|| PermissionError::NotFound(doc.id.clone()))?;
        Self::check_revision(stored, doc)?;

        instance_docs.remove(&doc.id);
        Ok(())
    }

    async fn query(&self, instance: &str, query: &PermissionQuery) -> PermissionResult<Vec<PermissionDoc>> {
        let docs = self.docs.read().await;
        let mut matching: Vec<PermissionDoc> = docs
            .get(instance)
            .map(|d| d.values().filter(|doc| query.matches(doc)).cloned().collect())
            .unwrap_or_default();
        // ids are v7 uuids, so this is creation order
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }
}
