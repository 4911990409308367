//! Existence and verb resolver
//!
//! Answers, for a list of document references, which verbs the stored
//! permission documents of the instance grant on each of them.

use platform_rules::{DocRef, VerbSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::context::Instance;
use crate::error::PermissionResult;
use crate::store::PermissionQuery;

/// A document reference and the verbs granted on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefAndVerbs {
    /// Document type
    #[serde(rename = "type")]
    pub doc_type: String,

    /// Document identifier
    pub id: String,

    /// Union of the verbs granted by every matching rule
    pub verbs: VerbSet,
}

/// Resolves the verbs granted on documents across one instance.
#[derive(Debug, Clone, Copy)]
pub struct ExistenceResolver<'a> {
    instance: &'a Instance,
}

impl<'a> ExistenceResolver<'a> {
    /// Create a resolver for an instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Resolve the verbs granted on each reference.
    ///
    /// References no stored rule matches are left out. Duplicate references
    /// are answered once, in the order they first appear.
    pub async fn resolve(&self, refs: &[DocRef]) -> PermissionResult<Vec<RefAndVerbs>> {
        let docs = self
            .instance
            .store()
            .query(self.instance.domain(), &PermissionQuery::All)
            .await?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for doc_ref in refs {
            if !seen.insert(doc_ref) {
                continue;
            }

            let verbs = docs
                .iter()
                .filter_map(|doc| doc.rules.verbs_for(&doc_ref.doc_type, &doc_ref.id))
                .reduce(|mut acc, verbs| {
                    acc.union_with(&verbs);
                    acc
                });

            if let Some(verbs) = verbs {
                resolved.push(RefAndVerbs {
                    doc_type: doc_ref.doc_type.clone(),
                    id: doc_ref.id.clone(),
                    verbs,
                });
            }
        }

        Ok(resolved)
    }
}

#[cfg(all(test, feature = "jwt"))]
mod tests {
    use super::*;
    use crate::context::memory_instance;
    use crate::document::PermissionDoc;
    use crate::store::PermissionStore;
    use platform_rules::{Rule, RuleSet, Verb};
    use std::collections::BTreeMap;

    const DOMAIN: &str = "alice.example.com";

    fn rule(verbs: &[Verb], values: &[&str]) -> Rule {
        Rule::new("io.cozy.events", VerbSet::from_verbs(verbs.iter().copied()))
            .with_values(values.iter().copied())
    }

    #[tokio::test]
    async fn test_union_across_documents() {
        let (instance, store, _) = memory_instance(DOMAIN);

        let mut first = RuleSet::new();
        first.insert("patch", rule(&[Verb::Patch], &["ev1", "ev2"]));
        let mut second = RuleSet::new();
        second.insert("delete", rule(&[Verb::Delete], &["ev1"]));
        second.insert("get", rule(&[Verb::Get], &["ev3"]));

        for rules in [first, second] {
            store
                .create(DOMAIN, PermissionDoc::share("client-1", rules, BTreeMap::new(), 0))
                .await
                .unwrap();
        }

        let refs = vec![
            DocRef::new("io.cozy.events", "ev1"),
            DocRef::new("io.cozy.events", "ev3"),
            DocRef::new("io.cozy.events", "ev4"),
            DocRef::new("io.cozy.files", "ev1"),
            DocRef::new("io.cozy.events", "ev1"),
        ];
        let resolved = ExistenceResolver::new(&instance).resolve(&refs).await.unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id, "ev1");
        assert_eq!(resolved[0].verbs.to_string(), "PATCH,DELETE");
        assert_eq!(resolved[1].id, "ev3");
        assert_eq!(resolved[1].verbs.to_string(), "GET");
    }

    #[tokio::test]
    async fn test_json_shape() {
        let entry = RefAndVerbs {
            doc_type: "io.cozy.events".to_string(),
            id: "ev1".to_string(),
            verbs: VerbSet::only(Verb::Get),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "io.cozy.events");
        assert_eq!(json["verbs"], serde_json::json!(["GET"]));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (instance, _, _) = memory_instance(DOMAIN);
        let refs = vec![DocRef::new("io.cozy.events", "ev1")];
        assert!(ExistenceResolver::new(&instance).resolve(&refs).await.unwrap().is_empty());
    }
}
