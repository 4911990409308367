//! Permission documents
//!
//! A permission document is the persisted unit of delegation: the rules it
//! grants, the client that owns it, its delegation depth and the share
//! codes that resolve to it.

use platform_rules::RuleSet;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of a permission document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    /// Grants of an external OAuth client
    Oauth,
    /// Grants of an installed application
    App,
    /// Grants of the command line tool
    Cli,
    /// Grants delegated to share recipients
    Share,
}

impl PermissionType {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Oauth => "oauth",
            PermissionType::App => "app",
            PermissionType::Cli => "cli",
            PermissionType::Share => "share",
        }
    }
}

/// A permission document.
///
/// Documents built from a token's inline scope are ephemeral: they have no
/// revision and are never written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDoc {
    /// Document identifier, assigned by the store
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Revision, assigned by the store
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    /// Kind of permission
    #[serde(rename = "type")]
    pub perm_type: PermissionType,

    /// Rules granted
    #[serde(rename = "permissions")]
    pub rules: RuleSet,

    /// Recipient name to share code
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub codes: BTreeMap<String, String>,

    /// Client (or app slug) owning the document
    pub client_id: String,

    /// Kind of grant that delegated the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_type: Option<PermissionType>,

    /// 0 for top-level grants, 1 for their delegations
    #[serde(default)]
    pub parent_depth: u8,
}

impl PermissionDoc {
    /// Build the unsaved, top-level document of a token's own grants.
    pub fn ephemeral(perm_type: PermissionType, client_id: impl Into<String>, rules: RuleSet) -> Self {
        Self {
            id: String::new(),
            rev: None,
            perm_type,
            rules,
            codes: BTreeMap::new(),
            client_id: client_id.into(),
            owner_type: None,
            parent_depth: 0,
        }
    }

    /// Build an unsaved share document delegated from a grant of depth
    /// `parent_depth`.
    pub fn share(
        client_id: impl Into<String>,
        rules: RuleSet,
        codes: BTreeMap<String, String>,
        parent_depth: u8,
    ) -> Self {
        Self {
            id: String::new(),
            rev: None,
            perm_type: PermissionType::Share,
            rules,
            codes,
            client_id: client_id.into(),
            owner_type: None,
            parent_depth: parent_depth + 1,
        }
    }

    /// Record the kind of grant the document was delegated from.
    pub fn with_owner_type(mut self, owner_type: PermissionType) -> Self {
        self.owner_type = Some(owner_type);
        self
    }

    /// Check if the document was loaded from the store.
    pub fn is_persisted(&self) -> bool {
        self.rev.is_some()
    }

    /// Check if the document may be the parent of a delegation.
    pub fn can_delegate(&self) -> bool {
        self.parent_depth == 0
    }

    /// Check if a code resolves to this document.
    pub fn has_code(&self, code: &str) -> bool {
        self.codes.values().any(|c| c == code)
    }
}

/// Partial update of a permission document.
///
/// `codes` only carries recipient names: when the request body maps names
/// to values, the values are dropped and fresh codes are generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPatch {
    /// Rules to merge into the document, by name
    #[serde(rename = "permissions", default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleSet>,

    /// Recipient names replacing the document's codes
    #[serde(
        default,
        deserialize_with = "deserialize_code_names",
        skip_serializing_if = "Option::is_none"
    )]
    pub codes: Option<BTreeSet<String>>,
}

impl PermissionPatch {
    /// Patch adding rules.
    pub fn add_rules(rules: RuleSet) -> Self {
        Self {
            rules: Some(rules),
            codes: None,
        }
    }

    /// Patch replacing the codes.
    pub fn replace_codes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: None,
            codes: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Check if the patch changes nothing.
    pub fn is_noop(&self) -> bool {
        self.rules.as_ref().map_or(true, RuleSet::is_empty) && self.codes.is_none()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CodeNames {
    List(Vec<String>),
    Map(BTreeMap<String, serde_json::Value>),
}

fn deserialize_code_names<'de, D>(deserializer: D) -> Result<Option<BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Option::<CodeNames>::deserialize(deserializer)?;
    Ok(names.map(|names| match names {
        CodeNames::List(list) => list.into_iter().collect(),
        CodeNames::Map(map) => map.into_keys().collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_rules::{Rule, Verb, VerbSet};

    fn music_rules() -> RuleSet {
        let mut rules = RuleSet::new();
        rules.insert(
            "whatever",
            Rule::new("io.cozy.files", VerbSet::only(Verb::Get)).with_values(["io.cozy.music"]),
        );
        rules
    }

    #[test]
    fn test_share_depth() {
        let doc = PermissionDoc::share("client-1", music_rules(), BTreeMap::new(), 0);
        assert_eq!(doc.parent_depth, 1);
        assert_eq!(doc.perm_type, PermissionType::Share);
        assert!(!doc.can_delegate());
        assert!(!doc.is_persisted());

        let top = PermissionDoc::ephemeral(PermissionType::Oauth, "client-1", RuleSet::new());
        assert!(top.can_delegate());
    }

    #[test]
    fn test_json_shape() {
        let codes = BTreeMap::from([("alice".to_string(), "abc".to_string())]);
        let doc = PermissionDoc::share("client-1", music_rules(), codes, 0);
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json.get("_id").is_none());
        assert_eq!(json["type"], "share");
        assert_eq!(json["permissions"]["whatever"]["type"], "io.cozy.files");
        assert_eq!(json["codes"]["alice"], "abc");
        assert_eq!(json["parent_depth"], 1);
        assert!(doc.has_code("abc"));
        assert!(!doc.has_code("alice"));
        assert!(json.get("owner_type").is_none());

        let owned = doc.with_owner_type(PermissionType::Oauth);
        let json = serde_json::to_value(&owned).unwrap();
        assert_eq!(json["owner_type"], "oauth");
    }

    #[test]
    fn test_patch_codes_from_map_ignore_values() {
        let patch: PermissionPatch =
            serde_json::from_str(r#"{"codes": {"john": "set-token"}}"#).unwrap();
        assert_eq!(patch.codes, Some(BTreeSet::from(["john".to_string()])));
        assert!(patch.rules.is_none());
        assert!(!patch.is_noop());
    }

    #[test]
    fn test_patch_codes_from_list() {
        let patch: PermissionPatch = serde_json::from_str(r#"{"codes": ["john", "jane"]}"#).unwrap();
        assert_eq!(patch.codes.unwrap().len(), 2);
    }

    #[test]
    fn test_patch_rules() {
        let patch: PermissionPatch = serde_json::from_str(
            r#"{"permissions": {"otherperm": {"type": "io.cozy.contacts"}}}"#,
        )
        .unwrap();
        let rules = patch.rules.unwrap();
        assert!(rules.get("otherperm").unwrap().verbs.is_all());
    }

    #[test]
    fn test_noop_patch() {
        let patch: PermissionPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_noop());
        assert!(PermissionPatch::add_rules(RuleSet::new()).is_noop());
        assert!(!PermissionPatch::replace_codes(Vec::<String>::new()).is_noop());
    }
}
