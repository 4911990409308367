//! # Rules
//!
//! A rule is the atomic grant of the permission system: a set of verbs on
//! a document type, optionally restricted to a list of values.
//!
//! Rules can be:
//! - **Whole-type**: no `values`, applies to every document of the type
//! - **Restricted**: `values` lists the document ids (or, with a
//!   `selector`, the values of that field) the rule applies to

use serde::{Deserialize, Serialize};

use crate::doctypes;
use crate::error::{RuleError, RuleResult};
use crate::verbs::{Verb, VerbSet};

/// A grant of verbs on a document type.
///
/// # Example
///
/// ```
/// use platform_rules::rule::Rule;
/// use platform_rules::verbs::{Verb, VerbSet};
///
/// let rule = Rule::new("io.cozy.files", VerbSet::only(Verb::Get))
///     .with_values(["music-dir"]);
///
/// assert!(rule.allows(Verb::Get, "io.cozy.files", Some("music-dir")));
/// assert!(!rule.allows(Verb::Get, "io.cozy.files", Some("photos-dir")));
/// assert!(!rule.allows(Verb::Get, "io.cozy.files", None));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    /// Document type the rule applies to.
    #[serde(rename = "type")]
    pub doc_type: String,

    /// Verbs granted. Missing in JSON means ALL.
    #[serde(default)]
    pub verbs: VerbSet,

    /// Values the rule is restricted to. Empty means every document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    /// Field `values` are matched against, instead of the document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Free text shown to the user when the rule is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Rule {
    /// Create a whole-type rule with the given verbs.
    pub fn new(doc_type: impl Into<String>, verbs: VerbSet) -> Self {
        Self {
            doc_type: doc_type.into(),
            verbs,
            values: Vec::new(),
            selector: None,
            description: None,
        }
    }

    /// Create a rule granting every verb on every document of a type.
    pub fn whole_type(doc_type: impl Into<String>) -> Self {
        Self::new(doc_type, VerbSet::all())
    }

    /// Restrict the rule to some values.
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Match `values` against a document field instead of the id.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Attach a human readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check if the rule is limited to some values.
    pub fn is_restricted(&self) -> bool {
        !self.values.is_empty()
    }

    /// Check if the rule grants `verb` on `doc_type`, for the whole type
    /// (`value` is `None`) or for one value.
    ///
    /// A restricted rule never grants a whole-type access.
    pub fn allows(&self, verb: Verb, doc_type: &str, value: Option<&str>) -> bool {
        if self.doc_type != doc_type || !self.verbs.contains(verb) {
            return false;
        }
        if !self.is_restricted() {
            return true;
        }
        match value {
            Some(value) => self.values.iter().any(|v| v == value),
            None => false,
        }
    }

    /// Check if the rule grants `verb` on a concrete document, matching
    /// `values` against the selector field when one is set.
    pub fn allows_doc<M: Matchable + ?Sized>(&self, verb: Verb, doc: &M) -> bool {
        if self.doc_type != doc.doc_type() || !self.verbs.contains(verb) {
            return false;
        }
        if !self.is_restricted() {
            return true;
        }
        match &self.selector {
            None => self.values.iter().any(|v| v == doc.id()),
            Some(field) => match doc.field(field) {
                Some(actual) => self.values.iter().any(|v| *v == actual),
                None => false,
            },
        }
    }

    /// Check if everything this rule grants is also granted by `parent`.
    ///
    /// The types must match, the verbs must be a subset, and unless the
    /// parent is whole-type, the values must be a subset matched on the
    /// same selector.
    pub fn is_subset_of(&self, parent: &Rule) -> bool {
        if self.doc_type != parent.doc_type || !self.verbs.is_subset_of(&parent.verbs) {
            return false;
        }
        if !parent.is_restricted() {
            return true;
        }
        if !self.is_restricted() || self.selector != parent.selector {
            return false;
        }
        self.values.iter().all(|v| parent.values.contains(v))
    }

    /// Validate the rule's structure.
    pub fn validate(&self) -> RuleResult<()> {
        doctypes::validate(&self.doc_type)?;
        if self.selector.is_some() && !self.is_restricted() {
            return Err(RuleError::InvalidRule(format!(
                "rule on {} has a selector but no values",
                self.doc_type
            )));
        }
        if self.values.iter().any(|v| v.is_empty()) {
            return Err(RuleError::InvalidRule(format!(
                "rule on {} has an empty value",
                self.doc_type
            )));
        }
        Ok(())
    }
}

/// A document that rules can be matched against.
pub trait Matchable {
    /// Document type.
    fn doc_type(&self) -> &str;

    /// Document identifier.
    fn id(&self) -> &str;

    /// Value of a field, rendered as a string, if the document has it.
    fn field(&self, name: &str) -> Option<String>;
}

/// A reference to a document: its type and id.
///
/// Serialized as `{"type": "...", "id": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocRef {
    /// Document type.
    #[serde(rename = "type")]
    pub doc_type: String,

    /// Document identifier.
    pub id: String,
}

impl DocRef {
    /// Create a reference.
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: id.into(),
        }
    }
}

impl Matchable for DocRef {
    fn doc_type(&self) -> &str {
        &self.doc_type
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" | "_id" => Some(self.id.clone()),
            _ => None,
        }
    }
}
