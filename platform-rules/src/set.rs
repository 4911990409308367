//! # Rule Sets
//!
//! A rule set maps rule names to rules and represents the total grants of
//! one capability. Names are unique; their order carries no meaning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RuleResult;
use crate::rule::{Matchable, Rule};
use crate::scope::{self, ScopeGrammar};
use crate::verbs::{Verb, VerbSet};

/// Named collection of rules.
///
/// Serialized as a JSON object of name to rule.
///
/// # Example
///
/// ```
/// use platform_rules::{Rule, RuleSet, Verb, VerbSet};
///
/// let mut parent = RuleSet::new();
/// parent.insert("files", Rule::whole_type("io.cozy.files"));
///
/// let mut child = RuleSet::new();
/// child.insert(
///     "music",
///     Rule::new("io.cozy.files", VerbSet::only(Verb::Get)).with_values(["io.cozy.music"]),
/// );
///
/// assert!(child.is_subset_of(&parent));
/// assert!(!parent.is_subset_of(&child));
/// assert!(child.allow(Verb::Get, "io.cozy.files", Some("io.cozy.music")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Parse an inline scope with the given grammar.
    pub fn from_scope(scope: &str, grammar: ScopeGrammar) -> RuleResult<Self> {
        scope::parse_scope(scope, grammar)
    }

    /// Render the set as an inline scope, in name order.
    pub fn to_scope(&self) -> String {
        self.rules
            .values()
            .map(scope::render_rule)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Insert a rule, returning the rule it replaced under that name.
    pub fn insert(&mut self, name: impl Into<String>, rule: Rule) -> Option<Rule> {
        self.rules.insert(name.into(), rule)
    }

    /// Get a rule by name.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Remove a rule by name.
    pub fn remove(&mut self, name: &str) -> Option<Rule> {
        self.rules.remove(name)
    }

    /// Iterate `(name, rule)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rule)> {
        self.rules.iter()
    }

    /// Iterate the rules.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the set grants nothing.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check if some rule grants `verb` on `doc_type`, for the whole type
    /// (`value` is `None`) or for a single value.
    pub fn allow(&self, verb: Verb, doc_type: &str, value: Option<&str>) -> bool {
        self.rules.values().any(|rule| rule.allows(verb, doc_type, value))
    }

    /// Check if some rule grants `verb` on every document of `doc_type`.
    pub fn allow_whole_type(&self, verb: Verb, doc_type: &str) -> bool {
        self.allow(verb, doc_type, None)
    }

    /// Check if some rule grants `verb` on a concrete document.
    pub fn allow_doc<M: Matchable + ?Sized>(&self, verb: Verb, doc: &M) -> bool {
        self.rules.values().any(|rule| rule.allows_doc(verb, doc))
    }

    /// Check if every rule of this set is covered by some rule of `parent`.
    ///
    /// An empty set is a subset of anything.
    pub fn is_subset_of(&self, parent: &RuleSet) -> bool {
        self.rules
            .values()
            .all(|child| parent.rules.values().any(|p| child.is_subset_of(p)))
    }

    /// Merge another set into this one. Rules with the same name are
    /// overwritten by `additions`.
    pub fn merge(&mut self, additions: &RuleSet) {
        for (name, rule) in &additions.rules {
            self.rules.insert(name.clone(), rule.clone());
        }
    }

    /// Union of the verbs granted on a document id by id-matched rules.
    ///
    /// Rules with a selector match a field the id says nothing about, so
    /// they are skipped. Returns `None` when no rule covers the document.
    pub fn verbs_for(&self, doc_type: &str, id: &str) -> Option<VerbSet> {
        let mut verbs: Option<VerbSet> = None;
        for rule in self.rules.values() {
            if rule.doc_type != doc_type || rule.selector.is_some() {
                continue;
            }
            if rule.is_restricted() && !rule.values.iter().any(|v| v == id) {
                continue;
            }
            match verbs.as_mut() {
                Some(acc) => acc.union_with(&rule.verbs),
                None => verbs = Some(rule.verbs.clone()),
            }
        }
        verbs
    }

    /// Validate every rule.
    pub fn validate(&self) -> RuleResult<()> {
        self.rules.values().try_for_each(Rule::validate)
    }
}

impl FromIterator<(String, Rule)> for RuleSet {
    fn from_iter<T: IntoIterator<Item = (String, Rule)>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = (&'a String, &'a Rule);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
