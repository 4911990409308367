//! # Verbs
//!
//! The HTTP verbs a rule can grant, and the set type rules carry.
//! A [`VerbSet`] always renders its verbs in the fixed order
//! GET, POST, PUT, PATCH, DELETE, whatever order it was built in.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{RuleError, RuleResult};

/// A verb that can be applied to documents.
///
/// The declaration order is the canonical rendering order, and `Ord`
/// follows it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// Read a document or list documents.
    Get,
    /// Create a document.
    Post,
    /// Replace a document.
    Put,
    /// Partially update a document.
    Patch,
    /// Destroy a document.
    Delete,
}

impl Verb {
    /// Get the canonical (uppercase) representation of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// Parse a verb, case-insensitively.
    ///
    /// # Example
    ///
    /// ```
    /// use platform_rules::verbs::Verb;
    ///
    /// assert_eq!(Verb::parse("get"), Some(Verb::Get));
    /// assert_eq!(Verb::parse("PATCH"), Some(Verb::Patch));
    /// assert_eq!(Verb::parse("HEAD"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "PATCH" => Some(Verb::Patch),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    /// All verbs in canonical order.
    pub fn all() -> [Verb; 5] {
        [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete]
    }

    /// Check if the verb leaves documents untouched.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Verb::Get)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-empty set of verbs. The full set is the ALL wildcard.
///
/// # Example
///
/// ```
/// use platform_rules::verbs::{Verb, VerbSet};
///
/// let a = VerbSet::from_verbs([Verb::Delete, Verb::Patch]);
/// let b = VerbSet::from_verbs([Verb::Patch, Verb::Delete]);
/// assert_eq!(a.to_string(), "PATCH,DELETE");
/// assert_eq!(a.to_string(), b.to_string());
/// assert_eq!(VerbSet::all().to_string(), "ALL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerbSet {
    verbs: BTreeSet<Verb>,
}

impl VerbSet {
    /// The ALL wildcard: every verb.
    pub fn all() -> Self {
        Self {
            verbs: Verb::all().into_iter().collect(),
        }
    }

    /// A set holding a single verb.
    pub fn only(verb: Verb) -> Self {
        Self {
            verbs: BTreeSet::from([verb]),
        }
    }

    /// Build a set from verbs. An empty input yields ALL, so a set is never
    /// empty.
    pub fn from_verbs<I>(verbs: I) -> Self
    where
        I: IntoIterator<Item = Verb>,
    {
        let verbs: BTreeSet<Verb> = verbs.into_iter().collect();
        if verbs.is_empty() {
            Self::all()
        } else {
            Self { verbs }
        }
    }

    /// Check if the set grants a verb.
    pub fn contains(&self, verb: Verb) -> bool {
        self.verbs.contains(&verb)
    }

    /// Check if this is the ALL wildcard.
    pub fn is_all(&self) -> bool {
        self.verbs.len() == Verb::all().len()
    }

    /// Check if every verb of this set is also granted by `other`.
    pub fn is_subset_of(&self, other: &VerbSet) -> bool {
        other.is_all() || self.verbs.is_subset(&other.verbs)
    }

    /// Add every verb of `other` to this set.
    pub fn union_with(&mut self, other: &VerbSet) {
        self.verbs.extend(other.verbs.iter().copied());
    }

    /// Iterate the verbs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Verb> + '_ {
        self.verbs.iter().copied()
    }

    /// Number of verbs in the set.
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}

impl Default for VerbSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Verb> for VerbSet {
    fn from_iter<T: IntoIterator<Item = Verb>>(iter: T) -> Self {
        Self::from_verbs(iter)
    }
}

impl fmt::Display for VerbSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str("ALL");
        }
        let rendered: Vec<&str> = self.verbs.iter().map(Verb::as_str).collect();
        f.write_str(&rendered.join(","))
    }
}

impl FromStr for VerbSet {
    type Err = RuleError;

    /// Parse `ALL` or a comma separated verb list such as `GET,POST`.
    fn from_str(s: &str) -> RuleResult<Self> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(Self::all());
        }
        let mut verbs = BTreeSet::new();
        for part in s.split(',') {
            let verb = Verb::parse(part).ok_or_else(|| RuleError::UnknownVerb(part.to_string()))?;
            verbs.insert(verb);
        }
        Ok(Self { verbs })
    }
}

impl Serialize for VerbSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_all() {
            let mut seq = serializer.serialize_seq(Some(1))?;
            seq.serialize_element("ALL")?;
            return seq.end();
        }
        let mut seq = serializer.serialize_seq(Some(self.verbs.len()))?;
        for verb in &self.verbs {
            seq.serialize_element(verb.as_str())?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for VerbSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        let mut verbs = BTreeSet::new();
        for item in &raw {
            if item.trim().eq_ignore_ascii_case("ALL") {
                return Ok(Self::all());
            }
            let verb = Verb::parse(item)
                .ok_or_else(|| de::Error::custom(format!("unknown verb `{}`", item)))?;
            verbs.insert(verb);
        }
        Ok(Self::from_verbs(verbs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_parsing() {
        assert_eq!(Verb::parse("GET"), Some(Verb::Get));
        assert_eq!(Verb::parse("post"), Some(Verb::Post));
        assert_eq!(Verb::parse(" Put "), Some(Verb::Put));
        assert_eq!(Verb::parse("patch"), Some(Verb::Patch));
        assert_eq!(Verb::parse("delete"), Some(Verb::Delete));
        assert_eq!(Verb::parse("OPTIONS"), None);
    }

    #[test]
    fn test_rendering_is_order_independent() {
        let a = VerbSet::from_verbs([Verb::Delete, Verb::Patch]);
        let b = VerbSet::from_verbs([Verb::Patch, Verb::Delete]);
        assert_eq!(a.to_string(), "PATCH,DELETE");
        assert_eq!(b.to_string(), "PATCH,DELETE");

        let c = VerbSet::from_verbs([Verb::Delete, Verb::Get, Verb::Put]);
        assert_eq!(c.to_string(), "GET,PUT,DELETE");
    }

    #[test]
    fn test_empty_input_is_all() {
        let set = VerbSet::from_verbs(Vec::new());
        assert!(set.is_all());
        assert!(!set.is_empty());
        assert_eq!(set.to_string(), "ALL");
    }

    #[test]
    fn test_subset() {
        let get = VerbSet::only(Verb::Get);
        let get_post = VerbSet::from_verbs([Verb::Get, Verb::Post]);
        assert!(get.is_subset_of(&get_post));
        assert!(!get_post.is_subset_of(&get));
        assert!(get_post.is_subset_of(&VerbSet::all()));
        assert!(!VerbSet::all().is_subset_of(&get_post));
    }

    #[test]
    fn test_union() {
        let mut set = VerbSet::only(Verb::Get);
        set.union_with(&VerbSet::only(Verb::Delete));
        assert_eq!(set.to_string(), "GET,DELETE");

        set.union_with(&VerbSet::from_verbs([Verb::Post, Verb::Put, Verb::Patch]));
        assert!(set.is_all());
    }

    #[test]
    fn test_from_str() {
        let set: VerbSet = "GET,post".parse().unwrap();
        assert_eq!(set.to_string(), "GET,POST");
        assert!("all".parse::<VerbSet>().unwrap().is_all());
        assert_eq!(
            "GET,FETCH".parse::<VerbSet>(),
            Err(RuleError::UnknownVerb("FETCH".to_string()))
        );
    }

    #[test]
    fn test_json_form() {
        let set = VerbSet::from_verbs([Verb::Patch, Verb::Get]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["GET","PATCH"]"#);
        assert_eq!(serde_json::to_string(&VerbSet::all()).unwrap(), r#"["ALL"]"#);

        let parsed: VerbSet = serde_json::from_str(r#"["DELETE","GET"]"#).unwrap();
        assert_eq!(parsed.to_string(), "GET,DELETE");
        let all: VerbSet = serde_json::from_str("[]").unwrap();
        assert!(all.is_all());
        assert!(serde_json::from_str::<VerbSet>(r#"["FETCH"]"#).is_err());
    }
}
