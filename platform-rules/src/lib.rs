//! # Platform Rules
//!
//! The rule algebra of the personal-data platform's permission system,
//! shared by every component that checks or delegates capabilities.
//!
//! ## Overview
//!
//! The platform-rules crate handles:
//! - **Verbs**: GET, POST, PUT, PATCH, DELETE and the ALL wildcard
//! - **Rules**: verbs on a document type, optionally restricted to values
//! - **Rule Sets**: named rules with allow, subset and merge operations
//! - **Scopes**: the inline textual form carried by tokens
//!
//! ## Architecture
//!
//! ```text
//! Rule = Type + Verbs [+ Values [+ Selector]]
//!
//! Examples:
//!   "io.cozy.contacts"                 - every verb on every contact
//!   "io.cozy.files:GET"                - read any file
//!   "io.cozy.files:GET:dir-42"         - read one file (extended grammar)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use platform_rules::{RuleSet, ScopeGrammar, Verb};
//!
//! let set = RuleSet::from_scope("io.cozy.contacts io.cozy.files:GET", ScopeGrammar::Basic).unwrap();
//!
//! assert!(set.allow_whole_type(Verb::Delete, "io.cozy.contacts"));
//! assert!(set.allow(Verb::Get, "io.cozy.files", Some("file-1")));
//! assert!(!set.allow(Verb::Put, "io.cozy.files", Some("file-1")));
//! ```
//!
//! ## Delegation
//!
//! A capability can only hand out a rule set that
//! [`RuleSet::is_subset_of`] its own: same types, fewer or equal verbs,
//! fewer or equal values.

pub mod doctypes;
pub mod error;
pub mod rule;
pub mod scope;
pub mod set;
pub mod verbs;

// Re-export main types for convenience
pub use error::{RuleError, RuleResult};
pub use rule::{DocRef, Matchable, Rule};
pub use scope::ScopeGrammar;
pub use set::RuleSet;
pub use verbs::{Verb, VerbSet};
