//! # Scopes
//!
//! Inline scopes are the space separated rule lists carried by tokens,
//! e.g. `"io.cozy.contacts io.cozy.files:GET"`.
//!
//! ```text
//! Basic:     type | type:VERBS
//! Extended:  type | type:VERBS | type:VERBS:values | type:VERBS:values:selector
//!
//! VERBS  = ALL | VERB[,VERB]*
//! values = value[,value]*
//! ```
//!
//! Parsed rules are named `rule0`, `rule1`, ... in scope order.

use crate::error::{RuleError, RuleResult};
use crate::rule::Rule;
use crate::set::RuleSet;
use crate::verbs::VerbSet;

/// Version of the inline scope grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeGrammar {
    /// `type` and `type:VERBS` only.
    #[default]
    Basic,
    /// Basic plus restricted values and selector.
    Extended,
}

/// Name given to the rule parsed at `index` in a scope.
pub fn rule_name(index: usize) -> String {
    format!("rule{}", index)
}

/// Parse a single scope token into a rule.
pub fn parse_rule(token: &str, grammar: ScopeGrammar) -> RuleResult<Rule> {
    let max_parts = match grammar {
        ScopeGrammar::Basic => 2,
        ScopeGrammar::Extended => 4,
    };
    let parts: Vec<&str> = token.splitn(max_parts, ':').collect();
    if grammar == ScopeGrammar::Basic && token.matches(':').count() > 1 {
        return Err(RuleError::InvalidScope(format!(
            "`{}` needs the extended scope grammar",
            token
        )));
    }

    let mut rule = Rule::whole_type(parts[0]);
    if let Some(verbs) = parts.get(1) {
        rule.verbs = verbs
            .parse::<VerbSet>()
            .map_err(|e| RuleError::InvalidScope(format!("`{}`: {}", token, e)))?;
    }
    if let Some(values) = parts.get(2) {
        rule.values = values.split(',').map(str::to_string).collect();
    }
    if let Some(selector) = parts.get(3) {
        rule.selector = Some(selector.to_string());
    }

    rule.validate()
        .map_err(|e| RuleError::InvalidScope(format!("`{}`: {}", token, e)))?;
    Ok(rule)
}

/// Parse a whole scope. An empty scope yields an empty rule set.
///
/// # Example
///
/// ```
/// use platform_rules::scope::{parse_scope, ScopeGrammar};
/// use platform_rules::verbs::Verb;
///
/// let set = parse_scope("io.cozy.contacts io.cozy.files:GET", ScopeGrammar::Basic).unwrap();
/// assert_eq!(set.len(), 2);
/// assert!(set.get("rule0").unwrap().verbs.is_all());
/// assert_eq!(set.get("rule1").unwrap().verbs.to_string(), "GET");
/// assert!(set.allow(Verb::Get, "io.cozy.files", None));
/// assert!(!set.allow(Verb::Post, "io.cozy.files", None));
/// ```
pub fn parse_scope(scope: &str, grammar: ScopeGrammar) -> RuleResult<RuleSet> {
    let mut set = RuleSet::new();
    for (index, token) in scope.split_whitespace().enumerate() {
        set.insert(rule_name(index), parse_rule(token, grammar)?);
    }
    Ok(set)
}

/// Render a rule as a scope token. Rules with values render in the
/// extended grammar.
pub fn render_rule(rule: &Rule) -> String {
    let mut out = rule.doc_type.clone();
    if !rule.verbs.is_all() || rule.is_restricted() {
        out.push(':');
        out.push_str(&rule.verbs.to_string());
    }
    if rule.is_restricted() {
        out.push(':');
        out.push_str(&rule.values.join(","));
        if let Some(selector) = &rule.selector {
            out.push(':');
            out.push_str(selector);
        }
    }
    out
}
