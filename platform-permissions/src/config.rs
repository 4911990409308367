//! Engine configuration
//!
//! Tunables of the permission engine: token staleness, share code shape,
//! retry budgets and the inline scope grammar.

use chrono::Duration;
use platform_rules::ScopeGrammar;

/// Configuration for permission resolution and delegation.
#[derive(Debug, Clone)]
pub struct PermissionsConfig {
    /// Age after which an OAuth access token is rejected as expired
    pub access_token_max_age: Duration,

    /// Length of generated share codes (alphanumeric characters)
    pub code_length: usize,

    /// Attempts at drawing a code that is not already in use
    pub max_code_attempts: u32,

    /// Retries of a patch after losing an optimistic concurrency race
    pub max_conflict_retries: u32,

    /// Grammar used to parse inline scopes
    pub scope_grammar: ScopeGrammar,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            access_token_max_age: Duration::days(7),
            code_length: 32,
            max_code_attempts: 5,
            max_conflict_retries: 3,
            scope_grammar: ScopeGrammar::Basic,
        }
    }
}

impl PermissionsConfig {
    /// Set the access token validity window.
    pub fn with_access_token_max_age(mut self, max_age: Duration) -> Self {
        self.access_token_max_age = max_age;
        self
    }

    /// Set the share code length.
    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Set the number of code generation attempts.
    pub fn with_max_code_attempts(mut self, attempts: u32) -> Self {
        self.max_code_attempts = attempts;
        self
    }

    /// Set the number of conflict retries.
    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Set the scope grammar.
    pub fn with_scope_grammar(mut self, grammar: ScopeGrammar) -> Self {
        self.scope_grammar = grammar;
        self
    }
}
