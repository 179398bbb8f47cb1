use super::{Expr, Grammar, GrammarRule};
use compact_str::CompactString;
use std::sync::Arc;

/// Fluent builder for [`Grammar`]
///
/// Rules are kept in the order they are added, which is also the order in which
/// they receive rule numbers. References are resolved at compile time, so rules
/// may be added in any order.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    grammar: Grammar,
}

impl GrammarBuilder {
    /// Create a builder for `namespace.name`
    #[must_use]
    pub fn new(namespace: impl Into<CompactString>, name: impl Into<CompactString>) -> Self {
        Self {
            grammar: Grammar::new(namespace, name),
        }
    }

    /// Inherit the rules of another grammar
    #[must_use]
    pub fn extends(mut self, base: Arc<Grammar>) -> Self {
        self.grammar.extends.push(base);
        self
    }

    /// Add a rule
    #[must_use]
    pub fn rule(self, name: impl Into<CompactString>, rhs: Expr) -> Self {
        self.add(GrammarRule::new(name, rhs))
    }

    /// Add a leaf rule, matched as a single named terminal when its body is a
    /// literal or a pattern
    #[must_use]
    pub fn leaf(self, name: impl Into<CompactString>, rhs: Expr) -> Self {
        self.add(GrammarRule::new(name, rhs).leaf())
    }

    /// Add a skip rule
    #[must_use]
    pub fn skip(self, name: impl Into<CompactString>, rhs: Expr) -> Self {
        self.add(GrammarRule::new(name, rhs).skip())
    }

    /// Add a prepared rule
    #[must_use]
    pub fn add(mut self, rule: GrammarRule) -> Self {
        self.grammar.rules.push(rule);
        self
    }

    /// Finish the grammar
    #[must_use]
    pub fn build(self) -> Grammar {
        self.grammar
    }
}
