//! # Runtime Rules
//!
//! The flat, immutable rule table a [`Parser`](crate::Parser) runs against.
//!
//! ## Overview
//!
//! [`RuleCompiler`] turns a [`Grammar`](crate::Grammar) into a [`RuntimeRuleSet`]:
//!
//! - every named rule, literal, pattern and nullable construct gets a dense
//!   [`RuleNumber`]
//! - nested anonymous constructs become virtual rules named
//!   `§owner§kind<path>`
//! - skip rules are gathered under a synthesized skip goal
//! - start and finish markers wrap the goal of each parse
//!
//! The rule set is `Send + Sync` and meant to be built once and shared, usually
//! behind an [`Arc`](std::sync::Arc).

mod compiler;
mod item;
mod rule;

pub use compiler::RuleCompiler;
pub use item::{Alternative, RuleItem};
pub use rule::{RuleKind, RuleNumber, RuntimeRule, TerminalKind};

use crate::error::GrammarError;
use crate::grammar::{Grammar, ItemPath};
use hashbrown::HashMap;
use lasso::{RodeoReader, Spur};

/// Compiled rule table
#[derive(Debug)]
pub struct RuntimeRuleSet {
    pub(crate) grammar_name: String,
    pub(crate) rules: Vec<RuntimeRule>,
    pub(crate) names: RodeoReader,
    pub(crate) by_name: HashMap<Spur, RuleNumber, ahash::RandomState>,
    pub(crate) origins: HashMap<RuleNumber, ItemPath, ahash::RandomState>,
    pub(crate) skip_rules: Vec<RuleNumber>,
    pub(crate) skip_goal: Option<RuleNumber>,
    pub(crate) start_marker: RuleNumber,
    pub(crate) finish_marker: RuleNumber,
}

impl RuntimeRuleSet {
    /// Compile a grammar
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] when a reference cannot be resolved, a pattern
    /// does not compile, or a local rule is declared twice.
    pub fn compile(grammar: &Grammar) -> Result<Self, GrammarError> {
        RuleCompiler::new(grammar).build()
    }

    /// Qualified name of the compiled grammar
    #[must_use]
    pub fn grammar_name(&self) -> &str {
        &self.grammar_name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn rules(&self) -> &[RuntimeRule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuntimeRule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn get(&self, number: RuleNumber) -> Option<&RuntimeRule> {
        self.rules.get(number.index())
    }

    /// Rule by number. Numbers handed out by this set are always valid.
    pub(crate) fn rule(&self, number: RuleNumber) -> &RuntimeRule {
        &self.rules[number.index()]
    }

    /// Look up a named grammar rule. Anonymous terminals and virtual rules are
    /// not reachable by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&RuntimeRule> {
        let key = self.names.get(name)?;
        let number = self.by_name.get(&key)?;
        self.get(*number)
    }

    /// Look up any rule by its tag, including anonymous and virtual rules.
    /// Named rules win over anonymous terminals with the same text.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Option<&RuntimeRule> {
        self.find(tag)
            .or_else(|| self.rules.iter().find(|rule| rule.tag() == tag))
    }

    /// Grammar location a virtual rule was synthesized from
    #[must_use]
    pub fn origin_of(&self, number: RuleNumber) -> Option<&ItemPath> {
        self.origins.get(&number)
    }

    #[must_use]
    pub fn skip_rules(&self) -> &[RuleNumber] {
        &self.skip_rules
    }

    /// One-or-more repetition over all skip rules, present when the grammar has
    /// skip rules
    #[must_use]
    pub const fn skip_goal(&self) -> Option<RuleNumber> {
        self.skip_goal
    }

    #[must_use]
    pub const fn start_marker(&self) -> RuleNumber {
        self.start_marker
    }

    #[must_use]
    pub const fn finish_marker(&self) -> RuleNumber {
        self.finish_marker
    }

    /// Number reserved for the per-parse pseudo goal; never a valid index
    pub(crate) fn pseudo_goal(&self) -> RuleNumber {
        RuleNumber::from_index(self.rules.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expr, GrammarBuilder};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_rule_set_is_shareable() {
        assert_send_sync::<RuntimeRuleSet>();
    }

    #[test]
    fn test_find_by_name_and_tag() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::seq([Expr::literal("a"), Expr::rule("S")]))
            .build();
        let rules = RuntimeRuleSet::compile(&grammar).expect("compiles");

        let s = rules.find("S").expect("S declared");
        assert_eq!(s.number(), RuleNumber::new(0));
        assert!(rules.find("a").is_none());
        let a = rules.find_by_tag("a").expect("literal terminal");
        assert!(a.is_terminal());
        assert_eq!(rules.pseudo_goal().index(), rules.len());
    }
}
