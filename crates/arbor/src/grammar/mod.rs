//! # Grammar Model
//!
//! Grammars as consumed by the [`RuleCompiler`](crate::RuleCompiler).
//!
//! ## Overview
//!
//! A [`Grammar`] is a namespaced list of [`GrammarRule`]s. It may extend other
//! grammars, inheriting their rules; a local rule overrides an inherited rule of
//! the same name. Rule bodies are [`Expr`] trees.
//!
//! Grammars are usually assembled with [`GrammarBuilder`]:
//!
//! ```rust
//! use arbor::{Expr, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::new("test", "List")
//!     .skip("WS", Expr::pattern(r"\s+"))
//!     .rule("S", Expr::separated(Expr::rule("ID"), Expr::literal(","), 1, None))
//!     .leaf("ID", Expr::pattern("[a-z]+"))
//!     .build();
//!
//! assert_eq!(grammar.qualified_name(), "test.List");
//! assert!(grammar.find_rule("ID").is_some_and(|rule| rule.is_leaf));
//! ```

mod builder;
mod expr;

pub use builder::GrammarBuilder;
pub use expr::{ChoiceKind, Expr};

use compact_str::CompactString;
use hashbrown::HashSet;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A named production
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct GrammarRule {
    pub name: CompactString,
    pub rhs: Expr,
    /// Matched between any two symbols instead of being referenced
    pub is_skip: bool,
    /// A single literal or pattern body compiles to a named terminal
    pub is_leaf: bool,
}

impl GrammarRule {
    #[must_use]
    pub fn new(name: impl Into<CompactString>, rhs: Expr) -> Self {
        Self {
            name: name.into(),
            rhs,
            is_skip: false,
            is_leaf: false,
        }
    }

    /// Mark the rule as a skip rule
    #[must_use]
    pub const fn skip(mut self) -> Self {
        self.is_skip = true;
        self
    }

    /// Mark the rule as a leaf rule
    #[must_use]
    pub const fn leaf(mut self) -> Self {
        self.is_leaf = true;
        self
    }
}

/// A grammar: namespace, name, extended grammars and local rules
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Grammar {
    pub namespace: CompactString,
    pub name: CompactString,
    pub extends: Vec<Arc<Self>>,
    pub rules: Vec<GrammarRule>,
}

impl Grammar {
    #[must_use]
    pub fn new(namespace: impl Into<CompactString>, name: impl Into<CompactString>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            extends: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// `namespace.name`, or just the name when the namespace is empty
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Find a rule by name, local rules first, then extended grammars in order
    #[must_use]
    pub fn find_rule(&self, name: &str) -> Option<&GrammarRule> {
        self.rules
            .iter()
            .find(|rule| rule.name == name)
            .or_else(|| self.extends.iter().find_map(|base| base.find_rule(name)))
    }

    /// All visible rules: inherited rules depth first in declaration order, then
    /// local rules. Inherited rules overridden locally are left out, and when two
    /// extended grammars define the same name the first one wins.
    #[must_use]
    pub fn all_rules(&self) -> Vec<&GrammarRule> {
        let local: HashSet<&str, ahash::RandomState> =
            self.rules.iter().map(|rule| rule.name.as_str()).collect();
        let mut seen: HashSet<&str, ahash::RandomState> = HashSet::default();
        let mut result = Vec::new();
        for base in &self.extends {
            for rule in base.all_rules() {
                if !local.contains(rule.name.as_str()) && seen.insert(rule.name.as_str()) {
                    result.push(rule);
                }
            }
        }
        result.extend(self.rules.iter());
        result
    }

    /// The grammar expression an item path points at
    #[must_use]
    pub fn item_at(&self, path: &ItemPath) -> Option<&Expr> {
        let rule = self.find_rule(&path.rule)?;
        path.indices
            .iter()
            .try_fold(&rule.rhs, |expr, &index| expr.child(index))
    }
}

/// Location of a sub-expression inside a named rule
///
/// Each index steps into a child: alternatives of a choice, items of a
/// concatenation, the item of a repetition (0), or the separator of a separated
/// list (1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ItemPath {
    pub rule: CompactString,
    pub indices: SmallVec<[u32; 4]>,
}

impl ItemPath {
    #[must_use]
    pub fn new(rule: impl Into<CompactString>, indices: &[u32]) -> Self {
        Self {
            rule: rule.into(),
            indices: SmallVec::from_slice(indices),
        }
    }

    /// Indices joined by `.`
    #[must_use]
    pub fn dotted(&self) -> String {
        self.indices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rule, self.dotted())
    }
}
