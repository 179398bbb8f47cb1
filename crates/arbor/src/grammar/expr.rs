//! Right-hand side expressions of grammar rules.

use compact_str::CompactString;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// How the alternatives of a [`Expr::Choice`] relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ChoiceKind {
    /// Every matching alternative is kept in the forest
    #[default]
    Ambiguous,
    /// Alternatives are ordered; the order is recorded as the priority of each
    /// derivation so callers can pick one
    Priority,
}

/// Grammar expression
///
/// One closed set of constructs. Nested constructs that are not plain symbol
/// references are compiled into virtual rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Expr {
    /// Matches the empty string
    Empty,
    /// Exact text
    Literal(CompactString),
    /// Regular expression, matched anchored at the current position
    Pattern(CompactString),
    /// Reference to a named rule
    NonTerminal(CompactString),
    /// Parenthesised sub-expression
    Group(Box<Self>),
    /// Alternatives
    Choice {
        kind: ChoiceKind,
        alternatives: Vec<Self>,
    },
    /// Sequence of items
    Concatenation(Vec<Self>),
    /// Repetition of one item, `max: None` is unbounded
    Multi {
        min: u32,
        max: Option<u32>,
        item: Box<Self>,
    },
    /// Repetition of one item separated by another, counted in items
    SeparatedList {
        min: u32,
        max: Option<u32>,
        item: Box<Self>,
        separator: Box<Self>,
    },
}

impl Expr {
    /// Create an empty expression
    #[must_use]
    pub const fn empty() -> Self {
        Self::Empty
    }

    /// Create a literal expression
    #[must_use]
    pub fn literal(text: impl Into<CompactString>) -> Self {
        Self::Literal(text.into())
    }

    /// Create a pattern expression
    #[must_use]
    pub fn pattern(regex: impl Into<CompactString>) -> Self {
        Self::Pattern(regex.into())
    }

    /// Create a reference to a named rule
    #[must_use]
    pub fn rule(name: impl Into<CompactString>) -> Self {
        Self::NonTerminal(name.into())
    }

    /// Create a group expression
    #[must_use]
    pub fn group(expr: Self) -> Self {
        Self::Group(Box::new(expr))
    }

    /// Create a sequence expression
    #[must_use]
    pub fn seq<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut items: Vec<_> = exprs.into_iter().collect();
        if items.len() == 1
            && let Some(only) = items.pop()
        {
            return only;
        }
        Self::Concatenation(items)
    }

    /// Create an ambiguous choice expression
    #[must_use]
    pub fn choice<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self::choice_of(ChoiceKind::Ambiguous, exprs)
    }

    /// Create a priority choice expression
    #[must_use]
    pub fn priority_choice<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self::choice_of(ChoiceKind::Priority, exprs)
    }

    fn choice_of<I>(kind: ChoiceKind, exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut alternatives: Vec<_> = exprs.into_iter().collect();
        if alternatives.len() == 1
            && let Some(only) = alternatives.pop()
        {
            return only;
        }
        Self::Choice { kind, alternatives }
    }

    /// Create an optional expression (zero or one)
    #[must_use]
    pub fn opt(expr: Self) -> Self {
        Self::multi(expr, 0, Some(1))
    }

    /// Create a Kleene star expression (zero or more)
    #[must_use]
    pub fn star(expr: Self) -> Self {
        Self::multi(expr, 0, None)
    }

    /// Create a Kleene plus expression (one or more)
    #[must_use]
    pub fn plus(expr: Self) -> Self {
        Self::multi(expr, 1, None)
    }

    /// Create a repetition expression
    #[must_use]
    pub fn multi(item: Self, min: u32, max: Option<u32>) -> Self {
        Self::Multi {
            min,
            max,
            item: Box::new(item),
        }
    }

    /// Create a separated list expression
    #[must_use]
    pub fn separated(item: Self, separator: Self, min: u32, max: Option<u32>) -> Self {
        Self::SeparatedList {
            min,
            max,
            item: Box::new(item),
            separator: Box::new(separator),
        }
    }

    /// Kind label used in the names of virtual rules
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Literal(_) => "literal",
            Self::Pattern(_) => "pattern",
            Self::NonTerminal(_) => "ref",
            Self::Group(_) => "group",
            Self::Choice { .. } => "choice",
            Self::Concatenation(_) => "concatenation",
            Self::Multi { .. } => "multi",
            Self::SeparatedList { .. } => "sList",
        }
    }

    /// Whether this expression is a single symbol (a terminal or a rule reference)
    #[must_use]
    pub const fn is_symbol(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Pattern(_) | Self::NonTerminal(_))
    }

    /// Sub-expression at `index`, using the same numbering as item paths
    #[must_use]
    pub fn child(&self, index: u32) -> Option<&Self> {
        let index = usize::try_from(index).ok()?;
        match self {
            Self::Choice { alternatives, .. } => alternatives.get(index),
            Self::Concatenation(items) => items.get(index),
            Self::Group(inner) | Self::Multi { item: inner, .. } => {
                (index == 0).then_some(inner.as_ref())
            }
            Self::SeparatedList {
                item, separator, ..
            } => match index {
                0 => Some(item.as_ref()),
                1 => Some(separator.as_ref()),
                _ => None,
            },
            Self::Empty | Self::Literal(_) | Self::Pattern(_) | Self::NonTerminal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_of_one_is_the_item() {
        assert_eq!(Expr::seq([Expr::literal("a")]), Expr::literal("a"));
        assert_eq!(Expr::seq([]), Expr::Concatenation(vec![]));
    }

    #[test]
    fn test_choice_kinds() {
        let choice = Expr::priority_choice([Expr::literal("a"), Expr::literal("b")]);
        assert!(matches!(
            choice,
            Expr::Choice {
                kind: ChoiceKind::Priority,
                ..
            }
        ));
        assert_eq!(Expr::choice([Expr::rule("A")]), Expr::rule("A"));
    }

    #[test]
    fn test_child_indexing() {
        let list = Expr::separated(Expr::rule("A"), Expr::literal(","), 0, None);
        assert_eq!(list.child(0), Some(&Expr::rule("A")));
        assert_eq!(list.child(1), Some(&Expr::literal(",")));
        assert_eq!(list.child(2), None);
        assert_eq!(Expr::opt(Expr::rule("B")).child(0), Some(&Expr::rule("B")));
    }
}
