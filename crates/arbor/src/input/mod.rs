//! # Input Source
//!
//! Terminal matching against the text being parsed.
//!
//! ## Overview
//!
//! There is no lexer: terminals are matched on demand at the byte positions the
//! parse graph asks about. Every attempt, successful or not, is cached per
//! `(terminal, position)` as a [`Bud`], so ambiguous regions that revisit a
//! position never re-run a pattern.

mod line_col;

pub use line_col::{LineCol, LineIndex};

use crate::runtime::{RuleNumber, RuntimeRule, TerminalKind};
use hashbrown::HashMap;
use regex_automata::{Anchored, Input};
use std::cell::OnceCell;

/// A terminal match at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bud {
    pub rule: RuleNumber,
    pub start: usize,
    pub length: usize,
}

impl Bud {
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Text of one parse plus its terminal match cache
#[derive(Debug)]
pub struct InputSource<'t> {
    text: &'t str,
    buds: HashMap<(RuleNumber, usize), Option<usize>, ahash::RandomState>,
    hits: usize,
    misses: usize,
    line_index: OnceCell<LineIndex>,
}

impl<'t> InputSource<'t> {
    #[must_use]
    pub fn new(text: &'t str) -> Self {
        Self {
            text,
            buds: HashMap::default(),
            hits: 0,
            misses: 0,
            line_index: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn text(&self) -> &'t str {
        self.text
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Match `terminal` at `position`, reusing an earlier attempt when there is
    /// one. Non-terminals never match.
    pub fn fetch_or_create_bud(&mut self, terminal: &RuntimeRule, position: usize) -> Option<Bud> {
        let key = (terminal.number(), position);
        let length = if let Some(&cached) = self.buds.get(&key) {
            self.hits += 1;
            cached
        } else {
            self.misses += 1;
            let length = terminal
                .terminal()
                .and_then(|kind| self.match_terminal(kind, position));
            self.buds.insert(key, length);
            length
        };
        length.map(|length| Bud {
            rule: terminal.number(),
            start: position,
            length,
        })
    }

    fn match_terminal(&self, terminal: &TerminalKind, position: usize) -> Option<usize> {
        let rest = self.text.get(position..)?;
        match terminal {
            TerminalKind::Literal(literal) => {
                rest.starts_with(literal.as_str()).then_some(literal.len())
            }
            TerminalKind::Pattern { regex, .. } => {
                // the whole text stays visible so assertions like `\b` see what precedes `position`
                let input = Input::new(self.text).range(position..).anchored(Anchored::Yes);
                regex.search(&input).map(|found| found.end() - position)
            }
            TerminalKind::Empty => Some(0),
            TerminalKind::StartMarker => (position == 0).then_some(0),
            TerminalKind::FinishMarker => rest.is_empty().then_some(0),
        }
    }

    /// Cache hits and misses so far
    #[must_use]
    pub const fn cache_stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    /// Line index of the text, built on first use
    pub fn line_index(&self) -> &LineIndex {
        self.line_index.get_or_init(|| LineIndex::new(self.text))
    }

    /// Line and column of a byte offset
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        self.line_index().line_col(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expr, GrammarBuilder, RuntimeRuleSet};

    fn rules() -> RuntimeRuleSet {
        let grammar = GrammarBuilder::new("t", "G")
            .rule(
                "S",
                Expr::seq([
                    Expr::literal("ab"),
                    Expr::pattern("[0-9]+"),
                    Expr::opt(Expr::literal("c")),
                ]),
            )
            .build();
        RuntimeRuleSet::compile(&grammar).expect("compiles")
    }

    #[test]
    fn test_literal_and_pattern_buds() {
        let rules = rules();
        let mut input = InputSource::new("ab123c");
        let literal = rules.find_by_tag("ab").expect("literal");
        let pattern = rules.find_by_tag("[0-9]+").expect("pattern");

        let bud = input.fetch_or_create_bud(literal, 0).expect("matches");
        assert_eq!((bud.start, bud.length, bud.end()), (0, 2, 2));
        assert_eq!(input.fetch_or_create_bud(pattern, 2).map(|bud| bud.length), Some(3));
        assert!(input.fetch_or_create_bud(pattern, 0).is_none());
        assert!(input.fetch_or_create_bud(literal, 1).is_none());
    }

    #[test]
    fn test_bud_cache_counts_failures_too() {
        let rules = rules();
        let mut input = InputSource::new("xyz");
        let literal = rules.find_by_tag("ab").expect("literal");

        assert!(input.fetch_or_create_bud(literal, 0).is_none());
        assert!(input.fetch_or_create_bud(literal, 0).is_none());
        assert_eq!(input.cache_stats(), (1, 1));
    }

    #[test]
    fn test_markers_and_empty() {
        let rules = rules();
        let mut input = InputSource::new("ab");
        let start = rules.rule(rules.start_marker());
        let finish = rules.rule(rules.finish_marker());
        let empty = rules
            .iter()
            .find(|rule| rule.is_empty_rule())
            .expect("optional has an empty rule");

        assert!(input.fetch_or_create_bud(start, 0).is_some());
        assert!(input.fetch_or_create_bud(start, 1).is_none());
        assert!(input.fetch_or_create_bud(finish, 1).is_none());
        assert_eq!(input.fetch_or_create_bud(finish, 2).map(|bud| bud.length), Some(0));
        assert_eq!(input.fetch_or_create_bud(empty, 1).map(|bud| bud.length), Some(0));
    }

    #[test]
    fn test_positions_inside_a_character_never_match() {
        let rules = rules();
        let mut input = InputSource::new("é1");
        let pattern = rules.find_by_tag("[0-9]+").expect("pattern");
        assert!(input.fetch_or_create_bud(pattern, 1).is_none());
        assert!(input.fetch_or_create_bud(pattern, 2).is_some());
        assert_eq!(input.line_col(2).to_string(), "1:3");
    }

    #[test]
    fn test_patterns_see_text_before_position() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::seq([Expr::pattern(r"\bend"), Expr::literal("!")]))
            .build();
        let rules = RuntimeRuleSet::compile(&grammar).expect("compiles");
        let pattern = rules.find_by_tag(r"\bend").expect("pattern");
        let mut input = InputSource::new("append end!");

        assert!(input.fetch_or_create_bud(pattern, 3).is_none());
        assert_eq!(input.fetch_or_create_bud(pattern, 7).map(|bud| bud.length), Some(3));
    }
}
