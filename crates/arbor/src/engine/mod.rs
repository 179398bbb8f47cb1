//! # Parse Engine
//!
//! [`Parser`] runs a compiled [`RuntimeRuleSet`] over text.
//!
//! ## Overview
//!
//! Every parse wraps the goal rule as `START goal FINISH`, so only matches
//! spanning the whole input succeed. The graph is grown season by season until
//! nothing changes; the forest is then extracted from the pseudo goal's match.
//!
//! - Ambiguity is never an error: all derivations are kept in the forest
//! - A failed parse reports the furthest position reached, the terminals that
//!   were expected there, and optionally the longest complete match
//! - [`Parser::expected_at`] lists the terminals that may start at a position
//!
//! ```rust
//! use arbor::{Expr, GrammarBuilder, Parser, ParseError};
//!
//! let grammar = GrammarBuilder::new("t", "G")
//!     .rule("S", Expr::seq([Expr::literal("a"), Expr::literal("b")]))
//!     .build();
//! let parser = Parser::from_grammar(&grammar).unwrap();
//!
//! assert!(parser.parse("S", "ab").is_ok());
//! match parser.parse("S", "a") {
//!     Err(ParseError::ParseFailed { position, .. }) => assert_eq!(position, 1),
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```

mod config;
mod grower;
mod metrics;
mod parallel;

pub use config::ParserConfig;
pub use metrics::ParseMetrics;
pub use parallel::{BatchResult, ParseBatch};

pub(crate) use grower::Grower;

use crate::error::{GrammarError, ParseError, describe_expected};
use crate::forest::{NodeIdentity, SharedPackedParseForest};
use crate::graph::ParseGraph;
use crate::grammar::Grammar;
use crate::input::InputSource;
use crate::runtime::{RuleNumber, RuntimeRule, RuntimeRuleSet};
use compact_str::CompactString;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

/// Parser over a shared rule set
///
/// Cheap to clone; clones share the rule set.
#[derive(Debug, Clone)]
pub struct Parser {
    rules: Arc<RuntimeRuleSet>,
    config: ParserConfig,
}

impl Parser {
    /// Create a parser with default configuration
    #[must_use]
    pub fn new(rules: Arc<RuntimeRuleSet>) -> Self {
        Self::with_config(rules, ParserConfig::default())
    }

    #[must_use]
    pub const fn with_config(rules: Arc<RuntimeRuleSet>, config: ParserConfig) -> Self {
        Self { rules, config }
    }

    /// Compile a grammar and create a parser for it
    ///
    /// # Errors
    ///
    /// Any [`GrammarError`] raised by the compiler.
    pub fn from_grammar(grammar: &Grammar) -> Result<Self, GrammarError> {
        Ok(Self::new(Arc::new(RuntimeRuleSet::compile(grammar)?)))
    }

    #[must_use]
    pub const fn rules(&self) -> &Arc<RuntimeRuleSet> {
        &self.rules
    }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `text` as the rule named `goal`
    ///
    /// # Errors
    ///
    /// [`ParseError::RuleNotFound`] when `goal` is not a declared rule, and
    /// [`ParseError::ParseFailed`] when the text does not match it.
    pub fn parse(&self, goal: &str, text: &str) -> Result<SharedPackedParseForest, ParseError> {
        let started = Instant::now();
        let goal_rule = self.resolve_goal(goal)?;
        tracing::debug!(goal, length = text.len(), "parse started");

        let mut input = InputSource::new(text);
        let mut grower = Grower::new(&self.rules, self.config.skip_enabled);
        let graph = grower.grow_goal(goal_rule, &mut input);

        let (hits, misses) = input.cache_stats();
        let metrics = ParseMetrics {
            parse_time: started.elapsed(),
            seasons: grower.seasons(),
            growing_nodes: graph.growing_count(),
            complete_nodes: graph.complete_count(),
            bud_cache_hits: hits,
            bud_cache_misses: misses,
            skip_parses: grower.skip_parses(),
        };
        tracing::debug!(
            goal,
            seasons = metrics.seasons,
            growing_nodes = metrics.growing_nodes,
            complete_nodes = metrics.complete_nodes,
            "parse finished"
        );

        let root = graph
            .pseudo_goal()
            .and_then(|pseudo| graph.find_complete(NodeIdentity::new(pseudo, 0, text.len())));
        match root {
            Some(root) => SharedPackedParseForest::from_goal(&self.rules, &graph, root, text, metrics)
                .ok_or_else(|| self.failure(goal, &graph, &input, text, None)),
            None => Err(self.failure(goal, &graph, &input, text, Some(metrics))),
        }
    }

    /// Read `reader` to the end and parse it
    ///
    /// # Errors
    ///
    /// [`ParseError::Io`] when reading fails, otherwise as [`Self::parse`].
    pub fn parse_reader<R: Read>(&self, goal: &str, mut reader: R) -> Result<SharedPackedParseForest, ParseError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.parse(goal, &text)
    }

    /// Terminals that may legally start at `position`, ordered by rule number
    ///
    /// The text before `position` is grown as a prefix of `goal`; markers,
    /// empty rules and skip rules are left out. A position inside a character
    /// is moved back to the character's start.
    ///
    /// # Errors
    ///
    /// [`ParseError::RuleNotFound`] when `goal` is not a declared rule.
    pub fn expected_at(&self, goal: &str, text: &str, position: usize) -> Result<Vec<&RuntimeRule>, ParseError> {
        let goal_rule = self.resolve_goal(goal)?;
        let mut end = position.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }

        let mut input = InputSource::new(&text[..end]);
        let graph = Grower::new(&self.rules, self.config.skip_enabled).grow_goal(goal_rule, &mut input);
        Ok(graph
            .expected_at(end)
            .into_iter()
            .map(|rule| self.rules.rule(rule))
            .filter(|rule| !rule.is_marker() && !rule.is_empty_rule() && !rule.is_skip())
            .collect())
    }

    fn resolve_goal(&self, goal: &str) -> Result<RuleNumber, ParseError> {
        self.rules
            .find(goal)
            .map(RuntimeRule::number)
            .ok_or_else(|| ParseError::RuleNotFound {
                rule_name: CompactString::from(goal),
            })
    }

    fn failure(
        &self,
        goal: &str,
        graph: &ParseGraph<'_>,
        input: &InputSource<'_>,
        text: &str,
        metrics: Option<ParseMetrics>,
    ) -> ParseError {
        let position = graph.furthest_position();
        let finish = self.rules.finish_marker();
        let expected: Vec<_> = graph
            .expected_at(position)
            .into_iter()
            .map(|rule| self.rules.rule(rule))
            .filter(|rule| {
                rule.number() == finish || !(rule.is_empty_rule() || rule.is_skip() || rule.is_marker())
            })
            .map(|rule| {
                if rule.number() == finish {
                    "end of input".to_string()
                } else {
                    rule.display_name()
                }
            })
            .collect();
        let message = format!(
            "Could not match goal '{goal}' at {}, expected {}",
            input.line_col(position),
            describe_expected(&expected, self.config.max_expected_in_message)
        );
        tracing::debug!(goal, position, "parse failed");

        let longest_match = if self.config.track_longest_match {
            graph.longest_match().map(|node| {
                let metrics = metrics.unwrap_or_default();
                Box::new(SharedPackedParseForest::from_node(&self.rules, graph, node, text, metrics))
            })
        } else {
            None
        };
        ParseError::ParseFailed {
            message,
            position,
            longest_match,
        }
    }

    /// Parse every input of a batch on the rayon pool
    #[cfg(feature = "parallel")]
    pub fn parse_batch(&self, goal: &str, batch: &ParseBatch) -> Vec<BatchResult> {
        parallel::parse_batch(self, goal, batch)
    }
}
