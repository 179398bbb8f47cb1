//! # Error Types
//!
//! Errors raised while compiling a grammar and while parsing text.
//!
//! ## Overview
//!
//! - [`GrammarError`]: the grammar could not be compiled into a rule set
//! - [`ParseError`]: the input did not match the goal, or the goal is unknown
//!
//! Ambiguity is never an error: an ambiguous input yields a forest whose nodes
//! carry several alternatives.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, both enums derive
//! `miette::Diagnostic` with stable error codes.

mod expected;

pub(crate) use expected::describe_expected;

use crate::forest::SharedPackedParseForest;
use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors produced by [`RuleCompiler`](crate::RuleCompiler).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("Rule '{rule_name}' is referenced but never declared")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(arbor::grammar::rule_not_found),
            help("declare the rule, or extend a grammar that declares it")
        )
    )]
    RuleNotFound { rule_name: CompactString },

    #[error("Invalid pattern {pattern:?}: {error}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(arbor::grammar::invalid_pattern)))]
    InvalidPattern {
        pattern: CompactString,
        #[source]
        error: regex_automata::meta::BuildError,
    },

    #[error("Rule '{rule_name}' is declared more than once")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(arbor::grammar::duplicate_rule)))]
    DuplicateRule { rule_name: CompactString },

    #[error("Nullable rule '{rule_name}' has no empty rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(arbor::grammar::missing_empty_rule)))]
    MissingEmptyRule { rule_name: CompactString },
}

/// Errors produced by [`Parser`](crate::Parser).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    #[error("{message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(arbor::parse::failed)))]
    ParseFailed {
        message: String,
        /// Furthest byte offset the parse reached.
        position: usize,
        /// Forest rooted at the longest complete match, when tracking is enabled.
        longest_match: Option<Box<SharedPackedParseForest>>,
    },

    #[error("Goal rule '{rule_name}' not found")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(arbor::parse::rule_not_found),
            help("the goal must name a rule declared in the grammar")
        )
    )]
    RuleNotFound { rule_name: CompactString },

    #[error("Failed to read input: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(arbor::parse::io)))]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Furthest position reached by a failed parse.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        match self {
            Self::ParseFailed { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Forest of the longest complete match of a failed parse.
    #[must_use]
    pub fn longest_match(&self) -> Option<&SharedPackedParseForest> {
        match self {
            Self::ParseFailed { longest_match, .. } => longest_match.as_deref(),
            _ => None,
        }
    }
}
