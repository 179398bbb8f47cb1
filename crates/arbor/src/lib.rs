//! # Arbor
//!
//! A scannerless generalized parser that produces Shared Packed Parse Forests.
//!
//! ## Overview
//!
//! Arbor parses text directly against byte positions, without a separate lexing
//! pass, for any context-free grammar:
//!
//! - **Ambiguous grammars**: every derivation is kept, packed under shared nodes
//! - **Left recursion**: direct and indirect, no grammar rewriting required
//! - **Epsilon productions**: nullable constructs get dedicated empty terminals
//! - **Skip rules**: whitespace and comments are matched between symbols and kept
//!   in the forest, flagged so callers can ignore them
//!
//! Parsing happens in two stages. A [`Grammar`] is compiled once into an immutable
//! [`RuntimeRuleSet`], which is cheap to share between threads. A [`Parser`] then
//! grows a graph-structured stack over the input for a given goal rule and
//! extracts a [`SharedPackedParseForest`].
//!
//! ## Quick Start
//!
//! ```rust
//! use arbor::{Expr, GrammarBuilder, Parser};
//!
//! let grammar = GrammarBuilder::new("demo", "Sum")
//!     .skip("WS", Expr::pattern(r"\s+"))
//!     .leaf("NUM", Expr::pattern("[0-9]+"))
//!     .rule(
//!         "S",
//!         Expr::choice([
//!             Expr::rule("NUM"),
//!             Expr::seq([Expr::rule("S"), Expr::literal("+"), Expr::rule("NUM")]),
//!         ]),
//!     )
//!     .build();
//!
//! let parser = Parser::from_grammar(&grammar).expect("grammar compiles");
//! let forest = parser.parse("S", "1 + 2 + 3").expect("input parses");
//!
//! let root = forest.root();
//! assert_eq!(root.name(), "S");
//! assert_eq!(root.matched_text(), "1 + 2 + 3");
//! ```
//!
//! ## Feature Flags
//!
//! - `diagnostics`: derive [`miette::Diagnostic`] on the error types
//! - `serialize`: serde support for the grammar model, node identities and metrics
//! - `parallel`: [`Parser::parse_batch`] parses many inputs on a rayon pool

pub mod engine;
pub mod error;
pub mod forest;
pub mod grammar;
pub mod input;
pub mod runtime;

pub(crate) mod graph;

pub use engine::{ParseMetrics, Parser, ParserConfig};
pub use error::{GrammarError, ParseError};
pub use forest::{
    NodeIdentity, SharedPackedParseForest, SpptAlternative, SpptBranch, SpptLeaf, SpptNode,
};
pub use grammar::{ChoiceKind, Expr, Grammar, GrammarBuilder, GrammarRule, ItemPath};
pub use input::{Bud, InputSource, LineCol, LineIndex};
pub use runtime::{
    RuleCompiler, RuleItem, RuleKind, RuleNumber, RuntimeRule, RuntimeRuleSet, TerminalKind,
};
