//! # Forest Rendering
//!
//! Indented text rendering of forest nodes for debugging and tests.
//!
//! Leaves print as `name : "text"`, branches as `name {` followed by their
//! children. An ambiguous branch prints every child list under a `|priority|`
//! header. Shared nodes are printed at each place they occur. A node that
//! occurs inside its own derivation, as in `S = S | 'a'`, prints as
//! `name (cycle)` the second time.

use super::{NodeIdentity, SpptNode};
use std::fmt::Write;

/// Configuration for rendering forests
#[derive(Debug, Clone)]
pub struct PrettyConfig {
    /// Indentation string (e.g., "  " or "\t")
    pub indent: String,
    /// Whether to render skip nodes
    pub show_skip: bool,
    /// Leaf text longer than this is cut, `None` keeps it whole
    pub max_text_len: Option<usize>,
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self {
            indent: "  ".into(),
            show_skip: true,
            max_text_len: None,
        }
    }
}

impl PrettyConfig {
    #[must_use]
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    #[must_use]
    pub const fn with_skip(mut self, show: bool) -> Self {
        self.show_skip = show;
        self
    }

    #[must_use]
    pub const fn with_max_text_len(mut self, len: Option<usize>) -> Self {
        self.max_text_len = len;
        self
    }
}

pub(super) fn write_node(out: &mut String, node: SpptNode<'_>, config: &PrettyConfig, depth: usize) {
    Renderer {
        out,
        config,
        path: Vec::new(),
    }
    .node(node, depth);
}

struct Renderer<'o, 'c> {
    out: &'o mut String,
    config: &'c PrettyConfig,
    /// Branches being printed, outermost first
    path: Vec<NodeIdentity>,
}

impl Renderer<'_, '_> {
    fn node(&mut self, node: SpptNode<'_>, depth: usize) {
        if node.is_skip() && !self.config.show_skip {
            return;
        }
        push_indent(self.out, self.config, depth);
        if let Some(leaf) = node.as_leaf() {
            let text = clip(leaf.matched_text(), self.config);
            let _ = writeln!(self.out, "{} : {text:?}", leaf.rule().display_name());
            return;
        }
        let Some(branch) = node.as_branch() else {
            return;
        };
        if self.path.contains(&node.identity()) {
            let _ = writeln!(self.out, "{} (cycle)", node.name());
            return;
        }

        self.path.push(node.identity());
        let alternatives = branch.children_alternatives();
        if alternatives.len() <= 1 {
            let _ = writeln!(self.out, "{} {{", node.name());
            for child in alternatives.iter().flat_map(|alternative| alternative.children()) {
                self.node(*child, depth + 1);
            }
        } else {
            let _ = writeln!(self.out, "{} ({} alternatives) {{", node.name(), alternatives.len());
            for alternative in &alternatives {
                push_indent(self.out, self.config, depth + 1);
                let _ = writeln!(self.out, "|{}| {{", alternative.priority());
                for child in alternative.children() {
                    self.node(*child, depth + 2);
                }
                push_indent(self.out, self.config, depth + 1);
                self.out.push_str("}\n");
            }
        }
        self.path.pop();
        push_indent(self.out, self.config, depth);
        self.out.push_str("}\n");
    }
}

fn push_indent(out: &mut String, config: &PrettyConfig, depth: usize) {
    for _ in 0..depth {
        out.push_str(&config.indent);
    }
}

fn clip<'t>(text: &'t str, config: &PrettyConfig) -> &'t str {
    match config.max_text_len {
        Some(max) if text.len() > max => {
            let mut end = max;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            &text[..end]
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use crate::{Expr, GrammarBuilder, Parser};

    #[test]
    fn test_tree_string_shows_skip_and_leaves() {
        let grammar = GrammarBuilder::new("t", "G")
            .skip("WS", Expr::pattern(" +"))
            .rule("S", Expr::seq([Expr::literal("a"), Expr::literal("b")]))
            .build();
        let forest = Parser::from_grammar(&grammar)
            .expect("compiles")
            .parse("S", "a b")
            .expect("parses");

        let tree = forest.to_tree_string();
        assert_eq!(tree, "S {\n  'a' : \"a\"\n  WS : \" \"\n  'b' : \"b\"\n}\n");

        let without_skip = forest.to_tree_string_with(&super::PrettyConfig::default().with_skip(false));
        assert!(!without_skip.contains("WS"));
    }

    #[test]
    fn test_tree_string_marks_ambiguity() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule(
                "S",
                Expr::choice([Expr::seq([Expr::literal("a"), Expr::literal("b")]), Expr::literal("ab")]),
            )
            .build();
        let forest = Parser::from_grammar(&grammar)
            .expect("compiles")
            .parse("S", "ab")
            .expect("parses");

        let tree = forest.root().to_tree_string();
        assert!(tree.starts_with("S (2 alternatives) {"), "{tree}");
        assert!(tree.contains("|0| {"));
        assert!(tree.contains("|1| {"));
        assert!(tree.contains("'ab' : \"ab\""));
    }

    #[test]
    fn test_tree_string_stops_at_cycles() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::choice([Expr::rule("S"), Expr::literal("a")]))
            .build();
        let forest = Parser::from_grammar(&grammar)
            .expect("compiles")
            .parse("S", "a")
            .expect("parses");

        let tree = forest.to_tree_string();
        assert_eq!(
            tree,
            "S (2 alternatives) {\n  |0| {\n    S (cycle)\n  }\n  |1| {\n    'a' : \"a\"\n  }\n}\n"
        );
    }
}
