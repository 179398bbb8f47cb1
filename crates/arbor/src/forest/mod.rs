//! # Shared Packed Parse Forest
//!
//! The result of a successful parse.
//!
//! ## Overview
//!
//! Every node is identified by its rule, start and length
//! ([`NodeIdentity`]), and each identity appears exactly once. A node matched
//! in more than one way keeps every derivation, so the forest represents all
//! parse trees of an ambiguous input without duplicating shared parts.
//!
//! Derivations stay packed: a child list is stored as its last child plus a
//! shared prefix, and prefixes fork wherever the parse graph did. A repetition
//! with exponentially many tilings therefore takes polynomial space. Explicit
//! child lists are only built by [`SpptBranch::children`] (one list) and
//! [`SpptBranch::children_alternatives`] (all of them).
//!
//! Nodes are visited through lightweight handles:
//!
//! - [`SpptNode`]: any node, with its span and matched text
//! - [`SpptBranch`]: a non-terminal match and its child lists
//! - [`SpptLeaf`]: a terminal match
//!
//! Skip matches (whitespace, comments) stay in the forest. They appear in
//! [`SpptBranch::children`] so concatenating child texts gives back the input,
//! and are filtered out by [`SpptBranch::non_skip_children`].
//!
//! ```rust
//! use arbor::{Expr, GrammarBuilder, Parser};
//!
//! let grammar = GrammarBuilder::new("t", "G")
//!     .rule(
//!         "S",
//!         Expr::choice([
//!             Expr::seq([Expr::literal("a"), Expr::literal("b")]),
//!             Expr::literal("ab"),
//!         ]),
//!     )
//!     .build();
//! let forest = Parser::from_grammar(&grammar).unwrap().parse("S", "ab").unwrap();
//!
//! let root = forest.root().as_branch().unwrap();
//! assert!(root.is_ambiguous());
//! assert_eq!(root.children_alternatives().len(), 2);
//! ```

mod identity;
mod node;
mod pretty;

pub use identity::NodeIdentity;
pub use node::{SpptAlternative, SpptBranch, SpptLeaf, SpptNode};
pub use pretty::PrettyConfig;

use crate::engine::ParseMetrics;
use crate::graph::{CompleteId, GrowingId, ParseGraph};
use crate::runtime::{RuleNumber, RuntimeRuleSet};
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Child list of one derivation
type ChildIds = SmallVec<[ForestId; 4]>;

macro_rules! forest_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        struct $name(u32);

        impl $name {
            #[allow(clippy::cast_possible_truncation)] // Forests are bounded by u32 indices
            const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

// node of the forest
forest_id!(ForestId);
// shared head of one or more child lists
forest_id!(PrefixId);

#[derive(Debug, Clone, Copy)]
struct PackedAlternative {
    priority: u32,
    /// `None` for a derivation without children
    tail: Option<PrefixId>,
}

/// Last child of a list and the prefix before it; `None` is the empty prefix
#[derive(Debug, Clone, Copy)]
struct PrefixLink {
    prior: Option<PrefixId>,
    child: ForestId,
}

#[derive(Debug, Clone, Default)]
struct PrefixNode {
    /// Sorted by child identity
    links: SmallVec<[PrefixLink; 2]>,
}

#[derive(Debug, Clone)]
struct ForestNode {
    identity: NodeIdentity,
    /// Sorted by priority; empty for leaves
    alternatives: Vec<PackedAlternative>,
    /// Distinct child lists over all alternatives, saturating
    derivations: usize,
}

/// Parse forest with its rule set, text and metrics
#[derive(Clone)]
pub struct SharedPackedParseForest {
    rules: Arc<RuntimeRuleSet>,
    text: Arc<str>,
    nodes: Vec<ForestNode>,
    prefixes: Vec<PrefixNode>,
    root: ForestId,
    leading_skip: Vec<ForestId>,
    metrics: ParseMetrics,
}

impl SharedPackedParseForest {
    /// Forest below the pseudo goal's match: the goal child becomes the root
    /// and skip matched before it is kept as leading skip
    pub(crate) fn from_goal(
        rules: &Arc<RuntimeRuleSet>,
        graph: &ParseGraph<'_>,
        pseudo: CompleteId,
        text: &str,
        metrics: ParseMetrics,
    ) -> Option<Self> {
        let mut extraction = Extraction::new(graph);
        let children = graph.first_children(pseudo);
        // START, leading skip, goal, FINISH
        let goal_index = children.len().checked_sub(2).filter(|&index| index >= 1)?;
        let root = extraction.node_id(children[goal_index]);
        let leading_skip = children[1..goal_index]
            .iter()
            .map(|&child| extraction.node_id(child))
            .collect();
        extraction.run();
        Some(extraction.finish(rules, text, root, leading_skip, metrics))
    }

    /// Forest rooted at any complete node of a graph
    pub(crate) fn from_node(
        rules: &Arc<RuntimeRuleSet>,
        graph: &ParseGraph<'_>,
        node: CompleteId,
        text: &str,
        metrics: ParseMetrics,
    ) -> Self {
        let mut extraction = Extraction::new(graph);
        let root = extraction.node_id(node);
        extraction.run();
        extraction.finish(rules, text, root, Vec::new(), metrics)
    }

    /// The goal match
    #[must_use]
    pub const fn root(&self) -> SpptNode<'_> {
        SpptNode::new(self, self.root)
    }

    /// Skip matched before the goal
    #[must_use]
    pub fn leading_skip(&self) -> Vec<SpptNode<'_>> {
        self.leading_skip.iter().map(|&id| SpptNode::new(self, id)).collect()
    }

    /// The parsed text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn rules(&self) -> &Arc<RuntimeRuleSet> {
        &self.rules
    }

    #[must_use]
    pub const fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }

    /// Distinct nodes reachable from the root and the leading skip
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every node, in extraction order
    pub fn nodes(&self) -> impl Iterator<Item = SpptNode<'_>> {
        (0..self.nodes.len()).map(|index| SpptNode::new(self, ForestId::from_index(index)))
    }

    /// Branches with more than one child list
    #[must_use]
    pub fn ambiguous_nodes(&self) -> Vec<SpptBranch<'_>> {
        self.nodes()
            .filter_map(|node| node.as_branch())
            .filter(SpptBranch::is_ambiguous)
            .collect()
    }

    /// Node with the given identity, if the forest contains it
    #[must_use]
    pub fn find(&self, identity: NodeIdentity) -> Option<SpptNode<'_>> {
        self.nodes().find(|node| node.identity() == identity)
    }

    /// Nodes of the named rule
    pub fn find_all<'f>(&'f self, name: &'f str) -> impl Iterator<Item = SpptNode<'f>> + 'f {
        self.nodes().filter(move |node| node.name() == name)
    }

    /// Indented rendering of the whole forest, ambiguities included
    #[must_use]
    pub fn to_tree_string(&self) -> String {
        self.to_tree_string_with(&PrettyConfig::default())
    }

    #[must_use]
    pub fn to_tree_string_with(&self, config: &PrettyConfig) -> String {
        let mut out = String::new();
        for skip in self.leading_skip() {
            pretty::write_node(&mut out, skip, config, 0);
        }
        pretty::write_node(&mut out, self.root(), config, 0);
        out
    }

    fn node(&self, id: ForestId) -> &ForestNode {
        &self.nodes[id.index()]
    }

    fn rule_of(&self, id: ForestId) -> RuleNumber {
        self.node(id).identity.rule
    }

    /// The list reached by taking the first link of every prefix
    fn first_list(&self, tail: Option<PrefixId>) -> ChildIds {
        let mut children = ChildIds::new();
        let mut current = tail;
        while let Some(prefix) = current {
            let Some(link) = self.prefixes[prefix.index()].links.first() else {
                break;
            };
            children.push(link.child);
            current = link.prior;
        }
        children.reverse();
        children
    }

    /// Every list ending in `tail`, the first list first
    fn all_lists(&self, tail: Option<PrefixId>) -> Vec<ChildIds> {
        let mut lists = Vec::new();
        // prefix still to walk, children after it in reverse order
        let mut pending = vec![(tail, ChildIds::new())];
        while let Some((prefix, mut suffix)) = pending.pop() {
            let Some(prefix) = prefix else {
                suffix.reverse();
                lists.push(suffix);
                continue;
            };
            for link in self.prefixes[prefix.index()].links.iter().rev() {
                let mut next = suffix.clone();
                next.push(link.child);
                pending.push((link.prior, next));
            }
        }
        lists
    }
}

impl fmt::Debug for SharedPackedParseForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPackedParseForest")
            .field("grammar", &self.rules.grammar_name())
            .field("root", &self.root())
            .field("nodes", &self.nodes.len())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Copies the part of a parse graph reachable from some roots into a forest,
/// keeping derivations packed
struct Extraction<'g, 'r> {
    graph: &'g ParseGraph<'r>,
    ids: HashMap<CompleteId, ForestId, ahash::RandomState>,
    prefix_ids: HashMap<GrowingId, Option<PrefixId>, ahash::RandomState>,
    nodes: Vec<ForestNode>,
    prefixes: Vec<PrefixNode>,
    queue: Vec<CompleteId>,
    prefix_queue: Vec<(GrowingId, PrefixId)>,
}

impl<'g, 'r> Extraction<'g, 'r> {
    fn new(graph: &'g ParseGraph<'r>) -> Self {
        Self {
            graph,
            ids: HashMap::default(),
            prefix_ids: HashMap::default(),
            nodes: Vec::new(),
            prefixes: Vec::new(),
            queue: Vec::new(),
            prefix_queue: Vec::new(),
        }
    }

    fn node_id(&mut self, node: CompleteId) -> ForestId {
        if let Some(&id) = self.ids.get(&node) {
            return id;
        }
        let id = ForestId::from_index(self.nodes.len());
        self.nodes.push(ForestNode {
            identity: self.graph.identity(node),
            alternatives: Vec::new(),
            derivations: 0,
        });
        self.ids.insert(node, id);
        self.queue.push(node);
        id
    }

    /// Seeds have no links and become the empty prefix
    fn prefix_id(&mut self, node: GrowingId) -> Option<PrefixId> {
        if let Some(&id) = self.prefix_ids.get(&node) {
            return id;
        }
        let id = if self.graph.links(node).is_empty() {
            None
        } else {
            let id = PrefixId::from_index(self.prefixes.len());
            self.prefixes.push(PrefixNode::default());
            self.prefix_queue.push((node, id));
            Some(id)
        };
        self.prefix_ids.insert(node, id);
        id
    }

    fn run(&mut self) {
        loop {
            if let Some(node) = self.queue.pop() {
                self.fill_node(node);
            } else if let Some((node, id)) = self.prefix_queue.pop() {
                self.fill_prefix(node, id);
            } else {
                break;
            }
        }
    }

    fn fill_node(&mut self, node: CompleteId) {
        let graph = self.graph;
        if graph.is_terminal(graph.identity(node).rule) {
            return;
        }
        let mut derivations = graph.derivations(node).to_vec();
        derivations.sort_by_key(|derivation| (derivation.alternative, graph.dot(derivation.tail)));
        let alternatives = derivations
            .iter()
            .map(|derivation| PackedAlternative {
                priority: derivation.alternative,
                tail: self.prefix_id(derivation.tail),
            })
            .collect();
        let id = self.ids[&node];
        self.nodes[id.index()].alternatives = alternatives;
    }

    fn fill_prefix(&mut self, node: GrowingId, id: PrefixId) {
        let graph = self.graph;
        let mut links = graph.links(node).to_vec();
        links.sort_by_key(|link| (graph.identity(link.child), graph.dot(link.prior)));
        self.prefixes[id.index()].links = links
            .iter()
            .map(|link| PrefixLink {
                prior: self.prefix_id(link.prior),
                child: self.node_id(link.child),
            })
            .collect();
    }

    /// Number of lists ending in each prefix, saturating
    fn list_counts(&self) -> Vec<usize> {
        let mut counts: Vec<Option<usize>> = vec![None; self.prefixes.len()];
        let mut pending = Vec::new();
        for root in 0..self.prefixes.len() {
            pending.push(root);
            while let Some(&top) = pending.last() {
                if counts[top].is_some() {
                    pending.pop();
                    continue;
                }
                let links = &self.prefixes[top].links;
                let before = pending.len();
                pending.extend(
                    links
                        .iter()
                        .filter_map(|link| link.prior)
                        .map(PrefixId::index)
                        .filter(|&prior| counts[prior].is_none()),
                );
                if pending.len() == before {
                    let count = links.iter().fold(0usize, |sum, link| {
                        sum.saturating_add(link.prior.map_or(1, |prior| counts[prior.index()].unwrap_or(0)))
                    });
                    counts[top] = Some(count);
                    pending.pop();
                }
            }
        }
        counts.into_iter().map(|count| count.unwrap_or(0)).collect()
    }

    fn finish(
        mut self,
        rules: &Arc<RuntimeRuleSet>,
        text: &str,
        root: ForestId,
        leading_skip: Vec<ForestId>,
        metrics: ParseMetrics,
    ) -> SharedPackedParseForest {
        let counts = self.list_counts();
        for node in &mut self.nodes {
            node.derivations = node.alternatives.iter().fold(0usize, |sum, alternative| {
                sum.saturating_add(alternative.tail.map_or(1, |tail| counts[tail.index()]))
            });
        }
        SharedPackedParseForest {
            rules: Arc::clone(rules),
            text: Arc::from(text),
            nodes: self.nodes,
            prefixes: self.prefixes,
            root,
            leading_skip,
            metrics,
        }
    }
}
