//! # Parse Graph
//!
//! Graph-structured stack and packed node registry of a single parse.
//!
//! ## Overview
//!
//! - **Growing nodes** are partial derivations keyed by
//!   `(rule, alternative, dot, start, end)`. Each keeps packed links
//!   `(prior growing node, child)`, so every way of reaching the same key is
//!   shared instead of copied.
//! - **Stack heads** are keyed by `(rule, position)`. They hold the callers
//!   waiting for that rule there and the completions already found, which is
//!   what makes left recursion and late callers work.
//! - **Complete nodes** are keyed by [`NodeIdentity`]. A second derivation of an
//!   existing identity becomes another derivation of the same node.
//!
//! Links never form a cycle, so every derivation is a finite path of links
//! back to a seed. Child lists are never unfolded here: the forest keeps the
//! same packed shape.
//!
//! The graph only records states. Seasons, skip resolution and termination are
//! driven by the [`Grower`](crate::engine::Grower).
//!
//! ## Skip handling
//!
//! After a non-skip leaf is grafted, the longest skip sequence at the leaf's end
//! is obligatory. The new state is parked until the engine resolves the skip
//! at that position; the skip nodes are then threaded into the derivation as
//! extra children, and only the state after the skip goes on to grow.

mod node;

pub(crate) use node::{CompleteId, Derivation, GrowingId, Link};

use crate::forest::NodeIdentity;
use crate::input::{Bud, InputSource};
use crate::runtime::{RuleItem, RuleNumber, RuntimeRuleSet};
use hashbrown::HashMap;
use node::{CompleteNode, GrowingKey, GrowingNode, StackHead, StackKey};
use smallvec::{SmallVec, smallvec};
use std::cmp::Reverse;

/// Children of one derivation, in input order
pub(crate) type ChildList = SmallVec<[CompleteId; 4]>;

/// Skip nodes matched at one position
pub(crate) type SkipRun = SmallVec<[CompleteId; 2]>;

/// Nodes of a skip sub-parse already copied into the main graph
#[derive(Default)]
struct Imported {
    complete: HashMap<CompleteId, CompleteId, ahash::RandomState>,
    growing: HashMap<GrowingId, GrowingId, ahash::RandomState>,
}

/// `START goal FINISH`, synthesized per parse outside the rule set
#[derive(Debug)]
struct PseudoGoal {
    number: RuleNumber,
    item: RuleItem,
}

#[derive(Debug)]
pub(crate) struct ParseGraph<'r> {
    rules: &'r RuntimeRuleSet,
    goal: Option<PseudoGoal>,
    skip_enabled: bool,
    growing: Vec<GrowingNode>,
    growing_index: HashMap<GrowingKey, GrowingId, ahash::RandomState>,
    complete: Vec<CompleteNode>,
    complete_index: HashMap<NodeIdentity, CompleteId, ahash::RandomState>,
    stacks: HashMap<StackKey, StackHead, ahash::RandomState>,
    frontier: Vec<GrowingId>,
    awaiting_skip: HashMap<usize, Vec<GrowingId>, ahash::RandomState>,
    skip_cache: HashMap<usize, Option<SkipRun>, ahash::RandomState>,
    longest: Option<CompleteId>,
}

impl<'r> ParseGraph<'r> {
    /// Graph for a top-level parse of `goal`, wrapped in start and finish markers
    pub(crate) fn for_goal(rules: &'r RuntimeRuleSet, goal: RuleNumber, skip_enabled: bool) -> Self {
        let pseudo = PseudoGoal {
            number: rules.pseudo_goal(),
            item: RuleItem::Concatenation(smallvec![rules.start_marker(), goal, rules.finish_marker()]),
        };
        Self::new(rules, Some(pseudo), skip_enabled)
    }

    /// Graph for matching a skip sequence; never resolves skip itself
    pub(crate) fn for_skip(rules: &'r RuntimeRuleSet) -> Self {
        Self::new(rules, None, false)
    }

    fn new(rules: &'r RuntimeRuleSet, goal: Option<PseudoGoal>, skip_enabled: bool) -> Self {
        Self {
            rules,
            goal,
            skip_enabled: skip_enabled && rules.skip_goal().is_some(),
            growing: Vec::new(),
            growing_index: HashMap::default(),
            complete: Vec::new(),
            complete_index: HashMap::default(),
            stacks: HashMap::default(),
            frontier: Vec::new(),
            awaiting_skip: HashMap::default(),
            skip_cache: HashMap::default(),
            longest: None,
        }
    }

    /// Number of the pseudo goal, for graphs built with [`Self::for_goal`]
    pub(crate) fn pseudo_goal(&self) -> Option<RuleNumber> {
        self.goal.as_ref().map(|goal| goal.number)
    }

    fn is_pseudo_goal(&self, rule: RuleNumber) -> bool {
        self.goal.as_ref().is_some_and(|goal| goal.number == rule)
    }

    /// Body and empty rule of a non-terminal; `None` for terminals
    fn body(&self, rule: RuleNumber) -> Option<(&RuleItem, Option<RuleNumber>)> {
        if let Some(goal) = &self.goal
            && goal.number == rule
        {
            return Some((&goal.item, None));
        }
        let runtime = self.rules.rule(rule);
        runtime.item().map(|item| (item, runtime.empty_rule()))
    }

    pub(crate) fn is_terminal(&self, rule: RuleNumber) -> bool {
        !self.is_pseudo_goal(rule) && self.rules.rule(rule).is_terminal()
    }

    /// Seed `rule` at `position` with no caller
    pub(crate) fn create_start(&mut self, rule: RuleNumber, position: usize) {
        let head = self.stacks.entry(StackKey { rule, position }).or_default();
        if !std::mem::replace(&mut head.seeded, true) {
            self.seed(rule, position);
        }
    }

    fn seed(&mut self, rule: RuleNumber, position: usize) {
        let Some((item, empty_rule)) = self.body(rule) else {
            return;
        };
        let count = item.alternative_count(empty_rule);
        for alternative in 0..count {
            let key = GrowingKey::seed(rule, u32::try_from(alternative).unwrap_or(u32::MAX), position);
            let (id, created) = self.find_or_create_growing(key);
            if created {
                self.frontier.push(id);
            }
        }
    }

    pub(crate) fn take_frontier(&mut self) -> Vec<GrowingId> {
        std::mem::take(&mut self.frontier)
    }

    /// Grow one frontier head: complete it when its body is matched, and expect
    /// its next symbol when there is one. Both can apply to the same head.
    pub(crate) fn grow(&mut self, head: GrowingId, input: &mut InputSource<'_>) {
        let node = &mut self.growing[head.index()];
        node.grown = true;
        let key = node.key;
        let Some((item, empty_rule)) = self.body(key.rule) else {
            return;
        };
        let completes = item.can_complete(key.alternative, key.dot);
        let next = item.next_item(key.alternative, key.dot, empty_rule);

        if completes && let Some((node, callers)) = self.pop(head) {
            for caller in callers {
                self.graft(caller, node);
            }
        }

        let Some(next) = next else {
            return;
        };
        if self.is_terminal(next) {
            let terminal = self.rules.rule(next);
            if let Some(bud) = input.fetch_or_create_bud(terminal, key.end) {
                let leaf = self.find_or_create_leaf(bud);
                self.graft(head, leaf);
            }
        } else {
            self.push_to_stack_of(next, head);
        }
    }

    /// Publish a finished growing node as a complete node
    ///
    /// A node seen for the first time is announced on its stack head and the
    /// callers to resume are returned. A further derivation of a known identity
    /// is merged into the existing node, whose callers were already resumed.
    pub(crate) fn pop(&mut self, head: GrowingId) -> Option<(CompleteId, Vec<GrowingId>)> {
        let key = self.growing[head.index()].key;
        let (node, _) = self.find_or_create_complete(key.identity());
        let complete = &mut self.complete[node.index()];
        complete.derivations.push(Derivation {
            alternative: key.alternative,
            tail: head,
        });
        if std::mem::replace(&mut complete.published, true) {
            return None;
        }

        self.note_longest(node);
        let stack = self
            .stacks
            .entry(StackKey {
                rule: key.rule,
                position: key.start,
            })
            .or_default();
        stack.completions.push(node);
        Some((node, stack.previous.clone()))
    }

    /// Register or reuse the terminal node of a bud
    pub(crate) fn find_or_create_leaf(&mut self, bud: Bud) -> CompleteId {
        let (node, created) = self.find_or_create_complete(NodeIdentity::new(bud.rule, bud.start, bud.length));
        if created {
            self.note_longest(node);
        }
        node
    }

    /// Expect non-terminal `rule` at the end of `caller`
    ///
    /// The callee is seeded on the first visit of its stack head. Completions
    /// the head already knows are grafted right away; later ones reach the
    /// caller through [`Self::pop`].
    pub(crate) fn push_to_stack_of(&mut self, rule: RuleNumber, caller: GrowingId) {
        let position = self.growing[caller.index()].key.end;
        let head = self.stacks.entry(StackKey { rule, position }).or_default();
        head.previous.push(caller);
        let completions = head.completions.clone();
        if !std::mem::replace(&mut head.seeded, true) {
            self.seed(rule, position);
        }
        for completion in completions {
            self.graft(caller, completion);
        }
    }

    fn graft(&mut self, parent: GrowingId, child: CompleteId) {
        if self.growing[parent.index()].key.dot == 0 {
            self.create_with_first_child(parent, child);
        } else {
            self.duplicate_with_next_child(parent, child);
        }
    }

    /// Start a derivation that has matched its first symbol
    pub(crate) fn create_with_first_child(&mut self, seed: GrowingId, child: CompleteId) {
        self.advance(seed, child);
    }

    /// Extend a partial derivation by one more symbol
    pub(crate) fn duplicate_with_next_child(&mut self, prior: GrowingId, child: CompleteId) {
        self.advance(prior, child);
    }

    fn advance(&mut self, prior: GrowingId, child: CompleteId) {
        let key = self.growing[prior.index()].key;
        let child_identity = self.complete[child.index()].identity;
        let Some((item, _)) = self.body(key.rule) else {
            return;
        };
        let Some(dot) = item.advance(key.alternative, key.dot, child_identity.length == 0) else {
            return;
        };
        let next = GrowingKey {
            dot,
            end: child_identity.end(),
            ..key
        };

        let (target, created) = self.find_or_create_growing(next);
        self.growing[target.index()].add_link(Link { prior, child });
        if !created {
            return;
        }
        if self.needs_skip_after(child_identity.rule) {
            self.schedule_skip(target, next.end);
        } else {
            self.frontier.push(target);
        }
    }

    fn needs_skip_after(&self, child: RuleNumber) -> bool {
        if !self.skip_enabled || self.is_pseudo_goal(child) {
            return false;
        }
        let rule = self.rules.rule(child);
        rule.is_terminal() && !rule.is_skip()
    }

    fn schedule_skip(&mut self, node: GrowingId, position: usize) {
        match self.skip_cache.get(&position) {
            Some(Some(skip)) => {
                let skip = skip.clone();
                self.thread_skip(node, &skip);
            }
            Some(None) => self.frontier.push(node),
            None => self.awaiting_skip.entry(position).or_default().push(node),
        }
    }

    /// Append skip nodes to a derivation without moving its dot
    fn thread_skip(&mut self, from: GrowingId, skip: &[CompleteId]) {
        let mut current = from;
        let mut created = false;
        for &child in skip {
            let next = GrowingKey {
                end: self.complete[child.index()].identity.end(),
                ..self.growing[current.index()].key
            };
            let (target, new) = self.find_or_create_growing(next);
            self.growing[target.index()].add_link(Link {
                prior: current,
                child,
            });
            current = target;
            created = new;
        }
        if created {
            self.frontier.push(current);
        }
    }

    pub(crate) fn has_pending_skip(&self) -> bool {
        !self.awaiting_skip.is_empty()
    }

    /// Positions with states waiting for a skip match, in input order
    pub(crate) fn pending_skip_positions(&self) -> Vec<usize> {
        let mut positions: Vec<_> = self.awaiting_skip.keys().copied().collect();
        positions.sort_unstable();
        positions
    }

    /// Record the skip match at `position` and release the states parked there
    pub(crate) fn resolve_skip(&mut self, position: usize, skip: Option<SkipRun>) {
        let waiting = self.awaiting_skip.remove(&position).unwrap_or_default();
        for node in waiting {
            match &skip {
                Some(run) => self.thread_skip(node, run),
                None => self.frontier.push(node),
            }
        }
        self.skip_cache.insert(position, skip);
    }

    /// Copy complete nodes of another graph into this one, reusing nodes of the
    /// same identity
    pub(crate) fn import_all(&mut self, source: &ParseGraph<'_>, nodes: &[CompleteId]) -> SkipRun {
        let mut imported = Imported::default();
        nodes
            .iter()
            .map(|&node| self.import_complete(source, node, &mut imported))
            .collect()
    }

    fn import_complete(&mut self, source: &ParseGraph<'_>, node: CompleteId, imported: &mut Imported) -> CompleteId {
        if let Some(&done) = imported.complete.get(&node) {
            return done;
        }
        let (target, created) = self.find_or_create_complete(source.identity(node));
        imported.complete.insert(node, target);
        if !created {
            return target;
        }
        for derivation in &source.complete[node.index()].derivations {
            let tail = self.import_growing(source, derivation.tail, imported);
            self.complete[target.index()].derivations.push(Derivation {
                alternative: derivation.alternative,
                tail,
            });
        }
        target
    }

    /// Copies stay out of the growing index, so they are never grown again
    fn import_growing(&mut self, source: &ParseGraph<'_>, node: GrowingId, imported: &mut Imported) -> GrowingId {
        if let Some(&done) = imported.growing.get(&node) {
            return done;
        }
        let target = GrowingId::from_index(self.growing.len());
        self.growing.push(GrowingNode::new(source.growing[node.index()].key));
        imported.growing.insert(node, target);
        for link in &source.growing[node.index()].links {
            let prior = self.import_growing(source, link.prior, imported);
            let child = self.import_complete(source, link.child, imported);
            self.growing[target.index()].add_link(Link { prior, child });
        }
        target
    }

    fn find_or_create_growing(&mut self, key: GrowingKey) -> (GrowingId, bool) {
        if let Some(&id) = self.growing_index.get(&key) {
            return (id, false);
        }
        let id = GrowingId::from_index(self.growing.len());
        self.growing.push(GrowingNode::new(key));
        self.growing_index.insert(key, id);
        (id, true)
    }

    fn find_or_create_complete(&mut self, identity: NodeIdentity) -> (CompleteId, bool) {
        if let Some(&id) = self.complete_index.get(&identity) {
            return (id, false);
        }
        let id = CompleteId::from_index(self.complete.len());
        self.complete.push(CompleteNode::new(identity));
        self.complete_index.insert(identity, id);
        (id, true)
    }

    fn note_longest(&mut self, node: CompleteId) {
        let identity = self.complete[node.index()].identity;
        if identity.length == 0 || self.is_pseudo_goal(identity.rule) {
            return;
        }
        let rule = self.rules.rule(identity.rule);
        if rule.is_skip() || rule.is_marker() {
            return;
        }
        let rank = |graph: &Self, id: CompleteId| {
            let identity = graph.complete[id.index()].identity;
            let rule = graph.rules.rule(identity.rule);
            (
                identity.end(),
                identity.length,
                rule.is_non_terminal(),
                !rule.is_virtual(),
                Reverse(identity.rule),
            )
        };
        if self.longest.is_none_or(|current| rank(self, node) > rank(self, current)) {
            self.longest = Some(node);
        }
    }

    /// Complete node reaching furthest into the input, for failure reports
    pub(crate) const fn longest_match(&self) -> Option<CompleteId> {
        self.longest
    }

    pub(crate) fn find_complete(&self, identity: NodeIdentity) -> Option<CompleteId> {
        self.complete_index.get(&identity).copied()
    }

    pub(crate) fn identity(&self, node: CompleteId) -> NodeIdentity {
        self.complete[node.index()].identity
    }

    /// Longest non-empty completion of `rule` started at `position`
    pub(crate) fn longest_completion(&self, rule: RuleNumber, position: usize) -> Option<CompleteId> {
        self.stacks
            .get(&StackKey { rule, position })?
            .completions
            .iter()
            .copied()
            .filter(|&node| self.identity(node).length > 0)
            .max_by_key(|&node| self.identity(node).length)
    }

    /// The skip rule nodes under a match of the skip goal
    pub(crate) fn flatten_skip(&self, multi: CompleteId) -> SkipRun {
        self.first_children(multi)
            .iter()
            .filter_map(|&choice| self.first_children(choice).first().copied())
            .collect()
    }

    /// Derivations of a complete node, in the order they were found
    pub(crate) fn derivations(&self, node: CompleteId) -> &[Derivation] {
        &self.complete[node.index()].derivations
    }

    /// Packed links of a growing node; empty for seeds
    pub(crate) fn links(&self, node: GrowingId) -> &[Link] {
        &self.growing[node.index()].links
    }

    /// Symbols a growing node has consumed, capped for unbounded repetitions
    pub(crate) fn dot(&self, node: GrowingId) -> u32 {
        self.growing[node.index()].key.dot
    }

    /// Children of the first derivation, taking the first link at every step
    pub(crate) fn first_children(&self, node: CompleteId) -> ChildList {
        let mut children = ChildList::new();
        let Some(derivation) = self.derivations(node).first() else {
            return children;
        };
        let mut current = derivation.tail;
        while let Some(link) = self.links(current).first() {
            children.push(link.child);
            current = link.prior;
        }
        children.reverse();
        children
    }

    /// Terminals expected by grown states ending at `position`, markers and
    /// empty rules included, sorted by rule number
    pub(crate) fn expected_at(&self, position: usize) -> Vec<RuleNumber> {
        let mut expected: Vec<_> = self
            .growing
            .iter()
            .filter(|node| node.grown && node.key.end == position)
            .filter_map(|node| {
                let (item, empty_rule) = self.body(node.key.rule)?;
                item.next_item(node.key.alternative, node.key.dot, empty_rule)
            })
            .filter(|&rule| self.is_terminal(rule))
            .collect();
        expected.sort_unstable();
        expected.dedup();
        expected
    }

    /// Furthest input position a grown state reached
    pub(crate) fn furthest_position(&self) -> usize {
        self.growing
            .iter()
            .filter(|node| node.grown)
            .map(|node| node.key.end)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn growing_count(&self) -> usize {
        self.growing.len()
    }

    pub(crate) fn complete_count(&self) -> usize {
        self.complete.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Grower;
    use crate::{Expr, Grammar, GrammarBuilder};

    fn grow<'r>(rules: &'r RuntimeRuleSet, goal: &str, text: &str) -> ParseGraph<'r> {
        let goal = rules.find(goal).expect("goal declared").number();
        let mut input = InputSource::new(text);
        Grower::new(rules, true).grow_goal(goal, &mut input)
    }

    fn compile(grammar: &Grammar) -> RuntimeRuleSet {
        RuntimeRuleSet::compile(grammar).expect("compiles")
    }

    fn left_recursive() -> RuntimeRuleSet {
        compile(
            &GrammarBuilder::new("t", "G")
                .rule(
                    "S",
                    Expr::choice([Expr::literal("a"), Expr::seq([Expr::rule("S"), Expr::literal("a")])]),
                )
                .build(),
        )
    }

    #[test]
    fn test_growing_nodes_never_shrink() {
        let rules = left_recursive();
        let graph = grow(&rules, "S", "aaaa");
        for node in &graph.growing {
            assert!(node.key.start <= node.key.end);
            for link in &node.links {
                let prior = graph.growing[link.prior.index()].key;
                assert_eq!(prior.start, node.key.start);
                assert!(prior.end <= node.key.end);
                assert_eq!(graph.identity(link.child).end(), node.key.end);
            }
        }
    }

    #[test]
    fn test_one_complete_node_per_identity() {
        let rules = left_recursive();
        let graph = grow(&rules, "S", "aaa");
        assert_eq!(graph.complete_index.len(), graph.complete.len());
        for (index, node) in graph.complete.iter().enumerate() {
            assert_eq!(graph.find_complete(node.identity), Some(CompleteId::from_index(index)));
        }
        let s = rules.find("S").expect("S").number();
        assert!(graph.find_complete(NodeIdentity::new(s, 0, 3)).is_some());
    }

    #[test]
    fn test_skip_is_threaded_after_leaves() {
        let rules = compile(
            &GrammarBuilder::new("t", "G")
                .skip("WS", Expr::pattern(r"\s+"))
                .rule("S", Expr::seq([Expr::literal("a"), Expr::literal("b")]))
                .build(),
        );
        let graph = grow(&rules, "S", "a  b");
        let s = rules.find("S").expect("S").number();
        let node = graph.find_complete(NodeIdentity::new(s, 0, 4)).expect("S matched");

        assert_eq!(graph.derivations(node).len(), 1);
        let names: Vec<_> = graph
            .first_children(node)
            .iter()
            .map(|&child| rules.rule(graph.identity(child).rule).tag().to_string())
            .collect();
        assert_eq!(names, vec!["a", "WS", "b"]);
        assert!(!graph.has_pending_skip());
    }

    #[test]
    fn test_expected_terminals_at_furthest_position() {
        let rules = compile(
            &GrammarBuilder::new("t", "G")
                .rule("S", Expr::seq([Expr::literal("a"), Expr::choice([Expr::literal("b"), Expr::literal("c")])]))
                .build(),
        );
        let graph = grow(&rules, "S", "a");
        assert_eq!(graph.furthest_position(), 1);
        let expected: Vec<_> = graph
            .expected_at(1)
            .into_iter()
            .map(|rule| rules.rule(rule).tag().to_string())
            .collect();
        assert_eq!(expected, vec!["b", "c"]);
    }

    fn reaches_itself(graph: &ParseGraph<'_>, start: GrowingId) -> bool {
        let mut seen = hashbrown::HashSet::new();
        let mut pending: Vec<_> = graph.links(start).iter().map(|link| link.prior).collect();
        while let Some(node) = pending.pop() {
            if node == start {
                return true;
            }
            if seen.insert(node) {
                pending.extend(graph.links(node).iter().map(|link| link.prior));
            }
        }
        false
    }

    #[test]
    fn test_links_stay_acyclic_with_nullable_separators() {
        let rules = compile(
            &GrammarBuilder::new("t", "G")
                .rule(
                    "S",
                    Expr::separated(Expr::opt(Expr::literal("a")), Expr::opt(Expr::literal(",")), 0, None),
                )
                .build(),
        );
        let graph = grow(&rules, "S", "a,a");
        for index in 0..graph.growing_count() {
            assert!(!reaches_itself(&graph, GrowingId::from_index(index)));
        }
        let s = rules.find("S").expect("S").number();
        assert!(graph.find_complete(NodeIdentity::new(s, 0, 3)).is_some());
    }
}
