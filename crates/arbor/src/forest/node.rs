use super::{ForestId, NodeIdentity, SharedPackedParseForest};
use crate::runtime::{RuleNumber, RuntimeRule, TerminalKind};
use std::fmt;
use std::ops::Deref;

/// Handle to a node of a [`SharedPackedParseForest`]
#[derive(Clone, Copy)]
pub struct SpptNode<'f> {
    forest: &'f SharedPackedParseForest,
    id: ForestId,
}

impl<'f> SpptNode<'f> {
    pub(super) const fn new(forest: &'f SharedPackedParseForest, id: ForestId) -> Self {
        Self { forest, id }
    }

    #[must_use]
    pub const fn forest(&self) -> &'f SharedPackedParseForest {
        self.forest
    }

    /// The rule this node matched
    #[must_use]
    pub fn rule(&self) -> &'f RuntimeRule {
        self.forest.rules.rule(self.rule_number())
    }

    /// Rule name: the rule's tag for named and virtual rules, the literal text
    /// or pattern source for anonymous terminals
    #[must_use]
    pub fn name(&self) -> &'f str {
        self.rule().tag()
    }

    #[must_use]
    pub fn rule_number(&self) -> RuleNumber {
        self.forest.rule_of(self.id)
    }

    #[must_use]
    pub fn identity(&self) -> NodeIdentity {
        self.forest.node(self.id).identity
    }

    #[must_use]
    pub fn start_position(&self) -> usize {
        self.identity().start
    }

    #[must_use]
    pub fn matched_text_length(&self) -> usize {
        self.identity().length
    }

    #[must_use]
    pub fn end_position(&self) -> usize {
        self.identity().end()
    }

    /// Text covered by the node, skip included
    #[must_use]
    pub fn matched_text(&self) -> &'f str {
        let identity = self.identity();
        self.forest.text.get(identity.start..identity.end()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.rule().is_terminal()
    }

    #[must_use]
    pub fn is_branch(&self) -> bool {
        !self.is_leaf()
    }

    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.rule().is_skip()
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.rule().is_virtual()
    }

    /// Zero-length match of a nullable construct's empty terminal
    #[must_use]
    pub fn is_empty_leaf(&self) -> bool {
        self.rule().is_empty_rule()
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<SpptLeaf<'f>> {
        self.is_leaf().then_some(SpptLeaf(*self))
    }

    #[must_use]
    pub fn as_branch(&self) -> Option<SpptBranch<'f>> {
        self.is_branch().then_some(SpptBranch(*self))
    }

    /// Indented rendering of the subtree below this node
    #[must_use]
    pub fn to_tree_string(&self) -> String {
        let mut out = String::new();
        super::pretty::write_node(&mut out, *self, &super::PrettyConfig::default(), 0);
        out
    }

    fn handle(&self, id: ForestId) -> Self {
        Self::new(self.forest, id)
    }
}

impl PartialEq for SpptNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.forest, other.forest) && self.id == other.id
    }
}

impl Eq for SpptNode<'_> {}

impl fmt::Debug for SpptNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}..{}",
            self.name(),
            self.start_position(),
            self.end_position()
        )
    }
}

/// Terminal match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpptLeaf<'f>(SpptNode<'f>);

impl SpptLeaf<'_> {
    /// Matched by a regular expression
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        self.rule().is_pattern()
    }

    /// Matched by exact text
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self.rule().terminal(), Some(TerminalKind::Literal(_)))
    }
}

impl<'f> Deref for SpptLeaf<'f> {
    type Target = SpptNode<'f>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Non-terminal match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpptBranch<'f>(SpptNode<'f>);

impl<'f> SpptBranch<'f> {
    /// Children of the first alternative, skip included
    #[must_use]
    pub fn children(&self) -> Vec<SpptNode<'f>> {
        let forest = self.0.forest;
        forest
            .node(self.0.id)
            .alternatives
            .first()
            .map(|alternative| {
                forest
                    .first_list(alternative.tail)
                    .iter()
                    .map(|&id| self.0.handle(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Children of the first alternative without skip
    #[must_use]
    pub fn non_skip_children(&self) -> Vec<SpptNode<'f>> {
        self.children()
            .into_iter()
            .filter(|child| !child.is_skip())
            .collect()
    }

    /// The `index`-th non-skip child of the first alternative
    #[must_use]
    pub fn child(&self, index: usize) -> Option<SpptNode<'f>> {
        self.non_skip_children().get(index).copied()
    }

    /// Non-skip children of the first alternative that are branches
    #[must_use]
    pub fn branch_children(&self) -> Vec<SpptBranch<'f>> {
        self.non_skip_children()
            .iter()
            .filter_map(SpptNode::as_branch)
            .collect()
    }

    /// Every derivation of this node as an explicit child list
    ///
    /// The first entry is the list [`Self::children`] returns. The number of
    /// lists is [`Self::derivation_count`], which for length-ambiguous
    /// repetitions grows exponentially with the input.
    #[must_use]
    pub fn children_alternatives(&self) -> Vec<SpptAlternative<'f>> {
        let forest = self.0.forest;
        forest
            .node(self.0.id)
            .alternatives
            .iter()
            .flat_map(|alternative| {
                forest
                    .all_lists(alternative.tail)
                    .into_iter()
                    .map(move |children| SpptAlternative {
                        priority: alternative.priority,
                        children: children.iter().map(|&id| self.0.handle(id)).collect(),
                    })
            })
            .collect()
    }

    /// Number of distinct child lists, saturating at `usize::MAX`
    #[must_use]
    pub fn derivation_count(&self) -> usize {
        self.0.forest.node(self.0.id).derivations
    }

    /// Matched in more than one way
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.derivation_count() > 1
    }
}

impl<'f> Deref for SpptBranch<'f> {
    type Target = SpptNode<'f>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// One derivation of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpptAlternative<'f> {
    priority: u32,
    children: Vec<SpptNode<'f>>,
}

impl<'f> SpptAlternative<'f> {
    /// Index of the rule alternative this derivation used; lower is preferred
    /// by priority choices
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    #[must_use]
    pub fn children(&self) -> &[SpptNode<'f>] {
        &self.children
    }

    #[must_use]
    pub fn non_skip_children(&self) -> Vec<SpptNode<'f>> {
        self.children
            .iter()
            .filter(|child| !child.is_skip())
            .copied()
            .collect()
    }
}
