//! Arena entries of the parse graph.

use crate::forest::NodeIdentity;
use crate::runtime::RuleNumber;
use smallvec::SmallVec;

/// Index of a growing node in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct GrowingId(u32);

/// Index of a complete node in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CompleteId(u32);

macro_rules! arena_id {
    ($name:ident) => {
        impl $name {
            #[allow(clippy::cast_possible_truncation)] // Arenas are bounded by u32 indices
            pub(crate) const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub(crate) const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(GrowingId);
arena_id!(CompleteId);

/// Position inside one derivation of a rule
///
/// `dot` counts the symbols consumed so far (capped for unbounded repetitions),
/// `end` is the input position the next symbol must start at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GrowingKey {
    pub rule: RuleNumber,
    pub alternative: u32,
    pub dot: u32,
    pub start: usize,
    pub end: usize,
}

impl GrowingKey {
    pub(crate) const fn seed(rule: RuleNumber, alternative: u32, position: usize) -> Self {
        Self {
            rule,
            alternative,
            dot: 0,
            start: position,
            end: position,
        }
    }

    pub(crate) const fn identity(&self) -> NodeIdentity {
        NodeIdentity::new(self.rule, self.start, self.end - self.start)
    }
}

/// Packed partial derivation: the state before `child`, and `child` itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Link {
    pub prior: GrowingId,
    pub child: CompleteId,
}

#[derive(Debug)]
pub(crate) struct GrowingNode {
    pub key: GrowingKey,
    /// Every way of reaching this key; empty for seeds
    pub links: SmallVec<[Link; 2]>,
    /// Processed as a frontier head
    pub grown: bool,
}

impl GrowingNode {
    pub(crate) fn new(key: GrowingKey) -> Self {
        Self {
            key,
            links: SmallVec::new(),
            grown: false,
        }
    }

    pub(crate) fn add_link(&mut self, link: Link) {
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }
}

/// One way of matching a complete node: the rule alternative used and the
/// finished growing node whose links hold the children
#[derive(Debug, Clone, Copy)]
pub(crate) struct Derivation {
    pub alternative: u32,
    pub tail: GrowingId,
}

#[derive(Debug)]
pub(crate) struct CompleteNode {
    pub identity: NodeIdentity,
    /// Empty for terminals
    pub derivations: SmallVec<[Derivation; 1]>,
    /// Announced to the stack head `(rule, start)`
    pub published: bool,
}

impl CompleteNode {
    pub(crate) fn new(identity: NodeIdentity) -> Self {
        Self {
            identity,
            derivations: SmallVec::new(),
            published: false,
        }
    }
}

/// GSS node: callers waiting for `rule` at `position`, and the completions found
#[derive(Debug, Default)]
pub(crate) struct StackHead {
    pub previous: Vec<GrowingId>,
    pub completions: Vec<CompleteId>,
    /// Alternatives of the rule were seeded at this position
    pub seeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StackKey {
    pub rule: RuleNumber,
    pub position: usize,
}
