use crate::runtime::RuleNumber;
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Rule, start and length of a match
///
/// Two derivations with the same identity share one forest node; their child
/// lists become alternatives of that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct NodeIdentity {
    pub rule: RuleNumber,
    pub start: usize,
    pub length: usize,
}

impl NodeIdentity {
    #[must_use]
    pub const fn new(rule: RuleNumber, start: usize, length: usize) -> Self {
        Self {
            rule,
            start,
            length,
        }
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.length
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.rule, self.start, self.end())
    }
}
