use super::RuleNumber;
use smallvec::SmallVec;

/// Ordered rule references of one alternative
pub type Alternative = SmallVec<[RuleNumber; 4]>;

/// Alternative index used for the empty derivation of a nullable repetition
const EMPTY_ALTERNATIVE: u32 = 1;

/// Body of a non-terminal rule
///
/// Growing nodes address a position inside a body by `(alternative, dot)`.
/// Repetitions use alternative 0 for the repetition itself and alternative 1
/// for the empty derivation when the minimum is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleItem {
    /// Matches only the rule's empty terminal
    Empty,
    /// Every alternative is kept
    Choice(Vec<Alternative>),
    /// Alternatives are ordered by priority
    PriorityChoice(Vec<Alternative>),
    Concatenation(Alternative),
    Multi {
        min: u32,
        max: Option<u32>,
        item: RuleNumber,
    },
    /// `max` and `min` count items, not separators
    SeparatedList {
        min: u32,
        max: Option<u32>,
        item: RuleNumber,
        separator: RuleNumber,
    },
}

impl RuleItem {
    /// Number of alternatives growing nodes may start with
    #[must_use]
    pub fn alternative_count(&self, empty_rule: Option<RuleNumber>) -> usize {
        match self {
            Self::Empty | Self::Concatenation(_) => 1,
            Self::Choice(alternatives) | Self::PriorityChoice(alternatives) => alternatives.len(),
            Self::Multi { .. } | Self::SeparatedList { .. } => 1 + usize::from(empty_rule.is_some()),
        }
    }

    /// Every rule referenced by this body
    #[must_use]
    pub fn references(&self) -> Vec<RuleNumber> {
        match self {
            Self::Empty => Vec::new(),
            Self::Choice(alternatives) | Self::PriorityChoice(alternatives) => {
                alternatives.iter().flatten().copied().collect()
            }
            Self::Concatenation(items) => items.to_vec(),
            Self::Multi { item, .. } => vec![*item],
            Self::SeparatedList {
                item, separator, ..
            } => vec![*item, *separator],
        }
    }

    /// Symbol expected at `dot` of `alternative`, if the body can still grow
    pub(crate) fn next_item(
        &self,
        alternative: u32,
        dot: u32,
        empty_rule: Option<RuleNumber>,
    ) -> Option<RuleNumber> {
        match self {
            Self::Empty => empty_rule.filter(|_| dot == 0),
            Self::Choice(alternatives) | Self::PriorityChoice(alternatives) => alternatives
                .get(alternative as usize)?
                .get(dot as usize)
                .copied(),
            Self::Concatenation(items) => items.get(dot as usize).copied(),
            Self::Multi { max, item, .. } => {
                if alternative == EMPTY_ALTERNATIVE {
                    empty_rule.filter(|_| dot == 0)
                } else {
                    max.is_none_or(|max| dot < max).then_some(*item)
                }
            }
            Self::SeparatedList {
                max,
                item,
                separator,
                ..
            } => {
                if alternative == EMPTY_ALTERNATIVE {
                    empty_rule.filter(|_| dot == 0)
                } else if dot % 2 == 0 {
                    Some(*item)
                } else {
                    max.is_none_or(|max| items_matched(dot) < max)
                        .then_some(*separator)
                }
            }
        }
    }

    /// Whether a growing node at `dot` of `alternative` is a complete match
    pub(crate) fn can_complete(&self, alternative: u32, dot: u32) -> bool {
        match self {
            Self::Empty => dot == 1,
            Self::Choice(alternatives) | Self::PriorityChoice(alternatives) => alternatives
                .get(alternative as usize)
                .is_some_and(|items| dot as usize == items.len()),
            Self::Concatenation(items) => dot as usize == items.len(),
            Self::Multi { min, max, .. } => {
                if alternative == EMPTY_ALTERNATIVE {
                    dot == 1
                } else {
                    dot >= (*min).max(1) && max.is_none_or(|max| dot <= max)
                }
            }
            Self::SeparatedList { min, max, .. } => {
                if alternative == EMPTY_ALTERNATIVE {
                    dot == 1
                } else {
                    let matched = items_matched(dot);
                    dot % 2 == 1
                        && matched >= (*min).max(1)
                        && max.is_none_or(|max| matched <= max)
                }
            }
        }
    }

    /// Dot after consuming one more symbol, or `None` when a zero-length
    /// symbol would only return the derivation to a state it already passed
    ///
    /// Unbounded repetitions cap the dot once the minimum is reached, so the
    /// number of distinct growing-node keys stays finite. At the cap a
    /// separated list parks a zero-length separator on a dot of its own, which
    /// only a non-empty item may leave.
    pub(crate) fn advance(&self, alternative: u32, dot: u32, zero_length: bool) -> Option<u32> {
        let next = dot + 1;
        match self {
            Self::Multi {
                min, max: None, ..
            } if alternative != EMPTY_ALTERNATIVE => {
                let cap = (*min).max(1);
                (!(zero_length && dot == cap)).then_some(next.min(cap))
            }
            Self::SeparatedList {
                min, max: None, ..
            } if alternative != EMPTY_ALTERNATIVE => {
                let last_item = 2 * (*min).max(1) - 1;
                let after_empty_separator = last_item + 3;
                if dot == after_empty_separator {
                    (!zero_length).then_some(last_item)
                } else if dot == last_item && zero_length {
                    Some(after_empty_separator)
                } else if next % 2 == 1 {
                    Some(next.min(last_item))
                } else {
                    Some(next.min(last_item + 1))
                }
            }
            _ => Some(next),
        }
    }
}

/// Items consumed by a separated list at an odd dot
const fn items_matched(dot: u32) -> u32 {
    dot.div_ceil(2)
}
