use super::RuleItem;
use compact_str::CompactString;
use regex_automata::meta::Regex;
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Dense index of a rule in a [`RuntimeRuleSet`](super::RuntimeRuleSet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RuleNumber(u32);

impl RuleNumber {
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[allow(clippy::cast_possible_truncation)] // Rule tables never reach u32::MAX entries
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for RuleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a terminal rule matches
#[derive(Debug, Clone)]
pub enum TerminalKind {
    /// Exact text
    Literal(CompactString),
    /// Regular expression, searched anchored at the match position
    Pattern { source: CompactString, regex: Regex },
    /// Zero-length match standing in for a nullable construct
    Empty,
    /// Matches only at offset 0
    StartMarker,
    /// Matches only at the end of the text
    FinishMarker,
}

impl TerminalKind {
    /// Whether this terminal is a start or finish marker
    #[must_use]
    pub const fn is_marker(&self) -> bool {
        matches!(self, Self::StartMarker | Self::FinishMarker)
    }
}

/// Terminal or non-terminal body of a rule
#[derive(Debug, Clone)]
pub enum RuleKind {
    Terminal(TerminalKind),
    NonTerminal(RuleItem),
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct RuntimeRule {
    pub(crate) number: RuleNumber,
    pub(crate) tag: CompactString,
    pub(crate) kind: RuleKind,
    pub(crate) is_skip: bool,
    pub(crate) is_virtual: bool,
    pub(crate) empty_rule_for: Option<RuleNumber>,
    pub(crate) empty_rule: Option<RuleNumber>,
}

impl RuntimeRule {
    #[must_use]
    pub const fn number(&self) -> RuleNumber {
        self.number
    }

    /// Rule name. Anonymous terminals are named by their literal text or pattern
    /// source; virtual rules by `§owner§kind` and their item path.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub const fn kind(&self) -> &RuleKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, RuleKind::Terminal(_))
    }

    #[must_use]
    pub const fn is_non_terminal(&self) -> bool {
        matches!(self.kind, RuleKind::NonTerminal(_))
    }

    #[must_use]
    pub const fn terminal(&self) -> Option<&TerminalKind> {
        match &self.kind {
            RuleKind::Terminal(terminal) => Some(terminal),
            RuleKind::NonTerminal(_) => None,
        }
    }

    #[must_use]
    pub const fn item(&self) -> Option<&RuleItem> {
        match &self.kind {
            RuleKind::Terminal(_) => None,
            RuleKind::NonTerminal(item) => Some(item),
        }
    }

    #[must_use]
    pub const fn is_skip(&self) -> bool {
        self.is_skip
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    #[must_use]
    pub const fn is_pattern(&self) -> bool {
        matches!(self.kind, RuleKind::Terminal(TerminalKind::Pattern { .. }))
    }

    /// Whether this is the empty terminal of a nullable construct
    #[must_use]
    pub const fn is_empty_rule(&self) -> bool {
        self.empty_rule_for.is_some()
    }

    #[must_use]
    pub const fn is_marker(&self) -> bool {
        match &self.kind {
            RuleKind::Terminal(terminal) => terminal.is_marker(),
            RuleKind::NonTerminal(_) => false,
        }
    }

    /// The nullable rule this empty terminal stands for
    #[must_use]
    pub const fn empty_rule_for(&self) -> Option<RuleNumber> {
        self.empty_rule_for
    }

    /// The empty terminal of this nullable rule
    #[must_use]
    pub const fn empty_rule(&self) -> Option<RuleNumber> {
        self.empty_rule
    }

    /// Name used in messages: quoted literal, double quoted pattern, or the tag
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.is_virtual || self.is_empty_rule() {
            return self.tag.to_string();
        }
        match &self.kind {
            RuleKind::Terminal(TerminalKind::Literal(text)) if text == &self.tag => {
                format!("'{text}'")
            }
            RuleKind::Terminal(TerminalKind::Pattern { source, .. }) if source == &self.tag => {
                format!("\"{source}\"")
            }
            _ => self.tag.to_string(),
        }
    }
}

impl fmt::Display for RuntimeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.display_name())
    }
}
