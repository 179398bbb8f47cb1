use super::{Alternative, RuleItem, RuleKind, RuleNumber, RuntimeRule, RuntimeRuleSet, TerminalKind};
use crate::error::GrammarError;
use crate::grammar::{ChoiceKind, Expr, Grammar, GrammarRule, ItemPath};
use compact_str::{CompactString, format_compact};
use hashbrown::HashMap;
use lasso::{Rodeo, Spur};
use regex_automata::meta::Regex;
use smallvec::{SmallVec, smallvec};

type IndexPath = SmallVec<[u32; 4]>;

/// A rule whose body may not be compiled yet
#[derive(Debug)]
struct PendingRule {
    tag: CompactString,
    kind: Option<RuleKind>,
    is_skip: bool,
    is_virtual: bool,
    empty_rule_for: Option<RuleNumber>,
    empty_rule: Option<RuleNumber>,
}

impl PendingRule {
    fn new(tag: CompactString, kind: Option<RuleKind>) -> Self {
        Self {
            tag,
            kind,
            is_skip: false,
            is_virtual: false,
            empty_rule_for: None,
            empty_rule: None,
        }
    }
}

/// Named rule a construct belongs to, and the rule receiving its body
#[derive(Debug, Clone, Copy)]
struct Scope {
    owner: RuleNumber,
    target: RuleNumber,
}

/// Compiles a [`Grammar`] into a [`RuntimeRuleSet`]
///
/// Compilation runs in two passes: every visible grammar rule is declared and
/// numbered first, then bodies are compiled, so references may point forward.
/// Literals and patterns are deduplicated; nested constructs become virtual
/// rules, memoized by owner and item path.
///
/// ```rust
/// use arbor::{Expr, GrammarBuilder, RuleCompiler};
///
/// let grammar = GrammarBuilder::new("t", "G")
///     .rule("S", Expr::seq([Expr::literal("a"), Expr::star(Expr::literal("b"))]))
///     .build();
/// let rules = RuleCompiler::new(&grammar).build().expect("grammar compiles");
///
/// assert!(rules.find_by_tag("§S§multi1").is_some_and(|rule| rule.is_virtual()));
/// ```
#[derive(Debug)]
pub struct RuleCompiler<'g> {
    grammar: &'g Grammar,
    pending: Vec<PendingRule>,
    names: Rodeo,
    by_name: HashMap<Spur, RuleNumber, ahash::RandomState>,
    literals: HashMap<CompactString, RuleNumber, ahash::RandomState>,
    patterns: HashMap<CompactString, RuleNumber, ahash::RandomState>,
    virtuals: HashMap<(RuleNumber, IndexPath), RuleNumber, ahash::RandomState>,
    origins: HashMap<RuleNumber, ItemPath, ahash::RandomState>,
    declared: Vec<(RuleNumber, &'g GrammarRule)>,
    skip_rules: Vec<RuleNumber>,
}

impl<'g> RuleCompiler<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            pending: Vec::new(),
            names: Rodeo::new(),
            by_name: HashMap::default(),
            literals: HashMap::default(),
            patterns: HashMap::default(),
            virtuals: HashMap::default(),
            origins: HashMap::default(),
            declared: Vec::new(),
            skip_rules: Vec::new(),
        }
    }

    /// Declare a named grammar rule under the next rule number
    ///
    /// Leaf rules, and skip rules, whose body is a single literal or pattern are
    /// terminals right away; other bodies are compiled by [`Self::build`].
    ///
    /// # Errors
    ///
    /// [`GrammarError::DuplicateRule`] when the name is already declared,
    /// [`GrammarError::InvalidPattern`] for a leaf pattern that does not compile.
    pub fn create_runtime_rule(&mut self, rule: &'g GrammarRule) -> Result<RuleNumber, GrammarError> {
        if self.lookup(&rule.name).is_some() {
            return Err(GrammarError::DuplicateRule {
                rule_name: rule.name.clone(),
            });
        }

        let leaf_body = if rule.is_leaf || rule.is_skip {
            terminal_body(&rule.rhs)
        } else {
            None
        };
        let kind = leaf_body
            .map(|body| terminal_kind(body).map(RuleKind::Terminal))
            .transpose()?;
        let is_terminal = kind.is_some();

        let mut pending = PendingRule::new(rule.name.clone(), kind);
        pending.is_skip = rule.is_skip;
        let number = self.push(pending);

        let key = self.names.get_or_intern(&rule.name);
        self.by_name.insert(key, number);
        if rule.is_skip {
            self.skip_rules.push(number);
        }
        if !is_terminal {
            self.declared.push((number, rule));
        }
        Ok(number)
    }

    /// Terminal for a literal or pattern expression, shared by every occurrence
    /// of the same text. Returns `None` for any other expression.
    ///
    /// # Errors
    ///
    /// [`GrammarError::InvalidPattern`] when a pattern does not compile.
    pub fn create_terminal(&mut self, expr: &Expr) -> Result<Option<RuleNumber>, GrammarError> {
        let (cache, text) = match expr {
            Expr::Literal(text) => (&self.literals, text),
            Expr::Pattern(source) => (&self.patterns, source),
            _ => return Ok(None),
        };
        if let Some(&number) = cache.get(text) {
            return Ok(Some(number));
        }

        let kind = terminal_kind(expr)?;
        let number = self.push(PendingRule::new(text.clone(), Some(RuleKind::Terminal(kind))));
        match expr {
            Expr::Literal(_) => self.literals.insert(text.clone(), number),
            _ => self.patterns.insert(text.clone(), number),
        };
        Ok(Some(number))
    }

    /// Virtual rule for the construct at `path` inside `owner`
    ///
    /// The same owner and path always yield the same rule. The rule set keeps
    /// the path so the rule can be traced back to its grammar expression.
    ///
    /// # Errors
    ///
    /// Any error raised while compiling the construct's body.
    pub fn create_virtual_rule(
        &mut self,
        owner: RuleNumber,
        path: &[u32],
        expr: &Expr,
    ) -> Result<RuleNumber, GrammarError> {
        let key = (owner, IndexPath::from_slice(path));
        if let Some(&number) = self.virtuals.get(&key) {
            return Ok(number);
        }

        let origin = ItemPath::new(self.pending[owner.index()].tag.clone(), path);
        let tag = format_compact!("§{}§{}{}", origin.rule, expr.kind_label(), origin.dotted());
        let mut pending = PendingRule::new(tag, None);
        pending.is_virtual = true;
        let number = self.push(pending);
        self.virtuals.insert(key, number);
        self.origins.insert(number, origin);

        let scope = Scope {
            owner,
            target: number,
        };
        let item = self.compile_rhs(scope, path, expr)?;
        self.pending[number.index()].kind = Some(RuleKind::NonTerminal(item));
        Ok(number)
    }

    /// Compile the whole grammar
    ///
    /// # Errors
    ///
    /// [`GrammarError::RuleNotFound`] for a reference to an undeclared rule,
    /// plus the errors of [`Self::create_runtime_rule`] and
    /// [`Self::create_terminal`].
    pub fn build(mut self) -> Result<RuntimeRuleSet, GrammarError> {
        let grammar = self.grammar;
        for rule in grammar.all_rules() {
            self.create_runtime_rule(rule)?;
        }

        for (number, rule) in std::mem::take(&mut self.declared) {
            let scope = Scope {
                owner: number,
                target: number,
            };
            let item = self.compile_rhs(scope, &[], &rule.rhs)?;
            self.pending[number.index()].kind = Some(RuleKind::NonTerminal(item));
        }

        let skip_goal = self.create_skip_goal();
        let start_marker = self.push(PendingRule::new(
            CompactString::const_new("<START>"),
            Some(RuleKind::Terminal(TerminalKind::StartMarker)),
        ));
        let finish_marker = self.push(PendingRule::new(
            CompactString::const_new("<FINISH>"),
            Some(RuleKind::Terminal(TerminalKind::FinishMarker)),
        ));

        let rules = self
            .pending
            .into_iter()
            .enumerate()
            .map(|(index, pending)| link(RuleNumber::from_index(index), pending))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            grammar = %grammar.qualified_name(),
            rules = rules.len(),
            virtual_rules = self.origins.len(),
            skip_rules = self.skip_rules.len(),
            "compiled grammar"
        );

        Ok(RuntimeRuleSet {
            grammar_name: grammar.qualified_name(),
            rules,
            names: self.names.into_reader(),
            by_name: self.by_name,
            origins: self.origins,
            skip_rules: self.skip_rules,
            skip_goal,
            start_marker,
            finish_marker,
        })
    }

    fn push(&mut self, rule: PendingRule) -> RuleNumber {
        let number = RuleNumber::from_index(self.pending.len());
        self.pending.push(rule);
        number
    }

    fn lookup(&self, name: &str) -> Option<RuleNumber> {
        let key = self.names.get(name)?;
        self.by_name.get(&key).copied()
    }

    /// The empty terminal of `target`, created on first request
    fn create_empty_rule(&mut self, target: RuleNumber) -> RuleNumber {
        if let Some(empty) = self.pending[target.index()].empty_rule {
            return empty;
        }
        let tag = format_compact!("§empty.{}", self.pending[target.index()].tag);
        let mut pending = PendingRule::new(tag, Some(RuleKind::Terminal(TerminalKind::Empty)));
        pending.empty_rule_for = Some(target);
        let empty = self.push(pending);
        self.pending[target.index()].empty_rule = Some(empty);
        empty
    }

    fn compile_rhs(&mut self, scope: Scope, path: &[u32], expr: &Expr) -> Result<RuleItem, GrammarError> {
        let item = match expr {
            Expr::Empty => {
                self.create_empty_rule(scope.target);
                RuleItem::Empty
            }
            Expr::Concatenation(items) => {
                let sequence = self.compile_sequence(scope.owner, path, items)?;
                if sequence.is_empty() {
                    self.create_empty_rule(scope.target);
                    RuleItem::Empty
                } else {
                    RuleItem::Concatenation(sequence)
                }
            }
            Expr::Choice { kind, alternatives } => {
                let mut compiled = Vec::with_capacity(alternatives.len());
                for (index, alternative) in alternatives.iter().enumerate() {
                    let alt_path = extend(path, index);
                    let mut items = match alternative {
                        Expr::Concatenation(items) => self.compile_sequence(scope.owner, &alt_path, items)?,
                        Expr::Empty => Alternative::new(),
                        other => smallvec![self.item_ref(scope.owner, &alt_path, other)?],
                    };
                    if items.is_empty() {
                        items.push(self.create_empty_rule(scope.target));
                    }
                    compiled.push(items);
                }
                match kind {
                    ChoiceKind::Ambiguous => RuleItem::Choice(compiled),
                    ChoiceKind::Priority => RuleItem::PriorityChoice(compiled),
                }
            }
            Expr::Multi { min, max, item } => {
                let item = self.item_ref(scope.owner, &extend(path, 0), item)?;
                if *min == 0 {
                    self.create_empty_rule(scope.target);
                }
                RuleItem::Multi {
                    min: *min,
                    max: *max,
                    item,
                }
            }
            Expr::SeparatedList {
                min,
                max,
                item,
                separator,
            } => {
                let item = self.item_ref(scope.owner, &extend(path, 0), item)?;
                let separator = self.item_ref(scope.owner, &extend(path, 1), separator)?;
                if *min == 0 {
                    self.create_empty_rule(scope.target);
                }
                RuleItem::SeparatedList {
                    min: *min,
                    max: *max,
                    item,
                    separator,
                }
            }
            Expr::Group(inner) => return self.compile_rhs(scope, &extend(path, 0), inner),
            Expr::Literal(_) | Expr::Pattern(_) | Expr::NonTerminal(_) => {
                RuleItem::Concatenation(smallvec![self.item_ref(scope.owner, path, expr)?])
            }
        };
        Ok(item)
    }

    fn compile_sequence(
        &mut self,
        owner: RuleNumber,
        path: &[u32],
        items: &[Expr],
    ) -> Result<Alternative, GrammarError> {
        let mut sequence = Alternative::new();
        for (index, item) in items.iter().enumerate() {
            if matches!(item, Expr::Empty) {
                continue;
            }
            sequence.push(self.item_ref(owner, &extend(path, index), item)?);
        }
        Ok(sequence)
    }

    /// Rule referenced by an item position
    fn item_ref(&mut self, owner: RuleNumber, path: &[u32], expr: &Expr) -> Result<RuleNumber, GrammarError> {
        match expr {
            Expr::NonTerminal(name) => self.lookup(name).ok_or_else(|| GrammarError::RuleNotFound {
                rule_name: name.clone(),
            }),
            Expr::Literal(_) | Expr::Pattern(_) => {
                let terminal = self.create_terminal(expr)?;
                terminal.ok_or_else(|| GrammarError::RuleNotFound {
                    rule_name: CompactString::const_new("<terminal>"),
                })
            }
            Expr::Group(inner) if inner.is_symbol() => self.item_ref(owner, &extend(path, 0), inner),
            _ => self.create_virtual_rule(owner, path, expr),
        }
    }

    fn create_skip_goal(&mut self) -> Option<RuleNumber> {
        if self.skip_rules.is_empty() {
            return None;
        }
        let alternatives = self.skip_rules.iter().map(|&rule| smallvec![rule]).collect();
        let mut choice = PendingRule::new(
            CompactString::const_new("§SKIP§choice"),
            Some(RuleKind::NonTerminal(RuleItem::Choice(alternatives))),
        );
        choice.is_virtual = true;
        let choice = self.push(choice);

        let mut multi = PendingRule::new(
            CompactString::const_new("§SKIP§multi"),
            Some(RuleKind::NonTerminal(RuleItem::Multi {
                min: 1,
                max: None,
                item: choice,
            })),
        );
        multi.is_virtual = true;
        Some(self.push(multi))
    }
}

/// The literal or pattern a leaf body reduces to
fn terminal_body(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::Literal(_) | Expr::Pattern(_) => Some(expr),
        Expr::Group(inner) => terminal_body(inner),
        _ => None,
    }
}

fn terminal_kind(expr: &Expr) -> Result<TerminalKind, GrammarError> {
    match expr {
        Expr::Pattern(source) => {
            let regex = Regex::new(source).map_err(|error| GrammarError::InvalidPattern {
                pattern: source.clone(),
                error,
            })?;
            Ok(TerminalKind::Pattern {
                source: source.clone(),
                regex,
            })
        }
        Expr::Literal(text) => Ok(TerminalKind::Literal(text.clone())),
        _ => Ok(TerminalKind::Empty),
    }
}

fn extend(path: &[u32], index: usize) -> IndexPath {
    let mut extended = IndexPath::from_slice(path);
    extended.push(u32::try_from(index).unwrap_or(u32::MAX));
    extended
}

fn needs_empty_rule(item: &RuleItem) -> bool {
    match item {
        RuleItem::Empty => true,
        RuleItem::Multi { min, .. } | RuleItem::SeparatedList { min, .. } => *min == 0,
        RuleItem::Choice(_) | RuleItem::PriorityChoice(_) | RuleItem::Concatenation(_) => false,
    }
}

fn link(number: RuleNumber, pending: PendingRule) -> Result<RuntimeRule, GrammarError> {
    let kind = pending
        .kind
        .unwrap_or(RuleKind::NonTerminal(RuleItem::Choice(Vec::new())));
    if let RuleKind::NonTerminal(item) = &kind
        && needs_empty_rule(item)
        && pending.empty_rule.is_none()
    {
        return Err(GrammarError::MissingEmptyRule {
            rule_name: pending.tag,
        });
    }
    Ok(RuntimeRule {
        number,
        tag: pending.tag,
        kind,
        is_skip: pending.is_skip,
        is_virtual: pending.is_virtual,
        empty_rule_for: pending.empty_rule_for,
        empty_rule: pending.empty_rule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarBuilder;

    fn compile(grammar: &Grammar) -> RuntimeRuleSet {
        RuleCompiler::new(grammar).build().expect("grammar compiles")
    }

    #[test]
    fn test_named_rules_numbered_first() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::seq([Expr::rule("A"), Expr::literal("x")]))
            .rule("A", Expr::literal("a"))
            .build();
        let rules = compile(&grammar);

        assert_eq!(rules.find("S").map(RuntimeRule::number), Some(RuleNumber::new(0)));
        assert_eq!(rules.find("A").map(RuntimeRule::number), Some(RuleNumber::new(1)));
        assert_eq!(rules.rule(rules.finish_marker()).tag(), "<FINISH>");
        assert_eq!(rules.rule(rules.start_marker()).tag(), "<START>");
    }

    #[test]
    fn test_literals_are_deduplicated() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::seq([Expr::literal("a"), Expr::literal("a")]))
            .rule("T", Expr::literal("a"))
            .build();
        let rules = compile(&grammar);

        let literals = rules
            .iter()
            .filter(|rule| matches!(rule.terminal(), Some(TerminalKind::Literal(_))))
            .count();
        assert_eq!(literals, 1);
    }

    #[test]
    fn test_leaf_rule_becomes_named_terminal() {
        let grammar = GrammarBuilder::new("t", "G")
            .leaf("ID", Expr::pattern("[a-z]+"))
            .skip("WS", Expr::pattern(r"\s+"))
            .rule("S", Expr::rule("ID"))
            .build();
        let rules = compile(&grammar);

        let id = rules.find("ID").expect("ID declared");
        assert!(id.is_pattern());
        let ws = rules.find("WS").expect("WS declared");
        assert!(ws.is_terminal() && ws.is_skip());
        assert_eq!(rules.skip_rules(), &[ws.number()]);
        assert!(rules.skip_goal().is_some());
    }

    #[test]
    fn test_virtual_rules_are_memoized_by_path() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule(
                "S",
                Expr::seq([
                    Expr::group(Expr::choice([Expr::literal("a"), Expr::literal("b")])),
                    Expr::star(Expr::rule("S")),
                ]),
            )
            .build();
        let mut compiler = RuleCompiler::new(&grammar);
        let owner = compiler
            .create_runtime_rule(&grammar.rules[0])
            .expect("declares");
        let expr = Expr::star(Expr::rule("S"));
        let first = compiler.create_virtual_rule(owner, &[1], &expr).expect("virtual");
        let second = compiler.create_virtual_rule(owner, &[1], &expr).expect("virtual");
        assert_eq!(first, second);

        let rules = compile(&grammar);
        let group = rules.find_by_tag("§S§group0").expect("group rule");
        assert!(group.is_virtual());
        assert_eq!(rules.origin_of(group.number()), Some(&ItemPath::new("S", &[0])));
        assert!(rules.find_by_tag("§S§multi1").is_some());
    }

    #[test]
    fn test_nullable_constructs_get_empty_rules() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::choice([Expr::literal("a"), Expr::empty()]))
            .rule("B", Expr::opt(Expr::literal("b")))
            .rule("E", Expr::empty())
            .build();
        let rules = compile(&grammar);

        for name in ["S", "B", "E"] {
            let rule = rules.find(name).expect("declared");
            let empty = rule.empty_rule().expect("nullable rule has an empty rule");
            assert_eq!(rules.rule(empty).empty_rule_for(), Some(rule.number()));
        }
    }

    #[test]
    fn test_unknown_reference_fails() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::seq([Expr::literal("a"), Expr::rule("Missing")]))
            .build();
        let error = RuleCompiler::new(&grammar).build().expect_err("must fail");
        assert!(matches!(error, GrammarError::RuleNotFound { rule_name } if rule_name == "Missing"));
    }

    #[test]
    fn test_invalid_pattern_fails() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::pattern("(unclosed"))
            .build();
        let error = RuleCompiler::new(&grammar).build().expect_err("must fail");
        assert!(matches!(error, GrammarError::InvalidPattern { .. }));
    }

    #[test]
    fn test_duplicate_rule_fails() {
        let grammar = GrammarBuilder::new("t", "G")
            .rule("S", Expr::literal("a"))
            .rule("S", Expr::literal("b"))
            .build();
        let error = RuleCompiler::new(&grammar).build().expect_err("must fail");
        assert!(matches!(error, GrammarError::DuplicateRule { .. }));
    }
}
