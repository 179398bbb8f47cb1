use crate::graph::{ParseGraph, SkipRun};
use crate::input::InputSource;
use crate::runtime::{RuleNumber, RuntimeRuleSet};

/// Drives a [`ParseGraph`] to its fixed point
///
/// Each season drains the frontier and grows every head. States parked behind
/// a skip position are released between seasons, once a nested parse of the
/// skip goal has found the longest skip sequence there. Growth stops when a
/// season leaves nothing to grow and nothing waits for skip.
#[derive(Debug)]
pub(crate) struct Grower<'r> {
    rules: &'r RuntimeRuleSet,
    skip_enabled: bool,
    seasons: usize,
    skip_parses: usize,
}

impl<'r> Grower<'r> {
    pub(crate) const fn new(rules: &'r RuntimeRuleSet, skip_enabled: bool) -> Self {
        Self {
            rules,
            skip_enabled,
            seasons: 0,
            skip_parses: 0,
        }
    }

    pub(crate) const fn seasons(&self) -> usize {
        self.seasons
    }

    pub(crate) const fn skip_parses(&self) -> usize {
        self.skip_parses
    }

    /// Grow `START goal FINISH` over the whole input
    pub(crate) fn grow_goal(&mut self, goal: RuleNumber, input: &mut InputSource<'_>) -> ParseGraph<'r> {
        let mut graph = ParseGraph::for_goal(self.rules, goal, self.skip_enabled);
        graph.create_start(self.rules.pseudo_goal(), 0);
        self.run(&mut graph, input);
        graph
    }

    fn run(&mut self, graph: &mut ParseGraph<'r>, input: &mut InputSource<'_>) {
        loop {
            let heads = graph.take_frontier();
            if heads.is_empty() && !graph.has_pending_skip() {
                break;
            }
            if !heads.is_empty() {
                self.seasons += 1;
                tracing::trace!(season = self.seasons, heads = heads.len(), "season");
                for head in heads {
                    graph.grow(head, input);
                }
            }
            self.resolve_skip(graph, input);
        }
    }

    fn resolve_skip(&mut self, graph: &mut ParseGraph<'r>, input: &mut InputSource<'_>) {
        for position in graph.pending_skip_positions() {
            let skip = self.match_skip(graph, position, input);
            tracing::trace!(position, skip_nodes = skip.as_ref().map_or(0, SkipRun::len), "resolved skip");
            graph.resolve_skip(position, skip);
        }
    }

    /// Longest skip sequence at `position`, imported into `graph`
    fn match_skip(
        &mut self,
        graph: &mut ParseGraph<'r>,
        position: usize,
        input: &mut InputSource<'_>,
    ) -> Option<SkipRun> {
        let goal = self.rules.skip_goal()?;
        self.skip_parses += 1;
        let mut skip_graph = ParseGraph::for_skip(self.rules);
        skip_graph.create_start(goal, position);
        self.run(&mut skip_graph, input);

        let sequence = skip_graph.longest_completion(goal, position)?;
        let nodes = skip_graph.flatten_skip(sequence);
        Some(graph.import_all(&skip_graph, &nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::NodeIdentity;
    use crate::{Expr, GrammarBuilder};

    #[test]
    fn test_skip_positions_are_parsed_once() {
        let grammar = GrammarBuilder::new("t", "G")
            .skip("WS", Expr::pattern(" +"))
            .rule(
                "S",
                Expr::choice([
                    Expr::seq([Expr::literal("a"), Expr::literal("b")]),
                    Expr::seq([Expr::literal("a"), Expr::literal("c")]),
                ]),
            )
            .build();
        let rules = RuntimeRuleSet::compile(&grammar).expect("compiles");
        let goal = rules.find("S").expect("S").number();
        let mut input = InputSource::new("a b");
        let mut grower = Grower::new(&rules, true);
        let graph = grower.grow_goal(goal, &mut input);

        let pseudo = graph.pseudo_goal().expect("top-level graph");
        assert!(graph.find_complete(NodeIdentity::new(pseudo, 0, 3)).is_some());
        // after START, after 'a', after 'b'
        assert_eq!(grower.skip_parses(), 3);
        assert!(grower.seasons() > 0);
    }

    #[test]
    fn test_skip_disabled_leaves_whitespace_unmatched() {
        let grammar = GrammarBuilder::new("t", "G")
            .skip("WS", Expr::pattern(" +"))
            .rule("S", Expr::seq([Expr::literal("a"), Expr::literal("b")]))
            .build();
        let rules = RuntimeRuleSet::compile(&grammar).expect("compiles");
        let goal = rules.find("S").expect("S").number();
        let mut input = InputSource::new("a b");
        let graph = Grower::new(&rules, false).grow_goal(goal, &mut input);

        let pseudo = graph.pseudo_goal().expect("top-level graph");
        assert!(graph.find_complete(NodeIdentity::new(pseudo, 0, 3)).is_none());
        assert_eq!(graph.furthest_position(), 1);
    }
}
