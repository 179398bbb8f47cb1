//! Failure reports and expected terminals

use arbor::{Expr, Grammar, GrammarBuilder, ParseError, Parser, ParserConfig};

fn ab_grammar() -> Grammar {
    GrammarBuilder::new("test", "AB")
        .skip("WS", Expr::pattern(r"\s+"))
        .rule("S", Expr::seq([Expr::literal("a"), Expr::literal("b")]))
        .build()
}

fn tags(rules: &[&arbor::RuntimeRule]) -> Vec<String> {
    rules.iter().map(|rule| rule.tag().to_string()).collect()
}

#[test]
fn test_failure_reports_longest_match() {
    let parser = Parser::from_grammar(&ab_grammar()).expect("compiles");
    let error = parser.parse("S", "a").expect_err("incomplete input");

    assert_eq!(error.position(), Some(1));
    let longest = error.longest_match().expect("longest match tracked");
    let root = longest.root();
    assert!(root.is_leaf());
    assert_eq!(root.name(), "a");
    assert_eq!(root.start_position(), 0);
    assert_eq!(root.matched_text_length(), 1);
    assert_eq!(root.matched_text(), "a");
}

#[test]
fn test_longest_match_prefers_non_terminals() {
    let grammar = GrammarBuilder::new("test", "Pairs")
        .rule("S", Expr::seq([Expr::rule("P"), Expr::literal(";")]))
        .rule("P", Expr::seq([Expr::literal("a"), Expr::literal("b")]))
        .build();
    let parser = Parser::from_grammar(&grammar).expect("compiles");
    let error = parser.parse("S", "ab").expect_err("missing ';'");

    // 'b' and P both end at 2; P spans more
    let longest = error.longest_match().expect("longest match tracked");
    assert_eq!(longest.root().name(), "P");
    assert_eq!(longest.root().matched_text(), "ab");
}

#[test]
fn test_longest_match_can_be_disabled() {
    let config = ParserConfig::default().with_longest_match(false);
    let rules = std::sync::Arc::new(arbor::RuntimeRuleSet::compile(&ab_grammar()).expect("compiles"));
    let parser = Parser::with_config(rules, config);

    let error = parser.parse("S", "a").expect_err("incomplete input");
    assert!(error.longest_match().is_none());
    assert_eq!(error.position(), Some(1));
}

#[test]
fn test_failure_message_names_goal_location_and_expected() {
    let parser = Parser::from_grammar(&ab_grammar()).expect("compiles");
    let error = parser.parse("S", "a\n  x").expect_err("bad input");

    let ParseError::ParseFailed { message, position, .. } = &error else {
        panic!("expected ParseFailed, got {error:?}");
    };
    assert_eq!(*position, 4);
    assert_eq!(message, "Could not match goal 'S' at 2:3, expected 'b'");
}

#[test]
fn test_empty_input_fails_at_start() {
    let parser = Parser::from_grammar(&ab_grammar()).expect("compiles");
    let error = parser.parse("S", "").expect_err("empty input");

    assert_eq!(error.position(), Some(0));
    assert!(error.to_string().contains("at 1:1"), "{error}");
    assert!(error.to_string().contains("'a'"), "{error}");
    assert!(error.longest_match().is_none());
}

#[test]
fn test_expected_list_is_truncated() {
    let grammar = GrammarBuilder::new("test", "Many")
        .rule(
            "S",
            Expr::choice(["a", "b", "c", "d", "e"].map(Expr::literal)),
        )
        .build();
    let rules = std::sync::Arc::new(arbor::RuntimeRuleSet::compile(&grammar).expect("compiles"));
    let parser = Parser::with_config(rules, ParserConfig::default().with_max_expected(2));

    let error = parser.parse("S", "z").expect_err("no alternative matches");
    let message = error.to_string();
    assert!(message.ends_with("expected 'a' or 'b' (and 3 more)"), "{message}");
}

#[test]
fn test_unknown_goal_is_reported() {
    let parser = Parser::from_grammar(&ab_grammar()).expect("compiles");
    let error = parser.parse("Missing", "ab").expect_err("unknown goal");
    assert!(matches!(&error, ParseError::RuleNotFound { rule_name } if rule_name == "Missing"));
    assert_eq!(error.position(), None);
}

#[test]
fn test_parse_reader_propagates_io_errors() {
    struct Broken;

    impl std::io::Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }

    let parser = Parser::from_grammar(&ab_grammar()).expect("compiles");
    let error = parser.parse_reader("S", Broken).expect_err("reader fails");
    assert!(matches!(error, ParseError::Io(_)));
}

#[test]
fn test_expected_at_lists_next_terminals() {
    let grammar = GrammarBuilder::new("test", "Next")
        .rule(
            "S",
            Expr::seq([Expr::literal("a"), Expr::choice([Expr::literal("b"), Expr::literal("c")])]),
        )
        .build();
    let parser = Parser::from_grammar(&grammar).expect("compiles");

    let at_start = parser.expected_at("S", "ab", 0).expect("goal exists");
    assert_eq!(tags(&at_start), vec!["a"]);

    let after_a = parser.expected_at("S", "ab", 1).expect("goal exists");
    assert_eq!(tags(&after_a), vec!["b", "c"]);

    let at_end = parser.expected_at("S", "ab", 2).expect("goal exists");
    assert!(at_end.is_empty());
}

#[test]
fn test_expected_at_skips_whitespace_and_clamps() {
    let parser = Parser::from_grammar(&ab_grammar()).expect("compiles");

    let after_space = parser.expected_at("S", "a b", 2).expect("goal exists");
    assert_eq!(tags(&after_space), vec!["b"]);

    let clamped = parser.expected_at("S", "a", 10).expect("goal exists");
    assert_eq!(tags(&clamped), vec!["b"]);

    assert!(matches!(
        parser.expected_at("Nope", "a", 0),
        Err(ParseError::RuleNotFound { .. })
    ));
}

#[test]
fn test_expected_at_after_multibyte_text() {
    let grammar = GrammarBuilder::new("test", "Unicode")
        .rule("S", Expr::seq([Expr::literal("é"), Expr::literal("b")]))
        .build();
    let parser = Parser::from_grammar(&grammar).expect("compiles");

    assert_eq!(tags(&parser.expected_at("S", "éb", 2).expect("goal exists")), vec!["b"]);
    // inside 'é' moves back to its start
    assert_eq!(tags(&parser.expected_at("S", "éb", 1).expect("goal exists")), vec!["é"]);
}
