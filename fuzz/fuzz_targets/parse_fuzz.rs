#![no_main]
use arbor::{Expr, GrammarBuilder, ParseError, Parser};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn parser() -> &'static Parser {
    static PARSER: OnceLock<Parser> = OnceLock::new();
    PARSER.get_or_init(|| {
        let grammar = GrammarBuilder::new("fuzz", "Json")
            .skip("WS", Expr::pattern(r"\s+"))
            .leaf("STRING", Expr::pattern(r#""[^"]*""#))
            .leaf("NUMBER", Expr::pattern("-?[0-9]+"))
            .rule(
                "Value",
                Expr::choice([
                    Expr::rule("STRING"),
                    Expr::rule("NUMBER"),
                    Expr::rule("Object"),
                    Expr::rule("Array"),
                    Expr::literal("null"),
                ]),
            )
            .rule(
                "Object",
                Expr::seq([
                    Expr::literal("{"),
                    Expr::separated(
                        Expr::seq([Expr::rule("STRING"), Expr::literal(":"), Expr::rule("Value")]),
                        Expr::literal(","),
                        0,
                        None,
                    ),
                    Expr::literal("}"),
                ]),
            )
            .rule(
                "Array",
                Expr::seq([
                    Expr::literal("["),
                    Expr::separated(Expr::rule("Value"), Expr::literal(","), 0, None),
                    Expr::literal("]"),
                ]),
            )
            .build();
        Parser::from_grammar(&grammar).unwrap()
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    match parser().parse("Value", text) {
        Ok(forest) => {
            assert_eq!(forest.root().end_position(), text.len());
            assert!(forest.node_count() > 0);
        }
        Err(ParseError::ParseFailed { position, .. }) => assert!(position <= text.len()),
        Err(other) => panic!("unexpected error: {other}"),
    }
    if !text.is_empty() {
        let _ = parser().expected_at("Value", text, text.len() / 2);
    }
});
