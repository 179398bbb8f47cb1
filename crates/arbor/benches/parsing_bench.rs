use arbor::{Expr, Grammar, GrammarBuilder, Parser, RuntimeRuleSet};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn setup_grammar() -> Grammar {
    GrammarBuilder::new("bench", "Arithmetic")
        .skip("WS", Expr::pattern(r"\s+"))
        .leaf("NUM", Expr::pattern("[0-9]+"))
        .rule(
            "Expr",
            Expr::priority_choice([
                Expr::seq([Expr::rule("Expr"), Expr::literal("+"), Expr::rule("Term")]),
                Expr::rule("Term"),
            ]),
        )
        .rule(
            "Term",
            Expr::priority_choice([
                Expr::seq([Expr::rule("Term"), Expr::literal("*"), Expr::rule("Factor")]),
                Expr::rule("Factor"),
            ]),
        )
        .rule(
            "Factor",
            Expr::choice([
                Expr::rule("NUM"),
                Expr::seq([Expr::literal("("), Expr::rule("Expr"), Expr::literal(")")]),
            ]),
        )
        .build()
}

fn ambiguous_grammar() -> Grammar {
    GrammarBuilder::new("bench", "Ambiguous")
        .leaf("NUM", Expr::pattern("[0-9]+"))
        .rule(
            "E",
            Expr::choice([
                Expr::rule("NUM"),
                Expr::seq([Expr::rule("E"), Expr::literal("+"), Expr::rule("E")]),
            ]),
        )
        .build()
}

fn arithmetic_text(terms: usize) -> String {
    (0..terms)
        .map(|index| match index % 3 {
            0 => format!("{index} * (1 + {index})"),
            1 => format!("{index} * 7"),
            _ => index.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn bench_compile(c: &mut Criterion) {
    let grammar = setup_grammar();
    c.bench_function("compile_arithmetic", |b| {
        b.iter(|| black_box(RuntimeRuleSet::compile(black_box(&grammar))));
    });
}

fn bench_full_parse(c: &mut Criterion) {
    let parser = Parser::from_grammar(&setup_grammar()).expect("grammar compiles");
    let mut group = c.benchmark_group("full_parse");
    for terms in [4, 16, 64] {
        let text = arithmetic_text(terms);
        group.bench_with_input(BenchmarkId::from_parameter(terms), &text, |b, text| {
            b.iter(|| black_box(parser.parse("Expr", black_box(text))));
        });
    }
    group.finish();
}

fn bench_ambiguous_parse(c: &mut Criterion) {
    let parser = Parser::from_grammar(&ambiguous_grammar()).expect("grammar compiles");
    let mut group = c.benchmark_group("ambiguous_parse");
    for terms in [4, 8, 12] {
        let text = vec!["1"; terms].join("+");
        group.bench_with_input(BenchmarkId::from_parameter(terms), &text, |b, text| {
            b.iter(|| black_box(parser.parse("E", black_box(text))));
        });
    }
    group.finish();
}

fn bench_failed_parse(c: &mut Criterion) {
    let parser = Parser::from_grammar(&setup_grammar()).expect("grammar compiles");
    let text = format!("{} + )", arithmetic_text(16));
    c.bench_function("failed_parse_with_longest_match", |b| {
        b.iter(|| black_box(parser.parse("Expr", black_box(&text))));
    });
}

criterion_group!(
    benches,
    bench_compile,
    bench_full_parse,
    bench_ambiguous_parse,
    bench_failed_parse
);
criterion_main!(benches);
