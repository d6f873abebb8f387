//! Benchmarks for rule parsing, editing and evaluation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rule_ast_core::rule::cache::{clear_cache, get_or_parse};
use rule_ast_core::{
    add_sub_expression, combine, evaluate, parse, remove_sub_expression, NodePath, Record, Value,
};

const RULES: [&str; 5] = [
    "age > 30",
    "age > 30 AND department == 'Sales'",
    "(age > 30 AND department == 'Sales') OR (age < 25 AND department == 'Marketing')",
    "(salary > 50000 OR experience > 5) AND age >= 21",
    "age > 30 AND department == HR OR salary > 50000 AND experience >= 3",
];

/// A record matching some but not all of the rules above
fn sample_record() -> Record {
    let mut record = Record::new();
    record.insert("age".to_string(), Value::from(35));
    record.insert("department".to_string(), Value::from("Sales"));
    record.insert("salary".to_string(), Value::from("60000"));
    record.insert("experience".to_string(), Value::from(3));
    record
}

fn benchmark_parsing(c: &mut Criterion) {
    c.bench_function("rule_parsing_cold", |b| {
        b.iter(|| {
            clear_cache();
            for rule in &RULES {
                let _ = black_box(get_or_parse(rule));
            }
        })
    });

    c.bench_function("rule_parsing_cached", |b| {
        // Warm up cache
        for rule in &RULES {
            let _ = get_or_parse(rule);
        }

        b.iter(|| {
            for rule in &RULES {
                let _ = black_box(get_or_parse(rule));
            }
        })
    });
}

fn benchmark_evaluation(c: &mut Criterion) {
    let record = sample_record();
    let asts: Vec<_> = RULES.iter().map(|r| parse(r).unwrap()).collect();
    let combined = combine(asts.clone(), "AND").unwrap();

    c.bench_function("evaluate_each_rule", |b| {
        b.iter(|| {
            for ast in &asts {
                black_box(evaluate(Some(ast), black_box(&record)));
            }
        })
    });

    c.bench_function("evaluate_combined_rule", |b| {
        b.iter(|| black_box(evaluate(combined.as_ref(), black_box(&record))))
    });
}

fn benchmark_editing(c: &mut Criterion) {
    let ast = parse(RULES[2]).unwrap();
    let extra = parse("experience > 1").unwrap();
    let path: NodePath = "right.left".parse().unwrap();

    c.bench_function("add_then_remove_sub_expression", |b| {
        b.iter(|| {
            let grown = add_sub_expression(&ast, &path, extra.clone(), None).unwrap();
            let shrunk = remove_sub_expression(&grown, &path.child(rule_ast_core::Branch::Right));
            black_box(shrunk)
        })
    });
}

criterion_group!(benches, benchmark_parsing, benchmark_evaluation, benchmark_editing);
criterion_main!(benches);
