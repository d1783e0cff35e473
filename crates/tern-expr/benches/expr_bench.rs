//! Expression pipeline benchmarks.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tern_expr::eval::{Env, EvalValue, Evaluator};
use tern_expr::parser::parse;

struct StaticEnv;

impl Env for StaticEnv {
    fn lookup(&self, name: &str) -> Option<EvalValue> {
        match name {
            "LOG_LEVEL" => Some(EvalValue::Int(2)),
            "BLE_HOST" => Some(EvalValue::Int(1)),
            _ => None,
        }
    }
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_guard", |b| {
        b.iter(|| parse(black_box("BLE_HOST && (LOG_LEVEL > 1 || DEBUG)")));
    });
}

fn bench_eval(c: &mut Criterion) {
    let expr = parse("BLE_HOST && (LOG_LEVEL > 1 || DEBUG)").unwrap();
    let env = StaticEnv;
    c.bench_function("eval_guard", |b| {
        b.iter(|| Evaluator::new(&env).eval(black_box(&expr)));
    });
}

criterion_group!(benches, bench_parse, bench_eval);
criterion_main!(benches);
