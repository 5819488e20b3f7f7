use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use fsmgen::{Compiler, CompilerConfig, Machine, Model, ModelBuilder, Strategy, Token, machine};

#[machine(state = u8, token = char, init = 0, exit = 9)]
#[transition(from = 0, to = 1, on = 'a'..='z')]
#[transition(from = 0, to = 2, on = '0'..='9')]
#[transition(from = 1, to = 1, on = 'a'..='z')]
#[transition(from = 1, to = 2, on = '0'..='9')]
#[transition(from = 1, to = 3, on = [' ', '\t'])]
#[transition(from = 2, to = 2, on = '0'..='9')]
#[transition(from = 2, to = 3, on = [' ', '\t'])]
#[transition(from = 3, to = 1, on = 'a'..='z')]
#[transition(from = 3, to = 2, on = '0'..='9')]
#[transition(from = 3, to = 3, on = [' ', '\t'])]
pub struct MacroLexer;

fn lexer_model() -> Model<u8, char> {
    let letters = || Some(Token::range('a', 'z').expect("letters"));
    let digits = || Some(Token::range('0', '9').expect("digits"));
    let blanks = || Some(Token::set([' ', '\t']));

    let mut builder = ModelBuilder::new();
    builder.set_init(0).unwrap().set_exit(9).unwrap();
    for state in 1..=3 {
        builder.add_state(state).unwrap();
    }
    builder
        .add_transition(0, 1, letters())
        .unwrap()
        .add_transition(0, 2, digits())
        .unwrap();
    for from in 1..=3 {
        if from != 2 {
            builder.add_transition(from, 1, letters()).unwrap();
        }
        builder
            .add_transition(from, 2, digits())
            .unwrap()
            .add_transition(from, 3, blanks())
            .unwrap();
    }
    builder.build().unwrap()
}

fn manual_transit(state: u8, token: char) -> u8 {
    match (state, token) {
        (0 | 1 | 3, 'a'..='z') => 1,
        (0..=3, '0'..='9') => 2,
        (1..=3, ' ' | '\t') => 3,
        _ => 9,
    }
}

fn manual_run(tokens: &[char]) -> u8 {
    let mut state = 0;
    for &token in tokens {
        state = manual_transit(state, token);
        if state == 9 {
            break;
        }
    }
    state
}

fn compiled(strategy: Strategy) -> Machine<u8, char> {
    let config = CompilerConfig::default().with_strategy(strategy);
    Compiler::new()
        .with_config(config)
        .compile_uncached(&lexer_model())
        .unwrap()
        .machine()
}

fn bench_dispatch(c: &mut Criterion) {
    let input: Vec<char> = "let x1 = 42 and y2 = 17 then foo bar 99 \t baz"
        .chars()
        .filter(|token| !matches!(token, '=' | 'x' | 'y'))
        .cycle()
        .take(4096)
        .collect();

    let model = lexer_model();
    let generated = MacroLexer::machine().unwrap();
    let auto = compiled(Strategy::Auto);
    let dense = compiled(Strategy::Dense);
    let sparse = compiled(Strategy::Sparse);

    let mut group = c.benchmark_group("fsm_dispatch");
    group.throughput(Throughput::Elements(input.len() as u64));

    group.bench_function("run_macro", |b| {
        b.iter(|| *generated.run(black_box(&input)));
    });
    group.bench_function("run_compiled_auto", |b| {
        b.iter(|| *auto.run(black_box(&input)));
    });
    group.bench_function("run_compiled_dense", |b| {
        b.iter(|| *dense.run(black_box(&input)));
    });
    group.bench_function("run_compiled_sparse", |b| {
        b.iter(|| *sparse.run(black_box(&input)));
    });
    group.bench_function("run_interpreted", |b| {
        b.iter(|| {
            let mut state = *model.init();
            for token in black_box(&input) {
                state = *model.next_state(&state, token);
                if state == *model.exit() {
                    break;
                }
            }
            state
        });
    });
    group.bench_function("run_manual", |b| {
        b.iter(|| manual_run(black_box(&input)));
    });
    group.finish();

    let mut group = c.benchmark_group("fsm_compile");
    group.bench_function("compile_uncached", |b| {
        let compiler = Compiler::new();
        b.iter(|| compiler.compile_uncached(black_box(&model)).unwrap());
    });
    group.bench_function("compile_cached", |b| {
        let compiler = Compiler::new();
        b.iter(|| compiler.compile(black_box(&model)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
