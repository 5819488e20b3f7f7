use std::collections::HashMap;

use fsmgen::{Compiler, CompilerConfig, Model, ModelBuilder, SwitchMap, Token};
use proptest::prelude::*;

const STATES: i32 = 6;

/// A model over states `0..STATES` plus a sink. Every state has a few
/// explicit edges, one range edge into the sink and sometimes a fallback.
/// Explicit edges never target the initial state, and the `i -> i + 1` spine
/// keeps every state reachable.
fn random_model(edges: &[(i32, i32, i16)], fallbacks: &[Option<i32>]) -> Model<i32, i16> {
    let sink = STATES;
    let mut builder = ModelBuilder::new();
    builder.set_init(0).unwrap().set_exit(-1).unwrap();
    for state in 1..=sink {
        builder.add_state(state).unwrap();
    }

    let mut explicit: HashMap<(i32, i16), i32> = HashMap::new();
    for state in 0..STATES - 1 {
        explicit.insert((state, 1000 + state as i16), state + 1);
    }
    for &(from, to, token) in edges {
        let to = if to == 0 { -1 } else { to };
        explicit.entry((from, token)).or_insert(to);
    }

    let mut grouped: HashMap<(i32, i32), Vec<i16>> = HashMap::new();
    for ((from, token), to) in explicit {
        grouped.entry((from, to)).or_default().push(token);
    }
    for ((from, to), tokens) in grouped {
        builder.add_transition(from, to, Some(Token::set(tokens))).unwrap();
    }

    // one range per state, above every explicit token
    for state in 0..=sink {
        let start = 2000 + 10 * state as i16;
        let target = if state == sink { 1 } else { sink };
        builder
            .add_transition(state, target, Some(Token::range(start, start + 5).unwrap()))
            .unwrap();
    }
    for (state, fallback) in fallbacks.iter().enumerate() {
        if let Some(target) = fallback {
            let target = if *target == 0 { -1 } else { *target };
            builder.add_transition(state as i32, target, None).unwrap();
        }
    }
    builder.build().unwrap()
}

fn edges() -> impl Strategy<Value = Vec<(i32, i32, i16)>> {
    prop::collection::vec((0..STATES, 0..STATES, -20i16..40), 0..40)
}

fn fallbacks() -> impl Strategy<Value = Vec<Option<i32>>> {
    prop::collection::vec(prop::option::of(0..STATES), STATES as usize)
}

fn tokens() -> impl Strategy<Value = Vec<i16>> {
    let token = prop_oneof![-25i16..45, 1000i16..1006, 1995i16..2070];
    prop::collection::vec(token, 0..30)
}

/// Reference semantics: fold `next_state` from init, stopping at exit.
fn interpret(model: &Model<i32, i16>, tokens: &[i16]) -> i32 {
    let mut state = *model.init();
    for token in tokens {
        state = *model.next_state(&state, token);
        if state == *model.exit() {
            break;
        }
    }
    state
}

proptest! {
    #[test]
    fn compiled_run_matches_interpreter(edges in edges(), fallbacks in fallbacks(), tokens in tokens()) {
        let model = random_model(&edges, &fallbacks);
        let machine = Compiler::new().compile(&model).unwrap().machine();
        prop_assert_eq!(*machine.run(&tokens), interpret(&model, &tokens));
    }

    #[test]
    fn step_matches_run(edges in edges(), fallbacks in fallbacks(), tokens in tokens()) {
        let model = random_model(&edges, &fallbacks);
        let machine = Compiler::new().compile(&model).unwrap().machine();
        for token in &tokens {
            machine.step(token);
        }
        prop_assert_eq!(machine.state(), machine.run(&tokens));
    }

    #[test]
    fn stamp_is_rolling_hash_of_visited_ids(edges in edges(), fallbacks in fallbacks(), tokens in tokens()) {
        let model = random_model(&edges, &fallbacks);
        let dispatcher = Compiler::new().compile(&model).unwrap();
        let machine = dispatcher.machine();

        let mut expected = 1i64;
        let mut state = dispatcher.init_id();
        for token in &tokens {
            state = dispatcher.transit(state, token);
            if state == dispatcher.exit_id() {
                expected = -1;
                break;
            }
            expected = expected.wrapping_mul(31).wrapping_add(i64::from(state));
        }
        prop_assert_eq!(machine.stamp(&tokens), expected);
    }

    #[test]
    fn strategy_does_not_change_behavior(edges in edges(), fallbacks in fallbacks(), tokens in tokens(), delta in 1u32..64) {
        let model = random_model(&edges, &fallbacks);
        let stamps: Vec<i64> = [fsmgen::Strategy::Auto, fsmgen::Strategy::Dense, fsmgen::Strategy::Sparse]
            .into_iter()
            .map(|strategy| {
                let config = CompilerConfig::default().with_strategy(strategy).with_max_delta(delta);
                Compiler::new().with_config(config).compile_uncached(&model).unwrap().machine().stamp(&tokens)
            })
            .collect();
        prop_assert_eq!(stamps[0], stamps[1]);
        prop_assert_eq!(stamps[1], stamps[2]);
    }

    #[test]
    fn dense_and_sparse_maps_agree(entries in prop::collection::vec((-300i32..300, 0u32..8), 1..50), probes in prop::collection::vec(-320i32..320, 0..50)) {
        let dense = SwitchMap::dense(entries.clone()).unwrap();
        let sparse = SwitchMap::sparse(entries.clone()).unwrap();
        let oracle: HashMap<i32, u32> = entries.iter().copied().collect();

        for probe in probes.iter().chain(entries.iter().map(|(key, _)| key)) {
            prop_assert_eq!(dense.find(probe), oracle.get(probe));
            prop_assert_eq!(sparse.find(probe), oracle.get(probe));
        }
    }

    #[test]
    fn colliding_keys_resolve_exactly(low in 0i64..1000, high in 1i64..1000) {
        let shifted = (high << 32) | (low ^ high);
        let entries = vec![(low, 1u32), (shifted, 2u32)];
        for map in [SwitchMap::dense(entries.clone()).unwrap(), SwitchMap::sparse(entries).unwrap()] {
            prop_assert_eq!(map.find(&low), Some(&1));
            prop_assert_eq!(map.find(&shifted), Some(&2));
        }
    }
}
