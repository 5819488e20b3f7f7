use fsmgen::{Compiler, EXIT_ID, INIT_ID, Machine, Model, ModelBuilder, Token, machine};

#[machine(state = i32, token = i32, init = 0, exit = -1)]
#[transition(from = 0, to = 1, on = 1)]
#[transition(from = 1, to = 2, on = 2)]
#[transition(from = 2, to = 3, on = 3)]
#[transition(from = 3, to = 4, on = 4)]
pub struct Counter;

#[machine(state = u8, token = char, init = 0, exit = 99)]
#[transition(from = 0, to = 1, on = 'a'..='z')]
#[transition(from = 0, to = 2, on = '0'..='9')]
#[transition(from = 0, to = 3, on = ['x', '_'])]
#[transition(from = 1, to = 1, on = 'a'..='z')]
#[transition(from = 1, to = 2, on = '0'..='9')]
#[transition(from = 1, to = 4, on = ' ')]
#[transition(from = 2, to = 2, on = '0'..='9')]
#[transition(from = 2, to = 4)]
#[transition(from = 3, to = 1, on = 'a'..='z')]
#[transition(from = 4, to = 99, on = '.')]
#[transition(from = 4, to = 1)]
#[derive(Debug, Clone, Copy)]
pub struct Lexer;

#[machine(state = &'static str, token = &str, init = "start", exit = "stop")]
#[transition(from = "start", to = "upper", on = "Aa")]
#[transition(from = "start", to = "lower", on = "BB")]
#[transition(from = "upper", to = "lower", on = ["BB", "cc"])]
#[transition(from = "lower", to = "upper", on = "Aa")]
#[transition(from = "lower", to = "stop")]
pub struct Words;

#[machine(state = u8, token = i64, init = 0, exit = 9)]
#[transition(from = 0, to = 1, on = 1)]
#[transition(from = 0, to = 2, on = 4294967296)]
#[transition(from = 1, to = 9)]
#[transition(from = 2, to = 9)]
pub struct Wide;

#[machine(state = u8, token = u8, init = 0, exit = 9, strategy = "dense")]
#[transition(from = 0, to = 1, on = [1, 3, 5])]
#[transition(from = 0, to = 2, on = [2, 4, 6])]
#[transition(from = 1, to = 2, on = [2, 4, 6])]
#[transition(from = 2, to = 1, on = [1, 3, 5])]
#[transition(from = 1, to = 9, on = 0)]
pub struct Parity;

fn lexer_model() -> Model<u8, char> {
    let mut builder = ModelBuilder::new();
    builder.set_init(0).unwrap().set_exit(99).unwrap();
    for state in 1..=4 {
        builder.add_state(state).unwrap();
    }
    builder
        .add_transition(0, 1, Some(Token::range('a', 'z').unwrap()))
        .unwrap()
        .add_transition(0, 2, Some(Token::range('0', '9').unwrap()))
        .unwrap()
        .add_transition(0, 3, Some(Token::set(['x', '_'])))
        .unwrap()
        .add_transition(1, 1, Some(Token::range('a', 'z').unwrap()))
        .unwrap()
        .add_transition(1, 2, Some(Token::range('0', '9').unwrap()))
        .unwrap()
        .add_transition(1, 4, Some(Token::single(' ')))
        .unwrap()
        .add_transition(2, 2, Some(Token::range('0', '9').unwrap()))
        .unwrap()
        .add_transition(2, 4, None)
        .unwrap()
        .add_transition(3, 1, Some(Token::range('a', 'z').unwrap()))
        .unwrap()
        .add_transition(4, 99, Some(Token::single('.')))
        .unwrap()
        .add_transition(4, 1, None)
        .unwrap();
    builder.build().unwrap()
}

const LEXER_INPUTS: &[&str] = &[
    "",
    "a",
    "x",
    "xa",
    "x_",
    "_",
    "abc",
    "abc1",
    "42",
    "42a",
    "ab c.",
    "ab 1",
    "z9 .",
    "0 q",
    "A",
    "a.",
    "{",
    "`",
];

#[test]
fn test_generated_constants() {
    assert_eq!(Counter::INIT, INIT_ID);
    assert_eq!(Counter::EXIT, EXIT_ID);
    assert_eq!(Counter::states(), vec![-1, 0, 1, 2, 3, 4]);
    assert_eq!(Lexer::states(), vec![99, 0, 1, 2, 3, 4]);
    assert_eq!(Words::states(), vec!["stop", "start", "upper", "lower"]);
    assert!(!Counter::FINGERPRINT.is_empty());
}

#[test]
fn test_generated_transit() {
    assert_eq!(Counter::transit(Counter::INIT, &1), 2);
    assert_eq!(Counter::transit(2, &2), 3);
    assert_eq!(Counter::transit(2, &3), Counter::EXIT);
    assert_eq!(Counter::transit(Counter::EXIT, &1), Counter::EXIT);
    assert_eq!(Counter::transit(42, &1), Counter::EXIT);
}

#[test]
fn test_generated_machine_runs() {
    let machine = Counter::machine().unwrap();
    assert_eq!(*machine.run([1, 2, 3, 4]), 4);
    assert_eq!(*machine.run([1, 2]), 2);
    assert_eq!(*machine.run([2]), -1);
    assert_eq!(*machine.step(&1), 1);
    assert_eq!(*machine.step(&3), -1);
}

#[test]
fn test_generated_item_keeps_its_attributes() {
    let lexer = Lexer;
    let copy = lexer;
    assert_eq!(format!("{copy:?}"), "Lexer");
}

#[test]
fn test_macro_agrees_with_runtime_compilation() {
    let model = lexer_model();
    let generated = Lexer::machine().unwrap();
    let compiled: Machine<u8, char> = Compiler::new().compile(&model).unwrap().machine();

    assert_eq!(
        generated.dispatcher().translation().values(),
        compiled.dispatcher().translation().values()
    );
    for input in LEXER_INPUTS {
        let expected = input
            .chars()
            .try_fold(0u8, |state, token| match *model.next_state(&state, &token) {
                99 => None,
                next => Some(next),
            })
            .unwrap_or(99);
        assert_eq!(*generated.run(input.chars()), expected, "generated on {input:?}");
        assert_eq!(*compiled.run(input.chars()), expected, "compiled on {input:?}");
        assert_eq!(generated.stamp(input.chars()), compiled.stamp(input.chars()), "stamp on {input:?}");
    }
}

#[test]
fn test_explicit_value_beats_range() {
    let machine = Lexer::machine().unwrap();
    assert_eq!(*machine.run("x".chars()), 3);
    assert_eq!(*machine.run("y".chars()), 1);
    assert_eq!(*machine.run("xa".chars()), 1);
    assert_eq!(*machine.run("xx".chars()), 1);
    assert_eq!(*machine.run("x_".chars()), 99);
}

#[test]
fn test_colliding_strings() {
    assert_eq!(fsmgen::token::str_hash("Aa"), fsmgen::token::str_hash("BB"));

    let machine = Words::machine().unwrap();
    assert_eq!(*machine.run(["Aa"]), "upper");
    assert_eq!(*machine.run(["BB"]), "lower");
    assert_eq!(*machine.run(["Aa", "BB", "Aa"]), "upper");
    assert_eq!(*machine.run(["Aa", "cc"]), "lower");
    assert_eq!(*machine.run(["BB", "zz"]), "stop");
    assert_eq!(*machine.run(["Ab"]), "stop");
}

#[test]
fn test_colliding_wide_integers() {
    use fsmgen::TokenValue;
    assert_eq!(1i64.switch_hash(), (1i64 << 32).switch_hash());

    assert_eq!(Wide::transit(Wide::INIT, &1), 2);
    assert_eq!(Wide::transit(Wide::INIT, &(1i64 << 32)), 3);
    assert_eq!(Wide::transit(Wide::INIT, &2), Wide::EXIT);
}

#[test]
fn test_forced_dense_selector() {
    let machine = Parity::machine().unwrap();
    assert_eq!(*machine.run([1, 2, 3]), 1);
    assert_eq!(*machine.run([1, 2, 1, 2]), 2);
    assert_eq!(*machine.run([2, 1, 0]), 9);
    assert_eq!(*machine.run([2, 2]), 9);
    assert_eq!(*machine.run([7]), 9);
}

#[test]
fn test_generated_dispatchers_are_independent() {
    let first = Counter::dispatcher().unwrap();
    let second = Counter::dispatcher().unwrap();
    assert!(!first.ptr_eq(&second));
    assert!(first.fingerprint().is_none());
}
