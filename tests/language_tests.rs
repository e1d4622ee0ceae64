// Word level tests, each source is run in a fresh session.

use fable::runtime::data_structures::value::Value;
use fable::runtime::error::{ErrorKind, Result};
use fable::runtime::interpreter::fable_interpreter::FableInterpreter;
use fable::runtime::interpreter::{InterpreterStack, WordManagement};
use test_case::test_case;

fn eval_and_stack(source: &str) -> Result<Vec<i64>> {
    let mut interp = FableInterpreter::new();

    interp.evaluate(source)?;

    let stack = interp
        .stack()
        .iter()
        .map(|value| value.as_int().expect("integer result"))
        .collect();

    Ok(stack)
}

fn eval_and_output(source: &str) -> String {
    let mut interp = FableInterpreter::new();

    interp.evaluate(source).unwrap();
    interp.take_output()
}

fn eval_error(source: &str) -> ErrorKind {
    let mut interp = FableInterpreter::new();

    interp.evaluate(source).unwrap_err().kind().clone()
}

#[test_case("3 4 +", &[7]; "add")]
#[test_case("10 3 -", &[7]; "subtract")]
#[test_case("4 7 *", &[28]; "multiply")]
#[test_case("20 4 /", &[5]; "divide")]
#[test_case("-7 2 /", &[-4]; "divide floors")]
#[test_case("-7 2 MOD", &[1]; "mod takes divisor sign")]
#[test_case("13 5 /MOD", &[3, 2]; "div mod")]
#[test_case("912345678 34 100 */", &[310197530]; "mul div")]
#[test_case("5 NEGATE ABS", &[5]; "negate abs")]
#[test_case("3 9 MIN 3 9 MAX", &[3, 9]; "min max")]
#[test_case("7 1+ 1- 2+ 2- 2* 2/", &[7]; "increments")]
#[test_case("-7 2/", &[-4]; "halve floors")]
fn arithmetic(source: &str, expected: &[i64]) {
    assert_eq!(eval_and_stack(source).unwrap(), expected);
}

#[test_case("1 2 SWAP", &[2, 1]; "swap")]
#[test_case("1 2 OVER", &[1, 2, 1]; "over")]
#[test_case("1 2 3 ROT", &[2, 3, 1]; "rot")]
#[test_case("1 2 3 -ROT", &[3, 1, 2]; "minus rot")]
#[test_case("1 2 NIP", &[2]; "nip")]
#[test_case("1 2 TUCK", &[2, 1, 2]; "tuck")]
#[test_case("1 2 2DUP", &[1, 2, 1, 2]; "two dup")]
#[test_case("1 2 3 2DROP", &[1]; "two drop")]
#[test_case("1 2 3 4 2SWAP", &[3, 4, 1, 2]; "two swap")]
#[test_case("1 2 3 4 2OVER", &[1, 2, 3, 4, 1, 2]; "two over")]
#[test_case("1 2 3 DEPTH", &[1, 2, 3, 3]; "depth")]
#[test_case("10 20 30 2 PICK", &[10, 20, 30, 10]; "pick")]
#[test_case("10 20 30 2 ROLL", &[20, 30, 10]; "roll")]
#[test_case("1 2 3 CLEAR", &[]; "clear")]
#[test_case("0 ?DUP", &[0]; "query dup zero")]
#[test_case("5 ?DUP", &[5, 5]; "query dup non zero")]
#[test_case("5 >R 6 R>", &[6, 5]; "return stack round trip")]
#[test_case("5 >R R@ R>", &[5, 5]; "return stack fetch")]
fn stack_words(source: &str, expected: &[i64]) {
    assert_eq!(eval_and_stack(source).unwrap(), expected);
}

#[test_case("3 4 <", &[-1]; "less")]
#[test_case("3 4 >", &[0]; "greater")]
#[test_case("5 5 =", &[-1]; "equal")]
#[test_case("5 6 <>", &[-1]; "not equal")]
#[test_case("4 4 <= 4 3 >=", &[-1, -1]; "or equal")]
#[test_case("0 0= -3 0< 3 0> 0 0<>", &[-1, -1, -1, 0]; "zero comparisons")]
#[test_case("12 10 AND", &[8]; "and")]
#[test_case("12 10 OR", &[14]; "or")]
#[test_case("12 10 XOR", &[6]; "xor")]
#[test_case("0 INVERT", &[-1]; "invert")]
#[test_case("1 4 LSHIFT", &[16]; "left shift")]
#[test_case("-1 60 RSHIFT", &[15]; "logical right shift")]
#[test_case("TRUE FALSE OR", &[-1]; "flags")]
#[test_case("5 NOT 0 NOT", &[0, -1]; "not")]
fn comparison_and_logic(source: &str, expected: &[i64]) {
    assert_eq!(eval_and_stack(source).unwrap(), expected);
}

#[test_case("5 CONSTANT FIVE FIVE FIVE +", &[10]; "constant")]
#[test_case("VARIABLE X 42 X ! X @", &[42]; "variable")]
#[test_case("VARIABLE X 1 X ! 5 X +! X @", &[6]; "plus store")]
#[test_case("HERE 3 ALLOT HERE SWAP -", &[3]; "allot")]
#[test_case("4 CELLS", &[4]; "cells")]
fn memory_and_definitions(source: &str, expected: &[i64]) {
    assert_eq!(eval_and_stack(source).unwrap(), expected);
}

#[test_case(": SQUARE DUP * ; 5 SQUARE", &[25]; "colon definition")]
#[test_case(": square dup * ; 3 SQUARE", &[9]; "case insensitive")]
#[test_case(": FACT DUP 1 > IF DUP 1 - RECURSE * THEN ; 5 FACT", &[120]; "recursion")]
#[test_case(": FACT DUP 1 > IF DUP 1- RECURSE * THEN ; 6 FACT", &[720]; "recursion with decrement")]
#[test_case(": SIGN DUP 0< IF DROP -1 ELSE 0> IF 1 ELSE 0 THEN THEN ; -5 SIGN 0 SIGN 7 SIGN",
            &[-1, 0, 1]; "nested if else")]
#[test_case(": COUNTDOWN BEGIN DUP 1 - DUP 0= UNTIL ; 3 COUNTDOWN", &[3, 2, 1, 0]; "begin until")]
#[test_case(": SUM 0 SWAP BEGIN DUP 0> WHILE SWAP OVER + SWAP 1 - REPEAT DROP ; 4 SUM",
            &[10]; "begin while repeat")]
#[test_case(": TEN 0 10 0 DO 1+ LOOP ; TEN", &[10]; "do loop")]
#[test_case(": NESTED 3 0 DO 2 0 DO J I LOOP LOOP ; NESTED",
            &[0, 0, 0, 1, 1, 0, 1, 1, 2, 0, 2, 1]; "nested loops")]
#[test_case(": FIRST 10 0 DO I DUP 3 = IF LEAVE THEN DROP LOOP ; FIRST", &[3]; "leave")]
#[test_case(": EARLY 10 0 DO I 2 = IF I UNLOOP EXIT THEN LOOP 99 ; EARLY", &[2]; "exit from loop")]
#[test_case(": DOWN 0 10 DO I -2 +LOOP ; DOWN", &[10, 8, 6, 4, 2]; "negative step")]
#[test_case(": SKIP 0 0 ?DO 1 LOOP ; SKIP", &[]; "query do skips")]
#[test_case(": A 1 ; : B A ; : A 2 ; B A", &[1, 2]; "callers keep the old definition")]
#[test_case("1 ( a ( nested ) comment ) 2 \\ to the end of the line\n3", &[1, 2, 3]; "comments")]
fn compiled_words(source: &str, expected: &[i64]) {
    assert_eq!(eval_and_stack(source).unwrap(), expected);
}

#[test_case(": TEST 5 0 DO I . LOOP ; TEST", "0 1 2 3 4 "; "counted loop")]
#[test_case(": EVENS 0 10 DO I . 2 +LOOP ; EVENS", "0 2 4 6 8 "; "bounds in either order")]
#[test_case("2 CONSTANT STEP : EVENS 0 10 DO I . STEP +LOOP ; EVENS", "0 2 4 6 8 ";
            "constant step")]
#[test_case(": EVENS 0 10 DO I . 1 1 + +LOOP ; EVENS", "0 2 4 6 8 "; "computed step")]
#[test_case(": ODDS 10 1 DO I . 2 +LOOP ; ODDS", "1 3 5 7 9 "; "ordered bounds")]
#[test_case(".\" Hello\"", "Hello"; "print string")]
#[test_case(": GREET .\" Hi\" CR ; GREET", "Hi\n"; "compiled print string")]
#[test_case("S\" abc\" TYPE", "abc"; "push string")]
#[test_case("65 EMIT 3 SPACES 66 EMIT SPACE", "A   B "; "characters")]
#[test_case("1 2 .S", "<2> 1 2 "; "stack dump")]
#[test_case(".S", "<empty> "; "empty stack dump")]
#[test_case(".( now)", "now"; "display string")]
#[test_case("1.5 2 + .", "3.5 "; "float promotion")]
#[test_case("TRUE .", "-1 "; "flag prints as number")]
fn output(source: &str, expected: &str) {
    assert_eq!(eval_and_output(source), expected);
}

#[test]
fn underflow_reports_word_and_counts() {
    assert_eq!(
        eval_error("1 +"),
        ErrorKind::StackUnderflow {
            word: "+".to_string(),
            needed: 2,
            available: 1
        }
    );

    assert_eq!(
        eval_error("DROP"),
        ErrorKind::StackUnderflow {
            word: "DROP".to_string(),
            needed: 1,
            available: 0
        }
    );
}

#[test]
fn division_by_zero() {
    assert_eq!(
        eval_error("5 0 /"),
        ErrorKind::DivisionByZero {
            dividend: Value::Int(5)
        }
    );
    assert!(matches!(eval_error("5 0 MOD"), ErrorKind::DivisionByZero { .. }));
}

#[test]
fn unknown_words_get_suggestions() {
    match eval_error("DUPP") {
        ErrorKind::UnknownWord { name, suggestions } => {
            assert_eq!(name, "DUPP");
            assert!(suggestions.contains(&"DUP".to_string()));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test_case("IF", "IF"; "if")]
#[test_case("1 2 DO", "DO"; "do")]
#[test_case(";", ";"; "semicolon")]
fn control_words_outside_definitions(source: &str, word: &str) {
    assert_eq!(
        eval_error(source),
        ErrorKind::CompileOnly {
            word: word.to_string()
        }
    );
}

#[test_case(": BAD IF ;", "IF", "THEN"; "unclosed if")]
#[test_case(": BAD THEN ;", "THEN", "IF"; "orphan then")]
#[test_case(": BAD BEGIN 1 IF UNTIL ;", "IF", "THEN"; "crossed constructs")]
#[test_case(": BAD 1 2 DO ;", "DO", "LOOP"; "unclosed do")]
#[test_case(": BAD I ;", "I", "DO"; "index outside loop")]
#[test_case(": BAD 1 2", ":", ";"; "source ends inside definition")]
#[test_case(": BAD : ;", ":", ";"; "nested colon")]
fn control_structure_mismatches(source: &str, opener: &str, expected: &str) {
    assert_eq!(
        eval_error(source),
        ErrorKind::ControlStructureMismatch {
            opener: opener.to_string(),
            expected: expected.to_string()
        }
    );
}

#[test]
fn type_mismatch_names_the_kinds() {
    assert_eq!(
        eval_error("S\" x\" DROP 1 +"),
        ErrorKind::TypeMismatch {
            word: "+".to_string(),
            expected: "number".to_string(),
            found: "string".to_string()
        }
    );
}

#[test]
fn bad_addresses_are_rejected() {
    assert_eq!(
        eval_error("99 @"),
        ErrorKind::InvalidAddress {
            word: "@".to_string(),
            address: 99
        }
    );
}

#[test]
fn allot_beyond_memory_fails() {
    let mut interp = FableInterpreter::new();
    let here = interp.cells().here();

    assert!(matches!(
        interp.evaluate("9223372036854775807 ALLOT").unwrap_err().kind(),
        ErrorKind::MemoryExhausted { word, requested: 9223372036854775807, .. } if word == "ALLOT"
    ));
    assert_eq!(interp.cells().here(), here);

    interp.evaluate("VARIABLE X 5 X ! X @").unwrap();
    assert_eq!(interp.stack(), &vec![Value::Int(5)]);
}

#[test]
fn failed_definitions_leave_no_trace() {
    let mut interp = FableInterpreter::new();
    let before = interp.dictionary().len();

    assert!(interp.evaluate(": BAD IF ;").is_err());
    assert_eq!(interp.dictionary().len(), before);
    assert!(!interp.dictionary().contains("BAD"));

    assert!(interp.evaluate(": HALF 1 2").is_err());
    assert_eq!(interp.dictionary().len(), before);
}

#[test]
fn redefinition_shadows_without_removing() {
    let mut interp = FableInterpreter::new();
    let before = interp.dictionary().len();

    interp.evaluate(": FOO 1 ; : FOO 2 ; FOO").unwrap();

    assert_eq!(interp.stack(), &vec![Value::Int(2)]);
    assert_eq!(interp.dictionary().count_named("FOO"), 2);
    assert_eq!(interp.dictionary().len(), before + 2);
}

#[test]
fn forget_removes_later_words_too() {
    let mut interp = FableInterpreter::new();

    interp.evaluate(": A 1 ; : B 2 ; FORGET A").unwrap();

    assert!(!interp.dictionary().contains("A"));
    assert!(!interp.dictionary().contains("B"));
    assert!(matches!(
        interp.evaluate("FORGET DUP").unwrap_err().kind(),
        ErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn immediate_words_run_while_compiling() {
    let mut interp = FableInterpreter::new();

    interp.evaluate(": MARK 42 ; IMMEDIATE : USER MARK ;").unwrap();

    assert_eq!(interp.stack(), &vec![Value::Int(42)]);

    interp.evaluate("CLEAR USER").unwrap();
    assert!(interp.stack().is_empty());
}

#[test]
fn immediate_never_changes_built_in_words() {
    let mut interp = FableInterpreter::new();
    let immediates = |interp: &FableInterpreter| {
        interp
            .dictionary()
            .names()
            .iter()
            .filter_map(|name| interp.dictionary().try_get(name))
            .filter(|entry| entry.is_immediate())
            .count()
    };
    let before = immediates(&interp);

    assert!(matches!(
        interp.evaluate("IMMEDIATE").unwrap_err().kind(),
        ErrorKind::TypeMismatch { word, .. } if word == "IMMEDIATE"
    ));
    assert_eq!(immediates(&interp), before);

    interp.evaluate("1 2 : LATER RESET ;").unwrap();
    assert_eq!(interp.stack(), &vec![Value::Int(1), Value::Int(2)]);

    interp.evaluate(": NOW 3 ; IMMEDIATE").unwrap();
    assert!(interp.dictionary().try_get("NOW").unwrap().is_immediate());
    assert_eq!(immediates(&interp), before + 1);
}

#[test]
fn errors_keep_the_data_stack() {
    let mut interp = FableInterpreter::new();

    assert!(interp.evaluate("1 +").is_err());
    interp.evaluate("2 +").unwrap();

    assert_eq!(interp.stack(), &vec![Value::Int(3)]);
}

#[test]
fn see_and_words_list_definitions() {
    let mut interp = FableInterpreter::new();

    interp.evaluate(": SQUARE DUP * ; SEE SQUARE").unwrap();

    let listing = interp.take_output();
    assert!(listing.starts_with(": SQUARE\n"));
    assert!(listing.contains("( DUP )"));

    interp.evaluate("WORDS").unwrap();

    let words = interp.take_output();
    assert!(words.starts_with("DUP"));
    assert!(words.contains("SQUARE"));
}
