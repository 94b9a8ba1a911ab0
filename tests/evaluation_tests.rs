// Evaluation tests: whole programs run against a scripted input and a
// captured output, checked by final stack, printed text and error kind.

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;
use test_case::test_case;
use tforth::{interpret, Environment, ErrorKind, Evaluator, ForthError, Value, Vocabulary};

/// Output sink that stays readable after the environment takes ownership.
#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Outcome {
    stack: Vec<Value>,
    output: String,
}

fn run_with_input(source: &str, input: &str) -> Result<Outcome, ForthError> {
    let captured = Captured::default();
    let environment = Environment::with_io(
        Box::new(Cursor::new(input.as_bytes().to_vec())),
        Box::new(captured.clone()),
    );
    let mut evaluator = Evaluator::new(environment);
    interpret(source, &Vocabulary::default(), &mut evaluator)?;

    let output = String::from_utf8_lossy(&captured.0.borrow()).into_owned();
    Ok(Outcome {
        stack: evaluator.environment().stack().to_vec(),
        output,
    })
}

fn run(source: &str) -> Outcome {
    match run_with_input(source, "") {
        Ok(outcome) => outcome,
        Err(error) => panic!("program failed with {:?}: {}", error.kind, error.message),
    }
}

fn run_err(source: &str) -> ForthError {
    match run_with_input(source, "") {
        Ok(outcome) => panic!("program succeeded with stack {:?}", outcome.stack),
        Err(error) => error,
    }
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

#[test]
fn integer_addition() {
    assert_eq!(run("3 4 +").stack, vec![Value::Int(7)]);
}

#[test]
fn mixed_arithmetic_promotes_to_float() {
    assert_eq!(run("3.0 4 +").stack, vec![Value::Float(7.0)]);
    assert_eq!(run("7 2.0 /").stack, vec![Value::Float(3.5)]);
}

#[test_case("10 3 -", 7 ; "subtraction")]
#[test_case("10 4 /", 2 ; "division")]
#[test_case("10 4 %", 2 ; "remainder")]
#[test_case("-7 2 /", -3 ; "division truncates toward zero")]
#[test_case("1 4 lshift", 16 ; "left shift")]
#[test_case("12 10 and", 8 ; "bitwise and")]
#[test_case("0 invert", -1 ; "invert")]
#[test_case("3 4 <", 1 ; "less than")]
#[test_case("4 4 <", 0 ; "not less than")]
#[test_case("2.5 2.5 =", 1 ; "float equality")]
#[test_case("9223372036854775807 1 +", i64::MIN ; "wrapping overflow")]
fn binary_operand_order(source: &str, expected: i64) {
    assert_eq!(run(source).stack, vec![Value::Int(expected)]);
}

#[test_case("1 2 3 rot", &[2, 3, 1] ; "rot")]
#[test_case("1 2 over", &[1, 2, 1] ; "over")]
#[test_case("1 2 swap", &[2, 1] ; "swap")]
#[test_case("1 2 nip", &[2] ; "nip")]
#[test_case("1 2 tuck", &[2, 1, 2] ; "tuck")]
#[test_case("1 2 3 2 pick", &[1, 2, 3, 1] ; "pick")]
#[test_case("1 2 3 0 pick", &[1, 2, 3, 3] ; "pick top")]
#[test_case("1 2 3 2 roll", &[2, 3, 1] ; "roll")]
fn stack_words(source: &str, expected: &[i64]) {
    assert_eq!(run(source).stack, ints(expected));
}

#[test]
fn counted_loop_runs_from_start_to_limit() {
    let outcome = run("1 5 0 DO i . LOOP");
    assert_eq!(outcome.output, "0 1 2 3 4 ");
    assert!(outcome.stack.is_empty());
}

#[test]
fn counted_loop_with_negative_step() {
    assert_eq!(run("-1 0 5 DO i LOOP").stack, ints(&[5, 4, 3, 2, 1]));
}

#[test]
fn counted_loop_with_zero_step_never_runs() {
    assert_eq!(run("0 5 0 DO i LOOP").stack, ints(&[]));
}

#[test]
fn inner_loop_restores_outer_index() {
    assert_eq!(run("1 2 0 DO 1 3 0 DO LOOP i LOOP").stack, ints(&[0, 1]));
}

#[test]
fn leave_exits_a_while_loop() {
    let outcome = run(
        "VARIABLE N 0 N !
         BEGIN N @ 10 < WHILE
           N @ 1 + N !
           N @ 3 = IF leave ENDIF
           99 .
         REPEAT
         N @",
    );
    assert_eq!(outcome.output, "99 99 ");
    assert_eq!(outcome.stack, ints(&[3]));
}

#[test]
fn continue_reevaluates_the_condition() {
    let outcome = run(
        "VARIABLE N 0 N !
         BEGIN N @ 5 < WHILE
           N @ 1 + N !
           N @ 2 % 0 = IF continue ENDIF
           N @ .
         REPEAT",
    );
    assert_eq!(outcome.output, "1 3 5 ");
}

#[test]
fn leave_only_exits_the_innermost_loop() {
    let outcome = run("1 3 0 DO 1 10 0 DO i 2 = IF leave ENDIF i . LOOP LOOP");
    assert_eq!(outcome.output, "0 1 0 1 0 1 ");
}

#[test]
fn return_unwinds_nested_loops() {
    let outcome = run(
        ": deep
           1 2 0 DO
             BEGIN 1 WHILE
               1 3 0 DO 42 return LOOP
             REPEAT
           LOOP
           7 ;
         deep 100",
    );
    assert_eq!(outcome.stack, ints(&[42, 100]));
}

#[test]
fn continue_advances_a_counted_loop() {
    let outcome = run("1 5 0 DO i 2 % 0 = IF continue ENDIF i . LOOP");
    assert_eq!(outcome.output, "1 3 ");
    assert!(outcome.stack.is_empty());
}

#[test]
fn return_leaves_a_switch_inside_a_function() {
    let outcome = run(": choose CASE 1 OF 10 return ENDOF ENDCASE 99 ; 1 choose 2 choose");
    assert_eq!(outcome.stack, ints(&[10, 99]));
}

#[test]
fn deep_recursion_completes() {
    let outcome = run(": down dup IF 1 - down ENDIF ; 5000 down .");
    assert_eq!(outcome.output, "0 ");
}

#[test]
fn call_depth_error_points_at_the_call() {
    let error = run_err(": forever forever ;\nforever");
    assert_eq!(error.kind, ErrorKind::CallDepth);
    assert_eq!(error.span.map(|s| s.row), Some(1));
}

#[test]
fn return_does_not_escape_the_caller() {
    let outcome = run(": inner 1 return 2 ; : outer inner 3 ; outer");
    assert_eq!(outcome.stack, ints(&[1, 3]));
}

#[test]
fn functions_may_be_called_before_their_definition() {
    assert_eq!(run(": a b 1 + ; : b 5 ; a").stack, ints(&[6]));
}

#[test]
fn recursion() {
    let outcome = run(": fact dup 1 > IF dup 1 - fact * ENDIF ; 5 fact");
    assert_eq!(outcome.stack, ints(&[120]));
}

#[test]
fn if_else_selects_a_branch() {
    assert_eq!(run("0 IF 1 ELSE 2 ENDIF").stack, ints(&[2]));
    assert_eq!(run("-3 IF 1 ELSE 2 ENDIF").stack, ints(&[1]));
}

#[test]
fn switch_runs_the_matching_case() {
    let source = "CASE 1 OF 10 ENDOF 2 OF 20 ENDOF -1 OF 30 ENDOF ENDCASE";
    assert_eq!(run(&format!("2 {}", source)).stack, ints(&[20]));
    assert_eq!(run(&format!("-1 {}", source)).stack, ints(&[30]));
    assert_eq!(run(&format!("5 {}", source)).stack, ints(&[]));
}

#[test]
fn cell_array_store_and_fetch() {
    let outcome = run("CREATE ARR 10 cells allot 42 ARR 3 cells + ! ARR 3 cells + @ ARR 2 cells + @");
    assert_eq!(outcome.stack, ints(&[42, 0]));
}

#[test]
fn float_array_store_and_fetch() {
    let outcome = run("CREATE F 4 floats allot 2.5 F 2 floats + f! F 2 floats + f@");
    assert_eq!(outcome.stack, vec![Value::Float(2.5)]);
}

#[test]
fn char_array_store_and_fetch() {
    let outcome = run("CREATE C 3 chars allot 65 C 1 chars + c! C 1 chars + c@");
    assert_eq!(outcome.stack, ints(&[65]));
}

#[test]
fn string_words() {
    assert_eq!(run("s\" hi\" type").output, " hi");
    assert_eq!(run("s\"ab\" s\"cd\" s+ type").output, "abcd");
    assert_eq!(run("s\"ab\" s\"ab\" s=").stack, ints(&[1]));
    assert_eq!(run("s\"ab\" s\"ba\" s=").stack, ints(&[0]));
}

#[test]
fn emit_writes_characters() {
    assert_eq!(run("72 emit 105 emit").output, "Hi");
}

#[test]
fn print_stack_leaves_the_stack_alone() {
    let outcome = run("1 2.5 .s");
    assert_eq!(outcome.output, "1 2.5 <2>\n");
    assert_eq!(outcome.stack, vec![Value::Int(1), Value::Float(2.5)]);
}

#[test]
fn print_shows_whole_floats_with_a_fraction() {
    assert_eq!(run("3.0 4 + .").output, "7.0 ");
}

#[test]
fn conversions() {
    assert_eq!(run("3.9 tocell").stack, ints(&[3]));
    assert_eq!(run("3 tofloat").stack, vec![Value::Float(3.0)]);
}

#[test]
fn input_words_read_whitespace_separated_tokens() {
    let outcome = match run_with_input("input finput sinput type", "12 3.5\n  word\n") {
        Ok(outcome) => outcome,
        Err(error) => panic!("program failed: {}", error.message),
    };
    assert_eq!(outcome.stack, vec![Value::Int(12), Value::Float(3.5)]);
    assert_eq!(outcome.output, "word");
}

#[test]
fn malformed_input_is_reported() {
    let error = run_with_input("input", "twelve").err();
    assert_eq!(error.map(|e| e.kind), Some(ErrorKind::InvalidInput));
}

#[test]
fn exhausted_input_is_reported() {
    let error = run_with_input("input", "").err();
    assert_eq!(error.map(|e| e.kind), Some(ErrorKind::InvalidInput));
}

#[test_case("+", ErrorKind::StackUnderflow ; "empty stack")]
#[test_case("1 +", ErrorKind::StackUnderflow ; "one operand")]
#[test_case("IF ENDIF", ErrorKind::StackUnderflow ; "if needs a flag")]
#[test_case("1 5 pick", ErrorKind::PickOutOfRange ; "pick too deep")]
#[test_case("1 -1 pick", ErrorKind::PickOutOfRange ; "negative pick")]
#[test_case("1 2 5 roll", ErrorKind::PickOutOfRange ; "roll too deep")]
#[test_case("1 0 /", ErrorKind::DivisionByZero ; "integer division")]
#[test_case("1 0 %", ErrorKind::DivisionByZero ; "integer remainder")]
#[test_case("1 3 0 DO VARIABLE V LOOP", ErrorKind::DuplicateAllocation ; "declaration runs twice")]
#[test_case("0 @", ErrorKind::InvalidAddress ; "null fetch")]
#[test_case("VARIABLE X 5 X 8 + !", ErrorKind::InvalidAddress ; "store past the end")]
#[test_case("CREATE A 9223372036854775807 cells allot", ErrorKind::AllocationFailed ; "array size overflows")]
#[test_case("CREATE A 2000000000 chars allot", ErrorKind::AllocationFailed ; "array larger than the arena")]
#[test_case(": forever forever ; forever", ErrorKind::CallDepth ; "unbounded recursion")]
#[test_case("allot", ErrorKind::UnknownWord ; "operator without behaviour")]
#[test_case(": f i ; f", ErrorKind::UnknownWord ; "loop index outside a loop")]
fn runtime_errors(source: &str, kind: ErrorKind) {
    assert_eq!(run_err(source).kind, kind);
}

#[test]
fn runtime_errors_point_at_the_failing_word() {
    let error = run_err("1 2\n  +\n  +");
    assert_eq!(error.kind, ErrorKind::StackUnderflow);
    let span = error.span.map(|s| (s.row, s.column));
    assert_eq!(span, Some((3, 3)));
}

#[test]
fn float_division_by_zero_is_infinite() {
    assert_eq!(run("1.0 0 /").stack, vec![Value::Float(f64::INFINITY)]);
}

#[test]
fn nothing_runs_when_analysis_fails() {
    let captured = Captured::default();
    let environment = Environment::with_io(Box::new(Cursor::new(Vec::new())), Box::new(captured.clone()));
    let mut evaluator = Evaluator::new(environment);

    let result = interpret("1 . leave", &Vocabulary::default(), &mut evaluator);
    assert_eq!(result.err().map(|e| e.kind), Some(ErrorKind::NotInLoop));
    assert!(captured.0.borrow().is_empty());
    assert!(evaluator.environment().stack().is_empty());
}

#[test]
fn comments_are_ignored() {
    let outcome = run("1 ( push two ( nested ) ) 2 + \\ add them\n3 *");
    assert_eq!(outcome.stack, ints(&[9]));
}
