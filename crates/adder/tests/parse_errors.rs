//! Error surfaces: syntax failures, runtime error kinds, resource limits.

use adder::{
    ExcType, Exception, LimitedTracker, NoPrint, NoLimitTracker, Object, ResourceLimits, Runner,
};

fn parse_err(code: &str) -> Exception {
    Runner::new(code.to_owned(), "test.adder").unwrap_err()
}

fn run_err(code: &str) -> Exception {
    let runner = Runner::new(code.to_owned(), "test.adder").unwrap();
    runner.run(NoLimitTracker, &mut NoPrint).unwrap_err()
}

#[test]
fn syntax_errors_carry_location() {
    let err = parse_err("x = (1 +");
    assert_eq!(err.exc_type(), ExcType::SyntaxError);
    assert!(err.loc().is_some());

    let err = parse_err("def f(:\n    pass");
    assert_eq!(err.exc_type(), ExcType::SyntaxError);

    let err = parse_err("1 +* 2");
    assert_eq!(err.exc_type(), ExcType::SyntaxError);
}

#[test]
fn indentation_errors() {
    let err = parse_err("if x:\n    a = 1\n  b = 2");
    assert_eq!(err.exc_type(), ExcType::IndentationError);
    // IndentationError is a SyntaxError subclass for except purposes
    assert!(ExcType::IndentationError.is_subclass_of(ExcType::SyntaxError));
}

#[test]
fn mixed_tabs_and_spaces_rejected() {
    let err = parse_err("if x:\n\ta = 1\n        b = 2\n\tc = 3");
    assert_eq!(err.exc_type(), ExcType::IndentationError);
}

#[test]
fn unterminated_string() {
    let err = parse_err("x = 'oops");
    assert_eq!(err.exc_type(), ExcType::SyntaxError);
}

#[test]
fn assignment_to_literal_rejected() {
    let err = parse_err("1 = x");
    assert_eq!(err.exc_type(), ExcType::SyntaxError);
}

#[test]
fn runtime_error_kinds() {
    assert_eq!(run_err("missing_name").exc_type(), ExcType::NameError);
    assert_eq!(run_err("1 + 'x'").exc_type(), ExcType::TypeError);
    assert_eq!(run_err("[1, 2][5]").exc_type(), ExcType::IndexError);
    assert_eq!(run_err("{'a': 1}['b']").exc_type(), ExcType::KeyError);
    assert_eq!(run_err("class C: pass\nC().ghost").exc_type(), ExcType::AttributeError);
    assert_eq!(run_err("1 / 0").exc_type(), ExcType::ZeroDivisionError);
    assert_eq!(run_err("7 % 0").exc_type(), ExcType::ZeroDivisionError);
    assert_eq!(run_err("[1, 2].remove(3)").exc_type(), ExcType::ValueError);
    assert_eq!(run_err("[1, 2].index(9)").exc_type(), ExcType::ValueError);
    assert_eq!(run_err("int('not a number')").exc_type(), ExcType::ValueError);
    assert_eq!(run_err("len(42)").exc_type(), ExcType::TypeError);
    assert_eq!(run_err("None()").exc_type(), ExcType::TypeError);
    assert_eq!(run_err("assert False").exc_type(), ExcType::AssertionError);
}

#[test]
fn error_messages_are_descriptive() {
    let err = run_err("missing_name");
    assert!(err.message().contains("missing_name"), "message: {}", err.message());
    let err = run_err("1 + 'x'");
    assert!(err.message().contains("int") && err.message().contains("str"));
}

#[test]
fn uncaught_user_raise_reaches_the_embedder() {
    let err = run_err("raise ValueError('custom message')");
    assert_eq!(err.exc_type(), ExcType::ValueError);
    assert_eq!(err.message(), "custom message");

    let err = run_err("class AppError(RuntimeError): pass\nraise AppError('app')");
    assert_eq!(err.exc_type(), ExcType::RuntimeError);
    assert_eq!(err.class_name(), "AppError");
}

#[test]
fn raising_non_exception_is_a_type_error() {
    assert_eq!(run_err("raise 42").exc_type(), ExcType::TypeError);
}

#[test]
fn recursion_limit_is_uncatchable() {
    let code = "\
def loop():
    return loop()
try:
    loop()
except Exception:
    pass
";
    let runner = Runner::new(code.to_owned(), "test.adder").unwrap();
    let limits = ResourceLimits {
        max_recursion_depth: 16,
        ..ResourceLimits::default()
    };
    let err = runner.run(LimitedTracker::new(limits), &mut NoPrint).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::RecursionError);
}

#[test]
fn step_limit_stops_runaway_loops() {
    let runner = Runner::new("while True:\n    pass".to_owned(), "test.adder").unwrap();
    let limits = ResourceLimits {
        max_steps: Some(10_000),
        ..ResourceLimits::default()
    };
    let err = runner.run(LimitedTracker::new(limits), &mut NoPrint).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::RuntimeError);
}

#[test]
fn allocation_limit_is_enforced() {
    let runner = Runner::new("x = []\nwhile True:\n    x.append([])".to_owned(), "test.adder").unwrap();
    let limits = ResourceLimits {
        max_allocations: Some(5_000),
        ..ResourceLimits::default()
    };
    let err = runner.run(LimitedTracker::new(limits), &mut NoPrint).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MemoryError);
}

#[test]
fn caught_errors_do_not_leak_to_the_embedder() {
    let runner = Runner::new(
        "try:\n    1 / 0\nexcept ZeroDivisionError:\n    pass\n'fine'".to_owned(),
        "test.adder",
    )
    .unwrap();
    let result = runner.run(NoLimitTracker, &mut NoPrint).unwrap();
    assert_eq!(result, Object::String("fine".to_owned()));
}
