use adder::{CollectStringPrint, NoLimitTracker, Object, Runner};

/// Test we can reuse a runner across executions.
#[test]
fn repeat_exec() {
    let runner = Runner::new("1 + 2".to_owned(), "test.adder").unwrap();

    let r = runner.run_no_limits().unwrap();
    let value: i64 = (&r).try_into().unwrap();
    assert_eq!(value, 3);

    let r = runner.run_no_limits().unwrap();
    let value: i64 = (&r).try_into().unwrap();
    assert_eq!(value, 3);
}

#[test]
fn string_result() {
    let runner = Runner::new("'foobar'".to_owned(), "test.adder").unwrap();
    let r = runner.run_no_limits().unwrap();
    let value: String = (&r).try_into().unwrap();
    assert_eq!(value, "foobar");
}

#[test]
fn final_expression_is_the_result() {
    let runner = Runner::new("x = 10\ny = 20\nx * y".to_owned(), "test.adder").unwrap();
    let r = runner.run_no_limits().unwrap();
    assert_eq!(r, Object::Int(200));
}

#[test]
fn program_without_final_expression_returns_none() {
    let runner = Runner::new("x = 1".to_owned(), "test.adder").unwrap();
    let r = runner.run_no_limits().unwrap();
    assert_eq!(r, Object::None);
}

#[test]
fn globals_are_inspectable() {
    let runner = Runner::new("a = 1\nb = 'two'\nc = [3, 4]".to_owned(), "test.adder").unwrap();
    let mut print = CollectStringPrint::new();
    let output = runner.run_program(NoLimitTracker, &mut print).unwrap();
    assert_eq!(output.global("a"), Some(&Object::Int(1)));
    assert_eq!(output.global("b"), Some(&Object::String("two".to_owned())));
    assert_eq!(
        output.global("c"),
        Some(&Object::List(vec![Object::Int(3), Object::Int(4)]))
    );
    assert_eq!(output.global("missing"), None);
    // bindings come back in definition order
    let names: Vec<&str> = output.globals().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn print_writes_to_the_sink() {
    let runner = Runner::new("print('hello', 42)\nprint('x', 'y', sep='-')".to_owned(), "test.adder").unwrap();
    let mut print = CollectStringPrint::new();
    runner.run(NoLimitTracker, &mut print).unwrap();
    assert_eq!(print.output(), "hello 42\nx-y\n");
}

#[test]
fn crlf_source_is_normalized() {
    let runner = Runner::new("x = 1\r\nif x:\r\n    x = 2\r\nx".to_owned(), "test.adder").unwrap();
    let r = runner.run_no_limits().unwrap();
    assert_eq!(r, Object::Int(2));
}
