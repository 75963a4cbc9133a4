//! Comprehension forms and their scoping.

use adder::{NoPrint, NoLimitTracker, Object, Runner};
use pretty_assertions::assert_eq;

fn eval(code: &str) -> Object {
    let runner = Runner::new(code.to_owned(), "test.adder").unwrap();
    runner.run(NoLimitTracker, &mut NoPrint).unwrap()
}

fn eval_str(code: &str) -> String {
    (&eval(code)).try_into().unwrap()
}

fn ints(values: &[i64]) -> Object {
    Object::List(values.iter().map(|v| Object::Int(*v)).collect())
}

#[test]
fn list_comprehension_with_filter() {
    assert_eq!(eval("[x * x for x in range(6) if x % 2 == 0]"), ints(&[0, 4, 16]));
}

#[test]
fn nested_clauses_iterate_left_to_right() {
    assert_eq!(
        eval("[i * 10 + j for i in range(2) for j in range(3)]"),
        ints(&[0, 1, 2, 10, 11, 12])
    );
    // the inner iterable sees the outer loop variable
    assert_eq!(
        eval("[j for i in range(3) for j in range(i)]"),
        ints(&[0, 0, 1])
    );
}

#[test]
fn dict_and_set_comprehensions() {
    assert_eq!(
        eval("{k: k * 2 for k in range(3)}"),
        Object::Dict(vec![
            (Object::Int(0), Object::Int(0)),
            (Object::Int(1), Object::Int(2)),
            (Object::Int(2), Object::Int(4)),
        ])
    );
    assert_eq!(eval("len({x % 3 for x in range(10)})"), Object::Int(3));
}

#[test]
fn comprehension_scope_does_not_leak() {
    assert_eq!(
        eval_str("[x for x in range(3)]\ntry:\n    x\nexcept NameError:\n    'clean'"),
        "clean"
    );
    // an existing binding is left untouched
    assert_eq!(eval("x = 'kept'\n[x for x in range(3)]\nx"), Object::String("kept".to_owned()));
}

#[test]
fn tuple_targets_in_clauses() {
    assert_eq!(
        eval("pairs = [(1, 2), (3, 4)]\n[a + b for a, b in pairs]"),
        ints(&[3, 7])
    );
}

#[test]
fn generator_expression_feeds_builtins() {
    assert_eq!(eval("sum(x * x for x in range(4))"), Object::Int(14));
    assert_eq!(eval("max(len(w) for w in ['a', 'abc', 'ab'])"), Object::Int(3));
    assert_eq!(eval("list(x + 1 for x in range(3))"), ints(&[1, 2, 3]));
}

#[test]
fn comprehension_over_user_iterable() {
    let code = "\
class Pair:
    def __iter__(self):
        return iter([10, 20])
[x for x in Pair()]
";
    assert_eq!(eval(code), ints(&[10, 20]));
}

#[test]
fn comprehension_closes_over_enclosing_names() {
    let code = "\
def scale_all(values, factor):
    return [v * factor for v in values]
scale_all([1, 2, 3], 5)
";
    assert_eq!(eval(code), ints(&[5, 10, 15]));
}
