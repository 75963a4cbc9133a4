//! Value model: literals, aliasing, identity vs equality, containers.

use adder::{NoPrint, NoLimitTracker, Object, Runner};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;

fn eval(code: &str) -> Object {
    let runner = Runner::new(code.to_owned(), "test.adder").unwrap();
    runner.run(NoLimitTracker, &mut NoPrint).unwrap()
}

fn eval_bool(code: &str) -> bool {
    (&eval(code)).try_into().unwrap()
}

fn ints(values: &[i64]) -> Object {
    Object::List(values.iter().map(|v| Object::Int(*v)).collect())
}

#[test]
fn literal_round_trips() {
    assert_eq!(eval("42"), Object::Int(42));
    assert_eq!(eval("-3.5"), Object::Float(-3.5));
    assert_eq!(eval("'text'"), Object::String("text".to_owned()));
    assert_eq!(eval("True"), Object::Bool(true));
    assert_eq!(eval("None"), Object::None);
    assert_eq!(eval("[1, 2]"), ints(&[1, 2]));
    assert_eq!(eval("(1, 2)"), Object::Tuple(vec![Object::Int(1), Object::Int(2)]));
    assert_eq!(
        eval("{'a': 1, 'b': 2}"),
        Object::Dict(vec![
            (Object::String("a".to_owned()), Object::Int(1)),
            (Object::String("b".to_owned()), Object::Int(2)),
        ])
    );
    assert_eq!(eval("{1, 2}"), Object::Set(vec![Object::Int(1), Object::Int(2)]));
}

#[test]
fn aliasing_is_shared_mutable_identity() {
    assert_eq!(eval("a = [1]\nb = a\nb.append(2)\na"), ints(&[1, 2]));
    assert!(eval_bool("a = [1]\nb = a\na is b"));
}

#[test]
fn identity_vs_equality() {
    assert!(eval_bool("[1, 2] == [1, 2]"));
    assert!(!eval_bool("[1, 2] is [1, 2]"));
    assert!(eval_bool("None is None"));
    assert!(eval_bool("x = 'ab'\ny = 'ab'\nx == y"));
}

#[test]
fn list_repetition_aliases_inner_lists() {
    // [[]] * 3 shares one inner list across all three slots
    assert_eq!(
        eval("rows = [[]] * 3\nrows[0].append(1)\n[len(rows[0]), len(rows[1]), len(rows[2])]"),
        ints(&[1, 1, 1])
    );
    assert_eq!(eval("[7] * 0"), ints(&[]));
    assert_eq!(eval("[7] * -2"), ints(&[]));
    assert_eq!(eval("'ab' * 3"), Object::String("ababab".to_owned()));
}

#[test]
fn negative_indices_and_clamped_slices() {
    assert_eq!(eval("[10, 20, 30][-1]"), Object::Int(30));
    assert_eq!(eval("'hello'[-2]"), Object::String("l".to_owned()));
    // out-of-range slicing clamps silently
    assert_eq!(eval("[1, 2, 3][1:100]"), ints(&[2, 3]));
    assert_eq!(eval("[1, 2, 3][::-1]"), ints(&[3, 2, 1]));
    assert_eq!(eval("'abcdef'[1:4]"), Object::String("bcd".to_owned()));
    assert_eq!(eval("'abcdef'[::2]"), Object::String("ace".to_owned()));
}

#[test]
fn slice_assignment_grows_and_shrinks() {
    assert_eq!(eval("x = [1, 2, 3, 4]\nx[1:3] = [9]\nx"), ints(&[1, 9, 4]));
    assert_eq!(eval("x = [1, 4]\nx[1:1] = [2, 3]\nx"), ints(&[1, 2, 3, 4]));
    assert_eq!(eval("x = [1, 2, 3, 4]\ndel x[1:3]\nx"), ints(&[1, 4]));
    assert_eq!(eval("x = [1, 2, 3, 4]\nx[::2] = [9, 8]\nx"), ints(&[9, 2, 8, 4]));
}

#[test]
fn dict_preserves_insertion_order() {
    assert_eq!(
        eval("d = {}\nd['z'] = 1\nd['a'] = 2\nd['m'] = 3\nlist(d.keys())"),
        Object::List(vec![
            Object::String("z".to_owned()),
            Object::String("a".to_owned()),
            Object::String("m".to_owned()),
        ])
    );
    // overwriting keeps the original position
    assert_eq!(
        eval("d = {'a': 1, 'b': 2}\nd['a'] = 9\nlist(d.values())"),
        ints(&[9, 2])
    );
}

#[test]
fn arbitrary_precision_integers() {
    // 21! exceeds i64 and must promote; 20! is 2432902008176640000
    let expected = "2432902008176640000".parse::<BigInt>().unwrap() * 21_i64;
    let result = eval(
        "def factorial(n):\n    return 1 if n <= 1 else n * factorial(n - 1)\nfactorial(21)",
    );
    assert_eq!(result, Object::BigInt(expected));
    assert_eq!(
        eval("def factorial(n):\n    return 1 if n <= 1 else n * factorial(n - 1)\nfactorial(5)"),
        Object::Int(120)
    );
}

#[test]
fn int_float_arithmetic() {
    assert_eq!(eval("7 // 2"), Object::Int(3));
    assert_eq!(eval("-7 // 2"), Object::Int(-4));
    assert_eq!(eval("7 % 3"), Object::Int(1));
    assert_eq!(eval("-7 % 3"), Object::Int(2));
    assert_eq!(eval("7 / 2"), Object::Float(3.5));
    assert_eq!(eval("2 ** 10"), Object::Int(1024));
    assert_eq!(eval("2 ** -1"), Object::Float(0.5));
    assert_eq!(eval("1.5 + 1"), Object::Float(2.5));
    assert_eq!(eval("True + True"), Object::Int(2));
}

#[test]
fn truthiness_table() {
    for falsy in ["None", "False", "0", "0.0", "''", "[]", "{}", "()", "set()"] {
        assert!(!eval_bool(&format!("bool({falsy})")), "{falsy} should be falsy");
    }
    for truthy in ["1", "-1", "0.5", "'x'", "[0]", "{'a': 0}", "(0,)"] {
        assert!(eval_bool(&format!("bool({truthy})")), "{truthy} should be truthy");
    }
}

#[test]
fn chained_comparison_evaluates_middle_once() {
    assert!(eval_bool("1 < 2 < 3"));
    assert!(!eval_bool("1 < 2 > 5"));
    assert_eq!(
        eval(
            "calls = []\ndef mid():\n    calls.append(1)\n    return 2\n1 < mid() < 3\nlen(calls)"
        ),
        Object::Int(1)
    );
}

#[test]
fn short_circuit_returns_operand() {
    assert_eq!(eval("0 or 'fallback'"), Object::String("fallback".to_owned()));
    assert_eq!(eval("'first' or 'second'"), Object::String("first".to_owned()));
    assert_eq!(eval("1 and [2]"), Object::List(vec![Object::Int(2)]));
    assert_eq!(eval("0 and undefined_name"), Object::Int(0));
}

#[test]
fn set_operations() {
    assert!(eval_bool("{1, 2} | {2, 3} == {1, 2, 3}"));
    assert!(eval_bool("{1, 2} & {2, 3} == {2}"));
    assert!(eval_bool("{1, 2} - {2, 3} == {1}"));
    assert!(eval_bool("{1, 2} ^ {2, 3} == {1, 3}"));
    assert!(eval_bool("s = {1}\ns.add(2)\ns.discard(5)\ns == {1, 2}"));
}

#[test]
fn tuple_unpacking_in_assignment() {
    assert_eq!(eval("a, b = 1, 2\n[a, b]"), ints(&[1, 2]));
    assert_eq!(eval("(a, b), c = (1, 2), 3\n[a, b, c]"), ints(&[1, 2, 3]));
    assert_eq!(eval("a, b = 1, 2\na, b = b, a\n[a, b]"), ints(&[2, 1]));
    // chained assignment binds every target to the same value
    assert_eq!(eval("x = y = [0]\nx.append(1)\ny"), ints(&[0, 1]));
}

#[test]
fn bool_is_int_like_in_dicts() {
    // True, 1 and 1.0 share a dict slot
    assert_eq!(eval("d = {1: 'one'}\nd[True] = 'yes'\nd[1.0]"), Object::String("yes".to_owned()));
    assert_eq!(eval("len({1: 'a', True: 'b', 1.0: 'c'})"), Object::Int(1));
}
