//! Functions: binding, defaults, starred arguments, closures, scope rules.

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
fn defaults_and_keywords() {
    let code = "\
def box(width, height=2, depth=3):
    return [width, height, depth]
[box(1), box(1, 9), box(1, depth=7), box(height=5, width=4)]
";
    assert_eq!(
        eval(code),
        Object::List(vec![
            ints(&[1, 2, 3]),
            ints(&[1, 9, 3]),
            ints(&[1, 2, 7]),
            ints(&[4, 5, 3]),
        ])
    );
}

#[test]
fn var_args_and_var_kwargs() {
    let code = "\
def gather(first, *rest, **named):
    return [first, list(rest), sorted(named.keys())]
gather(1, 2, 3, b=4, a=5)
";
    assert_eq!(
        eval(code),
        Object::List(vec![
            Object::Int(1),
            ints(&[2, 3]),
            Object::List(vec![
                Object::String("a".to_owned()),
                Object::String("b".to_owned())
            ]),
        ])
    );
}

#[test]
fn keyword_only_parameters() {
    let code = "\
def connect(host, *, timeout=30, retries):
    return [host, timeout, retries]
connect('db', retries=2)
";
    assert_eq!(
        eval(code),
        Object::List(vec![Object::String("db".to_owned()), Object::Int(30), Object::Int(2)])
    );
}

#[test]
fn star_spread_at_call_site() {
    let code = "\
def add3(a, b, c):
    return a + b + c
args = [1, 2]
opts = {'c': 30}
add3(*args, **opts)
";
    assert_eq!(eval(code), Object::Int(33));
}

#[test]
fn star_unpacking_assignment() {
    assert_eq!(
        eval("first, *middle, last = [1, 2, 3, 4, 5]\n[first, middle, last]"),
        Object::List(vec![Object::Int(1), ints(&[2, 3, 4]), Object::Int(5)])
    );
    assert_eq!(
        eval("*init, last = [1, 2]\n[init, last]"),
        Object::List(vec![ints(&[1]), Object::Int(2)])
    );
    assert_eq!(
        eval("a, *rest = [1]\n[a, rest]"),
        Object::List(vec![Object::Int(1), ints(&[])])
    );
}

#[test]
fn unpack_then_repack_is_identity() {
    let code = "\
values = [1, 2, 3, 4]
a, b, c, d = values
[a, b, c, d] == values
";
    assert_eq!(eval(code), Object::Bool(true));
}

#[test]
fn closures_capture_the_defining_scope() {
    let code = "\
def make_adder(n):
    def add(x):
        return x + n
    return add
add5 = make_adder(5)
add7 = make_adder(7)
[add5(10), add7(10)]
";
    assert_eq!(eval(code), ints(&[15, 17]));
}

#[test]
fn nonlocal_rebinds_enclosing_scope() {
    let code = "\
def make_counter():
    n = 0
    def step():
        nonlocal n
        n = n + 1
        return n
    return step
c = make_counter()
c()
c()
c()
";
    assert_eq!(eval(code), Object::Int(3));
}

#[test]
fn global_declaration_writes_module_scope() {
    let code = "\
count = 0
def bump():
    global count
    count = count + 1
bump()
bump()
count
";
    assert_eq!(eval(code), Object::Int(2));
}

#[test]
fn lambdas_are_first_class() {
    assert_eq!(eval("f = lambda x, y=10: x * y\n[f(2), f(2, 3)]"), ints(&[20, 6]));
    assert_eq!(
        eval("pairs = [(1, 'b'), (0, 'a')]\nsorted(pairs, key=lambda p: p[0])[0][1]"),
        Object::String("a".to_owned())
    );
}

#[test]
fn defaults_evaluate_once_at_definition_time() {
    let code = "\
def append_to(value, bucket=[]):
    bucket.append(value)
    return bucket
append_to(1)
append_to(2)
";
    // the shared default accumulates across calls
    assert_eq!(eval(code), ints(&[1, 2]));
}

#[test]
fn recursion() {
    assert_eq!(
        eval("def fib(n):\n    return n if n < 2 else fib(n - 1) + fib(n - 2)\nfib(12)"),
        Object::Int(144)
    );
}

#[test]
fn functions_are_values() {
    let code = "\
def double(x): return x * 2
def apply(f, v): return f(v)
apply(double, 21)
";
    assert_eq!(eval(code), Object::Int(42));
}

#[test]
fn method_references_bind_their_receiver() {
    let code = "\
items = []
push = items.append
push(1)
push(2)
items
";
    assert_eq!(eval(code), ints(&[1, 2]));
}

#[test]
fn return_without_value_is_none() {
    assert_eq!(eval("def f():\n    return\nf() is None"), Object::Bool(true));
    assert_eq!(eval("def f():\n    pass\nf() is None"), Object::Bool(true));
}

#[test]
fn argument_errors() {
    assert_eq!(
        eval_str("def f(a): return a\ntry:\n    f()\nexcept TypeError:\n    'missing'"),
        "missing"
    );
    assert_eq!(
        eval_str("def f(a): return a\ntry:\n    f(1, 2)\nexcept TypeError:\n    'extra'"),
        "extra"
    );
    assert_eq!(
        eval_str("def f(a): return a\ntry:\n    f(1, a=2)\nexcept TypeError:\n    'duplicate'"),
        "duplicate"
    );
}

#[test]
fn unpacking_arity_errors() {
    assert_eq!(
        eval_str("try:\n    a, b, c = [1, 2]\nexcept ValueError:\n    'too few'"),
        "too few"
    );
    assert_eq!(
        eval_str("try:\n    a, b = [1, 2, 3]\nexcept ValueError:\n    'too many'"),
        "too many"
    );
    assert_eq!(
        eval_str("try:\n    a, *b, c = [1]\nexcept ValueError:\n    'starred too few'"),
        "starred too few"
    );
}
