//! Loops, conditionals, exception handling, context managers.

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

fn strings(values: &[&str]) -> Object {
    Object::List(values.iter().map(|v| Object::String((*v).to_owned())).collect())
}

#[test]
fn if_elif_else() {
    let code = "\
def grade(n):
    if n >= 90:
        return 'A'
    elif n >= 80:
        return 'B'
    else:
        return 'C'
[grade(95), grade(85), grade(70)]
";
    assert_eq!(eval(code), strings(&["A", "B", "C"]));
}

#[test]
fn while_with_break_and_continue() {
    let code = "\
out = []
n = 0
while True:
    n = n + 1
    if n % 2 == 0:
        continue
    if n > 7:
        break
    out.append(n)
out
";
    assert_eq!(eval(code), ints(&[1, 3, 5, 7]));
}

#[test]
fn loop_else_runs_only_without_break() {
    let code = "\
out = []
for x in range(3):
    pass
else:
    out.append('for-else')
while False:
    pass
else:
    out.append('while-else')
for x in range(3):
    break
else:
    out.append('skipped')
out
";
    assert_eq!(eval(code), strings(&["for-else", "while-else"]));
}

#[test]
fn nested_loop_break_is_local() {
    let code = "\
pairs = []
for i in range(3):
    for j in range(3):
        if j > i:
            break
        pairs.append(i * 10 + j)
pairs
";
    assert_eq!(eval(code), ints(&[0, 10, 11, 20, 21, 22]));
}

#[test]
fn try_except_else_finally_ordering() {
    let code = "\
log = []
try:
    log.append('body')
except ValueError:
    log.append('handler')
else:
    log.append('else')
finally:
    log.append('finally')
log
";
    assert_eq!(eval(code), strings(&["body", "else", "finally"]));

    let code = "\
log = []
try:
    log.append('body')
    raise ValueError('boom')
except ValueError as e:
    log.append('caught ' + str(e))
else:
    log.append('else')
finally:
    log.append('finally')
log
";
    assert_eq!(eval(code), strings(&["body", "caught boom", "finally"]));
}

#[test]
fn except_matches_through_hierarchy() {
    assert_eq!(
        eval_str("try:\n    {}['missing']\nexcept LookupError:\n    'lookup'"),
        "lookup"
    );
    assert_eq!(
        eval_str("try:\n    [1][5]\nexcept Exception:\n    'generic'"),
        "generic"
    );
    assert_eq!(
        eval_str("try:\n    1 / 0\nexcept (ValueError, ZeroDivisionError):\n    'tuple-match'"),
        "tuple-match"
    );
}

#[test]
fn unmatched_exception_propagates_past_handlers() {
    let code = "\
def risky():
    try:
        1 / 0
    except ValueError:
        return 'wrong'
try:
    risky()
except ZeroDivisionError:
    result = 'outer'
result
";
    assert_eq!(eval_str(code), "outer");
}

#[test]
fn finally_runs_on_raise_and_return() {
    let code = "\
log = []
def f():
    try:
        return 'returned'
    finally:
        log.append('finally')
r = f()
[r, log[0]]
";
    assert_eq!(eval(code), strings(&["returned", "finally"]));

    let code = "\
log = []
try:
    try:
        raise ValueError('x')
    finally:
        log.append('inner-finally')
except ValueError:
    log.append('caught')
log
";
    assert_eq!(eval(code), strings(&["inner-finally", "caught"]));
}

#[test]
fn bare_raise_rethrows_active_exception() {
    let code = "\
log = []
try:
    try:
        raise ValueError('original')
    except ValueError:
        log.append('first')
        raise
except ValueError as e:
    log.append('second ' + str(e))
log
";
    assert_eq!(eval(code), strings(&["first", "second original"]));
}

#[test]
fn context_manager_normal_exit() {
    let code = "\
class R:
    def __init__(s):
        s.log = []
    def __enter__(s):
        s.log.append('e')
        return s
    def __exit__(s, *a):
        s.log.append('x')
        return False
r = R()
with r:
    r.log.append('u')
r.log
";
    assert_eq!(eval(code), strings(&["e", "u", "x"]));
}

#[test]
fn context_manager_receives_exception_info() {
    let code = "\
class Watcher:
    def __init__(self):
        self.seen = None
    def __enter__(self):
        return self
    def __exit__(self, exc_type, exc_value, tb):
        self.seen = exc_type
        return True
w = Watcher()
with w as target:
    raise ValueError('inside')
[w.seen is None, w.seen.__name__]
";
    assert_eq!(
        eval(code),
        Object::List(vec![Object::Bool(false), Object::String("ValueError".to_owned())])
    );
}

#[test]
fn context_manager_exit_suppression() {
    let code = "\
class Suppress:
    def __enter__(self):
        return self
    def __exit__(self, exc_type, exc_value, tb):
        return True
with Suppress():
    raise ValueError('swallowed')
'survived'
";
    assert_eq!(eval_str(code), "survived");
}

#[test]
fn nested_with_exits_last_in_first_out() {
    let code = "\
log = []
class Tag:
    def __init__(self, name):
        self.name = name
    def __enter__(self):
        log.append('enter ' + self.name)
        return self
    def __exit__(self, *a):
        log.append('exit ' + self.name)
        return False
with Tag('outer') as a, Tag('inner') as b:
    log.append('body')
log
";
    assert_eq!(
        eval(code),
        strings(&["enter outer", "enter inner", "body", "exit inner", "exit outer"])
    );
}

#[test]
fn with_as_binds_enter_result() {
    let code = "\
class Box:
    def __enter__(self):
        return 'payload'
    def __exit__(self, *a):
        return False
with Box() as value:
    got = value
got
";
    assert_eq!(eval_str(code), "payload");
}

#[test]
fn import_raises_import_error() {
    assert_eq!(
        eval_str("try:\n    import os\nexcept ImportError:\n    'no modules'"),
        "no modules"
    );
}

#[test]
fn assert_statement() {
    assert_eq!(eval("assert True\n'ok'"), Object::String("ok".to_owned()));
    assert_eq!(
        eval_str("try:\n    assert 1 == 2, 'mismatch'\nexcept AssertionError as e:\n    str(e)"),
        "mismatch"
    );
}
