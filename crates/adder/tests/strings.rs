//! String methods, f-strings, and formatting.

use adder::{NoPrint, NoLimitTracker, Object, Runner};
use pretty_assertions::assert_eq;

fn eval(code: &str) -> Object {
    let runner = Runner::new(code.to_owned(), "test.adder").unwrap();
    runner.run(NoLimitTracker, &mut NoPrint).unwrap()
}

fn eval_str(code: &str) -> String {
    (&eval(code)).try_into().unwrap()
}

#[test]
fn split_and_join() {
    assert_eq!(
        eval("'a,b,c'.split(',')"),
        Object::List(vec![
            Object::String("a".to_owned()),
            Object::String("b".to_owned()),
            Object::String("c".to_owned()),
        ])
    );
    assert_eq!(
        eval("'  spaced   out  '.split()"),
        Object::List(vec![
            Object::String("spaced".to_owned()),
            Object::String("out".to_owned()),
        ])
    );
    assert_eq!(eval_str("'-'.join(['x', 'y', 'z'])"), "x-y-z");
    assert_eq!(eval_str("''.join([])"), "");
}

#[test]
fn case_and_strip() {
    assert_eq!(eval_str("'MiXeD'.upper()"), "MIXED");
    assert_eq!(eval_str("'MiXeD'.lower()"), "mixed");
    assert_eq!(eval_str("'  pad  '.strip()"), "pad");
    assert_eq!(eval_str("'xxhixx'.strip('x')"), "hi");
    assert_eq!(eval_str("'  pad  '.lstrip()"), "pad  ");
    assert_eq!(eval_str("'  pad  '.rstrip()"), "  pad");
}

#[test]
fn predicates_and_search() {
    assert_eq!(eval("'hello'.startswith('he')"), Object::Bool(true));
    assert_eq!(eval("'hello'.endswith('lo')"), Object::Bool(true));
    assert_eq!(eval("'hello'.endswith('he')"), Object::Bool(false));
    assert_eq!(eval("'hello'.find('ll')"), Object::Int(2));
    assert_eq!(eval("'hello'.find('zz')"), Object::Int(-1));
    assert_eq!(eval("'banana'.count('an')"), Object::Int(2));
    assert_eq!(eval("'ell' in 'hello'"), Object::Bool(true));
}

#[test]
fn replace() {
    assert_eq!(eval_str("'one two one'.replace('one', '1')"), "1 two 1");
}

#[test]
fn iteration_and_indexing() {
    assert_eq!(
        eval("[c for c in 'abc']"),
        Object::List(vec![
            Object::String("a".to_owned()),
            Object::String("b".to_owned()),
            Object::String("c".to_owned()),
        ])
    );
    assert_eq!(eval_str("'hello'[1]"), "e");
    assert_eq!(eval_str("'hello'[1:4]"), "ell");
    assert_eq!(eval_str("'hello'[::-1]"), "olleh");
}

#[test]
fn concatenation_and_comparison() {
    assert_eq!(eval_str("'ab' + 'cd'"), "abcd");
    assert_eq!(eval("'abc' < 'abd'"), Object::Bool(true));
    assert_eq!(eval("'b' > 'a'"), Object::Bool(true));
    // adjacent literals concatenate at parse time
    assert_eq!(eval_str("'ad' 'jacent'"), "adjacent");
}

#[test]
fn fstring_interpolation() {
    assert_eq!(eval_str("name = 'World'\nf'Hello, {name}!'"), "Hello, World!");
    assert_eq!(eval_str("a = 2\nb = 3\nf'{a} + {b} = {a + b}'"), "2 + 3 = 5");
    assert_eq!(eval_str("f'{{literal}}'"), "{literal}");
    assert_eq!(eval_str("x = 'q'\nf'{x!r}'"), "'q'");
    assert_eq!(eval_str("items = [1]\nf'{items[0]} and {len(items)}'"), "1 and 1");
}

#[test]
fn fstring_format_specs() {
    assert_eq!(eval_str("f'{3.14159:.2f}'"), "3.14");
    assert_eq!(eval_str("f'{42:5}'"), "   42");
    assert_eq!(eval_str("f'{42:<5}!'"), "42   !");
    assert_eq!(eval_str("f'{7:03d}'"), "007");
    assert_eq!(eval_str("f'{\"hi\":*^6}'"), "**hi**");
}

#[test]
fn str_format_method() {
    assert_eq!(eval_str("'{} and {}'.format(1, 2)"), "1 and 2");
    assert_eq!(eval_str("'{1}, {0}'.format('a', 'b')"), "b, a");
    assert_eq!(eval_str("'{name}={value}'.format(name='x', value=3)"), "x=3");
    assert_eq!(eval_str("'{:.1f}'.format(2.75)"), "2.8");
}

#[test]
fn multiline_and_escapes() {
    assert_eq!(eval_str("'''line1\nline2'''"), "line1\nline2");
    assert_eq!(eval_str(r"'tab\there'"), "tab\there");
    assert_eq!(eval_str(r"r'raw\nstays'"), "raw\\nstays");
}

#[test]
fn str_of_collections() {
    assert_eq!(eval_str("str([1, 'two'])"), "[1, 'two']");
    assert_eq!(eval_str("str((1, 2))"), "(1, 2)");
    assert_eq!(eval_str("str({'a': 1})"), "{'a': 1}");
}
