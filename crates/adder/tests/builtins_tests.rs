//! The builtin function library.

use adder::{NoPrint, NoLimitTracker, Object, Runner};
use pretty_assertions::assert_eq;

fn eval(code: &str) -> Object {
    let runner = Runner::new(code.to_owned(), "test.adder").unwrap();
    runner.run(NoLimitTracker, &mut NoPrint).unwrap()
}

fn ints(values: &[i64]) -> Object {
    Object::List(values.iter().map(|v| Object::Int(*v)).collect())
}

#[test]
fn len_over_the_container_types() {
    assert_eq!(eval("len([1, 2, 3])"), Object::Int(3));
    assert_eq!(eval("len('héllo')"), Object::Int(5));
    assert_eq!(eval("len({'a': 1})"), Object::Int(1));
    assert_eq!(eval("len((1,))"), Object::Int(1));
    assert_eq!(eval("len(range(0, 10, 3))"), Object::Int(4));
    assert_eq!(eval("len(set([1, 1, 2]))"), Object::Int(2));
}

#[test]
fn range_is_lazy_until_materialized() {
    assert_eq!(eval("list(range(4))"), ints(&[0, 1, 2, 3]));
    assert_eq!(eval("list(range(2, 8, 2))"), ints(&[2, 4, 6]));
    assert_eq!(eval("list(range(5, 0, -2))"), ints(&[5, 3, 1]));
    assert_eq!(eval("range(3)[2]"), Object::Int(2));
    assert_eq!(eval("4 in range(10)"), Object::Bool(true));
}

#[test]
fn enumerate_yields_pairs() {
    assert_eq!(
        eval("[(i, c) for i, c in enumerate('ab')]"),
        Object::List(vec![
            Object::Tuple(vec![Object::Int(0), Object::String("a".to_owned())]),
            Object::Tuple(vec![Object::Int(1), Object::String("b".to_owned())]),
        ])
    );
    assert_eq!(
        eval("[i for i, x in enumerate([9, 9], 5)]"),
        ints(&[5, 6])
    );
}

#[test]
fn zip_stops_at_the_shortest() {
    assert_eq!(
        eval("[a + b for a, b in zip([1, 2, 3], [10, 20])]"),
        ints(&[11, 22])
    );
}

#[test]
fn map_and_filter_are_lazy() {
    assert_eq!(eval("list(map(lambda x: x * 2, [1, 2, 3]))"), ints(&[2, 4, 6]));
    assert_eq!(eval("list(filter(lambda x: x > 1, [0, 1, 2, 3]))"), ints(&[2, 3]));
    assert_eq!(eval("list(filter(None, [0, '', 'x', 2]))"), Object::List(vec![
        Object::String("x".to_owned()),
        Object::Int(2),
    ]));
    // laziness: nothing runs until consumed
    let code = "\
calls = []
def probe(x):
    calls.append(x)
    return x
m = map(probe, [1, 2])
before = len(calls)
list(m)
[before, len(calls)]
";
    assert_eq!(eval(code), ints(&[0, 2]));
    assert_eq!(eval("list(map(lambda a, b: a + b, [1, 2], [10, 20]))"), ints(&[11, 22]));
}

#[test]
fn sorted_and_sort_are_stable() {
    let code = "\
data = [('b', 2), ('a', 1), ('b', 1), ('a', 2)]
[p[1] for p in sorted(data, key=lambda p: p[0])]
";
    // equal keys keep their original order
    assert_eq!(eval(code), ints(&[1, 2, 2, 1]));
    assert_eq!(eval("sorted([3, 1, 2])"), ints(&[1, 2, 3]));
    assert_eq!(eval("sorted([3, 1, 2], reverse=True)"), ints(&[3, 2, 1]));
    assert_eq!(eval("x = [3, 1, 2]\nx.sort()\nx"), ints(&[1, 2, 3]));
    assert_eq!(
        eval("x = ['bb', 'a', 'ccc']\nx.sort(key=len, reverse=True)\nx"),
        Object::List(vec![
            Object::String("ccc".to_owned()),
            Object::String("bb".to_owned()),
            Object::String("a".to_owned()),
        ])
    );
}

#[test]
fn sort_dispatches_user_lt() {
    let code = "\
class Card:
    def __init__(self, rank):
        self.rank = rank
    def __lt__(self, other):
        return self.rank < other.rank
cards = [Card(3), Card(1), Card(2)]
cards.sort()
[c.rank for c in cards]
";
    assert_eq!(eval(code), ints(&[1, 2, 3]));
}

#[test]
fn reversed_iterates_backwards() {
    assert_eq!(eval("list(reversed([1, 2, 3]))"), ints(&[3, 2, 1]));
    assert_eq!(eval("list(reversed('abc'))"), Object::List(vec![
        Object::String("c".to_owned()),
        Object::String("b".to_owned()),
        Object::String("a".to_owned()),
    ]));
    assert_eq!(eval("list(reversed(range(3)))"), ints(&[2, 1, 0]));
}

#[test]
fn sum_min_max_all_any() {
    assert_eq!(eval("sum([1, 2, 3])"), Object::Int(6));
    assert_eq!(eval("sum([])"), Object::Int(0));
    assert_eq!(eval("sum([1, 2], 10)"), Object::Int(13));
    assert_eq!(eval("min([4, 2, 9])"), Object::Int(2));
    assert_eq!(eval("max(4, 2, 9)"), Object::Int(9));
    assert_eq!(eval("min(['bbb', 'a'], key=len)"), Object::String("a".to_owned()));
    assert_eq!(eval("all([1, True, 'x'])"), Object::Bool(true));
    assert_eq!(eval("all([1, 0])"), Object::Bool(false));
    assert_eq!(eval("all([])"), Object::Bool(true));
    assert_eq!(eval("any([0, '', 3])"), Object::Bool(true));
    assert_eq!(eval("any([])"), Object::Bool(false));
}

#[test]
fn iter_and_next_drive_the_protocol() {
    let code = "\
it = iter([1, 2])
[next(it), next(it), next(it, 'done')]
";
    assert_eq!(
        eval(code),
        Object::List(vec![Object::Int(1), Object::Int(2), Object::String("done".to_owned())])
    );
    // iter of an iterator is the same object
    assert_eq!(eval("it = iter([1])\niter(it) is it"), Object::Bool(true));
}

#[test]
fn constructors() {
    assert_eq!(eval("int('42')"), Object::Int(42));
    assert_eq!(eval("int(3.9)"), Object::Int(3));
    assert_eq!(eval("int(-3.9)"), Object::Int(-3));
    assert_eq!(eval("int()"), Object::Int(0));
    assert_eq!(eval("float('2.5')"), Object::Float(2.5));
    assert_eq!(eval("bool([])"), Object::Bool(false));
    assert_eq!(eval("str(42)"), Object::String("42".to_owned()));
    assert_eq!(eval("str(True)"), Object::String("True".to_owned()));
    assert_eq!(eval("str(None)"), Object::String("None".to_owned()));
    assert_eq!(eval("list('ab')"), Object::List(vec![
        Object::String("a".to_owned()),
        Object::String("b".to_owned()),
    ]));
    assert_eq!(eval("tuple([1, 2])"), Object::Tuple(vec![Object::Int(1), Object::Int(2)]));
    assert_eq!(
        eval("dict([('a', 1), ('b', 2)])"),
        Object::Dict(vec![
            (Object::String("a".to_owned()), Object::Int(1)),
            (Object::String("b".to_owned()), Object::Int(2)),
        ])
    );
    assert_eq!(
        eval("dict(x=1, y=2)"),
        Object::Dict(vec![
            (Object::String("x".to_owned()), Object::Int(1)),
            (Object::String("y".to_owned()), Object::Int(2)),
        ])
    );
}

#[test]
fn repr_of_values() {
    assert_eq!(eval("repr('a\\nb')"), Object::String("'a\\nb'".to_owned()));
    assert_eq!(eval("repr([1, 'x'])"), Object::String("[1, 'x']".to_owned()));
    assert_eq!(eval("repr((1,))"), Object::String("(1,)".to_owned()));
    assert_eq!(eval("repr({'k': [True, None]})"), Object::String("{'k': [True, None]}".to_owned()));
    assert_eq!(eval("repr(3.0)"), Object::String("3.0".to_owned()));
}

#[test]
fn abs_function() {
    assert_eq!(eval("abs(-5)"), Object::Int(5));
    assert_eq!(eval("abs(2.5)"), Object::Float(2.5));
}

#[test]
fn list_methods() {
    assert_eq!(
        eval("x = [1, 2]\nx.insert(0, 0)\nx.extend([3])\nx.remove(2)\nx"),
        ints(&[0, 1, 3])
    );
    assert_eq!(eval("x = [1, 2, 3]\n[x.pop(), x.pop(0), x]"), Object::List(vec![
        Object::Int(3),
        Object::Int(1),
        ints(&[2]),
    ]));
    assert_eq!(eval("[10, 20, 30].index(20)"), Object::Int(1));
    assert_eq!(eval("[1, 1, 2, 1].count(1)"), Object::Int(3));
    assert_eq!(eval("x = [1, 2]\ny = x.copy()\ny.append(3)\n[len(x), len(y)]"), ints(&[2, 3]));
    assert_eq!(eval("x = [1, 2]\nx.reverse()\nx"), ints(&[2, 1]));
    assert_eq!(eval("x = [1]\nx += [2, 3]\nx"), ints(&[1, 2, 3]));
}

#[test]
fn dict_methods() {
    assert_eq!(eval("d = {'a': 1}\nd.get('a')"), Object::Int(1));
    assert_eq!(eval("d = {'a': 1}\nd.get('z', 9)"), Object::Int(9));
    assert_eq!(eval("d = {'a': 1}\nd.get('z')"), Object::None);
    assert_eq!(
        eval("d = {'a': 1}\nd.update({'b': 2})\nsorted(d.keys())"),
        Object::List(vec![Object::String("a".to_owned()), Object::String("b".to_owned())])
    );
    assert_eq!(eval("d = {'a': 1}\n[d.pop('a'), len(d)]"), ints(&[1, 0]));
    assert_eq!(eval("d = {'a': 1}\nd.setdefault('b', 5)\nd['b']"), Object::Int(5));
    assert_eq!(eval("d = {'a': 1}\nd.setdefault('a', 5)"), Object::Int(1));
    assert_eq!(
        eval("d = {'a': 1, 'b': 2}\n[k + str(v) for k, v in d.items()]"),
        Object::List(vec![Object::String("a1".to_owned()), Object::String("b2".to_owned())])
    );
    assert_eq!(eval("d = {'a': 1}\nc = d.copy()\nc['b'] = 2\n[len(d), len(c)]"), ints(&[1, 2]));
}

#[test]
fn set_methods() {
    assert_eq!(eval("len({1, 2}.union({2, 3}))"), Object::Int(3));
    assert_eq!(eval("len({1, 2}.intersection({2, 3}))"), Object::Int(1));
    assert_eq!(eval("len({1, 2}.difference({2, 3}))"), Object::Int(1));
    assert_eq!(eval("2 in {1, 2}"), Object::Bool(true));
    assert_eq!(eval("5 in {1, 2}"), Object::Bool(false));
}
