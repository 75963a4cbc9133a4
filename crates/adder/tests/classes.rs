//! Classes: MRO, cooperative inheritance, descriptors, decorators.

use adder::{NoPrint, NoLimitTracker, Object, Runner};
use pretty_assertions::assert_eq;

fn eval(code: &str) -> Object {
    let runner = Runner::new(code.to_owned(), "test.adder").unwrap();
    runner.run(NoLimitTracker, &mut NoPrint).unwrap()
}

fn eval_str(code: &str) -> String {
    (&eval(code)).try_into().unwrap()
}

fn strings(values: &[&str]) -> Object {
    Object::List(values.iter().map(|v| Object::String((*v).to_owned())).collect())
}

#[test]
fn simple_method_call() {
    let result = eval_str("class D:\n  def speak(self): return \"Woof!\"\nD().speak()");
    assert_eq!(result, "Woof!");
}

#[test]
fn instance_attributes_shadow_class_attributes() {
    let code = "\
class C:
    kind = 'class-level'
    def __init__(self):
        self.own = 'instance-level'
c = C()
[c.kind, c.own]
";
    assert_eq!(eval(code), strings(&["class-level", "instance-level"]));
    // assignment creates an instance attribute without touching the class
    let code = "\
class C:
    kind = 'shared'
a = C()
b = C()
a.kind = 'own'
[a.kind, b.kind]
";
    assert_eq!(eval(code), strings(&["own", "shared"]));
}

#[test]
fn cooperative_diamond_runs_each_init_once() {
    let code = "\
class Base:
    def __init__(self):
        self.v = []
class F(Base):
    def __init__(self):
        super().__init__()
        self.v.append(\"F\")
class S(Base):
    def __init__(self):
        super().__init__()
        self.v.append(\"S\")
class T(F, S):
    def __init__(self):
        super().__init__()
        self.v.append(\"T\")
T().v
";
    assert_eq!(eval(code), strings(&["S", "F", "T"]));
}

#[test]
fn mixin_diamond_order() {
    let code = "\
class First:
    def __init__(self):
        super().__init__()
        self.order.append('First')
class Second:
    def __init__(self):
        super().__init__()
        self.order.append('Second')
class Third(First, Second):
    def __init__(self):
        self.order = []
        super().__init__()
        self.order.append('Third')
Third().order
";
    assert_eq!(eval(code), strings(&["Second", "First", "Third"]));
}

#[test]
fn mro_is_exposed_and_linear() {
    let code = "\
class A: pass
class B(A): pass
class C(A): pass
class D(B, C): pass
[k.__name__ for k in D.__mro__]
";
    assert_eq!(eval(code), strings(&["D", "B", "C", "A", "object"]));
}

#[test]
fn method_resolution_uses_mro_order() {
    let code = "\
class A:
    def who(self): return 'A'
class B(A):
    pass
class C(A):
    def who(self): return 'C'
class D(B, C):
    pass
D().who()
";
    assert_eq!(eval_str(code), "C");
}

#[test]
fn super_delegates_to_next_in_mro() {
    let code = "\
class Animal:
    def describe(self):
        return 'animal'
class Dog(Animal):
    def describe(self):
        return super().describe() + ':dog'
Dog().describe()
";
    assert_eq!(eval_str(code), "animal:dog");
}

#[test]
fn property_getter_and_setter() {
    let code = "\
class Temperature:
    def __init__(self):
        self._celsius = 0
    @property
    def celsius(self):
        return self._celsius
    @celsius.setter
    def celsius(self, value):
        self._celsius = value
    @property
    def fahrenheit(self):
        return self._celsius * 9 / 5 + 32
    @fahrenheit.setter
    def fahrenheit(self, value):
        self._celsius = (value - 32) * 5 / 9
t = Temperature()
t.celsius = 100
a = t.fahrenheit
t.fahrenheit = 32
b = t.celsius
[a, b]
";
    assert_eq!(eval(code), Object::List(vec![Object::Float(212.0), Object::Float(0.0)]));
}

#[test]
fn property_without_setter_rejects_writes() {
    let code = "\
class C:
    @property
    def frozen(self):
        return 1
c = C()
try:
    c.frozen = 2
except AttributeError:
    'rejected'
";
    assert_eq!(eval_str(code), "rejected");
}

#[test]
fn data_descriptor_shadows_instance_attribute() {
    // a property with a setter wins over the instance attribute map
    let code = "\
class C:
    def __init__(self):
        self.log = []
    @property
    def x(self):
        return 'from-getter'
    @x.setter
    def x(self, value):
        self.log.append(value)
c = C()
c.x = 5
[c.x, c.log[0]]
";
    assert_eq!(
        eval(code),
        Object::List(vec![Object::String("from-getter".to_owned()), Object::Int(5)])
    );
}

#[test]
fn function_decorator_composition() {
    let code = "\
def shout(f):
    def wrapper(text):
        return f(text).upper()
    return wrapper
def exclaim(f):
    def wrapper(text):
        return f(text) + '!'
    return wrapper
@shout
@exclaim
def greet(name):
    return 'hi ' + name
greet('bob')
";
    // bottom-up application: shout(exclaim(greet))
    assert_eq!(eval_str(code), "HI BOB!");
}

#[test]
fn class_decorator_with_state() {
    let code = "\
class CountCalls:
    def __init__(self, func):
        self.func = func
        self.count = 0
    def __call__(self, *args):
        self.count = self.count + 1
        return self.func(*args)
@CountCalls
def greet(name):
    return 'hello ' + name
greet('a')
greet('b')
greet.count
";
    assert_eq!(eval(code), Object::Int(2));
}

#[test]
fn classmethod_and_staticmethod() {
    let code = "\
class Registry:
    _name = 'registry'
    @classmethod
    def describe(cls):
        return cls.__name__ + ':' + cls._name
    @staticmethod
    def add(a, b):
        return a + b
[Registry.describe(), Registry().describe(), Registry.add(2, 3)]
";
    assert_eq!(
        eval(code),
        Object::List(vec![
            Object::String("Registry:registry".to_owned()),
            Object::String("Registry:registry".to_owned()),
            Object::Int(5),
        ])
    );
}

#[test]
fn dunder_operator_protocol() {
    let code = "\
class Vec:
    def __init__(self, x, y):
        self.x = x
        self.y = y
    def __add__(self, other):
        return Vec(self.x + other.x, self.y + other.y)
    def __eq__(self, other):
        return self.x == other.x and self.y == other.y
    def __len__(self):
        return 2
v = Vec(1, 2) + Vec(3, 4)
[v.x, v.y, v == Vec(4, 6), len(v)]
";
    assert_eq!(
        eval(code),
        Object::List(vec![
            Object::Int(4),
            Object::Int(6),
            Object::Bool(true),
            Object::Int(2),
        ])
    );
}

#[test]
fn reflected_operand_fallback() {
    let code = "\
class Scale:
    def __init__(self, n):
        self.n = n
    def __rmul__(self, other):
        return other * self.n
3 * Scale(10)
";
    assert_eq!(eval(code), Object::Int(30));
}

#[test]
fn user_iteration_protocol() {
    let code = "\
class Countdown:
    def __init__(self, start):
        self.current = start
    def __iter__(self):
        return self
    def __next__(self):
        if self.current <= 0:
            raise StopIteration
        self.current = self.current - 1
        return self.current + 1
[x for x in Countdown(3)]
";
    assert_eq!(
        eval(code),
        Object::List(vec![Object::Int(3), Object::Int(2), Object::Int(1)])
    );
}

#[test]
fn query_builder_chaining() {
    let code = "\
class QueryBuilder:
    def __init__(self, table):
        self.table = table
        self.columns = ['*']
        self.conditions = []
        self.order = None
    def select(self, *columns):
        self.columns = list(columns)
        return self
    def where(self, condition):
        self.conditions.append(condition)
        return self
    def order_by(self, column):
        self.order = column
        return self
    def build(self):
        sql = 'SELECT ' + ', '.join(self.columns) + ' FROM ' + self.table
        if self.conditions:
            sql = sql + ' WHERE ' + ' AND '.join(self.conditions)
        if self.order:
            sql = sql + ' ORDER BY ' + self.order
        return sql
QueryBuilder('users').select('name', 'email').where('age > 18').where('active = 1').order_by('name').build()
";
    assert_eq!(
        eval_str(code),
        "SELECT name, email FROM users WHERE age > 18 AND active = 1 ORDER BY name"
    );
}

#[test]
fn type_and_isinstance() {
    let code = "\
class Shape: pass
class Circle(Shape): pass
c = Circle()
[type(c).__name__, isinstance(c, Circle), isinstance(c, Shape), isinstance(c, object), isinstance(1, Circle)]
";
    assert_eq!(
        eval(code),
        Object::List(vec![
            Object::String("Circle".to_owned()),
            Object::Bool(true),
            Object::Bool(true),
            Object::Bool(true),
            Object::Bool(false),
        ])
    );
    assert_eq!(eval("type(3).__name__"), Object::String("int".to_owned()));
    assert_eq!(eval("type('x').__name__"), Object::String("str".to_owned()));
    assert_eq!(eval("isinstance(True, int)"), Object::Bool(true));
    assert_eq!(eval("isinstance(3, (str, int))"), Object::Bool(true));
}

#[test]
fn str_and_repr_dunders() {
    let code = "\
class Point:
    def __init__(self, x, y):
        self.x = x
        self.y = y
    def __repr__(self):
        return f'Point({self.x}, {self.y})'
    def __str__(self):
        return f'({self.x}, {self.y})'
p = Point(1, 2)
[str(p), repr(p), f'{p}']
";
    assert_eq!(
        eval(code),
        strings(&["(1, 2)", "Point(1, 2)", "(1, 2)"])
    );
}

#[test]
fn user_exception_classes() {
    let code = "\
class ValidationError(ValueError):
    pass
def check(x):
    if x < 0:
        raise ValidationError('negative')
    return x
try:
    check(-1)
except ValueError as e:
    result = 'caught: ' + str(e)
result
";
    assert_eq!(eval_str(code), "caught: negative");
}

#[test]
fn class_body_scope_is_not_a_closure() {
    // methods do not see class-body bindings as free variables
    let code = "\
x = 'module'
class C:
    x = 'class'
    def read(self):
        return x
[C.x, C().read()]
";
    assert_eq!(eval(code), strings(&["class", "module"]));
}

#[test]
fn inherited_class_attributes() {
    let code = "\
class Base:
    default = 10
class Child(Base):
    pass
[Child.default, Child().default]
";
    assert_eq!(eval(code), Object::List(vec![Object::Int(10), Object::Int(10)]));
}

#[test]
fn class_level_mutation_is_visible_through_instances() {
    let code = "\
class Config:
    flag = False
a = Config()
Config.flag = True
a.flag
";
    assert_eq!(eval(code), Object::Bool(true));
}
