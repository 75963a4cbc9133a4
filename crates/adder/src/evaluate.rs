//! The tree-walking evaluator.
//!
//! `eval_stmt` returns a control-flow signal (`Normal`, `Return`, `Break`,
//! `Continue`); raises travel on the `RunError` channel until a `try`
//! catches them. Expressions return values. Every operator, attribute
//! access, iteration and call dispatches through dunder lookup along the
//! MRO, falling back to the native behavior of the built-in types.
//!
//! Garbage collection runs only between module-level statements (no
//! interpreted frames active); values a construct holds across statement
//! boundaries at that level - loop iterators, context managers, pending
//! exceptions - are registered in `temp_roots`.

use std::rc::Rc;

use crate::{
    args::ArgValues,
    builtins::{self, Builtins},
    exception::{ExcType, RunError, RunResult, SimpleException},
    expressions::{
        ArgExprs, ClassDef, CmpOperator, Comprehension, DictItem, ExceptHandler, Expr, ExprLoc, FunctionDef,
        Identifier, Literal, Node, Operator, Try, UnpackTarget, WithItem,
    },
    fstring::{ConversionFlag, FStringPart, ParsedFormatSpec},
    heap::{Heap, HeapData, HeapId},
    io::PrintWriter,
    namespace::{Scope, ScopeKind},
    resource::{MAX_DATA_RECURSION_DEPTH, ResourceTracker},
    signature::Signature,
    types::{
        BoundMethod, ClassObject, Dict, ExcInstance, Function, Instance, Iter, Key, Property, Set, Slice,
        SuperProxy, Type,
        str::{FormatPiece, call_str_method, char_at, char_count, parse_format_template},
    },
    value::{
        PyNum, Value, binary_number_op, compare_numbers, float_repr, num_to_value, numeric_of, string_repr,
        true_divide,
    },
};

/// Result of a statement: either fall through or redirect control flow.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// One interpreted function activation, tracked for recursion limits and
/// zero-argument `super()`.
#[derive(Debug, Clone, Copy)]
struct Frame {
    function: HeapId,
    /// The first bound positional argument (the receiver in methods).
    first_arg: Option<Value>,
}

pub(crate) struct Evaluator<'a, T: ResourceTracker> {
    pub heap: Heap<T>,
    print: &'a mut dyn PrintWriter,
    /// Active scopes, innermost last. Index 0 is the module scope.
    scope_stack: Vec<HeapId>,
    frames: Vec<Frame>,
    /// Extra GC roots for values held in Rust locals across statements.
    temp_roots: Vec<Value>,
    /// Exceptions currently being handled, for bare `raise`.
    active_exceptions: Vec<SimpleException>,
    object_class: HeapId,
}

impl<'a, T: ResourceTracker> Evaluator<'a, T> {
    pub fn new(tracker: T, print: &'a mut dyn PrintWriter) -> RunResult<Self> {
        let mut heap = Heap::new(tracker);
        let object_class = heap.allocate(HeapData::Class(ClassObject::new(
            "object".to_owned(),
            indexmap::IndexMap::default(),
            Vec::new(),
        )))?;
        match heap.get_mut(object_class) {
            HeapData::Class(class) => class.set_mro(vec![object_class]),
            _ => unreachable!("just allocated"),
        }
        let module_scope = heap.allocate(HeapData::Scope(Scope::new(ScopeKind::Module, None)))?;
        Ok(Self {
            heap,
            print,
            scope_stack: vec![module_scope],
            frames: Vec::new(),
            temp_roots: Vec::new(),
            active_exceptions: Vec::new(),
            object_class,
        })
    }

    pub fn object_class(&self) -> HeapId {
        self.object_class
    }

    pub fn write_output(&mut self, text: &str) {
        self.print.write(text);
    }

    /// Runs a module, returning the value of the final expression statement
    /// (or `None`).
    pub fn run_module(&mut self, nodes: &[Node]) -> RunResult<Value> {
        let mut result = Value::None;
        for (index, node) in nodes.iter().enumerate() {
            self.maybe_collect();
            if index + 1 == nodes.len() {
                if let Node::Expr(expr) = node {
                    result = self.eval_expr(expr)?;
                    break;
                }
            }
            match self.eval_stmt(node)? {
                Flow::Normal => {}
                Flow::Return(_) => {
                    return Err(SimpleException::new_msg(ExcType::SyntaxError, "'return' outside function").into());
                }
                Flow::Break => {
                    return Err(SimpleException::new_msg(ExcType::SyntaxError, "'break' outside loop").into());
                }
                Flow::Continue => {
                    return Err(
                        SimpleException::new_msg(ExcType::SyntaxError, "'continue' not properly in loop").into(),
                    );
                }
            }
        }
        Ok(result)
    }

    /// The module scope's bindings, in insertion order.
    pub fn global_bindings(&self) -> Vec<(String, Value)> {
        match self.heap.get(self.scope_stack[0]) {
            HeapData::Scope(scope) => scope
                .bindings()
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
            _ => Vec::new(),
        }
    }

    // --- scopes and garbage collection ---

    fn current_scope(&self) -> HeapId {
        *self.scope_stack.last().expect("scope stack never empty")
    }

    fn global_scope(&self) -> HeapId {
        self.scope_stack[0]
    }

    fn scope(&self, id: HeapId) -> &Scope {
        match self.heap.get(id) {
            HeapData::Scope(scope) => scope,
            _ => unreachable!("scope id does not point at a scope"),
        }
    }

    fn scope_mut(&mut self, id: HeapId) -> &mut Scope {
        match self.heap.get_mut(id) {
            HeapData::Scope(scope) => scope,
            _ => unreachable!("scope id does not point at a scope"),
        }
    }

    /// Collects garbage if due. Only safe (and only called) between
    /// statements with no interpreted frames active, where every live value
    /// is reachable from the scopes and the explicit root stacks.
    fn maybe_collect(&mut self) {
        if !self.frames.is_empty() || !self.heap.should_collect() {
            return;
        }
        let mut root_values = self.temp_roots.clone();
        for exc in &self.active_exceptions {
            if let Some(value) = exc.value() {
                root_values.push(value);
            }
        }
        let mut root_ids = self.scope_stack.clone();
        root_ids.push(self.object_class);
        self.heap.collect_garbage(&root_values, &root_ids);
    }

    // --- name resolution ---

    fn lookup_name(&self, identifier: &Identifier) -> RunResult<Value> {
        let name = identifier.name.as_str();
        let current = self.current_scope();
        let scope = self.scope(current);
        if scope.is_declared_global(name) {
            if let Some(value) = self.scope(self.global_scope()).get(name) {
                return Ok(value);
            }
            return builtins::lookup_builtin(name).ok_or_else(|| ExcType::name_error(name));
        }
        if scope.is_declared_nonlocal(name) {
            return self
                .find_nonlocal_scope(current, name)
                .and_then(|id| self.scope(id).get(name))
                .ok_or_else(|| ExcType::name_error(name));
        }
        let mut cursor = Some(current);
        while let Some(id) = cursor {
            let scope = self.scope(id);
            if let Some(value) = scope.get(name) {
                return Ok(value);
            }
            cursor = scope.parent();
        }
        builtins::lookup_builtin(name).ok_or_else(|| ExcType::name_error(name))
    }

    /// The nearest enclosing function scope that binds `name` (for
    /// `nonlocal`), excluding the module scope.
    fn find_nonlocal_scope(&self, from: HeapId, name: &str) -> Option<HeapId> {
        let mut cursor = self.scope(from).parent();
        while let Some(id) = cursor {
            let scope = self.scope(id);
            if scope.kind() == ScopeKind::Module {
                return None;
            }
            if scope.kind() == ScopeKind::Function && scope.get(name).is_some() {
                return Some(id);
            }
            cursor = scope.parent();
        }
        None
    }

    fn assign_name(&mut self, name: &str, value: Value) -> RunResult<()> {
        let current = self.current_scope();
        let scope = self.scope(current);
        if scope.is_declared_global(name) {
            let global = self.global_scope();
            self.scope_mut(global).set(name.to_owned(), value);
            return Ok(());
        }
        if scope.is_declared_nonlocal(name) {
            let target = self
                .find_nonlocal_scope(current, name)
                .ok_or_else(|| ExcType::name_error(name))?;
            self.scope_mut(target).set(name.to_owned(), value);
            return Ok(());
        }
        self.scope_mut(current).set(name.to_owned(), value);
        Ok(())
    }

    fn delete_name(&mut self, identifier: &Identifier) -> RunResult<()> {
        let name = identifier.name.as_str();
        let current = self.current_scope();
        if self.scope(current).is_declared_global(name) {
            let global = self.global_scope();
            if self.scope_mut(global).remove(name) {
                return Ok(());
            }
            return Err(ExcType::name_error(name));
        }
        if self.scope_mut(current).remove(name) {
            Ok(())
        } else {
            Err(ExcType::name_error(name))
        }
    }

    // --- statements ---

    fn eval_body(&mut self, nodes: &[Node]) -> RunResult<Flow> {
        for node in nodes {
            self.maybe_collect();
            match self.eval_stmt(node)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, node: &Node) -> RunResult<Flow> {
        self.heap.tracker.on_step()?;
        match node {
            Node::Pass => Ok(Flow::Normal),
            Node::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            Node::Assign { targets, value } => {
                let value = self.eval_expr(value)?;
                for target in targets {
                    self.bind_target(target, value)?;
                }
                Ok(Flow::Normal)
            }
            Node::AugAssign { target, op, value } => {
                self.eval_aug_assign(target, *op, value)?;
                Ok(Flow::Normal)
            }
            Node::Delete(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
                Ok(Flow::Normal)
            }
            Node::Return(value, position) => {
                if self.frames.is_empty() {
                    return Err(RunError::from(SimpleException::new_msg(
                        ExcType::SyntaxError,
                        "'return' outside function",
                    ))
                    .with_position(*position));
                }
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            Node::Raise { exc, cause, position } => {
                if let Some(cause) = cause {
                    // `raise X from Y`: the cause is accepted but not chained
                    self.eval_expr(cause)?;
                }
                let error = match exc {
                    Some(expr) => {
                        let value = self.eval_expr(expr)?;
                        self.exception_from_value(value)?
                    }
                    None => match self.active_exceptions.last() {
                        Some(active) => active.clone(),
                        None => SimpleException::new_msg(ExcType::RuntimeError, "No active exception to re-raise"),
                    },
                };
                Err(RunError::from(error).with_position(*position))
            }
            Node::Assert { test, msg } => {
                if self.eval_truthy(test)? {
                    return Ok(Flow::Normal);
                }
                let message = match msg {
                    Some(expr) => {
                        let value = self.eval_expr(expr)?;
                        Some(self.py_str(value)?)
                    }
                    None => None,
                };
                match message {
                    Some(message) => Err(SimpleException::new_msg(ExcType::AssertionError, message).into()),
                    None => Err(SimpleException::new(ExcType::AssertionError).into()),
                }
            }
            Node::If { test, body, or_else } => {
                if self.eval_truthy(test)? {
                    self.eval_body(body)
                } else {
                    self.eval_body(or_else)
                }
            }
            Node::While { test, body, or_else } => {
                loop {
                    if !self.eval_truthy(test)? {
                        return self.eval_body(or_else);
                    }
                    match self.eval_body(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => return Ok(Flow::Normal),
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            Node::For {
                target,
                iter,
                body,
                or_else,
            } => self.eval_for(target, iter, body, or_else),
            Node::Break(_) => Ok(Flow::Break),
            Node::Continue(_) => Ok(Flow::Continue),
            Node::FunctionDef(def) => {
                let function = self.make_function(def)?;
                let decorated = self.apply_decorators(&def.decorators, function)?;
                self.assign_name(&def.name, decorated)?;
                Ok(Flow::Normal)
            }
            Node::ClassDef(def) => {
                let class = self.eval_class_def(def)?;
                self.assign_name(&def.name.name, class)?;
                Ok(Flow::Normal)
            }
            Node::With { items, body } => self.eval_with(items, body),
            Node::Try(block) => self.eval_try(block),
            Node::Global { names } => {
                let current = self.current_scope();
                for name in names {
                    self.scope_mut(current).declare_global(name.name.clone());
                }
                Ok(Flow::Normal)
            }
            Node::Nonlocal { names } => {
                let current = self.current_scope();
                for name in names {
                    if self.find_nonlocal_scope(current, &name.name).is_none() {
                        return Err(SimpleException::new_msg(
                            ExcType::SyntaxError,
                            format!("no binding for nonlocal '{}' found", name.name),
                        )
                        .into());
                    }
                    self.scope_mut(current).declare_nonlocal(name.name.clone());
                }
                Ok(Flow::Normal)
            }
            Node::Import { module_name, position } => Err(RunError::from(SimpleException::new_msg(
                ExcType::ImportError,
                format!("No module named '{module_name}'"),
            ))
            .with_position(*position)),
        }
    }

    fn eval_for(
        &mut self,
        target: &UnpackTarget,
        iter: &ExprLoc,
        body: &[Node],
        or_else: &[Node],
    ) -> RunResult<Flow> {
        let iterable = self.eval_expr(iter)?;
        let iterator = self.get_iter(iterable)?;
        self.temp_roots.push(iterator);
        let result = self.run_for_loop(target, iterator, body, or_else);
        self.temp_roots.pop();
        result
    }

    fn run_for_loop(
        &mut self,
        target: &UnpackTarget,
        iterator: Value,
        body: &[Node],
        or_else: &[Node],
    ) -> RunResult<Flow> {
        loop {
            let Some(item) = self.iter_next(iterator)? else {
                return self.eval_body(or_else);
            };
            self.bind_target(target, item)?;
            match self.eval_body(body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
    }

    fn eval_with(&mut self, items: &[WithItem], body: &[Node]) -> RunResult<Flow> {
        let Some((first, rest)) = items.split_first() else {
            return self.eval_body(body);
        };
        let manager = self.eval_expr(&first.context)?;
        self.temp_roots.push(manager);
        let entered = match self.call_attr(manager, "__enter__", ArgValues::empty()) {
            Ok(value) => value,
            Err(err) => {
                self.temp_roots.pop();
                return Err(err);
            }
        };
        let body_result = match &first.var {
            Some(var) => self.bind_target(var, entered).and_then(|()| self.eval_with(rest, body)),
            None => self.eval_with(rest, body),
        };
        let outcome = match body_result {
            Ok(flow) => {
                let exit_args = ArgValues::positional([Value::None, Value::None, Value::None]);
                match self.call_attr(manager, "__exit__", exit_args) {
                    Ok(_) => Ok(flow),
                    Err(err) => Err(err),
                }
            }
            Err(RunError::Exc(exc)) => {
                let exc_type_value = self.exception_type_value(&exc);
                let exc_value = match self.exception_instance_value(&exc) {
                    Ok(value) => value,
                    Err(err) => {
                        self.temp_roots.pop();
                        return Err(err);
                    }
                };
                let exit_args = ArgValues::positional([exc_type_value, exc_value, Value::None]);
                match self.call_attr(manager, "__exit__", exit_args) {
                    Ok(result) => match self.py_bool(result) {
                        Ok(true) => Ok(Flow::Normal),
                        Ok(false) => Err(RunError::Exc(exc)),
                        Err(err) => Err(err),
                    },
                    Err(err) => Err(err),
                }
            }
            Err(other) => Err(other),
        };
        self.temp_roots.pop();
        outcome
    }

    fn eval_try(&mut self, block: &Try) -> RunResult<Flow> {
        let body_result = self.eval_body(&block.body);
        let outcome = match body_result {
            Ok(flow) => {
                let flow = match flow {
                    Flow::Normal => self.eval_body(&block.or_else),
                    other => Ok(other),
                };
                flow
            }
            Err(RunError::Exc(exc)) => self.run_handlers(&block.handlers, *exc),
            Err(other) => Err(other),
        };
        // finally always runs; its own signal or error wins
        if block.finally.is_empty() {
            return outcome;
        }
        if let Err(RunError::Exc(pending)) = &outcome {
            if let Some(value) = pending.value() {
                self.temp_roots.push(value);
            }
        }
        let finally_result = self.eval_body(&block.finally);
        if let Err(RunError::Exc(pending)) = &outcome {
            if pending.value().is_some() {
                self.temp_roots.pop();
            }
        }
        match finally_result? {
            Flow::Normal => outcome,
            other => Ok(other),
        }
    }

    fn run_handlers(&mut self, handlers: &[ExceptHandler], exc: SimpleException) -> RunResult<Flow> {
        for handler in handlers {
            let matches = match &handler.exc_type {
                None => true,
                Some(expr) => {
                    let handler_value = self.eval_expr(expr)?;
                    self.exception_matches(&exc, handler_value)?
                }
            };
            if !matches {
                continue;
            }
            if let Some(name) = &handler.name {
                let bound = self.exception_instance_value(&exc)?;
                self.assign_name(&name.name, bound)?;
            }
            self.active_exceptions.push(exc);
            let result = self.eval_body(&handler.body);
            self.active_exceptions.pop();
            if let Some(name) = &handler.name {
                // the bound name is scoped to the handler body
                let current = self.current_scope();
                self.scope_mut(current).remove(&name.name);
            }
            return result;
        }
        Err(RunError::Exc(Box::new(exc)))
    }

    /// Whether a raised exception is caught by `except handler_value:`.
    fn exception_matches(&mut self, exc: &SimpleException, handler_value: Value) -> RunResult<bool> {
        match handler_value {
            Value::Builtin(Builtins::ExcType(handler)) => Ok(exc.exc_type().is_subclass_of(handler)),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Class(_) => {
                    // a user class handler matches when the raised value is an
                    // instance whose MRO contains it
                    let Some(Value::Ref(value_id)) = exc.value() else {
                        return Ok(false);
                    };
                    let class = match self.heap.get(value_id) {
                        HeapData::Instance(instance) => instance.class(),
                        HeapData::Exception(exc_instance) => match exc_instance.class() {
                            Some(class) => class,
                            None => return Ok(false),
                        },
                        _ => return Ok(false),
                    };
                    match self.heap.get(class) {
                        HeapData::Class(class) => Ok(class.mro().contains(&id)),
                        _ => Ok(false),
                    }
                }
                HeapData::Tuple(tuple) => {
                    let entries: Vec<Value> = tuple.items().to_vec();
                    for entry in entries {
                        if self.exception_matches(exc, entry)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                _ => Err(ExcType::type_error(
                    "catching classes that do not inherit from BaseException is not allowed",
                )),
            },
            _ => Err(ExcType::type_error(
                "catching classes that do not inherit from BaseException is not allowed",
            )),
        }
    }

    /// Builds the raise payload from the operand of a `raise` statement.
    fn exception_from_value(&mut self, value: Value) -> RunResult<SimpleException> {
        match value {
            Value::Builtin(Builtins::ExcType(exc_type)) => Ok(SimpleException::new(exc_type)),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Exception(instance) => {
                    let exc_type = instance.exc_type();
                    let args: Vec<Value> = instance.args().to_vec();
                    let class = instance.class();
                    let message = match args.first() {
                        Some(first) => Some(self.py_str(*first)?),
                        None => None,
                    };
                    let mut exc = SimpleException::with_value(exc_type, message, value);
                    if let Some(class) = class {
                        if let HeapData::Class(class) = self.heap.get(class) {
                            exc.set_custom_class_name(class.name().to_owned());
                        }
                    }
                    Ok(exc)
                }
                HeapData::Instance(instance) => {
                    let class_id = instance.class();
                    let Some(base) = self.builtin_base_of_class(class_id) else {
                        return Err(ExcType::type_error("exceptions must derive from BaseException"));
                    };
                    let class_name = match self.heap.get(class_id) {
                        HeapData::Class(class) => class.name().to_owned(),
                        _ => base.to_string(),
                    };
                    let message = match instance.get_attr("args") {
                        Some(Value::Ref(args_id)) => match self.heap.get(args_id) {
                            HeapData::Tuple(tuple) if !tuple.is_empty() => {
                                let first = tuple.items()[0];
                                Some(self.py_str(first)?)
                            }
                            _ => None,
                        },
                        _ => None,
                    };
                    let mut exc = SimpleException::with_value(base, message, value);
                    exc.set_custom_class_name(class_name);
                    Ok(exc)
                }
                HeapData::Class(class) => {
                    if self.builtin_base_of_class(id).is_none() && class.builtin_base().is_none() {
                        return Err(ExcType::type_error("exceptions must derive from BaseException"));
                    }
                    let instance = self.call_value(value, ArgValues::empty())?;
                    self.exception_from_value(instance)
                }
                _ => Err(ExcType::type_error("exceptions must derive from BaseException")),
            },
            _ => Err(ExcType::type_error("exceptions must derive from BaseException")),
        }
    }

    /// The built-in exception type a user class derives from, via its MRO.
    pub(crate) fn builtin_base_of_class(&self, class_id: HeapId) -> Option<ExcType> {
        let mro = match self.heap.get(class_id) {
            HeapData::Class(class) => class.mro().to_vec(),
            _ => return None,
        };
        for id in mro {
            if let HeapData::Class(class) = self.heap.get(id) {
                if let Some(base) = class.builtin_base() {
                    return Some(base);
                }
            }
        }
        None
    }

    /// The `type` argument passed to `__exit__` for a raised exception.
    fn exception_type_value(&self, exc: &SimpleException) -> Value {
        if let Some(Value::Ref(id)) = exc.value() {
            let class = match self.heap.get(id) {
                HeapData::Instance(instance) => Some(instance.class()),
                HeapData::Exception(exc_instance) => exc_instance.class(),
                _ => None,
            };
            if let Some(class) = class {
                return Value::Ref(class);
            }
        }
        Value::Builtin(Builtins::ExcType(exc.exc_type()))
    }

    /// The `args` tuple of a user exception instance, if it has one.
    fn exception_args_of_instance(&self, id: HeapId) -> Option<Vec<Value>> {
        let args_value = match self.heap.get(id) {
            HeapData::Instance(instance) => instance.get_attr("args")?,
            _ => return None,
        };
        match args_value {
            Value::Ref(args_id) => match self.heap.get(args_id) {
                HeapData::Tuple(tuple) => Some(tuple.items().to_vec()),
                _ => None,
            },
            _ => None,
        }
    }

    /// The exception instance for `except ... as e` / `__exit__`, creating
    /// one when the raise carried only a type and message.
    fn exception_instance_value(&mut self, exc: &SimpleException) -> RunResult<Value> {
        if let Some(value) = exc.value() {
            return Ok(value);
        }
        let args = match exc.message() {
            Some(message) => vec![self.heap.new_str(message.to_owned())?],
            None => Vec::new(),
        };
        let instance = ExcInstance::new(exc.exc_type(), None, args);
        Ok(Value::Ref(self.heap.allocate(HeapData::Exception(instance))?))
    }

    // --- assignment targets ---

    /// Binds a value to a target pattern. One algorithm serves assignment,
    /// `for` targets, comprehension clauses and `with ... as`.
    fn bind_target(&mut self, target: &UnpackTarget, value: Value) -> RunResult<()> {
        match target {
            UnpackTarget::Name(identifier) => self.assign_name(&identifier.name, value),
            UnpackTarget::Attr { object, attr, .. } => {
                let object = self.eval_expr(object)?;
                self.set_attr(object, attr, value)
            }
            UnpackTarget::Subscript { object, index, .. } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                self.set_item(object, index, value)
            }
            UnpackTarget::Starred(_) => Err(SimpleException::new_msg(
                ExcType::SyntaxError,
                "starred assignment target must be in a list or tuple",
            )
            .into()),
            UnpackTarget::Tuple { targets, .. } => self.bind_tuple_target(targets, value),
        }
    }

    fn bind_tuple_target(&mut self, targets: &[UnpackTarget], value: Value) -> RunResult<()> {
        let values = self.iterate_to_vec(value)?;
        let star_position = targets
            .iter()
            .position(|t| matches!(t, UnpackTarget::Starred(_)));
        match star_position {
            None => {
                if values.len() < targets.len() {
                    return Err(ExcType::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        values.len()
                    )));
                }
                if values.len() > targets.len() {
                    return Err(ExcType::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                for (target, value) in targets.iter().zip(values) {
                    self.bind_target(target, value)?;
                }
                Ok(())
            }
            Some(star) => {
                let fixed = targets.len() - 1;
                if values.len() < fixed {
                    return Err(ExcType::value_error(format!(
                        "not enough values to unpack (expected at least {fixed}, got {})",
                        values.len()
                    )));
                }
                let star_len = values.len() - fixed;
                for (target, value) in targets[..star].iter().zip(&values[..star]) {
                    self.bind_target(target, *value)?;
                }
                let star_list = self.heap.new_list(values[star..star + star_len].to_vec())?;
                let UnpackTarget::Starred(inner) = &targets[star] else {
                    unreachable!("checked above");
                };
                self.bind_target(inner, star_list)?;
                for (target, value) in targets[star + 1..].iter().zip(&values[star + star_len..]) {
                    self.bind_target(target, *value)?;
                }
                Ok(())
            }
        }
    }

    fn delete_target(&mut self, target: &UnpackTarget) -> RunResult<()> {
        match target {
            UnpackTarget::Name(identifier) => self.delete_name(identifier),
            UnpackTarget::Attr { object, attr, .. } => {
                let object = self.eval_expr(object)?;
                self.delete_attr(object, attr)
            }
            UnpackTarget::Subscript { object, index, .. } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                self.delete_item(object, index)
            }
            UnpackTarget::Tuple { targets, .. } => {
                for target in targets {
                    self.delete_target(target)?;
                }
                Ok(())
            }
            UnpackTarget::Starred(_) => Err(SimpleException::new_msg(
                ExcType::SyntaxError,
                "cannot delete starred expression",
            )
            .into()),
        }
    }

    fn eval_aug_assign(&mut self, target: &UnpackTarget, op: Operator, value: &ExprLoc) -> RunResult<()> {
        match target {
            UnpackTarget::Name(identifier) => {
                let current = self.lookup_name(identifier)?;
                let rhs = self.eval_expr(value)?;
                let result = self.inplace_binary_op(current, op, rhs)?;
                self.assign_name(&identifier.name, result)
            }
            UnpackTarget::Attr { object, attr, .. } => {
                let object = self.eval_expr(object)?;
                let current = self.get_attr(object, attr)?;
                let rhs = self.eval_expr(value)?;
                let result = self.inplace_binary_op(current, op, rhs)?;
                self.set_attr(object, attr, result)
            }
            UnpackTarget::Subscript { object, index, .. } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                let current = self.get_item(object, index)?;
                let rhs = self.eval_expr(value)?;
                let result = self.inplace_binary_op(current, op, rhs)?;
                self.set_item(object, index, result)
            }
            _ => Err(SimpleException::new_msg(
                ExcType::SyntaxError,
                "illegal target for augmented assignment",
            )
            .into()),
        }
    }

    /// `t op= e`: `__iadd__`-style mutation when available, else the plain
    /// binary operator. For lists, `+=` extends in place.
    fn inplace_binary_op(&mut self, current: Value, op: Operator, rhs: Value) -> RunResult<Value> {
        if let Value::Ref(id) = current {
            if matches!(self.heap.get(id), HeapData::List(_)) && op == Operator::Add {
                let extension = self.iterate_to_vec(rhs)?;
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list.items_mut().extend(extension),
                    _ => unreachable!("checked above"),
                }
                return Ok(current);
            }
            if matches!(self.heap.get(id), HeapData::Instance(_)) {
                if let Some(dunder) = op.inplace_dunder() {
                    if let Some(result) = self.call_dunder(current, dunder, ArgValues::one(rhs))? {
                        if !matches!(result, Value::NotImplemented) {
                            return Ok(result);
                        }
                    }
                }
            }
        }
        self.binary_op(current, op, rhs)
    }

    // --- functions and classes ---

    /// The scope a new function should close over: the innermost enclosing
    /// non-class scope. Class bodies observe their own bindings, but methods
    /// defined in them do not close over the class namespace.
    fn closure_scope(&self) -> HeapId {
        let mut cursor = self.current_scope();
        loop {
            let scope = self.scope(cursor);
            if scope.kind() != ScopeKind::Class {
                return cursor;
            }
            cursor = scope.parent().expect("class scope always has a parent");
        }
    }

    fn make_function(&mut self, def: &Rc<FunctionDef>) -> RunResult<Value> {
        // defaults are evaluated at definition time, in the defining scope
        let mut defaults = Vec::new();
        for param in def
            .signature
            .pos_only
            .iter()
            .chain(&def.signature.args)
            .chain(&def.signature.kw_only)
        {
            if let Some(default) = &param.default {
                defaults.push(self.eval_expr(default)?);
            }
        }
        let current = self.current_scope();
        let class_cell = if self.scope(current).kind() == ScopeKind::Class {
            self.scope(current).class_cell()
        } else {
            None
        };
        let function = Function {
            name: def.name.clone(),
            def: Rc::clone(def),
            signature: Signature::from_parsed(&def.signature),
            closure: self.closure_scope(),
            defaults,
            class_cell,
        };
        Ok(Value::Ref(self.heap.allocate(HeapData::Function(function))?))
    }

    fn apply_decorators(&mut self, decorators: &[ExprLoc], value: Value) -> RunResult<Value> {
        let mut result = value;
        for decorator in decorators.iter().rev() {
            let decorator_value = self.eval_expr(decorator)?;
            result = self.call_value(decorator_value, ArgValues::one(result))?;
        }
        Ok(result)
    }

    fn eval_class_def(&mut self, def: &ClassDef) -> RunResult<Value> {
        // resolve bases: user classes, the implicit root, or a built-in
        // exception type
        let mut base_ids = Vec::new();
        let mut builtin_base = None;
        for base_expr in &def.bases {
            let base = self.eval_expr(base_expr)?;
            match base {
                Value::Ref(id) if matches!(self.heap.get(id), HeapData::Class(_)) => base_ids.push(id),
                Value::Builtin(Builtins::Type(Type::Object)) => base_ids.push(self.object_class),
                Value::Builtin(Builtins::ExcType(exc_type)) => {
                    if builtin_base.is_none() {
                        builtin_base = Some(exc_type);
                    }
                }
                other => {
                    return Err(ExcType::type_error(format!(
                        "class base must be a class, not '{}'",
                        other.type_name(&self.heap)
                    )));
                }
            }
        }

        // the class body runs in a dedicated scope whose bindings become the
        // class namespace; the cell backs zero-arg super() in its methods
        let cell = self.heap.allocate(HeapData::Cell(Value::None))?;
        let parent = self.current_scope();
        let mut body_scope = Scope::new(ScopeKind::Class, Some(parent));
        body_scope.set_class_cell(cell);
        let scope_id = self.heap.allocate(HeapData::Scope(body_scope))?;
        self.scope_stack.push(scope_id);
        let body_result = self.eval_body(&def.body);
        self.scope_stack.pop();
        match body_result? {
            Flow::Normal => {}
            _ => {
                return Err(SimpleException::new_msg(ExcType::SyntaxError, "'return' outside function").into());
            }
        }
        let namespace = self.scope_mut(scope_id).take_bindings();

        let class = ClassObject::new(def.name.name.clone(), namespace, base_ids.clone());
        let class_id = self.heap.allocate(HeapData::Class(class))?;
        let mro = crate::types::compute_c3_mro(class_id, &base_ids, self.object_class, &self.heap)?;
        match self.heap.get_mut(class_id) {
            HeapData::Class(class) => {
                class.set_mro(mro);
                if let Some(exc_type) = builtin_base {
                    class.set_builtin_base(exc_type);
                }
            }
            _ => unreachable!("just allocated"),
        }
        // fill the __class__ cell so methods can resolve super()
        match self.heap.get_mut(cell) {
            HeapData::Cell(slot) => *slot = Value::Ref(class_id),
            _ => unreachable!("cell allocated above"),
        }
        self.apply_decorators(&def.decorators, Value::Ref(class_id))
    }

    // --- calls ---

    pub(crate) fn call_value(&mut self, callable: Value, args: ArgValues) -> RunResult<Value> {
        match callable {
            Value::Builtin(builtin) => builtin.call(self, args),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Function(_) => self.call_function(id, args),
                HeapData::BoundMethod(method) => {
                    let BoundMethod { func, receiver } = *method;
                    let mut args = args;
                    args.args.insert(0, receiver);
                    self.call_value(func, args)
                }
                HeapData::Class(_) => self.instantiate_class(id, args),
                HeapData::Instance(_) => {
                    let Some(call) = self.lookup_class_attr_of_instance(id, "__call__") else {
                        return Err(ExcType::type_error_not_callable(
                            Value::Ref(id).type_name(&self.heap),
                        ));
                    };
                    let mut args = args;
                    args.args.insert(0, Value::Ref(id));
                    self.call_value(call, args)
                }
                data => Err(ExcType::type_error_not_callable(data.type_of())),
            },
            other => Err(ExcType::type_error_not_callable(other.type_name(&self.heap))),
        }
    }

    fn call_function(&mut self, func_id: HeapId, args: ArgValues) -> RunResult<Value> {
        let (name, def, signature, closure, defaults) = match self.heap.get(func_id) {
            HeapData::Function(function) => (
                function.name.clone(),
                Rc::clone(&function.def),
                function.signature.clone(),
                function.closure,
                function.defaults.clone(),
            ),
            _ => return Err(RunError::internal("call_function on non-function")),
        };
        self.heap.tracker.check_recursion_depth(self.frames.len() + 1)?;
        let bound = signature.bind(&name, &defaults, args.args.into_vec(), args.kwargs, &mut self.heap)?;
        let first_arg = bound.first().map(|(_, value)| *value);

        let mut scope = Scope::new(ScopeKind::Function, Some(closure));
        for (param, value) in bound {
            scope.set(param, value);
        }
        let scope_id = self.heap.allocate(HeapData::Scope(scope))?;
        self.scope_stack.push(scope_id);
        self.frames.push(Frame {
            function: func_id,
            first_arg,
        });
        let result = self.eval_body(&def.body);
        self.frames.pop();
        self.scope_stack.pop();
        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::None),
            Flow::Break | Flow::Continue => Err(RunError::internal("loop control flow escaped function body")),
        }
    }

    /// Calling a class: create the instance, then run `__init__` from the
    /// MRO. The instance is the call's value regardless of `__init__`.
    fn instantiate_class(&mut self, class_id: HeapId, args: ArgValues) -> RunResult<Value> {
        let instance = Instance::new(class_id);
        let instance_value = Value::Ref(self.heap.allocate(HeapData::Instance(instance))?);
        let init = self.lookup_class_attr(class_id, "__init__").map(|(value, _)| value);
        match init {
            Some(init) => {
                let mut args = args;
                args.args.insert(0, instance_value);
                self.call_value(init, args)?;
            }
            None => {
                if self.builtin_base_of_class(class_id).is_some() {
                    // exception classes accept arguments without __init__
                    let items: Vec<Value> = args.args.into_vec();
                    let tuple = self.heap.new_tuple(items)?;
                    if let Value::Ref(id) = instance_value {
                        match self.heap.get_mut(id) {
                            HeapData::Instance(instance) => instance.set_attr("args".to_owned(), tuple),
                            _ => unreachable!("instance allocated above"),
                        }
                    }
                } else if !args.args.is_empty() || !args.kwargs.is_empty() {
                    let name = match self.heap.get(class_id) {
                        HeapData::Class(class) => class.name().to_owned(),
                        _ => "object".to_owned(),
                    };
                    return Err(ExcType::type_error(format!("{name}() takes no arguments")));
                }
            }
        }
        Ok(instance_value)
    }

    /// Zero-argument `super()` (and the explicit `super(C, obj)` form).
    pub(crate) fn call_zero_arg_super(&mut self, args: ArgValues) -> RunResult<Value> {
        args.check_no_kwargs("super")?;
        let (start_class, receiver) = match args.args.len() {
            0 => {
                let frame = self
                    .frames
                    .last()
                    .copied()
                    .ok_or_else(|| SimpleException::new_msg(ExcType::RuntimeError, "super(): no current frame"))?;
                let class_cell = match self.heap.get(frame.function) {
                    HeapData::Function(function) => function.class_cell,
                    _ => None,
                };
                let cell = class_cell.ok_or_else(|| {
                    SimpleException::new_msg(ExcType::RuntimeError, "super(): __class__ cell not found")
                })?;
                let class_value = match self.heap.get(cell) {
                    HeapData::Cell(value) => *value,
                    _ => Value::None,
                };
                let Value::Ref(class_id) = class_value else {
                    return Err(
                        SimpleException::new_msg(ExcType::RuntimeError, "super(): __class__ cell not set").into(),
                    );
                };
                let receiver = frame
                    .first_arg
                    .ok_or_else(|| SimpleException::new_msg(ExcType::RuntimeError, "super(): no arguments"))?;
                (class_id, receiver)
            }
            2 => {
                let mut args = args.args.into_iter();
                let class_value = args.next().expect("length checked");
                let receiver = args.next().expect("length checked");
                let Value::Ref(class_id) = class_value else {
                    return Err(ExcType::type_error("super() argument 1 must be a type"));
                };
                if !matches!(self.heap.get(class_id), HeapData::Class(_)) {
                    return Err(ExcType::type_error("super() argument 1 must be a type"));
                }
                (class_id, receiver)
            }
            n => return Err(ExcType::type_error_at_most("super", 2, n)),
        };
        let proxy = SuperProxy {
            start_class,
            receiver,
        };
        Ok(Value::Ref(self.heap.allocate(HeapData::Super(proxy))?))
    }

    // --- attribute protocol ---

    /// Walks the MRO of a class looking for `name`; returns the value and
    /// the class that defines it.
    fn lookup_class_attr(&self, class_id: HeapId, name: &str) -> Option<(Value, HeapId)> {
        let mro = match self.heap.get(class_id) {
            HeapData::Class(class) => class.mro().to_vec(),
            _ => return None,
        };
        for id in mro {
            if let HeapData::Class(class) = self.heap.get(id) {
                if let Some(value) = class.get_attr(name) {
                    return Some((value, id));
                }
            }
        }
        None
    }

    fn lookup_class_attr_of_instance(&self, instance_id: HeapId, name: &str) -> Option<Value> {
        let class = match self.heap.get(instance_id) {
            HeapData::Instance(instance) => instance.class(),
            _ => return None,
        };
        self.lookup_class_attr(class, name).map(|(value, _)| value)
    }

    /// Whether a class-level attribute value is a data descriptor (a
    /// property with a setter).
    fn is_data_descriptor(&self, value: Value) -> bool {
        matches!(
            value,
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::Property(p) if p.is_data_descriptor())
        )
    }

    pub(crate) fn get_attr(&mut self, object: Value, name: &str) -> RunResult<Value> {
        match object {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Instance(instance) => {
                    let class_id = instance.class();
                    let instance_attr = instance.get_attr(name);
                    let class_attr = self.lookup_class_attr(class_id, name);
                    if let Some((class_value, _)) = class_attr {
                        if self.is_data_descriptor(class_value) {
                            return self.invoke_property_get(class_value, object, name);
                        }
                    }
                    if let Some(value) = instance_attr {
                        return Ok(value);
                    }
                    match class_attr {
                        Some((class_value, _)) => self.bind_class_attr(class_value, object, Value::Ref(class_id), name),
                        None => Err(ExcType::attribute_error(object.type_name(&self.heap), name)),
                    }
                }
                HeapData::Class(class) => {
                    match name {
                        "__name__" => {
                            let class_name = class.name().to_owned();
                            return self.heap.new_str(class_name);
                        }
                        "__mro__" => {
                            let mro: Vec<Value> = class.mro().iter().map(|id| Value::Ref(*id)).collect();
                            return self.heap.new_tuple(mro);
                        }
                        _ => {}
                    }
                    match self.lookup_class_attr(id, name) {
                        Some((value, _)) => match value {
                            Value::Ref(inner) => match self.heap.get(inner) {
                                // classmethods bind the class; staticmethods
                                // unwrap; functions and properties are
                                // returned as-is on the class
                                HeapData::ClassMethod(func) => {
                                    let func = *func;
                                    let method = BoundMethod {
                                        func,
                                        receiver: object,
                                    };
                                    Ok(Value::Ref(self.heap.allocate(HeapData::BoundMethod(method))?))
                                }
                                HeapData::StaticMethod(func) => Ok(*func),
                                _ => Ok(value),
                            },
                            _ => Ok(value),
                        },
                        None => Err(ExcType::attribute_error(
                            format!("type[{}]", class.name()),
                            name,
                        )),
                    }
                }
                HeapData::Super(proxy) => {
                    let proxy = *proxy;
                    self.super_get_attr(proxy, name)
                }
                HeapData::Exception(exc) => match name {
                    "args" => {
                        let args: Vec<Value> = exc.args().to_vec();
                        self.heap.new_tuple(args)
                    }
                    _ => Err(ExcType::attribute_error(object.type_name(&self.heap), name)),
                },
                HeapData::Function(function) => match name {
                    "__name__" => {
                        let function_name = function.name.clone();
                        self.heap.new_str(function_name)
                    }
                    _ => Err(ExcType::attribute_error("function", name)),
                },
                HeapData::Property(_) => {
                    // .setter / .getter / .deleter registration
                    if matches!(name, "getter" | "setter" | "deleter") {
                        let method = match name {
                            "getter" => "getter",
                            "setter" => "setter",
                            _ => "deleter",
                        };
                        let bound = BoundMethod {
                            func: Value::Builtin(Builtins::TypeMethod {
                                ty: Type::Property,
                                method,
                            }),
                            receiver: object,
                        };
                        return Ok(Value::Ref(self.heap.allocate(HeapData::BoundMethod(bound))?));
                    }
                    Err(ExcType::attribute_error("property", name))
                }
                data => {
                    // native method tables of the built-in types
                    let ty = data.type_of();
                    if let Some(method) = builtins::type_method(ty, name) {
                        let bound = BoundMethod {
                            func: Value::Builtin(Builtins::TypeMethod { ty, method }),
                            receiver: object,
                        };
                        return Ok(Value::Ref(self.heap.allocate(HeapData::BoundMethod(bound))?));
                    }
                    Err(ExcType::attribute_error(ty, name))
                }
            },
            Value::Builtin(Builtins::Type(ty)) => match name {
                "__name__" => self.heap.new_str(ty.to_string()),
                _ => match builtins::type_method(ty, name) {
                    Some(method) => Ok(Value::Builtin(Builtins::TypeMethod { ty, method })),
                    None => Err(ExcType::attribute_error(format!("type[{ty}]"), name)),
                },
            },
            Value::Builtin(Builtins::ExcType(exc_type)) => match name {
                "__name__" => self.heap.new_str(exc_type.to_string()),
                _ => Err(ExcType::attribute_error(format!("type[{exc_type}]"), name)),
            },
            _ => {
                let ty = object.type_of(&self.heap);
                if let Some(method) = builtins::type_method(ty, name) {
                    let bound = BoundMethod {
                        func: Value::Builtin(Builtins::TypeMethod { ty, method }),
                        receiver: object,
                    };
                    return Ok(Value::Ref(self.heap.allocate(HeapData::BoundMethod(bound))?));
                }
                Err(ExcType::attribute_error(object.type_name(&self.heap), name))
            }
        }
    }

    /// Processes a class-level attribute found during instance lookup:
    /// functions become bound methods, properties invoke their getter,
    /// classmethod/staticmethod unwrap, plain values pass through.
    fn bind_class_attr(
        &mut self,
        class_value: Value,
        instance: Value,
        class_of_instance: Value,
        name: &str,
    ) -> RunResult<Value> {
        match class_value {
            Value::Ref(inner) => match self.heap.get(inner) {
                HeapData::Function(_) => {
                    let method = BoundMethod {
                        func: class_value,
                        receiver: instance,
                    };
                    Ok(Value::Ref(self.heap.allocate(HeapData::BoundMethod(method))?))
                }
                HeapData::Property(_) => self.invoke_property_get(class_value, instance, name),
                HeapData::ClassMethod(func) => {
                    let method = BoundMethod {
                        func: *func,
                        receiver: class_of_instance,
                    };
                    Ok(Value::Ref(self.heap.allocate(HeapData::BoundMethod(method))?))
                }
                HeapData::StaticMethod(func) => Ok(*func),
                _ => Ok(class_value),
            },
            _ => Ok(class_value),
        }
    }

    fn invoke_property_get(&mut self, property_value: Value, instance: Value, name: &str) -> RunResult<Value> {
        let Value::Ref(id) = property_value else {
            return Err(RunError::internal("property value is not a ref"));
        };
        let fget = match self.heap.get(id) {
            HeapData::Property(property) => property.fget,
            _ => return Err(RunError::internal("expected property")),
        };
        match fget {
            Some(fget) => self.call_value(fget, ArgValues::one(instance)),
            None => Err(SimpleException::new_msg(
                ExcType::AttributeError,
                format!("unreadable attribute '{name}'"),
            )
            .into()),
        }
    }

    fn super_get_attr(&mut self, proxy: SuperProxy, name: &str) -> RunResult<Value> {
        // method resolution starts after the defining class in the
        // receiver's MRO
        let receiver_class = match proxy.receiver {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Instance(instance) => instance.class(),
                _ => {
                    return Err(ExcType::type_error("super(): argument must be an instance"));
                }
            },
            _ => return Err(ExcType::type_error("super(): argument must be an instance")),
        };
        let mro = match self.heap.get(receiver_class) {
            HeapData::Class(class) => class.mro().to_vec(),
            _ => return Err(RunError::internal("instance class is not a class")),
        };
        let start = mro
            .iter()
            .position(|id| *id == proxy.start_class)
            .map_or(0, |index| index + 1);
        for class_id in &mro[start..] {
            let found = match self.heap.get(*class_id) {
                HeapData::Class(class) => class.get_attr(name),
                _ => None,
            };
            if let Some(value) = found {
                return self.bind_class_attr(value, proxy.receiver, Value::Ref(receiver_class), name);
            }
        }
        // chains ending at the implicit root: object's empty __init__
        if name == "__init__" {
            let method = BoundMethod {
                func: Value::Builtin(Builtins::Function(crate::builtins::BuiltinFunction::ObjectInit)),
                receiver: proxy.receiver,
            };
            return Ok(Value::Ref(self.heap.allocate(HeapData::BoundMethod(method))?));
        }
        Err(ExcType::attribute_error("super", name))
    }

    pub(crate) fn set_attr(&mut self, object: Value, name: &str, value: Value) -> RunResult<()> {
        match object {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Instance(instance) => {
                    let class_id = instance.class();
                    if let Some((class_value, _)) = self.lookup_class_attr(class_id, name) {
                        if let Value::Ref(prop_id) = class_value {
                            if let HeapData::Property(property) = self.heap.get(prop_id) {
                                return match property.fset {
                                    Some(fset) => {
                                        self.call_value(fset, ArgValues::two(object, value))?;
                                        Ok(())
                                    }
                                    None => Err(SimpleException::new_msg(
                                        ExcType::AttributeError,
                                        format!("property '{name}' has no setter"),
                                    )
                                    .into()),
                                };
                            }
                        }
                    }
                    match self.heap.get_mut(id) {
                        HeapData::Instance(instance) => {
                            instance.set_attr(name.to_owned(), value);
                            Ok(())
                        }
                        _ => unreachable!("checked above"),
                    }
                }
                HeapData::Class(_) => {
                    match self.heap.get_mut(id) {
                        HeapData::Class(class) => {
                            class.set_attr(name.to_owned(), value);
                            Ok(())
                        }
                        _ => unreachable!("checked above"),
                    }
                }
                data => Err(ExcType::type_error(format!(
                    "'{}' object has no settable attributes",
                    data.type_of()
                ))),
            },
            _ => Err(ExcType::type_error(format!(
                "'{}' object has no settable attributes",
                object.type_name(&self.heap)
            ))),
        }
    }

    fn delete_attr(&mut self, object: Value, name: &str) -> RunResult<()> {
        match object {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Instance(instance) => {
                    let class_id = instance.class();
                    if let Some((class_value, _)) = self.lookup_class_attr(class_id, name) {
                        if let Value::Ref(prop_id) = class_value {
                            if let HeapData::Property(property) = self.heap.get(prop_id) {
                                return match property.fdel {
                                    Some(fdel) => {
                                        self.call_value(fdel, ArgValues::one(object))?;
                                        Ok(())
                                    }
                                    None => Err(SimpleException::new_msg(
                                        ExcType::AttributeError,
                                        format!("property '{name}' has no deleter"),
                                    )
                                    .into()),
                                };
                            }
                        }
                    }
                    let type_name = object.type_name(&self.heap);
                    match self.heap.get_mut(id) {
                        HeapData::Instance(instance) => {
                            if instance.delete_attr(name) {
                                Ok(())
                            } else {
                                Err(ExcType::attribute_error(type_name, name))
                            }
                        }
                        _ => unreachable!("checked above"),
                    }
                }
                _ => Err(ExcType::attribute_error(object.type_name(&self.heap), name)),
            },
            _ => Err(ExcType::attribute_error(object.type_name(&self.heap), name)),
        }
    }

    /// Method-call fast path for `obj.method(args)`: built-in receivers
    /// dispatch straight into their native method tables without
    /// materializing a bound method.
    pub(crate) fn call_attr(&mut self, object: Value, name: &str, args: ArgValues) -> RunResult<Value> {
        if let Value::Ref(id) = object {
            let ty = self.heap.get(id).type_of();
            match ty {
                Type::List | Type::Tuple | Type::Dict | Type::Set | Type::Str | Type::Property => {
                    return self.call_builtin_method(object, ty, name, args);
                }
                _ => {}
            }
        }
        let callee = self.get_attr(object, name)?;
        self.call_value(callee, args)
    }

    // --- operator dispatch ---

    fn is_instance_value(&self, value: Value) -> bool {
        matches!(value, Value::Ref(id) if matches!(self.heap.get(id), HeapData::Instance(_)))
    }

    /// Looks up a dunder on `type(obj)` (not the instance) and calls it.
    /// `None` means the method is missing; the caller inspects the result
    /// for `NotImplemented`.
    fn call_dunder(&mut self, object: Value, name: &str, args: ArgValues) -> RunResult<Option<Value>> {
        let Value::Ref(id) = object else {
            return Ok(None);
        };
        let Some(method) = self.lookup_class_attr_of_instance(id, name) else {
            return Ok(None);
        };
        let mut args = args;
        args.args.insert(0, object);
        Ok(Some(self.call_value(method, args)?))
    }

    pub(crate) fn binary_op(&mut self, left: Value, op: Operator, right: Value) -> RunResult<Value> {
        let left_is_instance = self.is_instance_value(left);
        let right_is_instance = self.is_instance_value(right);
        if !left_is_instance && !right_is_instance {
            if let Some(result) = self.builtin_binary(left, op, right)? {
                return Ok(result);
            }
            return Err(self.binary_type_error(left, op, right));
        }
        let (dunder, reflected) = op.dunders();
        if left_is_instance {
            if let Some(result) = self.call_dunder(left, dunder, ArgValues::one(right))? {
                if !matches!(result, Value::NotImplemented) {
                    return Ok(result);
                }
            }
        }
        if right_is_instance {
            if let Some(result) = self.call_dunder(right, reflected, ArgValues::one(left))? {
                if !matches!(result, Value::NotImplemented) {
                    return Ok(result);
                }
            }
        }
        Err(self.binary_type_error(left, op, right))
    }

    fn binary_type_error(&self, left: Value, op: Operator, right: Value) -> RunError {
        ExcType::type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(&self.heap),
            right.type_name(&self.heap)
        ))
    }

    /// The native behavior of the binary operators on built-in values;
    /// `None` when the combination is not supported.
    fn builtin_binary(&mut self, left: Value, op: Operator, right: Value) -> RunResult<Option<Value>> {
        // numbers (bool counts as int)
        if let (Some(l), Some(r)) = (numeric_of(&self.heap, left), numeric_of(&self.heap, right)) {
            let result = if op == Operator::Div {
                true_divide(&l, &r)?
            } else {
                binary_number_op(op, &l, &r)?
            };
            return Ok(Some(num_to_value(&mut self.heap, result)?));
        }
        let (Value::Ref(left_id), op) = (left, op) else {
            return self.builtin_binary_mixed(left, op, right);
        };
        // same-type container operators
        if let Value::Ref(right_id) = right {
            let result = match (self.heap.get(left_id), op, self.heap.get(right_id)) {
                (HeapData::Str(a), Operator::Add, HeapData::Str(b)) => {
                    let joined = format!("{a}{b}");
                    Some(self.heap.new_str(joined)?)
                }
                (HeapData::List(a), Operator::Add, HeapData::List(b)) => {
                    let mut items = a.items().to_vec();
                    items.extend_from_slice(b.items());
                    Some(self.heap.new_list(items)?)
                }
                (HeapData::Tuple(a), Operator::Add, HeapData::Tuple(b)) => {
                    let mut items = a.items().to_vec();
                    items.extend_from_slice(b.items());
                    Some(self.heap.new_tuple(items)?)
                }
                (HeapData::Set(a), Operator::BitOr, HeapData::Set(b)) => {
                    let result = a.union_with(b);
                    Some(self.heap.new_set(result)?)
                }
                (HeapData::Set(a), Operator::BitAnd, HeapData::Set(b)) => {
                    let result = a.intersection_with(b);
                    Some(self.heap.new_set(result)?)
                }
                (HeapData::Set(a), Operator::Sub, HeapData::Set(b)) => {
                    let result = a.difference_with(b);
                    Some(self.heap.new_set(result)?)
                }
                (HeapData::Set(a), Operator::BitXor, HeapData::Set(b)) => {
                    let result = a.symmetric_difference_with(b);
                    Some(self.heap.new_set(result)?)
                }
                _ => None,
            };
            if result.is_some() {
                return Ok(result);
            }
        }
        self.builtin_binary_mixed(left, op, right)
    }

    /// Sequence repetition (`seq * n`, `n * seq`); `None` for everything
    /// else.
    fn builtin_binary_mixed(&mut self, left: Value, op: Operator, right: Value) -> RunResult<Option<Value>> {
        if op != Operator::Mult {
            return Ok(None);
        }
        let (seq, count) = match (left, right) {
            (Value::Ref(_), Value::Int(_) | Value::Bool(_)) => {
                let n = match right {
                    Value::Int(n) => n,
                    Value::Bool(b) => i64::from(b),
                    _ => unreachable!("matched above"),
                };
                (left, n)
            }
            (Value::Int(n), Value::Ref(_)) => (right, n),
            (Value::Bool(b), Value::Ref(_)) => (right, i64::from(b)),
            _ => return Ok(None),
        };
        let Value::Ref(id) = seq else {
            return Ok(None);
        };
        // n <= 0 yields an empty sequence; repetition is shallow, so
        // repeated heap elements alias
        let count = count.max(0) as usize;
        let result = match self.heap.get(id) {
            HeapData::Str(text) => {
                let repeated = text.repeat(count);
                Some(self.heap.new_str(repeated)?)
            }
            HeapData::List(list) => {
                let items = repeat_items(list.items(), count);
                Some(self.heap.new_list(items)?)
            }
            HeapData::Tuple(tuple) => {
                let items = repeat_items(tuple.items(), count);
                Some(self.heap.new_tuple(items)?)
            }
            _ => None,
        };
        Ok(result)
    }

    // --- comparison protocol ---

    pub(crate) fn compare_op(&mut self, op: CmpOperator, left: Value, right: Value) -> RunResult<bool> {
        match op {
            CmpOperator::Is => Ok(left.is_same(&right)),
            CmpOperator::IsNot => Ok(!left.is_same(&right)),
            CmpOperator::Eq => self.py_eq(left, right),
            CmpOperator::NotEq => Ok(!self.py_eq(left, right)?),
            CmpOperator::In => self.py_contains(right, left),
            CmpOperator::NotIn => Ok(!self.py_contains(right, left)?),
            CmpOperator::Lt => self.py_ordering(left, right, op),
            CmpOperator::LtE => self.py_ordering(left, right, op),
            CmpOperator::Gt => self.py_ordering(left, right, op),
            CmpOperator::GtE => self.py_ordering(left, right, op),
        }
    }

    /// Equality via the `__eq__` protocol, with structural equality for the
    /// built-in containers and identity as the final fallback for instances.
    pub(crate) fn py_eq(&mut self, left: Value, right: Value) -> RunResult<bool> {
        self.py_eq_depth(left, right, 0)
    }

    fn py_eq_depth(&mut self, left: Value, right: Value, depth: usize) -> RunResult<bool> {
        if depth > MAX_DATA_RECURSION_DEPTH {
            return Err(SimpleException::new_msg(
                ExcType::RuntimeError,
                "maximum recursion depth exceeded in comparison",
            )
            .into());
        }
        if left.is_same(&right) {
            // NaN != NaN even though the values are identical
            if let Value::Float(f) = left {
                return Ok(!f.is_nan());
            }
            return Ok(true);
        }
        if let (Some(l), Some(r)) = (numeric_of(&self.heap, left), numeric_of(&self.heap, right)) {
            return Ok(compare_numbers(&l, &r) == Some(std::cmp::Ordering::Equal));
        }
        if self.is_instance_value(left) || self.is_instance_value(right) {
            if let Some(result) = self.call_dunder(left, "__eq__", ArgValues::one(right))? {
                if !matches!(result, Value::NotImplemented) {
                    return self.py_bool(result);
                }
            }
            if let Some(result) = self.call_dunder(right, "__eq__", ArgValues::one(left))? {
                if !matches!(result, Value::NotImplemented) {
                    return self.py_bool(result);
                }
            }
            return Ok(false);
        }
        let (Value::Ref(left_id), Value::Ref(right_id)) = (left, right) else {
            return Ok(false);
        };
        match (self.heap.get(left_id), self.heap.get(right_id)) {
            (HeapData::Str(a), HeapData::Str(b)) => Ok(a == b),
            (HeapData::List(a), HeapData::List(b)) => {
                let (a, b) = (a.items().to_vec(), b.items().to_vec());
                self.sequence_eq(&a, &b, depth)
            }
            (HeapData::Tuple(a), HeapData::Tuple(b)) => {
                let (a, b) = (a.items().to_vec(), b.items().to_vec());
                self.sequence_eq(&a, &b, depth)
            }
            (HeapData::Dict(a), HeapData::Dict(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                let pairs: Vec<(Value, Value)> = a.iter().collect();
                for (key_value, value) in pairs {
                    let key = Key::from_value(&self.heap, key_value)?;
                    let other_value = match self.heap.get(right_id) {
                        HeapData::Dict(b) => b.get(&key),
                        _ => None,
                    };
                    match other_value {
                        Some(other_value) => {
                            if !self.py_eq_depth(value, other_value, depth + 1)? {
                                return Ok(false);
                            }
                        }
                        None => return Ok(false),
                    }
                }
                Ok(true)
            }
            (HeapData::Set(a), HeapData::Set(b)) => Ok(a.set_eq(b)),
            (HeapData::Range(a), HeapData::Range(b)) => {
                Ok(a.start == b.start && a.stop == b.stop && a.step == b.step)
            }
            _ => Ok(false),
        }
    }

    fn sequence_eq(&mut self, a: &[Value], b: &[Value], depth: usize) -> RunResult<bool> {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (x, y) in a.iter().zip(b) {
            if !self.py_eq_depth(*x, *y, depth + 1)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `<`-family comparison: numbers, strings, lexicographic sequences, and
    /// the rich-comparison dunders for instances.
    fn py_ordering(&mut self, left: Value, right: Value, op: CmpOperator) -> RunResult<bool> {
        if self.is_instance_value(left) || self.is_instance_value(right) {
            let (dunder, reflected) = match op {
                CmpOperator::Lt => ("__lt__", "__gt__"),
                CmpOperator::LtE => ("__le__", "__ge__"),
                CmpOperator::Gt => ("__gt__", "__lt__"),
                CmpOperator::GtE => ("__ge__", "__le__"),
                _ => unreachable!("ordering operators only"),
            };
            if let Some(result) = self.call_dunder(left, dunder, ArgValues::one(right))? {
                if !matches!(result, Value::NotImplemented) {
                    return self.py_bool(result);
                }
            }
            if let Some(result) = self.call_dunder(right, reflected, ArgValues::one(left))? {
                if !matches!(result, Value::NotImplemented) {
                    return self.py_bool(result);
                }
            }
            return Err(self.ordering_type_error(op, left, right));
        }
        match self.partial_cmp_values(left, right, 0)? {
            Some(ordering) => Ok(match op {
                CmpOperator::Lt => ordering == std::cmp::Ordering::Less,
                CmpOperator::LtE => ordering != std::cmp::Ordering::Greater,
                CmpOperator::Gt => ordering == std::cmp::Ordering::Greater,
                CmpOperator::GtE => ordering != std::cmp::Ordering::Less,
                _ => unreachable!("ordering operators only"),
            }),
            None => Err(self.ordering_type_error(op, left, right)),
        }
    }

    fn ordering_type_error(&self, op: CmpOperator, left: Value, right: Value) -> RunError {
        ExcType::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            left.type_name(&self.heap),
            right.type_name(&self.heap)
        ))
    }

    /// Total order on comparable built-ins; `None` when incomparable.
    fn partial_cmp_values(
        &mut self,
        left: Value,
        right: Value,
        depth: usize,
    ) -> RunResult<Option<std::cmp::Ordering>> {
        if depth > MAX_DATA_RECURSION_DEPTH {
            return Err(SimpleException::new_msg(
                ExcType::RuntimeError,
                "maximum recursion depth exceeded in comparison",
            )
            .into());
        }
        if let (Some(l), Some(r)) = (numeric_of(&self.heap, left), numeric_of(&self.heap, right)) {
            return Ok(compare_numbers(&l, &r));
        }
        let (Value::Ref(left_id), Value::Ref(right_id)) = (left, right) else {
            return Ok(None);
        };
        // user elements inside sequences compare through the full protocol
        if self.is_instance_value(left) && self.is_instance_value(right) {
            if self.py_eq(left, right)? {
                return Ok(Some(std::cmp::Ordering::Equal));
            }
            if self.py_ordering(left, right, CmpOperator::Lt)? {
                return Ok(Some(std::cmp::Ordering::Less));
            }
            return Ok(Some(std::cmp::Ordering::Greater));
        }
        let (a, b): (Vec<Value>, Vec<Value>) = match (self.heap.get(left_id), self.heap.get(right_id)) {
            (HeapData::Str(a), HeapData::Str(b)) => return Ok(Some(a.cmp(b))),
            (HeapData::List(a), HeapData::List(b)) => (a.items().to_vec(), b.items().to_vec()),
            (HeapData::Tuple(a), HeapData::Tuple(b)) => (a.items().to_vec(), b.items().to_vec()),
            _ => return Ok(None),
        };
        for (x, y) in a.iter().zip(&b) {
            if !self.py_eq_depth(*x, *y, depth + 1)? {
                return self.partial_cmp_values(*x, *y, depth + 1);
            }
        }
        Ok(Some(a.len().cmp(&b.len())))
    }

    /// The `in` operator: `__contains__`, with iteration as the fallback.
    fn py_contains(&mut self, container: Value, item: Value) -> RunResult<bool> {
        if let Value::Ref(id) = container {
            match self.heap.get(id) {
                HeapData::Dict(dict) => {
                    let key = Key::from_value(&self.heap, item)?;
                    return Ok(dict.contains(&key));
                }
                HeapData::Set(_) => {
                    let key = Key::from_value(&self.heap, item)?;
                    let contains = match self.heap.get(id) {
                        HeapData::Set(set) => set.contains(&key),
                        _ => unreachable!("checked above"),
                    };
                    return Ok(contains);
                }
                HeapData::Str(text) => {
                    let text = text.clone();
                    let Some(needle) = self.heap.str_value(item) else {
                        return Err(ExcType::type_error(format!(
                            "'in <string>' requires string as left operand, not '{}'",
                            item.type_name(&self.heap)
                        )));
                    };
                    return Ok(text.contains(needle));
                }
                HeapData::Range(range) => {
                    let range = *range;
                    return match numeric_of(&self.heap, item) {
                        Some(PyNum::Int(i)) => Ok(range.contains(i)),
                        _ => Ok(false),
                    };
                }
                HeapData::Instance(_) => {
                    if let Some(result) = self.call_dunder(container, "__contains__", ArgValues::one(item))? {
                        return self.py_bool(result);
                    }
                    // fall through to iteration
                }
                HeapData::List(_) | HeapData::Tuple(_) | HeapData::Iter(_) => {}
                data => {
                    return Err(ExcType::type_error(format!(
                        "argument of type '{}' is not iterable",
                        data.type_of()
                    )));
                }
            }
            let iterator = self.get_iter(container)?;
            self.temp_roots.push(iterator);
            let result = loop {
                match self.iter_next(iterator) {
                    Ok(Some(element)) => match self.py_eq(element, item) {
                        Ok(true) => break Ok(true),
                        Ok(false) => {}
                        Err(err) => break Err(err),
                    },
                    Ok(None) => break Ok(false),
                    Err(err) => break Err(err),
                }
            };
            self.temp_roots.pop();
            return result;
        }
        Err(ExcType::type_error(format!(
            "argument of type '{}' is not iterable",
            container.type_name(&self.heap)
        )))
    }

    // --- truthiness, length, text ---

    pub(crate) fn py_bool(&mut self, value: Value) -> RunResult<bool> {
        if let Some(truthy) = value.builtin_truthy(&self.heap) {
            return Ok(truthy);
        }
        if let Some(result) = self.call_dunder(value, "__bool__", ArgValues::empty())? {
            return match result {
                Value::Bool(b) => Ok(b),
                other => Err(ExcType::type_error(format!(
                    "__bool__ should return bool, returned {}",
                    other.type_name(&self.heap)
                ))),
            };
        }
        if let Some(result) = self.call_dunder(value, "__len__", ArgValues::empty())? {
            return Ok(result.as_index(&self.heap)? != 0);
        }
        Ok(true)
    }

    fn eval_truthy(&mut self, expr: &ExprLoc) -> RunResult<bool> {
        let value = self.eval_expr(expr)?;
        self.py_bool(value)
    }

    pub(crate) fn py_len(&mut self, value: Value) -> RunResult<usize> {
        if let Value::Ref(id) = value {
            let len = match self.heap.get(id) {
                HeapData::Str(text) => Some(char_count(text)),
                HeapData::List(list) => Some(list.len()),
                HeapData::Tuple(tuple) => Some(tuple.len()),
                HeapData::Dict(dict) => Some(dict.len()),
                HeapData::Set(set) => Some(set.len()),
                HeapData::Range(range) => Some(range.len()),
                _ => None,
            };
            if let Some(len) = len {
                return Ok(len);
            }
            if let Some(result) = self.call_dunder(value, "__len__", ArgValues::empty())? {
                let len = result.as_index(&self.heap)?;
                if len < 0 {
                    return Err(ExcType::value_error("__len__() should return >= 0"));
                }
                return Ok(len as usize);
            }
        }
        Err(ExcType::type_error(format!(
            "object of type '{}' has no len()",
            value.type_name(&self.heap)
        )))
    }

    pub(crate) fn py_str(&mut self, value: Value) -> RunResult<String> {
        if let Value::Ref(id) = value {
            match self.heap.get(id) {
                HeapData::Str(text) => return Ok(text.clone()),
                HeapData::Instance(instance) => {
                    let class_id = instance.class();
                    if let Some(result) = self.call_dunder(value, "__str__", ArgValues::empty())? {
                        return match self.heap.str_value(result) {
                            Some(text) => Ok(text.to_owned()),
                            None => Err(ExcType::type_error("__str__ returned non-string")),
                        };
                    }
                    // exception instances render their args
                    if self.builtin_base_of_class(class_id).is_some() {
                        if let Some(args) = self.exception_args_of_instance(id) {
                            return match args.len() {
                                0 => Ok(String::new()),
                                1 => self.py_str(args[0]),
                                _ => {
                                    let tuple = self.heap.new_tuple(args)?;
                                    self.py_repr(tuple)
                                }
                            };
                        }
                    }
                }
                HeapData::Exception(exc) => {
                    let args: Vec<Value> = exc.args().to_vec();
                    return match args.len() {
                        0 => Ok(String::new()),
                        1 => self.py_str(args[0]),
                        _ => {
                            let tuple = self.heap.new_tuple(args)?;
                            self.py_repr(tuple)
                        }
                    };
                }
                _ => {}
            }
        }
        self.py_repr(value)
    }

    pub(crate) fn py_repr(&mut self, value: Value) -> RunResult<String> {
        self.py_repr_depth(value, 0)
    }

    fn py_repr_depth(&mut self, value: Value, depth: usize) -> RunResult<String> {
        if depth > MAX_DATA_RECURSION_DEPTH {
            return Ok("...".to_owned());
        }
        match value {
            Value::None => Ok("None".to_owned()),
            Value::Bool(true) => Ok("True".to_owned()),
            Value::Bool(false) => Ok("False".to_owned()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(float_repr(f)),
            Value::NotImplemented => Ok("NotImplemented".to_owned()),
            Value::Builtin(builtin) => Ok(builtin.repr()),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Str(text) => Ok(string_repr(text)),
                HeapData::LongInt(big) => Ok(big.to_string()),
                HeapData::List(list) => {
                    let items = list.items().to_vec();
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        parts.push(self.py_repr_depth(item, depth + 1)?);
                    }
                    Ok(format!("[{}]", parts.join(", ")))
                }
                HeapData::Tuple(tuple) => {
                    let items = tuple.items().to_vec();
                    let mut parts = Vec::with_capacity(items.len());
                    for item in &items {
                        parts.push(self.py_repr_depth(*item, depth + 1)?);
                    }
                    if items.len() == 1 {
                        Ok(format!("({},)", parts[0]))
                    } else {
                        Ok(format!("({})", parts.join(", ")))
                    }
                }
                HeapData::Dict(dict) => {
                    let pairs: Vec<(Value, Value)> = dict.iter().collect();
                    let mut parts = Vec::with_capacity(pairs.len());
                    for (key, value) in pairs {
                        let key_repr = self.py_repr_depth(key, depth + 1)?;
                        let value_repr = self.py_repr_depth(value, depth + 1)?;
                        parts.push(format!("{key_repr}: {value_repr}"));
                    }
                    Ok(format!("{{{}}}", parts.join(", ")))
                }
                HeapData::Set(set) => {
                    if set.is_empty() {
                        return Ok("set()".to_owned());
                    }
                    let items: Vec<Value> = set.iter().map(|(_, value)| value).collect();
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        parts.push(self.py_repr_depth(item, depth + 1)?);
                    }
                    Ok(format!("{{{}}}", parts.join(", ")))
                }
                HeapData::Range(range) => {
                    if range.step == 1 {
                        Ok(format!("range({}, {})", range.start, range.stop))
                    } else {
                        Ok(format!("range({}, {}, {})", range.start, range.stop, range.step))
                    }
                }
                HeapData::Slice(slice) => {
                    let parts = [slice.start, slice.stop, slice.step];
                    let mut rendered = Vec::with_capacity(3);
                    for part in parts {
                        rendered.push(self.py_repr_depth(part, depth + 1)?);
                    }
                    Ok(format!("slice({})", rendered.join(", ")))
                }
                HeapData::Function(function) => Ok(format!("<function {}>", function.name)),
                HeapData::BoundMethod(method) => {
                    let func = method.func;
                    let name = match func {
                        Value::Ref(func_id) => match self.heap.get(func_id) {
                            HeapData::Function(function) => function.name.clone(),
                            _ => "?".to_owned(),
                        },
                        Value::Builtin(Builtins::TypeMethod { method, .. }) => method.to_owned(),
                        _ => "?".to_owned(),
                    };
                    Ok(format!("<bound method {name}>"))
                }
                HeapData::Class(class) => Ok(format!("<class '{}'>", class.name())),
                HeapData::Instance(_) => {
                    if let Some(result) = self.call_dunder(value, "__repr__", ArgValues::empty())? {
                        return match self.heap.str_value(result) {
                            Some(text) => Ok(text.to_owned()),
                            None => Err(ExcType::type_error("__repr__ returned non-string")),
                        };
                    }
                    Ok(format!("<{} object>", value.type_name(&self.heap)))
                }
                HeapData::Super(_) => Ok("<super object>".to_owned()),
                HeapData::Property(_) => Ok("<property object>".to_owned()),
                HeapData::ClassMethod(_) => Ok("<classmethod object>".to_owned()),
                HeapData::StaticMethod(_) => Ok("<staticmethod object>".to_owned()),
                HeapData::Iter(_) => Ok("<iterator object>".to_owned()),
                HeapData::Cell(_) | HeapData::Scope(_) => Ok("<internal object>".to_owned()),
                HeapData::Exception(exc) => {
                    let name = exc.class_name(&self.heap).into_owned();
                    let args: Vec<Value> = exc.args().to_vec();
                    let mut parts = Vec::with_capacity(args.len());
                    for arg in args {
                        parts.push(self.py_repr_depth(arg, depth + 1)?);
                    }
                    Ok(format!("{name}({})", parts.join(", ")))
                }
            },
        }
    }

    /// `type(x)` as a value: the class for instances, the builtin tag
    /// otherwise.
    pub(crate) fn type_value_of(&self, value: Value) -> Value {
        match value {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Instance(instance) => Value::Ref(instance.class()),
                HeapData::Exception(exc) => match exc.class() {
                    Some(class) => Value::Ref(class),
                    None => Value::Builtin(Builtins::ExcType(exc.exc_type())),
                },
                HeapData::Class(_) => Value::Builtin(Builtins::Type(Type::Type)),
                data => Value::Builtin(Builtins::Type(data.type_of())),
            },
            _ => Value::Builtin(Builtins::Type(value.type_of(&self.heap))),
        }
    }

    // --- iteration protocol ---

    /// `iter(x)`: returns an iterator value, calling `__iter__` for user
    /// objects.
    pub(crate) fn get_iter(&mut self, value: Value) -> RunResult<Value> {
        if let Value::Ref(id) = value {
            let iter = match self.heap.get(id) {
                HeapData::Iter(_) => return Ok(value),
                HeapData::List(_) | HeapData::Tuple(_) => Some(Iter::Seq { seq: value, index: 0 }),
                HeapData::Str(_) => Some(Iter::Str { string: id, byte: 0 }),
                HeapData::Range(range) => Some(Iter::Range {
                    next: range.start,
                    stop: range.stop,
                    step: range.step,
                }),
                HeapData::Dict(_) => Some(Iter::DictKeys { dict: id, index: 0 }),
                HeapData::Set(_) => Some(Iter::Set { set: id, index: 0 }),
                HeapData::Instance(_) => None,
                _ => {
                    return Err(ExcType::type_error_not_iterable(value.type_name(&self.heap)));
                }
            };
            if let Some(iter) = iter {
                return self.heap.new_iter(iter);
            }
            // user object: __iter__ must return an iterator object
            if let Some(result) = self.call_dunder(value, "__iter__", ArgValues::empty())? {
                if matches!(result, Value::Ref(id) if matches!(self.heap.get(id), HeapData::Iter(_))) {
                    return Ok(result);
                }
                return self.heap.new_iter(Iter::User { obj: result });
            }
            return Err(ExcType::type_error_not_iterable(value.type_name(&self.heap)));
        }
        Err(ExcType::type_error_not_iterable(value.type_name(&self.heap)))
    }

    pub(crate) fn get_iter_id(&mut self, value: Value) -> RunResult<HeapId> {
        match self.get_iter(value)? {
            Value::Ref(id) => Ok(id),
            _ => Err(RunError::internal("iterator is not a heap value")),
        }
    }

    /// Advances an iterator; `Ok(None)` signals exhaustion.
    pub(crate) fn iter_next(&mut self, iterator: Value) -> RunResult<Option<Value>> {
        let Value::Ref(id) = iterator else {
            return Err(ExcType::type_error(format!(
                "'{}' object is not an iterator",
                iterator.type_name(&self.heap)
            )));
        };
        // snapshot the state in one borrow, compute, then write back
        enum Step {
            Seq(Value, usize),
            Str(HeapId, usize),
            Done(Option<Value>),
            Dict(HeapId, usize, DictPart),
            Set(HeapId, usize),
            Enumerate(HeapId, i64),
            Zip(Vec<HeapId>),
            Map(Value, Vec<HeapId>),
            Filter(Value, HeapId),
            User(Value),
        }
        enum DictPart {
            Keys,
            Values,
            Items,
        }
        let step = match self.heap.get_mut(id) {
            HeapData::Iter(iter) => match iter {
                Iter::Seq { seq, index } => {
                    let step = Step::Seq(*seq, *index);
                    *index += 1;
                    step
                }
                Iter::Str { string, byte } => Step::Str(*string, *byte),
                Iter::Range { next, stop, step } => {
                    let exhausted = if *step > 0 { *next >= *stop } else { *next <= *stop };
                    if exhausted {
                        Step::Done(None)
                    } else {
                        let value = *next;
                        *next += *step;
                        Step::Done(Some(Value::Int(value)))
                    }
                }
                Iter::DictKeys { dict, index } => {
                    let step = Step::Dict(*dict, *index, DictPart::Keys);
                    *index += 1;
                    step
                }
                Iter::DictValues { dict, index } => {
                    let step = Step::Dict(*dict, *index, DictPart::Values);
                    *index += 1;
                    step
                }
                Iter::DictItems { dict, index } => {
                    let step = Step::Dict(*dict, *index, DictPart::Items);
                    *index += 1;
                    step
                }
                Iter::Set { set, index } => {
                    let step = Step::Set(*set, *index);
                    *index += 1;
                    step
                }
                Iter::Elems { items, index } => {
                    let value = items.get(*index).copied();
                    *index += 1;
                    Step::Done(value)
                }
                Iter::Enumerate { inner, count } => {
                    let step = Step::Enumerate(*inner, *count);
                    *count += 1;
                    step
                }
                Iter::Zip { inners } => Step::Zip(inners.clone()),
                Iter::Map { func, inners } => Step::Map(*func, inners.clone()),
                Iter::Filter { func, inner } => Step::Filter(*func, *inner),
                Iter::User { obj } => Step::User(*obj),
            },
            data => {
                return Err(ExcType::type_error(format!(
                    "'{}' object is not an iterator",
                    data.type_of()
                )));
            }
        };
        match step {
            Step::Done(value) => Ok(value),
            Step::Seq(seq, index) => {
                let Value::Ref(seq_id) = seq else {
                    return Err(RunError::internal("sequence iterator over non-ref"));
                };
                let item = match self.heap.get(seq_id) {
                    HeapData::List(list) => list.items().get(index).copied(),
                    HeapData::Tuple(tuple) => tuple.items().get(index).copied(),
                    _ => None,
                };
                Ok(item)
            }
            Step::Str(string_id, byte) => {
                let c = match self.heap.get(string_id) {
                    HeapData::Str(text) => text[byte..].chars().next(),
                    _ => None,
                };
                match c {
                    Some(c) => {
                        match self.heap.get_mut(id) {
                            HeapData::Iter(Iter::Str { byte, .. }) => *byte += c.len_utf8(),
                            _ => unreachable!("iterator checked above"),
                        }
                        Ok(Some(self.heap.new_str(c.to_string())?))
                    }
                    None => Ok(None),
                }
            }
            Step::Dict(dict_id, index, part) => {
                let entry = match self.heap.get(dict_id) {
                    HeapData::Dict(dict) => dict.get_index(index),
                    _ => None,
                };
                match entry {
                    Some((key, value)) => match part {
                        DictPart::Keys => Ok(Some(key)),
                        DictPart::Values => Ok(Some(value)),
                        DictPart::Items => Ok(Some(self.heap.new_tuple(vec![key, value])?)),
                    },
                    None => Ok(None),
                }
            }
            Step::Set(set_id, index) => {
                let item = match self.heap.get(set_id) {
                    HeapData::Set(set) => set.get_index(index),
                    _ => None,
                };
                Ok(item)
            }
            Step::Enumerate(inner, count) => match self.iter_next(Value::Ref(inner))? {
                Some(item) => Ok(Some(self.heap.new_tuple(vec![Value::Int(count), item])?)),
                None => Ok(None),
            },
            Step::Zip(inners) => {
                if inners.is_empty() {
                    return Ok(None);
                }
                let mut items = Vec::with_capacity(inners.len());
                for inner in inners {
                    match self.iter_next(Value::Ref(inner))? {
                        Some(item) => items.push(item),
                        None => return Ok(None),
                    }
                }
                Ok(Some(self.heap.new_tuple(items)?))
            }
            Step::Map(func, inners) => {
                let mut items = Vec::with_capacity(inners.len());
                for inner in inners {
                    match self.iter_next(Value::Ref(inner))? {
                        Some(item) => items.push(item),
                        None => return Ok(None),
                    }
                }
                Ok(Some(self.call_value(func, ArgValues::positional(items))?))
            }
            Step::Filter(func, inner) => loop {
                let Some(item) = self.iter_next(Value::Ref(inner))? else {
                    return Ok(None);
                };
                let keep = match func {
                    Value::None => self.py_bool(item)?,
                    _ => {
                        let result = self.call_value(func, ArgValues::one(item))?;
                        self.py_bool(result)?
                    }
                };
                if keep {
                    return Ok(Some(item));
                }
            },
            Step::User(obj) => match self.call_attr(obj, "__next__", ArgValues::empty()) {
                Ok(value) => Ok(Some(value)),
                Err(err) if err.is_stop_iteration() => Ok(None),
                Err(err) => Err(err),
            },
        }
    }

    /// Fully consumes an iterable into a vector. Lists and tuples are
    /// snapshotted directly.
    pub(crate) fn iterate_to_vec(&mut self, value: Value) -> RunResult<Vec<Value>> {
        if let Value::Ref(id) = value {
            match self.heap.get(id) {
                HeapData::List(list) => return Ok(list.items().to_vec()),
                HeapData::Tuple(tuple) => return Ok(tuple.items().to_vec()),
                _ => {}
            }
        }
        let iterator = self.get_iter(value)?;
        self.temp_roots.push(iterator);
        let mut items = Vec::new();
        let result = loop {
            match self.iter_next(iterator) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.temp_roots.pop();
        result?;
        Ok(items)
    }
}

/// Shallow repetition of a slice of values.
fn repeat_items(items: &[Value], count: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    out
}

impl<'a, T: ResourceTracker> Evaluator<'a, T> {
    // --- expressions ---

    pub(crate) fn eval_expr(&mut self, expr: &ExprLoc) -> RunResult<Value> {
        match self.eval_expr_inner(expr) {
            Err(err) => Err(err.with_position(expr.position)),
            ok => ok,
        }
    }

    fn eval_expr_inner(&mut self, expr: &ExprLoc) -> RunResult<Value> {
        match &expr.expr {
            Expr::Literal(literal) => match literal {
                Literal::None => Ok(Value::None),
                Literal::Bool(b) => Ok(Value::Bool(*b)),
                Literal::Int(i) => Ok(Value::Int(*i)),
                Literal::LongInt(big) => self.heap.new_int(big.clone()),
                Literal::Float(f) => Ok(Value::Float(*f)),
                Literal::Str(text) => self.heap.new_str(text.clone()),
            },
            Expr::Name(identifier) => self.lookup_name(identifier),
            Expr::Tuple(elements) => {
                let items = self.eval_display_items(elements)?;
                self.heap.new_tuple(items)
            }
            Expr::List(elements) => {
                let items = self.eval_display_items(elements)?;
                self.heap.new_list(items)
            }
            Expr::Set(elements) => {
                let mut set = Set::new();
                for element in elements {
                    let value = self.eval_expr(element)?;
                    let key = Key::from_value(&self.heap, value)?;
                    set.add(key, value);
                }
                self.heap.new_set(set)
            }
            Expr::Dict(items) => {
                let mut dict = Dict::new();
                for item in items {
                    match item {
                        DictItem::Pair { key, value } => {
                            let key_value = self.eval_expr(key)?;
                            let value = self.eval_expr(value)?;
                            let key = Key::from_value(&self.heap, key_value)?;
                            dict.set(key, key_value, value);
                        }
                        DictItem::Unpack { mapping } => {
                            let mapping = self.eval_expr(mapping)?;
                            let Value::Ref(id) = mapping else {
                                return Err(ExcType::type_error(format!(
                                    "argument of type '{}' is not a mapping",
                                    mapping.type_name(&self.heap)
                                )));
                            };
                            let pairs: Vec<(Value, Value)> = match self.heap.get(id) {
                                HeapData::Dict(other) => other.iter().collect(),
                                data => {
                                    return Err(ExcType::type_error(format!(
                                        "argument of type '{}' is not a mapping",
                                        data.type_of()
                                    )));
                                }
                            };
                            for (key_value, value) in pairs {
                                let key = Key::from_value(&self.heap, key_value)?;
                                dict.set(key, key_value, value);
                            }
                        }
                    }
                }
                self.heap.new_dict(dict)
            }
            Expr::Starred(_) => Err(SimpleException::new_msg(
                ExcType::SyntaxError,
                "starred expression is not allowed here",
            )
            .into()),
            Expr::Op { left, op, right } => match op {
                Operator::And => {
                    let left = self.eval_expr(left)?;
                    if self.py_bool(left)? {
                        self.eval_expr(right)
                    } else {
                        Ok(left)
                    }
                }
                Operator::Or => {
                    let left = self.eval_expr(left)?;
                    if self.py_bool(left)? {
                        Ok(left)
                    } else {
                        self.eval_expr(right)
                    }
                }
                _ => {
                    let left = self.eval_expr(left)?;
                    let right = self.eval_expr(right)?;
                    self.binary_op(left, *op, right)
                }
            },
            Expr::CmpOp { left, op, right } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                Ok(Value::Bool(self.compare_op(*op, left, right)?))
            }
            Expr::ChainCmp { left, comparisons } => {
                // intermediate operands evaluate once; short-circuit on the
                // first false link
                let mut current = self.eval_expr(left)?;
                for (op, rhs) in comparisons {
                    let rhs = self.eval_expr(rhs)?;
                    if !self.compare_op(*op, current, rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    current = rhs;
                }
                Ok(Value::Bool(true))
            }
            Expr::Not(operand) => {
                let truthy = self.eval_truthy(operand)?;
                Ok(Value::Bool(!truthy))
            }
            Expr::UnaryMinus(operand) => {
                let value = self.eval_expr(operand)?;
                self.unary_minus(value)
            }
            Expr::UnaryPlus(operand) => {
                let value = self.eval_expr(operand)?;
                if let Some(num) = numeric_of(&self.heap, value) {
                    return num_to_value(&mut self.heap, num);
                }
                if let Some(result) = self.call_dunder(value, "__pos__", ArgValues::empty())? {
                    return Ok(result);
                }
                Err(ExcType::type_error(format!(
                    "bad operand type for unary +: '{}'",
                    value.type_name(&self.heap)
                )))
            }
            Expr::UnaryInvert(operand) => {
                let value = self.eval_expr(operand)?;
                match numeric_of(&self.heap, value) {
                    Some(PyNum::Int(i)) => Ok(Value::Int(!i)),
                    Some(PyNum::Big(big)) => self.heap.new_int(-(big + 1i32)),
                    _ => {
                        if let Some(result) = self.call_dunder(value, "__invert__", ArgValues::empty())? {
                            return Ok(result);
                        }
                        Err(ExcType::type_error(format!(
                            "bad operand type for unary ~: '{}'",
                            value.type_name(&self.heap)
                        )))
                    }
                }
            }
            Expr::Call { callable, args } => {
                let callee = self.eval_expr(callable)?;
                let args = self.eval_call_args(args)?;
                self.call_value(callee, args)
            }
            Expr::AttrCall { object, attr, args } => {
                let object = self.eval_expr(object)?;
                let args = self.eval_call_args(args)?;
                self.call_attr(object, attr, args)
            }
            Expr::AttrGet { object, attr } => {
                let object = self.eval_expr(object)?;
                self.get_attr(object, attr)
            }
            Expr::Subscript { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                self.get_item(object, index)
            }
            Expr::Slice { lower, upper, step } => {
                let lower = self.eval_optional(lower.as_deref())?;
                let upper = self.eval_optional(upper.as_deref())?;
                let step = self.eval_optional(step.as_deref())?;
                let slice = Slice::new(lower, upper, step);
                Ok(Value::Ref(self.heap.allocate(HeapData::Slice(slice))?))
            }
            Expr::IfElse { test, body, orelse } => {
                if self.eval_truthy(test)? {
                    self.eval_expr(body)
                } else {
                    self.eval_expr(orelse)
                }
            }
            Expr::Lambda(def) => self.make_function(def),
            Expr::ListComp { elt, generators } => {
                let mut acc = CompAcc::List(Vec::new());
                self.run_comprehension(generators, &CompElt::Single(elt), &mut acc)?;
                match acc {
                    CompAcc::List(items) => self.heap.new_list(items),
                    _ => unreachable!("accumulator kind fixed above"),
                }
            }
            Expr::SetComp { elt, generators } => {
                let mut acc = CompAcc::Set(Set::new());
                self.run_comprehension(generators, &CompElt::Single(elt), &mut acc)?;
                match acc {
                    CompAcc::Set(set) => self.heap.new_set(set),
                    _ => unreachable!("accumulator kind fixed above"),
                }
            }
            Expr::DictComp { key, value, generators } => {
                let mut acc = CompAcc::Dict(Dict::new());
                self.run_comprehension(generators, &CompElt::Pair(key, value), &mut acc)?;
                match acc {
                    CompAcc::Dict(dict) => self.heap.new_dict(dict),
                    _ => unreachable!("accumulator kind fixed above"),
                }
            }
            Expr::GeneratorExp { elt, generators } => {
                let mut acc = CompAcc::List(Vec::new());
                self.run_comprehension(generators, &CompElt::Single(elt), &mut acc)?;
                match acc {
                    CompAcc::List(items) => self.heap.new_iter(Iter::Elems { items, index: 0 }),
                    _ => unreachable!("accumulator kind fixed above"),
                }
            }
            Expr::FString(parts) => self.eval_fstring(parts),
        }
    }

    fn eval_optional(&mut self, expr: Option<&ExprLoc>) -> RunResult<Value> {
        match expr {
            Some(expr) => self.eval_expr(expr),
            None => Ok(Value::None),
        }
    }

    /// Elements of a tuple/list display, spreading starred entries.
    fn eval_display_items(&mut self, elements: &[ExprLoc]) -> RunResult<Vec<Value>> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            if let Expr::Starred(inner) = &element.expr {
                let value = self.eval_expr(inner)?;
                items.extend(self.iterate_to_vec(value)?);
            } else {
                items.push(self.eval_expr(element)?);
            }
        }
        Ok(items)
    }

    /// Evaluates call arguments left-to-right, flattening `*` spreads and
    /// merging `**` mappings.
    fn eval_call_args(&mut self, args: &ArgExprs) -> RunResult<ArgValues> {
        let mut out = ArgValues::empty();
        for arg in &args.args {
            if let Expr::Starred(inner) = &arg.expr {
                let value = self.eval_expr(inner)?;
                out.args.extend(self.iterate_to_vec(value)?);
            } else {
                out.args.push(self.eval_expr(arg)?);
            }
        }
        for kwarg in &args.kwargs {
            match &kwarg.name {
                Some(name) => {
                    let value = self.eval_expr(&kwarg.value)?;
                    if out.kwargs.iter().any(|(existing, _)| existing == &name.name) {
                        return Err(ExcType::type_error(format!(
                            "got multiple values for keyword argument '{}'",
                            name.name
                        )));
                    }
                    out.kwargs.push((name.name.clone(), value));
                }
                None => {
                    let mapping = self.eval_expr(&kwarg.value)?;
                    let Value::Ref(id) = mapping else {
                        return Err(ExcType::type_error(format!(
                            "argument after ** must be a mapping, not {}",
                            mapping.type_name(&self.heap)
                        )));
                    };
                    let pairs: Vec<(Value, Value)> = match self.heap.get(id) {
                        HeapData::Dict(dict) => dict.iter().collect(),
                        data => {
                            return Err(ExcType::type_error(format!(
                                "argument after ** must be a mapping, not {}",
                                data.type_of()
                            )));
                        }
                    };
                    for (key, value) in pairs {
                        let Some(name) = self.heap.str_value(key).map(str::to_owned) else {
                            return Err(ExcType::type_error("keywords must be strings"));
                        };
                        if out.kwargs.iter().any(|(existing, _)| *existing == name) {
                            return Err(ExcType::type_error(format!(
                                "got multiple values for keyword argument '{name}'"
                            )));
                        }
                        out.kwargs.push((name, value));
                    }
                }
            }
        }
        Ok(out)
    }

    fn unary_minus(&mut self, value: Value) -> RunResult<Value> {
        match numeric_of(&self.heap, value) {
            Some(PyNum::Int(i)) => match i.checked_neg() {
                Some(negated) => Ok(Value::Int(negated)),
                None => self.heap.new_int(-num_bigint::BigInt::from(i)),
            },
            Some(PyNum::Big(big)) => self.heap.new_int(-big),
            Some(PyNum::Float(f)) => Ok(Value::Float(-f)),
            None => {
                if let Some(result) = self.call_dunder(value, "__neg__", ArgValues::empty())? {
                    return Ok(result);
                }
                Err(ExcType::type_error(format!(
                    "bad operand type for unary -: '{}'",
                    value.type_name(&self.heap)
                )))
            }
        }
    }

    // --- comprehensions ---

    /// Runs the nested `for`/`if` clauses of a comprehension in a fresh
    /// scope. The outermost iterable is evaluated in the enclosing scope and
    /// passed in; names bound inside do not leak out.
    fn run_comprehension(
        &mut self,
        generators: &[Comprehension],
        elt: &CompElt<'_>,
        acc: &mut CompAcc,
    ) -> RunResult<()> {
        let outer_iterable = self.eval_expr(&generators[0].iter)?;
        let outer_iterator = self.get_iter(outer_iterable)?;
        let parent = self.current_scope();
        let scope = Scope::new(ScopeKind::Comprehension, Some(parent));
        let scope_id = self.heap.allocate(HeapData::Scope(scope))?;
        self.scope_stack.push(scope_id);
        self.temp_roots.push(outer_iterator);
        let result = self.run_comp_clause(generators, 0, Some(outer_iterator), elt, acc);
        self.temp_roots.pop();
        self.scope_stack.pop();
        result
    }

    fn run_comp_clause(
        &mut self,
        generators: &[Comprehension],
        index: usize,
        iterator: Option<Value>,
        elt: &CompElt<'_>,
        acc: &mut CompAcc,
    ) -> RunResult<()> {
        let Some(clause) = generators.get(index) else {
            return self.emit_comp_element(elt, acc);
        };
        let iterator = match iterator {
            Some(iterator) => iterator,
            None => {
                // inner clauses evaluate their iterable in the comprehension
                // scope, where earlier loop variables are visible
                let iterable = self.eval_expr(&clause.iter)?;
                self.get_iter(iterable)?
            }
        };
        self.temp_roots.push(iterator);
        let result = loop {
            let item = match self.iter_next(iterator) {
                Ok(Some(item)) => item,
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            };
            if let Err(err) = self.bind_target(&clause.target, item) {
                break Err(err);
            }
            let mut keep = true;
            for filter in &clause.ifs {
                match self.eval_truthy(filter) {
                    Ok(truthy) => {
                        if !truthy {
                            keep = false;
                            break;
                        }
                    }
                    Err(err) => return self.pop_root_and(Err(err)),
                }
            }
            if !keep {
                continue;
            }
            if let Err(err) = self.run_comp_clause(generators, index + 1, None, elt, acc) {
                break Err(err);
            }
        };
        self.pop_root_and(result)
    }

    fn pop_root_and<V>(&mut self, result: RunResult<V>) -> RunResult<V> {
        self.temp_roots.pop();
        result
    }

    fn emit_comp_element(&mut self, elt: &CompElt<'_>, acc: &mut CompAcc) -> RunResult<()> {
        match (elt, acc) {
            (CompElt::Single(expr), CompAcc::List(items)) => {
                let value = self.eval_expr(expr)?;
                items.push(value);
                Ok(())
            }
            (CompElt::Single(expr), CompAcc::Set(set)) => {
                let value = self.eval_expr(expr)?;
                let key = Key::from_value(&self.heap, value)?;
                set.add(key, value);
                Ok(())
            }
            (CompElt::Pair(key_expr, value_expr), CompAcc::Dict(dict)) => {
                let key_value = self.eval_expr(key_expr)?;
                let value = self.eval_expr(value_expr)?;
                let key = Key::from_value(&self.heap, key_value)?;
                dict.set(key, key_value, value);
                Ok(())
            }
            _ => Err(RunError::internal("mismatched comprehension accumulator")),
        }
    }

    // --- f-strings and format specs ---

    fn eval_fstring(&mut self, parts: &[FStringPart]) -> RunResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Interpolation {
                    expr,
                    conversion,
                    format_spec,
                } => {
                    let value = self.eval_expr(expr)?;
                    match conversion {
                        Some(ConversionFlag::Repr) => {
                            let repr = self.py_repr(value)?;
                            let rendered = self.apply_format_spec_to_text(&repr, format_spec.as_deref())?;
                            out.push_str(&rendered);
                        }
                        Some(ConversionFlag::Str) => {
                            let text = self.py_str(value)?;
                            let rendered = self.apply_format_spec_to_text(&text, format_spec.as_deref())?;
                            out.push_str(&rendered);
                        }
                        None => {
                            let rendered = self.format_value(value, format_spec.as_deref())?;
                            out.push_str(&rendered);
                        }
                    }
                }
            }
        }
        self.heap.new_str(out)
    }

    fn apply_format_spec_to_text(&mut self, text: &str, spec: Option<&str>) -> RunResult<String> {
        match spec {
            None | Some("") => Ok(text.to_owned()),
            Some(spec) => {
                let parsed = ParsedFormatSpec::parse(spec)?;
                let body = parsed.render_str(text)?;
                Ok(parsed.pad(&body, false))
            }
        }
    }

    /// Formats a value per an optional format spec; shared by f-strings and
    /// `str.format`.
    pub(crate) fn format_value(&mut self, value: Value, spec: Option<&str>) -> RunResult<String> {
        let Some(spec) = spec.filter(|spec| !spec.is_empty()) else {
            return self.py_str(value);
        };
        let parsed = ParsedFormatSpec::parse(spec)?;
        let numeric_kind = matches!(parsed.kind, Some('d' | 'f' | 'e' | 'g' | '%' | 'x' | 'b'));
        match value {
            Value::Float(f) => {
                let body = parsed.render_float(f)?;
                Ok(parsed.pad(&body, true))
            }
            Value::Int(i) => {
                let body = parsed.render_int(&i.to_string())?;
                Ok(parsed.pad(&body, true))
            }
            Value::Bool(b) if numeric_kind => {
                let body = parsed.render_int(if b { "1" } else { "0" })?;
                Ok(parsed.pad(&body, true))
            }
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::LongInt(_)) => {
                let decimal = match self.heap.get(id) {
                    HeapData::LongInt(big) => big.to_string(),
                    _ => unreachable!("checked above"),
                };
                let body = parsed.render_int(&decimal)?;
                Ok(parsed.pad(&body, true))
            }
            _ => {
                let text = self.py_str(value)?;
                let body = parsed.render_str(&text)?;
                Ok(parsed.pad(&body, false))
            }
        }
    }

    // --- subscription ---

    fn as_slice(&self, index: Value) -> Option<Slice> {
        match index {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Slice(slice) => Some(*slice),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn get_item(&mut self, object: Value, index: Value) -> RunResult<Value> {
        let Value::Ref(id) = object else {
            return Err(ExcType::type_error(format!(
                "'{}' object is not subscriptable",
                object.type_name(&self.heap)
            )));
        };
        match self.heap.get(id) {
            HeapData::List(_) => {
                if let Some(slice) = self.as_slice(index) {
                    let len = match self.heap.get(id) {
                        HeapData::List(list) => list.len(),
                        _ => unreachable!("checked above"),
                    };
                    let resolved = slice.resolve(&self.heap, len)?;
                    let items: Vec<Value> = {
                        let HeapData::List(list) = self.heap.get(id) else {
                            unreachable!("checked above");
                        };
                        resolved.indices().iter().map(|i| list.items()[*i]).collect()
                    };
                    return self.heap.new_list(items);
                }
                let i = index.as_index(&self.heap)?;
                match self.heap.get(id) {
                    HeapData::List(list) => list.get(i).ok_or_else(|| ExcType::index_error("list")),
                    _ => unreachable!("checked above"),
                }
            }
            HeapData::Tuple(_) => {
                if let Some(slice) = self.as_slice(index) {
                    let len = match self.heap.get(id) {
                        HeapData::Tuple(tuple) => tuple.len(),
                        _ => unreachable!("checked above"),
                    };
                    let resolved = slice.resolve(&self.heap, len)?;
                    let items: Vec<Value> = {
                        let HeapData::Tuple(tuple) = self.heap.get(id) else {
                            unreachable!("checked above");
                        };
                        resolved.indices().iter().map(|i| tuple.items()[*i]).collect()
                    };
                    return self.heap.new_tuple(items);
                }
                let i = index.as_index(&self.heap)?;
                match self.heap.get(id) {
                    HeapData::Tuple(tuple) => tuple.get(i).ok_or_else(|| ExcType::index_error("tuple")),
                    _ => unreachable!("checked above"),
                }
            }
            HeapData::Str(text) => {
                let text = text.clone();
                if let Some(slice) = self.as_slice(index) {
                    let chars: Vec<char> = text.chars().collect();
                    let resolved = slice.resolve(&self.heap, chars.len())?;
                    let selected: String = resolved.indices().iter().map(|i| chars[*i]).collect();
                    return self.heap.new_str(selected);
                }
                let i = index.as_index(&self.heap)?;
                match char_at(&text, i) {
                    Some(c) => self.heap.new_str(c.to_string()),
                    None => Err(ExcType::index_error("string")),
                }
            }
            HeapData::Dict(_) => {
                let key = Key::from_value(&self.heap, index)?;
                let found = match self.heap.get(id) {
                    HeapData::Dict(dict) => dict.get(&key),
                    _ => unreachable!("checked above"),
                };
                match found {
                    Some(value) => Ok(value),
                    None => {
                        let repr = self.py_repr(index)?;
                        Err(ExcType::key_error(repr))
                    }
                }
            }
            HeapData::Range(range) => {
                let range = *range;
                let i = index.as_index(&self.heap)?;
                match range.get(i) {
                    Some(value) => Ok(Value::Int(value)),
                    None => Err(ExcType::index_error("range object")),
                }
            }
            HeapData::Instance(_) => match self.call_dunder(object, "__getitem__", ArgValues::one(index))? {
                Some(result) => Ok(result),
                None => Err(ExcType::type_error(format!(
                    "'{}' object is not subscriptable",
                    object.type_name(&self.heap)
                ))),
            },
            data => Err(ExcType::type_error(format!(
                "'{}' object is not subscriptable",
                data.type_of()
            ))),
        }
    }

    pub(crate) fn set_item(&mut self, object: Value, index: Value, value: Value) -> RunResult<()> {
        let Value::Ref(id) = object else {
            return Err(ExcType::type_error(format!(
                "'{}' object does not support item assignment",
                object.type_name(&self.heap)
            )));
        };
        match self.heap.get(id) {
            HeapData::List(_) => {
                if let Some(slice) = self.as_slice(index) {
                    return self.set_list_slice(id, slice, value);
                }
                let i = index.as_index(&self.heap)?;
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list
                        .set(i, value)
                        .ok_or_else(|| ExcType::index_error_msg("list assignment index out of range")),
                    _ => unreachable!("checked above"),
                }
            }
            HeapData::Dict(_) => {
                let key = Key::from_value(&self.heap, index)?;
                match self.heap.get_mut(id) {
                    HeapData::Dict(dict) => {
                        dict.set(key, index, value);
                        Ok(())
                    }
                    _ => unreachable!("checked above"),
                }
            }
            HeapData::Instance(_) => {
                match self.call_dunder(object, "__setitem__", ArgValues::two(index, value))? {
                    Some(_) => Ok(()),
                    None => Err(ExcType::type_error(format!(
                        "'{}' object does not support item assignment",
                        object.type_name(&self.heap)
                    ))),
                }
            }
            data => Err(ExcType::type_error(format!(
                "'{}' object does not support item assignment",
                data.type_of()
            ))),
        }
    }

    /// Slice assignment: a step-1 slice splices (the list may grow or
    /// shrink); an extended slice requires matching lengths.
    fn set_list_slice(&mut self, id: HeapId, slice: Slice, value: Value) -> RunResult<()> {
        let new_items = self.iterate_to_vec(value)?;
        let len = match self.heap.get(id) {
            HeapData::List(list) => list.len(),
            _ => return Err(RunError::internal("slice assignment target is not a list")),
        };
        let resolved = slice.resolve(&self.heap, len)?;
        if resolved.step == 1 {
            let start = resolved.start.max(0) as usize;
            let stop = (resolved.stop.max(resolved.start)).max(0) as usize;
            match self.heap.get_mut(id) {
                HeapData::List(list) => {
                    list.items_mut().splice(start..stop.min(len), new_items);
                    Ok(())
                }
                _ => unreachable!("checked above"),
            }
        } else {
            let indices = resolved.indices();
            if indices.len() != new_items.len() {
                return Err(ExcType::value_error(format!(
                    "attempt to assign sequence of size {} to extended slice of size {}",
                    new_items.len(),
                    indices.len()
                )));
            }
            match self.heap.get_mut(id) {
                HeapData::List(list) => {
                    for (position, item) in indices.into_iter().zip(new_items) {
                        list.items_mut()[position] = item;
                    }
                    Ok(())
                }
                _ => unreachable!("checked above"),
            }
        }
    }

    pub(crate) fn delete_item(&mut self, object: Value, index: Value) -> RunResult<()> {
        let Value::Ref(id) = object else {
            return Err(ExcType::type_error(format!(
                "'{}' object does not support item deletion",
                object.type_name(&self.heap)
            )));
        };
        match self.heap.get(id) {
            HeapData::List(_) => {
                if let Some(slice) = self.as_slice(index) {
                    let len = match self.heap.get(id) {
                        HeapData::List(list) => list.len(),
                        _ => unreachable!("checked above"),
                    };
                    let resolved = slice.resolve(&self.heap, len)?;
                    let mut indices = resolved.indices();
                    indices.sort_unstable();
                    match self.heap.get_mut(id) {
                        HeapData::List(list) => {
                            for position in indices.into_iter().rev() {
                                list.items_mut().remove(position);
                            }
                            Ok(())
                        }
                        _ => unreachable!("checked above"),
                    }
                } else {
                    let i = index.as_index(&self.heap)?;
                    match self.heap.get_mut(id) {
                        HeapData::List(list) => match list.remove_at(i) {
                            Some(_) => Ok(()),
                            None => Err(ExcType::index_error_msg("list assignment index out of range")),
                        },
                        _ => unreachable!("checked above"),
                    }
                }
            }
            HeapData::Dict(_) => {
                let key = Key::from_value(&self.heap, index)?;
                let removed = match self.heap.get_mut(id) {
                    HeapData::Dict(dict) => dict.remove(&key).is_some(),
                    _ => unreachable!("checked above"),
                };
                if removed {
                    Ok(())
                } else {
                    let repr = self.py_repr(index)?;
                    Err(ExcType::key_error(repr))
                }
            }
            HeapData::Instance(_) => match self.call_dunder(object, "__delitem__", ArgValues::one(index))? {
                Some(_) => Ok(()),
                None => Err(ExcType::type_error(format!(
                    "'{}' object does not support item deletion",
                    object.type_name(&self.heap)
                ))),
            },
            data => Err(ExcType::type_error(format!(
                "'{}' object does not support item deletion",
                data.type_of()
            ))),
        }
    }
}

/// Element producer of a comprehension.
enum CompElt<'e> {
    Single(&'e ExprLoc),
    Pair(&'e ExprLoc, &'e ExprLoc),
}

/// Accumulator of a comprehension.
enum CompAcc {
    List(Vec<Value>),
    Set(Set),
    Dict(Dict),
}

impl<'a, T: ResourceTracker> Evaluator<'a, T> {
    // --- native method tables ---

    /// Dispatches a method call on a builtin-typed receiver.
    pub(crate) fn call_builtin_method(
        &mut self,
        receiver: Value,
        ty: Type,
        method: &str,
        args: ArgValues,
    ) -> RunResult<Value> {
        match ty {
            Type::List => self.call_list_method(receiver, method, args),
            Type::Tuple => self.call_tuple_method(receiver, method, args),
            Type::Dict => self.call_dict_method(receiver, method, args),
            Type::Set => self.call_set_method(receiver, method, args),
            Type::Str => self.call_str_method_value(receiver, method, args),
            Type::Property => self.call_property_method(receiver, method, args),
            _ => Err(ExcType::attribute_error(ty, method)),
        }
    }

    fn expect_list_id(&self, receiver: Value, method: &str) -> RunResult<HeapId> {
        match receiver {
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::List(_)) => Ok(id),
            _ => Err(ExcType::type_error(format!(
                "descriptor '{method}' requires a 'list' object but received a '{}'",
                receiver.type_name(&self.heap)
            ))),
        }
    }

    fn call_list_method(&mut self, receiver: Value, method: &str, args: ArgValues) -> RunResult<Value> {
        let id = self.expect_list_id(receiver, method)?;
        match method {
            "append" => {
                let item = args.get_one_arg("append")?;
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list.push(item),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            "extend" => {
                let iterable = args.get_one_arg("extend")?;
                let items = self.iterate_to_vec(iterable)?;
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list.items_mut().extend(items),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            "insert" => {
                let (index, item) = args.get_two_args("insert")?;
                let index = index.as_index(&self.heap)?;
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list.insert(index, item),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            "remove" => {
                let item = args.get_one_arg("remove")?;
                let position = self.find_in_list(id, item)?;
                match position {
                    Some(position) => {
                        match self.heap.get_mut(id) {
                            HeapData::List(list) => list.items_mut().remove(position),
                            _ => unreachable!("checked above"),
                        };
                        Ok(Value::None)
                    }
                    None => Err(ExcType::value_error("list.remove(x): x not in list")),
                }
            }
            "pop" => {
                let index = match args.get_zero_one_args("pop")? {
                    Some(index) => index.as_index(&self.heap)?,
                    None => -1,
                };
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list.pop_index(index),
                    _ => unreachable!("checked above"),
                }
            }
            "clear" => {
                args.check_zero_args("clear")?;
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list.clear(),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            "index" => {
                let item = args.get_one_arg("index")?;
                match self.find_in_list(id, item)? {
                    Some(position) => Ok(Value::Int(position as i64)),
                    None => {
                        let repr = self.py_repr(item)?;
                        Err(ExcType::value_error(format!("{repr} is not in list")))
                    }
                }
            }
            "count" => {
                let item = args.get_one_arg("count")?;
                let items = match self.heap.get(id) {
                    HeapData::List(list) => list.items().to_vec(),
                    _ => unreachable!("checked above"),
                };
                let mut count = 0i64;
                for candidate in items {
                    if self.py_eq(candidate, item)? {
                        count += 1;
                    }
                }
                Ok(Value::Int(count))
            }
            "sort" => {
                let mut args = args;
                let key = match args.pop_kwarg("key") {
                    None | Some(Value::None) => None,
                    Some(value) => Some(value),
                };
                let reverse = match args.pop_kwarg("reverse") {
                    None => false,
                    Some(value) => self.py_bool(value)?,
                };
                args.check_zero_args("sort")?;
                // take the items out so user comparison callbacks observe a
                // consistent snapshot
                let mut items = match self.heap.get_mut(id) {
                    HeapData::List(list) => std::mem::take(list.items_mut()),
                    _ => unreachable!("checked above"),
                };
                let sorted = self.stable_sort(&mut items, key, reverse);
                match self.heap.get_mut(id) {
                    HeapData::List(list) => *list.items_mut() = items,
                    _ => unreachable!("checked above"),
                }
                sorted?;
                Ok(Value::None)
            }
            "reverse" => {
                args.check_zero_args("reverse")?;
                match self.heap.get_mut(id) {
                    HeapData::List(list) => list.reverse(),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            "copy" => {
                args.check_zero_args("copy")?;
                let items = match self.heap.get(id) {
                    HeapData::List(list) => list.items().to_vec(),
                    _ => unreachable!("checked above"),
                };
                self.heap.new_list(items)
            }
            _ => Err(ExcType::attribute_error("list", method)),
        }
    }

    fn find_in_list(&mut self, id: HeapId, item: Value) -> RunResult<Option<usize>> {
        let items = match self.heap.get(id) {
            HeapData::List(list) => list.items().to_vec(),
            _ => return Err(RunError::internal("find_in_list on non-list")),
        };
        for (position, candidate) in items.into_iter().enumerate() {
            if self.py_eq(candidate, item)? {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }

    fn call_tuple_method(&mut self, receiver: Value, method: &str, args: ArgValues) -> RunResult<Value> {
        let items = match receiver {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Tuple(tuple) => tuple.items().to_vec(),
                _ => {
                    return Err(ExcType::type_error(format!(
                        "descriptor '{method}' requires a 'tuple' object but received a '{}'",
                        receiver.type_name(&self.heap)
                    )));
                }
            },
            _ => return Err(ExcType::attribute_error(receiver.type_name(&self.heap), method)),
        };
        match method {
            "index" => {
                let item = args.get_one_arg("index")?;
                for (position, candidate) in items.into_iter().enumerate() {
                    if self.py_eq(candidate, item)? {
                        return Ok(Value::Int(position as i64));
                    }
                }
                Err(ExcType::value_error("tuple.index(x): x not in tuple"))
            }
            "count" => {
                let item = args.get_one_arg("count")?;
                let mut count = 0i64;
                for candidate in items {
                    if self.py_eq(candidate, item)? {
                        count += 1;
                    }
                }
                Ok(Value::Int(count))
            }
            _ => Err(ExcType::attribute_error("tuple", method)),
        }
    }

    fn expect_dict_id(&self, receiver: Value, method: &str) -> RunResult<HeapId> {
        match receiver {
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::Dict(_)) => Ok(id),
            _ => Err(ExcType::type_error(format!(
                "descriptor '{method}' requires a 'dict' object but received a '{}'",
                receiver.type_name(&self.heap)
            ))),
        }
    }

    fn call_dict_method(&mut self, receiver: Value, method: &str, args: ArgValues) -> RunResult<Value> {
        let id = self.expect_dict_id(receiver, method)?;
        match method {
            "get" => {
                let (key_value, default) = args.get_one_two_args("get")?;
                let key = Key::from_value(&self.heap, key_value)?;
                let found = match self.heap.get(id) {
                    HeapData::Dict(dict) => dict.get(&key),
                    _ => unreachable!("checked above"),
                };
                Ok(found.or(default).unwrap_or(Value::None))
            }
            "keys" => {
                args.check_zero_args("keys")?;
                self.heap.new_iter(Iter::DictKeys { dict: id, index: 0 })
            }
            "values" => {
                args.check_zero_args("values")?;
                self.heap.new_iter(Iter::DictValues { dict: id, index: 0 })
            }
            "items" => {
                args.check_zero_args("items")?;
                self.heap.new_iter(Iter::DictItems { dict: id, index: 0 })
            }
            "update" => {
                let other = args.get_one_arg("update")?;
                let pairs: Vec<(Value, Value)> = match other {
                    Value::Ref(other_id) if matches!(self.heap.get(other_id), HeapData::Dict(_)) => {
                        match self.heap.get(other_id) {
                            HeapData::Dict(other) => other.iter().collect(),
                            _ => unreachable!("checked above"),
                        }
                    }
                    _ => {
                        let mut pairs = Vec::new();
                        let entries = self.iterate_to_vec(other)?;
                        for entry in entries {
                            let pair = self.iterate_to_vec(entry)?;
                            if pair.len() != 2 {
                                return Err(ExcType::value_error(format!(
                                    "dictionary update sequence element has length {}; 2 is required",
                                    pair.len()
                                )));
                            }
                            pairs.push((pair[0], pair[1]));
                        }
                        pairs
                    }
                };
                for (key_value, value) in pairs {
                    let key = Key::from_value(&self.heap, key_value)?;
                    match self.heap.get_mut(id) {
                        HeapData::Dict(dict) => dict.set(key, key_value, value),
                        _ => unreachable!("checked above"),
                    }
                }
                Ok(Value::None)
            }
            "pop" => {
                let (key_value, default) = args.get_one_two_args("pop")?;
                let key = Key::from_value(&self.heap, key_value)?;
                let removed = match self.heap.get_mut(id) {
                    HeapData::Dict(dict) => dict.remove(&key),
                    _ => unreachable!("checked above"),
                };
                match removed.or(default) {
                    Some(value) => Ok(value),
                    None => {
                        let repr = self.py_repr(key_value)?;
                        Err(ExcType::key_error(repr))
                    }
                }
            }
            "clear" => {
                args.check_zero_args("clear")?;
                match self.heap.get_mut(id) {
                    HeapData::Dict(dict) => dict.clear(),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            "setdefault" => {
                let (key_value, default) = args.get_one_two_args("setdefault")?;
                let key = Key::from_value(&self.heap, key_value)?;
                let existing = match self.heap.get(id) {
                    HeapData::Dict(dict) => dict.get(&key),
                    _ => unreachable!("checked above"),
                };
                match existing {
                    Some(value) => Ok(value),
                    None => {
                        let value = default.unwrap_or(Value::None);
                        match self.heap.get_mut(id) {
                            HeapData::Dict(dict) => dict.set(key, key_value, value),
                            _ => unreachable!("checked above"),
                        }
                        Ok(value)
                    }
                }
            }
            "copy" => {
                args.check_zero_args("copy")?;
                let copied = match self.heap.get(id) {
                    HeapData::Dict(dict) => dict.copy(),
                    _ => unreachable!("checked above"),
                };
                self.heap.new_dict(copied)
            }
            _ => Err(ExcType::attribute_error("dict", method)),
        }
    }

    fn expect_set_id(&self, receiver: Value, method: &str) -> RunResult<HeapId> {
        match receiver {
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::Set(_)) => Ok(id),
            _ => Err(ExcType::type_error(format!(
                "descriptor '{method}' requires a 'set' object but received a '{}'",
                receiver.type_name(&self.heap)
            ))),
        }
    }

    fn call_set_method(&mut self, receiver: Value, method: &str, args: ArgValues) -> RunResult<Value> {
        let id = self.expect_set_id(receiver, method)?;
        match method {
            "add" => {
                let item = args.get_one_arg("add")?;
                let key = Key::from_value(&self.heap, item)?;
                match self.heap.get_mut(id) {
                    HeapData::Set(set) => set.add(key, item),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            "remove" => {
                let item = args.get_one_arg("remove")?;
                let key = Key::from_value(&self.heap, item)?;
                let removed = match self.heap.get_mut(id) {
                    HeapData::Set(set) => set.discard(&key),
                    _ => unreachable!("checked above"),
                };
                if removed {
                    Ok(Value::None)
                } else {
                    let repr = self.py_repr(item)?;
                    Err(ExcType::key_error(repr))
                }
            }
            "discard" => {
                let item = args.get_one_arg("discard")?;
                let key = Key::from_value(&self.heap, item)?;
                match self.heap.get_mut(id) {
                    HeapData::Set(set) => set.discard(&key),
                    _ => unreachable!("checked above"),
                };
                Ok(Value::None)
            }
            "union" | "intersection" | "difference" => {
                args.check_no_kwargs(method)?;
                let mut result = match self.heap.get(id) {
                    HeapData::Set(set) => set.copy(),
                    _ => unreachable!("checked above"),
                };
                for other_value in args.args {
                    let other = self.value_as_set(other_value)?;
                    result = match method {
                        "union" => result.union_with(&other),
                        "intersection" => result.intersection_with(&other),
                        _ => result.difference_with(&other),
                    };
                }
                self.heap.new_set(result)
            }
            "copy" => {
                args.check_zero_args("copy")?;
                let copied = match self.heap.get(id) {
                    HeapData::Set(set) => set.copy(),
                    _ => unreachable!("checked above"),
                };
                self.heap.new_set(copied)
            }
            "clear" => {
                args.check_zero_args("clear")?;
                match self.heap.get_mut(id) {
                    HeapData::Set(set) => set.clear(),
                    _ => unreachable!("checked above"),
                }
                Ok(Value::None)
            }
            _ => Err(ExcType::attribute_error("set", method)),
        }
    }

    /// Coerces a set-operation operand (set or other iterable) to a `Set`.
    fn value_as_set(&mut self, value: Value) -> RunResult<Set> {
        if let Value::Ref(id) = value {
            if let HeapData::Set(set) = self.heap.get(id) {
                return Ok(set.copy());
            }
        }
        let items = self.iterate_to_vec(value)?;
        let mut set = Set::new();
        for item in items {
            let key = Key::from_value(&self.heap, item)?;
            set.add(key, item);
        }
        Ok(set)
    }

    fn call_str_method_value(&mut self, receiver: Value, method: &str, args: ArgValues) -> RunResult<Value> {
        let Some(text) = self.heap.str_value(receiver).map(str::to_owned) else {
            return Err(ExcType::type_error(format!(
                "descriptor '{method}' requires a 'str' object but received a '{}'",
                receiver.type_name(&self.heap)
            )));
        };
        match method {
            "join" => {
                let iterable = args.get_one_arg("join")?;
                let items = self.iterate_to_vec(iterable)?;
                let mut parts = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match self.heap.str_value(item) {
                        Some(part) => parts.push(part.to_owned()),
                        None => {
                            return Err(ExcType::type_error(format!(
                                "sequence item {index}: expected str instance, {} found",
                                item.type_name(&self.heap)
                            )));
                        }
                    }
                }
                self.heap.new_str(parts.join(&text))
            }
            "format" => self.str_format(&text, args),
            _ => call_str_method(&mut self.heap, &text, method, args),
        }
    }

    /// `template.format(*args, **kwargs)` with auto-numbered, indexed, and
    /// named fields.
    fn str_format(&mut self, template: &str, args: ArgValues) -> RunResult<Value> {
        let pieces = parse_format_template(template)?;
        let mut auto_index = 0usize;
        let mut out = String::new();
        for piece in pieces {
            match piece {
                FormatPiece::Literal(text) => out.push_str(&text),
                FormatPiece::Field { index, name, spec } => {
                    let value = if let Some(name) = name {
                        match args.kwargs.iter().find(|(key, _)| *key == name) {
                            Some((_, value)) => *value,
                            None => {
                                return Err(ExcType::key_error(string_repr(&name)));
                            }
                        }
                    } else {
                        let position = match index {
                            Some(index) => index,
                            None => {
                                let position = auto_index;
                                auto_index += 1;
                                position
                            }
                        };
                        match args.args.get(position) {
                            Some(value) => *value,
                            None => {
                                return Err(SimpleException::new_msg(
                                    ExcType::IndexError,
                                    "Replacement index out of range for positional args tuple",
                                )
                                .into());
                            }
                        }
                    };
                    let rendered = self.format_value(value, spec.as_deref())?;
                    out.push_str(&rendered);
                }
            }
        }
        self.heap.new_str(out)
    }

    fn call_property_method(&mut self, receiver: Value, method: &str, args: ArgValues) -> RunResult<Value> {
        let Value::Ref(id) = receiver else {
            return Err(ExcType::attribute_error(receiver.type_name(&self.heap), method));
        };
        let property = match self.heap.get(id) {
            HeapData::Property(property) => *property,
            _ => return Err(ExcType::attribute_error(receiver.type_name(&self.heap), method)),
        };
        let func = args.get_one_arg(method)?;
        let updated = match method {
            // registration returns a new property sharing the other slots
            "getter" => Property {
                fget: Some(func),
                ..property
            },
            "setter" => Property {
                fset: Some(func),
                ..property
            },
            "deleter" => Property {
                fdel: Some(func),
                ..property
            },
            _ => return Err(ExcType::attribute_error("property", method)),
        };
        Ok(Value::Ref(self.heap.allocate(HeapData::Property(updated))?))
    }

    // --- sorting ---

    /// Stable merge sort using the `<` protocol (so user `__lt__` elements
    /// sort), with an optional key function and descending order.
    pub(crate) fn stable_sort(
        &mut self,
        items: &mut Vec<Value>,
        key: Option<Value>,
        reverse: bool,
    ) -> RunResult<()> {
        let mut pairs = Vec::with_capacity(items.len());
        for item in items.iter() {
            let sort_key = match key {
                Some(func) => self.call_value(func, ArgValues::one(*item))?,
                None => *item,
            };
            pairs.push((sort_key, *item));
        }
        let sorted = self.merge_sort(pairs, reverse)?;
        *items = sorted.into_iter().map(|(_, item)| item).collect();
        Ok(())
    }

    fn merge_sort(&mut self, pairs: Vec<(Value, Value)>, reverse: bool) -> RunResult<Vec<(Value, Value)>> {
        if pairs.len() <= 1 {
            return Ok(pairs);
        }
        let mid = pairs.len() / 2;
        let mut right_half = pairs;
        let left_half = right_half.drain(..mid).collect::<Vec<_>>();
        let left = self.merge_sort(left_half, reverse)?;
        let right = self.merge_sort(right_half, reverse)?;

        let mut merged = Vec::with_capacity(left.len() + right.len());
        let mut left_iter = left.into_iter().peekable();
        let mut right_iter = right.into_iter().peekable();
        while let (Some(l), Some(r)) = (left_iter.peek(), right_iter.peek()) {
            // take from the right only on strict precedence, keeping the
            // sort stable in both directions
            let take_right = if reverse {
                self.py_lt(l.0, r.0)?
            } else {
                self.py_lt(r.0, l.0)?
            };
            if take_right {
                merged.push(right_iter.next().expect("peeked"));
            } else {
                merged.push(left_iter.next().expect("peeked"));
            }
        }
        merged.extend(left_iter);
        merged.extend(right_iter);
        Ok(merged)
    }

    /// `a < b` through the comparison protocol.
    pub(crate) fn py_lt(&mut self, left: Value, right: Value) -> RunResult<bool> {
        self.py_ordering(left, right, CmpOperator::Lt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{io::NoPrint, parse::parse, resource::NoLimitTracker};

    fn run(ev: &mut Evaluator<'_, NoLimitTracker>, code: &str) -> Value {
        let nodes = parse(code).unwrap();
        ev.run_module(&nodes).unwrap()
    }

    #[test]
    fn collects_unreachable_cycle() {
        let mut print = NoPrint;
        let mut ev = Evaluator::new(NoLimitTracker, &mut print).unwrap();
        run(&mut ev, "a = []\na.append(a)\nb = {}\nb['self'] = b\na = None\nb = None");
        let roots: Vec<Value> = ev.temp_roots.clone();
        let mut ids = ev.scope_stack.clone();
        ids.push(ev.object_class);
        let before = ev.heap.live_objects();
        ev.heap.collect_garbage(&roots, &ids);
        let after = ev.heap.live_objects();
        // the self-referential list and dict are unreachable and reclaimed
        assert!(after < before, "expected sweep to reclaim cycles ({before} -> {after})");
    }

    #[test]
    fn keeps_reachable_values_across_collection() {
        let mut print = NoPrint;
        let mut ev = Evaluator::new(NoLimitTracker, &mut print).unwrap();
        run(&mut ev, "keep = [1, 2, 3]\ncycle = []\ncycle.append(cycle)");
        let ids = {
            let mut ids = ev.scope_stack.clone();
            ids.push(ev.object_class);
            ids
        };
        ev.heap.collect_garbage(&[], &ids);
        let value = run(&mut ev, "len(keep) + len(cycle)");
        assert_eq!(value, Value::Int(4));
    }

    #[test]
    fn instance_attribute_cycle_is_collectable() {
        let mut print = NoPrint;
        let mut ev = Evaluator::new(NoLimitTracker, &mut print).unwrap();
        run(
            &mut ev,
            "class Node:\n    pass\nn = Node()\nn.me = n\nn = None",
        );
        let ids = {
            let mut ids = ev.scope_stack.clone();
            ids.push(ev.object_class);
            ids
        };
        let before = ev.heap.live_objects();
        ev.heap.collect_garbage(&[], &ids);
        assert!(ev.heap.live_objects() < before);
    }
}
