//! Public interface for running code.

use crate::{
    evaluate::Evaluator,
    exception::Exception,
    expressions::Node,
    io::{PrintWriter, StdPrint},
    object::Object,
    parse::parse,
    resource::{NoLimitTracker, ResourceTracker},
};

/// Primary interface for running code.
///
/// A `Runner` parses once at construction; each `run*` call evaluates from a
/// fresh heap, so a runner can be reused.
///
/// # Example
/// ```
/// use adder::Runner;
///
/// let runner = Runner::new("x = 20\nx + 22".to_owned(), "demo.adder").unwrap();
/// let result = runner.run_no_limits().unwrap();
/// let value: i64 = (&result).try_into().unwrap();
/// assert_eq!(value, 42);
/// ```
#[derive(Debug)]
pub struct Runner {
    executor: Executor,
}

impl Runner {
    /// Parses the given source.
    ///
    /// # Errors
    /// Returns a `SyntaxError`/`IndentationError` [`Exception`] when the
    /// source does not parse.
    pub fn new(code: String, script_name: &str) -> Result<Self, Exception> {
        let nodes = parse(&code)?;
        Ok(Self {
            executor: Executor {
                code,
                script_name: script_name.to_owned(),
                nodes,
            },
        })
    }

    /// The source this runner was built from.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.executor.code
    }

    /// The script name used for diagnostics.
    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.executor.script_name
    }

    /// Runs the program, returning the value of its final expression
    /// statement (or `None`).
    ///
    /// # Errors
    /// Returns the uncaught exception, including resource-limit violations
    /// reported by `tracker`.
    pub fn run(&self, tracker: impl ResourceTracker, print: &mut impl PrintWriter) -> Result<Object, Exception> {
        self.executor.run(tracker, print).map(|output| output.result)
    }

    /// Runs with no resource limits, printing to stdout.
    pub fn run_no_limits(&self) -> Result<Object, Exception> {
        self.run(NoLimitTracker, &mut StdPrint)
    }

    /// Runs the program and additionally returns the top-level bindings.
    pub fn run_program(
        &self,
        tracker: impl ResourceTracker,
        print: &mut impl PrintWriter,
    ) -> Result<ProgramOutput, Exception> {
        self.executor.run(tracker, print)
    }
}

/// The result of a run: the final expression value plus the module-level
/// name bindings in definition order.
#[derive(Debug)]
pub struct ProgramOutput {
    pub result: Object,
    globals: Vec<(String, Object)>,
}

impl ProgramOutput {
    /// Looks up a top-level binding by name.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Object> {
        self.globals
            .iter()
            .find(|(binding, _)| binding == name)
            .map(|(_, value)| value)
    }

    /// All top-level bindings, in definition order.
    pub fn globals(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.globals.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Debug)]
struct Executor {
    code: String,
    script_name: String,
    nodes: Vec<Node>,
}

impl Executor {
    fn run(&self, tracker: impl ResourceTracker, print: &mut impl PrintWriter) -> Result<ProgramOutput, Exception> {
        let mut evaluator = match Evaluator::new(tracker, print) {
            Ok(evaluator) => evaluator,
            Err(err) => return Err(err.into_exception(None)),
        };
        match evaluator.run_module(&self.nodes) {
            Ok(value) => {
                let result = Object::from_value(value, &evaluator.heap);
                let globals = evaluator
                    .global_bindings()
                    .into_iter()
                    .map(|(name, value)| (name, Object::from_value(value, &evaluator.heap)))
                    .collect();
                Ok(ProgramOutput { result, globals })
            }
            Err(err) => Err(err.into_exception(None)),
        }
    }
}
