//! Stack Fuzzer - randomized nesting programs against the condition engine
//!
//! Each program is a random tree of binds, case wrappers, protected blocks,
//! signals, errors and restart invocations. While it runs, the fuzzer keeps
//! its own model of which handlers and restarts should be visible and checks:
//! - Stack depth is restored by every bind, whatever way its body exits
//! - The handler or restart that runs is the innermost one that applies
//! - Every protected block runs its cleanup exactly once

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recourse_core::{
    error, find_restart, handler_bind, handler_case, handler_depth, restart_bind, restart_case,
    restart_depth, signal, unwind_protect, Condition, ConditionError, ConditionType,
};

/// Condition signaled by fuzz programs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag(pub u32);

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of programs to generate and run
    pub program_count: usize,
    /// Maximum nesting depth of a program
    pub max_depth: u32,
    /// Number of distinct condition tags and restart names
    pub kinds: u32,
    /// Probability that a handler binds the catch-all type
    pub catch_all_prob: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            program_count: 200,
            max_depth: 6,
            kinds: 3,
            catch_all_prob: 0.1,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            program_count: 25,
            max_depth: 4,
            ..FuzzerConfig::default()
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            program_count: 2000,
            max_depth: 10,
            kinds: 4,
            catch_all_prob: 0.2,
            seed: 42,
        }
    }
}

/// One node of a fuzz program
#[derive(Clone, Debug)]
pub enum Op {
    /// `handler_bind` for a tag (`None` = every condition)
    BindHandler(Option<u32>, Box<Op>),
    /// `handler_case` for a tag
    HandlerCase(u32, Box<Op>),
    /// `restart_bind` under a name
    BindRestart(u32, Box<Op>),
    /// `restart_case` under a name
    RestartCase(u32, Box<Op>),
    /// `unwind_protect` with one counting cleanup
    Protect(Box<Op>),
    Signal(u32),
    Error(u32),
    /// Invoke the nearest restart with this name, if any
    Invoke(u32),
    Seq(Vec<Op>),
}

fn restart_name(n: u32) -> String {
    format!("restart-{}", n)
}

/// Fuzzing result
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FuzzResult {
    pub programs_run: u64,
    pub handlers_fired: u64,
    pub restarts_fired: u64,
    pub depth_violations: u32,
    pub dispatch_violations: u32,
    pub cleanup_violations: u32,
    pub engine_errors: u32,
}

impl FuzzResult {
    pub fn is_valid(&self) -> bool {
        self.depth_violations == 0
            && self.dispatch_violations == 0
            && self.cleanup_violations == 0
            && self.engine_errors == 0
    }
}

/// Pops one model entry when dropped, mirroring the engine's own frames
struct ModelFrame<E>(Rc<RefCell<Vec<E>>>);

impl<E> ModelFrame<E> {
    fn push(model: &Rc<RefCell<Vec<E>>>, entry: E) -> Self {
        model.borrow_mut().push(entry);
        ModelFrame(Rc::clone(model))
    }
}

impl<E> Drop for ModelFrame<E> {
    fn drop(&mut self) {
        self.0.borrow_mut().pop();
    }
}

/// Runs programs and records what happened
#[derive(Default)]
struct Executor {
    /// (binding id, tag filter), outermost first
    handlers: Rc<RefCell<Vec<(u64, Option<u32>)>>>,
    /// (binding id, name), outermost first
    restarts: Rc<RefCell<Vec<(u64, u32)>>>,
    next_id: Cell<u64>,
    handlers_fired: Rc<Cell<u64>>,
    restarts_fired: Rc<Cell<u64>>,
    dispatch_violations: Rc<Cell<u32>>,
    protects_entered: Cell<u64>,
    cleanups: Rc<Cell<u64>>,
    depth_violations: Cell<u32>,
    engine_errors: Cell<u32>,
}

fn innermost_handler(model: &[(u64, Option<u32>)], tag: u32) -> Option<u64> {
    model
        .iter()
        .rev()
        .find(|(_, filter)| filter.map_or(true, |t| t == tag))
        .map(|(id, _)| *id)
}

fn innermost_restart(model: &[(u64, u32)], name: u32) -> Option<u64> {
    model.iter().rev().find(|(_, n)| *n == name).map(|(id, _)| *id)
}

fn bump(counter: &Cell<u32>) {
    counter.set(counter.get() + 1);
}

impl Executor {
    fn fresh_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Handler callback that checks it is the one dispatch should pick
    fn handler_probe(&self, id: u64) -> impl Fn(&dyn Condition) + 'static {
        let model = Rc::clone(&self.handlers);
        let fired = Rc::clone(&self.handlers_fired);
        let violations = Rc::clone(&self.dispatch_violations);
        move |condition: &dyn Condition| {
            fired.set(fired.get() + 1);
            let expected = condition
                .downcast_ref::<Tag>()
                .and_then(|tag| innermost_handler(&model.borrow(), tag.0));
            if expected != Some(id) {
                bump(&violations);
            }
        }
    }

    /// Restart callback that checks it is the nearest one with its name
    fn restart_probe(&self, id: u64, name: u32) -> impl Fn(()) + 'static {
        let model = Rc::clone(&self.restarts);
        let fired = Rc::clone(&self.restarts_fired);
        let violations = Rc::clone(&self.dispatch_violations);
        move |()| {
            fired.set(fired.get() + 1);
            if innermost_restart(&model.borrow(), name) != Some(id) {
                bump(&violations);
            }
        }
    }

    fn check_depth(&self, handlers: usize, restarts: usize) {
        if handler_depth() != handlers || restart_depth() != restarts {
            bump(&self.depth_violations);
        }
    }

    fn settle(&self, result: Result<Result<(), Tag>, ConditionError>) -> Result<(), Tag> {
        result.unwrap_or_else(|_| {
            bump(&self.engine_errors);
            Ok(())
        })
    }

    fn run(&self, op: &Op) -> Result<(), Tag> {
        let (handlers, restarts) = (handler_depth(), restart_depth());
        let result = match op {
            Op::BindHandler(filter, body) => {
                let id = self.fresh_id();
                let ty = match filter {
                    Some(tag) => ConditionType::when(format!("tag-{}", tag), {
                        let tag = *tag;
                        move |t: &Tag| t.0 == tag
                    }),
                    None => ConditionType::any(),
                };
                let _model = ModelFrame::push(&self.handlers, (id, *filter));
                self.settle(handler_bind(&ty, self.handler_probe(id), || self.run(body)))
            }
            Op::HandlerCase(tag, body) => {
                let id = self.fresh_id();
                let tag = *tag;
                let probe = self.handler_probe(id);
                let ty = ConditionType::when(format!("tag-{}", tag), move |t: &Tag| t.0 == tag);
                let _model = ModelFrame::push(&self.handlers, (id, Some(tag)));
                self.settle(handler_case(
                    &ty,
                    move |condition| {
                        probe(condition);
                        Ok(())
                    },
                    || self.run(body),
                ))
            }
            Op::BindRestart(name, body) => {
                let id = self.fresh_id();
                let _model = ModelFrame::push(&self.restarts, (id, *name));
                self.settle(restart_bind(
                    &restart_name(*name),
                    self.restart_probe(id, *name),
                    || self.run(body),
                ))
            }
            Op::RestartCase(name, body) => {
                let id = self.fresh_id();
                let probe = self.restart_probe(id, *name);
                let _model = ModelFrame::push(&self.restarts, (id, *name));
                self.settle(restart_case(
                    &restart_name(*name),
                    move |()| -> Result<(), Tag> {
                        probe(());
                        Ok(())
                    },
                    || self.run(body),
                ))
            }
            Op::Protect(body) => {
                self.protects_entered.set(self.protects_entered.get() + 1);
                let cleanups = Rc::clone(&self.cleanups);
                unwind_protect(|| self.run(body), [move || cleanups.set(cleanups.get() + 1)])
            }
            Op::Signal(tag) => {
                let before = self.handlers_fired.get();
                let expected = innermost_handler(&self.handlers.borrow(), *tag);
                signal(&Tag(*tag));
                if expected.is_some() && self.handlers_fired.get() == before {
                    bump(&self.dispatch_violations);
                }
                Ok(())
            }
            Op::Error(tag) => error(Tag(*tag)),
            Op::Invoke(name) => {
                if let Some(restart) = find_restart(&restart_name(*name)) {
                    if restart.invoke(()).is_err() {
                        bump(&self.engine_errors);
                    }
                } else if innermost_restart(&self.restarts.borrow(), *name).is_some() {
                    bump(&self.dispatch_violations);
                }
                Ok(())
            }
            Op::Seq(ops) => ops.iter().try_for_each(|op| self.run(op)),
        };
        self.check_depth(handlers, restarts);
        result
    }
}

/// Stack fuzzer
pub struct StackFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl StackFuzzer {
    /// Create a new fuzzer
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        StackFuzzer { config, rng }
    }

    /// Generate one random program
    pub fn generate(&mut self) -> Op {
        self.generate_op(self.config.max_depth)
    }

    fn generate_op(&mut self, depth: u32) -> Op {
        let kinds = self.config.kinds.max(1);
        let kind = self.rng.gen_range(0..kinds);

        if depth == 0 {
            return match self.rng.gen_range(0..3) {
                0 => Op::Signal(kind),
                1 => Op::Error(kind),
                _ => Op::Invoke(kind),
            };
        }

        match self.rng.gen_range(0..9) {
            0 => {
                let filter = if self.rng.gen_bool(self.config.catch_all_prob) {
                    None
                } else {
                    Some(kind)
                };
                Op::BindHandler(filter, Box::new(self.generate_op(depth - 1)))
            }
            1 => Op::HandlerCase(kind, Box::new(self.generate_op(depth - 1))),
            2 => Op::BindRestart(kind, Box::new(self.generate_op(depth - 1))),
            3 => Op::RestartCase(kind, Box::new(self.generate_op(depth - 1))),
            4 => Op::Protect(Box::new(self.generate_op(depth - 1))),
            5 => {
                let len = self.rng.gen_range(1..4);
                Op::Seq((0..len).map(|_| self.generate_op(depth - 1)).collect())
            }
            6 => Op::Signal(kind),
            7 => Op::Error(kind),
            _ => Op::Invoke(kind),
        }
    }

    /// Run the fuzzer
    pub fn run(&mut self) -> FuzzResult {
        let executor = Executor::default();
        let mut result = FuzzResult::default();

        for _ in 0..self.config.program_count {
            let program = self.generate();
            // Unhandled errors are a legitimate outcome of a random program
            let _ = executor.run(&program);
            result.programs_run += 1;

            if executor.cleanups.get() != executor.protects_entered.get() {
                result.cleanup_violations += 1;
            }
            if handler_depth() != 0 || restart_depth() != 0 {
                result.depth_violations += 1;
            }
            if !executor.handlers.borrow().is_empty() || !executor.restarts.borrow().is_empty() {
                result.depth_violations += 1;
            }
        }

        result.handlers_fired = executor.handlers_fired.get();
        result.restarts_fired = executor.restarts_fired.get();
        result.depth_violations += executor.depth_violations.get();
        result.dispatch_violations = executor.dispatch_violations.get();
        result.engine_errors = executor.engine_errors.get();
        result
    }
}
