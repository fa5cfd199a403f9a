//! Strategy core: lazy, restartable value generation.
//!
//! A `Strategy` is an opaque handle over a draw source. Drawing never
//! materializes more than one value; composition (map, filter, choice,
//! product, sized collections) wraps sources without forcing anything.
//! All mutable state of a test session -- the RNG, the recursion depth,
//! the sticky type-variable bindings -- lives in `Session`, which is owned
//! by exactly one driver session and discarded at its end.

use crate::value::Value;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Draws rejected by a filter before the filter gives up on one value.
const FILTER_BUDGET: u32 = 100;

/// Errors raised while drawing a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// The recursion depth budget was exhausted; the draw should be
    /// retried, which in practice selects a non-recursive alternative.
    DepthLimit,
    /// A choice combinator was given no alternatives to choose from.
    EmptyChoice,
    /// A filter or constructor rejected every candidate within its budget.
    /// Carries the label of the rejecting strategy.
    RejectionBudget(String),
    /// A deferred slot was drawn from before its resolution completed.
    UnfilledSlot,
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawError::DepthLimit => write!(f, "recursion depth limit reached"),
            DrawError::EmptyChoice => write!(f, "no alternatives to choose from"),
            DrawError::RejectionBudget(label) => {
                write!(f, "no candidate accepted by {} within the draw budget", label)
            }
            DrawError::UnfilledSlot => {
                write!(f, "deferred strategy drawn before resolution completed")
            }
        }
    }
}

impl std::error::Error for DrawError {}

/// Per-session mutable state shared by all strategies of one driver
/// session. Never reuse a session across unrelated callables: the sticky
/// type-variable bindings would conflate their type variables.
pub struct Session {
    rng: ChaCha8Rng,
    depth: u32,
    max_depth: u32,
    typevar_bindings: HashMap<String, usize>,
}

impl Session {
    pub fn new(seed: u64, max_depth: u32) -> Self {
        Session {
            rng: ChaCha8Rng::seed_from_u64(seed),
            depth: 0,
            max_depth,
            typevar_bindings: HashMap::new(),
        }
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    fn enter(&mut self) -> Result<(), DrawError> {
        if self.depth >= self.max_depth {
            log::trace!("depth limit {} reached", self.max_depth);
            return Err(DrawError::DepthLimit);
        }
        self.depth += 1;
        Ok(())
    }

    fn exit(&mut self) {
        debug_assert!(self.depth > 0);
        self.depth -= 1;
    }

    /// The sticky binding for a type variable: the first draw fixes the
    /// alternative index and all later uses of the same variable name in
    /// this session share it.
    pub(crate) fn typevar_choice(&mut self, name: &str, arity: usize) -> usize {
        if let Some(&index) = self.typevar_bindings.get(name) {
            return index;
        }
        let index = self.rng.gen_range(0..arity);
        log::debug!("bound type variable {} to alternative {}", name, index);
        self.typevar_bindings.insert(name.to_string(), index);
        index
    }
}

/// Repetition control for sized collections: a biased continue/stop draw
/// calibrated so the element count averages out to `expected_count`.
pub(crate) struct Repeat {
    min_count: u64,
    max_count: u64,
    p_continue: f64,
    current_count: u64,
}

impl Repeat {
    pub(crate) fn new(min_count: u64, max_count: u64, expected_count: f64) -> Repeat {
        Repeat {
            min_count,
            max_count,
            p_continue: 1.0 - 1.0 / (1.0 + expected_count),
            current_count: 0,
        }
    }

    /// Undo the last accepted continuation, e.g. when the drawn element
    /// was a duplicate in a set.
    pub(crate) fn reject(&mut self) {
        debug_assert!(self.current_count > 0);
        self.current_count -= 1;
    }

    pub(crate) fn should_continue(&mut self, rng: &mut ChaCha8Rng) -> bool {
        if self.current_count < self.min_count {
            self.current_count += 1;
            return true;
        }
        if self.current_count >= self.max_count {
            return false;
        }
        let result = rng.gen::<f64>() < self.p_continue;
        if result {
            self.current_count += 1;
        }
        result
    }

    pub(crate) fn count(&self) -> u64 {
        self.current_count
    }
}

trait StrategySource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError>;
}

/// An opaque, cheaply clonable value-generation capability.
#[derive(Clone)]
pub struct Strategy(Rc<dyn StrategySource>);

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy")
    }
}

/// Shared slot for deferred (recursive) strategies: resolution fills the
/// slot after the cycle has been fully built.
pub type StrategySlot = Rc<RefCell<Option<Strategy>>>;

impl Strategy {
    pub fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        self.0.draw(session)
    }

    /// Always yields the given value.
    pub fn just(value: Value) -> Strategy {
        Strategy(Rc::new(JustSource { value }))
    }

    /// Uniform choice over a fixed pool of values.
    pub fn sampled_from(values: Vec<Value>) -> Strategy {
        Strategy(Rc::new(SampledSource { values }))
    }

    pub fn from_fn(draw: impl Fn(&mut Session) -> Result<Value, DrawError> + 'static) -> Strategy {
        Strategy(Rc::new(FnSource {
            draw: Box::new(draw),
        }))
    }

    /// Even choice over alternatives. A failing alternative (depth limit,
    /// exhausted budget) is skipped in favor of the remaining ones, so a
    /// recursive branch falls back to its base case instead of wedging the
    /// whole draw.
    pub fn one_of(alternatives: Vec<Strategy>) -> Strategy {
        Strategy(Rc::new(OneOfSource { alternatives }))
    }

    pub fn map(&self, transform: impl Fn(Value) -> Value + 'static) -> Strategy {
        Strategy(Rc::new(MapSource {
            inner: self.clone(),
            transform: Box::new(transform),
        }))
    }

    pub fn filter(
        &self,
        label: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + 'static,
    ) -> Strategy {
        Strategy(Rc::new(FilterSource {
            label: label.into(),
            inner: self.clone(),
            predicate: Box::new(predicate),
        }))
    }

    /// Product of the component strategies, one value each, in order.
    pub fn tuples(components: Vec<Strategy>) -> Strategy {
        Strategy(Rc::new(TupleSource { components }))
    }

    pub fn lists_of(element: Strategy, min_size: u64, max_size: u64) -> Strategy {
        Strategy(Rc::new(CollectionSource {
            element,
            min_size,
            max_size,
            kind: CollectionKind::List,
        }))
    }

    pub fn sets_of(element: Strategy, min_size: u64, max_size: u64) -> Strategy {
        Strategy(Rc::new(CollectionSource {
            element,
            min_size,
            max_size,
            kind: CollectionKind::Set,
        }))
    }

    pub fn maps_of(key: Strategy, value: Strategy, min_size: u64, max_size: u64) -> Strategy {
        Strategy(Rc::new(MapOfSource {
            key,
            value,
            min_size,
            max_size,
        }))
    }

    /// Lazy indirection through a shared slot; drawing counts against the
    /// session's recursion depth budget.
    pub fn deferred(slot: StrategySlot) -> Strategy {
        Strategy(Rc::new(DeferredSource { slot }))
    }
}

struct JustSource {
    value: Value,
}

impl StrategySource for JustSource {
    fn draw(&self, _session: &mut Session) -> Result<Value, DrawError> {
        Ok(self.value.clone())
    }
}

struct SampledSource {
    values: Vec<Value>,
}

impl StrategySource for SampledSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        if self.values.is_empty() {
            return Err(DrawError::EmptyChoice);
        }
        let index = session.rng().gen_range(0..self.values.len());
        Ok(self.values[index].clone())
    }
}

struct FnSource {
    #[allow(clippy::type_complexity)]
    draw: Box<dyn Fn(&mut Session) -> Result<Value, DrawError>>,
}

impl StrategySource for FnSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        (self.draw)(session)
    }
}

struct OneOfSource {
    alternatives: Vec<Strategy>,
}

impl StrategySource for OneOfSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        let n = self.alternatives.len();
        if n == 0 {
            return Err(DrawError::EmptyChoice);
        }
        let start = session.rng().gen_range(0..n);
        let mut last_error = DrawError::EmptyChoice;
        for offset in 0..n {
            let index = (start + offset) % n;
            match self.alternatives[index].draw(session) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    log::trace!("alternative {} failed: {}", index, error);
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }
}

struct MapSource {
    inner: Strategy,
    transform: Box<dyn Fn(Value) -> Value>,
}

impl StrategySource for MapSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        self.inner.draw(session).map(&self.transform)
    }
}

struct FilterSource {
    label: String,
    inner: Strategy,
    predicate: Box<dyn Fn(&Value) -> bool>,
}

impl StrategySource for FilterSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        for _ in 0..FILTER_BUDGET {
            let candidate = self.inner.draw(session)?;
            if (self.predicate)(&candidate) {
                return Ok(candidate);
            }
        }
        Err(DrawError::RejectionBudget(self.label.clone()))
    }
}

struct TupleSource {
    components: Vec<Strategy>,
}

impl StrategySource for TupleSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        let mut items = Vec::with_capacity(self.components.len());
        for component in &self.components {
            items.push(component.draw(session)?);
        }
        Ok(Value::Tuple(items))
    }
}

enum CollectionKind {
    List,
    Set,
}

struct CollectionSource {
    element: Strategy,
    min_size: u64,
    max_size: u64,
    kind: CollectionKind,
}

impl StrategySource for CollectionSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        let expected = (self.min_size + self.max_size) as f64 / 2.0;
        let mut repeat = Repeat::new(self.min_size, self.max_size, expected);
        let mut items: Vec<Value> = Vec::new();
        let mut attempts: u32 = 0;
        while repeat.should_continue(session.rng()) {
            attempts += 1;
            if attempts > FILTER_BUDGET {
                return Err(DrawError::RejectionBudget("collection".to_string()));
            }
            match self.element.draw(session) {
                Ok(item) => {
                    let duplicate = matches!(self.kind, CollectionKind::Set)
                        && items.iter().any(|existing| *existing == item);
                    if duplicate {
                        repeat.reject();
                        if repeat.count() >= self.min_size {
                            break;
                        }
                    } else {
                        items.push(item);
                    }
                }
                // A failing element draw past the minimum size just ends
                // the collection; below the minimum it fails the draw.
                Err(error) => {
                    repeat.reject();
                    if items.len() as u64 >= self.min_size {
                        break;
                    }
                    return Err(error);
                }
            }
        }
        Ok(match self.kind {
            CollectionKind::List => Value::List(items),
            CollectionKind::Set => Value::Set(items),
        })
    }
}

struct MapOfSource {
    key: Strategy,
    value: Strategy,
    min_size: u64,
    max_size: u64,
}

impl StrategySource for MapOfSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        let expected = (self.min_size + self.max_size) as f64 / 2.0;
        let mut repeat = Repeat::new(self.min_size, self.max_size, expected);
        let mut entries: Vec<(Value, Value)> = Vec::new();
        let mut attempts: u32 = 0;
        while repeat.should_continue(session.rng()) {
            attempts += 1;
            if attempts > FILTER_BUDGET {
                return Err(DrawError::RejectionBudget("mapping".to_string()));
            }
            let key = match self.key.draw(session) {
                Ok(key) => key,
                Err(error) => {
                    repeat.reject();
                    if entries.len() as u64 >= self.min_size {
                        break;
                    }
                    return Err(error);
                }
            };
            if entries.iter().any(|(existing, _)| *existing == key) {
                repeat.reject();
                if repeat.count() >= self.min_size {
                    break;
                }
                continue;
            }
            let value = match self.value.draw(session) {
                Ok(value) => value,
                Err(error) => {
                    repeat.reject();
                    if entries.len() as u64 >= self.min_size {
                        break;
                    }
                    return Err(error);
                }
            };
            entries.push((key, value));
        }
        Ok(Value::Map(entries))
    }
}

struct DeferredSource {
    slot: StrategySlot,
}

impl StrategySource for DeferredSource {
    fn draw(&self, session: &mut Session) -> Result<Value, DrawError> {
        let inner = match self.slot.borrow().as_ref() {
            Some(strategy) => strategy.clone(),
            None => return Err(DrawError::UnfilledSlot),
        };
        session.enter()?;
        let result = inner.draw(session);
        session.exit();
        result
    }
}
