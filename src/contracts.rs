//! Precondition predicates, groups and the OR-of-ANDs filter.
//!
//! A callable's contract is an ordered chain of precondition groups, one
//! group per level of its override chain (most derived first). Within a
//! group every predicate must hold; across groups any single group holding
//! is sufficient. This is the "require else" weakening rule: an override's
//! inputs are valid if they satisfy either its own preconditions or any
//! ancestor's, so a subtype can only ever widen the set of valid inputs.

use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Ordered name-to-value binding for one candidate call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgMap {
    entries: Vec<(String, Value)>,
}

impl ArgMap {
    pub fn new() -> Self {
        ArgMap {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ArgMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

/// A single pure boolean predicate over named arguments.
///
/// The predicate declares which argument names it reads and is evaluated by
/// name, never by position. A predicate whose declared argument is absent
/// from the candidate binding cannot hold.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    args: Vec<String>,
    check: Rc<dyn Fn(&ArgMap) -> bool>,
}

impl Predicate {
    pub fn new(
        description: impl Into<String>,
        args: &[&str],
        check: impl Fn(&ArgMap) -> bool + 'static,
    ) -> Self {
        Predicate {
            description: description.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            check: Rc::new(check),
        }
    }

    /// Shorthand for the common single-argument predicate.
    pub fn over(
        description: impl Into<String>,
        arg: &str,
        check: impl Fn(&Value) -> bool + 'static,
    ) -> Self {
        let name = arg.to_string();
        Predicate {
            description: description.into(),
            args: vec![name.clone()],
            check: Rc::new(move |bound: &ArgMap| match bound.get(&name) {
                Some(value) => check(value),
                None => false,
            }),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn holds(&self, bound: &ArgMap) -> bool {
        if !self.args.iter().all(|a| bound.contains(a)) {
            return false;
        }
        (self.check)(bound)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .field("args", &self.args)
            .finish()
    }
}

/// One override level's conjunction of predicates.
#[derive(Debug, Clone, Default)]
pub struct PreconditionGroup {
    predicates: Vec<Predicate>,
}

impl PreconditionGroup {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        PreconditionGroup { predicates }
    }

    pub fn holds(&self, bound: &ArgMap) -> bool {
        self.predicates.iter().all(|p| p.holds(bound))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

/// The full override chain, most derived level first.
#[derive(Debug, Clone, Default)]
pub struct PreconditionChain {
    groups: Vec<PreconditionGroup>,
}

impl PreconditionChain {
    pub fn empty() -> Self {
        PreconditionChain { groups: Vec::new() }
    }

    pub fn new(groups: Vec<PreconditionGroup>) -> Self {
        PreconditionChain { groups }
    }

    /// Chain with a single level, i.e. no inherited preconditions.
    pub fn single(predicates: Vec<Predicate>) -> Self {
        PreconditionChain {
            groups: vec![PreconditionGroup::new(predicates)],
        }
    }

    pub fn push_group(&mut self, group: PreconditionGroup) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[PreconditionGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The accept/reject predicate built out of a precondition chain.
///
/// `accept` is true iff any group's conjunction is true, stopping at the
/// first satisfied group. A callable with no declared preconditions gets
/// the constant-true filter.
#[derive(Debug, Clone)]
pub struct PreconditionFilter {
    chain: PreconditionChain,
}

impl PreconditionFilter {
    pub fn new(chain: PreconditionChain) -> Self {
        PreconditionFilter { chain }
    }

    pub fn constant_true() -> Self {
        PreconditionFilter {
            chain: PreconditionChain::empty(),
        }
    }

    pub fn accept(&self, bound: &ArgMap) -> bool {
        if self.chain.is_empty() {
            return true;
        }
        for (level, group) in self.chain.groups().iter().enumerate() {
            if group.holds(bound) {
                log::trace!("accepted {} at chain level {}", bound, level);
                return true;
            }
        }
        false
    }
}
