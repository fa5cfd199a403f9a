//! Injected records describing the unit under test.
//!
//! The core never loads modules or reflects over a live runtime; a
//! language-appropriate front end supplies an explicit listing of
//! callables with their signatures, source spans and precondition chains.

use crate::contracts::{ArgMap, PreconditionChain};
use crate::types::TypeId;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// One declared parameter of a callable or constructor.
///
/// `ty` is `None` when the source carried no resolvable type annotation,
/// which is a resolution error for required parameters.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeId>,
}

impl Param {
    pub fn typed(name: impl Into<String>, ty: TypeId) -> Self {
        Param {
            name: name.into(),
            ty: Some(ty),
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            ty: None,
        }
    }
}

/// Constructor of a user-defined composite type.
///
/// Carries its own precondition chain: synthesis of an instance is gated
/// by this chain exactly like a tested call would be.
#[derive(Clone)]
pub struct Constructor {
    pub type_name: String,
    pub params: Vec<Param>,
    pub preconditions: PreconditionChain,
    build: Rc<dyn Fn(&ArgMap) -> Value>,
}

impl Constructor {
    pub fn new(
        type_name: impl Into<String>,
        params: Vec<Param>,
        preconditions: PreconditionChain,
        build: impl Fn(&ArgMap) -> Value + 'static,
    ) -> Self {
        Constructor {
            type_name: type_name.into(),
            params,
            preconditions,
            build: Rc::new(build),
        }
    }

    /// The common case: instantiation stores the accepted arguments as the
    /// instance fields, in declaration order.
    pub fn record(
        type_name: impl Into<String>,
        params: Vec<Param>,
        preconditions: PreconditionChain,
    ) -> Self {
        let type_name = type_name.into();
        let field_names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
        let instance_name = type_name.clone();
        Constructor {
            type_name,
            params,
            preconditions,
            build: Rc::new(move |bound: &ArgMap| Value::Instance {
                type_name: instance_name.clone(),
                fields: field_names
                    .iter()
                    .filter_map(|n| bound.get(n).map(|v| (n.clone(), v.clone())))
                    .collect(),
            }),
        }
    }

    pub fn instantiate(&self, bound: &ArgMap) -> Value {
        (self.build)(bound)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .finish()
    }
}

/// A discovered callable of the unit under test.
#[derive(Clone)]
pub struct CallableRecord {
    pub name: String,
    /// Source span, 1-indexed and inclusive, covering the whole definition
    /// rather than just the signature line.
    pub first_row: usize,
    pub last_row: usize,
    pub params: Vec<Param>,
    /// Derived once per callable, including the inherited levels.
    pub preconditions: PreconditionChain,
    body: Rc<dyn Fn(&ArgMap) -> Result<(), String>>,
}

impl CallableRecord {
    pub fn new(
        name: impl Into<String>,
        span: (usize, usize),
        params: Vec<Param>,
        preconditions: PreconditionChain,
        body: impl Fn(&ArgMap) -> Result<(), String> + 'static,
    ) -> Self {
        CallableRecord {
            name: name.into(),
            first_row: span.0,
            last_row: span.1,
            params,
            preconditions,
            body: Rc::new(body),
        }
    }

    /// Invoke the callable under test; `Err` carries the failure message
    /// raised by the callable or its postconditions.
    pub fn invoke(&self, bound: &ArgMap) -> Result<(), String> {
        (self.body)(bound)
    }
}

impl fmt::Debug for CallableRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableRecord")
            .field("name", &self.name)
            .field("span", &(self.first_row, self.last_row))
            .field("params", &self.params)
            .finish()
    }
}

/// The unit under test: its raw source text (used for directive scanning)
/// plus the injected callable listing.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub source: String,
    pub callables: Vec<CallableRecord>,
}

impl SourceUnit {
    pub fn new(source: impl Into<String>, callables: Vec<CallableRecord>) -> Self {
        SourceUnit {
            source: source.into(),
            callables,
        }
    }

    pub fn callable(&self, name: &str) -> Option<&CallableRecord> {
        self.callables.iter().find(|c| c.name == name)
    }
}
