//! Type-directed strategy resolution and constructor synthesis.
//!
//! `TypeResolver::resolve` recursively maps a type descriptor to a
//! strategy. Composites are synthesized through their registered
//! constructor, gated by the constructor's own precondition filter: an
//! instance is never produced from an argument tuple the constructor
//! would reject. Resolution memoizes per `TypeId` through shared slots, so
//! a self-referential descriptor resolves to a deferred strategy bound to
//! its own slot instead of expanding forever; the actual recursion is
//! bounded at draw time by the session's depth budget.

use crate::contracts::{ArgMap, PreconditionFilter};
use crate::providers::PrimitiveStrategyProvider;
use crate::strategy::{DrawError, Strategy, StrategySlot};
use crate::types::{ConstructorId, PrimitiveKind, TypeDescriptor, TypeId, TypeUniverse};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Candidate argument tuples tried per instance before the synthesizer
/// reports the constructor's preconditions as unsatisfiable for this draw.
const SYNTHESIS_BUDGET: u32 = 100;

/// Default size bounds for generated containers.
const CONTAINER_MIN: u64 = 0;
const CONTAINER_MAX: u64 = 8;

/// Failure to map a type to a strategy; always names the offending type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The primitive provider does not support this kind.
    UnsupportedPrimitive { kind: PrimitiveKind },
    /// The id was declared but never defined in the universe.
    UndefinedType { id: TypeId },
    /// A required constructor parameter carries no type information.
    MissingAnnotation { type_name: String, param: String },
    /// Abstract type without any known concrete implementers.
    NoImplementers { type_name: String },
    /// Enumeration without members.
    NoMembers { type_name: String },
    /// Union without member types.
    EmptyUnion,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::UnsupportedPrimitive { kind } => {
                write!(f, "no strategy registered for primitive kind {}", kind)
            }
            ResolutionError::UndefinedType { id } => {
                write!(f, "could not resolve {}: declared but never defined", id)
            }
            ResolutionError::MissingAnnotation { type_name, param } => {
                write!(
                    f,
                    "could not resolve {}: constructor parameter {} lacks type information",
                    type_name, param
                )
            }
            ResolutionError::NoImplementers { type_name } => {
                write!(
                    f,
                    "could not resolve {}: abstract type without concrete implementers",
                    type_name
                )
            }
            ResolutionError::NoMembers { type_name } => {
                write!(f, "could not resolve {}: enumeration has no members", type_name)
            }
            ResolutionError::EmptyUnion => write!(f, "could not resolve a union with no members"),
        }
    }
}

impl std::error::Error for ResolutionError {}

/// Resolves type descriptors to strategies within one session.
///
/// The per-descriptor strategy cache lives here and is scoped to one
/// resolver, which in turn is scoped to one driver session; it must not
/// be reused across unrelated callables.
pub struct TypeResolver<'u> {
    universe: &'u TypeUniverse,
    provider: &'u dyn PrimitiveStrategyProvider,
    cache: RefCell<HashMap<usize, StrategySlot>>,
}

impl<'u> TypeResolver<'u> {
    pub fn new(universe: &'u TypeUniverse, provider: &'u dyn PrimitiveStrategyProvider) -> Self {
        TypeResolver {
            universe,
            provider,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, id: TypeId) -> Result<Strategy, ResolutionError> {
        if let Some(slot) = self.cache.borrow().get(&id.0) {
            // Either an in-progress resolution (cycle) or a completed one;
            // in both cases the slot-backed indirection is the right
            // answer, and it is what bounds recursion at draw time.
            return Ok(Strategy::deferred(slot.clone()));
        }
        let slot: StrategySlot = Rc::new(RefCell::new(None));
        self.cache.borrow_mut().insert(id.0, slot.clone());
        match self.build(id) {
            Ok(strategy) => {
                *slot.borrow_mut() = Some(strategy.clone());
                Ok(strategy)
            }
            Err(error) => {
                self.cache.borrow_mut().remove(&id.0);
                Err(error)
            }
        }
    }

    fn build(&self, id: TypeId) -> Result<Strategy, ResolutionError> {
        let descriptor = self
            .universe
            .get(id)
            .ok_or(ResolutionError::UndefinedType { id })?;
        log::trace!("resolving {} ({})", id, descriptor.name());
        match descriptor {
            TypeDescriptor::Primitive(kind) => self.provider.provide_primitive(*kind),
            TypeDescriptor::Enumeration { name, members } => {
                if members.is_empty() {
                    return Err(ResolutionError::NoMembers {
                        type_name: name.clone(),
                    });
                }
                let pool = members
                    .iter()
                    .map(|member| Value::EnumMember {
                        type_name: name.clone(),
                        member: member.clone(),
                    })
                    .collect();
                Ok(Strategy::sampled_from(pool))
            }
            TypeDescriptor::Union(members) => {
                if members.is_empty() {
                    return Err(ResolutionError::EmptyUnion);
                }
                let alternatives = members
                    .iter()
                    .map(|member| self.resolve(*member))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Strategy::one_of(alternatives))
            }
            TypeDescriptor::Sequence(element) => Ok(Strategy::lists_of(
                self.resolve(*element)?,
                CONTAINER_MIN,
                CONTAINER_MAX,
            )),
            TypeDescriptor::SetOf(element) => Ok(Strategy::sets_of(
                self.resolve(*element)?,
                CONTAINER_MIN,
                CONTAINER_MAX,
            )),
            TypeDescriptor::Mapping(key, value) => Ok(Strategy::maps_of(
                self.resolve(*key)?,
                self.resolve(*value)?,
                CONTAINER_MIN,
                CONTAINER_MAX,
            )),
            TypeDescriptor::Tuple(components) => {
                let strategies = components
                    .iter()
                    .map(|component| self.resolve(*component))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Strategy::tuples(strategies))
            }
            TypeDescriptor::Optional(inner) => Ok(Strategy::one_of(vec![
                Strategy::just(Value::None),
                self.resolve(*inner)?,
            ])),
            TypeDescriptor::Composite { name, constructor } => {
                self.synthesize(name.clone(), *constructor)
            }
            TypeDescriptor::Abstract { name, implementers } => {
                if implementers.is_empty() {
                    return Err(ResolutionError::NoImplementers {
                        type_name: name.clone(),
                    });
                }
                let alternatives = implementers
                    .iter()
                    .map(|implementer| self.resolve(*implementer))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Strategy::one_of(alternatives))
            }
            TypeDescriptor::TypeVar { name, bound } => match bound {
                Some(bound) => self.resolve(*bound),
                None => self.default_typevar_universe(name.clone()),
            },
        }
    }

    /// Unbounded type variables draw from a default scalar universe. The
    /// concrete alternative is chosen once per variable name and shared
    /// across all its uses in the session, so `(T, T)` draws matching
    /// concrete types.
    fn default_typevar_universe(&self, name: String) -> Result<Strategy, ResolutionError> {
        let alternatives = vec![
            self.provider.provide_primitive(PrimitiveKind::Integer)?,
            self.provider.provide_primitive(PrimitiveKind::Boolean)?,
            self.provider.provide_primitive(PrimitiveKind::Text)?,
        ];
        Ok(Strategy::from_fn(move |session| {
            let index = session.typevar_choice(&name, alternatives.len());
            alternatives[index].draw(session)
        }))
    }

    /// Constructor synthesis: resolve each parameter, draw candidate
    /// argument tuples, filter them through the constructor's own
    /// precondition chain and only then instantiate.
    fn synthesize(
        &self,
        type_name: String,
        constructor: ConstructorId,
    ) -> Result<Strategy, ResolutionError> {
        let ctor = self.universe.constructor(constructor);
        let mut param_strategies: Vec<(String, Strategy)> = Vec::with_capacity(ctor.params.len());
        for param in &ctor.params {
            let ty = param.ty.ok_or_else(|| ResolutionError::MissingAnnotation {
                type_name: type_name.clone(),
                param: param.name.clone(),
            })?;
            param_strategies.push((param.name.clone(), self.resolve(ty)?));
        }
        let filter = PreconditionFilter::new(ctor.preconditions.clone());
        let ctor = ctor.clone();
        Ok(Strategy::from_fn(move |session| {
            for _ in 0..SYNTHESIS_BUDGET {
                let mut bound = ArgMap::new();
                for (name, strategy) in &param_strategies {
                    bound.insert(name.clone(), strategy.draw(session)?);
                }
                if filter.accept(&bound) {
                    return Ok(ctor.instantiate(&bound));
                }
                log::trace!("constructor {} rejected {}", type_name, bound);
            }
            Err(DrawError::RejectionBudget(type_name.clone()))
        }))
    }
}
