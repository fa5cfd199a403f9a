//! Contract-driven property testing core.
//!
//! Given a source unit of callables annotated with weakened preconditions
//! and type annotations, this crate selects which callables to test,
//! resolves each parameter type to a value-generation strategy, and runs
//! rejection-sampled sessions that execute the callable on accepted inputs
//! until a budget is reached or a counterexample is found.
//!
//! The pieces compose left to right:
//!
//! * [`points`] parses point specs and picks the callables to test,
//! * [`contracts`] evaluates weakened precondition chains over bound
//!   arguments,
//! * [`resolve`] turns [`types::TypeId`]s into [`strategy::Strategy`]s,
//!   synthesizing constructors for composite types,
//! * [`driver`] runs the draw/filter/execute loop and reports outcomes.

pub mod contracts;
pub mod driver;
pub mod points;
pub mod providers;
pub mod resolve;
pub mod settings;
pub mod strategy;
pub mod types;
pub mod unit;
pub mod value;

pub use contracts::{ArgMap, PreconditionChain, PreconditionFilter, PreconditionGroup, Predicate};
pub use driver::{run_session, run_unit, DriverError, PointOutcome, SessionOutcome, UnitReport};
pub use points::{FunctionPoint, PointSpec, SpecParseError};
pub use providers::{PrimitiveStrategyProvider, RandomPrimitives};
pub use resolve::{ResolutionError, TypeResolver};
pub use settings::Settings;
pub use strategy::{DrawError, Session, Strategy};
pub use types::{ConstructorId, PrimitiveKind, TypeDescriptor, TypeId, TypeUniverse};
pub use unit::{CallableRecord, Constructor, Param, SourceUnit};
pub use value::Value;
