//! Test driver: draw, filter, execute, report.
//!
//! One session tests one callable: candidate argument tuples are drawn
//! from the resolved strategies, rejected candidates are redrawn without
//! counting against the execution budget (rejection sampling, never
//! mutation of the draw), and accepted candidates are executed until the
//! budget is reached or the callable fails. All session-scoped caches
//! (strategy slots, type-variable bindings) die with the session.

use crate::contracts::{ArgMap, PreconditionFilter};
use crate::points::{self, FunctionPoint, SpecParseError};
use crate::providers::PrimitiveStrategyProvider;
use crate::resolve::{ResolutionError, TypeResolver};
use crate::settings::Settings;
use crate::strategy::{Session, Strategy};
use crate::types::TypeUniverse;
use crate::unit::{CallableRecord, SourceUnit};
use std::fmt;

/// Terminal state of one session.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The execution budget was reached without a failure.
    Passed { executed: u32 },
    /// The callable failed under an accepted input; this counterexample is
    /// the primary output of the whole system.
    Failed {
        counterexample: ArgMap,
        message: String,
    },
}

/// Unrecoverable session errors; the affected callable is skipped with the
/// error surfaced, never silently.
#[derive(Debug)]
pub enum DriverError {
    Resolution(ResolutionError),
    /// No precondition group ever accepted within the draw budget: the
    /// preconditions are too strict or contradictory.
    PreconditionExhaustion { callable: String, rejections: u32 },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Resolution(error) => write!(f, "{}", error),
            DriverError::PreconditionExhaustion {
                callable,
                rejections,
            } => write!(
                f,
                "no input accepted for {} after {} rejected draws; \
                 preconditions may be too strict or contradictory",
                callable, rejections
            ),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<ResolutionError> for DriverError {
    fn from(error: ResolutionError) -> Self {
        DriverError::Resolution(error)
    }
}

/// Run one draw/filter/execute session for a single callable.
pub fn run_session(
    record: &CallableRecord,
    universe: &TypeUniverse,
    provider: &dyn PrimitiveStrategyProvider,
    settings: &Settings,
) -> Result<SessionOutcome, DriverError> {
    let resolver = TypeResolver::new(universe, provider);
    let mut strategies: Vec<(String, Strategy)> = Vec::with_capacity(record.params.len());
    for param in &record.params {
        let ty = param
            .ty
            .ok_or_else(|| ResolutionError::MissingAnnotation {
                type_name: record.name.clone(),
                param: param.name.clone(),
            })?;
        strategies.push((param.name.clone(), resolver.resolve(ty)?));
    }
    let filter = PreconditionFilter::new(record.preconditions.clone());

    let mut session = Session::new(settings.seed, settings.max_depth);
    let mut executed: u32 = 0;
    let mut rejections: u32 = 0;

    while executed < settings.max_examples {
        // DRAW
        let mut bound = ArgMap::new();
        let mut draw_failed = false;
        for (name, strategy) in &strategies {
            match strategy.draw(&mut session) {
                Ok(value) => bound.insert(name.clone(), value),
                Err(error) => {
                    log::debug!("draw for {}.{} failed: {}", record.name, name, error);
                    draw_failed = true;
                    break;
                }
            }
        }

        // FILTER: a failed draw counts like a rejection and is redrawn.
        if draw_failed || !filter.accept(&bound) {
            rejections += 1;
            if rejections > settings.max_rejections {
                return Err(DriverError::PreconditionExhaustion {
                    callable: record.name.clone(),
                    rejections,
                });
            }
            continue;
        }

        // EXECUTE
        executed += 1;
        if let Err(message) = record.invoke(&bound) {
            log::debug!("{} failed on {}: {}", record.name, bound, message);
            return Ok(SessionOutcome::Failed {
                counterexample: bound,
                message,
            });
        }
    }

    Ok(SessionOutcome::Passed { executed })
}

/// Outcome of one selected point within a unit run.
#[derive(Debug)]
pub struct PointOutcome {
    pub point: FunctionPoint,
    pub result: Result<SessionOutcome, DriverError>,
}

/// Per-callable outcomes of a whole unit run, in source order.
#[derive(Debug, Default)]
pub struct UnitReport {
    pub outcomes: Vec<PointOutcome>,
}

impl UnitReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| matches!(outcome.result, Ok(SessionOutcome::Passed { .. })))
    }

    pub fn failures(&self) -> impl Iterator<Item = &PointOutcome> {
        self.outcomes.iter().filter(|outcome| {
            !matches!(outcome.result, Ok(SessionOutcome::Passed { .. }))
        })
    }
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(SessionOutcome::Passed { executed }) => {
                    writeln!(f, "{}: passed ({} examples)", outcome.point.name, executed)?
                }
                Ok(SessionOutcome::Failed {
                    counterexample,
                    message,
                }) => writeln!(
                    f,
                    "{}: failed on {}: {}",
                    outcome.point.name, counterexample, message
                )?,
                Err(error) => writeln!(f, "{}: error: {}", outcome.point.name, error)?,
            }
        }
        Ok(())
    }
}

/// Select points per the include/exclude specs and run one session per
/// selected callable. Spec parsing is fail-fast; session errors are
/// collected per callable in the report.
pub fn run_unit<S: AsRef<str>>(
    unit: &SourceUnit,
    include: &[S],
    exclude: &[S],
    settings: &Settings,
    provider: &dyn PrimitiveStrategyProvider,
    universe: &TypeUniverse,
) -> Result<UnitReport, SpecParseError> {
    let selected = points::select(unit, include, exclude)?;
    log::debug!(
        "selected {} of {} callables",
        selected.len(),
        unit.callables.len()
    );

    let mut outcomes = Vec::with_capacity(selected.len());
    for point in selected {
        // Points are discovered from the same callable listing, so a
        // lookup miss means discovery and the listing have diverged.
        let record = match unit.callable(&point.name) {
            Some(record) => record,
            None => {
                debug_assert!(false, "selected point {} has no callable record", point.name);
                log::warn!("selected point {} has no callable record, skipping", point.name);
                continue;
            }
        };
        let result = run_session(record, universe, provider, settings);
        outcomes.push(PointOutcome { point, result });
    }
    Ok(UnitReport { outcomes })
}
