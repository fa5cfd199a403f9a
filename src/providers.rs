//! Primitive strategy provision.
//!
//! The resolver treats elementary value generation as a black-box
//! capability behind `PrimitiveStrategyProvider`. The default
//! `RandomPrimitives` implementation mixes a small pool of edge-case
//! constants into otherwise random draws, so boundary values show up early
//! without a dedicated targeting phase.

use crate::resolve::ResolutionError;
use crate::strategy::{Session, Strategy};
use crate::types::PrimitiveKind;
use crate::value::Value;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use num_rational::Rational64;
use rand::Rng;

/// Probability of drawing from the constant pool instead of generating a
/// fresh random value.
const CONSTANT_INJECTION_P: f64 = 0.05;

/// Black-box capability producing a lazy, restartable strategy for one
/// elementary kind. A provider that does not support a kind fails with a
/// `ResolutionError` naming it.
pub trait PrimitiveStrategyProvider {
    fn provide_primitive(&self, kind: PrimitiveKind) -> Result<Strategy, ResolutionError>;
}

/// Default provider over the session RNG.
#[derive(Debug, Clone, Default)]
pub struct RandomPrimitives;

impl RandomPrimitives {
    pub fn new() -> Self {
        RandomPrimitives
    }
}

/// Integer edge cases worth hitting early.
const INTEGER_CONSTANTS: &[i128] = &[
    0,
    1,
    -1,
    2,
    -2,
    i8::MIN as i128,
    i8::MAX as i128,
    i16::MIN as i128,
    i16::MAX as i128,
    i32::MIN as i128,
    i32::MAX as i128,
    i64::MIN as i128,
    i64::MAX as i128,
    10,
    100,
    -10,
    -100,
];

const FLOAT_CONSTANTS: &[f64] = &[
    0.0,
    -0.0,
    1.0,
    -1.0,
    0.5,
    -0.5,
    f64::EPSILON,
    f64::MIN_POSITIVE,
    f64::MAX,
    f64::MIN,
    1.0 / 3.0,
];

const TEXT_CONSTANTS: &[&str] = &["", " ", "a", "\n", "\t", "\"", "\\", "0", "中文"];

const TEXT_ALPHABET: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'x', 'y', 'z', 'A', 'B', 'Z', '0', '1', '9', '_', '-', ' ',
    '.', ',', '!',
];

fn draw_integer(session: &mut Session) -> i128 {
    if session.rng().gen::<f64>() < CONSTANT_INJECTION_P {
        let index = session.rng().gen_range(0..INTEGER_CONSTANTS.len());
        return INTEGER_CONSTANTS[index];
    }
    // Bias towards small magnitudes; wide draws still happen, just rarely.
    match session.rng().gen_range(0..4u8) {
        0 => session.rng().gen_range(-20i128..=20),
        1 => session.rng().gen_range(-1_000i128..=1_000),
        2 => session.rng().gen_range(i32::MIN as i128..=i32::MAX as i128),
        _ => session.rng().gen_range(i64::MIN as i128..=i64::MAX as i128),
    }
}

fn draw_float(session: &mut Session) -> f64 {
    if session.rng().gen::<f64>() < CONSTANT_INJECTION_P {
        let index = session.rng().gen_range(0..FLOAT_CONSTANTS.len());
        return FLOAT_CONSTANTS[index];
    }
    let magnitude = match session.rng().gen_range(0..3u8) {
        0 => 1.0,
        1 => 1e3,
        _ => 1e9,
    };
    (session.rng().gen::<f64>() - 0.5) * 2.0 * magnitude
}

fn draw_text(session: &mut Session) -> String {
    if session.rng().gen::<f64>() < CONSTANT_INJECTION_P {
        let index = session.rng().gen_range(0..TEXT_CONSTANTS.len());
        return TEXT_CONSTANTS[index].to_string();
    }
    let length = session.rng().gen_range(0..=12usize);
    (0..length)
        .map(|_| {
            let index = session.rng().gen_range(0..TEXT_ALPHABET.len());
            TEXT_ALPHABET[index]
        })
        .collect()
}

fn draw_bytes(session: &mut Session) -> Vec<u8> {
    let length = session.rng().gen_range(0..=16usize);
    (0..length).map(|_| session.rng().gen::<u8>()).collect()
}

fn draw_date(session: &mut Session) -> NaiveDate {
    // Days since CE year 1; spans roughly years 1 through 2200.
    let days = session.rng().gen_range(1i32..=803_533);
    NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(NaiveDate::MIN)
}

fn draw_time(session: &mut Session) -> NaiveTime {
    let seconds = session.rng().gen_range(0u32..86_400);
    let micros = session.rng().gen_range(0u32..1_000_000);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, micros * 1_000)
        .unwrap_or(NaiveTime::MIN)
}

fn draw_datetime(session: &mut Session) -> NaiveDateTime {
    NaiveDateTime::new(draw_date(session), draw_time(session))
}

fn draw_duration(session: &mut Session) -> Duration {
    // About +/- 10 years, in seconds.
    let seconds = session.rng().gen_range(-315_360_000i64..=315_360_000);
    Duration::seconds(seconds)
}

fn draw_rational(session: &mut Session) -> Rational64 {
    let numer = session.rng().gen_range(-1_000_000i64..=1_000_000);
    let denom = session.rng().gen_range(1i64..=1_000_000);
    Rational64::new(numer, denom)
}

impl PrimitiveStrategyProvider for RandomPrimitives {
    fn provide_primitive(&self, kind: PrimitiveKind) -> Result<Strategy, ResolutionError> {
        let strategy = match kind {
            PrimitiveKind::Integer => Strategy::from_fn(|s| Ok(Value::Int(draw_integer(s)))),
            PrimitiveKind::Float => Strategy::from_fn(|s| Ok(Value::Float(draw_float(s)))),
            PrimitiveKind::Boolean => Strategy::from_fn(|s| Ok(Value::Bool(s.rng().gen()))),
            PrimitiveKind::Text => Strategy::from_fn(|s| Ok(Value::Text(draw_text(s)))),
            PrimitiveKind::ByteSequence => {
                Strategy::from_fn(|s| Ok(Value::Bytes(draw_bytes(s))))
            }
            PrimitiveKind::Date => Strategy::from_fn(|s| Ok(Value::Date(draw_date(s)))),
            PrimitiveKind::Time => Strategy::from_fn(|s| Ok(Value::Time(draw_time(s)))),
            PrimitiveKind::DateTime => {
                Strategy::from_fn(|s| Ok(Value::DateTime(draw_datetime(s))))
            }
            PrimitiveKind::Duration => {
                Strategy::from_fn(|s| Ok(Value::Duration(draw_duration(s))))
            }
            PrimitiveKind::Rational => {
                Strategy::from_fn(|s| Ok(Value::Rational(draw_rational(s))))
            }
            PrimitiveKind::NoneType => Strategy::just(Value::None),
        };
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(42, 8)
    }

    #[test]
    fn test_all_kinds_are_provided() {
        let provider = RandomPrimitives::new();
        let mut s = session();
        let kinds = [
            PrimitiveKind::Integer,
            PrimitiveKind::Float,
            PrimitiveKind::Boolean,
            PrimitiveKind::Text,
            PrimitiveKind::ByteSequence,
            PrimitiveKind::Date,
            PrimitiveKind::Time,
            PrimitiveKind::DateTime,
            PrimitiveKind::Duration,
            PrimitiveKind::Rational,
            PrimitiveKind::NoneType,
        ];
        for kind in kinds {
            let strategy = provider.provide_primitive(kind).unwrap();
            strategy.draw(&mut s).unwrap();
        }
    }

    #[test]
    fn test_primitive_values_have_the_right_shape() {
        let provider = RandomPrimitives::new();
        let mut s = session();

        let ints = provider.provide_primitive(PrimitiveKind::Integer).unwrap();
        for _ in 0..20 {
            assert!(matches!(ints.draw(&mut s).unwrap(), Value::Int(_)));
        }

        let nones = provider.provide_primitive(PrimitiveKind::NoneType).unwrap();
        assert_eq!(Ok(Value::None), nones.draw(&mut s));
    }

    #[test]
    fn test_constant_injection_surfaces_edge_cases() {
        let provider = RandomPrimitives::new();
        let mut s = session();
        let ints = provider.provide_primitive(PrimitiveKind::Integer).unwrap();
        let mut saw_constant = false;
        for _ in 0..500 {
            if let Value::Int(n) = ints.draw(&mut s).unwrap() {
                if INTEGER_CONSTANTS.contains(&n) {
                    saw_constant = true;
                    break;
                }
            }
        }
        assert!(saw_constant);
    }

    #[test]
    fn test_rational_denominator_is_positive() {
        let mut s = session();
        for _ in 0..100 {
            let r = draw_rational(&mut s);
            assert!(*r.denom() > 0);
        }
    }
}
