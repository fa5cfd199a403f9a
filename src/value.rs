//! Runtime values produced by strategies.
//!
//! Everything the generators can draw is funneled through a single dynamic
//! `Value` enum, so that precondition predicates, constructor synthesis and
//! counterexample reporting all speak the same language regardless of the
//! concrete parameter types of the callable under test.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use num_rational::Rational64;
use std::fmt;

/// A single generated value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i128),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Duration(Duration),
    Rational(Rational64),
    /// The unit/none value.
    None,
    /// A member of a declared enumeration.
    EnumMember { type_name: String, member: String },
    List(Vec<Value>),
    /// Deduplicated by structural equality; `Value` holds floats, so a
    /// hash-based set is not available.
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Tuple(Vec<Value>),
    /// An instance of a user-defined composite type, as produced by its
    /// constructor.
    Instance {
        type_name: String,
        fields: Vec<(String, Value)>,
    },
}

impl Value {
    /// Convenience accessor for predicates over integer arguments.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Field lookup on an `Instance` value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Instance { fields, .. } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    Ok(())
}

/// Renders values as literals so that a reported counterexample can be read
/// back as the inputs that triggered the failure, e.g. `B(a=A(x=3), y=2021)`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(bytes) => {
                write!(f, "bytes[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "]")
            }
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Duration(d) => write!(f, "{}s", d.num_seconds()),
            Value::Rational(r) => write!(f, "{}", r),
            Value::None => write!(f, "None"),
            Value::EnumMember { type_name, member } => write!(f, "{}.{}", type_name, member),
            Value::List(items) => {
                write!(f, "[")?;
                write_comma_separated(f, items)?;
                write!(f, "]")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                write_comma_separated(f, items)?;
                write!(f, "}}")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_comma_separated(f, items)?;
                write!(f, ")")
            }
            Value::Instance { type_name, fields } => {
                write!(f, "{}(", type_name)?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, ")")
            }
        }
    }
}
