//! Session settings and their textual encoding.
//!
//! Settings arrive as `identifier = jsonValue` statements separated by
//! `;`. Each statement must match `^[A-Za-z_]\w*\s*=\s*.*$` with the value
//! portion parseable as JSON. Parsing is fail-fast with the statement
//! index attached, like point-spec parsing.

use crate::points::SpecParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SETTING_STATEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<identifier>[A-Za-z_]\w*)\s*=\s*(?P<value>.*)\s*$").expect("valid regex"));

/// Configuration of one test session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Accepted executions per callable before the session passes.
    pub max_examples: u32,
    /// Rejected or failed draws tolerated before the session gives up
    /// with a precondition exhaustion error.
    pub max_rejections: u32,
    /// Recursion depth budget for self-referential types.
    pub max_depth: u32,
    /// Seed for the session RNG; sessions are deterministic per seed.
    pub seed: u64,
    /// Pass-through verbosity level for the embedding front end.
    pub verbosity: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_examples: 100,
            max_rejections: 1000,
            max_depth: 8,
            seed: 0,
            verbosity: 0,
        }
    }
}

fn expect_u64(
    index: usize,
    identifier: &str,
    value: &serde_json::Value,
) -> Result<u64, SpecParseError> {
    value
        .as_u64()
        .ok_or_else(|| SpecParseError::SettingType {
            index,
            identifier: identifier.to_string(),
            expected: "non-negative integer",
        })
}

fn expect_u32(
    index: usize,
    identifier: &str,
    value: &serde_json::Value,
) -> Result<u32, SpecParseError> {
    let raw = expect_u64(index, identifier, value)?;
    u32::try_from(raw).map_err(|_| SpecParseError::SettingType {
        index,
        identifier: identifier.to_string(),
        expected: "non-negative 32-bit integer",
    })
}

impl Settings {
    /// Parse the textual settings encoding into defaults overridden by the
    /// supplied statements.
    pub fn parse(text: &str) -> Result<Settings, SpecParseError> {
        let mut settings = Settings::default();
        if text.trim().is_empty() {
            return Ok(settings);
        }
        for (i, statement) in text.split(';').enumerate() {
            let index = i + 1;
            let captures = SETTING_STATEMENT_RE.captures(statement).ok_or_else(|| {
                SpecParseError::Statement {
                    index,
                    text: statement.to_string(),
                }
            })?;
            let identifier = captures["identifier"].to_string();
            let value: serde_json::Value =
                serde_json::from_str(captures["value"].trim()).map_err(|error| {
                    SpecParseError::SettingValue {
                        index,
                        identifier: identifier.clone(),
                        error,
                    }
                })?;

            match identifier.as_str() {
                "max_examples" => {
                    settings.max_examples = expect_u32(index, &identifier, &value)?;
                }
                "max_rejections" => {
                    settings.max_rejections = expect_u32(index, &identifier, &value)?;
                }
                "max_depth" => {
                    settings.max_depth = expect_u32(index, &identifier, &value)?;
                }
                "seed" => {
                    settings.seed = expect_u64(index, &identifier, &value)?;
                }
                "verbosity" => {
                    settings.verbosity = expect_u32(index, &identifier, &value)?;
                }
                _ => {
                    return Err(SpecParseError::UnknownSetting { index, identifier });
                }
            }
        }
        Ok(settings)
    }
}
