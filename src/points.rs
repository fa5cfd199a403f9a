//! Point selection: which callables of a unit get tested.
//!
//! A point spec is either a line spec (`123` or `123-435`, 1-indexed and
//! inclusive) or, failing that grammar, a regular expression over callable
//! names. Line specs select by span overlap: pointing at any line inside a
//! function body selects that function. In-source directives can disable a
//! single callable (directive inside its body) or a whole stretch of the
//! unit (directive at scope level, until a matching enable).
//!
//! Selection is fail-fast: one malformed spec aborts the whole pass, so an
//! ambiguous selection never silently runs a subset of the intended tests.

use crate::unit::SourceUnit;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Disables testing for the enclosing scope or, inside a callable's body,
/// for that callable alone.
pub const DISABLE_DIRECTIVE: &str = "contracture: disable";
/// Re-enables testing at scope level after a disable directive.
pub const ENABLE_DIRECTIVE: &str = "contracture: enable";

static LINE_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<first>\d+)(\s*-\s*(?P<last>\d+))?\s*$").expect("valid regex"));

/// Parse failure for point specs or settings statements; always carries
/// the 1-based index of the offending input.
#[derive(Debug)]
pub enum SpecParseError {
    /// Line range with `last < first`.
    LineRangeOrder { index: usize, text: String },
    /// Line number below 1 (lines are 1-indexed).
    LineUnderflow { index: usize, text: String },
    /// Line number too large to represent.
    LineOverflow { index: usize, text: String },
    /// The text was not a line spec and did not compile as a pattern.
    Pattern {
        index: usize,
        text: String,
        error: regex::Error,
    },
    /// Settings statement not matching `identifier = value`.
    Statement { index: usize, text: String },
    /// Settings value that is not valid JSON.
    SettingValue {
        index: usize,
        identifier: String,
        error: serde_json::Error,
    },
    /// Settings identifier this driver does not know.
    UnknownSetting { index: usize, identifier: String },
    /// Settings value of the wrong JSON type.
    SettingType {
        index: usize,
        identifier: String,
        expected: &'static str,
    },
}

impl fmt::Display for SpecParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecParseError::LineRangeOrder { index, text } => {
                write!(
                    f,
                    "point spec {}: Unexpected line range (last < first): {}",
                    index, text
                )
            }
            SpecParseError::LineUnderflow { index, text } => {
                write!(
                    f,
                    "point spec {}: Unexpected line number (must be >= 1): {}",
                    index, text
                )
            }
            SpecParseError::LineOverflow { index, text } => {
                write!(
                    f,
                    "point spec {}: Unexpected line number (too large): {}",
                    index, text
                )
            }
            SpecParseError::Pattern { index, text, error } => {
                write!(
                    f,
                    "point spec {}: Failed to parse the pattern {}: {}",
                    index, text, error
                )
            }
            SpecParseError::Statement { index, text } => {
                write!(
                    f,
                    "Invalid setting statement {}. Expected statement to match \
                     ^[A-Za-z_]\\w*\\s*=\\s*.*$, but got: {}",
                    index, text
                )
            }
            SpecParseError::SettingValue {
                index,
                identifier,
                error,
            } => {
                write!(
                    f,
                    "Failed to parse the value of the setting {} (statement {}): {}",
                    identifier, index, error
                )
            }
            SpecParseError::UnknownSetting { index, identifier } => {
                write!(f, "Unknown setting {} (statement {})", identifier, index)
            }
            SpecParseError::SettingType {
                index,
                identifier,
                expected,
            } => {
                write!(
                    f,
                    "Setting {} (statement {}) expects a {} value",
                    identifier, index, expected
                )
            }
        }
    }
}

impl std::error::Error for SpecParseError {}

/// A user-supplied selection criterion.
#[derive(Debug, Clone)]
pub enum PointSpec {
    /// Inclusive 1-indexed line range; a single line spec has
    /// `first == last`.
    LineRange { first: usize, last: usize },
    /// Pattern over callable names.
    Pattern(Regex),
}

impl PointSpec {
    /// Parse one spec; `index` is the 1-based position of the spec in its
    /// input list, used for error attribution.
    pub fn parse(index: usize, text: &str) -> Result<PointSpec, SpecParseError> {
        if let Some(captures) = LINE_RANGE_RE.captures(text) {
            // The grammar admits digits only, so the sole parse failure is
            // a number too large for usize.
            let first: usize = captures["first"].parse().map_err(|_| {
                SpecParseError::LineOverflow {
                    index,
                    text: text.to_string(),
                }
            })?;
            let last = match captures.name("last") {
                Some(last) => last
                    .as_str()
                    .parse()
                    .map_err(|_| SpecParseError::LineOverflow {
                        index,
                        text: text.to_string(),
                    })?,
                None => first,
            };
            if first < 1 {
                return Err(SpecParseError::LineUnderflow {
                    index,
                    text: text.to_string(),
                });
            }
            if last < first {
                return Err(SpecParseError::LineRangeOrder {
                    index,
                    text: text.to_string(),
                });
            }
            return Ok(PointSpec::LineRange { first, last });
        }
        match Regex::new(text) {
            Ok(pattern) => Ok(PointSpec::Pattern(pattern)),
            Err(error) => Err(SpecParseError::Pattern {
                index,
                text: text.to_string(),
                error,
            }),
        }
    }

    /// Parse a whole list, failing fast on the first malformed spec.
    pub fn parse_all<S: AsRef<str>>(texts: &[S]) -> Result<Vec<PointSpec>, SpecParseError> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| PointSpec::parse(i + 1, text.as_ref()))
            .collect()
    }

    /// Whether this spec selects the given point. Line ranges match on any
    /// non-empty intersection with the point's span, not containment.
    pub fn matches(&self, point: &FunctionPoint) -> bool {
        match self {
            PointSpec::LineRange { first, last } => {
                *first <= point.last_row && point.first_row <= *last
            }
            PointSpec::Pattern(pattern) => pattern.is_match(&point.name),
        }
    }
}

/// A discovered candidate callable with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPoint {
    pub name: String,
    pub first_row: usize,
    pub last_row: usize,
    /// Set by an in-source directive; takes precedence over any point
    /// spec, include or exclude.
    pub explicitly_disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Disable,
    Enable,
}

fn scan_directives(source: &str) -> Vec<(usize, Directive)> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            if line.contains(DISABLE_DIRECTIVE) {
                Some((i + 1, Directive::Disable))
            } else if line.contains(ENABLE_DIRECTIVE) {
                Some((i + 1, Directive::Enable))
            } else {
                None
            }
        })
        .collect()
}

/// Enumerate all candidate points of the unit, applying directive state.
pub fn discover(unit: &SourceUnit) -> Vec<FunctionPoint> {
    let directives = scan_directives(&unit.source);

    let in_any_body = |row: usize| {
        unit.callables
            .iter()
            .any(|c| c.first_row <= row && row <= c.last_row)
    };

    unit.callables
        .iter()
        .map(|callable| {
            // A directive inside the callable's own body governs only that
            // callable; the last one in the body wins.
            let body_state = directives
                .iter()
                .filter(|(row, _)| callable.first_row <= *row && *row <= callable.last_row)
                .map(|(_, directive)| *directive)
                .last();

            // Scope-level directives (outside every body) govern all
            // definitions that follow them.
            let scope_state = directives
                .iter()
                .filter(|(row, _)| *row < callable.first_row && !in_any_body(*row))
                .map(|(_, directive)| *directive)
                .last();

            let explicitly_disabled = match (body_state, scope_state) {
                (Some(directive), _) => directive == Directive::Disable,
                (None, Some(directive)) => directive == Directive::Disable,
                (None, None) => false,
            };

            FunctionPoint {
                name: callable.name.clone(),
                first_row: callable.first_row,
                last_row: callable.last_row,
                explicitly_disabled,
            }
        })
        .collect()
}

/// Apply include/exclude specs to the discovered points.
///
/// No include specs means "match all". Exclude takes strict precedence
/// over include, and an explicit disable directive over both. Source
/// order is preserved.
pub fn select_points(
    unit: &SourceUnit,
    include: &[PointSpec],
    exclude: &[PointSpec],
) -> Vec<FunctionPoint> {
    discover(unit)
        .into_iter()
        .filter(|point| {
            if point.explicitly_disabled {
                log::debug!("{} disabled by directive", point.name);
                return false;
            }
            if exclude.iter().any(|spec| spec.matches(point)) {
                log::debug!("{} excluded", point.name);
                return false;
            }
            include.is_empty() || include.iter().any(|spec| spec.matches(point))
        })
        .collect()
}

/// Parse both spec lists and select, failing fast on any malformed spec.
pub fn select<S: AsRef<str>>(
    unit: &SourceUnit,
    include: &[S],
    exclude: &[S],
) -> Result<Vec<FunctionPoint>, SpecParseError> {
    let include = PointSpec::parse_all(include)?;
    let exclude = PointSpec::parse_all(exclude)?;
    Ok(select_points(unit, &include, &exclude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::PreconditionChain;
    use crate::unit::CallableRecord;

    fn point(name: &str, first: usize, last: usize) -> FunctionPoint {
        FunctionPoint {
            name: name.to_string(),
            first_row: first,
            last_row: last,
            explicitly_disabled: false,
        }
    }

    fn callable(name: &str, first: usize, last: usize) -> CallableRecord {
        CallableRecord::new(
            name,
            (first, last),
            vec![],
            PreconditionChain::empty(),
            |_| Ok(()),
        )
    }

    #[test]
    fn test_single_line_spec() {
        match PointSpec::parse(1, "123").unwrap() {
            PointSpec::LineRange { first, last } => {
                assert_eq!(123, first);
                assert_eq!(123, last);
            }
            other => panic!("expected line range, got {:?}", other),
        }
    }

    #[test]
    fn test_line_range_spec_with_spaces() {
        match PointSpec::parse(1, " 123 - 435 ").unwrap() {
            PointSpec::LineRange { first, last } => {
                assert_eq!(123, first);
                assert_eq!(435, last);
            }
            other => panic!("expected line range, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_range_fails_naming_the_text() {
        let error = PointSpec::parse(1, "345-123").unwrap_err();
        assert!(
            error
                .to_string()
                .contains("Unexpected line range (last < first): 345-123"),
            "unexpected message: {}",
            error
        );
    }

    #[test]
    fn test_line_zero_fails() {
        let error = PointSpec::parse(1, "0").unwrap_err();
        assert!(matches!(error, SpecParseError::LineUnderflow { .. }));
    }

    #[test]
    fn test_line_number_beyond_usize_fails_as_overflow() {
        let error = PointSpec::parse(1, "99999999999999999999999").unwrap_err();
        match &error {
            SpecParseError::LineOverflow { index, text } => {
                assert_eq!(1, *index);
                assert_eq!("99999999999999999999999", text);
            }
            other => panic!("expected overflow error, got {:?}", other),
        }
        assert!(error.to_string().contains("too large"));
    }

    #[test]
    fn test_non_line_text_compiles_as_pattern() {
        match PointSpec::parse(1, r"^do_.*$").unwrap() {
            PointSpec::Pattern(pattern) => assert_eq!(r"^do_.*$", pattern.as_str()),
            other => panic!("expected pattern, got {:?}", other),
        }
        // "123aa" is not a line spec either; it becomes a pattern.
        assert!(matches!(
            PointSpec::parse(1, "123aa").unwrap(),
            PointSpec::Pattern(_)
        ));
    }

    #[test]
    fn test_invalid_pattern_fails() {
        let error = PointSpec::parse(3, "*invalid").unwrap_err();
        match error {
            SpecParseError::Pattern { index, text, .. } => {
                assert_eq!(3, index);
                assert_eq!("*invalid", text);
            }
            other => panic!("expected pattern error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_all_fails_fast_with_index() {
        let error = PointSpec::parse_all(&["10", "9-3", "^f$"]).unwrap_err();
        match error {
            SpecParseError::LineRangeOrder { index, .. } => assert_eq!(2, index),
            other => panic!("expected range order error, got {:?}", other),
        }
    }

    #[test]
    fn test_range_matches_on_overlap_not_containment() {
        let spec = PointSpec::parse(1, "5-6").unwrap();
        // The range pokes into the middle of the span.
        assert!(spec.matches(&point("f", 4, 10)));
        // Touching at a single boundary row is still an intersection.
        assert!(spec.matches(&point("g", 6, 9)));
        assert!(spec.matches(&point("h", 1, 5)));
        // Disjoint spans do not match.
        assert!(!spec.matches(&point("i", 7, 9)));
        assert!(!spec.matches(&point("j", 1, 4)));
    }

    #[test]
    fn test_pattern_matches_name() {
        let spec = PointSpec::parse(1, "^do_.*$").unwrap();
        assert!(spec.matches(&point("do_something", 1, 2)));
        assert!(!spec.matches(&point("undo_something", 1, 2)));
    }

    #[test]
    fn test_no_include_specs_means_match_all() {
        let unit = SourceUnit::new(
            "line1\nline2\nline3\nline4",
            vec![callable("f", 1, 2), callable("g", 3, 4)],
        );
        let selected = select_points(&unit, &[], &[]);
        assert_eq!(2, selected.len());
    }

    #[test]
    fn test_exclude_takes_precedence_over_include() {
        let unit = SourceUnit::new(
            "1\n2\n3\n4",
            vec![callable("keep_me", 1, 2), callable("keep_me_not", 3, 4)],
        );
        let selected = select(&unit, &["^keep.*$"], &["not$"]).unwrap();
        assert_eq!(1, selected.len());
        assert_eq!("keep_me", selected[0].name);
    }

    #[test]
    fn test_body_directive_disables_only_that_callable() {
        let source = "def f:\n    pass\ndef g:\n    # contracture: disable\n    pass\n";
        let unit = SourceUnit::new(source, vec![callable("f", 1, 2), callable("g", 3, 5)]);

        let points = discover(&unit);
        assert!(!points[0].explicitly_disabled);
        assert!(points[1].explicitly_disabled);

        let selected = select_points(&unit, &[], &[]);
        assert_eq!(vec!["f"], selected.iter().map(|p| p.name.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn test_scope_directive_disables_following_definitions_until_enable() {
        let source = "\
def f:
    pass
# contracture: disable
def g:
    pass
def h:
    pass
# contracture: enable
def i:
    pass
";
        let unit = SourceUnit::new(
            source,
            vec![
                callable("f", 1, 2),
                callable("g", 4, 5),
                callable("h", 6, 7),
                callable("i", 9, 10),
            ],
        );
        let selected = select_points(&unit, &[], &[]);
        let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(vec!["f", "i"], names);
    }

    #[test]
    fn test_directive_overrides_include() {
        let source = "def f:\n    # contracture: disable\n    pass\n";
        let unit = SourceUnit::new(source, vec![callable("f", 1, 3)]);
        let selected = select(&unit, &["^f$"], &[] as &[&str]).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_line_spec_selects_overlapping_function() {
        let unit = SourceUnit::new(
            "1\n2\n3\n4\n5\n6",
            vec![callable("f", 1, 3), callable("g", 4, 6)],
        );
        let selected = select(&unit, &["5"], &[] as &[&str]).unwrap();
        assert_eq!(vec!["g"], selected.iter().map(|p| p.name.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_unit_selection_end_to_end() {
        let unit = SourceUnit::new(
            "\
def testable_some_func(x):
    pass
def untestable_some_func(x):
    pass
def untestable_yet_another_func(x):
    # contracture: disable
    pass
",
            vec![
                callable("testable_some_func", 1, 2),
                callable("untestable_some_func", 3, 4),
                callable("untestable_yet_another_func", 5, 7),
            ],
        );
        let selected = select(&unit, &["^testable_.*$"], &["^untestable_.*$"]).unwrap();
        assert_eq!(1, selected.len());
        assert_eq!("testable_some_func", selected[0].name);
    }
}
