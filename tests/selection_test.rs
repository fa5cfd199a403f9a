//! End-to-end point selection over a realistic source unit.

use contracture::contracts::PreconditionChain;
use contracture::points::{self, PointSpec, SpecParseError};
use contracture::unit::{CallableRecord, SourceUnit};

const SAMPLE_SOURCE: &str = "\
def square_greet(name):
    return 'Hello ' + name

def testable_some_func(x):
    return x * x

def untestable_some_func(x):
    return x + 1

def untestable_yet_another_func(x):
    # contracture: disable
    return x - 1

# contracture: disable

def generated_helper(x):
    return x

# contracture: enable

def final_func(x):
    return x
";

fn sample_unit() -> SourceUnit {
    let callable = |name: &str, first: usize, last: usize| {
        CallableRecord::new(name, (first, last), vec![], PreconditionChain::empty(), |_| Ok(()))
    };
    SourceUnit::new(
        SAMPLE_SOURCE,
        vec![
            callable("square_greet", 1, 2),
            callable("testable_some_func", 4, 5),
            callable("untestable_some_func", 7, 8),
            callable("untestable_yet_another_func", 10, 12),
            callable("generated_helper", 16, 17),
            callable("final_func", 21, 22),
        ],
    )
}

fn names(selected: &[contracture::points::FunctionPoint]) -> Vec<&str> {
    selected.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn test_no_specs_select_everything_not_disabled() {
    let unit = sample_unit();
    let selected = points::select(&unit, &[] as &[&str], &[]).unwrap();
    assert_eq!(
        vec!["square_greet", "testable_some_func", "untestable_some_func", "final_func"],
        names(&selected)
    );
}

#[test]
fn test_pattern_include_and_exclude_compose() {
    let unit = sample_unit();
    let selected = points::select(&unit, &["^testable_.*$"], &["^untestable_.*$"]).unwrap();
    assert_eq!(vec!["testable_some_func"], names(&selected));
}

#[test]
fn test_line_range_selects_by_overlap() {
    let unit = sample_unit();
    // Rows 5 through 7 poke into two adjacent definitions.
    let selected = points::select(&unit, &["5-7"], &[] as &[&str]).unwrap();
    assert_eq!(
        vec!["testable_some_func", "untestable_some_func"],
        names(&selected)
    );
}

#[test]
fn test_directive_wins_over_explicit_include() {
    let unit = sample_unit();
    let selected =
        points::select(&unit, &["^untestable_yet_another_func$", "^generated_.*$"], &[] as &[&str])
            .unwrap();
    assert!(selected.is_empty());
}

#[test]
fn test_scope_enable_restores_following_definitions() {
    let unit = sample_unit();
    let selected = points::select(&unit, &["^final_func$"], &[] as &[&str]).unwrap();
    assert_eq!(vec!["final_func"], names(&selected));
}

#[test]
fn test_malformed_spec_aborts_the_whole_selection() {
    let unit = sample_unit();
    let error = points::select(&unit, &["^testable_.*$", "345-123"], &[] as &[&str]).unwrap_err();
    match error {
        SpecParseError::LineRangeOrder { index, ref text } => {
            assert_eq!(2, index);
            assert_eq!("345-123", *text);
        }
        other => panic!("expected range order error, got {:?}", other),
    }
    assert!(error
        .to_string()
        .contains("Unexpected line range (last < first): 345-123"));
}

#[test]
fn test_parsed_specs_can_be_reused_across_units() {
    let include = PointSpec::parse_all(&["^testable_.*$", "1-3"]).unwrap();
    let unit = sample_unit();
    let selected = points::select_points(&unit, &include, &[]);
    assert_eq!(vec!["square_greet", "testable_some_func"], names(&selected));
}
