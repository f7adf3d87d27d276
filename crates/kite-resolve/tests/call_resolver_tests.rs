use super::*;
use crate::test_support::{Session, analyze, call_node, codes, result_type};

fn resolved(script: &kite_syntax::ParsedScript, analysis: &crate::ScriptAnalysis, name: &str) -> Rc<ResolvedCall> {
    analysis
        .trace
        .resolved_call(call_node(script, name))
        .unwrap_or_else(|| panic!("{name} is resolved"))
}

#[test]
fn test_generic_call_infers_from_arguments() {
    let (script, analysis) = analyze("maxOf(1, 2)");
    assert!(codes(&analysis).is_empty(), "{:?}", analysis.diagnostics());
    assert_eq!(result_type(&analysis), "Int");
    let call = resolved(&script, &analysis, "maxOf");
    assert_eq!(call.status, ResolutionStatus::Success);
    assert_eq!(call.type_arguments.len(), 1);
    assert!(call.type_arguments[0].is_int());
}

#[test]
fn test_expected_type_completes_inference() {
    let (script, analysis) = analyze("val b: Box<String?> = Box(null)");
    assert!(codes(&analysis).is_empty(), "{:?}", analysis.diagnostics());
    let call = resolved(&script, &analysis, "Box");
    assert_eq!(call.type_arguments[0].to_string(), "String?");
}

#[test]
fn test_nested_generic_argument_is_completed_by_outer_call() {
    let (_, analysis) = analyze("boxOf(boxOf(1))");
    assert!(codes(&analysis).is_empty(), "{:?}", analysis.diagnostics());
    assert_eq!(result_type(&analysis), "Box<Box<Int>>");
}

#[test]
fn test_overload_chosen_by_arity() {
    let (script, analysis) = analyze("println(1)");
    assert!(codes(&analysis).is_empty(), "{:?}", analysis.diagnostics());
    let call = resolved(&script, &analysis, "println");
    assert_eq!(call.value_arguments.len(), 1);
    assert!(call.result_type.is_unit());
}

#[test]
fn test_losing_candidate_diagnostics_are_discarded() {
    let (_, analysis) = analyze("println()");
    assert!(codes(&analysis).is_empty(), "{:?}", analysis.diagnostics());
}

#[test]
fn test_no_overload_applies() {
    let (_, analysis) = analyze("println(1, 2)");
    assert_eq!(codes(&analysis), vec![diagnostic_codes::NONE_APPLICABLE]);
}

#[test]
fn test_single_inapplicable_candidate_reports_its_own_errors() {
    let (_, analysis) = analyze("error(1, 2)");
    assert_eq!(codes(&analysis), vec![diagnostic_codes::TOO_MANY_ARGUMENTS]);

    let (_, analysis) = analyze("maxOf(1)");
    assert_eq!(codes(&analysis), vec![diagnostic_codes::NO_VALUE_FOR_PARAMETER]);
}

#[test]
fn test_argument_type_mismatch() {
    let (script, analysis) = analyze("Exception(1)");
    assert_eq!(codes(&analysis), vec![diagnostic_codes::TYPE_MISMATCH]);
    let call = resolved(&script, &analysis, "Exception");
    assert_eq!(call.status, ResolutionStatus::ArgumentMismatch);
}

#[test]
fn test_explicit_type_argument_constrains_inference() {
    let (_, analysis) = analyze("identity<String>(1)");
    assert!(codes(&analysis).contains(&diagnostic_codes::TYPE_MISMATCH));

    let (_, analysis) = analyze("identity<Int, Int>(1)");
    assert_eq!(codes(&analysis), vec![diagnostic_codes::WRONG_NUMBER_OF_TYPE_ARGUMENTS]);
}

#[test]
fn test_unsafe_call_on_nullable_receiver() {
    let mut session = Session::new();
    let (_, first) = session.line("val s: String? = null");
    assert!(codes(&first).is_empty(), "{:?}", first.diagnostics());
    let (_, second) = session.line("s.length");
    assert_eq!(codes(&second), vec![diagnostic_codes::UNSAFE_CALL]);
}

#[test]
fn test_extension_call_on_receiver() {
    let (_, analysis) = analyze("3.squared()");
    assert!(codes(&analysis).is_empty(), "{:?}", analysis.diagnostics());
    assert_eq!(result_type(&analysis), "Int");

    let (_, analysis) = analyze("\"abc\".squared()");
    assert!(analysis.has_errors());
}

#[test]
fn test_unknown_function() {
    let (_, analysis) = analyze("frobnicate(1)");
    assert_eq!(codes(&analysis), vec![diagnostic_codes::UNRESOLVED_REFERENCE]);
}
