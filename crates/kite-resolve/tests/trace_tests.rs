use super::*;
use kite_common::{Diagnostic, diagnostic_codes};
use kite_types::KType;

fn unresolved(start: u32) -> Diagnostic {
    Diagnostic::from_code("test.kite", start, 1, diagnostic_codes::UNRESOLVED_REFERENCE, &["x"])
}

#[test]
fn test_temporary_trace_reads_through_to_parent() {
    let root = BindingTrace::new("root");
    root.record_expression_type(NodeIndex(1), KType::error("outer"));
    let temporary = BindingTrace::temporary(&root, "candidate");

    assert!(temporary.is_temporary());
    assert!(temporary.expression_type(NodeIndex(1)).is_some());
    assert!(temporary.expression_type(NodeIndex(2)).is_none());
}

#[test]
fn test_temporary_writes_stay_local_until_commit() {
    let root = BindingTrace::new("root");
    let temporary = BindingTrace::temporary(&root, "candidate");
    temporary.record_expression_type(NodeIndex(3), KType::error("inner"));
    temporary.report(unresolved(4));

    assert!(root.expression_type(NodeIndex(3)).is_none());
    assert!(root.diagnostics().is_empty());

    temporary.commit();
    assert!(root.expression_type(NodeIndex(3)).is_some());
    assert_eq!(root.diagnostics().len(), 1);
    assert!(root.has_errors());
}

#[test]
fn test_discarded_temporary_leaves_parent_untouched() {
    let root = BindingTrace::new("root");
    {
        let temporary = BindingTrace::temporary(&root, "losing candidate");
        temporary.record_expression_type(NodeIndex(5), KType::error("lost"));
        temporary.report(unresolved(0));
    }
    assert!(root.expression_type(NodeIndex(5)).is_none());
    assert!(!root.has_errors());
}

#[test]
fn test_commit_twice_is_a_no_op() {
    let root = BindingTrace::new("root");
    let temporary = BindingTrace::temporary(&root, "candidate");
    temporary.report(unresolved(7));
    temporary.commit();
    temporary.commit();
    assert_eq!(root.diagnostics().len(), 1);
}

#[test]
fn test_duplicate_diagnostic_at_same_offset_is_dropped() {
    let trace = BindingTrace::new("root");
    trace.report(unresolved(2));
    trace.report(unresolved(2));
    trace.report(unresolved(3));
    assert_eq!(trace.diagnostics().len(), 2);
}

#[test]
fn test_nested_temporaries_commit_level_by_level() {
    let root = BindingTrace::new("root");
    let call = BindingTrace::temporary(&root, "call");
    let candidate = BindingTrace::temporary(&call, "candidate");
    candidate.record_expression_type(NodeIndex(9), KType::error("nested"));

    candidate.commit();
    assert!(call.expression_type(NodeIndex(9)).is_some());
    assert!(root.expression_type(NodeIndex(9)).is_none());

    call.commit();
    assert!(root.expression_type(NodeIndex(9)).is_some());
}

#[test]
#[should_panic(expected = "commit on root trace")]
fn test_commit_on_root_panics() {
    BindingTrace::new("root").commit();
}
