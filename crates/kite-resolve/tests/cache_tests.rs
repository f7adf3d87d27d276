use super::*;
use crate::calls::Callee;
use crate::test_support::{environment, stdlib_function};
use kite_common::Span;
use kite_types::Name;

fn call(node: u32, kind: MemberKind) -> Rc<Call> {
    Rc::new(Call {
        node: NodeIndex(node),
        span: Span::new(0, 11),
        callee_span: Span::new(0, 8),
        name: Name::identifier("identity"),
        kind,
        explicit_receiver: None,
        type_arguments: Vec::new(),
        value_arguments: Vec::new(),
    })
}

fn computation(node: u32, kind: MemberKind) -> DeferredComputation {
    let env = environment();
    DeferredComputation {
        call: call(node, kind),
        candidate: Candidate::new(Callee::Function(stdlib_function(&env, "kite", "identity"))),
    }
}

fn unresolved() -> CachedResolution {
    CachedResolution {
        results: Rc::new(OverloadResolutionResults::Unresolved),
        diagnostics: Vec::new(),
    }
}

#[test]
fn test_resolution_is_keyed_by_node_and_kind() {
    let cache = ResolutionResultsCache::new();
    cache.record_resolution(NodeIndex(1), MemberKind::Function, unresolved());

    assert!(cache.resolution(NodeIndex(1), MemberKind::Function).is_some());
    assert!(cache.resolution(NodeIndex(1), MemberKind::Property).is_none());
    assert!(cache.resolution(NodeIndex(2), MemberKind::Function).is_none());
}

#[test]
fn test_temporary_cache_reads_parent_and_commits_into_it() {
    let root = ResolutionResultsCache::new();
    root.record_resolution(NodeIndex(1), MemberKind::Function, unresolved());
    let temporary = ResolutionResultsCache::temporary(&root);
    assert!(temporary.is_temporary());
    assert!(temporary.resolution(NodeIndex(1), MemberKind::Function).is_some());

    temporary.record_resolution(NodeIndex(2), MemberKind::Property, unresolved());
    assert!(root.resolution(NodeIndex(2), MemberKind::Property).is_none());
    temporary.commit();
    assert!(root.resolution(NodeIndex(2), MemberKind::Property).is_some());
}

#[test]
fn test_commit_is_idempotent() {
    let root = ResolutionResultsCache::new();
    let temporary = ResolutionResultsCache::temporary(&root);
    temporary.record_deferred_computation(NodeIndex(4), MemberKind::Function, computation(4, MemberKind::Function));
    temporary.commit();
    let first = root.deferred_computation(NodeIndex(4)).expect("committed once");
    temporary.commit();
    let second = root.deferred_computation(NodeIndex(4)).expect("committed twice");
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_nested_temporary_commits_through_each_level() {
    let root = ResolutionResultsCache::new();
    let call_cache = ResolutionResultsCache::temporary(&root);
    let candidate_cache = ResolutionResultsCache::temporary(&call_cache);
    candidate_cache.record_resolution(NodeIndex(6), MemberKind::Function, unresolved());

    candidate_cache.commit();
    assert!(call_cache.resolution(NodeIndex(6), MemberKind::Function).is_some());
    assert!(root.resolution(NodeIndex(6), MemberKind::Function).is_none());
    call_cache.commit();
    assert!(root.resolution(NodeIndex(6), MemberKind::Function).is_some());
}

#[test]
fn test_deferred_computation_for_property_is_ignored() {
    let cache = ResolutionResultsCache::new();
    cache.record_deferred_computation(NodeIndex(3), MemberKind::Property, computation(3, MemberKind::Property));
    assert!(cache.deferred_computation(NodeIndex(3)).is_none());

    cache.record_deferred_computation(NodeIndex(3), MemberKind::Function, computation(3, MemberKind::Function));
    assert!(cache.deferred_computation(NodeIndex(3)).is_some());
}

#[test]
#[should_panic(expected = "commit on a root resolution cache")]
fn test_commit_on_root_panics() {
    ResolutionResultsCache::new().commit();
}
