use super::*;
use crate::test_support::{environment, root_context};
use kite_types::DescriptorId;

#[test]
fn test_replace_with_same_value_returns_same_context() {
    let env = environment();
    let context = root_context(&env);

    assert!(Rc::ptr_eq(&context, &context.replace_trace(&Rc::clone(&context.trace))));
    assert!(Rc::ptr_eq(&context, &context.replace_scope(&Rc::clone(&context.scope))));
    assert!(Rc::ptr_eq(&context, &context.replace_expected_type(ExpectedType::NoExpectedType)));
    assert!(Rc::ptr_eq(&context, &context.replace_data_flow_info(&Rc::clone(&context.data_flow_info))));
    assert!(Rc::ptr_eq(&context, &context.replace_position(ExpressionPosition::Free)));
    assert!(Rc::ptr_eq(&context, &context.replace_dependency(ContextDependency::Independent)));
    assert!(Rc::ptr_eq(&context, &context.replace_cache(&Rc::clone(&context.cache))));
    assert!(Rc::ptr_eq(&context, &context.to_expression()));
}

#[test]
fn test_replace_with_new_value_changes_only_that_field() {
    let env = environment();
    let context = root_context(&env);
    let expected = ExpectedType::Type(env.builtins.int_type());

    let replaced = context.replace_expected_type(expected.clone());
    assert!(!Rc::ptr_eq(&context, &replaced));
    assert_eq!(replaced.expected_type, expected);
    assert!(Rc::ptr_eq(&context.trace, &replaced.trace));
    assert!(Rc::ptr_eq(&context.scope, &replaced.scope));
    assert_eq!(replaced.position, context.position);
    assert_eq!(context.expected_type, ExpectedType::NoExpectedType);
}

#[test]
fn test_replace_data_flow_info_by_identity() {
    let env = environment();
    let context = root_context(&env);
    let narrowed = context.data_flow_info.with_not_null(DescriptorId::fresh());

    let replaced = context.replace_data_flow_info(&narrowed);
    assert!(Rc::ptr_eq(&replaced.data_flow_info, &narrowed));
    assert!(Rc::ptr_eq(&replaced, &replaced.replace_data_flow_info(&narrowed)));
}

#[test]
fn test_replace_trace_with_temporary() {
    let env = environment();
    let context = root_context(&env);
    let temporary = BindingTrace::temporary(&context.trace, "speculative");

    let replaced = context.replace_trace(&temporary);
    assert!(replaced.trace.is_temporary());
    assert!(!context.trace.is_temporary());
}

#[test]
fn test_expression_context_has_no_candidate() {
    let env = environment();
    let context = root_context(&env);
    assert!(context.candidate().is_none());
    assert!(matches!(context.kind, ContextKind::Expression));
}
