//! Branching, loops, exceptions and `return`.

use super::ScriptAnalyzer;
use crate::context::{ContextDependency, ExpectedType, ExpressionPosition, ResolutionContext};
use crate::data_flow::DataFlowInfo;
use crate::scope::{LexicalScope, ScopeKind};
use kite_common::{Span, diagnostic_codes};
use kite_syntax::{NodeIndex, NodeKind};
use kite_types::{
    DeclarationDescriptor, DescriptorId, KType, LocalVariableDescriptor, Name, common_supertype, is_subtype_of,
};
use smallvec::SmallVec;
use std::rc::Rc;
use std::sync::Arc;

type BranchTypes = SmallVec<[KType; 4]>;

impl ScriptAnalyzer<'_> {
    /// A branch body: analyzed for its value unless the whole construct
    /// is a statement.
    fn branch(&self, node: NodeIndex, info: &Rc<DataFlowInfo>, context: &Rc<ResolutionContext>) -> KType {
        let branch_context = context.replace_data_flow_info(info);
        if context.position == ExpressionPosition::Statement {
            self.statement(node, &branch_context.replace_expected_type(ExpectedType::NoExpectedType))
        } else {
            self.expression(node, &branch_context)
        }
    }

    fn join(&self, types: &[KType], context: &ResolutionContext) -> KType {
        if context.position == ExpressionPosition::Statement {
            return self.env.builtins.unit_type();
        }
        common_supertype(types, &self.env.builtins)
    }

    pub(super) fn if_expression(
        &self,
        condition: NodeIndex,
        then_branch: NodeIndex,
        else_branch: NodeIndex,
        context: &Rc<ResolutionContext>,
    ) -> KType {
        let flow = self.condition(condition, context);
        if else_branch.is_none() {
            let then_context = context
                .replace_data_flow_info(&flow.when_true)
                .replace_expected_type(ExpectedType::NoExpectedType)
                .replace_position(ExpressionPosition::Statement);
            self.statement(then_branch, &then_context);
            return self.env.builtins.unit_type();
        }
        let then_type = self.branch(then_branch, &flow.when_true, context);
        let else_type = self.branch(else_branch, &flow.when_false, context);
        self.join(&[then_type, else_type], context)
    }

    pub(super) fn when_expression(
        &self,
        node: NodeIndex,
        subject: NodeIndex,
        entries: &[NodeIndex],
        context: &Rc<ResolutionContext>,
    ) -> KType {
        let free = context
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Independent);
        if subject.is_some() {
            self.expression(subject, &free);
        }
        let mut info = Rc::clone(&context.data_flow_info);
        let mut types = BranchTypes::new();
        let mut has_else = false;
        for &entry in entries {
            let NodeKind::WhenEntry { conditions, body } = self.arena.kind(entry) else {
                continue;
            };
            if conditions.is_empty() {
                has_else = true;
                types.push(self.branch(*body, &info, context));
                continue;
            }
            if subject.is_some() {
                for &condition in conditions {
                    self.expression(condition, &free.replace_data_flow_info(&info));
                }
                types.push(self.branch(*body, &info, context));
            } else {
                // Without a subject every condition is a Boolean test; an
                // entry's body runs when one of them holds.
                let mut when_true: Option<Rc<DataFlowInfo>> = None;
                for &condition in conditions {
                    let flow = self.condition(condition, &context.replace_data_flow_info(&info));
                    when_true = Some(match when_true {
                        Some(previous) => previous.or(&flow.when_true),
                        None => flow.when_true,
                    });
                    info = flow.when_false;
                }
                let body_info = when_true.unwrap_or_else(|| Rc::clone(&info));
                types.push(self.branch(*body, &body_info, context));
            }
        }
        if context.position == ExpressionPosition::Statement {
            return self.env.builtins.unit_type();
        }
        if !has_else {
            let start = self.arena.span(node).start;
            self.report(
                &context.trace,
                Span::new(start, start + "when".len() as u32),
                diagnostic_codes::NO_ELSE_IN_WHEN,
                &[],
            );
            return KType::error("non-exhaustive when");
        }
        self.join(&types, context)
    }

    pub(super) fn while_loop(&self, condition: NodeIndex, body: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let flow = self.condition(condition, context);
        let body_context = context
            .replace_data_flow_info(&flow.when_true)
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Statement);
        self.statement(body, &body_context);
        self.env.builtins.unit_type()
    }

    pub(super) fn try_expression(
        &self,
        body: NodeIndex,
        catches: &[NodeIndex],
        finally: NodeIndex,
        context: &Rc<ResolutionContext>,
    ) -> KType {
        let mut types = BranchTypes::new();
        types.push(self.branch(body, &context.data_flow_info, context));
        let throwable = self.env.builtins.throwable_type();
        for &catch in catches {
            let NodeKind::Catch { name, ty, body } = self.arena.kind(catch) else {
                continue;
            };
            let scope = LexicalScope::new(&context.scope, ScopeKind::Block, format!("catch {name}"));
            let parameter_type = self.types.resolve(&context.scope, &context.trace, *ty);
            if !parameter_type.is_error() && !is_subtype_of(&parameter_type, &throwable) {
                self.report_at(
                    &context.trace,
                    *ty,
                    diagnostic_codes::NOT_A_THROWABLE,
                    &[&parameter_type.to_string()],
                );
            }
            let variable = Arc::new(LocalVariableDescriptor {
                id: DescriptorId::fresh(),
                name: Name::identifier(name),
                ty: parameter_type,
                is_var: false,
            });
            // A fresh scope holds only this parameter, so it cannot clash.
            let _ = scope.add_variable(Arc::clone(&variable));
            context
                .trace
                .record_declaration(catch, DeclarationDescriptor::Variable(variable));
            types.push(self.branch(*body, &context.data_flow_info, &context.replace_scope(&scope)));
        }
        if finally.is_some() {
            let finally_context = context
                .replace_expected_type(ExpectedType::NoExpectedType)
                .replace_position(ExpressionPosition::Statement);
            self.statement(finally, &finally_context);
        }
        self.join(&types, context)
    }

    pub(super) fn throw(&self, value: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let value_context = context
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Independent);
        let ty = self.expression(value, &value_context);
        if !ty.is_error() && !is_subtype_of(&ty, &self.env.builtins.throwable_type()) {
            self.report_at(&context.trace, value, diagnostic_codes::NOT_A_THROWABLE, &[&ty.to_string()]);
        }
        self.env.builtins.nothing_type()
    }

    pub(super) fn return_expression(&self, node: NodeIndex, value: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let return_type = match context.scope.enclosing_function() {
            Some((_, Some(return_type))) => Some(return_type),
            _ => {
                self.report_at(&context.trace, node, diagnostic_codes::RETURN_NOT_ALLOWED, &[]);
                None
            }
        };
        let value_context = context
            .replace_expected_type(ExpectedType::from(return_type.clone()))
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Independent);
        if value.is_some() {
            self.expression(value, &value_context);
        } else if let Some(return_type) = &return_type {
            let unit = self.env.builtins.unit_type();
            if !return_type.is_error() && !is_subtype_of(&unit, return_type) {
                self.report_at(
                    &context.trace,
                    node,
                    diagnostic_codes::TYPE_MISMATCH,
                    &[&unit.to_string(), &return_type.to_string()],
                );
            }
        }
        self.env.builtins.nothing_type()
    }
}
