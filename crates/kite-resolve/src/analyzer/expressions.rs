//! Expression dispatch, operators and blocks.

use super::ScriptAnalyzer;
use crate::calls::{Call, CallArgument, MemberKind, ReceiverValue};
use crate::context::{ContextDependency, ExpectedType, ExpressionPosition, ResolutionContext};
use crate::data_flow::ConditionalDataFlow;
use crate::scope::{LexicalScope, ScopeKind};
use kite_common::diagnostic_codes;
use kite_common::limits::MAX_EXPR_DEPTH;
use kite_syntax::{BinaryOp, NodeArena, NodeIndex, NodeKind, UnaryOp};
use kite_types::{DeclarationDescriptor, DescriptorId, KType, Name, common_supertype, is_subtype_of};
use std::rc::Rc;

/// Whether a top-level statement yields a value a REPL line can show.
pub(super) fn produces_value(arena: &NodeArena, node: NodeIndex) -> bool {
    !matches!(
        arena.kind(node),
        NodeKind::Assign { .. }
            | NodeKind::While { .. }
            | NodeKind::Property { .. }
            | NodeKind::Function { .. }
            | NodeKind::Missing
    )
}

pub(super) fn strip_parentheses(arena: &NodeArena, mut node: NodeIndex) -> NodeIndex {
    while let NodeKind::Parenthesized(inner) = arena.kind(node) {
        node = *inner;
    }
    node
}

impl ScriptAnalyzer<'_> {
    /// Analyze an expression, record its type and check it against the
    /// context's expected type.
    pub(super) fn expression(&self, node: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        if node.is_none() {
            return KType::error("missing expression");
        }
        let depth = self.depth.get();
        if depth >= MAX_EXPR_DEPTH {
            if !self.depth_reported.replace(true) {
                self.report_at(&context.trace, node, diagnostic_codes::EXPRESSION_TOO_DEEP, &[]);
            }
            return KType::error("expression nested too deeply");
        }
        self.depth.set(depth + 1);
        let ty = self.dispatch(node, context);
        self.depth.set(depth);

        context.trace.record_expression_type(node, ty.clone());
        if !self.propagates_expected_type(node) {
            self.check_type(node, &ty, context);
        }
        ty
    }

    fn dispatch(&self, node: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let builtins = &self.env.builtins;
        match self.arena.kind(node) {
            NodeKind::IntLiteral(_) => builtins.int_type(),
            NodeKind::BooleanLiteral(_) => builtins.boolean_type(),
            NodeKind::StringLiteral(_) => builtins.string_type(),
            NodeKind::NullLiteral => builtins.nullable_nothing_type(),
            NodeKind::Name(name) => self.name_expression(node, name, context),
            NodeKind::Dot { receiver, name, name_span } => self.dot(node, *receiver, name, *name_span, context),
            NodeKind::Call {
                receiver,
                name,
                name_span,
                type_arguments,
                arguments,
            } => self.call(node, *receiver, name, *name_span, type_arguments, arguments, context),
            NodeKind::Unary { op, operand } => self.unary(node, *op, *operand, context),
            NodeKind::Binary { op, left, right } => self.binary(node, *op, *left, *right, context),
            NodeKind::Assign { target, value } => self.assignment(*target, *value, context),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.if_expression(*condition, *then_branch, *else_branch, context),
            NodeKind::When { subject, entries } => self.when_expression(node, *subject, entries, context),
            NodeKind::While { condition, body } => self.while_loop(*condition, *body, context),
            NodeKind::Try { body, catches, finally } => self.try_expression(*body, catches, *finally, context),
            NodeKind::Throw { value } => self.throw(*value, context),
            NodeKind::Return { value } => self.return_expression(node, *value, context),
            NodeKind::Block { statements } => self.block(statements, context),
            NodeKind::Parenthesized(inner) => {
                let ty = self.expression(*inner, context);
                let flow = self.condition_flow(*inner, context);
                self.conditions.borrow_mut().insert(node, flow);
                ty
            }
            NodeKind::Property { .. } | NodeKind::Function { .. } => {
                self.statement(node, context);
                builtins.unit_type()
            }
            NodeKind::Missing => KType::error("syntax error"),
            other => KType::error(format!("not an expression: {other:?}")),
        }
    }

    /// Composite expressions hand the expected type to their branches,
    /// which check it themselves.
    fn propagates_expected_type(&self, node: NodeIndex) -> bool {
        match self.arena.kind(node) {
            NodeKind::If { else_branch, .. } => else_branch.is_some(),
            NodeKind::When { .. } | NodeKind::Try { .. } | NodeKind::Block { .. } | NodeKind::Parenthesized(_) => {
                true
            }
            NodeKind::Property { .. } | NodeKind::Function { .. } | NodeKind::Missing => true,
            _ => false,
        }
    }

    pub(super) fn check_type(&self, node: NodeIndex, ty: &KType, context: &ResolutionContext) {
        let Some(expected) = context.expected_type.as_type() else {
            return;
        };
        if ty.is_error() || expected.is_error() || is_subtype_of(ty, expected) {
            return;
        }
        self.report_at(
            &context.trace,
            node,
            diagnostic_codes::TYPE_MISMATCH,
            &[&ty.to_string(), &expected.to_string()],
        );
    }

    /// Analyze a statement: a local declaration or an expression whose
    /// value may be discarded.
    pub(super) fn statement(&self, node: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        match self.arena.kind(node) {
            NodeKind::Property { .. } => {
                self.local_variable(node, context);
                self.env.builtins.unit_type()
            }
            NodeKind::Function { .. } => {
                if let Some(declared) = self.declare_function(node, context) {
                    if super::declarations::has_known_return_type(self.arena, node) {
                        self.function_body(&declared, context);
                    }
                }
                self.env.builtins.unit_type()
            }
            _ => {
                let ty = self.expression(node, context);
                if context.position == ExpressionPosition::Statement && self.is_unused_value(node) {
                    self.report_at(&context.trace, node, diagnostic_codes::UNUSED_EXPRESSION, &[]);
                }
                ty
            }
        }
    }

    fn is_unused_value(&self, node: NodeIndex) -> bool {
        match self.arena.kind(node) {
            NodeKind::IntLiteral(_)
            | NodeKind::BooleanLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::NullLiteral
            | NodeKind::Name(_)
            | NodeKind::Dot { .. } => true,
            NodeKind::Binary { op, .. } => !matches!(op, BinaryOp::And | BinaryOp::Or | BinaryOp::Elvis),
            NodeKind::Parenthesized(inner) => self.is_unused_value(*inner),
            _ => false,
        }
    }

    /// A block's value is its last statement's, unless the block itself
    /// is used as a statement.
    pub(super) fn block(&self, statements: &[NodeIndex], context: &Rc<ResolutionContext>) -> KType {
        let scope = LexicalScope::new(&context.scope, ScopeKind::Block, "block");
        let inner = context.replace_scope(&scope);
        let as_statement = inner
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Statement);
        let Some((&last, init)) = statements.split_last() else {
            return self.env.builtins.unit_type();
        };
        for &statement in init {
            self.statement(statement, &as_statement);
        }
        if context.position == ExpressionPosition::Statement || !produces_value(self.arena, last) {
            self.statement(last, &as_statement);
            return self.env.builtins.unit_type();
        }
        self.expression(last, &inner.replace_position(ExpressionPosition::Free))
    }

    // -------------------------------------------------------------------
    // Operators
    // -------------------------------------------------------------------

    /// Resolve `receiver.name(argument?)` for an operator.
    fn operator_call(
        &self,
        node: NodeIndex,
        name: &str,
        receiver: NodeIndex,
        receiver_type: KType,
        argument: Option<(NodeIndex, KType)>,
        context: &Rc<ResolutionContext>,
    ) -> KType {
        if receiver_type.is_error() || argument.as_ref().is_some_and(|(_, ty)| ty.is_error()) {
            return KType::error("operand has errors");
        }
        let span = self.arena.span(node);
        let value_arguments = argument
            .into_iter()
            .map(|(argument, ty)| CallArgument {
                node: argument,
                expression: strip_parentheses(self.arena, argument),
                span: self.arena.span(argument),
                ty,
            })
            .collect();
        let call = Rc::new(Call {
            node,
            span,
            callee_span: span,
            name: Name::identifier(name),
            kind: MemberKind::Function,
            explicit_receiver: Some(ReceiverValue::Expression {
                node: receiver,
                span: self.arena.span(receiver),
                ty: receiver_type,
            }),
            type_arguments: Vec::new(),
            value_arguments,
        });
        self.resolve_with_receiver(node, call, context)
    }

    fn operand(&self, node: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let operand_context = context
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Independent);
        self.expression(node, &operand_context)
    }

    fn unary(&self, node: NodeIndex, op: UnaryOp, operand: NodeIndex, context: &Rc<ResolutionContext>) -> KType {
        let ty = self.operand(operand, context);
        if op == UnaryOp::Not {
            let flow = self.condition_flow(operand, context).negate();
            self.conditions.borrow_mut().insert(node, flow);
        }
        self.operator_call(node, op.function_name(), operand, ty, None, context)
    }

    fn binary(
        &self,
        node: NodeIndex,
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
        context: &Rc<ResolutionContext>,
    ) -> KType {
        let builtins = &self.env.builtins;
        match op {
            BinaryOp::And | BinaryOp::Or => {
                let left_flow = self.condition(left, context);
                let right_info = if op == BinaryOp::And {
                    &left_flow.when_true
                } else {
                    &left_flow.when_false
                };
                let right_flow = self.condition(right, &context.replace_data_flow_info(right_info));
                let flow = if op == BinaryOp::And {
                    ConditionalDataFlow {
                        when_true: right_flow.when_true,
                        when_false: left_flow.when_false.or(&right_flow.when_false),
                    }
                } else {
                    ConditionalDataFlow {
                        when_true: left_flow.when_true.or(&right_flow.when_true),
                        when_false: right_flow.when_false,
                    }
                };
                self.conditions.borrow_mut().insert(node, flow);
                builtins.boolean_type()
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                self.operand(left, context);
                self.operand(right, context);
                if let Some(flow) = self.null_check(op, left, right, context) {
                    self.conditions.borrow_mut().insert(node, flow);
                }
                builtins.boolean_type()
            }
            BinaryOp::Elvis => {
                let left_type = self.operand(left, context);
                if !left_type.is_error() && !left_type.is_nullable() {
                    self.report_at(
                        &context.trace,
                        node,
                        diagnostic_codes::USELESS_ELVIS,
                        &[&left_type.to_string()],
                    );
                }
                let right_type = self.expression(
                    right,
                    &context.replace_expected_type(ExpectedType::NoExpectedType),
                );
                if left_type.is_error() || right_type.is_error() {
                    return KType::error("operand has errors");
                }
                common_supertype(&[left_type.make_not_nullable(), right_type], builtins)
            }
            _ => {
                let Some(function) = op.function_name() else {
                    return KType::error("unsupported operator");
                };
                let left_type = self.operand(left, context);
                let right_type = self.operand(right, context);
                let result = self.operator_call(node, function, left, left_type, Some((right, right_type)), context);
                if op.is_comparison() {
                    builtins.boolean_type()
                } else {
                    result
                }
            }
        }
    }

    /// `x == null` / `x != null` on a stable value.
    fn null_check(
        &self,
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
        context: &ResolutionContext,
    ) -> Option<ConditionalDataFlow> {
        let is_null = |node| matches!(self.arena.kind(strip_parentheses(self.arena, node)), NodeKind::NullLiteral);
        let value = if is_null(right) {
            left
        } else if is_null(left) {
            right
        } else {
            return None;
        };
        let id = self.stable_value(value, context)?;
        let info = &context.data_flow_info;
        let not_null = info.with_not_null(id);
        Some(if op == BinaryOp::NotEq {
            ConditionalDataFlow {
                when_true: not_null,
                when_false: Rc::clone(info),
            }
        } else {
            ConditionalDataFlow {
                when_true: Rc::clone(info),
                when_false: not_null,
            }
        })
    }

    /// The identity of a `val` a simple name refers to, if any.
    pub(super) fn stable_value(&self, node: NodeIndex, context: &ResolutionContext) -> Option<DescriptorId> {
        let node = strip_parentheses(self.arena, node);
        if !matches!(self.arena.kind(node), NodeKind::Name(_)) {
            return None;
        }
        match context.trace.reference(node)? {
            DeclarationDescriptor::Variable(variable) if !variable.is_var => Some(variable.id),
            DeclarationDescriptor::Property(property) if !property.is_var => Some(property.id),
            _ => None,
        }
    }

    /// Analyze a Boolean condition and return what it proves on each outcome.
    pub(super) fn condition(&self, node: NodeIndex, context: &Rc<ResolutionContext>) -> ConditionalDataFlow {
        let condition_context = context
            .replace_expected_type(ExpectedType::NoExpectedType)
            .replace_position(ExpressionPosition::Free)
            .replace_dependency(ContextDependency::Independent);
        let ty = self.expression(node, &condition_context);
        if !ty.is_error() && !is_subtype_of(&ty, &self.env.builtins.boolean_type()) {
            self.report_at(
                &context.trace,
                node,
                diagnostic_codes::CONDITION_TYPE_MISMATCH,
                &[&ty.to_string()],
            );
        }
        self.condition_flow(node, context)
    }

    pub(super) fn condition_flow(&self, node: NodeIndex, context: &ResolutionContext) -> ConditionalDataFlow {
        self.conditions
            .borrow()
            .get(&node)
            .cloned()
            .unwrap_or_else(|| ConditionalDataFlow::unchanged(&context.data_flow_info))
    }
}
