// =============================================================================
// Expressions, statements and conditions
// =============================================================================

use super::method::{MethodGenerator, Pushed};
use crate::error::{CodegenError, CodegenResult};
use crate::types::{ANY_CLASS, INTRINSICS_CLASS, stored_desc};
use kite_bytecode::{Condition, FieldRef, Instruction, Label, MethodDescriptor, MethodRef, TypeDesc};
use kite_syntax::{BinaryOp, NodeIndex, NodeKind, UnaryOp};
use kite_types::DeclarationDescriptor;

impl MethodGenerator<'_> {
    /// Generate `node` and convert its value to `target`.
    pub fn expression_as(&mut self, node: NodeIndex, target: Option<&TypeDesc>) -> CodegenResult<()> {
        let pushed = self.expression(node)?;
        self.coerce(pushed, target);
        Ok(())
    }

    /// Generate `node` as a statement, discarding its value.
    pub fn statement(&mut self, node: NodeIndex) -> CodegenResult<()> {
        self.mark_line(node);
        match self.class.arena.kind(node) {
            NodeKind::Property { initializer, .. } => self.declaration(node, *initializer),
            NodeKind::Function { name, .. } => Err(CodegenError::Unsupported {
                what: format!("local function {name}"),
            }),
            _ => self.expression_as(node, None),
        }
    }

    pub(super) fn expression(&mut self, node: NodeIndex) -> CodegenResult<Pushed> {
        let arena = self.class.arena;
        match arena.kind(node) {
            NodeKind::IntLiteral(value) => {
                self.emit(Instruction::IConst(*value));
                Ok(Some(TypeDesc::Int))
            }
            NodeKind::BooleanLiteral(value) => {
                self.emit(Instruction::BConst(*value));
                Ok(Some(TypeDesc::Boolean))
            }
            NodeKind::StringLiteral(value) => {
                self.emit(Instruction::Ldc(value.as_str().into()));
                Ok(Some(TypeDesc::object("kite/String")))
            }
            NodeKind::NullLiteral => {
                self.emit(Instruction::AConstNull);
                Ok(Some(TypeDesc::object("kite/Nothing")))
            }
            NodeKind::Name(_) => self.name_reference(node),
            NodeKind::Dot { .. } => self.property_get(node),
            NodeKind::Call { .. } => self.call(node),
            NodeKind::Parenthesized(inner) => self.expression(*inner),
            NodeKind::Unary { op: UnaryOp::Not, .. } => self.condition_value(node),
            NodeKind::Unary { op: UnaryOp::Minus, .. } => self.call(node),
            NodeKind::Binary { op, left, right } => match op {
                BinaryOp::And | BinaryOp::Or | BinaryOp::Eq | BinaryOp::NotEq => self.condition_value(node),
                op if op.is_comparison() => self.condition_value(node),
                BinaryOp::Elvis => self.elvis(node, *left, *right),
                _ => self.call(node),
            },
            NodeKind::Assign { target, value } => {
                self.assignment(*target, *value)?;
                Ok(None)
            }
            NodeKind::Block { statements } => self.block(node, statements),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.if_expression(node, *condition, *then_branch, *else_branch),
            NodeKind::When { subject, entries } => self.when_expression(node, *subject, entries),
            NodeKind::While { condition, body } => {
                self.while_loop(*condition, *body)?;
                Ok(None)
            }
            NodeKind::Try { body, catches, finally } => self.try_expression(node, *body, catches, *finally),
            NodeKind::Throw { value } => {
                self.expression(*value)?;
                self.emit(Instruction::AThrow);
                Ok(None)
            }
            NodeKind::Return { value } => {
                self.return_value(*value)?;
                Ok(None)
            }
            NodeKind::Property { .. } | NodeKind::Function { .. } => {
                self.statement(node)?;
                Ok(None)
            }
            other => Err(CodegenError::Unsupported {
                what: format!("expression {other:?}"),
            }),
        }
    }

    fn name_reference(&mut self, node: NodeIndex) -> CodegenResult<Pushed> {
        match self.class.trace.reference(node) {
            Some(DeclarationDescriptor::Variable(variable)) => {
                let local = self.local(variable.id, node)?;
                self.load_slot(local.slot, &local.desc);
                Ok(Some(local.desc))
            }
            Some(DeclarationDescriptor::Property(_)) => self.property_get(node),
            _ => Err(CodegenError::MissingBinding {
                node: node.0,
                what: "reference",
            }),
        }
    }

    /// A `val`/`var` statement: a new local, or the initialization of a
    /// script property.
    fn declaration(&mut self, node: NodeIndex, initializer: NodeIndex) -> CodegenResult<()> {
        match self.class.trace.declaration(node) {
            Some(DeclarationDescriptor::Variable(variable)) => {
                let local = self.declare_local(variable.id, stored_desc(&variable.ty));
                if initializer.is_some() {
                    self.expression_as(initializer, Some(&local.desc))?;
                    self.store_slot(local.slot, &local.desc);
                }
                Ok(())
            }
            Some(DeclarationDescriptor::Property(property)) => {
                if initializer.is_none() {
                    return Ok(());
                }
                let field = FieldRef::new(
                    &self.class.internal_name,
                    property.name.as_str(),
                    stored_desc(&property.ty),
                );
                if self.is_static {
                    self.expression_as(initializer, Some(&field.ty))?;
                    self.emit(Instruction::PutStatic(field));
                } else {
                    self.emit(Instruction::ALoad(0));
                    self.expression_as(initializer, Some(&field.ty))?;
                    self.emit(Instruction::PutField(field));
                }
                Ok(())
            }
            _ => Err(CodegenError::MissingBinding {
                node: node.0,
                what: "declaration",
            }),
        }
    }

    fn block(&mut self, node: NodeIndex, statements: &[NodeIndex]) -> CodegenResult<Pushed> {
        let target = self.node_desc(node);
        let Some((&last, init)) = statements.split_last() else {
            return Ok(None);
        };
        for &statement in init {
            self.statement(statement)?;
        }
        match &target {
            Some(desc) => {
                self.mark_line(last);
                self.expression_as(last, Some(desc))?;
            }
            None => self.statement(last)?,
        }
        Ok(target)
    }

    fn assignment(&mut self, target: NodeIndex, value: NodeIndex) -> CodegenResult<()> {
        let arena = self.class.arena;
        let mut target = target;
        while let NodeKind::Parenthesized(inner) = arena.kind(target) {
            target = *inner;
        }
        if let Some(DeclarationDescriptor::Variable(variable)) = self.class.trace.reference(target) {
            let local = self.local(variable.id, target)?;
            self.expression_as(value, Some(&local.desc))?;
            self.store_slot(local.slot, &local.desc);
            return Ok(());
        }
        self.property_set(target, value)
    }

    fn elvis(&mut self, node: NodeIndex, left: NodeIndex, right: NodeIndex) -> CodegenResult<Pushed> {
        let target = self.node_desc(node);
        let is_null = self.new_label();
        let done = self.new_label();
        let pushed = self.expression(left)?;
        self.emit(Instruction::Dup);
        self.jump_if_null(is_null);
        self.coerce(pushed, target.as_ref());
        self.goto(done);
        self.place(is_null);
        self.emit(Instruction::Pop);
        self.expression_as(right, target.as_ref())?;
        self.place(done);
        Ok(target)
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    /// Materialize a condition as `true` or `false`.
    fn condition_value(&mut self, node: NodeIndex) -> CodegenResult<Pushed> {
        let is_false = self.new_label();
        let done = self.new_label();
        self.branch(node, false, is_false)?;
        self.emit(Instruction::BConst(true));
        self.goto(done);
        self.place(is_false);
        self.emit(Instruction::BConst(false));
        self.place(done);
        Ok(Some(TypeDesc::Boolean))
    }

    /// Jump to `target` when `node` evaluates to `when`, fall through
    /// otherwise.
    pub(super) fn branch(&mut self, node: NodeIndex, when: bool, target: Label) -> CodegenResult<()> {
        let arena = self.class.arena;
        match arena.kind(node) {
            NodeKind::Parenthesized(inner) => self.branch(*inner, when, target),
            NodeKind::BooleanLiteral(value) => {
                if *value == when {
                    self.goto(target);
                }
                Ok(())
            }
            NodeKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.branch(*operand, !when, target),
            NodeKind::Binary { op, left, right } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    // `a && b` jumps on true only when both hold; `a || b`
                    // jumps on false only when neither does.
                    let short_circuit = (*op == BinaryOp::Or) == when;
                    if short_circuit {
                        self.branch(*left, when, target)?;
                        self.branch(*right, when, target)
                    } else {
                        let skip = self.new_label();
                        self.branch(*left, !when, skip)?;
                        self.branch(*right, when, target)?;
                        self.place(skip);
                        Ok(())
                    }
                }
                BinaryOp::Eq | BinaryOp::NotEq => {
                    let jump_if_equal = (*op == BinaryOp::Eq) == when;
                    self.equality_branch(*left, *right, jump_if_equal, target)
                }
                op if op.is_comparison() => self.comparison_branch(node, *op, *left, *right, when, target),
                _ => self.boolean_branch(node, when, target),
            },
            _ => self.boolean_branch(node, when, target),
        }
    }

    fn boolean_branch(&mut self, node: NodeIndex, when: bool, target: Label) -> CodegenResult<()> {
        self.expression_as(node, Some(&TypeDesc::Boolean))?;
        self.jump_if(if when { Condition::Ne } else { Condition::Eq }, target);
        Ok(())
    }

    fn is_null_literal(&self, node: NodeIndex) -> bool {
        let arena = self.class.arena;
        match arena.kind(node) {
            NodeKind::NullLiteral => true,
            NodeKind::Parenthesized(inner) => self.is_null_literal(*inner),
            _ => false,
        }
    }

    fn equality_branch(
        &mut self,
        left: NodeIndex,
        right: NodeIndex,
        jump_if_equal: bool,
        target: Label,
    ) -> CodegenResult<()> {
        let null_check = if self.is_null_literal(right) {
            Some(left)
        } else if self.is_null_literal(left) {
            Some(right)
        } else {
            None
        };
        if let Some(operand) = null_check {
            let pushed = self.expression(operand)?;
            match pushed {
                Some(TypeDesc::Object(_)) => {
                    if jump_if_equal {
                        self.jump_if_null(target);
                    } else {
                        self.jump_if_non_null(target);
                    }
                }
                // A non-null value never equals `null`.
                other => {
                    self.coerce(other, None);
                    if !jump_if_equal {
                        self.goto(target);
                    }
                }
            }
            return Ok(());
        }

        let left_desc = self.node_desc(left);
        let right_desc = self.node_desc(right);
        let integral = |desc: &Option<TypeDesc>| desc.as_ref().is_some_and(TypeDesc::is_integral);
        if integral(&left_desc) && left_desc == right_desc {
            self.expression_as(left, left_desc.as_ref())?;
            self.expression_as(right, right_desc.as_ref())?;
            self.jump_if_icmp(if jump_if_equal { Condition::Eq } else { Condition::Ne }, target);
            return Ok(());
        }
        self.are_equal(left, right)?;
        self.jump_if(if jump_if_equal { Condition::Ne } else { Condition::Eq }, target);
        Ok(())
    }

    /// Push whether the values of `left` and `right` are equal.
    fn are_equal(&mut self, left: NodeIndex, right: NodeIndex) -> CodegenResult<()> {
        let any = TypeDesc::object(ANY_CLASS);
        self.expression_as(left, Some(&any))?;
        self.expression_as(right, Some(&any))?;
        self.invoke_are_equal();
        Ok(())
    }

    pub(super) fn invoke_are_equal(&mut self) {
        let any = TypeDesc::object(ANY_CLASS);
        self.emit(Instruction::InvokeStatic(MethodRef::new(
            INTRINSICS_CLASS,
            "areEqual",
            MethodDescriptor::new(vec![any.clone(), any], TypeDesc::Boolean),
        )));
    }

    fn comparison_branch(
        &mut self,
        node: NodeIndex,
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
        when: bool,
        target: Label,
    ) -> CodegenResult<()> {
        let mut condition = match op {
            BinaryOp::Less => Condition::Lt,
            BinaryOp::LessEq => Condition::Le,
            BinaryOp::Greater => Condition::Gt,
            _ => Condition::Ge,
        };
        if !when {
            condition = condition.negate();
        }
        let resolved = self.resolved_call(node)?;
        if Self::is_int_comparison(&resolved) {
            self.expression_as(left, Some(&TypeDesc::Int))?;
            self.expression_as(right, Some(&TypeDesc::Int))?;
            self.jump_if_icmp(condition, target);
        } else {
            // `compareTo` result against zero.
            let pushed = self.invoke_resolved(&resolved)?;
            self.coerce(pushed, Some(&TypeDesc::Int));
            self.jump_if(condition, target);
        }
        Ok(())
    }
}
