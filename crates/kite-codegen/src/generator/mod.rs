//! Class assembly for REPL lines and file facades.

mod calls;
mod control_flow;
mod expressions;
mod method;

use crate::error::{CodegenError, CodegenResult};
use crate::types::{
    ANY_CLASS, RESULT_FIELD, accessor_name, earlier_line_field, function_descriptor, getter_descriptor,
    internal_name, setter_descriptor, stored_desc, value_desc,
};
use crate::{GeneratedScript, ScriptUnit};
use kite_bytecode::{
    AccessFlags, CONSTRUCTOR_NAME, ClassFile, FieldInfo, FieldRef, Instruction, MethodDescriptor, MethodInfo,
    MethodRef, STATIC_INITIALIZER_NAME, TypeDesc,
};
use kite_common::LineMap;
use kite_resolve::{BindingTrace, ScriptFunction, ScriptProperty};
use kite_syntax::{NodeArena, NodeIndex, NodeKind};
use kite_types::{ClassId, Visibility};
use method::MethodGenerator;
use tracing::{debug, debug_span};

/// What every method of the class being generated shares.
pub(crate) struct ClassContext<'a> {
    pub arena: &'a NodeArena,
    pub trace: &'a BindingTrace,
    pub lines: LineMap,
    pub class_id: ClassId,
    pub internal_name: String,
    /// Instance class of a REPL line, rather than a static facade.
    pub is_repl: bool,
    pub earlier_lines: &'a [ClassId],
}

impl ClassContext<'_> {
    /// Whether members of `owner` are fields and methods of this line or
    /// an earlier one.
    pub fn is_line_class(&self, owner: &ClassId) -> bool {
        self.is_repl && (*owner == self.class_id || self.earlier_lines.contains(owner))
    }

    /// 1-based source line of `node`.
    pub fn line_of(&self, node: NodeIndex) -> u32 {
        self.lines.offset_to_position(self.arena.span(node).start).line + 1
    }
}

/// Generate the class of one analyzed script.
pub fn generate_script(unit: &ScriptUnit<'_>) -> CodegenResult<GeneratedScript> {
    let analysis = unit.analysis;
    let class_id = analysis.mode.class_id();
    let _span = debug_span!("generate_script", class = %class_id).entered();
    if analysis.has_errors() || unit.script.has_errors() {
        return Err(CodegenError::AnalysisErrors {
            class: class_id.to_string(),
        });
    }

    let context = ClassContext {
        arena: &unit.script.arena,
        trace: &analysis.trace,
        lines: LineMap::build(unit.source),
        internal_name: internal_name(&class_id),
        class_id,
        is_repl: analysis.mode.is_repl(),
        earlier_lines: if analysis.mode.is_repl() { unit.earlier_lines } else { &[] },
    };
    let mut class = ClassFile::new(
        &context.internal_name,
        Some(ANY_CLASS),
        AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::SCRIPT,
    );
    class.source_file = Some(unit.script.file_name.clone());

    let result = analysis
        .result
        .as_ref()
        .filter(|_| context.is_repl)
        .and_then(|result| value_desc(&result.ty).map(|ty| FieldRef::new(&context.internal_name, RESULT_FIELD, ty)));

    if context.is_repl {
        for line in context.earlier_lines {
            class.fields.push(FieldInfo {
                name: earlier_line_field(line).into(),
                ty: TypeDesc::object(&internal_name(line)),
                flags: AccessFlags::PRIVATE | AccessFlags::FINAL | AccessFlags::SYNTHETIC,
            });
        }
    }
    for property in &analysis.properties {
        class.fields.push(property_field(&context, property));
    }
    if let Some(result) = &result {
        class.fields.push(FieldInfo {
            name: result.name.clone(),
            ty: result.ty.clone(),
            flags: AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::SYNTHETIC,
        });
    }

    let result_node = result.as_ref().and(analysis.result.as_ref()).map(|r| r.node);
    class.methods.push(initializer(&context, unit.script.statements(), result_node, result.as_ref())?);
    for function in &analysis.functions {
        class.methods.push(function_method(&context, function)?);
    }
    if !context.is_repl {
        for property in &analysis.properties {
            if property.descriptor.visibility != Visibility::Private {
                class.methods.extend(facade_accessors(&context, property)?);
            }
        }
    }

    debug!(
        fields = class.fields.len(),
        methods = class.methods.len(),
        has_result = result.is_some(),
        "generated class"
    );
    Ok(GeneratedScript { class, result })
}

fn property_field(context: &ClassContext<'_>, property: &ScriptProperty) -> FieldInfo {
    let descriptor = &property.descriptor;
    let mut flags = if context.is_repl && descriptor.visibility != Visibility::Private {
        AccessFlags::PUBLIC
    } else {
        AccessFlags::PRIVATE
    };
    if !context.is_repl {
        flags |= AccessFlags::STATIC;
    }
    if !descriptor.is_var {
        flags |= AccessFlags::FINAL;
    }
    FieldInfo {
        name: descriptor.name.as_str().into(),
        ty: stored_desc(&descriptor.ty),
        flags,
    }
}

/// `<init>` of a REPL line or `<clinit>` of a facade: the top-level
/// statements in order.
fn initializer(
    context: &ClassContext<'_>,
    statements: &[NodeIndex],
    result_node: Option<NodeIndex>,
    result: Option<&FieldRef>,
) -> CodegenResult<MethodInfo> {
    let (name, descriptor, flags) = if context.is_repl {
        let parameters = context
            .earlier_lines
            .iter()
            .map(|line| TypeDesc::object(&internal_name(line)))
            .collect();
        (
            CONSTRUCTOR_NAME,
            MethodDescriptor::new(parameters, TypeDesc::Void),
            AccessFlags::PUBLIC,
        )
    } else {
        (
            STATIC_INITIALIZER_NAME,
            MethodDescriptor::new(Vec::new(), TypeDesc::Void),
            AccessFlags::STATIC,
        )
    };
    let argument_slots = descriptor.parameters.len() as u16 + u16::from(context.is_repl);
    let mut method = MethodGenerator::new(context, name, !context.is_repl, TypeDesc::Void, argument_slots);

    if context.is_repl {
        method.emit(Instruction::ALoad(0));
        method.emit(Instruction::InvokeSpecial(MethodRef::new(
            ANY_CLASS,
            CONSTRUCTOR_NAME,
            MethodDescriptor::new(Vec::new(), TypeDesc::Void),
        )));
        for (index, line) in context.earlier_lines.iter().enumerate() {
            method.emit(Instruction::ALoad(0));
            method.emit(Instruction::ALoad(index as u16 + 1));
            method.emit(Instruction::PutField(FieldRef::new(
                &context.internal_name,
                &earlier_line_field(line),
                TypeDesc::object(&internal_name(line)),
            )));
        }
    }

    for &statement in statements {
        if matches!(context.arena.kind(statement), NodeKind::Function { .. }) {
            continue;
        }
        match result {
            Some(field) if result_node == Some(statement) => {
                method.mark_line(statement);
                method.emit(Instruction::ALoad(0));
                method.expression_as(statement, Some(&field.ty))?;
                method.emit(Instruction::PutField(field.clone()));
            }
            _ => method.statement(statement)?,
        }
    }
    method.emit(Instruction::Return);

    Ok(MethodInfo {
        name: name.into(),
        descriptor,
        flags,
        code: Some(method.finish()?),
    })
}

fn function_method(context: &ClassContext<'_>, function: &ScriptFunction) -> CodegenResult<MethodInfo> {
    let NodeKind::Function {
        parameters,
        body,
        expression_body,
        ..
    } = context.arena.kind(function.node)
    else {
        return Err(CodegenError::MissingBinding {
            node: function.node.0,
            what: "function declaration",
        });
    };
    let descriptor = function_descriptor(&function.descriptor);
    let is_static = !context.is_repl;
    let mut flags = if function.descriptor.visibility == Visibility::Private {
        AccessFlags::PRIVATE
    } else {
        AccessFlags::PUBLIC
    } | AccessFlags::FINAL;
    if is_static {
        flags |= AccessFlags::STATIC;
    }

    let name = function.descriptor.name.to_string();
    let first_slot = u16::from(!is_static);
    let argument_slots = first_slot + descriptor.parameters.len() as u16;
    let mut method = MethodGenerator::new(context, &name, is_static, descriptor.returns.clone(), argument_slots);
    for (index, (&parameter, ty)) in parameters.iter().zip(&descriptor.parameters).enumerate() {
        method.bind_parameter(parameter, first_slot + index as u16, ty.clone())?;
    }

    method.mark_line(function.node);
    if *expression_body {
        method.return_value(*body)?;
    } else {
        method.statement(*body)?;
        if method.is_reachable() {
            if descriptor.returns.is_void() {
                method.emit(Instruction::Return);
            } else {
                method.throw_illegal_state(&format!("{name} finished without returning a value"));
            }
        }
    }

    Ok(MethodInfo {
        name: name.into(),
        descriptor,
        flags,
        code: Some(method.finish()?),
    })
}

/// Static `get<Name>` and `set<Name>` of a facade property.
fn facade_accessors(context: &ClassContext<'_>, property: &ScriptProperty) -> CodegenResult<Vec<MethodInfo>> {
    let descriptor = &property.descriptor;
    let field = FieldRef::new(&context.internal_name, descriptor.name.as_str(), stored_desc(&descriptor.ty));
    let flags = AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL;
    let mut accessors = Vec::with_capacity(2);

    let getter_name = accessor_name("get", descriptor.name.as_str());
    let mut getter = MethodGenerator::new(context, &getter_name, true, field.ty.clone(), 0);
    getter.mark_line(property.node);
    getter.emit(Instruction::GetStatic(field.clone()));
    getter.emit_return();
    accessors.push(MethodInfo {
        name: getter_name.into(),
        descriptor: getter_descriptor(descriptor),
        flags,
        code: Some(getter.finish()?),
    });

    if descriptor.is_var {
        let setter_name = accessor_name("set", descriptor.name.as_str());
        let mut setter = MethodGenerator::new(context, &setter_name, true, TypeDesc::Void, 1);
        setter.mark_line(property.node);
        setter.load_slot(0, &field.ty);
        setter.emit(Instruction::PutStatic(field));
        setter.emit(Instruction::Return);
        accessors.push(MethodInfo {
            name: setter_name.into(),
            descriptor: setter_descriptor(descriptor),
            flags,
            code: Some(setter.finish()?),
        });
    }
    Ok(accessors)
}
