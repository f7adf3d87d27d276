//! Script analysis.
//!
//! A script is analyzed in three passes. Functions with a declared or
//! block-body return type are declared first, so any statement can call
//! them. Statements then run in order: properties are declared where they
//! appear, expression-body functions without a return type are inferred
//! where they appear, and expressions are bound. Finally the bodies of the
//! functions declared up front are analyzed.
//!
//! A REPL line becomes the script class `LineN`: its declarations are
//! instance members, and the scope handed to the next line sees them
//! through an implicit receiver. A compiled file puts its declarations
//! into a facade class as static members.

mod control_flow;
mod declarations;
mod expressions;
mod references;

use crate::cache::ResolutionResultsCache;
use crate::call_resolver::CallResolver;
use crate::context::{ExpressionPosition, ResolutionContext};
use crate::data_flow::ConditionalDataFlow;
use crate::environment::ResolveEnvironment;
use crate::scope::{LexicalScope, ReceiverParameter, ScopeKind};
use crate::trace::BindingTrace;
use crate::type_resolver::TypeResolver;
use kite_common::{Diagnostic, Span};
use kite_syntax::{NodeArena, NodeIndex, NodeKind, ParsedScript};
use kite_types::{
    ClassDescriptor, ClassId, ClassKind, ContainingDeclaration, EagerClassContents, FqName,
    FunctionDescriptor, KType, MemberScope, Modality, PropertyDescriptor, Visibility,
};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info_span};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptMode {
    /// The `line`-th REPL line.
    ReplLine { line: u32 },
    /// A source file compiled to the static members of `facade`.
    File { facade: ClassId },
}

impl ScriptMode {
    pub fn class_id(&self) -> ClassId {
        match self {
            ScriptMode::ReplLine { line } => line_class_id(*line),
            ScriptMode::File { facade } => facade.clone(),
        }
    }

    pub fn is_repl(&self) -> bool {
        matches!(self, ScriptMode::ReplLine { .. })
    }
}

/// The class compiled from REPL line `line`.
pub fn line_class_id(line: u32) -> ClassId {
    ClassId::top_level(&FqName::parse(&format!("Line{line}")))
}

/// The facade class holding the declarations of `file_name`:
/// `hello_world.kite` becomes `Hello_worldKt`.
pub fn file_facade_class_id(file_name: &str) -> ClassId {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Script");
    let mut chars = stem.chars().filter(|c| c.is_alphanumeric() || *c == '_');
    let mut name: String = chars.next().map(|c| c.to_uppercase().collect()).unwrap_or_else(|| "Script".to_string());
    name.extend(chars);
    name.push_str("Kt");
    ClassId::top_level(&FqName::parse(&name))
}

#[derive(Clone, Debug)]
pub struct ScriptProperty {
    pub node: NodeIndex,
    pub descriptor: Arc<PropertyDescriptor>,
}

#[derive(Clone, Debug)]
pub struct ScriptFunction {
    pub node: NodeIndex,
    pub descriptor: Arc<FunctionDescriptor>,
}

/// The value a REPL line evaluates to: its last expression statement.
#[derive(Clone, Debug)]
pub struct ScriptResult {
    pub node: NodeIndex,
    pub ty: KType,
}

#[derive(Debug)]
pub struct ScriptAnalysis {
    pub mode: ScriptMode,
    pub class: Arc<ClassDescriptor>,
    pub trace: Rc<BindingTrace>,
    pub properties: Vec<ScriptProperty>,
    pub functions: Vec<ScriptFunction>,
    pub result: Option<ScriptResult>,
    /// The scope the next line or file is analyzed in.
    pub scope: Rc<LexicalScope>,
}

impl ScriptAnalysis {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.trace.diagnostics()
    }

    pub fn has_errors(&self) -> bool {
        self.trace.has_errors()
    }

    /// The script's declarations as members.
    pub fn member_scope(&self) -> MemberScope {
        let mut scope = MemberScope::new();
        for property in &self.properties {
            scope.add_property(Arc::clone(&property.descriptor));
        }
        for function in &self.functions {
            scope.add_function(Arc::clone(&function.descriptor));
        }
        scope
    }
}

/// Analyze `script` in `scope`, the scope left by the previous line or
/// file (or the environment's default scope).
pub fn analyze_script(
    env: &ResolveEnvironment,
    script: &ParsedScript,
    mode: ScriptMode,
    scope: &Rc<LexicalScope>,
) -> ScriptAnalysis {
    let class_id = mode.class_id();
    let _span = info_span!("analyze_script", file = %script.file_name, class = %class_id).entered();
    let kind = if mode.is_repl() { ClassKind::Script } else { ClassKind::Object };
    let class = Arc::new(ClassDescriptor::new(
        class_id.clone(),
        kind,
        Visibility::Public,
        Modality::Final,
        Vec::new(),
    ));
    let analyzer = ScriptAnalyzer::new(env, &script.arena, &script.file_name, mode.clone(), Arc::clone(&class));
    let trace = BindingTrace::new(format!("script {class_id}"));

    let imports_scope = analyzer.imports(script.imports(), scope, &trace);
    let script_scope = LexicalScope::new(&imports_scope, ScopeKind::Script, format!("script {class_id}"));
    let context = ResolutionContext::new(Rc::clone(&trace), Rc::clone(&script_scope), ResolutionResultsCache::new());

    let statements = script.statements();
    let mut functions = Vec::new();
    let mut pending_bodies = Vec::new();
    for &statement in statements {
        if !declarations::has_known_return_type(&script.arena, statement) {
            continue;
        }
        if let Some(declared) = analyzer.declare_function(statement, &context) {
            functions.push(ScriptFunction {
                node: statement,
                descriptor: Arc::clone(&declared.descriptor),
            });
            pending_bodies.push(declared);
        }
    }

    let mut properties = Vec::new();
    let mut result = None;
    let last_index = statements.len().checked_sub(1);
    for (index, &statement) in statements.iter().enumerate() {
        match script.arena.kind(statement) {
            NodeKind::Property { .. } => {
                if let Some(descriptor) = analyzer.script_property(statement, &context) {
                    properties.push(ScriptProperty {
                        node: statement,
                        descriptor,
                    });
                }
            }
            NodeKind::Function { .. } => {
                if declarations::has_known_return_type(&script.arena, statement) {
                    continue;
                }
                if let Some(declared) = analyzer.declare_function(statement, &context) {
                    functions.push(ScriptFunction {
                        node: statement,
                        descriptor: declared.descriptor,
                    });
                }
            }
            _ => {
                let is_result = analyzer.mode.is_repl()
                    && Some(index) == last_index
                    && expressions::produces_value(&script.arena, statement);
                let position = if is_result {
                    ExpressionPosition::Free
                } else {
                    ExpressionPosition::Statement
                };
                let ty = analyzer.statement(statement, &context.replace_position(position));
                if is_result {
                    result = Some(ScriptResult { node: statement, ty });
                }
            }
        }
    }

    for declared in &pending_bodies {
        analyzer.function_body(declared, &context);
    }

    let mut members = MemberScope::new();
    for property in &properties {
        members.add_property(Arc::clone(&property.descriptor));
    }
    for function in &functions {
        members.add_function(Arc::clone(&function.descriptor));
    }
    class.initialize(Box::new(EagerClassContents {
        supertypes: vec![env.builtins.any_type()],
        scope: members,
        constructors: Vec::new(),
    }));

    let next_scope = match &mode {
        ScriptMode::ReplLine { .. } => LexicalScope::receiver(
            &imports_scope,
            ReceiverParameter {
                ty: KType::simple_class(&class),
                class: Arc::clone(&class),
            },
        ),
        ScriptMode::File { .. } => {
            let mut visible = MemberScope::new();
            for property in properties.iter().filter(|p| p.descriptor.visibility != Visibility::Private) {
                visible.add_property(Arc::clone(&property.descriptor));
            }
            for function in functions.iter().filter(|f| f.descriptor.visibility != Visibility::Private) {
                visible.add_function(Arc::clone(&function.descriptor));
            }
            LexicalScope::importing(scope, &visible, format!("declarations of {}", script.file_name))
        }
    };

    debug!(
        properties = properties.len(),
        functions = functions.len(),
        diagnostics = trace.diagnostics().len(),
        "script analyzed"
    );
    ScriptAnalysis {
        mode,
        class,
        trace,
        properties,
        functions,
        result,
        scope: next_scope,
    }
}

pub(crate) struct ScriptAnalyzer<'a> {
    env: &'a ResolveEnvironment,
    arena: &'a NodeArena,
    file_name: &'a str,
    mode: ScriptMode,
    class: Arc<ClassDescriptor>,
    calls: CallResolver<'a>,
    types: TypeResolver<'a>,
    depth: Cell<u32>,
    depth_reported: Cell<bool>,
    /// Data flow on each outcome of boolean expressions analyzed so far.
    conditions: RefCell<FxHashMap<NodeIndex, ConditionalDataFlow>>,
}

impl<'a> ScriptAnalyzer<'a> {
    fn new(
        env: &'a ResolveEnvironment,
        arena: &'a NodeArena,
        file_name: &'a str,
        mode: ScriptMode,
        class: Arc<ClassDescriptor>,
    ) -> Self {
        ScriptAnalyzer {
            env,
            arena,
            file_name,
            calls: CallResolver::new(&env.builtins, file_name, Some(mode.class_id())),
            types: TypeResolver::new(arena, &env.finder, file_name),
            mode,
            class,
            depth: Cell::new(0),
            depth_reported: Cell::new(false),
            conditions: RefCell::default(),
        }
    }

    fn report(&self, trace: &BindingTrace, span: Span, code: u32, args: &[&str]) {
        trace.report(Diagnostic::from_code(self.file_name, span.start, span.len(), code, args));
    }

    fn report_at(&self, trace: &BindingTrace, node: NodeIndex, code: u32, args: &[&str]) {
        self.report(trace, self.arena.span(node), code, args);
    }

    /// Where declarations of this script live.
    fn containing(&self) -> ContainingDeclaration {
        match &self.mode {
            ScriptMode::ReplLine { .. } => ContainingDeclaration::Class(self.class.class_id.clone()),
            ScriptMode::File { facade } => ContainingDeclaration::Package {
                fq_name: FqName::root(),
                facade: facade.clone(),
            },
        }
    }

    fn dispatch_receiver(&self) -> Option<ClassId> {
        self.mode.is_repl().then(|| self.class.class_id.clone())
    }
}

#[cfg(test)]
#[path = "../../tests/analyzer_tests.rs"]
mod analyzer_tests;
