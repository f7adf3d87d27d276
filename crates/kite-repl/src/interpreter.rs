//! The per-line state machine.
//!
//! A submission ends in exactly one [`LineResult`]. Its only lasting
//! effects are on success: the scope the next line is analyzed in and the
//! earlier-lines list. A failed line leaves both untouched, though it still
//! uses up its line number, so class names are never reused.

use crate::console::{ExecutingFlag, GatedConsole};
use crate::environment::Environment;
use crate::error::{ClasspathError, ReplError, ReplResult};
use crate::init::BackgroundInit;
use crate::stack_trace::render_exception;
use kite_bytecode::{MethodDescriptor, TypeDesc, disassemble_class};
use kite_codegen::{CodegenError, ScriptUnit, generate_script};
use kite_common::{Diagnostic, DiagnosticCategory, LineMap};
use kite_resolve::{
    LexicalScope, ResolveEnvironment, ScriptMode, TipsManager, analyze_script, completion_target, line_class_id,
};
use kite_syntax::parse_script;
use kite_types::{ClassDescriptor, ClassId};
use kite_vm::{Console, ObjectRef, Value, Vm, VmError, VmOptions};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Debug, Default)]
pub struct ReplOptions {
    /// Report incomplete input as a compile error instead of waiting for
    /// the rest of it. Used when an IDE or script feeds whole lines.
    pub embedded: bool,
    pub classpath: Vec<PathBuf>,
    pub vm: VmOptions,
}

/// The outcome of one submission.
#[derive(Debug)]
pub enum LineResult {
    /// The line ran. `value` is `Unit` and `is_unit` set when the line was
    /// not an expression with a value.
    Success { value: Value, is_unit: bool },
    /// More input is needed; it will be appended to this line.
    Incomplete,
    CompileError(String),
    RuntimeError(String),
}

/// A line that ran successfully.
#[derive(Debug)]
pub struct EarlierLine {
    pub number: u32,
    pub text: String,
    /// The script class as analysis saw it.
    pub script: Arc<ClassDescriptor>,
    pub class: ClassId,
    /// Internal name of the generated class.
    pub class_name: String,
    pub instance: ObjectRef,
}

struct Session {
    env: ResolveEnvironment,
    scope: Rc<LexicalScope>,
}

enum EnvironmentState {
    Pending(BackgroundInit<Environment, ClasspathError>),
    Ready(Session),
    Failed(String),
}

pub struct ReplInterpreter {
    options: ReplOptions,
    environment: EnvironmentState,
    vm: Vm,
    executing: ExecutingFlag,
    earlier: Vec<EarlierLine>,
    /// Incomplete submissions waiting for the rest of the line.
    pending: Vec<String>,
    next_line: u32,
}

impl ReplInterpreter {
    /// Start loading the classpath in the background and return at once.
    /// The first line to be evaluated waits for the load to finish.
    pub fn start(options: ReplOptions, console: impl Console + 'static) -> ReplResult<Self> {
        let classpath = options.classpath.clone();
        let init = BackgroundInit::spawn("kite-repl-init", move || Environment::load(&classpath))?;
        Ok(Self::with_init(options, console, init))
    }

    /// An interpreter over an already loaded environment.
    pub fn with_environment(options: ReplOptions, console: impl Console + 'static, environment: Environment) -> Self {
        Self::with_init(options, console, BackgroundInit::ready(Ok(environment)))
    }

    fn with_init(
        options: ReplOptions,
        console: impl Console + 'static,
        init: BackgroundInit<Environment, ClasspathError>,
    ) -> Self {
        let executing = ExecutingFlag::new();
        let vm = Vm::with_options(
            Box::new(GatedConsole::new(console, executing.clone())),
            options.vm.clone(),
        );
        ReplInterpreter {
            options,
            environment: EnvironmentState::Pending(init),
            vm,
            executing,
            earlier: Vec::new(),
            pending: Vec::new(),
            next_line: 1,
        }
    }

    pub fn options(&self) -> &ReplOptions {
        &self.options
    }

    /// Whether initialization is over, successfully or not.
    pub fn is_initialized(&self) -> bool {
        match &self.environment {
            EnvironmentState::Pending(init) => init.is_finished(),
            EnvironmentState::Ready(_) | EnvironmentState::Failed(_) => true,
        }
    }

    /// Whether earlier incomplete input is waiting to be continued.
    pub fn has_pending_input(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn earlier_lines(&self) -> &[EarlierLine] {
        &self.earlier
    }

    pub fn next_line_number(&self) -> u32 {
        self.next_line
    }

    pub fn executing(&self) -> &ExecutingFlag {
        &self.executing
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// Block until the environment is loaded.
    pub fn wait_for_initialization(&mut self) -> ReplResult<()> {
        self.session().map(|_| ())
    }

    fn session(&mut self) -> ReplResult<&mut Session> {
        if let EnvironmentState::Pending(init) = &self.environment {
            let outcome = init.wait();
            self.environment = match outcome {
                Some(Ok(Ok(environment))) => EnvironmentState::Ready(self.install(environment)?),
                Some(Ok(Err(error))) => {
                    self.environment = EnvironmentState::Failed(error.to_string());
                    return Err(ReplError::Init(error));
                }
                Some(Err(error)) => {
                    self.environment = EnvironmentState::Failed(error.to_string());
                    return Err(error);
                }
                None => EnvironmentState::Failed("initialization result was already taken".to_string()),
            };
        }
        match &mut self.environment {
            EnvironmentState::Ready(session) => Ok(session),
            EnvironmentState::Failed(message) => Err(ReplError::Unavailable(message.clone())),
            EnvironmentState::Pending(_) => Err(ReplError::Unavailable("initialization did not finish".to_string())),
        }
    }

    fn install(&mut self, environment: Environment) -> ReplResult<Session> {
        let classes = environment.classes.len();
        for class in environment.classes {
            self.vm.define_class(class)?;
        }
        let scope = environment.resolve.default_scope();
        info!(classes, "REPL environment ready");
        Ok(Session {
            env: environment.resolve,
            scope,
        })
    }

    /// Evaluate one line of input.
    ///
    /// `Err` means the REPL itself cannot go on; problems in the line are
    /// reported through the [`LineResult`].
    pub fn eval(&mut self, line: &str) -> ReplResult<LineResult> {
        self.session()?;
        self.pending.push(line.to_string());
        let text = self.pending.join("\n");
        let number = self.next_line;
        let file_name = line_file_name(number);

        let script = parse_script(&file_name, &text);
        if script.has_errors() {
            if script.incomplete && !self.options.embedded {
                debug!(line = number, buffered = self.pending.len(), "incomplete input");
                return Ok(LineResult::Incomplete);
            }
            self.finish_submission();
            return Ok(LineResult::CompileError(render_diagnostics(&text, &script.diagnostics)));
        }
        self.finish_submission();

        let analysis = {
            let session = self.session()?;
            analyze_script(&session.env, &script, ScriptMode::ReplLine { line: number }, &session.scope)
        };
        if analysis.has_errors() {
            debug!(line = number, "analysis failed");
            return Ok(LineResult::CompileError(render_diagnostics(&text, &analysis.diagnostics())));
        }

        let earlier_classes: Vec<ClassId> = self.earlier.iter().map(|line| line.class.clone()).collect();
        let generated = match generate_script(&ScriptUnit {
            script: &script,
            source: &text,
            analysis: &analysis,
            earlier_lines: &earlier_classes,
        }) {
            Ok(generated) => generated,
            Err(error @ CodegenError::Unsupported { .. }) => {
                return Ok(LineResult::CompileError(format!("{file_name}: error: {error}")));
            }
            Err(error) => return Err(error.into()),
        };

        let class_name = generated.class.name.to_string();
        self.vm.define_class(generated.class)?;
        let descriptor = MethodDescriptor::new(
            self.earlier
                .iter()
                .map(|line| TypeDesc::object(&line.class_name))
                .collect(),
            TypeDesc::Void,
        );
        let arguments = self
            .earlier
            .iter()
            .map(|line| Value::Object(Rc::clone(&line.instance)))
            .collect();
        let outcome = {
            let _executing = self.executing.enter();
            self.vm.instantiate(&class_name, &descriptor, arguments)
        };
        self.vm.console_mut().flush();

        let instance = match outcome {
            Ok(instance) => instance,
            Err(VmError::Uncaught(thrown)) => {
                debug!(line = number, exception = %thrown.class_name(), "line threw");
                return Ok(LineResult::RuntimeError(render_exception(&thrown, is_line_class)));
            }
            Err(error @ VmError::InstructionLimit { .. }) => {
                return Ok(LineResult::RuntimeError(error.to_string()));
            }
            Err(error) => return Err(error.into()),
        };

        let value = generated.result.as_ref().and_then(|field| instance.field(&field.name));
        let is_unit = value.is_none();
        if let EnvironmentState::Ready(session) = &mut self.environment {
            session.scope = Rc::clone(&analysis.scope);
        }
        self.earlier.push(EarlierLine {
            number,
            text,
            script: Arc::clone(&analysis.class),
            class: line_class_id(number),
            class_name,
            instance,
        });
        info!(line = number, is_unit, "line evaluated");
        Ok(LineResult::Success {
            value: value.unwrap_or(Value::Unit),
            is_unit,
        })
    }

    fn finish_submission(&mut self) {
        self.pending.clear();
        self.next_line += 1;
    }

    /// Names that could complete the end of `text`, as if it were the next
    /// line. Nothing is evaluated and no line number is used up.
    pub fn complete(&mut self, text: &str) -> ReplResult<Vec<String>> {
        let number = self.next_line;
        let script = parse_script(&line_file_name(number), text);
        let Some(target) = completion_target(&script, text.len() as u32) else {
            return Ok(Vec::new());
        };
        let session = self.session()?;
        let analysis = analyze_script(&session.env, &script, ScriptMode::ReplLine { line: number }, &session.scope);
        let tips = TipsManager::new(&analysis.trace, &script, &session.env.finder, &session.env.builtins);
        let mut names: Vec<String> = tips
            .complete(&target)
            .iter()
            .map(|variant| variant.name().as_str().to_string())
            .collect();
        names.dedup();
        Ok(names)
    }

    /// Disassembly of the class of every successful line, in line order.
    ///
    /// A line that threw stays defined in the VM under its number but is
    /// not listed, since later lines never receive its instance.
    pub fn dump_classes(&self, sink: &mut dyn io::Write) -> io::Result<()> {
        for line in &self.earlier {
            if let Some(class) = self.vm.loader().get(&line.class_name) {
                writeln!(sink, "{}", disassemble_class(&class.file))?;
            }
        }
        Ok(())
    }
}

fn line_file_name(number: u32) -> String {
    format!("Line{number}.kite")
}

/// Whether `class` is the class of a REPL line.
pub fn is_line_class(class: &str) -> bool {
    class
        .strip_prefix("Line")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// `file:line:column: severity: message`, one diagnostic per line.
pub fn render_diagnostics(text: &str, diagnostics: &[Diagnostic]) -> String {
    let line_map = LineMap::build(text);
    let mut sorted: Vec<&Diagnostic> = diagnostics.iter().collect();
    sorted.sort_by_key(|diagnostic| diagnostic.start);
    sorted
        .iter()
        .map(|diagnostic| {
            let position = line_map.offset_to_position(diagnostic.start);
            let severity = match diagnostic.category {
                DiagnosticCategory::Error => "error",
                DiagnosticCategory::Warning => "warning",
                DiagnosticCategory::Message => "info",
            };
            format!(
                "{}:{}:{}: {severity}: {}",
                diagnostic.file,
                position.line + 1,
                position.character + 1,
                diagnostic.message_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "../tests/interpreter_tests.rs"]
mod interpreter_tests;
