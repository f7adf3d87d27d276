use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, info_span};

use kite_bytecode::{ClassFile, CodeListing, decode_class, disassemble_class_with, encode_class};
use kite_codegen::{ScriptUnit, generate_script};
use kite_common::Diagnostic;
use kite_metadata::{DescriptorSerializer, ModuleProto, decode_module, encode_module, stdlib_module};
use kite_repl::Environment;
use kite_repl::environment::{CLASS_EXTENSION, METADATA_EXTENSION};
use kite_resolve::{ScriptMode, analyze_script, file_facade_class_id};
use kite_syntax::{ParsedScript, parse_script};

use crate::cli::args::{CompileArgs, DisasmArgs};
use crate::cli::config::ProjectConfig;

pub const DEFAULT_OUT_DIR: &str = "out";
pub const DEFAULT_MODULE_NAME: &str = "main";

/// What `compile` works on, after the project file and flags are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub sources: Vec<PathBuf>,
    pub classpath: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub module_name: String,
}

impl CompileOptions {
    /// Flags win over the project file; list flags replace the file's lists.
    pub fn merge(args: &CompileArgs, config: &ProjectConfig) -> Result<Self> {
        let sources = if args.sources.is_empty() {
            config.sources.clone()
        } else {
            args.sources.clone()
        };
        if sources.is_empty() {
            bail!("no source files given and the project file lists none");
        }
        let classpath = if args.classpath.classpath.is_empty() {
            config.classpath.clone()
        } else {
            args.classpath.classpath.clone()
        };
        let out_dir = args
            .out_dir
            .clone()
            .or_else(|| config.out_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
        let module_name = args
            .module_name
            .clone()
            .or_else(|| config.module_name.clone())
            .unwrap_or_else(|| DEFAULT_MODULE_NAME.to_string());
        Ok(CompileOptions {
            sources,
            classpath,
            out_dir,
            module_name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompilationResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Written only when there are no errors.
    pub emitted_files: Vec<PathBuf>,
    /// `(file name used in diagnostics, text)` for each source read.
    pub sources: Vec<(String, String)>,
}

impl CompilationResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compile every source into a facade class, in order: each file sees the
/// public declarations of the files before it.
pub fn compile(options: &CompileOptions) -> Result<CompilationResult> {
    let _span = info_span!("compile", files = options.sources.len()).entered();

    let sources = options
        .sources
        .par_iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read source file: {}", path.display()))?;
            Ok((path.display().to_string(), text))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut facades = FxHashMap::default();
    for (name, _) in &sources {
        if let Some(earlier) = facades.insert(file_facade_class_id(name), name.as_str()) {
            bail!("{earlier} and {name} compile to the same class");
        }
    }

    let parsed: Vec<ParsedScript> = sources.par_iter().map(|(name, text)| parse_script(name, text)).collect();

    let environment = Environment::load(&options.classpath).context("failed to load the classpath")?;
    let mut scope = environment.resolve.default_scope();
    let mut diagnostics = Vec::new();
    let mut analyses = Vec::with_capacity(parsed.len());
    for script in &parsed {
        diagnostics.extend(script.diagnostics.iter().cloned());
        if script.has_errors() {
            continue;
        }
        let mode = ScriptMode::File {
            facade: file_facade_class_id(&script.file_name),
        };
        let analysis = analyze_script(&environment.resolve, script, mode, &scope);
        diagnostics.extend(analysis.diagnostics());
        scope = Rc::clone(&analysis.scope);
        analyses.push((script, analysis));
    }

    let result_for = |diagnostics: Vec<Diagnostic>, emitted_files: Vec<PathBuf>| CompilationResult {
        diagnostics,
        emitted_files,
        sources: sources.clone(),
    };
    if diagnostics.iter().any(Diagnostic::is_error) {
        info!(diagnostics = diagnostics.len(), "compilation failed");
        return Ok(result_for(diagnostics, Vec::new()));
    }

    let texts: FxHashMap<&str, &str> = sources.iter().map(|(name, text)| (name.as_str(), text.as_str())).collect();
    let mut classes = Vec::with_capacity(analyses.len());
    let mut serializer = DescriptorSerializer::new();
    for (script, analysis) in &analyses {
        let generated = generate_script(&ScriptUnit {
            script,
            source: texts.get(script.file_name.as_str()).copied().unwrap_or_default(),
            analysis,
            earlier_lines: &[],
        })
        .with_context(|| format!("failed to generate code for {}", script.file_name))?;
        for property in &analysis.properties {
            serializer.add_package_property(&property.descriptor);
        }
        for function in &analysis.functions {
            serializer.add_package_function(&function.descriptor);
        }
        classes.push(generated.class);
    }
    let module = serializer.finish(&options.module_name);

    let emitted_files = write_outputs(&options.out_dir, &options.module_name, &classes, &module)?;
    info!(classes = classes.len(), files = emitted_files.len(), "compilation finished");
    Ok(result_for(diagnostics, emitted_files))
}

fn write_outputs(out_dir: &Path, module_name: &str, classes: &[ClassFile], module: &ModuleProto) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut emitted = classes
        .par_iter()
        .map(|class| {
            let path = class_path(out_dir, &class.name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&path, encode_class(class)).with_context(|| format!("failed to write {}", path.display()))?;
            debug!(class = %class.name, path = %path.display(), "class written");
            Ok(path)
        })
        .collect::<Result<Vec<_>>>()?;

    let module_path = out_dir.join(module_name).with_extension(METADATA_EXTENSION);
    fs::write(&module_path, encode_module(module))
        .with_context(|| format!("failed to write {}", module_path.display()))?;
    emitted.push(module_path);
    Ok(emitted)
}

/// `a/b/C` lands in `out_dir/a/b/C.kclass`.
pub fn class_path(out_dir: &Path, internal_name: &str) -> PathBuf {
    let mut path = out_dir.to_path_buf();
    path.extend(internal_name.split('/'));
    path.set_extension(CLASS_EXTENSION);
    path
}

pub fn read_class(path: &Path) -> Result<ClassFile> {
    let bytes = fs::read(path).with_context(|| format!("failed to read class file: {}", path.display()))?;
    decode_class(&bytes).with_context(|| format!("invalid class file: {}", path.display()))
}

pub fn disassemble(args: &DisasmArgs) -> Result<String> {
    let class = read_class(&args.class)?;
    let listing = if args.inline_jsr {
        CodeListing::InlinedBlocks
    } else if args.cfg {
        CodeListing::Blocks
    } else {
        CodeListing::Linear
    };
    disassemble_class_with(&class, listing).with_context(|| format!("cannot list {}", args.class.display()))
}

/// The module at `path` as pretty JSON, or the standard library module.
pub fn dump_metadata(path: Option<&Path>) -> Result<String> {
    let module = match path {
        Some(path) => {
            let bytes = fs::read(path).with_context(|| format!("failed to read module: {}", path.display()))?;
            decode_module(&bytes).with_context(|| format!("invalid module: {}", path.display()))?
        }
        None => stdlib_module(),
    };
    serde_json::to_string_pretty(&module).context("failed to serialize module")
}
