//! Everything analysis needs that outlives one script.

use crate::error::{ResolveError, ResolveResult};
use crate::scope::LexicalScope;
use kite_metadata::{DEFAULT_IMPORTS, DescriptorFinder, stdlib_finder};
use kite_types::{BuiltIns, FqName};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

/// The classpath view and built-in classes.
///
/// Thread-safe, so it can be built in the background while the REPL
/// starts up.
#[derive(Clone, Debug)]
pub struct ResolveEnvironment {
    pub finder: Arc<DescriptorFinder>,
    pub builtins: BuiltIns,
}

impl ResolveEnvironment {
    pub fn new(finder: Arc<DescriptorFinder>) -> ResolveResult<Self> {
        let builtins = BuiltIns::load(|class_id| finder.find_class(class_id)).map_err(ResolveError::MissingBuiltIn)?;
        for package in DEFAULT_IMPORTS {
            if !finder.has_package(&FqName::parse(package)) {
                return Err(ResolveError::MissingDefaultImport((*package).to_string()));
            }
        }
        info!(classes = finder.loaded_classes().len(), "resolve environment ready");
        Ok(ResolveEnvironment { finder, builtins })
    }

    /// An environment over the standard library alone.
    pub fn stdlib() -> ResolveResult<Self> {
        Self::new(stdlib_finder())
    }

    /// Root scope plus the default imports: the outermost scope of every script.
    pub fn default_scope(&self) -> Rc<LexicalScope> {
        let mut scope = LexicalScope::root(Arc::clone(&self.finder));
        for package in DEFAULT_IMPORTS {
            let fq_name = FqName::parse(package);
            if let Some(fragment) = self.finder.find_package_members(&fq_name) {
                debug!(package = %fq_name, "default import");
                scope = LexicalScope::importing(&scope, &fragment.scope, format!("import {package}.*"));
            }
        }
        // Scripts live in the root package, so its members from the classpath
        // shadow the default imports.
        if let Some(fragment) = self.finder.find_package_members(&FqName::root()) {
            scope = LexicalScope::importing(&scope, &fragment.scope, "root package");
        }
        scope
    }
}
