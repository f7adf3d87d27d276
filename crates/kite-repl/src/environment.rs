//! The classpath a session or compilation runs against.
//!
//! Classpath entries are directories or single files. `.kmeta` files are
//! metadata modules that join the standard library in the descriptor
//! finder; `.kclass` files are compiled classes for the VM.

use crate::error::ClasspathError;
use kite_bytecode::{ClassFile, decode_class};
use kite_metadata::{DescriptorFinder, ModuleClassDataSource, decode_module, stdlib_module};
use kite_resolve::ResolveEnvironment;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const METADATA_EXTENSION: &str = "kmeta";
pub const CLASS_EXTENSION: &str = "kclass";

/// What analysis and execution need from the classpath.
#[derive(Debug)]
pub struct Environment {
    pub resolve: ResolveEnvironment,
    /// Compiled classes found on the classpath, in path order.
    pub classes: Vec<ClassFile>,
}

impl Environment {
    /// The standard library alone.
    pub fn stdlib() -> Result<Self, ClasspathError> {
        Self::load(&[])
    }

    /// Read every classpath entry. Files inside a directory are visited in
    /// file name order.
    pub fn load(classpath: &[PathBuf]) -> Result<Self, ClasspathError> {
        let mut data = ModuleClassDataSource::new();
        data
            .add_module(stdlib_module())
            .map_err(|source| ClasspathError::Metadata {
                path: PathBuf::from("<stdlib>"),
                source,
            })?;
        let mut classes = Vec::new();
        let mut modules = 0usize;
        for entry in classpath {
            if !entry.exists() {
                return Err(ClasspathError::Missing(entry.clone()));
            }
            for file in WalkDir::new(entry).sort_by_file_name() {
                let file = file?;
                if !file.file_type().is_file() {
                    continue;
                }
                let path = file.path();
                match path.extension().and_then(|extension| extension.to_str()) {
                    Some(METADATA_EXTENSION) => {
                        let module = decode_module(&read(path)?).map_err(|source| ClasspathError::Metadata {
                            path: path.to_path_buf(),
                            source,
                        })?;
                        debug!(path = %path.display(), module = %module.name, "classpath module");
                        data.add_module(module).map_err(|source| ClasspathError::Metadata {
                            path: path.to_path_buf(),
                            source,
                        })?;
                        modules += 1;
                    }
                    Some(CLASS_EXTENSION) => {
                        let class = decode_class(&read(path)?).map_err(|source| ClasspathError::ClassFormat {
                            path: path.to_path_buf(),
                            source,
                        })?;
                        debug!(path = %path.display(), class = %class.name, "classpath class");
                        classes.push(class);
                    }
                    _ => {}
                }
            }
        }
        let resolve = ResolveEnvironment::new(DescriptorFinder::new(data))?;
        info!(entries = classpath.len(), modules, classes = classes.len(), "environment loaded");
        Ok(Environment { resolve, classes })
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ClasspathError> {
    fs::read(path).map_err(|source| ClasspathError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "../tests/environment_tests.rs"]
mod environment_tests;
