//! Resolving string-table and qualified-name-table indices.

use crate::error::{MetadataError, MetadataResult};
use crate::proto::{ModuleProto, QualifiedNameKind, QualifiedNameProto};
use kite_types::{ClassId, FqName, Name};

/// Index lookups into one module's string and qualified-name tables.
#[derive(Debug, Clone)]
pub struct NameResolver {
    strings: Vec<String>,
    qualified_names: Vec<QualifiedNameProto>,
}

impl NameResolver {
    pub fn new(strings: Vec<String>, qualified_names: Vec<QualifiedNameProto>) -> Self {
        NameResolver {
            strings,
            qualified_names,
        }
    }

    pub fn for_module(module: &ModuleProto) -> Self {
        NameResolver::new(module.strings.clone(), module.qualified_names.clone())
    }

    pub fn get_string(&self, index: u32) -> MetadataResult<&str> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or(MetadataError::IndexOutOfRange {
                table: "string",
                index,
                size: self.strings.len(),
            })
    }

    pub fn get_name(&self, index: u32) -> MetadataResult<Name> {
        self.get_string(index).map(Name::identifier)
    }

    fn qualified_name(&self, index: u32) -> MetadataResult<&QualifiedNameProto> {
        self.qualified_names
            .get(index as usize)
            .ok_or(MetadataError::IndexOutOfRange {
                table: "qualified name",
                index,
                size: self.qualified_names.len(),
            })
    }

    /// The dotted name of entry `index`, built parent first.
    ///
    /// A parentless package entry with an empty name is the root package.
    pub fn get_fq_name(&self, index: u32) -> MetadataResult<FqName> {
        let proto = self.qualified_name(index)?;
        let short_name = self.get_name(proto.short_name)?;
        match proto.parent {
            None if short_name.is_empty() && proto.kind == QualifiedNameKind::Package => {
                Ok(FqName::root())
            }
            None => Ok(FqName::root().child(&short_name)),
            Some(parent) => {
                self.check_order(index, parent)?;
                Ok(self.get_fq_name(parent)?.child(&short_name))
            }
        }
    }

    /// Split entry `index` into its package and class-relative parts.
    ///
    /// # Panics
    ///
    /// If the entry is not a class name, or if its class chain is not
    /// rooted in a package name.
    pub fn get_class_id(&self, index: u32) -> MetadataResult<ClassId> {
        let proto = self.qualified_name(index)?;
        assert_eq!(
            proto.kind,
            QualifiedNameKind::Class,
            "qualified name {index} is not a class name"
        );

        let mut relative = vec![self.get_string(proto.short_name)?];
        let mut current_index = index;
        let mut parent = proto.parent;
        while let Some(parent_index) = parent {
            self.check_order(current_index, parent_index)?;
            let parent_proto = self.qualified_name(parent_index)?;
            match parent_proto.kind {
                QualifiedNameKind::Class => {
                    relative.push(self.get_string(parent_proto.short_name)?);
                    current_index = parent_index;
                    parent = parent_proto.parent;
                }
                QualifiedNameKind::Package => break,
                QualifiedNameKind::Local => {
                    panic!("class name {index} is nested in a local name {parent_index}")
                }
            }
        }
        relative.reverse();

        let package = match parent {
            Some(package_index) => self.get_fq_name(package_index)?,
            None => FqName::root(),
        };
        Ok(ClassId::new(package, FqName::from_segments(relative)))
    }

    fn check_order(&self, index: u32, parent: u32) -> MetadataResult<()> {
        if parent < index {
            Ok(())
        } else {
            Err(MetadataError::QualifiedNameOrder { index, parent })
        }
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }
}

#[cfg(test)]
#[path = "../tests/name_resolver_tests.rs"]
mod name_resolver_tests;
