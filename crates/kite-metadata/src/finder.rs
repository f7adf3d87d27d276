//! Entry point from class ids and package names to descriptors.
//!
//! [`DescriptorFinder`] memoizes class and package lookups over a
//! [`ClassDataSource`]. A class is deserialized at most once per finder;
//! the descriptors it creates look other classes up through the same
//! finder, so the whole module graph shares one cache.

use crate::class_deserializer::deserialize_class;
use crate::context::{DeserializationContext, FlexibleCapabilitiesProvider};
use crate::error::MetadataResult;
use crate::member_deserializer::{CallableDescriptor, MemberDeserializer};
use crate::name_resolver::NameResolver;
use crate::proto::{CallableProto, ClassProto, ModuleProto, PackageProto};
use crate::type_deserializer::TypeDeserializer;
use dashmap::DashMap;
use kite_common::MemoizedFunction;
use kite_types::{ClassDescriptor, ClassId, ContainingDeclaration, FqName, MemberScope};
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// A loaded module's name tables.
///
/// Only [`ModuleClassDataSource::add_module`] creates module, class and
/// package data, and it validates the module first.
#[derive(Debug)]
pub struct ModuleData {
    pub(crate) name: String,
    pub(crate) resolver: Arc<NameResolver>,
}

/// Serialized form of one class, with the module it came from.
#[derive(Debug, Clone)]
pub struct ClassData {
    pub(crate) module: Arc<ModuleData>,
    pub(crate) proto: Arc<ClassProto>,
}

/// Serialized top-level members of one package from one module.
#[derive(Debug, Clone)]
pub struct PackageData {
    pub(crate) module: Arc<ModuleData>,
    pub(crate) proto: Arc<PackageProto>,
    pub(crate) facade: ClassId,
}

/// Load a member of a validated module into `scope`.
///
/// Validation checks every table reference and callable kind, so a failure
/// here means the module changed after validation.
pub(crate) fn add_member(
    scope: &mut MemberScope,
    members: &MemberDeserializer,
    proto: &CallableProto,
    owner: &dyn fmt::Display,
) {
    match members.load_callable(proto) {
        Ok(CallableDescriptor::Function(function)) => scope.add_function(function),
        Ok(CallableDescriptor::Property(property)) => scope.add_property(property),
        Ok(CallableDescriptor::Constructor(_)) => {
            panic!("validated module lists a constructor among the members of {owner}")
        }
        Err(err) => panic!("member of {owner} failed to load from a validated module: {err}"),
    }
}

/// Where a finder gets serialized classes from.
pub trait ClassDataSource: Send + Sync {
    /// Raw data for `class_id`, or `None` when no module declares it.
    fn class_data(&self, class_id: &ClassId) -> Option<ClassData>;

    /// Package records declaring top-level members of `package`.
    fn package_data(&self, package: &FqName) -> Vec<PackageData>;

    /// Top-level classes declared directly in `package`.
    fn top_level_classes(&self, package: &FqName) -> Vec<ClassId>;

    /// Whether `package` or any package below it declares anything.
    fn has_package(&self, package: &FqName) -> bool;

    /// Direct subpackages of `package`.
    fn subpackages(&self, _package: &FqName) -> Vec<FqName> {
        Vec::new()
    }
}

/// Top-level declarations of one package, merged across modules.
#[derive(Debug)]
pub struct PackageFragment {
    pub fq_name: FqName,
    pub scope: MemberScope,
}

pub struct DescriptorFinder {
    source: Box<dyn ClassDataSource>,
    capabilities: Arc<FlexibleCapabilitiesProvider>,
    contexts: DashMap<String, Arc<DeserializationContext>, FxBuildHasher>,
    classes: MemoizedFunction<ClassId, Arc<ClassDescriptor>>,
    packages: MemoizedFunction<FqName, Arc<PackageFragment>>,
    this: Weak<DescriptorFinder>,
}

impl DescriptorFinder {
    pub fn new(source: impl ClassDataSource + 'static) -> Arc<Self> {
        Self::with_capabilities(source, FlexibleCapabilitiesProvider::default())
    }

    pub fn with_capabilities(
        source: impl ClassDataSource + 'static,
        capabilities: FlexibleCapabilitiesProvider,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<DescriptorFinder>| {
            let class_finder = this.clone();
            let package_finder = this.clone();
            DescriptorFinder {
                source: Box::new(source),
                capabilities: Arc::new(capabilities),
                contexts: DashMap::with_hasher(FxBuildHasher),
                classes: MemoizedFunction::new(move |class_id: &ClassId| {
                    class_finder.upgrade()?.deserialize_class(class_id)
                }),
                packages: MemoizedFunction::new(move |package: &FqName| {
                    package_finder.upgrade()?.deserialize_package(package)
                }),
                this: this.clone(),
            }
        })
    }

    /// Find a class by id.
    ///
    /// `None` means no loaded module declares the class. That is a normal
    /// outcome (a missing dependency), not an error.
    pub fn find_class(&self, class_id: &ClassId) -> Option<Arc<ClassDescriptor>> {
        self.classes.invoke(class_id)
    }

    /// Top-level functions, properties and classes of `package`.
    pub fn find_package_members(&self, package: &FqName) -> Option<Arc<PackageFragment>> {
        self.packages.invoke(package)
    }

    pub fn has_package(&self, package: &FqName) -> bool {
        package.is_root() || self.source.has_package(package)
    }

    pub fn subpackages(&self, package: &FqName) -> Vec<FqName> {
        self.source.subpackages(package)
    }

    /// Classes deserialized so far.
    pub fn loaded_classes(&self) -> Vec<Arc<ClassDescriptor>> {
        self.classes.computed_values()
    }

    fn context(&self, module: &ModuleData) -> Arc<DeserializationContext> {
        if let Some(context) = self.contexts.get(&module.name) {
            return Arc::clone(context.value());
        }
        let context = Arc::new(DeserializationContext {
            module_name: module.name.clone(),
            resolver: Arc::clone(&module.resolver),
            capabilities: Arc::clone(&self.capabilities),
            finder: self.this.clone(),
        });
        Arc::clone(self.contexts.entry(module.name.clone()).or_insert(context).value())
    }

    fn deserialize_class(&self, class_id: &ClassId) -> Option<Arc<ClassDescriptor>> {
        let Some(data) = self.source.class_data(class_id) else {
            debug!(class = %class_id, "class not found");
            return None;
        };
        debug!(class = %class_id, module = %data.module.name, "deserializing class");
        Some(deserialize_class(self.context(&data.module), data.proto, class_id.clone()))
    }

    fn deserialize_package(&self, package: &FqName) -> Option<Arc<PackageFragment>> {
        if !self.has_package(package) {
            return None;
        }
        let mut scope = MemberScope::new();
        for data in self.source.package_data(package) {
            let context = self.context(&data.module);
            let types = TypeDeserializer::root(context, format!("package {package}"));
            let members = MemberDeserializer::new(
                types,
                ContainingDeclaration::Package {
                    fq_name: package.clone(),
                    facade: data.facade.clone(),
                },
            );
            for member in &data.proto.members {
                add_member(&mut scope, &members, member, package);
            }
        }
        for class_id in self.source.top_level_classes(package) {
            if let Some(class) = self.find_class(&class_id) {
                scope.add_classifier(class);
            }
        }
        Some(Arc::new(PackageFragment {
            fq_name: package.clone(),
            scope,
        }))
    }
}

impl std::fmt::Debug for DescriptorFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorFinder")
            .field("classes", &self.classes)
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

/// A [`ClassDataSource`] over decoded metadata modules.
#[derive(Debug, Default)]
pub struct ModuleClassDataSource {
    classes: FxHashMap<ClassId, ClassData>,
    packages: FxHashMap<FqName, Vec<PackageData>>,
    top_level_classes: FxHashMap<FqName, Vec<ClassId>>,
    known_packages: FxHashSet<FqName>,
}

impl ModuleClassDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a module's classes and packages.
    ///
    /// The module is validated first, so descriptors built from it later
    /// never see dangling table references.
    pub fn add_module(&mut self, module: ModuleProto) -> MetadataResult<()> {
        module.validate()?;
        let resolver = Arc::new(NameResolver::for_module(&module));
        let data = Arc::new(ModuleData {
            name: module.name.clone(),
            resolver: Arc::clone(&resolver),
        });
        for proto in module.classes {
            let class_id = resolver.get_class_id(proto.fq_name)?;
            self.mark_package(class_id.package_fq_name());
            if !class_id.is_nested() {
                self.top_level_classes
                    .entry(class_id.package_fq_name().clone())
                    .or_default()
                    .push(class_id.clone());
            }
            self.classes.insert(
                class_id,
                ClassData {
                    module: Arc::clone(&data),
                    proto,
                },
            );
        }
        for proto in module.packages {
            let fq_name = resolver.get_fq_name(proto.fq_name)?;
            let facade = resolver.get_class_id(proto.facade)?;
            self.mark_package(&fq_name);
            self.packages.entry(fq_name).or_default().push(PackageData {
                module: Arc::clone(&data),
                proto,
                facade,
            });
        }
        info!(module = %data.name, classes = self.classes.len(), "loaded metadata module");
        Ok(())
    }

    fn mark_package(&mut self, package: &FqName) {
        let mut current = package.clone();
        while !current.is_root() {
            let parent = current.parent();
            if !self.known_packages.insert(current) {
                break;
            }
            current = parent;
        }
    }
}

impl ClassDataSource for ModuleClassDataSource {
    fn class_data(&self, class_id: &ClassId) -> Option<ClassData> {
        self.classes.get(class_id).cloned()
    }

    fn package_data(&self, package: &FqName) -> Vec<PackageData> {
        self.packages.get(package).cloned().unwrap_or_default()
    }

    fn top_level_classes(&self, package: &FqName) -> Vec<ClassId> {
        self.top_level_classes.get(package).cloned().unwrap_or_default()
    }

    fn has_package(&self, package: &FqName) -> bool {
        self.known_packages.contains(package)
    }

    fn subpackages(&self, package: &FqName) -> Vec<FqName> {
        let mut subpackages: Vec<FqName> = self
            .known_packages
            .iter()
            .filter(|candidate| !candidate.is_root() && &candidate.parent() == package)
            .cloned()
            .collect();
        subpackages.sort();
        subpackages
    }
}

#[cfg(test)]
#[path = "../tests/finder_tests.rs"]
mod finder_tests;
