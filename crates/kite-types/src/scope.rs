//! Member scopes of classes and packages.

use crate::descriptors::{
    ClassDescriptor, DeclarationDescriptor, FunctionDescriptor, PropertyDescriptor,
};
use crate::names::Name;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Declarations contributed by one class or package fragment, in
/// declaration order.
#[derive(Debug, Default)]
pub struct MemberScope {
    functions: IndexMap<Name, SmallVec<[Arc<FunctionDescriptor>; 2]>>,
    properties: IndexMap<Name, SmallVec<[Arc<PropertyDescriptor>; 1]>>,
    classifiers: IndexMap<Name, Arc<ClassDescriptor>>,
}

impl MemberScope {
    pub fn new() -> Self {
        MemberScope::default()
    }

    pub fn add_function(&mut self, function: Arc<FunctionDescriptor>) {
        self.functions
            .entry(function.name.clone())
            .or_default()
            .push(function);
    }

    pub fn add_property(&mut self, property: Arc<PropertyDescriptor>) {
        self.properties
            .entry(property.name.clone())
            .or_default()
            .push(property);
    }

    pub fn add_classifier(&mut self, class: Arc<ClassDescriptor>) {
        self.classifiers.insert(class.name(), class);
    }

    pub fn functions(&self, name: &Name) -> &[Arc<FunctionDescriptor>] {
        self.functions.get(name).map_or(&[], |functions| functions.as_slice())
    }

    pub fn properties(&self, name: &Name) -> &[Arc<PropertyDescriptor>] {
        self.properties.get(name).map_or(&[], |properties| properties.as_slice())
    }

    pub fn classifier(&self, name: &Name) -> Option<&Arc<ClassDescriptor>> {
        self.classifiers.get(name)
    }

    pub fn all_functions(&self) -> impl Iterator<Item = &Arc<FunctionDescriptor>> {
        self.functions.values().flatten()
    }

    pub fn all_properties(&self) -> impl Iterator<Item = &Arc<PropertyDescriptor>> {
        self.properties.values().flatten()
    }

    /// Every declaration in this scope: classifiers, then properties, then
    /// functions.
    pub fn all_descriptors(&self) -> Vec<DeclarationDescriptor> {
        let mut result = Vec::new();
        result.extend(
            self.classifiers
                .values()
                .map(|class| DeclarationDescriptor::Class(Arc::clone(class))),
        );
        result.extend(
            self.all_properties()
                .map(|property| DeclarationDescriptor::Property(Arc::clone(property))),
        );
        result.extend(
            self.all_functions()
                .map(|function| DeclarationDescriptor::Function(Arc::clone(function))),
        );
        result
    }

    /// Merge `other` into this scope, keeping existing entries first.
    pub fn extend_from(&mut self, other: &MemberScope) {
        for function in other.all_functions() {
            self.add_function(Arc::clone(function));
        }
        for property in other.all_properties() {
            self.add_property(Arc::clone(property));
        }
        for class in other.classifiers.values() {
            self.classifiers
                .entry(class.name())
                .or_insert_with(|| Arc::clone(class));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.properties.is_empty() && self.classifiers.is_empty()
    }
}
