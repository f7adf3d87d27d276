//! Lazily deserialized class contents.

use crate::context::DeserializationContext;
use crate::finder::add_member;
use crate::member_deserializer::MemberDeserializer;
use crate::proto::ClassProto;
use crate::type_deserializer::TypeDeserializer;
use kite_common::LazyValue;
use kite_types::{
    ClassContents, ClassDescriptor, ClassId, ConstructorDescriptor, ContainingDeclaration, KType,
    MemberScope,
};
use std::sync::Arc;
use tracing::debug;

/// Build a class shell from `proto` and attach lazily computed contents.
///
/// Supertypes, members and constructors are deserialized on first access,
/// so looking a class up never forces the classes it mentions.
pub fn deserialize_class(
    context: Arc<DeserializationContext>,
    proto: Arc<ClassProto>,
    class_id: ClassId,
) -> Arc<ClassDescriptor> {
    let types = TypeDeserializer::root(context, format!("class {class_id}"));
    let type_parameters = types.register_type_parameters(
        &proto.type_parameters,
        ContainingDeclaration::Class(class_id.clone()),
    );
    let class = Arc::new(ClassDescriptor::new(
        class_id.clone(),
        proto.flags.kind(),
        proto.flags.visibility(),
        proto.flags.modality(),
        type_parameters,
    ));
    class.initialize(Box::new(DeserializedClassContents::new(types, proto, class_id)));
    class
}

struct DeserializedClassContents {
    supertypes: LazyValue<Vec<KType>>,
    scope: LazyValue<MemberScope>,
    constructors: LazyValue<Vec<Arc<ConstructorDescriptor>>>,
}

impl DeserializedClassContents {
    fn new(types: Arc<TypeDeserializer>, proto: Arc<ClassProto>, class_id: ClassId) -> Self {
        let members = MemberDeserializer::new(
            Arc::clone(&types),
            ContainingDeclaration::Class(class_id.clone()),
        );

        let supertypes = {
            let types = Arc::clone(&types);
            let proto = Arc::clone(&proto);
            LazyValue::new(move || proto.supertypes.iter().map(|ty| types.ty(ty)).collect())
        };

        let scope = {
            let members = members.clone();
            let proto = Arc::clone(&proto);
            let types = Arc::clone(&types);
            let class_id = class_id.clone();
            LazyValue::new(move || {
                let mut scope = MemberScope::new();
                for member in &proto.members {
                    add_member(&mut scope, &members, member, &class_id);
                }
                let context = types.context();
                if let Some(finder) = context.finder.upgrade() {
                    for &name in &proto.nested_class_names {
                        let Ok(name) = context.resolver.get_name(name) else {
                            continue;
                        };
                        if let Some(nested) = finder.find_class(&class_id.create_nested(&name)) {
                            scope.add_classifier(nested);
                        }
                    }
                }
                debug!(class = %class_id, "deserialized member scope");
                scope
            })
        };

        let constructors = LazyValue::new(move || {
            proto
                .constructors
                .iter()
                .map(|constructor| {
                    members.load_constructor(constructor).unwrap_or_else(|err| {
                        panic!("constructor of {class_id} failed to load from a validated module: {err}")
                    })
                })
                .collect()
        });

        DeserializedClassContents {
            supertypes,
            scope,
            constructors,
        }
    }
}

impl ClassContents for DeserializedClassContents {
    fn supertypes(&self) -> &[KType] {
        self.supertypes.get()
    }

    fn member_scope(&self) -> &MemberScope {
        self.scope.get()
    }

    fn constructors(&self) -> &[Arc<ConstructorDescriptor>] {
        self.constructors.get()
    }
}
