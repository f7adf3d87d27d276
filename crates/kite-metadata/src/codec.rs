//! Binary encoding of metadata modules.
//!
//! Layout: magic `KMETA`, a varint version, then the module fields in
//! declaration order. Lists are length-prefixed; optional values are
//! prefixed with a presence byte (or use the `index + 1` encoding for
//! optional table references).

use crate::error::{MetadataError, MetadataResult};
use crate::flags::{AccessorFlags, CallableFlags, ClassFlags};
use crate::proto::*;
use kite_common::{ByteReader, ByteWriter, DecodeError};
use std::sync::Arc;

pub const MAGIC: &[u8] = b"KMETA";
pub const VERSION: u32 = 1;

pub fn encode_module(module: &ModuleProto) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_raw(MAGIC);
    w.write_u32(VERSION);
    w.write_str(&module.name);
    w.write_len(module.strings.len());
    for string in &module.strings {
        w.write_str(string);
    }
    w.write_len(module.qualified_names.len());
    for name in &module.qualified_names {
        w.write_u32(name.short_name);
        w.write_optional_u32(name.parent);
        w.write_u8(match name.kind {
            QualifiedNameKind::Class => 0,
            QualifiedNameKind::Package => 1,
            QualifiedNameKind::Local => 2,
        });
    }
    w.write_len(module.classes.len());
    for class in &module.classes {
        write_class(&mut w, class);
    }
    w.write_len(module.packages.len());
    for package in &module.packages {
        w.write_u32(package.fq_name);
        w.write_u32(package.facade);
        write_list(&mut w, &package.members, write_callable);
    }
    w.into_bytes()
}

/// Decode and validate a module.
pub fn decode_module(bytes: &[u8]) -> MetadataResult<ModuleProto> {
    let mut r = ByteReader::new(bytes);
    r.expect_magic(MAGIC)?;
    let version = r.read_u32()?;
    if version != VERSION {
        return Err(MetadataError::UnsupportedVersion {
            found: version,
            expected: VERSION,
        });
    }
    let name = r.read_string()?;
    let strings = read_list(&mut r, |r| r.read_string())?;
    let qualified_names = read_list(&mut r, |r| {
        let short_name = r.read_u32()?;
        let parent = r.read_optional_u32()?;
        let kind = match r.read_u8()? {
            0 => QualifiedNameKind::Class,
            1 => QualifiedNameKind::Package,
            2 => QualifiedNameKind::Local,
            tag => return Err(invalid_tag(r, "qualified name kind", tag)),
        };
        Ok(QualifiedNameProto {
            short_name,
            parent,
            kind,
        })
    })?;
    let classes = read_list(&mut r, |r| read_class(r).map(Arc::new))?;
    let packages = read_list(&mut r, |r| {
        Ok(Arc::new(PackageProto {
            fq_name: r.read_u32()?,
            facade: r.read_u32()?,
            members: read_list(r, read_callable)?,
        }))
    })?;
    r.finish()?;

    let module = ModuleProto {
        name,
        strings,
        qualified_names,
        classes,
        packages,
    };
    module.validate()?;
    Ok(module)
}

fn invalid_tag(r: &ByteReader<'_>, what: &'static str, tag: u8) -> DecodeError {
    DecodeError::InvalidTag {
        what,
        tag: u64::from(tag),
        offset: r.offset().saturating_sub(1),
    }
}

fn write_list<T>(w: &mut ByteWriter, items: &[T], write: fn(&mut ByteWriter, &T)) {
    w.write_len(items.len());
    for item in items {
        write(w, item);
    }
}

fn read_list<T>(
    r: &mut ByteReader<'_>,
    mut read: impl FnMut(&mut ByteReader<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let len = r.read_len()?;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(read(r)?);
    }
    Ok(items)
}

fn write_class(w: &mut ByteWriter, class: &ClassProto) {
    w.write_u32(class.flags.bits());
    w.write_u32(class.fq_name);
    write_list(w, &class.type_parameters, write_type_parameter);
    write_list(w, &class.supertypes, write_type);
    write_list(w, &class.constructors, write_callable);
    write_list(w, &class.members, write_callable);
    w.write_len(class.nested_class_names.len());
    for name in &class.nested_class_names {
        w.write_u32(*name);
    }
}

fn read_class(r: &mut ByteReader<'_>) -> Result<ClassProto, DecodeError> {
    Ok(ClassProto {
        flags: ClassFlags::from_bits_retain(r.read_u32()?),
        fq_name: r.read_u32()?,
        type_parameters: read_list(r, read_type_parameter)?,
        supertypes: read_list(r, read_type)?,
        constructors: read_list(r, read_callable)?,
        members: read_list(r, read_callable)?,
        nested_class_names: read_list(r, |r| r.read_u32())?,
    })
}

fn write_callable(w: &mut ByteWriter, callable: &CallableProto) {
    w.write_u32(callable.flags.bits());
    w.write_u32(callable.name);
    write_list(w, &callable.type_parameters, write_type_parameter);
    write_optional(w, callable.receiver_type.as_ref(), write_type);
    write_list(w, &callable.value_parameters, write_value_parameter);
    write_optional(w, callable.return_type.as_ref(), write_type);
    w.write_u32(callable.getter_flags.bits());
    w.write_u32(callable.setter_flags.bits());
    write_optional(w, callable.setter_parameter.as_ref(), write_value_parameter);
    write_optional(w, callable.constant.as_ref(), write_constant);
}

fn read_callable(r: &mut ByteReader<'_>) -> Result<CallableProto, DecodeError> {
    Ok(CallableProto {
        flags: CallableFlags::from_bits_retain(r.read_u32()?),
        name: r.read_u32()?,
        type_parameters: read_list(r, read_type_parameter)?,
        receiver_type: read_optional(r, read_type)?,
        value_parameters: read_list(r, read_value_parameter)?,
        return_type: read_optional(r, read_type)?,
        getter_flags: AccessorFlags::from_bits_retain(r.read_u32()?),
        setter_flags: AccessorFlags::from_bits_retain(r.read_u32()?),
        setter_parameter: read_optional(r, read_value_parameter)?,
        constant: read_optional(r, read_constant)?,
    })
}

fn write_optional<T>(w: &mut ByteWriter, value: Option<&T>, write: fn(&mut ByteWriter, &T)) {
    match value {
        Some(value) => {
            w.write_bool(true);
            write(w, value);
        }
        None => w.write_bool(false),
    }
}

fn read_optional<T>(
    r: &mut ByteReader<'_>,
    read: fn(&mut ByteReader<'_>) -> Result<T, DecodeError>,
) -> Result<Option<T>, DecodeError> {
    if r.read_bool()? { read(r).map(Some) } else { Ok(None) }
}

fn write_value_parameter(w: &mut ByteWriter, parameter: &ValueParameterProto) {
    w.write_u32(parameter.name);
    write_type(w, &parameter.ty);
    w.write_bool(parameter.declares_default);
}

fn read_value_parameter(r: &mut ByteReader<'_>) -> Result<ValueParameterProto, DecodeError> {
    Ok(ValueParameterProto {
        name: r.read_u32()?,
        ty: read_type(r)?,
        declares_default: r.read_bool()?,
    })
}

fn write_type_parameter(w: &mut ByteWriter, parameter: &TypeParameterProto) {
    w.write_u32(parameter.id);
    w.write_u32(parameter.name);
    w.write_u8(match parameter.variance {
        VarianceProto::Invariant => 0,
        VarianceProto::In => 1,
        VarianceProto::Out => 2,
    });
    w.write_bool(parameter.reified);
    write_list(w, &parameter.upper_bounds, write_type);
}

fn read_type_parameter(r: &mut ByteReader<'_>) -> Result<TypeParameterProto, DecodeError> {
    let id = r.read_u32()?;
    let name = r.read_u32()?;
    let variance = match r.read_u8()? {
        0 => VarianceProto::Invariant,
        1 => VarianceProto::In,
        2 => VarianceProto::Out,
        tag => return Err(invalid_tag(r, "variance", tag)),
    };
    Ok(TypeParameterProto {
        id,
        name,
        variance,
        reified: r.read_bool()?,
        upper_bounds: read_list(r, read_type)?,
    })
}

fn write_type(w: &mut ByteWriter, ty: &TypeProto) {
    match ty.constructor {
        TypeConstructorProto::Class(index) => {
            w.write_u8(0);
            w.write_u32(index);
        }
        TypeConstructorProto::TypeParameter(id) => {
            w.write_u8(1);
            w.write_u32(id);
        }
    }
    w.write_len(ty.arguments.len());
    for argument in &ty.arguments {
        w.write_u8(match argument.projection {
            ProjectionProto::Invariant => 0,
            ProjectionProto::In => 1,
            ProjectionProto::Out => 2,
            ProjectionProto::Star => 3,
        });
        write_optional(w, argument.ty.as_ref(), write_type);
    }
    w.write_bool(ty.nullable);
    w.write_optional_u32(ty.flexible_type_capabilities_id);
    write_optional(w, ty.flexible_upper_bound.as_deref(), write_type);
}

fn read_type(r: &mut ByteReader<'_>) -> Result<TypeProto, DecodeError> {
    let constructor = match r.read_u8()? {
        0 => TypeConstructorProto::Class(r.read_u32()?),
        1 => TypeConstructorProto::TypeParameter(r.read_u32()?),
        tag => return Err(invalid_tag(r, "type constructor", tag)),
    };
    let arguments = read_list(r, |r| {
        let projection = match r.read_u8()? {
            0 => ProjectionProto::Invariant,
            1 => ProjectionProto::In,
            2 => ProjectionProto::Out,
            3 => ProjectionProto::Star,
            tag => return Err(invalid_tag(r, "projection", tag)),
        };
        Ok(TypeArgumentProto {
            projection,
            ty: read_optional(r, read_type)?,
        })
    })?;
    Ok(TypeProto {
        constructor,
        arguments,
        nullable: r.read_bool()?,
        flexible_type_capabilities_id: r.read_optional_u32()?,
        flexible_upper_bound: read_optional(r, read_type)?.map(Box::new),
    })
}

fn write_constant(w: &mut ByteWriter, constant: &ConstantProto) {
    match constant {
        ConstantProto::Int(value) => {
            w.write_u8(0);
            w.write_i64(i64::from(*value));
        }
        ConstantProto::Boolean(value) => {
            w.write_u8(1);
            w.write_bool(*value);
        }
        ConstantProto::String(index) => {
            w.write_u8(2);
            w.write_u32(*index);
        }
        ConstantProto::Null => w.write_u8(3),
    }
}

fn read_constant(r: &mut ByteReader<'_>) -> Result<ConstantProto, DecodeError> {
    match r.read_u8()? {
        0 => {
            let offset = r.offset();
            let value = r.read_i64()?;
            i32::try_from(value)
                .map(ConstantProto::Int)
                .map_err(|_| DecodeError::VarintOverflow { offset })
        }
        1 => Ok(ConstantProto::Boolean(r.read_bool()?)),
        2 => Ok(ConstantProto::String(r.read_u32()?)),
        3 => Ok(ConstantProto::Null),
        tag => Err(invalid_tag(r, "constant", tag)),
    }
}

#[cfg(test)]
#[path = "../tests/codec_tests.rs"]
mod codec_tests;
