//! Binary encoding of class files.
//!
//! Layout: magic `KCLASS`, a varint version, the constant pool (every
//! string the class mentions, interned once), then the class body. Names
//! and descriptors in the body are pool indices; instructions are an
//! opcode byte followed by their operands.

use crate::class_file::{AccessFlags, ClassFile, Code, ExceptionEntry, FieldInfo, LineNumber, MethodInfo};
use crate::error::ClassFormatError;
use crate::instruction::{Condition, FieldRef, Instruction, MethodDescriptor, MethodRef, TypeDesc};
use kite_common::{ByteReader, ByteWriter, DecodeError, Interner};
use std::sync::Arc;

pub const MAGIC: &[u8] = b"KCLASS";
pub const VERSION: u32 = 1;

pub fn encode_class(class: &ClassFile) -> Vec<u8> {
    let pool: Interner<Arc<str>> = Interner::new();
    let mut body = ByteWriter::new();
    {
        let mut w = BodyWriter { w: &mut body, pool: &pool };
        w.class(class);
    }
    let mut out = ByteWriter::new();
    out.write_raw(MAGIC);
    out.write_u32(VERSION);
    let constants = pool.all_interned_objects();
    out.write_len(constants.len());
    for constant in &constants {
        out.write_str(constant);
    }
    out.write_raw(&body.into_bytes());
    out.into_bytes()
}

/// Decode and validate a class file.
pub fn decode_class(bytes: &[u8]) -> Result<ClassFile, ClassFormatError> {
    let mut r = ByteReader::new(bytes);
    r.expect_magic(MAGIC)?;
    let version = r.read_u32()?;
    if version != VERSION {
        return Err(ClassFormatError::UnsupportedVersion {
            found: version,
            expected: VERSION,
        });
    }
    let count = r.read_len()?;
    let mut pool = Vec::with_capacity(count);
    for _ in 0..count {
        pool.push(Arc::<str>::from(r.read_string()?));
    }
    let class = BodyReader { r: &mut r, pool: &pool }.class()?;
    r.finish()?;
    validate_class(&class)?;
    Ok(class)
}

/// Check what the interpreter relies on: jump targets and exception
/// ranges stay inside their method, and no method falls off its end.
pub fn validate_class(class: &ClassFile) -> Result<(), ClassFormatError> {
    for method in &class.methods {
        let Some(code) = &method.code else {
            continue;
        };
        let name = || format!("{}.{}{}", class.name, method.name, method.descriptor);
        let len = code.instructions.len() as u32;
        for (offset, instruction) in code.instructions.iter().enumerate() {
            if let Some(target) = instruction.jump_targets().into_iter().find(|&target| target >= len) {
                return Err(ClassFormatError::JumpOutOfRange {
                    method: name(),
                    offset: offset as u32,
                    target,
                });
            }
        }
        for entry in &code.exception_table {
            if entry.from >= entry.to || entry.to > len || entry.handler >= len {
                return Err(ClassFormatError::BadExceptionRange {
                    method: name(),
                    from: entry.from,
                    to: entry.to,
                    handler: entry.handler,
                });
            }
        }
        match code.instructions.last() {
            Some(last) if !last.can_fall_through() => {}
            _ => return Err(ClassFormatError::FallsOffEnd { method: name() }),
        }
    }
    Ok(())
}

// =============================================================================
// Writing
// =============================================================================

struct BodyWriter<'a> {
    w: &'a mut ByteWriter,
    pool: &'a Interner<Arc<str>>,
}

impl BodyWriter<'_> {
    fn constant(&mut self, value: &str) {
        let index = self.pool.intern(Arc::from(value));
        self.w.write_u32(index);
    }

    fn optional_constant(&mut self, value: Option<&str>) {
        let index = value.map(|value| self.pool.intern(Arc::from(value)));
        self.w.write_optional_u32(index);
    }

    fn class(&mut self, class: &ClassFile) {
        self.constant(&class.name);
        self.optional_constant(class.super_name.as_deref());
        self.w.write_u32(class.flags.bits());
        self.optional_constant(class.source_file.as_deref());
        self.w.write_len(class.fields.len());
        for field in &class.fields {
            self.constant(&field.name);
            self.constant(&field.ty.to_string());
            self.w.write_u32(field.flags.bits());
        }
        self.w.write_len(class.methods.len());
        for method in &class.methods {
            self.constant(&method.name);
            self.constant(&method.descriptor.to_string());
            self.w.write_u32(method.flags.bits());
            match &method.code {
                Some(code) => {
                    self.w.write_bool(true);
                    self.code(code);
                }
                None => self.w.write_bool(false),
            }
        }
    }

    fn code(&mut self, code: &Code) {
        self.w.write_u32(u32::from(code.max_stack));
        self.w.write_u32(u32::from(code.max_locals));
        self.w.write_len(code.instructions.len());
        for instruction in &code.instructions {
            self.instruction(instruction);
        }
        self.w.write_len(code.exception_table.len());
        for entry in &code.exception_table {
            self.w.write_u32(entry.from);
            self.w.write_u32(entry.to);
            self.w.write_u32(entry.handler);
            self.optional_constant(entry.catch_type.as_deref());
        }
        self.w.write_len(code.line_numbers.len());
        for entry in &code.line_numbers {
            self.w.write_u32(entry.offset);
            self.w.write_u32(entry.line);
        }
    }

    fn field_ref(&mut self, field: &FieldRef) {
        self.constant(&field.owner);
        self.constant(&field.name);
        self.constant(&field.ty.to_string());
    }

    fn method_ref(&mut self, method: &MethodRef) {
        self.constant(&method.owner);
        self.constant(&method.name);
        self.constant(&method.descriptor.to_string());
    }

    fn instruction(&mut self, instruction: &Instruction) {
        self.w.write_u8(opcode(instruction));
        match instruction {
            Instruction::IConst(value) => self.w.write_i64(i64::from(*value)),
            Instruction::BConst(value) => self.w.write_bool(*value),
            Instruction::Ldc(value)
            | Instruction::New(value)
            | Instruction::CheckCast(value)
            | Instruction::InstanceOf(value) => self.constant(value),
            Instruction::ILoad(slot)
            | Instruction::IStore(slot)
            | Instruction::ALoad(slot)
            | Instruction::AStore(slot)
            | Instruction::Ret(slot) => self.w.write_u32(u32::from(*slot)),
            Instruction::If(condition, target) | Instruction::IfICmp(condition, target) => {
                self.w.write_u8(condition.code());
                self.w.write_u32(*target);
            }
            Instruction::IfNull(target)
            | Instruction::IfNonNull(target)
            | Instruction::Goto(target)
            | Instruction::Jsr(target) => self.w.write_u32(*target),
            Instruction::LookupSwitch { default, cases } => {
                self.w.write_u32(*default);
                self.w.write_len(cases.len());
                for (key, target) in cases {
                    self.w.write_i64(i64::from(*key));
                    self.w.write_u32(*target);
                }
            }
            Instruction::GetField(field)
            | Instruction::PutField(field)
            | Instruction::GetStatic(field)
            | Instruction::PutStatic(field) => self.field_ref(field),
            Instruction::InvokeVirtual(method)
            | Instruction::InvokeStatic(method)
            | Instruction::InvokeSpecial(method) => self.method_ref(method),
            _ => {}
        }
    }
}

fn opcode(instruction: &Instruction) -> u8 {
    match instruction {
        Instruction::Nop => 0,
        Instruction::AConstNull => 1,
        Instruction::IConst(_) => 2,
        Instruction::BConst(_) => 3,
        Instruction::Ldc(_) => 4,
        Instruction::ILoad(_) => 5,
        Instruction::IStore(_) => 6,
        Instruction::ALoad(_) => 7,
        Instruction::AStore(_) => 8,
        Instruction::Pop => 9,
        Instruction::Dup => 10,
        Instruction::Swap => 11,
        Instruction::IAdd => 12,
        Instruction::ISub => 13,
        Instruction::IMul => 14,
        Instruction::IDiv => 15,
        Instruction::IRem => 16,
        Instruction::INeg => 17,
        Instruction::If(..) => 18,
        Instruction::IfICmp(..) => 19,
        Instruction::IfNull(_) => 20,
        Instruction::IfNonNull(_) => 21,
        Instruction::Goto(_) => 22,
        Instruction::Jsr(_) => 23,
        Instruction::Ret(_) => 24,
        Instruction::LookupSwitch { .. } => 25,
        Instruction::New(_) => 26,
        Instruction::GetField(_) => 27,
        Instruction::PutField(_) => 28,
        Instruction::GetStatic(_) => 29,
        Instruction::PutStatic(_) => 30,
        Instruction::InvokeVirtual(_) => 31,
        Instruction::InvokeStatic(_) => 32,
        Instruction::InvokeSpecial(_) => 33,
        Instruction::CheckCast(_) => 34,
        Instruction::InstanceOf(_) => 35,
        Instruction::AThrow => 36,
        Instruction::IReturn => 37,
        Instruction::AReturn => 38,
        Instruction::Return => 39,
    }
}

// =============================================================================
// Reading
// =============================================================================

struct BodyReader<'r, 'b> {
    r: &'r mut ByteReader<'b>,
    pool: &'r [Arc<str>],
}

impl BodyReader<'_, '_> {
    fn constant(&mut self) -> Result<Arc<str>, ClassFormatError> {
        let index = self.r.read_u32()?;
        self.lookup(index)
    }

    fn lookup(&self, index: u32) -> Result<Arc<str>, ClassFormatError> {
        self.pool
            .get(index as usize)
            .cloned()
            .ok_or(ClassFormatError::ConstantOutOfRange {
                index,
                size: self.pool.len(),
            })
    }

    fn optional_constant(&mut self) -> Result<Option<Arc<str>>, ClassFormatError> {
        match self.r.read_optional_u32()? {
            Some(index) => self.lookup(index).map(Some),
            None => Ok(None),
        }
    }

    fn type_desc(&mut self) -> Result<TypeDesc, ClassFormatError> {
        let text = self.constant()?;
        TypeDesc::parse(&text).ok_or_else(|| ClassFormatError::InvalidDescriptor(text.to_string()))
    }

    fn method_descriptor(&mut self) -> Result<MethodDescriptor, ClassFormatError> {
        let text = self.constant()?;
        MethodDescriptor::parse(&text).ok_or_else(|| ClassFormatError::InvalidDescriptor(text.to_string()))
    }

    fn flags(&mut self) -> Result<AccessFlags, ClassFormatError> {
        Ok(AccessFlags::from_bits_truncate(self.r.read_u32()?))
    }

    fn len(&mut self) -> Result<usize, ClassFormatError> {
        Ok(self.r.read_len()?)
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, ClassFormatError> {
        let offset = self.r.offset();
        let value = self.r.read_u32()?;
        u16::try_from(value).map_err(|_| {
            ClassFormatError::Decode(DecodeError::InvalidTag {
                what,
                tag: u64::from(value),
                offset,
            })
        })
    }

    fn class(mut self) -> Result<ClassFile, ClassFormatError> {
        let name = self.constant()?;
        let super_name = self.optional_constant()?;
        let flags = self.flags()?;
        let source_file = self.optional_constant()?.map(|name| name.to_string());
        let field_count = self.len()?;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(FieldInfo {
                name: self.constant()?,
                ty: self.type_desc()?,
                flags: self.flags()?,
            });
        }
        let method_count = self.len()?;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            let name = self.constant()?;
            let descriptor = self.method_descriptor()?;
            let flags = self.flags()?;
            let code = if self.r.read_bool()? { Some(self.code()?) } else { None };
            methods.push(MethodInfo {
                name,
                descriptor,
                flags,
                code,
            });
        }
        Ok(ClassFile {
            name,
            super_name,
            flags,
            source_file,
            fields,
            methods,
        })
    }

    fn code(&mut self) -> Result<Code, ClassFormatError> {
        let max_stack = self.u16("max stack")?;
        let max_locals = self.u16("max locals")?;
        let count = self.len()?;
        let mut instructions = Vec::with_capacity(count);
        for _ in 0..count {
            instructions.push(self.instruction()?);
        }
        let count = self.len()?;
        let mut exception_table = Vec::with_capacity(count);
        for _ in 0..count {
            exception_table.push(ExceptionEntry {
                from: self.r.read_u32()?,
                to: self.r.read_u32()?,
                handler: self.r.read_u32()?,
                catch_type: self.optional_constant()?,
            });
        }
        let count = self.len()?;
        let mut line_numbers = Vec::with_capacity(count);
        for _ in 0..count {
            line_numbers.push(LineNumber {
                offset: self.r.read_u32()?,
                line: self.r.read_u32()?,
            });
        }
        Ok(Code {
            max_stack,
            max_locals,
            instructions,
            exception_table,
            line_numbers,
        })
    }

    fn int(&mut self) -> Result<i32, ClassFormatError> {
        let offset = self.r.offset();
        let value = self.r.read_i64()?;
        i32::try_from(value).map_err(|_| {
            ClassFormatError::Decode(DecodeError::InvalidTag {
                what: "int constant",
                tag: value as u64,
                offset,
            })
        })
    }

    fn condition(&mut self) -> Result<Condition, ClassFormatError> {
        let offset = self.r.offset();
        let code = self.r.read_u8()?;
        Condition::from_code(code).ok_or(ClassFormatError::Decode(DecodeError::InvalidTag {
            what: "condition",
            tag: u64::from(code),
            offset,
        }))
    }

    fn field_ref(&mut self) -> Result<FieldRef, ClassFormatError> {
        Ok(FieldRef {
            owner: self.constant()?,
            name: self.constant()?,
            ty: self.type_desc()?,
        })
    }

    fn method_ref(&mut self) -> Result<MethodRef, ClassFormatError> {
        Ok(MethodRef {
            owner: self.constant()?,
            name: self.constant()?,
            descriptor: self.method_descriptor()?,
        })
    }

    fn instruction(&mut self) -> Result<Instruction, ClassFormatError> {
        let offset = self.r.offset();
        let opcode = self.r.read_u8()?;
        Ok(match opcode {
            0 => Instruction::Nop,
            1 => Instruction::AConstNull,
            2 => Instruction::IConst(self.int()?),
            3 => Instruction::BConst(self.r.read_bool()?),
            4 => Instruction::Ldc(self.constant()?),
            5 => Instruction::ILoad(self.u16("local slot")?),
            6 => Instruction::IStore(self.u16("local slot")?),
            7 => Instruction::ALoad(self.u16("local slot")?),
            8 => Instruction::AStore(self.u16("local slot")?),
            9 => Instruction::Pop,
            10 => Instruction::Dup,
            11 => Instruction::Swap,
            12 => Instruction::IAdd,
            13 => Instruction::ISub,
            14 => Instruction::IMul,
            15 => Instruction::IDiv,
            16 => Instruction::IRem,
            17 => Instruction::INeg,
            18 => {
                let condition = self.condition()?;
                Instruction::If(condition, self.r.read_u32()?)
            }
            19 => {
                let condition = self.condition()?;
                Instruction::IfICmp(condition, self.r.read_u32()?)
            }
            20 => Instruction::IfNull(self.r.read_u32()?),
            21 => Instruction::IfNonNull(self.r.read_u32()?),
            22 => Instruction::Goto(self.r.read_u32()?),
            23 => Instruction::Jsr(self.r.read_u32()?),
            24 => Instruction::Ret(self.u16("local slot")?),
            25 => {
                let default = self.r.read_u32()?;
                let count = self.len()?;
                let mut cases = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = self.int()?;
                    cases.push((key, self.r.read_u32()?));
                }
                Instruction::LookupSwitch { default, cases }
            }
            26 => Instruction::New(self.constant()?),
            27 => Instruction::GetField(self.field_ref()?),
            28 => Instruction::PutField(self.field_ref()?),
            29 => Instruction::GetStatic(self.field_ref()?),
            30 => Instruction::PutStatic(self.field_ref()?),
            31 => Instruction::InvokeVirtual(self.method_ref()?),
            32 => Instruction::InvokeStatic(self.method_ref()?),
            33 => Instruction::InvokeSpecial(self.method_ref()?),
            34 => Instruction::CheckCast(self.constant()?),
            35 => Instruction::InstanceOf(self.constant()?),
            36 => Instruction::AThrow,
            37 => Instruction::IReturn,
            38 => Instruction::AReturn,
            39 => Instruction::Return,
            tag => {
                return Err(ClassFormatError::Decode(DecodeError::InvalidTag {
                    what: "opcode",
                    tag: u64::from(tag),
                    offset,
                }));
            }
        })
    }
}

#[cfg(test)]
#[path = "../tests/codec_tests.rs"]
mod codec_tests;
