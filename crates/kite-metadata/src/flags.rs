//! Bit-flag encoded modifiers of proto records.
//!
//! Multi-bit fields (visibility, modality, kinds) are packed into masks and
//! decoded with the helpers below; single bits are plain flags.

use bitflags::bitflags;
use kite_types::{ClassKind, Modality, Visibility};
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ClassFlags: u32 {
        const VISIBILITY_MASK = 0b0000_0011;
        const MODALITY_MASK   = 0b0000_1100;
        const KIND_MASK       = 0b0011_0000;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CallableFlags: u32 {
        const VISIBILITY_MASK = 0b0000_0000_0011;
        const MODALITY_MASK   = 0b0000_0000_1100;
        const KIND_MASK       = 0b0000_0111_0000;
        const HAS_GETTER      = 1 << 7;
        const HAS_SETTER      = 1 << 8;
        const HAS_CONSTANT    = 1 << 9;
        const IS_OPERATOR     = 1 << 10;
        const IS_CONST        = 1 << 11;
        const IS_PRIMARY      = 1 << 12;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AccessorFlags: u32 {
        const VISIBILITY_MASK = 0b011;
        /// The accessor has an explicit body rather than the synthesized default.
        const IS_NOT_DEFAULT  = 0b100;
    }
}

const MODALITY_SHIFT: u32 = 2;
const KIND_SHIFT: u32 = 4;

/// Kind of a callable record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CallableKind {
    Fun,
    Val,
    Var,
    Constructor,
}

impl CallableKind {
    fn code(self) -> u32 {
        match self {
            CallableKind::Fun => 0,
            CallableKind::Val => 1,
            CallableKind::Var => 2,
            CallableKind::Constructor => 3,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(CallableKind::Fun),
            1 => Some(CallableKind::Val),
            2 => Some(CallableKind::Var),
            3 => Some(CallableKind::Constructor),
            _ => None,
        }
    }
}

pub fn encode_visibility(visibility: Visibility) -> u32 {
    match visibility {
        Visibility::Public => 0,
        Visibility::Internal => 1,
        Visibility::Private | Visibility::Local => 2,
    }
}

pub fn decode_visibility(bits: u32) -> Visibility {
    match bits & 0b11 {
        1 => Visibility::Internal,
        2 | 3 => Visibility::Private,
        _ => Visibility::Public,
    }
}

fn encode_modality(modality: Modality) -> u32 {
    match modality {
        Modality::Final => 0,
        Modality::Open => 1,
        Modality::Abstract => 2,
    }
}

fn decode_modality(bits: u32) -> Modality {
    match (bits >> MODALITY_SHIFT) & 0b11 {
        1 => Modality::Open,
        2 | 3 => Modality::Abstract,
        _ => Modality::Final,
    }
}

impl ClassFlags {
    pub fn build(visibility: Visibility, modality: Modality, kind: ClassKind) -> Self {
        let kind = match kind {
            ClassKind::Class => 0,
            ClassKind::Interface => 1,
            ClassKind::Object => 2,
            ClassKind::Script => 3,
        };
        ClassFlags::from_bits_retain(
            encode_visibility(visibility)
                | (encode_modality(modality) << MODALITY_SHIFT)
                | (kind << KIND_SHIFT),
        )
    }

    pub fn visibility(self) -> Visibility {
        decode_visibility(self.bits())
    }

    pub fn modality(self) -> Modality {
        decode_modality(self.bits())
    }

    pub fn kind(self) -> ClassKind {
        match (self.bits() & Self::KIND_MASK.bits()) >> KIND_SHIFT {
            1 => ClassKind::Interface,
            2 => ClassKind::Object,
            3 => ClassKind::Script,
            _ => ClassKind::Class,
        }
    }
}

impl CallableFlags {
    pub fn build(visibility: Visibility, modality: Modality, kind: CallableKind) -> Self {
        CallableFlags::from_bits_retain(
            encode_visibility(visibility)
                | (encode_modality(modality) << MODALITY_SHIFT)
                | (kind.code() << KIND_SHIFT),
        )
    }

    pub fn visibility(self) -> Visibility {
        decode_visibility(self.bits())
    }

    pub fn modality(self) -> Modality {
        decode_modality(self.bits())
    }

    /// Raw kind code; values outside the known kinds mean corrupt input.
    pub fn kind_code(self) -> u32 {
        (self.bits() & Self::KIND_MASK.bits()) >> KIND_SHIFT
    }

    pub fn kind(self) -> Option<CallableKind> {
        CallableKind::from_code(self.kind_code())
    }
}

impl AccessorFlags {
    pub fn build(visibility: Visibility, is_not_default: bool) -> Self {
        let mut flags = AccessorFlags::from_bits_retain(encode_visibility(visibility));
        flags.set(AccessorFlags::IS_NOT_DEFAULT, is_not_default);
        flags
    }

    pub fn visibility(self) -> Visibility {
        decode_visibility(self.bits())
    }

    pub fn is_not_default(self) -> bool {
        self.contains(AccessorFlags::IS_NOT_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callable_flags_pack_fields() {
        let flags = CallableFlags::build(Visibility::Private, Modality::Open, CallableKind::Var)
            | CallableFlags::HAS_GETTER
            | CallableFlags::HAS_CONSTANT;
        assert_eq!(flags.visibility(), Visibility::Private);
        assert_eq!(flags.modality(), Modality::Open);
        assert_eq!(flags.kind(), Some(CallableKind::Var));
        assert!(flags.contains(CallableFlags::HAS_GETTER));
        assert!(!flags.contains(CallableFlags::HAS_SETTER));
    }

    #[test]
    fn test_unknown_callable_kind_is_detected() {
        let flags = CallableFlags::from_bits_retain(5 << 4);
        assert_eq!(flags.kind(), None);
        assert_eq!(flags.kind_code(), 5);
    }

    #[test]
    fn test_class_flags() {
        let flags = ClassFlags::build(Visibility::Public, Modality::Abstract, ClassKind::Interface);
        assert_eq!(flags.kind(), ClassKind::Interface);
        assert_eq!(flags.modality(), Modality::Abstract);
    }
}
