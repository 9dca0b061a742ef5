//! Symbolic opcode table
//!
//! Emission libraries publish their numeric encodings as static fields of an
//! `Opcodes` type. The table copies them once per provider; generated code
//! only ever refers to opcodes by symbolic name.

use crate::error::{CodeGenError, CodeGenResult};
use std::fmt;
use wrapgen_sdk::NativeLibrary;

/// Name of the exported type holding the opcode constants
pub const OPCODES_TYPE: &str = "Opcodes";

/// Define the symbolic opcode vocabulary
macro_rules! define_ops {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Symbolic opcode, access flag or version constant
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Op {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl Op {
            /// Every symbolic name, in table order
            pub const ALL: &'static [Op] = &[$(Op::$variant),*];

            /// Constant name as exported by the library
            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$variant => $name,)*
                }
            }
        }
    };
}

define_ops! {
    AccPublic => "ACC_PUBLIC",
    AccPrivate => "ACC_PRIVATE",
    AccStatic => "ACC_STATIC",
    AccFinal => "ACC_FINAL",
    AccSuper => "ACC_SUPER",
    AccInterface => "ACC_INTERFACE",
    AccAbstract => "ACC_ABSTRACT",
    AccSynthetic => "ACC_SYNTHETIC",
    V1_5 => "V1_5",
    V1_6 => "V1_6",
    AconstNull => "ACONST_NULL",
    Iconst0 => "ICONST_0",
    Iconst1 => "ICONST_1",
    Bipush => "BIPUSH",
    Sipush => "SIPUSH",
    Ldc => "LDC",
    Iload => "ILOAD",
    Aload => "ALOAD",
    Istore => "ISTORE",
    Astore => "ASTORE",
    Pop => "POP",
    Dup => "DUP",
    Swap => "SWAP",
    Ifeq => "IFEQ",
    Ifne => "IFNE",
    Goto => "GOTO",
    Ireturn => "IRETURN",
    Areturn => "ARETURN",
    Return => "RETURN",
    Getfield => "GETFIELD",
    Putfield => "PUTFIELD",
    Invokevirtual => "INVOKEVIRTUAL",
    Invokespecial => "INVOKESPECIAL",
    Invokestatic => "INVOKESTATIC",
    Invokeinterface => "INVOKEINTERFACE",
    New => "NEW",
    Athrow => "ATHROW",
    Checkcast => "CHECKCAST",
    Instanceof => "INSTANCEOF",
    Ifnull => "IFNULL",
    Ifnonnull => "IFNONNULL",
    FNew => "F_NEW",
    FAppend => "F_APPEND",
    FSame => "F_SAME",
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Native encodings of every [`Op`] for one provider
///
/// A zero entry means the provider does not support the name.
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    values: Vec<i32>,
}

impl OpcodeTable {
    /// Table in which every name is unsupported
    pub fn empty() -> Self {
        Self {
            values: vec![0; Op::ALL.len()],
        }
    }

    /// Copy the library's `Opcodes` constants
    pub fn populate(library: &dyn NativeLibrary) -> CodeGenResult<Self> {
        let opcodes =
            library
                .resolve_type(OPCODES_TYPE)
                .ok_or_else(|| CodeGenError::IncompatibleProvider {
                    identity: library.identity().to_string(),
                    reason: format!("no {} type", OPCODES_TYPE),
                })?;
        let values = Op::ALL
            .iter()
            .map(|op| {
                opcodes
                    .static_field(op.name())
                    .and_then(|v| v.as_int())
                    .unwrap_or(0)
            })
            .collect();
        let table = Self { values };
        tracing::debug!(
            provider = library.identity(),
            missing = ?table.missing(),
            "populated opcode table"
        );
        Ok(table)
    }

    /// Native value of `op`; fails on an unsupported name
    pub fn get(&self, op: Op) -> CodeGenResult<i32> {
        match self.values.get(op as usize).copied() {
            Some(0) | None => Err(CodeGenError::MissingOpcode(op.name())),
            Some(value) => Ok(value),
        }
    }

    /// Whether the provider supports `op`
    pub fn supports(&self, op: Op) -> bool {
        self.get(op).is_ok()
    }

    /// Fail with the first unsupported name in `ops`
    pub fn require(&self, ops: &[Op]) -> CodeGenResult<()> {
        ops.iter().try_for_each(|op| self.get(*op).map(|_| ()))
    }

    /// Names the provider does not support
    pub fn missing(&self) -> Vec<&'static str> {
        Op::ALL
            .iter()
            .filter(|op| !self.supports(**op))
            .map(|op| op.name())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Op::ALL.iter().map(|op| op.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Op::ALL.len());
    }

    #[test]
    fn test_empty_table_rejects_everything() {
        let table = OpcodeTable::empty();
        assert!(matches!(
            table.get(Op::Aload),
            Err(CodeGenError::MissingOpcode("ALOAD"))
        ));
        assert_eq!(table.missing().len(), Op::ALL.len());
    }

    #[test]
    fn test_populate_from_modern_library() {
        let table = OpcodeTable::populate(wrapgen_asm::modern().as_ref()).unwrap();
        assert_eq!(table.get(Op::Aload).unwrap(), 0x19);
        assert_eq!(table.get(Op::V1_5).unwrap(), 49);
        assert_eq!(table.get(Op::FNew).unwrap(), -1);
        assert!(table.missing().is_empty());
    }

    #[test]
    fn test_legacy_library_lacks_frame_markers() {
        let table = OpcodeTable::populate(wrapgen_asm::legacy().as_ref()).unwrap();
        assert!(table.supports(Op::Ifnull));
        assert!(!table.supports(Op::V1_6));
        assert!(table.require(&[Op::Aload, Op::FSame]).is_err());
        assert_eq!(table.missing(), vec!["V1_6", "F_NEW", "F_APPEND", "F_SAME"]);
    }
}
