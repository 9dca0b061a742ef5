//! Instruction set
//!
//! The subset of the JVM instruction set that wrapper helpers and the
//! bundled emission libraries produce. Numbering follows the class-file
//! format so that any conforming emitter produces loadable code.

/// Instruction opcode
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Constants =====
    /// No operation
    Nop = 0x00,
    /// Push null
    AconstNull = 0x01,
    /// Push int -1
    IconstM1 = 0x02,
    /// Push int 0
    Iconst0 = 0x03,
    /// Push int 1
    Iconst1 = 0x04,
    /// Push int 2
    Iconst2 = 0x05,
    /// Push int 3
    Iconst3 = 0x06,
    /// Push int 4
    Iconst4 = 0x07,
    /// Push int 5
    Iconst5 = 0x08,
    /// Push sign-extended byte (operand: i8)
    Bipush = 0x10,
    /// Push sign-extended short (operand: i16)
    Sipush = 0x11,
    /// Push constant (operand: u8 pool index)
    Ldc = 0x12,
    /// Push constant (operand: u16 pool index)
    LdcW = 0x13,

    // ===== Loads =====
    /// Load int local (operand: u8)
    Iload = 0x15,
    /// Load reference local (operand: u8)
    Aload = 0x19,
    /// Load int local 0
    Iload0 = 0x1a,
    /// Load int local 1
    Iload1 = 0x1b,
    /// Load int local 2
    Iload2 = 0x1c,
    /// Load int local 3
    Iload3 = 0x1d,
    /// Load reference local 0
    Aload0 = 0x2a,
    /// Load reference local 1
    Aload1 = 0x2b,
    /// Load reference local 2
    Aload2 = 0x2c,
    /// Load reference local 3
    Aload3 = 0x2d,

    // ===== Stores =====
    /// Store int local (operand: u8)
    Istore = 0x36,
    /// Store reference local (operand: u8)
    Astore = 0x3a,
    /// Store int local 0
    Istore0 = 0x3b,
    /// Store int local 1
    Istore1 = 0x3c,
    /// Store int local 2
    Istore2 = 0x3d,
    /// Store int local 3
    Istore3 = 0x3e,
    /// Store reference local 0
    Astore0 = 0x4b,
    /// Store reference local 1
    Astore1 = 0x4c,
    /// Store reference local 2
    Astore2 = 0x4d,
    /// Store reference local 3
    Astore3 = 0x4e,

    // ===== Stack =====
    /// Pop one value
    Pop = 0x57,
    /// Pop two values
    Pop2 = 0x58,
    /// Duplicate top value
    Dup = 0x59,
    /// Swap top two values
    Swap = 0x5f,

    // ===== Control flow =====
    /// Branch if int is zero (operand: i16)
    Ifeq = 0x99,
    /// Branch if int is non-zero (operand: i16)
    Ifne = 0x9a,
    /// Unconditional branch (operand: i16)
    Goto = 0xa7,
    /// Return int
    Ireturn = 0xac,
    /// Return reference
    Areturn = 0xb0,
    /// Return void
    Return = 0xb1,

    // ===== Objects =====
    /// Read instance field (operand: u16 fieldref)
    Getfield = 0xb4,
    /// Write instance field (operand: u16 fieldref)
    Putfield = 0xb5,
    /// Virtual call (operand: u16 methodref)
    Invokevirtual = 0xb6,
    /// Special call (operand: u16 methodref)
    Invokespecial = 0xb7,
    /// Static call (operand: u16 methodref)
    Invokestatic = 0xb8,
    /// Interface call (operands: u16 methodref, u8 count, u8 zero)
    Invokeinterface = 0xb9,
    /// Allocate instance (operand: u16 class)
    New = 0xbb,
    /// Throw reference
    Athrow = 0xbf,
    /// Checked cast (operand: u16 class)
    Checkcast = 0xc0,
    /// Instance test (operand: u16 class)
    Instanceof = 0xc1,
    /// Branch if null (operand: i16)
    Ifnull = 0xc6,
    /// Branch if not null (operand: i16)
    Ifnonnull = 0xc7,
}

impl Opcode {
    /// Convert to the encoded byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a byte, `None` for instructions outside the supported subset
    pub fn from_u8(byte: u8) -> Option<Self> {
        use Opcode::*;
        let op = match byte {
            0x00 => Nop,
            0x01 => AconstNull,
            0x02 => IconstM1,
            0x03 => Iconst0,
            0x04 => Iconst1,
            0x05 => Iconst2,
            0x06 => Iconst3,
            0x07 => Iconst4,
            0x08 => Iconst5,
            0x10 => Bipush,
            0x11 => Sipush,
            0x12 => Ldc,
            0x13 => LdcW,
            0x15 => Iload,
            0x19 => Aload,
            0x1a => Iload0,
            0x1b => Iload1,
            0x1c => Iload2,
            0x1d => Iload3,
            0x2a => Aload0,
            0x2b => Aload1,
            0x2c => Aload2,
            0x2d => Aload3,
            0x36 => Istore,
            0x3a => Astore,
            0x3b => Istore0,
            0x3c => Istore1,
            0x3d => Istore2,
            0x3e => Istore3,
            0x4b => Astore0,
            0x4c => Astore1,
            0x4d => Astore2,
            0x4e => Astore3,
            0x57 => Pop,
            0x58 => Pop2,
            0x59 => Dup,
            0x5f => Swap,
            0x99 => Ifeq,
            0x9a => Ifne,
            0xa7 => Goto,
            0xac => Ireturn,
            0xb0 => Areturn,
            0xb1 => Return,
            0xb4 => Getfield,
            0xb5 => Putfield,
            0xb6 => Invokevirtual,
            0xb7 => Invokespecial,
            0xb8 => Invokestatic,
            0xb9 => Invokeinterface,
            0xbb => New,
            0xbf => Athrow,
            0xc0 => Checkcast,
            0xc1 => Instanceof,
            0xc6 => Ifnull,
            0xc7 => Ifnonnull,
            _ => return None,
        };
        Some(op)
    }

    /// Number of operand bytes following the opcode
    pub fn operand_size(self) -> usize {
        use Opcode::*;
        match self {
            Bipush | Ldc | Iload | Aload | Istore | Astore => 1,
            Sipush | LdcW | Ifeq | Ifne | Goto | Ifnull | Ifnonnull => 2,
            Getfield | Putfield | Invokevirtual | Invokespecial | Invokestatic => 2,
            New | Checkcast | Instanceof => 2,
            Invokeinterface => 4,
            _ => 0,
        }
    }

    /// Whether this opcode carries a relative branch offset
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Ifeq | Opcode::Ifne | Opcode::Goto | Opcode::Ifnull | Opcode::Ifnonnull
        )
    }

    /// Whether execution never continues to the next instruction
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Goto | Opcode::Ireturn | Opcode::Areturn | Opcode::Return | Opcode::Athrow
        )
    }

    /// Whether this opcode invokes a method
    pub fn is_invoke(self) -> bool {
        matches!(
            self,
            Opcode::Invokevirtual
                | Opcode::Invokespecial
                | Opcode::Invokestatic
                | Opcode::Invokeinterface
        )
    }

    /// Local slot addressed by the short `xLOAD_n` / `xSTORE_n` forms
    pub fn implicit_local(self) -> Option<u16> {
        use Opcode::*;
        match self {
            Iload0 | Aload0 | Istore0 | Astore0 => Some(0),
            Iload1 | Aload1 | Istore1 | Astore1 => Some(1),
            Iload2 | Aload2 | Istore2 | Astore2 => Some(2),
            Iload3 | Aload3 | Istore3 | Astore3 => Some(3),
            _ => None,
        }
    }

    /// Lower-case mnemonic
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "nop",
            AconstNull => "aconst_null",
            IconstM1 => "iconst_m1",
            Iconst0 => "iconst_0",
            Iconst1 => "iconst_1",
            Iconst2 => "iconst_2",
            Iconst3 => "iconst_3",
            Iconst4 => "iconst_4",
            Iconst5 => "iconst_5",
            Bipush => "bipush",
            Sipush => "sipush",
            Ldc => "ldc",
            LdcW => "ldc_w",
            Iload => "iload",
            Aload => "aload",
            Iload0 => "iload_0",
            Iload1 => "iload_1",
            Iload2 => "iload_2",
            Iload3 => "iload_3",
            Aload0 => "aload_0",
            Aload1 => "aload_1",
            Aload2 => "aload_2",
            Aload3 => "aload_3",
            Istore => "istore",
            Astore => "astore",
            Istore0 => "istore_0",
            Istore1 => "istore_1",
            Istore2 => "istore_2",
            Istore3 => "istore_3",
            Astore0 => "astore_0",
            Astore1 => "astore_1",
            Astore2 => "astore_2",
            Astore3 => "astore_3",
            Pop => "pop",
            Pop2 => "pop2",
            Dup => "dup",
            Swap => "swap",
            Ifeq => "ifeq",
            Ifne => "ifne",
            Goto => "goto",
            Ireturn => "ireturn",
            Areturn => "areturn",
            Return => "return",
            Getfield => "getfield",
            Putfield => "putfield",
            Invokevirtual => "invokevirtual",
            Invokespecial => "invokespecial",
            Invokestatic => "invokestatic",
            Invokeinterface => "invokeinterface",
            New => "new",
            Athrow => "athrow",
            Checkcast => "checkcast",
            Instanceof => "instanceof",
            Ifnull => "ifnull",
            Ifnonnull => "ifnonnull",
        }
    }
}

/// Access flags
pub mod access {
    /// Public
    pub const ACC_PUBLIC: u16 = 0x0001;
    /// Private
    pub const ACC_PRIVATE: u16 = 0x0002;
    /// Protected
    pub const ACC_PROTECTED: u16 = 0x0004;
    /// Static
    pub const ACC_STATIC: u16 = 0x0008;
    /// Final
    pub const ACC_FINAL: u16 = 0x0010;
    /// Treat superclass methods specially (always set on modern classes)
    pub const ACC_SUPER: u16 = 0x0020;
    /// Interface
    pub const ACC_INTERFACE: u16 = 0x0200;
    /// Abstract
    pub const ACC_ABSTRACT: u16 = 0x0400;
    /// Compiler generated
    pub const ACC_SYNTHETIC: u16 = 0x1000;
}

/// Class-file major versions
pub mod version {
    /// Java 5
    pub const V1_5: u16 = 49;
    /// Java 6
    pub const V1_6: u16 = 50;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for byte in 0u8..=255 {
            if let Some(op) = Opcode::from_u8(byte) {
                assert_eq!(op.to_u8(), byte, "{}", op.mnemonic());
            }
        }
    }

    #[test]
    fn test_unsupported_opcode() {
        // iadd is outside the subset
        assert_eq!(Opcode::from_u8(0x60), None);
    }

    #[test]
    fn test_jump_classification() {
        assert!(Opcode::Ifnull.is_jump());
        assert!(Opcode::Goto.is_terminator());
        assert!(!Opcode::Ifnull.is_terminator());
        assert_eq!(Opcode::Invokeinterface.operand_size(), 4);
        assert_eq!(Opcode::Aload2.implicit_local(), Some(2));
    }
}
