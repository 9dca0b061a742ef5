//! Class-file definitions for wrapgen
//!
//! This crate provides the instruction subset, constant pool, class
//! structure, builder and verifier used to emit and load wrapper helpers.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod annotation;
pub mod builder;
pub mod class;
pub mod constants;
pub mod descriptor;
pub mod encoder;
pub mod opcode;
pub mod verify;

pub use annotation::{Annotation, ElementValue};
pub use builder::{ClassBuilder, ClassFileError, CodeBuilder, Label, LdcConstant};
pub use class::{Attribute, ClassFile, Code, FieldInfo, MethodInfo, MAGIC};
pub use constants::{Constant, ConstantPool, Loadable, MemberRef};
pub use descriptor::{FieldType, MethodDescriptor};
pub use encoder::{ByteReader, ByteWriter, DecodeError};
pub use opcode::{access, version, Opcode};
pub use verify::{parse_instructions, verify_class, Instruction, VerifyError};
