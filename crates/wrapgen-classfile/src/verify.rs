//! Code verification
//!
//! Structural checks performed before a class is defined: every instruction
//! decodes, operands name constant-pool entries of the right kind, branch
//! targets land on instruction boundaries, and the operand stack has one
//! consistent depth at every reachable instruction.

use crate::class::{ClassFile, Code, MethodInfo};
use crate::constants::ConstantPool;
use crate::descriptor::{FieldType, MethodDescriptor};
use crate::encoder::{ByteReader, DecodeError};
use crate::opcode::{access, Opcode};
use rustc_hash::FxHashMap;

/// Verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Invalid opcode
    #[error("Invalid opcode {opcode:#x} at offset {offset}")]
    InvalidOpcode {
        /// The byte
        opcode: u8,
        /// Where it was found
        offset: usize,
    },

    /// Stack underflow
    #[error("Stack underflow at offset {0}")]
    StackUnderflow(usize),

    /// Depth exceeds `max_stack`
    #[error("Stack overflow at offset {0} (depth: {1})")]
    StackOverflow(usize, u16),

    /// Two paths reach an instruction with different depths
    #[error("Inconsistent stack depth at offset {offset}: {first} vs {second}")]
    StackMismatch {
        /// Instruction offset
        offset: usize,
        /// Depth recorded first
        first: u16,
        /// Depth on the conflicting path
        second: u16,
    },

    /// Invalid jump target
    #[error("Invalid jump target {target} at offset {offset}")]
    InvalidJumpTarget {
        /// Computed target
        target: i64,
        /// Branch offset
        offset: usize,
    },

    /// Invalid constant pool reference
    #[error("Invalid constant pool reference: index {index} at offset {offset}")]
    InvalidConstantRef {
        /// Pool index
        index: u16,
        /// Instruction offset
        offset: usize,
    },

    /// Invalid local variable reference
    #[error("Invalid local variable reference: index {index} (max {max}) at offset {offset}")]
    InvalidLocalRef {
        /// Slot
        index: u16,
        /// `max_locals`
        max: u16,
        /// Instruction offset
        offset: usize,
    },

    /// `invokeinterface` count operand disagrees with the descriptor
    #[error("Bad invokeinterface count {count} at offset {offset}")]
    BadInterfaceCount {
        /// Encoded count
        count: u8,
        /// Instruction offset
        offset: usize,
    },

    /// Execution falls off end
    #[error("Execution falls off end of method at offset {0}")]
    FallOffEnd(usize),

    /// Concrete method without code, or abstract method with code
    #[error("Method {0} has an invalid body")]
    InvalidBody(String),

    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// A decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Byte offset within the code array
    pub offset: usize,
    /// Opcode
    pub opcode: Opcode,
    /// Operand bytes
    pub operands: Vec<u8>,
}

impl Instruction {
    /// Offset of the following instruction
    pub fn next_offset(&self) -> usize {
        self.offset + 1 + self.operands.len()
    }

    /// The u16 operand (pool index or branch offset bits)
    pub fn u16_operand(&self) -> u16 {
        u16::from_be_bytes([self.operands[0], self.operands[1]])
    }

    /// Absolute branch target for jump instructions
    pub fn jump_target(&self) -> i64 {
        self.offset as i64 + i16::from_be_bytes([self.operands[0], self.operands[1]]) as i64
    }

    /// Local slot for load/store instructions
    pub fn local_index(&self) -> Option<u16> {
        match self.opcode {
            Opcode::Iload | Opcode::Aload | Opcode::Istore | Opcode::Astore => {
                Some(self.operands[0] as u16)
            }
            op => op.implicit_local(),
        }
    }
}

/// Decode an instruction stream
pub fn parse_instructions(code: &[u8]) -> Result<Vec<Instruction>, VerifyError> {
    let mut instructions = Vec::new();
    let mut reader = ByteReader::new(code);

    while reader.has_more() {
        let offset = reader.position();
        let byte = reader.read_u8()?;
        let opcode = Opcode::from_u8(byte).ok_or(VerifyError::InvalidOpcode {
            opcode: byte,
            offset,
        })?;
        let operands = reader.read_bytes(opcode.operand_size())?;
        instructions.push(Instruction {
            offset,
            opcode,
            operands,
        });
    }

    Ok(instructions)
}

/// Verify every method of a class
pub fn verify_class(class: &ClassFile) -> Result<(), VerifyError> {
    for method in &class.methods {
        verify_method(method, &class.pool)?;
    }
    Ok(())
}

fn verify_method(method: &MethodInfo, pool: &ConstantPool) -> Result<(), VerifyError> {
    let is_abstract = method.access & access::ACC_ABSTRACT != 0;
    let code = match (&method.code, is_abstract) {
        (None, true) => return Ok(()),
        (Some(code), false) => code,
        _ => return Err(VerifyError::InvalidBody(method.name.clone())),
    };
    MethodDescriptor::parse(&method.descriptor)?;
    verify_code(code, pool)
}

/// Verify one method body
pub fn verify_code(code: &Code, pool: &ConstantPool) -> Result<(), VerifyError> {
    let instructions = parse_instructions(&code.code)?;
    for instr in &instructions {
        verify_operands(instr, pool)?;
        if let Some(index) = instr.local_index() {
            if index >= code.max_locals {
                return Err(VerifyError::InvalidLocalRef {
                    index,
                    max: code.max_locals,
                    offset: instr.offset,
                });
            }
        }
    }
    stack_depths(&instructions, pool, Some(code.max_stack))?;
    Ok(())
}

/// Compute the maximum operand-stack depth of an instruction stream
pub fn compute_max_stack(code: &[u8], pool: &ConstantPool) -> Result<u16, VerifyError> {
    let instructions = parse_instructions(code)?;
    stack_depths(&instructions, pool, None)
}

fn verify_operands(instr: &Instruction, pool: &ConstantPool) -> Result<(), VerifyError> {
    let bad_ref = |index: u16| VerifyError::InvalidConstantRef {
        index,
        offset: instr.offset,
    };
    match instr.opcode {
        Opcode::Ldc => {
            let index = instr.operands[0] as u16;
            pool.loadable_at(index).map_err(|_| bad_ref(index))?;
        }
        Opcode::LdcW => {
            let index = instr.u16_operand();
            pool.loadable_at(index).map_err(|_| bad_ref(index))?;
        }
        Opcode::Getfield | Opcode::Putfield => {
            let index = instr.u16_operand();
            pool.fieldref_at(index).map_err(|_| bad_ref(index))?;
        }
        Opcode::Invokevirtual | Opcode::Invokespecial | Opcode::Invokestatic => {
            let index = instr.u16_operand();
            pool.methodref_at(index).map_err(|_| bad_ref(index))?;
        }
        Opcode::Invokeinterface => {
            let index = instr.u16_operand();
            let member = pool.methodref_at(index).map_err(|_| bad_ref(index))?;
            if !member.interface {
                return Err(bad_ref(index));
            }
            let desc = MethodDescriptor::parse(member.descriptor)?;
            let count = instr.operands[2];
            if count as u16 != desc.param_slots() + 1 || instr.operands[3] != 0 {
                return Err(VerifyError::BadInterfaceCount {
                    count,
                    offset: instr.offset,
                });
            }
        }
        Opcode::New | Opcode::Checkcast | Opcode::Instanceof => {
            let index = instr.u16_operand();
            pool.class_at(index).map_err(|_| bad_ref(index))?;
        }
        _ => {}
    }
    Ok(())
}

/// Slots popped and pushed by one instruction
fn stack_effect(instr: &Instruction, pool: &ConstantPool) -> Result<(u16, u16), VerifyError> {
    use Opcode::*;
    let effect = match instr.opcode {
        Nop | Goto | Return => (0, 0),
        AconstNull | IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5
        | Bipush | Sipush | Ldc | LdcW | New => (0, 1),
        Iload | Aload | Iload0 | Iload1 | Iload2 | Iload3 | Aload0 | Aload1 | Aload2 | Aload3 => {
            (0, 1)
        }
        Istore | Astore | Istore0 | Istore1 | Istore2 | Istore3 | Astore0 | Astore1 | Astore2
        | Astore3 => (1, 0),
        Pop | Ifeq | Ifne | Ifnull | Ifnonnull | Ireturn | Areturn | Athrow => (1, 0),
        Pop2 => (2, 0),
        Dup => (1, 2),
        Swap => (2, 2),
        Checkcast | Instanceof => (1, 1),
        Getfield | Putfield => {
            let member = pool.fieldref_at(instr.u16_operand())?;
            let slots = FieldType::parse(member.descriptor)?.slots();
            if instr.opcode == Getfield {
                (1, slots)
            } else {
                (1 + slots, 0)
            }
        }
        Invokevirtual | Invokespecial | Invokestatic | Invokeinterface => {
            let member = pool.methodref_at(instr.u16_operand())?;
            let desc = MethodDescriptor::parse(member.descriptor)?;
            let receiver = if instr.opcode == Invokestatic { 0 } else { 1 };
            (desc.param_slots() + receiver, desc.return_slots())
        }
    };
    Ok(effect)
}

/// Dataflow over reachable instructions; returns the maximum depth
fn stack_depths(
    instructions: &[Instruction],
    pool: &ConstantPool,
    limit: Option<u16>,
) -> Result<u16, VerifyError> {
    if instructions.is_empty() {
        return Err(VerifyError::FallOffEnd(0));
    }
    let by_offset: FxHashMap<usize, usize> = instructions
        .iter()
        .enumerate()
        .map(|(i, instr)| (instr.offset, i))
        .collect();
    let mut depth_at: Vec<Option<u16>> = vec![None; instructions.len()];
    let mut worklist = vec![(0usize, 0u16)];
    let mut max = 0u16;

    while let Some((index, depth)) = worklist.pop() {
        let instr = &instructions[index];
        match depth_at[index] {
            Some(seen) if seen == depth => continue,
            Some(seen) => {
                return Err(VerifyError::StackMismatch {
                    offset: instr.offset,
                    first: seen,
                    second: depth,
                })
            }
            None => depth_at[index] = Some(depth),
        }

        let (pops, pushes) = stack_effect(instr, pool)?;
        let after = depth
            .checked_sub(pops)
            .ok_or(VerifyError::StackUnderflow(instr.offset))?
            + pushes;
        max = max.max(after).max(depth);
        if let Some(limit) = limit {
            if after > limit {
                return Err(VerifyError::StackOverflow(instr.offset, after));
            }
        }

        if instr.opcode.is_jump() {
            let target = instr.jump_target();
            let target_index = usize::try_from(target)
                .ok()
                .and_then(|t| by_offset.get(&t).copied())
                .ok_or(VerifyError::InvalidJumpTarget {
                    target,
                    offset: instr.offset,
                })?;
            worklist.push((target_index, after));
        }
        if !instr.opcode.is_terminator() {
            if index + 1 >= instructions.len() {
                return Err(VerifyError::FallOffEnd(instr.offset));
            }
            worklist.push((index + 1, after));
        }
    }

    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(bytes: Vec<u8>, max_stack: u16, max_locals: u16) -> Code {
        Code {
            max_stack,
            max_locals,
            code: bytes,
            attributes: vec![],
        }
    }

    #[test]
    fn test_straight_line() {
        let pool = ConstantPool::new();
        // aconst_null; areturn
        let body = code(vec![0x01, 0xb0], 1, 1);
        verify_code(&body, &pool).unwrap();
        assert_eq!(compute_max_stack(&body.code, &pool).unwrap(), 1);
    }

    #[test]
    fn test_fall_off_end() {
        let pool = ConstantPool::new();
        let body = code(vec![0x01], 1, 0);
        assert_eq!(verify_code(&body, &pool), Err(VerifyError::FallOffEnd(0)));
    }

    #[test]
    fn test_invalid_jump_target() {
        let pool = ConstantPool::new();
        // goto +1 lands inside its own operand
        let body = code(vec![0xa7, 0x00, 0x01], 0, 0);
        assert!(matches!(
            verify_code(&body, &pool),
            Err(VerifyError::InvalidJumpTarget { target: 1, .. })
        ));
    }

    #[test]
    fn test_stack_mismatch_at_merge() {
        let pool = ConstantPool::new();
        // 0: aload_0  1: ifnull -> 8  4: aload_0  5: goto -> 8  8: return
        let body = code(vec![0x2a, 0xc6, 0x00, 0x07, 0x2a, 0xa7, 0x00, 0x03, 0xb1], 2, 1);
        assert!(matches!(
            verify_code(&body, &pool),
            Err(VerifyError::StackMismatch { offset: 8, .. })
        ));
    }

    #[test]
    fn test_max_stack_enforced() {
        let pool = ConstantPool::new();
        // aconst_null; dup; pop; areturn
        let body = code(vec![0x01, 0x59, 0x57, 0xb0], 1, 0);
        assert_eq!(
            verify_code(&body, &pool),
            Err(VerifyError::StackOverflow(1, 2))
        );
    }

    #[test]
    fn test_local_out_of_range() {
        let pool = ConstantPool::new();
        let body = code(vec![0x2b, 0xb0], 1, 1);
        assert!(matches!(
            verify_code(&body, &pool),
            Err(VerifyError::InvalidLocalRef { index: 1, .. })
        ));
    }

    #[test]
    fn test_constant_kind_checked() {
        let mut pool = ConstantPool::new();
        let utf8 = pool.utf8("not a class");
        let body = code(vec![0xbb, 0x00, utf8 as u8, 0xb0], 1, 0);
        assert!(matches!(
            verify_code(&body, &pool),
            Err(VerifyError::InvalidConstantRef { .. })
        ));
    }
}
