//! Bytecode interpreter
//!
//! Executes the instruction subset of `wrapgen-classfile` against the
//! runtime model. Code is verified before it gets here, so structural
//! problems surface as `Fault::Execution` rather than panics.

use super::fault::{Fault, FaultResult};
use super::registry::ClassResolver;
use super::value::Value;
use crate::types::binary_name;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use wrapgen_classfile::{
    parse_instructions, ClassFile, FieldType, Instruction, Loadable, MethodDescriptor, Opcode,
    VerifyError,
};

/// A method body prepared for execution
#[derive(Debug)]
pub struct LoadedCode {
    class: Arc<ClassFile>,
    method: usize,
    max_locals: usize,
    params: Vec<FieldType>,
    is_static: bool,
    instructions: Vec<Instruction>,
    index: FxHashMap<usize, usize>,
}

impl LoadedCode {
    /// Decode the body of `class.methods[method]`
    pub fn new(class: Arc<ClassFile>, method: usize) -> Result<Self, VerifyError> {
        let info = class
            .methods
            .get(method)
            .ok_or_else(|| VerifyError::InvalidBody(format!("no method #{}", method)))?;
        let code = info
            .code
            .as_ref()
            .ok_or_else(|| VerifyError::InvalidBody(format!("{} has no code", info.name)))?;
        let descriptor = MethodDescriptor::parse(&info.descriptor)?;
        let instructions = parse_instructions(&code.code)?;
        let index = instructions
            .iter()
            .enumerate()
            .map(|(i, insn)| (insn.offset, i))
            .collect();
        Ok(Self {
            max_locals: code.max_locals as usize,
            params: descriptor.params,
            is_static: info.access & wrapgen_classfile::access::ACC_STATIC != 0,
            class: class.clone(),
            method,
            instructions,
            index,
        })
    }

    /// Method name
    pub fn method_name(&self) -> &str {
        &self.class.methods[self.method].name
    }
}

/// Executes loaded code, resolving names through `resolver`
pub struct Interpreter<'a> {
    resolver: &'a dyn ClassResolver,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter
    pub fn new(resolver: &'a dyn ClassResolver) -> Self {
        Self { resolver }
    }

    /// Run `code` with `receiver` in slot 0 (unless static) and `args` after it
    pub fn execute(&self, code: &LoadedCode, receiver: &Value, args: &[Value]) -> FaultResult<Value> {
        let mut locals = vec![Value::Null; code.max_locals.max(1)];
        let mut slot = 0usize;
        if !code.is_static {
            locals[0] = receiver.clone();
            slot = 1;
        }
        for (param, arg) in code.params.iter().zip(args) {
            if slot >= locals.len() {
                return Err(Fault::Execution(format!(
                    "{} declares {} locals but takes more arguments",
                    code.method_name(),
                    code.max_locals
                )));
            }
            locals[slot] = arg.clone();
            slot += param.slots() as usize;
        }

        let mut frame = Frame {
            code,
            locals,
            stack: Vec::new(),
        };
        let mut pc = 0usize;
        loop {
            let insn = code
                .instructions
                .get(pc)
                .ok_or_else(|| Fault::Execution(format!("{}: fell off the end", code.method_name())))?;
            match self.step(&mut frame, insn)? {
                Flow::Next => pc += 1,
                Flow::Jump(target) => {
                    pc = *code.index.get(&target).ok_or_else(|| {
                        Fault::Execution(format!("jump to {} is not an instruction", target))
                    })?;
                }
                Flow::Return(value) => return Ok(value),
            }
        }
    }

    fn step(&self, frame: &mut Frame<'_>, insn: &Instruction) -> FaultResult<Flow> {
        use Opcode::*;
        let pool = &frame.code.class.pool;
        match insn.opcode {
            Nop => {}
            AconstNull => frame.push(Value::Null),
            IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 => {
                frame.push(Value::Int(insn.opcode.to_u8() as i32 - Iconst0.to_u8() as i32));
            }
            Bipush => frame.push(Value::Int(insn.operands[0] as i8 as i32)),
            Sipush => frame.push(Value::Int(insn.u16_operand() as i16 as i32)),
            Ldc | LdcW => {
                let index = if insn.opcode == Ldc {
                    insn.operands[0] as u16
                } else {
                    insn.u16_operand()
                };
                let value = match pool.loadable_at(index).map_err(execution)? {
                    Loadable::Int(v) => Value::Int(v),
                    Loadable::Float(v) => Value::Float(v),
                    Loadable::Str(s) => Value::str(s),
                    Loadable::Class(name) => Value::str(&binary_name(name)),
                };
                frame.push(value);
            }
            Iload | Aload | Iload0 | Iload1 | Iload2 | Iload3 | Aload0 | Aload1 | Aload2 | Aload3 => {
                let slot = frame.slot(insn)?;
                let value = frame.locals[slot].clone();
                frame.push(value);
            }
            Istore | Astore | Istore0 | Istore1 | Istore2 | Istore3 | Astore0 | Astore1
            | Astore2 | Astore3 => {
                let slot = frame.slot(insn)?;
                frame.locals[slot] = frame.pop()?;
            }
            Pop => {
                frame.pop()?;
            }
            Pop2 => {
                frame.pop()?;
                frame.pop()?;
            }
            Dup => {
                let top = frame.peek()?.clone();
                frame.push(top);
            }
            Swap => {
                let a = frame.pop()?;
                let b = frame.pop()?;
                frame.push(a);
                frame.push(b);
            }
            Ifeq | Ifne => {
                let value = frame.pop()?;
                let int = value.as_int().ok_or_else(|| {
                    Fault::Execution(format!("{} on {}", insn.opcode.mnemonic(), value.kind_name()))
                })?;
                if (int == 0) == (insn.opcode == Ifeq) {
                    return Ok(Flow::Jump(insn.jump_target() as usize));
                }
            }
            Ifnull | Ifnonnull => {
                let value = frame.pop()?;
                if value.is_null() == (insn.opcode == Ifnull) {
                    return Ok(Flow::Jump(insn.jump_target() as usize));
                }
            }
            Goto => return Ok(Flow::Jump(insn.jump_target() as usize)),
            Ireturn | Areturn => return Ok(Flow::Return(frame.pop()?)),
            Return => return Ok(Flow::Return(Value::Null)),
            Getfield => {
                let field = pool.fieldref_at(insn.u16_operand()).map_err(execution)?;
                let target = frame.pop()?;
                let obj = target.as_object().ok_or_else(|| {
                    Fault::NullPointer(format!("getfield {} on {}", field.name, target.kind_name()))
                })?;
                let value = obj.get_field(field.name).ok_or_else(|| Fault::NoSuchField {
                    class: obj.class().name().to_string(),
                    name: field.name.to_string(),
                })?;
                frame.push(value);
            }
            Putfield => {
                let field = pool.fieldref_at(insn.u16_operand()).map_err(execution)?;
                let value = frame.pop()?;
                let target = frame.pop()?;
                let obj = target.as_object().ok_or_else(|| {
                    Fault::NullPointer(format!("putfield {} on {}", field.name, target.kind_name()))
                })?;
                if !obj.set_field(field.name, value) {
                    return Err(Fault::NoSuchField {
                        class: obj.class().name().to_string(),
                        name: field.name.to_string(),
                    });
                }
            }
            Invokevirtual | Invokespecial | Invokestatic | Invokeinterface => {
                self.invoke(frame, insn)?;
            }
            New => {
                let name = binary_name(pool.class_at(insn.u16_operand()).map_err(execution)?);
                let class = self.resolver.require(&name)?;
                let instance = self.resolver.allocate(&class)?;
                frame.push(instance);
            }
            Checkcast => {
                let target = type_operand(pool.class_at(insn.u16_operand()).map_err(execution)?);
                self.resolver.check_cast(frame.peek()?, &target)?;
            }
            Instanceof => {
                let target = type_operand(pool.class_at(insn.u16_operand()).map_err(execution)?);
                let value = frame.pop()?;
                let is = self.resolver.is_instance(&value, &target);
                frame.push(Value::Int(is as i32));
            }
            Athrow => {
                let exception = frame.pop()?;
                let obj = exception
                    .as_object()
                    .ok_or_else(|| Fault::NullPointer("athrow null".to_string()))?;
                let message = obj
                    .get_field("message")
                    .and_then(|m| m.as_str().map(str::to_string))
                    .unwrap_or_default();
                return Err(Fault::Thrown {
                    class: obj.class().name().to_string(),
                    message,
                });
            }
        }
        Ok(Flow::Next)
    }

    fn invoke(&self, frame: &mut Frame<'_>, insn: &Instruction) -> FaultResult<()> {
        let pool = &frame.code.class.pool;
        let member = pool.methodref_at(insn.u16_operand()).map_err(execution)?;
        let descriptor = MethodDescriptor::parse(member.descriptor).map_err(execution)?;
        let count = descriptor.params.len();
        if frame.stack.len() < count {
            return Err(Fault::Execution(format!("stack underflow calling {}", member.name)));
        }
        let args = frame.stack.split_off(frame.stack.len() - count);
        let owner = binary_name(member.owner);
        let no_such_method = |class: &str| Fault::NoSuchMethod {
            class: class.to_string(),
            name: member.name.to_string(),
            descriptor: member.descriptor.to_string(),
        };

        let result = match insn.opcode {
            Opcode::Invokestatic => {
                let class = self.resolver.require(&owner)?;
                let method = self
                    .resolver
                    .find_method(&class, member.name, member.descriptor)
                    .ok_or_else(|| no_such_method(&owner))?;
                method.invoke(self.resolver, &Value::Null, &args)?
            }
            Opcode::Invokespecial => {
                let receiver = frame.pop()?;
                let class = self.resolver.require(&owner)?;
                let method = self
                    .resolver
                    .find_method(&class, member.name, member.descriptor)
                    .ok_or_else(|| no_such_method(&owner))?;
                method.invoke(self.resolver, &receiver, &args)?
            }
            _ => {
                let receiver = frame.pop()?;
                let class = self.resolver.class_of(&receiver).ok_or_else(|| {
                    Fault::NullPointer(format!("invoking {}.{}", owner, member.name))
                })?;
                let method = self
                    .resolver
                    .find_method(&class, member.name, member.descriptor)
                    .ok_or_else(|| no_such_method(class.name()))?;
                method.invoke(self.resolver, &receiver, &args)?
            }
        };
        if descriptor.ret.is_some() {
            frame.push(result);
        }
        Ok(())
    }
}

struct Frame<'c> {
    code: &'c LoadedCode,
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame<'_> {
    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> FaultResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Fault::Execution("operand stack underflow".to_string()))
    }

    fn peek(&self) -> FaultResult<&Value> {
        self.stack
            .last()
            .ok_or_else(|| Fault::Execution("operand stack underflow".to_string()))
    }

    fn slot(&self, insn: &Instruction) -> FaultResult<usize> {
        let slot = insn
            .local_index()
            .map(usize::from)
            .ok_or_else(|| Fault::Execution(format!("{} has no local", insn.opcode.mnemonic())))?;
        if slot >= self.locals.len() {
            return Err(Fault::Execution(format!(
                "local {} out of range ({} locals)",
                slot,
                self.locals.len()
            )));
        }
        Ok(slot)
    }
}

enum Flow {
    Next,
    Jump(usize),
    Return(Value),
}

fn execution(e: impl std::fmt::Display) -> Fault {
    Fault::Execution(e.to_string())
}

/// Class operand of `checkcast`/`instanceof`: binary name, or the array
/// descriptor unchanged
fn type_operand(internal: &str) -> String {
    if internal.starts_with('[') {
        internal.to_string()
    } else {
        binary_name(internal)
    }
}
