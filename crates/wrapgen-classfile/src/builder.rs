//! Class builder
//!
//! Assembles a `ClassFile` member by member. Method bodies are written
//! through a `CodeBuilder`, which resolves forward branches when the body is
//! finished and can compute `max_stack` / `max_locals` itself.

use crate::annotation::{encode_annotations, Annotation};
use crate::class::{Attribute, ClassFile, Code, FieldInfo, MethodInfo};
use crate::constants::ConstantPool;
use crate::descriptor::MethodDescriptor;
use crate::encoder::{ByteWriter, DecodeError};
use crate::opcode::{access, Opcode};
use crate::verify::{compute_max_stack, VerifyError};
use thiserror::Error;

/// Errors raised while assembling a class
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    /// Opcode used with the wrong emission method
    #[error("Opcode {opcode:#x} is not a {category} instruction")]
    InvalidInstruction {
        /// Raw opcode
        opcode: u8,
        /// Category the caller asked for
        category: &'static str,
    },

    /// Operand does not fit the instruction encoding
    #[error("Operand {value} out of range for {mnemonic}")]
    OperandOutOfRange {
        /// Instruction mnemonic
        mnemonic: &'static str,
        /// Offending operand
        value: i64,
    },

    /// Label marked twice
    #[error("Label {0} is already bound")]
    LabelRebound(u32),

    /// Branch or table entry refers to a label never marked
    #[error("Label {0} was never bound")]
    UnboundLabel(u32),

    /// Branch distance exceeds the 16-bit offset range
    #[error("Branch at offset {0} is out of range")]
    BranchOutOfRange(usize),

    /// Unknown method index
    #[error("No method at index {0}")]
    NoSuchMethod(usize),

    /// Verification failed while computing frame sizes
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// Malformed descriptor
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A branch target within one method body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    /// Numeric id of the label within its body
    pub fn id(self) -> u32 {
        self.0
    }
}

/// A constant loadable with `ldc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdcConstant {
    /// Integer
    Int(i32),
    /// String literal
    Str(String),
    /// Class literal, by internal name
    Class(String),
}

#[derive(Debug, Clone)]
struct Fixup {
    instr_offset: usize,
    operand_offset: usize,
    label: Label,
}

#[derive(Debug, Clone)]
struct LocalVariable {
    name: String,
    descriptor: String,
    signature: Option<String>,
    start: Label,
    end: Label,
    index: u16,
}

/// Instruction emitter for one method body
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    code: ByteWriter,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
    max_locals: u16,
    line_numbers: Vec<(Label, u16)>,
    local_variables: Vec<LocalVariable>,
}

impl CodeBuilder {
    /// Create an empty body
    pub fn new() -> Self {
        Self::default()
    }

    /// Current code length
    pub fn offset(&self) -> usize {
        self.code.offset()
    }

    /// Allocate a new unbound label
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Bind a label to the current offset
    pub fn mark(&mut self, label: Label) -> Result<(), ClassFileError> {
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .ok_or(ClassFileError::UnboundLabel(label.0))?;
        if slot.is_some() {
            return Err(ClassFileError::LabelRebound(label.0));
        }
        *slot = Some(self.code.offset());
        Ok(())
    }

    // ===== Instructions =====

    /// Emit an instruction without operands
    pub fn insn(&mut self, op: Opcode) -> Result<(), ClassFileError> {
        if op.operand_size() != 0 {
            return Err(invalid(op, "zero-operand"));
        }
        self.code.u8(op.to_u8());
        if let Some(index) = op.implicit_local() {
            self.touch_local(index);
        }
        Ok(())
    }

    /// Emit `bipush` / `sipush`
    pub fn int_insn(&mut self, op: Opcode, operand: i32) -> Result<(), ClassFileError> {
        match op {
            Opcode::Bipush => {
                let value = i8::try_from(operand).map_err(|_| out_of_range(op, operand))?;
                self.code.u8(op.to_u8());
                self.code.u8(value as u8);
            }
            Opcode::Sipush => {
                let value = i16::try_from(operand).map_err(|_| out_of_range(op, operand))?;
                self.code.u8(op.to_u8());
                self.code.i16(value);
            }
            _ => return Err(invalid(op, "int")),
        }
        Ok(())
    }

    /// Emit a local load or store, using the short form for slots 0 to 3
    pub fn var_insn(&mut self, op: Opcode, index: u16) -> Result<(), ClassFileError> {
        let short_base = match op {
            Opcode::Iload => Opcode::Iload0,
            Opcode::Aload => Opcode::Aload0,
            Opcode::Istore => Opcode::Istore0,
            Opcode::Astore => Opcode::Astore0,
            _ => return Err(invalid(op, "local variable")),
        };
        if index <= 3 {
            self.code.u8(short_base.to_u8() + index as u8);
        } else {
            let slot = u8::try_from(index).map_err(|_| out_of_range(op, index as i32))?;
            self.code.u8(op.to_u8());
            self.code.u8(slot);
        }
        self.touch_local(index);
        Ok(())
    }

    /// Emit `new`, `checkcast` or `instanceof`
    pub fn type_insn(
        &mut self,
        pool: &mut ConstantPool,
        op: Opcode,
        internal_name: &str,
    ) -> Result<(), ClassFileError> {
        if !matches!(op, Opcode::New | Opcode::Checkcast | Opcode::Instanceof) {
            return Err(invalid(op, "type"));
        }
        let index = pool.class(internal_name);
        self.code.u8(op.to_u8());
        self.code.u16(index);
        Ok(())
    }

    /// Emit `getfield` / `putfield`
    pub fn field_insn(
        &mut self,
        pool: &mut ConstantPool,
        op: Opcode,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<(), ClassFileError> {
        if !matches!(op, Opcode::Getfield | Opcode::Putfield) {
            return Err(invalid(op, "field"));
        }
        let index = pool.fieldref(owner, name, descriptor);
        self.code.u8(op.to_u8());
        self.code.u16(index);
        Ok(())
    }

    /// Emit one of the invoke instructions
    pub fn method_insn(
        &mut self,
        pool: &mut ConstantPool,
        op: Opcode,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<(), ClassFileError> {
        if !op.is_invoke() {
            return Err(invalid(op, "method"));
        }
        let interface = interface || op == Opcode::Invokeinterface;
        let index = pool.methodref(owner, name, descriptor, interface);
        self.code.u8(op.to_u8());
        self.code.u16(index);
        if op == Opcode::Invokeinterface {
            let desc = MethodDescriptor::parse(descriptor)?;
            self.code.u8((desc.param_slots() + 1) as u8);
            self.code.u8(0);
        }
        Ok(())
    }

    /// Emit a branch to `label`
    pub fn jump_insn(&mut self, op: Opcode, label: Label) -> Result<(), ClassFileError> {
        if !op.is_jump() {
            return Err(invalid(op, "jump"));
        }
        let instr_offset = self.code.offset();
        self.code.u8(op.to_u8());
        let operand_offset = self.code.offset();
        self.code.i16(0);
        self.fixups.push(Fixup {
            instr_offset,
            operand_offset,
            label,
        });
        Ok(())
    }

    /// Emit `ldc` or `ldc_w` depending on the pool index
    pub fn ldc(&mut self, pool: &mut ConstantPool, constant: &LdcConstant) -> Result<(), ClassFileError> {
        let index = match constant {
            LdcConstant::Int(value) => pool.integer(*value),
            LdcConstant::Str(value) => pool.string(value),
            LdcConstant::Class(name) => pool.class(name),
        };
        if let Ok(short) = u8::try_from(index) {
            self.code.u8(Opcode::Ldc.to_u8());
            self.code.u8(short);
        } else {
            self.code.u8(Opcode::LdcW.to_u8());
            self.code.u16(index);
        }
        Ok(())
    }

    // ===== Debug information =====

    /// Record a source line starting at `label`
    pub fn line_number(&mut self, line: u16, label: Label) {
        self.line_numbers.push((label, line));
    }

    /// Record a local variable live between two labels
    pub fn local_variable(
        &mut self,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        start: Label,
        end: Label,
        index: u16,
    ) {
        self.local_variables.push(LocalVariable {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            start,
            end,
            index,
        });
    }

    fn touch_local(&mut self, index: u16) {
        self.max_locals = self.max_locals.max(index + 1);
    }

    fn label_offset(&self, label: Label) -> Result<usize, ClassFileError> {
        self.labels
            .get(label.0 as usize)
            .copied()
            .flatten()
            .ok_or(ClassFileError::UnboundLabel(label.0))
    }

    /// Resolve branches and produce the `Code` attribute
    ///
    /// `maxs` carries caller-supplied frame sizes; when `None` they are
    /// computed from the instructions and the method descriptor.
    pub fn finish(
        mut self,
        pool: &mut ConstantPool,
        descriptor: &str,
        is_static: bool,
        maxs: Option<(u16, u16)>,
    ) -> Result<Code, ClassFileError> {
        for fixup in std::mem::take(&mut self.fixups) {
            let target = self.label_offset(fixup.label)?;
            let delta = target as i64 - fixup.instr_offset as i64;
            let delta =
                i16::try_from(delta).map_err(|_| ClassFileError::BranchOutOfRange(fixup.instr_offset))?;
            self.code.patch_i16(fixup.operand_offset, delta);
        }

        let (max_stack, max_locals) = match maxs {
            Some(maxs) => maxs,
            None => {
                let receiver = if is_static { 0 } else { 1 };
                let params = MethodDescriptor::parse(descriptor)?.param_slots() + receiver;
                let stack = compute_max_stack(self.code.buffer(), pool)?;
                (stack, self.max_locals.max(params))
            }
        };

        let mut attributes = Vec::new();
        if !self.line_numbers.is_empty() {
            let mut writer = ByteWriter::new();
            writer.u16(self.line_numbers.len() as u16);
            for (label, line) in &self.line_numbers {
                writer.u16(self.label_offset(*label)? as u16);
                writer.u16(*line);
            }
            attributes.push(Attribute {
                name: "LineNumberTable".into(),
                data: writer.into_bytes(),
            });
        }
        if !self.local_variables.is_empty() {
            let mut table = ByteWriter::new();
            let mut types = ByteWriter::new();
            let mut typed = 0u16;
            table.u16(self.local_variables.len() as u16);
            for var in &self.local_variables {
                let start = self.label_offset(var.start)?;
                let end = self.label_offset(var.end)?;
                let length = end.saturating_sub(start) as u16;
                table.u16(start as u16);
                table.u16(length);
                table.u16(pool.utf8(&var.name));
                table.u16(pool.utf8(&var.descriptor));
                table.u16(var.index);
                if let Some(signature) = &var.signature {
                    typed += 1;
                    types.u16(start as u16);
                    types.u16(length);
                    types.u16(pool.utf8(&var.name));
                    types.u16(pool.utf8(signature));
                    types.u16(var.index);
                }
            }
            attributes.push(Attribute {
                name: "LocalVariableTable".into(),
                data: table.into_bytes(),
            });
            if typed > 0 {
                let mut data = ByteWriter::new();
                data.u16(typed);
                data.bytes(types.buffer());
                attributes.push(Attribute {
                    name: "LocalVariableTypeTable".into(),
                    data: data.into_bytes(),
                });
            }
        }

        Ok(Code {
            max_stack,
            max_locals,
            code: self.code.into_bytes(),
            attributes,
        })
    }
}

fn invalid(op: Opcode, category: &'static str) -> ClassFileError {
    ClassFileError::InvalidInstruction {
        opcode: op.to_u8(),
        category,
    }
}

fn out_of_range(op: Opcode, value: i32) -> ClassFileError {
    ClassFileError::OperandOutOfRange {
        mnemonic: op.mnemonic(),
        value: value as i64,
    }
}

/// A field under construction
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    /// Access flags
    pub access: u16,
    /// Name
    pub name: String,
    /// Descriptor
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Runtime-visible annotations
    pub annotations: Vec<Annotation>,
}

/// A method under construction
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    /// Access flags
    pub access: u16,
    /// Name
    pub name: String,
    /// Descriptor
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Declared exceptions, by internal name
    pub exceptions: Vec<String>,
    /// Runtime-visible annotations
    pub annotations: Vec<Annotation>,
    /// Caller-supplied frame sizes
    pub maxs: Option<(u16, u16)>,
    code: Option<CodeBuilder>,
}

/// Builder for a whole class
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    major_version: u16,
    access: u16,
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    signature: Option<String>,
    source_file: Option<String>,
    pool: ConstantPool,
    fields: Vec<FieldBuilder>,
    methods: Vec<MethodBuilder>,
    annotations: Vec<Annotation>,
}

impl ClassBuilder {
    /// Start a class
    pub fn new(
        major_version: u16,
        access: u16,
        name: &str,
        super_name: Option<&str>,
        interfaces: &[String],
    ) -> Self {
        Self {
            major_version,
            access,
            name: name.to_string(),
            super_name: super_name.map(str::to_string),
            interfaces: interfaces.to_vec(),
            signature: None,
            source_file: None,
            pool: ConstantPool::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Internal name of the class being built
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the class generic signature
    pub fn set_signature(&mut self, signature: Option<&str>) {
        self.signature = signature.map(str::to_string);
    }

    /// Set the `SourceFile` attribute
    pub fn set_source_file(&mut self, source: &str) {
        self.source_file = Some(source.to_string());
    }

    /// Class annotations
    pub fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
        &mut self.annotations
    }

    /// Add a field, returning its index
    pub fn add_field(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
    ) -> usize {
        self.fields.push(FieldBuilder {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            annotations: Vec::new(),
        });
        self.fields.len() - 1
    }

    /// Borrow a field
    pub fn field_mut(&mut self, index: usize) -> Option<&mut FieldBuilder> {
        self.fields.get_mut(index)
    }

    /// Add a method, returning its index
    pub fn add_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
    ) -> usize {
        self.methods.push(MethodBuilder {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            exceptions: exceptions.to_vec(),
            annotations: Vec::new(),
            maxs: None,
            code: None,
        });
        self.methods.len() - 1
    }

    /// Borrow a method
    pub fn method_mut(&mut self, index: usize) -> Option<&mut MethodBuilder> {
        self.methods.get_mut(index)
    }

    /// Borrow a method body together with the pool, creating the body on first use
    pub fn code(
        &mut self,
        method: usize,
    ) -> Result<(&mut CodeBuilder, &mut ConstantPool), ClassFileError> {
        let Self { pool, methods, .. } = self;
        let method = methods
            .get_mut(method)
            .ok_or(ClassFileError::NoSuchMethod(method))?;
        Ok((method.code.get_or_insert_with(CodeBuilder::new), pool))
    }

    /// Assemble the class
    ///
    /// With `compute_maxs` set, caller-supplied frame sizes are ignored.
    pub fn build(self, compute_maxs: bool) -> Result<ClassFile, ClassFileError> {
        let mut pool = self.pool;

        let fields = self
            .fields
            .into_iter()
            .map(|field| {
                let mut attributes = Vec::new();
                push_signature(&mut pool, &mut attributes, field.signature.as_deref());
                push_annotations(&mut pool, &mut attributes, &field.annotations);
                FieldInfo {
                    access: field.access,
                    name: field.name,
                    descriptor: field.descriptor,
                    attributes,
                }
            })
            .collect();

        let mut methods = Vec::with_capacity(self.methods.len());
        for method in self.methods {
            let is_static = method.access & access::ACC_STATIC != 0;
            let maxs = if compute_maxs { None } else { method.maxs };
            let code = match method.code {
                Some(code) => Some(code.finish(&mut pool, &method.descriptor, is_static, maxs)?),
                None => None,
            };
            let mut attributes = Vec::new();
            if !method.exceptions.is_empty() {
                let mut writer = ByteWriter::new();
                writer.u16(method.exceptions.len() as u16);
                for exception in &method.exceptions {
                    writer.u16(pool.class(exception));
                }
                attributes.push(Attribute {
                    name: "Exceptions".into(),
                    data: writer.into_bytes(),
                });
            }
            push_signature(&mut pool, &mut attributes, method.signature.as_deref());
            push_annotations(&mut pool, &mut attributes, &method.annotations);
            methods.push(MethodInfo {
                access: method.access,
                name: method.name,
                descriptor: method.descriptor,
                code,
                attributes,
            });
        }

        let mut attributes = Vec::new();
        if let Some(source) = &self.source_file {
            let mut writer = ByteWriter::new();
            writer.u16(pool.utf8(source));
            attributes.push(Attribute {
                name: "SourceFile".into(),
                data: writer.into_bytes(),
            });
        }
        push_signature(&mut pool, &mut attributes, self.signature.as_deref());
        push_annotations(&mut pool, &mut attributes, &self.annotations);

        Ok(ClassFile {
            minor_version: 0,
            major_version: self.major_version,
            pool,
            access: self.access,
            this_class: self.name,
            super_class: self.super_name,
            interfaces: self.interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

fn push_signature(pool: &mut ConstantPool, attributes: &mut Vec<Attribute>, signature: Option<&str>) {
    if let Some(signature) = signature {
        let mut writer = ByteWriter::new();
        writer.u16(pool.utf8(signature));
        attributes.push(Attribute {
            name: "Signature".into(),
            data: writer.into_bytes(),
        });
    }
}

fn push_annotations(pool: &mut ConstantPool, attributes: &mut Vec<Attribute>, annotations: &[Annotation]) {
    if !annotations.is_empty() {
        attributes.push(Attribute {
            name: "RuntimeVisibleAnnotations".into(),
            data: encode_annotations(pool, annotations),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::version;
    use crate::verify::verify_class;

    #[test]
    fn test_forward_branch_patched() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuilder::new();
        let skip = code.new_label();
        code.var_insn(Opcode::Aload, 1).unwrap();
        code.jump_insn(Opcode::Ifnull, skip).unwrap();
        code.mark(skip).unwrap();
        code.insn(Opcode::Return).unwrap();
        let body = code.finish(&mut pool, "(Ljava/lang/Object;)V", false, None).unwrap();

        // aload_1; ifnull +3; return
        assert_eq!(body.code, vec![0x2b, 0xc6, 0x00, 0x03, 0xb1]);
        assert_eq!(body.max_stack, 1);
        assert_eq!(body.max_locals, 2);
    }

    #[test]
    fn test_unbound_label() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuilder::new();
        let label = code.new_label();
        code.jump_insn(Opcode::Goto, label).unwrap();
        assert_eq!(
            code.finish(&mut pool, "()V", true, None).unwrap_err(),
            ClassFileError::UnboundLabel(0)
        );
    }

    #[test]
    fn test_wrong_category() {
        let mut code = CodeBuilder::new();
        assert!(code.var_insn(Opcode::Dup, 0).is_err());
        assert!(code.int_insn(Opcode::Bipush, 300).is_err());
        assert!(code.insn(Opcode::Sipush).is_err());
    }

    #[test]
    fn test_build_verifies() {
        let mut class = ClassBuilder::new(
            version::V1_5,
            access::ACC_PUBLIC | access::ACC_SUPER,
            "pkg/Built",
            Some("java/lang/Object"),
            &[],
        );
        class.set_source_file("Built.java");
        let ctor = class.add_method(access::ACC_PUBLIC, "<init>", "()V", None, &[]);
        {
            let (code, pool) = class.code(ctor).unwrap();
            code.var_insn(Opcode::Aload, 0).unwrap();
            code.method_insn(pool, Opcode::Invokespecial, "java/lang/Object", "<init>", "()V", false)
                .unwrap();
            code.insn(Opcode::Return).unwrap();
        }
        let size = class.add_method(access::ACC_PUBLIC, "size", "(Ljava/util/List;)I", None, &[]);
        {
            let (code, pool) = class.code(size).unwrap();
            code.var_insn(Opcode::Aload, 1).unwrap();
            code.method_insn(pool, Opcode::Invokeinterface, "java/util/List", "size", "()I", true)
                .unwrap();
            code.insn(Opcode::Ireturn).unwrap();
        }

        let built = class.build(true).unwrap();
        verify_class(&built).unwrap();
        let decoded = ClassFile::decode(&built.encode()).unwrap();
        assert_eq!(decoded.methods.len(), 2);
        assert!(decoded.attribute("SourceFile").is_some());
        assert_eq!(decoded.method("size", "(Ljava/util/List;)I").unwrap().code.as_ref().unwrap().max_locals, 2);
    }
}
