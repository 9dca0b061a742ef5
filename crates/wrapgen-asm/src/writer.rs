//! Class writer and member visitors
//!
//! All visitors created from one class writer share its state behind a
//! mutex; the class is assembled from that state on `toByteArray`.

use crate::annotation::{materialize, AnnotationNode, AnnotationVisitorObj, NodeRef};
use crate::dialect::{Dialect, COMPUTE_MAXS};
use crate::values::{
    boolean, int, label, no_such_method, object, opt_string, opt_strings, string, type_handle,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::Arc;
use wrapgen_classfile::{
    ClassBuilder, ClassFileError, CodeBuilder, ConstantPool, Label, LdcConstant, Opcode,
};
use wrapgen_sdk::{
    NativeError, NativeIter, NativeMethod, NativeObject, NativeObjectRef, NativeResult,
    NativeValue,
};

#[derive(Debug, Default)]
struct MethodState {
    labels: FxHashMap<u64, Label>,
    annotations: Vec<NodeRef>,
}

#[derive(Debug, Default)]
struct WriterState {
    builder: Option<ClassBuilder>,
    class_annotations: Vec<NodeRef>,
    field_annotations: FxHashMap<usize, Vec<NodeRef>>,
    methods: Vec<MethodState>,
    visitors: Vec<NativeObjectRef>,
    ended: bool,
}

impl WriterState {
    fn builder(&mut self) -> NativeResult<&mut ClassBuilder> {
        if self.ended {
            return Err(NativeError::IllegalState("class writer already ended".into()));
        }
        self.builder
            .as_mut()
            .ok_or_else(|| NativeError::IllegalState("visit has not been called".into()))
    }

    fn code(&mut self, method: usize) -> NativeResult<(&mut CodeBuilder, &mut ConstantPool, &mut MethodState)> {
        if self.ended {
            return Err(NativeError::IllegalState("class writer already ended".into()));
        }
        let Self {
            builder, methods, ..
        } = self;
        let builder = builder
            .as_mut()
            .ok_or_else(|| NativeError::IllegalState("visit has not been called".into()))?;
        let (code, pool) = builder.code(method).map_err(failure)?;
        let state = methods
            .get_mut(method)
            .ok_or_else(|| NativeError::IllegalState(format!("no method {method}")))?;
        Ok((code, pool, state))
    }
}

fn failure(error: ClassFileError) -> NativeError {
    NativeError::target(NativeError::LibraryError(error.to_string()))
}

fn opcode(value: i32) -> NativeResult<Opcode> {
    u8::try_from(value)
        .ok()
        .and_then(Opcode::from_u8)
        .ok_or_else(|| NativeError::target(NativeError::ArgumentError(format!("unknown opcode {value}"))))
}

fn label_in(code: &mut CodeBuilder, state: &mut MethodState, id: u64) -> Label {
    *state.labels.entry(id).or_insert_with(|| code.new_label())
}

/// `ClassWriter`
#[derive(Debug)]
pub struct ClassWriterObj {
    dialect: Dialect,
    compute_maxs: bool,
    state: Arc<Mutex<WriterState>>,
}

impl ClassWriterObj {
    /// Modern constructor: `ClassWriter(int flags)`
    pub fn with_flags(flags: i32) -> Self {
        Self::new(Dialect::Modern, flags & COMPUTE_MAXS != 0 || flags & crate::dialect::COMPUTE_FRAMES != 0)
    }

    /// Legacy constructor: `ClassWriter(boolean computeMaxs)`
    pub fn with_compute_maxs(compute_maxs: bool) -> Self {
        Self::new(Dialect::Legacy, compute_maxs)
    }

    fn new(dialect: Dialect, compute_maxs: bool) -> Self {
        Self {
            dialect,
            compute_maxs,
            state: Arc::new(Mutex::new(WriterState::default())),
        }
    }

    fn to_byte_array(&self) -> NativeResult<Vec<u8>> {
        let state = self.state.lock();
        let mut builder = state
            .builder
            .clone()
            .ok_or_else(|| NativeError::IllegalState("visit has not been called".into()))?;
        builder
            .annotations_mut()
            .extend(state.class_annotations.iter().filter_map(materialize));
        for (field, nodes) in &state.field_annotations {
            if let Some(field) = builder.field_mut(*field) {
                field.annotations.extend(nodes.iter().filter_map(materialize));
            }
        }
        for (index, method) in state.methods.iter().enumerate() {
            if let Some(target) = builder.method_mut(index) {
                target
                    .annotations
                    .extend(method.annotations.iter().filter_map(materialize));
            }
        }
        let name = builder.name().to_string();
        let class = builder.build(self.compute_maxs).map_err(failure)?;
        let bytes = class.encode();
        tracing::trace!(class = %name, len = bytes.len(), "assembled class");
        Ok(bytes)
    }
}

impl NativeObject for ClassWriterObj {
    fn type_name(&self) -> &str {
        "ClassWriter"
    }

    fn methods(&self) -> &[NativeMethod] {
        self.dialect.class_writer_methods()
    }

    fn invoke(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        match method.name.as_str() {
            "visit" => {
                let version = int(&args, 0)?;
                let access = int(&args, 1)?;
                let name = string(&args, 2)?;
                let signature = opt_string(&args, 3)?;
                let super_name = opt_string(&args, 4)?;
                let interfaces = opt_strings(&args, 5)?;
                let mut builder = ClassBuilder::new(
                    (version & 0xFFFF) as u16,
                    access as u16,
                    &name,
                    super_name.as_deref(),
                    &interfaces,
                );
                builder.set_signature(signature.as_deref());
                let mut state = self.state.lock();
                if state.builder.is_some() {
                    return Err(NativeError::IllegalState("visit called twice".into()));
                }
                state.builder = Some(builder);
                Ok(NativeValue::Null)
            }
            "visitSource" => {
                if let Some(source) = opt_string(&args, 0)? {
                    self.state.lock().builder()?.set_source_file(&source);
                }
                Ok(NativeValue::Null)
            }
            "visitAnnotation" => {
                let descriptor = string(&args, 0)?;
                let visible = boolean(&args, 1)?;
                let node = AnnotationNode::root(&descriptor);
                if visible {
                    self.state.lock().class_annotations.push(node.clone());
                }
                Ok(object(AnnotationVisitorObj::new(self.dialect, node)))
            }
            "visitField" => {
                let access = int(&args, 0)?;
                let name = string(&args, 1)?;
                let descriptor = string(&args, 2)?;
                let signature = opt_string(&args, 3)?;
                let index = self.state.lock().builder()?.add_field(
                    access as u16,
                    &name,
                    &descriptor,
                    signature.as_deref(),
                );
                Ok(object(FieldVisitorObj {
                    dialect: self.dialect,
                    state: self.state.clone(),
                    field: index,
                }))
            }
            "visitMethod" => {
                let access = int(&args, 0)?;
                let name = string(&args, 1)?;
                let descriptor = string(&args, 2)?;
                let signature = opt_string(&args, 3)?;
                let exceptions = opt_strings(&args, 4)?;
                let mut state = self.state.lock();
                let index = state.builder()?.add_method(
                    access as u16,
                    &name,
                    &descriptor,
                    signature.as_deref(),
                    &exceptions,
                );
                state.methods.push(MethodState::default());
                let visitor: NativeObjectRef = Arc::new(MethodVisitorObj {
                    dialect: self.dialect,
                    state: self.state.clone(),
                    method: index,
                });
                state.visitors.push(visitor.clone());
                Ok(NativeValue::Object(visitor))
            }
            "visitEnd" => {
                self.state.lock().ended = true;
                Ok(NativeValue::Null)
            }
            "toByteArray" => Ok(NativeValue::Bytes(self.to_byte_array()?)),
            "methodVisitors" => {
                let visitors = self.state.lock().visitors.clone();
                Ok(NativeValue::Iter(NativeIter::new(
                    visitors.into_iter().map(NativeValue::Object),
                )))
            }
            _ => Err(no_such_method("ClassWriter", method)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `FieldVisitor`
#[derive(Debug)]
pub struct FieldVisitorObj {
    dialect: Dialect,
    state: Arc<Mutex<WriterState>>,
    field: usize,
}

impl NativeObject for FieldVisitorObj {
    fn type_name(&self) -> &str {
        "FieldVisitor"
    }

    fn methods(&self) -> &[NativeMethod] {
        self.dialect.field_visitor_methods()
    }

    fn invoke(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        match method.name.as_str() {
            "visitAnnotation" => {
                let descriptor = string(&args, 0)?;
                let visible = boolean(&args, 1)?;
                let node = AnnotationNode::root(&descriptor);
                if visible {
                    self.state
                        .lock()
                        .field_annotations
                        .entry(self.field)
                        .or_default()
                        .push(node.clone());
                }
                Ok(object(AnnotationVisitorObj::new(self.dialect, node)))
            }
            "visitEnd" => Ok(NativeValue::Null),
            _ => Err(no_such_method("FieldVisitor", method)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `MethodVisitor`
#[derive(Debug)]
pub struct MethodVisitorObj {
    dialect: Dialect,
    state: Arc<Mutex<WriterState>>,
    method: usize,
}

impl MethodVisitorObj {
    fn emit(
        &self,
        f: impl FnOnce(&mut CodeBuilder, &mut ConstantPool, &mut MethodState) -> Result<(), ClassFileError>,
    ) -> NativeResult<NativeValue> {
        let mut state = self.state.lock();
        let (code, pool, method) = state.code(self.method)?;
        f(code, pool, method).map_err(failure)?;
        Ok(NativeValue::Null)
    }

    fn ldc(&self, value: &NativeValue) -> NativeResult<NativeValue> {
        let constant = if let Some(ty) = type_handle(value) {
            LdcConstant::Class(ty.internal_name().to_string())
        } else {
            match value {
                NativeValue::Int(v) => LdcConstant::Int(*v),
                NativeValue::Str(v) => LdcConstant::Str(v.clone()),
                other => {
                    return Err(NativeError::TypeMismatch {
                        expected: "ldc constant".into(),
                        got: other.kind_name(),
                    })
                }
            }
        };
        self.emit(|code, pool, _| code.ldc(pool, &constant))
    }
}

impl NativeObject for MethodVisitorObj {
    fn type_name(&self) -> &str {
        "MethodVisitor"
    }

    fn methods(&self) -> &[NativeMethod] {
        self.dialect.method_visitor_methods()
    }

    fn invoke(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        match method.name.as_str() {
            "visitCode" => self.emit(|_, _, _| Ok(())),
            "visitInsn" => {
                let op = opcode(int(&args, 0)?)?;
                self.emit(|code, _, _| code.insn(op))
            }
            "visitIntInsn" => {
                let op = opcode(int(&args, 0)?)?;
                let operand = int(&args, 1)?;
                self.emit(|code, _, _| code.int_insn(op, operand))
            }
            "visitVarInsn" => {
                let op = opcode(int(&args, 0)?)?;
                let var = int(&args, 1)?;
                let var = u16::try_from(var).map_err(|_| {
                    NativeError::ArgumentError(format!("invalid local variable index {var}"))
                })?;
                self.emit(|code, _, _| code.var_insn(op, var))
            }
            "visitTypeInsn" => {
                let op = opcode(int(&args, 0)?)?;
                let ty = string(&args, 1)?;
                self.emit(|code, pool, _| code.type_insn(pool, op, &ty))
            }
            "visitFieldInsn" => {
                let op = opcode(int(&args, 0)?)?;
                let owner = string(&args, 1)?;
                let name = string(&args, 2)?;
                let descriptor = string(&args, 3)?;
                self.emit(|code, pool, _| code.field_insn(pool, op, &owner, &name, &descriptor))
            }
            "visitMethodInsn" => {
                let op = opcode(int(&args, 0)?)?;
                let owner = string(&args, 1)?;
                let name = string(&args, 2)?;
                let descriptor = string(&args, 3)?;
                let interface = if args.len() > 4 {
                    boolean(&args, 4)?
                } else {
                    op == Opcode::Invokeinterface
                };
                self.emit(|code, pool, _| {
                    code.method_insn(pool, op, &owner, &name, &descriptor, interface)
                })
            }
            "visitJumpInsn" => {
                let op = opcode(int(&args, 0)?)?;
                let id = label(&args, 1)?;
                self.emit(|code, _, method| {
                    let target = label_in(code, method, id);
                    code.jump_insn(op, target)
                })
            }
            "visitLabel" => {
                let id = label(&args, 0)?;
                self.emit(|code, _, method| {
                    let target = label_in(code, method, id);
                    code.mark(target)
                })
            }
            "visitLineNumber" => {
                let line = int(&args, 0)?;
                let id = label(&args, 1)?;
                self.emit(|code, _, method| {
                    let start = label_in(code, method, id);
                    code.line_number(line as u16, start);
                    Ok(())
                })
            }
            "visitLocalVariable" => {
                let name = string(&args, 0)?;
                let descriptor = string(&args, 1)?;
                let signature = opt_string(&args, 2)?;
                let start = label(&args, 3)?;
                let end = label(&args, 4)?;
                let index = int(&args, 5)?;
                self.emit(|code, _, method| {
                    let start = label_in(code, method, start);
                    let end = label_in(code, method, end);
                    code.local_variable(&name, &descriptor, signature.as_deref(), start, end, index as u16);
                    Ok(())
                })
            }
            "visitLdcInsn" => self.ldc(args.first().unwrap_or(&NativeValue::Null)),
            "visitMaxs" => {
                let max_stack = int(&args, 0)?;
                let max_locals = int(&args, 1)?;
                let mut state = self.state.lock();
                if let Some(method) = state.builder()?.method_mut(self.method) {
                    method.maxs = Some((max_stack as u16, max_locals as u16));
                }
                Ok(NativeValue::Null)
            }
            "visitAnnotation" => {
                let descriptor = string(&args, 0)?;
                let visible = boolean(&args, 1)?;
                let node = AnnotationNode::root(&descriptor);
                if visible {
                    let mut state = self.state.lock();
                    if let Some(method) = state.methods.get_mut(self.method) {
                        method.annotations.push(node.clone());
                    }
                }
                Ok(object(AnnotationVisitorObj::new(self.dialect, node)))
            }
            "visitEnd" => Ok(NativeValue::Null),
            _ => Err(no_such_method("MethodVisitor", method)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
