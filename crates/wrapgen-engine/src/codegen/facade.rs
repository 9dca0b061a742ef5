//! Provider-agnostic emission facade
//!
//! Typed wrappers over [`Proxy`] objects. Opcodes are passed symbolically
//! and translated through the provider's [`OpcodeTable`]; callers never see
//! library types or numeric encodings.

use super::adapter::{
    Arg, CallSpec, FacadeKind, ParamKind, ParamSpec, Proxy, ReturnSpec,
};
use super::discovery::CapabilityProvider;
use super::opcodes::{Op, OpcodeTable};
use crate::descriptor;
use crate::error::{CodeGenError, CodeGenResult};
use crate::types::JType;
use std::sync::Arc;
use wrapgen_sdk::{NativeMethod, NativeValue, ParamType};

/// Call descriptors for every facade member
mod calls {
    use super::*;

    const INT: ParamSpec = ParamSpec::required(ParamKind::Int);
    const BOOL: ParamSpec = ParamSpec::required(ParamKind::Bool);
    const STR: ParamSpec = ParamSpec::required(ParamKind::Str);
    const STRS: ParamSpec = ParamSpec::required(ParamKind::StrArray);
    const ANY: ParamSpec = ParamSpec::required(ParamKind::Any);
    const LABEL: ParamSpec = ParamSpec::required(ParamKind::Facade(FacadeKind::Label));

    const fn plain(name: &'static str, params: &'static [ParamSpec]) -> CallSpec {
        CallSpec {
            name,
            params,
            returns: ReturnSpec::Plain,
        }
    }

    const fn wrap(name: &'static str, params: &'static [ParamSpec], kind: FacadeKind) -> CallSpec {
        CallSpec {
            name,
            params,
            returns: ReturnSpec::Wrap(kind),
        }
    }

    // ClassWriter
    pub const VISIT: CallSpec = plain("visit", &[INT, INT, STR, STR, STR, STRS]);
    pub const VISIT_SOURCE: CallSpec = plain("visitSource", &[STR, STR]);
    pub const VISIT_FIELD: CallSpec =
        wrap("visitField", &[INT, STR, STR, STR, ANY], FacadeKind::FieldVisitor);
    pub const VISIT_METHOD: CallSpec =
        wrap("visitMethod", &[INT, STR, STR, STR, STRS], FacadeKind::MethodVisitor);
    pub const TO_BYTE_ARRAY: CallSpec = plain("toByteArray", &[]);
    pub const METHOD_VISITORS: CallSpec = CallSpec {
        name: "methodVisitors",
        params: &[],
        returns: ReturnSpec::WrapIter(FacadeKind::MethodVisitor),
    };

    // Shared by every visitor
    pub const VISIT_ANNOTATION: CallSpec =
        wrap("visitAnnotation", &[STR, BOOL], FacadeKind::AnnotationVisitor);
    pub const VISIT_END: CallSpec = plain("visitEnd", &[]);

    // MethodVisitor
    pub const VISIT_CODE: CallSpec = plain("visitCode", &[]);
    pub const VISIT_INSN: CallSpec = plain("visitInsn", &[INT]);
    pub const VISIT_INT_INSN: CallSpec = plain("visitIntInsn", &[INT, INT]);
    pub const VISIT_VAR_INSN: CallSpec = plain("visitVarInsn", &[INT, INT]);
    pub const VISIT_TYPE_INSN: CallSpec = plain("visitTypeInsn", &[INT, STR]);
    pub const VISIT_FIELD_INSN: CallSpec = plain("visitFieldInsn", &[INT, STR, STR, STR]);
    pub const VISIT_METHOD_INSN: CallSpec = plain(
        "visitMethodInsn",
        &[INT, STR, STR, STR, ParamSpec::optional(ParamKind::Bool)],
    );
    pub const VISIT_JUMP_INSN: CallSpec = plain("visitJumpInsn", &[INT, LABEL]);
    pub const VISIT_LDC_INSN: CallSpec = plain("visitLdcInsn", &[ANY]);
    pub const VISIT_LABEL: CallSpec = plain("visitLabel", &[LABEL]);
    pub const VISIT_LINE_NUMBER: CallSpec = plain("visitLineNumber", &[INT, LABEL]);
    pub const VISIT_LOCAL_VARIABLE: CallSpec =
        plain("visitLocalVariable", &[STR, STR, STR, LABEL, LABEL, INT]);
    pub const VISIT_MAXS: CallSpec = plain("visitMaxs", &[INT, INT]);

    // AnnotationVisitor
    pub const ANNOTATION_VISIT: CallSpec = plain("visit", &[STR, ANY]);
    pub const VISIT_ENUM: CallSpec = plain("visitEnum", &[STR, STR, STR]);
    pub const VISIT_NESTED: CallSpec =
        wrap("visitAnnotation", &[STR, STR], FacadeKind::AnnotationVisitor);
    pub const VISIT_ARRAY: CallSpec = wrap("visitArray", &[STR], FacadeKind::AnnotationVisitor);

    // Type
    pub const GET_OPCODE: CallSpec = plain("getOpcode", &[INT]);
    pub const GET_DESCRIPTOR: CallSpec = plain("getDescriptor", &[]);
    pub const GET_INTERNAL_NAME: CallSpec = plain("getInternalName", &[]);
}

// ===== Emitter =====

/// Entry point to the facade for one provider
#[derive(Debug, Clone)]
pub struct Emitter {
    provider: Arc<CapabilityProvider>,
}

impl Emitter {
    /// Emitter for `provider`; fails when no library was discovered
    pub fn new(provider: Arc<CapabilityProvider>) -> CodeGenResult<Self> {
        provider.library()?;
        Ok(Self { provider })
    }

    /// Identity of the library behind this emitter
    pub fn identity(&self) -> &str {
        self.provider.identity()
    }

    /// Opcode table of the provider
    pub fn opcodes(&self) -> CodeGenResult<&OpcodeTable> {
        self.provider.opcodes()
    }

    /// Native value of a symbolic opcode
    pub fn opcode(&self, op: Op) -> CodeGenResult<i32> {
        self.opcodes()?.get(op)
    }

    /// Descriptor of a semantic type
    pub fn descriptor(&self, ty: &JType) -> CodeGenResult<String> {
        Ok(descriptor::encode(ty)?)
    }

    /// A class writer computing max stack and locals
    pub fn create_class_writer(&self) -> CodeGenResult<ClassWriter> {
        let library = self.provider.library()?;
        let ty = library
            .resolve_type("ClassWriter")
            .ok_or_else(|| self.incompatible("no ClassWriter type"))?;

        let int_ctor = NativeMethod::new("<init>", vec![ParamType::Int]);
        let bool_ctor = NativeMethod::new("<init>", vec![ParamType::Bool]);
        let ctors = ty.constructors();
        let (ctor, arg) = if ctors.contains(&int_ctor) {
            let flag = |name: &str| ty.static_field(name).and_then(|v| v.as_int());
            let flags = match (flag("COMPUTE_MAXS"), flag("COMPUTE_FRAMES")) {
                (Some(maxs), frames) => maxs | frames.unwrap_or(0),
                (None, _) => return Err(self.incompatible("no COMPUTE_MAXS constant")),
            };
            (int_ctor, NativeValue::Int(flags))
        } else if ctors.contains(&bool_ctor) {
            (bool_ctor, NativeValue::Bool(true))
        } else {
            return Err(self.incompatible("no usable ClassWriter constructor"));
        };

        let writer = ty
            .construct(&ctor, vec![arg])
            .map_err(|e| CodeGenError::Adapter(e.root_cause().into()))?;
        let proxy = self.provider.binder().bind(FacadeKind::ClassWriter, writer)?;
        Ok(ClassWriter {
            inner: self.wrap(proxy),
        })
    }

    /// A fresh branch label
    pub fn create_label(&self) -> CodeGenResult<Label> {
        let library = self.provider.library()?;
        let ty = library
            .resolve_type("Label")
            .ok_or_else(|| self.incompatible("no Label type"))?;
        let label = ty
            .construct(&NativeMethod::new("<init>", vec![]), vec![])
            .map_err(|e| CodeGenError::Adapter(e.root_cause().into()))?;
        Ok(Label {
            proxy: self.provider.binder().bind(FacadeKind::Label, label)?,
        })
    }

    /// Type handle for a descriptor
    pub fn get_type(&self, descriptor: &str) -> CodeGenResult<AsmType> {
        let library = self.provider.library()?;
        let ty = library
            .resolve_type("Type")
            .ok_or_else(|| self.incompatible("no Type type"))?;
        let get_type = NativeMethod::new("getType", vec![ParamType::Str]);
        if !ty.static_methods().contains(&get_type) {
            return Err(self.incompatible("no Type.getType(String)"));
        }
        let handle = ty
            .invoke_static(&get_type, vec![NativeValue::from(descriptor)])
            .map_err(|e| CodeGenError::Adapter(e.root_cause().into()))?;
        let handle = handle
            .as_object()
            .cloned()
            .ok_or_else(|| self.incompatible("Type.getType returned no object"))?;
        Ok(AsmType {
            inner: self.wrap(self.provider.binder().bind(FacadeKind::Type, handle)?),
        })
    }

    fn wrap(&self, proxy: Proxy) -> Bound {
        Bound {
            proxy,
            provider: self.provider.clone(),
        }
    }

    fn incompatible(&self, reason: &str) -> CodeGenError {
        CodeGenError::IncompatibleProvider {
            identity: self.provider.identity().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A proxy plus the provider whose opcode table it uses
#[derive(Debug, Clone)]
struct Bound {
    proxy: Proxy,
    provider: Arc<CapabilityProvider>,
}

impl Bound {
    fn op(&self, op: Op) -> CodeGenResult<Arg> {
        Ok(Arg::from(self.provider.opcodes()?.get(op)?))
    }

    fn call(&self, spec: &CallSpec, args: Vec<Arg>) -> CodeGenResult<NativeValue> {
        Ok(self.proxy.call(spec, args)?.into_value())
    }

    fn rewrap(&self, proxy: Proxy) -> Bound {
        Bound {
            proxy,
            provider: self.provider.clone(),
        }
    }

    fn call_wrapped(&self, spec: &CallSpec, args: Vec<Arg>) -> CodeGenResult<Bound> {
        let proxy = self.proxy.call(spec, args)?.into_proxy(spec.name)?;
        Ok(self.rewrap(proxy))
    }

    fn string(&self, spec: &CallSpec) -> CodeGenResult<String> {
        match self.call(spec, vec![])? {
            NativeValue::Str(s) => Ok(s),
            other => Err(unexpected(spec, "String", &other)),
        }
    }
}

fn unexpected(spec: &CallSpec, expected: &str, found: &NativeValue) -> CodeGenError {
    CodeGenError::Adapter(super::adapter::AdapterError::UnexpectedReturn {
        call: spec.name,
        expected: expected.to_string(),
        found: found.kind_name(),
    })
}

// ===== Class writer =====

/// Facade over a library class writer
#[derive(Debug, Clone)]
pub struct ClassWriter {
    inner: Bound,
}

impl ClassWriter {
    /// Begin the class
    pub fn visit(
        &self,
        version: Op,
        access: &[Op],
        name: &str,
        signature: Option<&str>,
        super_name: &str,
        interfaces: &[String],
    ) -> CodeGenResult<()> {
        let access = access_flags(self.inner.provider.opcodes()?, access)?;
        self.inner.call(
            &calls::VISIT,
            vec![
                self.inner.op(version)?,
                access.into(),
                name.into(),
                signature.into(),
                super_name.into(),
                interfaces.to_vec().into(),
            ],
        )?;
        Ok(())
    }

    /// Record the source file name
    pub fn visit_source(&self, source: &str, debug: Option<&str>) -> CodeGenResult<()> {
        self.inner
            .call(&calls::VISIT_SOURCE, vec![source.into(), debug.into()])?;
        Ok(())
    }

    /// Add a class annotation
    pub fn visit_annotation(&self, descriptor: &str, visible: bool) -> CodeGenResult<AnnotationVisitor> {
        Ok(AnnotationVisitor {
            inner: self.inner.call_wrapped(
                &calls::VISIT_ANNOTATION,
                vec![descriptor.into(), visible.into()],
            )?,
        })
    }

    /// Add a field
    pub fn visit_field(
        &self,
        access: &[Op],
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
    ) -> CodeGenResult<FieldVisitor> {
        let access = access_flags(self.inner.provider.opcodes()?, access)?;
        Ok(FieldVisitor {
            inner: self.inner.call_wrapped(
                &calls::VISIT_FIELD,
                vec![
                    access.into(),
                    name.into(),
                    descriptor.into(),
                    signature.into(),
                    NativeValue::Null.into(),
                ],
            )?,
        })
    }

    /// Add a method
    pub fn visit_method(
        &self,
        access: &[Op],
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
    ) -> CodeGenResult<MethodVisitor> {
        let access = access_flags(self.inner.provider.opcodes()?, access)?;
        Ok(MethodVisitor {
            inner: self.inner.call_wrapped(
                &calls::VISIT_METHOD,
                vec![
                    access.into(),
                    name.into(),
                    descriptor.into(),
                    signature.into(),
                    exceptions.to_vec().into(),
                ],
            )?,
        })
    }

    /// Finish the class
    pub fn visit_end(&self) -> CodeGenResult<()> {
        self.inner.call(&calls::VISIT_END, vec![])?;
        Ok(())
    }

    /// Assemble the class file
    pub fn to_byte_array(&self) -> CodeGenResult<Vec<u8>> {
        match self.inner.call(&calls::TO_BYTE_ARRAY, vec![])? {
            NativeValue::Bytes(bytes) => Ok(bytes),
            other => Err(unexpected(&calls::TO_BYTE_ARRAY, "byte[]", &other)),
        }
    }

    /// Method visitors created so far, re-proxied as they are drained
    pub fn method_visitors(&self) -> CodeGenResult<impl Iterator<Item = CodeGenResult<MethodVisitor>>> {
        let iter = self
            .inner
            .proxy
            .call(&calls::METHOD_VISITORS, vec![])?
            .into_proxy_iter(calls::METHOD_VISITORS.name)?;
        let inner = self.inner.clone();
        Ok(iter.map(move |proxy| {
            Ok(MethodVisitor {
                inner: inner.rewrap(proxy?),
            })
        }))
    }
}

fn access_flags(table: &OpcodeTable, flags: &[Op]) -> CodeGenResult<i32> {
    flags
        .iter()
        .try_fold(0, |acc, flag| Ok(acc | table.get(*flag)?))
}

// ===== Member visitors =====

/// Facade over a library field visitor
#[derive(Debug, Clone)]
pub struct FieldVisitor {
    inner: Bound,
}

impl FieldVisitor {
    /// Add a field annotation
    pub fn visit_annotation(&self, descriptor: &str, visible: bool) -> CodeGenResult<AnnotationVisitor> {
        Ok(AnnotationVisitor {
            inner: self.inner.call_wrapped(
                &calls::VISIT_ANNOTATION,
                vec![descriptor.into(), visible.into()],
            )?,
        })
    }

    /// Finish the field
    pub fn visit_end(&self) -> CodeGenResult<()> {
        self.inner.call(&calls::VISIT_END, vec![])?;
        Ok(())
    }
}

/// Constant operand of `visitLdcInsn`
#[derive(Debug, Clone)]
pub enum LdcValue {
    /// Integer constant
    Int(i32),
    /// String constant
    Str(String),
    /// Class constant
    Type(AsmType),
}

/// Facade over a library method visitor
#[derive(Debug, Clone)]
pub struct MethodVisitor {
    inner: Bound,
}

impl MethodVisitor {
    /// Start the code attribute
    pub fn visit_code(&self) -> CodeGenResult<()> {
        self.inner.call(&calls::VISIT_CODE, vec![])?;
        Ok(())
    }

    /// Zero-operand instruction
    pub fn visit_insn(&self, op: Op) -> CodeGenResult<()> {
        self.inner.call(&calls::VISIT_INSN, vec![self.inner.op(op)?])?;
        Ok(())
    }

    /// `BIPUSH`/`SIPUSH`
    pub fn visit_int_insn(&self, op: Op, operand: i32) -> CodeGenResult<()> {
        self.inner
            .call(&calls::VISIT_INT_INSN, vec![self.inner.op(op)?, operand.into()])?;
        Ok(())
    }

    /// Local variable load or store
    pub fn visit_var_insn(&self, op: Op, var: u16) -> CodeGenResult<()> {
        self.inner.call(
            &calls::VISIT_VAR_INSN,
            vec![self.inner.op(op)?, i32::from(var).into()],
        )?;
        Ok(())
    }

    /// `NEW`, `CHECKCAST` or `INSTANCEOF` on an internal name or array descriptor
    pub fn visit_type_insn(&self, op: Op, ty: &str) -> CodeGenResult<()> {
        self.inner
            .call(&calls::VISIT_TYPE_INSN, vec![self.inner.op(op)?, ty.into()])?;
        Ok(())
    }

    /// Field access
    pub fn visit_field_insn(&self, op: Op, owner: &str, name: &str, descriptor: &str) -> CodeGenResult<()> {
        self.inner.call(
            &calls::VISIT_FIELD_INSN,
            vec![self.inner.op(op)?, owner.into(), name.into(), descriptor.into()],
        )?;
        Ok(())
    }

    /// Method invocation; `interface` is dropped by libraries that predate it
    pub fn visit_method_insn(
        &self,
        op: Op,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> CodeGenResult<()> {
        self.inner.call(
            &calls::VISIT_METHOD_INSN,
            vec![
                self.inner.op(op)?,
                owner.into(),
                name.into(),
                descriptor.into(),
                interface.into(),
            ],
        )?;
        Ok(())
    }

    /// Conditional or unconditional branch
    pub fn visit_jump_insn(&self, op: Op, label: &Label) -> CodeGenResult<()> {
        self.inner.call(
            &calls::VISIT_JUMP_INSN,
            vec![self.inner.op(op)?, (&label.proxy).into()],
        )?;
        Ok(())
    }

    /// Load a constant
    pub fn visit_ldc_insn(&self, value: LdcValue) -> CodeGenResult<()> {
        let arg = match value {
            LdcValue::Int(v) => Arg::from(v),
            LdcValue::Str(s) => Arg::from(s.as_str()),
            LdcValue::Type(ty) => Arg::from(&ty.inner.proxy),
        };
        self.inner.call(&calls::VISIT_LDC_INSN, vec![arg])?;
        Ok(())
    }

    /// Bind `label` to the current position
    pub fn visit_label(&self, label: &Label) -> CodeGenResult<()> {
        self.inner
            .call(&calls::VISIT_LABEL, vec![(&label.proxy).into()])?;
        Ok(())
    }

    /// Source line starting at `start`
    pub fn visit_line_number(&self, line: i32, start: &Label) -> CodeGenResult<()> {
        self.inner
            .call(&calls::VISIT_LINE_NUMBER, vec![line.into(), (&start.proxy).into()])?;
        Ok(())
    }

    /// Debug entry for a local variable
    pub fn visit_local_variable(
        &self,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        start: &Label,
        end: &Label,
        index: u16,
    ) -> CodeGenResult<()> {
        self.inner.call(
            &calls::VISIT_LOCAL_VARIABLE,
            vec![
                name.into(),
                descriptor.into(),
                signature.into(),
                (&start.proxy).into(),
                (&end.proxy).into(),
                i32::from(index).into(),
            ],
        )?;
        Ok(())
    }

    /// Stack and local sizes; ignored when the writer computes them
    pub fn visit_maxs(&self, max_stack: i32, max_locals: i32) -> CodeGenResult<()> {
        self.inner
            .call(&calls::VISIT_MAXS, vec![max_stack.into(), max_locals.into()])?;
        Ok(())
    }

    /// Add a method annotation
    pub fn visit_annotation(&self, descriptor: &str, visible: bool) -> CodeGenResult<AnnotationVisitor> {
        Ok(AnnotationVisitor {
            inner: self.inner.call_wrapped(
                &calls::VISIT_ANNOTATION,
                vec![descriptor.into(), visible.into()],
            )?,
        })
    }

    /// Finish the method
    pub fn visit_end(&self) -> CodeGenResult<()> {
        self.inner.call(&calls::VISIT_END, vec![])?;
        Ok(())
    }
}

/// Facade over a library annotation visitor
#[derive(Debug, Clone)]
pub struct AnnotationVisitor {
    inner: Bound,
}

impl AnnotationVisitor {
    /// Set a constant element
    pub fn visit(&self, name: Option<&str>, value: NativeValue) -> CodeGenResult<()> {
        self.inner
            .call(&calls::ANNOTATION_VISIT, vec![name.into(), value.into()])?;
        Ok(())
    }

    /// Set an enum element
    pub fn visit_enum(&self, name: Option<&str>, descriptor: &str, value: &str) -> CodeGenResult<()> {
        self.inner.call(
            &calls::VISIT_ENUM,
            vec![name.into(), descriptor.into(), value.into()],
        )?;
        Ok(())
    }

    /// Start a nested annotation element
    pub fn visit_annotation(&self, name: Option<&str>, descriptor: &str) -> CodeGenResult<AnnotationVisitor> {
        Ok(AnnotationVisitor {
            inner: self
                .inner
                .call_wrapped(&calls::VISIT_NESTED, vec![name.into(), descriptor.into()])?,
        })
    }

    /// Start an array element
    pub fn visit_array(&self, name: Option<&str>) -> CodeGenResult<AnnotationVisitor> {
        Ok(AnnotationVisitor {
            inner: self.inner.call_wrapped(&calls::VISIT_ARRAY, vec![name.into()])?,
        })
    }

    /// Finish the annotation
    pub fn visit_end(&self) -> CodeGenResult<()> {
        self.inner.call(&calls::VISIT_END, vec![])?;
        Ok(())
    }
}

// ===== Values =====

/// Facade over a library label
#[derive(Debug, Clone)]
pub struct Label {
    proxy: Proxy,
}

/// Facade over a library type handle
#[derive(Debug, Clone)]
pub struct AsmType {
    inner: Bound,
}

impl AsmType {
    /// Adapt an int-typed load, store or return opcode to this type
    pub fn get_opcode(&self, op: Op) -> CodeGenResult<i32> {
        match self.inner.call(&calls::GET_OPCODE, vec![self.inner.op(op)?])? {
            NativeValue::Int(v) => Ok(v),
            other => Err(unexpected(&calls::GET_OPCODE, "int", &other)),
        }
    }

    /// The descriptor
    pub fn descriptor(&self) -> CodeGenResult<String> {
        self.inner.string(&calls::GET_DESCRIPTOR)
    }

    /// Internal name (the descriptor for arrays and primitives)
    pub fn internal_name(&self) -> CodeGenResult<String> {
        self.inner.string(&calls::GET_INTERNAL_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::discovery::{Discovery, LibraryCatalog};
    use wrapgen_classfile::{verify_class, ClassFile, Opcode};

    fn emitter(identity: &str) -> Emitter {
        let catalog = LibraryCatalog::with_bundled();
        let discovery = Discovery::new(vec![identity.to_string()]);
        Emitter::new(discovery.acquire(&catalog)).unwrap()
    }

    fn emit_counter(e: &Emitter) -> Vec<u8> {
        let cw = e.create_class_writer().unwrap();
        cw.visit(
            Op::V1_5,
            &[Op::AccPublic, Op::AccSuper],
            "pkg/Counter",
            None,
            "java/lang/Object",
            &[],
        )
        .unwrap();
        cw.visit_source("Counter.java", None).unwrap();
        cw.visit_field(&[], "count", "I", None).unwrap().visit_end().unwrap();

        let mv = cw
            .visit_method(&[Op::AccPublic], "<init>", "()V", None, &[])
            .unwrap();
        mv.visit_code().unwrap();
        mv.visit_var_insn(Op::Aload, 0).unwrap();
        mv.visit_method_insn(Op::Invokespecial, "java/lang/Object", "<init>", "()V", false)
            .unwrap();
        mv.visit_insn(Op::Return).unwrap();
        mv.visit_maxs(0, 0).unwrap();
        mv.visit_end().unwrap();

        let mv = cw
            .visit_method(&[Op::AccPublic], "label", "()Ljava/lang/String;", None, &[])
            .unwrap();
        mv.visit_code().unwrap();
        let done = e.create_label().unwrap();
        mv.visit_ldc_insn(LdcValue::Str("counter".into())).unwrap();
        mv.visit_insn(Op::Dup).unwrap();
        mv.visit_jump_insn(Op::Ifnonnull, &done).unwrap();
        mv.visit_insn(Op::Pop).unwrap();
        mv.visit_ldc_insn(LdcValue::Type(e.get_type("Lpkg/Counter;").unwrap()))
            .unwrap();
        mv.visit_label(&done).unwrap();
        mv.visit_insn(Op::Areturn).unwrap();
        mv.visit_maxs(0, 0).unwrap();
        mv.visit_end().unwrap();

        cw.visit_end().unwrap();
        cw.to_byte_array().unwrap()
    }

    #[test]
    fn test_both_dialects_produce_identical_bytes() {
        let modern = emit_counter(&emitter("asm"));
        let legacy = emit_counter(&emitter("asm-legacy"));
        assert_eq!(modern, legacy);
        let class = ClassFile::decode(&modern).unwrap();
        verify_class(&class).unwrap();
        assert_eq!(class.this_class, "pkg/Counter");
    }

    #[test]
    fn test_type_handles() {
        let e = emitter("asm-legacy");
        let ty = e.get_type("Ljava/util/List;").unwrap();
        assert_eq!(ty.internal_name().unwrap(), "java/util/List");
        assert_eq!(ty.descriptor().unwrap(), "Ljava/util/List;");
        assert_eq!(ty.get_opcode(Op::Ireturn).unwrap(), Opcode::Areturn as i32);
        assert!(e.get_type("Ljava/util/List").is_err());
    }

    #[test]
    fn test_missing_opcode_aborts_before_call() {
        let e = emitter("asm-legacy");
        let cw = e.create_class_writer().unwrap();
        let err = cw
            .visit(Op::V1_6, &[Op::AccPublic], "pkg/X", None, "java/lang/Object", &[])
            .unwrap_err();
        assert!(matches!(err, CodeGenError::MissingOpcode("V1_6")));
    }

    #[test]
    fn test_method_visitor_iteration() {
        let e = emitter("asm");
        let cw = e.create_class_writer().unwrap();
        cw.visit(Op::V1_5, &[Op::AccPublic], "pkg/M", None, "java/lang/Object", &[])
            .unwrap();
        for name in ["a", "b", "c"] {
            cw.visit_method(&[Op::AccPublic], name, "()V", None, &[]).unwrap();
        }
        let visitors: Vec<_> = cw.method_visitors().unwrap().collect();
        assert_eq!(visitors.len(), 3);
        assert!(visitors.iter().all(Result::is_ok));

        let legacy = emitter("asm-legacy").create_class_writer().unwrap();
        assert!(legacy.method_visitors().is_err());
    }

    #[test]
    fn test_class_annotation() {
        let e = emitter("asm");
        let cw = e.create_class_writer().unwrap();
        cw.visit(Op::V1_5, &[Op::AccPublic], "pkg/A", None, "java/lang/Object", &[])
            .unwrap();
        let av = cw.visit_annotation("Lwrapgen/Generated;", true).unwrap();
        av.visit(Some("value"), NativeValue::from("sig")).unwrap();
        av.visit_array(Some("tags")).unwrap().visit_end().unwrap();
        av.visit_end().unwrap();
        cw.visit_end().unwrap();
        let class = ClassFile::decode(&cw.to_byte_array().unwrap()).unwrap();
        let attribute = class.attribute("RuntimeVisibleAnnotations").unwrap();
        let annotations =
            wrapgen_classfile::annotation::decode_annotations(&class.pool, &attribute.data).unwrap();
        assert_eq!(annotations.len(), 1);
    }

    #[test]
    fn test_unavailable_provider_rejected() {
        let provider = Arc::new(CapabilityProvider::unavailable());
        assert!(matches!(Emitter::new(provider), Err(CodeGenError::Unavailable)));
    }
}
