//! Library entry points and exported types

use crate::dialect::Dialect;
use crate::values::{int, no_such_method, string, LabelObj, TypeObj};
use crate::writer::ClassWriterObj;
use std::sync::Arc;
use wrapgen_sdk::{
    NativeError, NativeLibrary, NativeMethod, NativeObjectRef, NativeResult, NativeType,
    NativeTypeRef, NativeValue, ParamType,
};

/// A bundled emission library
#[derive(Debug)]
pub struct AsmLibrary {
    identity: String,
    dialect: Dialect,
}

impl AsmLibrary {
    /// Create a library exposing `dialect` under `identity`
    pub fn new(identity: &str, dialect: Dialect) -> Self {
        Self {
            identity: identity.to_string(),
            dialect,
        }
    }

    /// API generation
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl NativeLibrary for AsmLibrary {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn version(&self) -> &str {
        match self.dialect {
            Dialect::Modern => "9.7",
            Dialect::Legacy => "3.3",
        }
    }

    fn resolve_type(&self, name: &str) -> Option<NativeTypeRef> {
        let kind = match name {
            "ClassWriter" => TypeKind::ClassWriter,
            "Label" => TypeKind::Label,
            "Type" => TypeKind::Type,
            "Opcodes" => TypeKind::Opcodes,
            "MethodVisitor" => TypeKind::MethodVisitor,
            "FieldVisitor" => TypeKind::FieldVisitor,
            "AnnotationVisitor" => TypeKind::AnnotationVisitor,
            _ => return None,
        };
        Some(Arc::new(AsmType {
            dialect: self.dialect,
            kind,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeKind {
    ClassWriter,
    Label,
    Type,
    Opcodes,
    MethodVisitor,
    FieldVisitor,
    AnnotationVisitor,
}

#[derive(Debug)]
struct AsmType {
    dialect: Dialect,
    kind: TypeKind,
}

impl NativeType for AsmType {
    fn name(&self) -> &str {
        match self.kind {
            TypeKind::ClassWriter => "ClassWriter",
            TypeKind::Label => "Label",
            TypeKind::Type => "Type",
            TypeKind::Opcodes => "Opcodes",
            TypeKind::MethodVisitor => "MethodVisitor",
            TypeKind::FieldVisitor => "FieldVisitor",
            TypeKind::AnnotationVisitor => "AnnotationVisitor",
        }
    }

    fn constructors(&self) -> &[NativeMethod] {
        match self.kind {
            TypeKind::ClassWriter => self.dialect.class_writer_constructors(),
            TypeKind::Label => self.dialect.no_arg_constructor(),
            _ => &[],
        }
    }

    fn instance_methods(&self) -> &[NativeMethod] {
        match self.kind {
            TypeKind::ClassWriter => self.dialect.class_writer_methods(),
            TypeKind::Type => self.dialect.type_methods(),
            TypeKind::MethodVisitor => self.dialect.method_visitor_methods(),
            TypeKind::FieldVisitor => self.dialect.field_visitor_methods(),
            TypeKind::AnnotationVisitor => self.dialect.annotation_visitor_methods(),
            TypeKind::Label | TypeKind::Opcodes => &[],
        }
    }

    fn static_methods(&self) -> &[NativeMethod] {
        match self.kind {
            TypeKind::Type => self.dialect.type_statics(),
            _ => &[],
        }
    }

    fn static_field(&self, name: &str) -> Option<NativeValue> {
        let value = match self.kind {
            TypeKind::Opcodes => self.dialect.opcode(name),
            TypeKind::ClassWriter => self.dialect.class_writer_constant(name),
            _ => None,
        };
        value.map(NativeValue::Int)
    }

    fn construct(&self, ctor: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeObjectRef> {
        if !self.constructors().contains(ctor) {
            return Err(no_such_method(self.name(), ctor));
        }
        match (self.kind, ctor.params.as_slice()) {
            (TypeKind::ClassWriter, [ParamType::Int]) => {
                Ok(Arc::new(ClassWriterObj::with_flags(int(&args, 0)?)))
            }
            (TypeKind::ClassWriter, [ParamType::Bool]) => {
                let compute = args.first().and_then(NativeValue::as_bool).ok_or_else(|| {
                    NativeError::TypeMismatch {
                        expected: "boolean".into(),
                        got: args
                            .first()
                            .map(NativeValue::kind_name)
                            .unwrap_or_else(|| "nothing".into()),
                    }
                })?;
                Ok(Arc::new(ClassWriterObj::with_compute_maxs(compute)))
            }
            (TypeKind::Label, []) => Ok(Arc::new(LabelObj::new())),
            _ => Err(no_such_method(self.name(), ctor)),
        }
    }

    fn invoke_static(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        match (self.kind, method.name.as_str()) {
            (TypeKind::Type, "getType") => {
                let descriptor = string(&args, 0)?;
                let ty = TypeObj::parse(self.dialect, &descriptor)?;
                Ok(NativeValue::Object(Arc::new(ty)))
            }
            _ => Err(no_such_method(self.name(), method)),
        }
    }
}
