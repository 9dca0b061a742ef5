//! API surfaces of the bundled libraries
//!
//! The two dialects expose the same capabilities through incompatible
//! member signatures, the way successive releases of an emission library do.

use once_cell::sync::Lazy;
use wrapgen_classfile::{access, version, Opcode};
use wrapgen_sdk::{NativeMethod, ParamType};

/// API generation of a bundled library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `ClassWriter(int flags)`, five-argument `visitMethodInsn`
    Modern,
    /// `ClassWriter(boolean computeMaxs)`, four-argument `visitMethodInsn`
    Legacy,
}

/// `ClassWriter.COMPUTE_MAXS`
pub const COMPUTE_MAXS: i32 = 1;
/// `ClassWriter.COMPUTE_FRAMES`
pub const COMPUTE_FRAMES: i32 = 2;

const OPCODES: &[(&str, i32)] = &[
    ("ACC_PUBLIC", access::ACC_PUBLIC as i32),
    ("ACC_PRIVATE", access::ACC_PRIVATE as i32),
    ("ACC_STATIC", access::ACC_STATIC as i32),
    ("ACC_FINAL", access::ACC_FINAL as i32),
    ("ACC_SUPER", access::ACC_SUPER as i32),
    ("ACC_INTERFACE", access::ACC_INTERFACE as i32),
    ("ACC_ABSTRACT", access::ACC_ABSTRACT as i32),
    ("ACC_SYNTHETIC", access::ACC_SYNTHETIC as i32),
    ("V1_5", version::V1_5 as i32),
    ("ACONST_NULL", Opcode::AconstNull as i32),
    ("ICONST_0", Opcode::Iconst0 as i32),
    ("ICONST_1", Opcode::Iconst1 as i32),
    ("BIPUSH", Opcode::Bipush as i32),
    ("SIPUSH", Opcode::Sipush as i32),
    ("LDC", Opcode::Ldc as i32),
    ("ILOAD", Opcode::Iload as i32),
    ("ALOAD", Opcode::Aload as i32),
    ("ISTORE", Opcode::Istore as i32),
    ("ASTORE", Opcode::Astore as i32),
    ("POP", Opcode::Pop as i32),
    ("DUP", Opcode::Dup as i32),
    ("SWAP", Opcode::Swap as i32),
    ("IFEQ", Opcode::Ifeq as i32),
    ("IFNE", Opcode::Ifne as i32),
    ("GOTO", Opcode::Goto as i32),
    ("IRETURN", Opcode::Ireturn as i32),
    ("ARETURN", Opcode::Areturn as i32),
    ("RETURN", Opcode::Return as i32),
    ("GETFIELD", Opcode::Getfield as i32),
    ("PUTFIELD", Opcode::Putfield as i32),
    ("INVOKEVIRTUAL", Opcode::Invokevirtual as i32),
    ("INVOKESPECIAL", Opcode::Invokespecial as i32),
    ("INVOKESTATIC", Opcode::Invokestatic as i32),
    ("INVOKEINTERFACE", Opcode::Invokeinterface as i32),
    ("NEW", Opcode::New as i32),
    ("ATHROW", Opcode::Athrow as i32),
    ("CHECKCAST", Opcode::Checkcast as i32),
    ("INSTANCEOF", Opcode::Instanceof as i32),
    ("IFNULL", Opcode::Ifnull as i32),
    ("IFNONNULL", Opcode::Ifnonnull as i32),
];

// Only the modern releases know about Java 6 and stack-map frames.
const MODERN_ONLY_OPCODES: &[(&str, i32)] = &[
    ("V1_6", version::V1_6 as i32),
    ("F_NEW", -1),
    ("F_APPEND", 1),
    ("F_SAME", 3),
];

fn m(name: &str, params: Vec<ParamType>) -> NativeMethod {
    NativeMethod::new(name, params)
}

fn label() -> ParamType {
    ParamType::object("Label")
}

fn class_writer_methods(dialect: Dialect) -> Vec<NativeMethod> {
    use ParamType::*;
    let mut methods = vec![
        m("visit", vec![Int, Int, Str, Str, Str, StrArray]),
        m("visitSource", vec![Str, Str]),
        m("visitAnnotation", vec![Str, Bool]),
        m("visitField", vec![Int, Str, Str, Str, Any]),
        m("visitMethod", vec![Int, Str, Str, Str, StrArray]),
        m("visitEnd", vec![]),
        m("toByteArray", vec![]),
    ];
    if dialect == Dialect::Modern {
        methods.push(m("methodVisitors", vec![]));
    }
    methods
}

fn method_visitor_methods(dialect: Dialect) -> Vec<NativeMethod> {
    use ParamType::*;
    let mut methods = vec![
        m("visitCode", vec![]),
        m("visitInsn", vec![Int]),
        m("visitIntInsn", vec![Int, Int]),
        m("visitVarInsn", vec![Int, Int]),
        m("visitTypeInsn", vec![Int, Str]),
        m("visitFieldInsn", vec![Int, Str, Str, Str]),
        m("visitJumpInsn", vec![Int, label()]),
        m("visitLabel", vec![label()]),
        m("visitLineNumber", vec![Int, label()]),
        m("visitLocalVariable", vec![Str, Str, Str, label(), label(), Int]),
        m("visitMaxs", vec![Int, Int]),
        m("visitAnnotation", vec![Str, Bool]),
        m("visitEnd", vec![]),
    ];
    match dialect {
        Dialect::Modern => {
            methods.push(m("visitMethodInsn", vec![Int, Str, Str, Str, Bool]));
            methods.push(m("visitLdcInsn", vec![Any]));
        }
        Dialect::Legacy => {
            methods.push(m("visitMethodInsn", vec![Int, Str, Str, Str]));
            methods.push(m("visitLdcInsn", vec![Int]));
            methods.push(m("visitLdcInsn", vec![Str]));
            methods.push(m("visitLdcInsn", vec![ParamType::object("Type")]));
        }
    }
    methods
}

fn field_visitor_methods() -> Vec<NativeMethod> {
    use ParamType::*;
    vec![m("visitAnnotation", vec![Str, Bool]), m("visitEnd", vec![])]
}

fn annotation_visitor_methods() -> Vec<NativeMethod> {
    use ParamType::*;
    vec![
        m("visit", vec![Str, Any]),
        m("visitEnum", vec![Str, Str, Str]),
        m("visitAnnotation", vec![Str, Str]),
        m("visitArray", vec![Str]),
        m("visitEnd", vec![]),
    ]
}

fn type_methods() -> Vec<NativeMethod> {
    use ParamType::*;
    vec![
        m("getOpcode", vec![Int]),
        m("getDescriptor", vec![]),
        m("getInternalName", vec![]),
    ]
}

static MODERN_CLASS_WRITER: Lazy<Vec<NativeMethod>> =
    Lazy::new(|| class_writer_methods(Dialect::Modern));
static LEGACY_CLASS_WRITER: Lazy<Vec<NativeMethod>> =
    Lazy::new(|| class_writer_methods(Dialect::Legacy));
static MODERN_METHOD_VISITOR: Lazy<Vec<NativeMethod>> =
    Lazy::new(|| method_visitor_methods(Dialect::Modern));
static LEGACY_METHOD_VISITOR: Lazy<Vec<NativeMethod>> =
    Lazy::new(|| method_visitor_methods(Dialect::Legacy));
static FIELD_VISITOR: Lazy<Vec<NativeMethod>> = Lazy::new(field_visitor_methods);
static ANNOTATION_VISITOR: Lazy<Vec<NativeMethod>> = Lazy::new(annotation_visitor_methods);
static TYPE: Lazy<Vec<NativeMethod>> = Lazy::new(type_methods);
static TYPE_STATICS: Lazy<Vec<NativeMethod>> =
    Lazy::new(|| vec![m("getType", vec![ParamType::Str])]);
static MODERN_CTORS: Lazy<Vec<NativeMethod>> =
    Lazy::new(|| vec![m("<init>", vec![ParamType::Int])]);
static LEGACY_CTORS: Lazy<Vec<NativeMethod>> =
    Lazy::new(|| vec![m("<init>", vec![ParamType::Bool])]);
static NO_ARG_CTOR: Lazy<Vec<NativeMethod>> = Lazy::new(|| vec![m("<init>", vec![])]);

impl Dialect {
    /// Members of `ClassWriter`
    pub fn class_writer_methods(self) -> &'static [NativeMethod] {
        match self {
            Dialect::Modern => &MODERN_CLASS_WRITER,
            Dialect::Legacy => &LEGACY_CLASS_WRITER,
        }
    }

    /// Constructors of `ClassWriter`
    pub fn class_writer_constructors(self) -> &'static [NativeMethod] {
        match self {
            Dialect::Modern => &MODERN_CTORS,
            Dialect::Legacy => &LEGACY_CTORS,
        }
    }

    /// Members of `MethodVisitor`
    pub fn method_visitor_methods(self) -> &'static [NativeMethod] {
        match self {
            Dialect::Modern => &MODERN_METHOD_VISITOR,
            Dialect::Legacy => &LEGACY_METHOD_VISITOR,
        }
    }

    /// Members of `FieldVisitor`
    pub fn field_visitor_methods(self) -> &'static [NativeMethod] {
        &FIELD_VISITOR
    }

    /// Members of `AnnotationVisitor`
    pub fn annotation_visitor_methods(self) -> &'static [NativeMethod] {
        &ANNOTATION_VISITOR
    }

    /// Instance members of `Type`
    pub fn type_methods(self) -> &'static [NativeMethod] {
        &TYPE
    }

    /// Static members of `Type`
    pub fn type_statics(self) -> &'static [NativeMethod] {
        &TYPE_STATICS
    }

    /// The no-argument constructor shared by `Label`
    pub fn no_arg_constructor(self) -> &'static [NativeMethod] {
        &NO_ARG_CTOR
    }

    /// Value of an `Opcodes` constant
    pub fn opcode(self, name: &str) -> Option<i32> {
        let modern: &[(&str, i32)] = match self {
            Dialect::Modern => MODERN_ONLY_OPCODES,
            Dialect::Legacy => &[],
        };
        OPCODES
            .iter()
            .chain(modern)
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Value of a `ClassWriter` constant
    pub fn class_writer_constant(self, name: &str) -> Option<i32> {
        match (self, name) {
            (Dialect::Modern, "COMPUTE_MAXS") => Some(COMPUTE_MAXS),
            (Dialect::Modern, "COMPUTE_FRAMES") => Some(COMPUTE_FRAMES),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_insn_arity_differs() {
        let arity = |d: Dialect| {
            d.method_visitor_methods()
                .iter()
                .find(|m| m.name == "visitMethodInsn")
                .map(NativeMethod::arity)
        };
        assert_eq!(arity(Dialect::Modern), Some(5));
        assert_eq!(arity(Dialect::Legacy), Some(4));
    }

    #[test]
    fn test_opcode_availability() {
        assert_eq!(Dialect::Modern.opcode("IFNULL"), Some(0xc6));
        assert_eq!(Dialect::Legacy.opcode("IFNULL"), Some(0xc6));
        assert_eq!(Dialect::Modern.opcode("F_NEW"), Some(-1));
        assert_eq!(Dialect::Legacy.opcode("F_NEW"), None);
        assert_eq!(Dialect::Legacy.class_writer_constant("COMPUTE_MAXS"), None);
    }
}
