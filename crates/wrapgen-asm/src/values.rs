//! Labels, type handles and argument decoding

use crate::dialect::Dialect;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use wrapgen_classfile::{FieldType, MethodDescriptor, Opcode};
use wrapgen_sdk::{NativeError, NativeMethod, NativeObject, NativeResult, NativeValue};

static NEXT_LABEL: AtomicU64 = AtomicU64::new(1);

/// A branch target; bound to a code offset by `visitLabel`
#[derive(Debug)]
pub struct LabelObj {
    id: u64,
}

impl LabelObj {
    /// Allocate a fresh label
    pub fn new() -> Self {
        Self {
            id: NEXT_LABEL.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Process-unique id
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for LabelObj {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeObject for LabelObj {
    fn type_name(&self) -> &str {
        "Label"
    }

    fn methods(&self) -> &[NativeMethod] {
        &[]
    }

    fn invoke(&self, method: &NativeMethod, _args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        Err(no_such_method("Label", method))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type handle created by `Type.getType(descriptor)`
#[derive(Debug)]
pub struct TypeObj {
    dialect: Dialect,
    descriptor: String,
}

impl TypeObj {
    /// Parse a field or method descriptor
    pub fn parse(dialect: Dialect, descriptor: &str) -> NativeResult<Self> {
        let valid = if descriptor.starts_with('(') {
            MethodDescriptor::parse(descriptor).is_ok()
        } else {
            FieldType::parse(descriptor).is_ok() || descriptor == "V"
        };
        if !valid {
            return Err(NativeError::ArgumentError(format!(
                "invalid descriptor {descriptor:?}"
            )));
        }
        Ok(Self {
            dialect,
            descriptor: descriptor.to_string(),
        })
    }

    /// The descriptor
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Internal name for object types, the descriptor for arrays and primitives
    pub fn internal_name(&self) -> &str {
        self.descriptor
            .strip_prefix('L')
            .and_then(|s| s.strip_suffix(';'))
            .unwrap_or(&self.descriptor)
    }

    /// Adapt an int-typed load, store or return opcode to this type
    pub fn opcode_for(&self, opcode: i32) -> NativeResult<i32> {
        let base = u8::try_from(opcode)
            .ok()
            .and_then(Opcode::from_u8)
            .filter(|op| matches!(op, Opcode::Iload | Opcode::Istore | Opcode::Ireturn))
            .ok_or_else(|| NativeError::ArgumentError(format!("opcode {opcode} has no typed form")))?;
        let shift = match self.descriptor.as_bytes().first() {
            Some(b'Z' | b'B' | b'C' | b'S' | b'I') => 0,
            Some(b'J') => 1,
            Some(b'F') => 2,
            Some(b'D') => 3,
            _ => 4,
        };
        Ok(base.to_u8() as i32 + shift)
    }
}

impl NativeObject for TypeObj {
    fn type_name(&self) -> &str {
        "Type"
    }

    fn methods(&self) -> &[NativeMethod] {
        self.dialect.type_methods()
    }

    fn invoke(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        match method.name.as_str() {
            "getOpcode" => Ok(NativeValue::Int(self.opcode_for(int(&args, 0)?)?)),
            "getDescriptor" => Ok(NativeValue::Str(self.descriptor.clone())),
            "getInternalName" => Ok(NativeValue::Str(self.internal_name().to_string())),
            _ => Err(no_such_method("Type", method)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn no_such_method(type_name: &str, method: &NativeMethod) -> NativeError {
    NativeError::NoSuchMethod {
        type_name: type_name.to_string(),
        method: method.to_string(),
    }
}

fn arg(args: &[NativeValue], index: usize) -> NativeResult<&NativeValue> {
    args.get(index)
        .ok_or_else(|| NativeError::ArgumentError(format!("missing argument {index}")))
}

fn mismatch(expected: &str, got: &NativeValue) -> NativeError {
    NativeError::TypeMismatch {
        expected: expected.to_string(),
        got: got.kind_name(),
    }
}

pub(crate) fn int(args: &[NativeValue], index: usize) -> NativeResult<i32> {
    let value = arg(args, index)?;
    value.as_int().ok_or_else(|| mismatch("int", value))
}

pub(crate) fn boolean(args: &[NativeValue], index: usize) -> NativeResult<bool> {
    let value = arg(args, index)?;
    value.as_bool().ok_or_else(|| mismatch("boolean", value))
}

pub(crate) fn string(args: &[NativeValue], index: usize) -> NativeResult<String> {
    let value = arg(args, index)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch("String", value))
}

pub(crate) fn opt_string(args: &[NativeValue], index: usize) -> NativeResult<Option<String>> {
    match arg(args, index)? {
        NativeValue::Null => Ok(None),
        NativeValue::Str(s) => Ok(Some(s.clone())),
        other => Err(mismatch("String", other)),
    }
}

pub(crate) fn opt_strings(args: &[NativeValue], index: usize) -> NativeResult<Vec<String>> {
    match arg(args, index)? {
        NativeValue::Null => Ok(Vec::new()),
        NativeValue::StrArray(v) => Ok(v.clone()),
        other => Err(mismatch("String[]", other)),
    }
}

pub(crate) fn label(args: &[NativeValue], index: usize) -> NativeResult<u64> {
    let value = arg(args, index)?;
    value
        .as_object()
        .and_then(|obj| obj.as_any().downcast_ref::<LabelObj>())
        .map(LabelObj::id)
        .ok_or_else(|| mismatch("Label", value))
}

pub(crate) fn type_handle(value: &NativeValue) -> Option<&TypeObj> {
    value
        .as_object()
        .and_then(|obj| obj.as_any().downcast_ref::<TypeObj>())
}

pub(crate) fn object(obj: impl NativeObject + 'static) -> NativeValue {
    NativeValue::Object(Arc::new(obj))
}
