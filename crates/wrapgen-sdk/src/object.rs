//! Objects, types and libraries behind the late-binding boundary

use crate::error::{NativeError, NativeResult};
use crate::types::NativeMethod;
use crate::value::NativeValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a library object
pub type NativeObjectRef = Arc<dyn NativeObject>;

/// Shared handle to a library type
pub type NativeTypeRef = Arc<dyn NativeType>;

/// Shared handle to an installed library
pub type NativeLibraryRef = Arc<dyn NativeLibrary>;

/// An object created by an emission library
pub trait NativeObject: Send + Sync + fmt::Debug {
    /// Simple name of the object's type (`MethodVisitor`)
    fn type_name(&self) -> &str;

    /// Whether the object may be passed where `type_name` is declared
    fn is_instance_of(&self, type_name: &str) -> bool {
        self.type_name() == type_name
    }

    /// Public instance members
    fn methods(&self) -> &[NativeMethod];

    /// Invoke one of the members returned by [`NativeObject::methods`]
    fn invoke(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue>;

    /// Get as Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// A type exported by an emission library
pub trait NativeType: Send + Sync + fmt::Debug {
    /// Simple type name
    fn name(&self) -> &str;

    /// Constructor signatures; empty when the type cannot be instantiated
    fn constructors(&self) -> &[NativeMethod] {
        &[]
    }

    /// Instance members of objects of this type
    fn instance_methods(&self) -> &[NativeMethod] {
        &[]
    }

    /// Static members
    fn static_methods(&self) -> &[NativeMethod] {
        &[]
    }

    /// Read a static constant
    fn static_field(&self, _name: &str) -> Option<NativeValue> {
        None
    }

    /// Instantiate through one of [`NativeType::constructors`]
    fn construct(&self, ctor: &NativeMethod, _args: Vec<NativeValue>) -> NativeResult<NativeObjectRef> {
        Err(NativeError::NoSuchMethod {
            type_name: self.name().to_string(),
            method: ctor.to_string(),
        })
    }

    /// Invoke one of [`NativeType::static_methods`]
    fn invoke_static(&self, method: &NativeMethod, _args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        Err(NativeError::NoSuchMethod {
            type_name: self.name().to_string(),
            method: method.to_string(),
        })
    }

    /// Whether an instance member with this name exists
    fn has_instance_method(&self, name: &str) -> bool {
        self.instance_methods().iter().any(|m| m.name == name)
    }
}

/// An installed emission library
pub trait NativeLibrary: Send + Sync + fmt::Debug {
    /// Identity under which the library is installed (`asm`)
    fn identity(&self) -> &str;

    /// Library version string
    fn version(&self) -> &str;

    /// Look up an exported type by simple name
    fn resolve_type(&self, name: &str) -> Option<NativeTypeRef>;
}
