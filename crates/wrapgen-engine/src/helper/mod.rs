//! Wrapper helpers
//!
//! A helper moves values between a wrapper object and its ordered list of
//! parts. Generated helpers run synthesized instructions; the reflective
//! helper walks the same accessors through the runtime model and is always
//! available.

pub mod accessor;
pub mod factory;
pub mod generated;
pub mod reflective;
pub mod resolve;

pub use accessor::{compute_signature, AccessorDescriptor, WrapperSpec};
pub use factory::WrapperHelperFactory;
pub use generated::GeneratedHelper;
pub use reflective::ReflectiveWrapperHelper;
pub use resolve::{name_to_identifier, resolve_accessors, IdentifierKind, PartDescription};

use crate::runtime::{FaultResult, Value};
use std::fmt;
use std::sync::Arc;

/// Moves values between a wrapper object and its parts
pub trait WrapperHelper: Send + Sync + fmt::Debug {
    /// Structural signature of the accessors this helper bridges
    fn signature(&self) -> &str;

    /// Build a wrapper from one value per part
    ///
    /// Fails with `ShapeMismatch` when `parts` has the wrong length.
    fn create_wrapper_object(&self, parts: &[Value]) -> FaultResult<Value>;

    /// Read one value per part; unmappable parts yield `Value::Null`
    fn wrapper_parts(&self, wrapper: &Value) -> FaultResult<Vec<Value>>;

    /// Whether this helper runs generated code
    fn is_generated(&self) -> bool {
        false
    }
}

/// Shared helper handle
pub type WrapperHelperRef = Arc<dyn WrapperHelper>;
