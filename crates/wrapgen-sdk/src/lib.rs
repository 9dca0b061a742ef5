//! Wrapgen SDK - the late-binding ABI for emission libraries
//!
//! Code generation never links against an emission library directly.
//! Libraries export types and objects through the traits in this crate, and
//! callers reach their members by name and parameter shape at run time.

#![warn(missing_docs)]

pub mod error;
pub mod object;
pub mod types;
pub mod value;

pub use error::{NativeError, NativeResult};
pub use object::{
    NativeLibrary, NativeLibraryRef, NativeObject, NativeObjectRef, NativeType, NativeTypeRef,
};
pub use types::{NativeMethod, ParamType};
pub use value::{NativeIter, NativeValue};
