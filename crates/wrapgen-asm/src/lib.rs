//! Bundled class-file emission libraries
//!
//! Two libraries ship with wrapgen. They produce identical class files but
//! disagree on their member signatures, so callers must reach them through
//! the late-binding ABI in `wrapgen-sdk`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod annotation;
pub mod dialect;
pub mod library;
pub mod values;
pub mod writer;

pub use annotation::AnnotationVisitorObj;
pub use dialect::{Dialect, COMPUTE_FRAMES, COMPUTE_MAXS};
pub use library::AsmLibrary;
pub use values::{LabelObj, TypeObj};
pub use writer::{ClassWriterObj, FieldVisitorObj, MethodVisitorObj};

use std::sync::Arc;
use wrapgen_sdk::NativeLibraryRef;

/// Identity of the modern library
pub const MODERN_IDENTITY: &str = "asm";

/// Identity of the legacy library
pub const LEGACY_IDENTITY: &str = "asm-legacy";

/// The modern library, installed as [`MODERN_IDENTITY`]
pub fn modern() -> NativeLibraryRef {
    Arc::new(AsmLibrary::new(MODERN_IDENTITY, Dialect::Modern))
}

/// The legacy library, installed as [`LEGACY_IDENTITY`]
pub fn legacy() -> NativeLibraryRef {
    Arc::new(AsmLibrary::new(LEGACY_IDENTITY, Dialect::Legacy))
}
