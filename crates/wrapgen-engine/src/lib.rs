//! Wrapgen Engine
//!
//! Runtime generation of wrapper helpers: objects that convert between a
//! wrapper type and the ordered list of its parts.
//! - **Helpers**: accessor resolution, the helper contract and its two
//!   implementations (`helper` module)
//! - **Codegen**: library discovery, the emission facade, the synthesizer
//!   and the generated-type cache (`codegen` module)
//! - **Runtime**: classes, values, type loaders and the interpreter that
//!   runs generated code (`runtime` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use wrapgen_engine::{HostClassBuilder, JType, PartDescription, Value, WrapperHelperFactory};
//!
//! let factory = WrapperHelperFactory::default();
//! let wrapper = factory.context().registry().register(
//!     HostClassBuilder::new("pkg.Pair")
//!         .property("left", JType::string())
//!         .property("right", JType::string())
//!         .build()?,
//! );
//! let parts = [Some(PartDescription::new("left")), Some(PartDescription::new("right"))];
//! let helper = factory.create_for(&wrapper, &parts);
//!
//! let pair = helper.create_wrapper_object(&[Value::str("a"), Value::str("b")])?;
//! assert_eq!(helper.wrapper_parts(&pair)?, vec![Value::str("a"), Value::str("b")]);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Code generation: discovery, facade, synthesizer and cache
pub mod codegen;

/// Wrapper helpers and accessor resolution
pub mod helper;

/// Runtime model for host and generated classes
pub mod runtime;

pub mod config;
pub mod defaults;
pub mod descriptor;
pub mod error;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use codegen::{CodeGenContext, Emitter, LibraryCatalog};
pub use config::CodeGenConfig;
pub use error::{CodeGenError, CodeGenResult, ConfigError};
pub use helper::{
    name_to_identifier, resolve_accessors, AccessorDescriptor, GeneratedHelper, IdentifierKind,
    PartDescription, ReflectiveWrapperHelper, WrapperHelper, WrapperHelperFactory,
    WrapperHelperRef, WrapperSpec,
};
pub use runtime::{ClassRef, ClassRegistry, ClassResolver, Fault, FaultResult, HostClassBuilder, Value};
pub use types::{JType, Primitive};
