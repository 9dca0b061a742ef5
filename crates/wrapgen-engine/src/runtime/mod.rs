//! Runtime model: values, classes, the shared registry, per-wrapper type
//! loaders and the interpreter that runs loaded code.

pub mod class;
pub mod fault;
pub mod interpreter;
pub mod loader;
pub mod registry;
pub mod value;

pub use class::{Class, ClassId, ClassRef, Field, HostClassBuilder, Method, MethodBody};
pub use fault::{Fault, FaultResult};
pub use interpreter::{Interpreter, LoadedCode};
pub use loader::{DefinedClass, LoadError, TypeLoader};
pub use registry::{ClassRegistry, ClassResolver};
pub use value::{ListRef, Object, ObjectRef, Value};
