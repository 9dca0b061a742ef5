//! Runtime faults raised by host methods and the interpreter

use thiserror::Error;

/// A runtime fault
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    /// Dereference of `null`
    #[error("Null pointer: {0}")]
    NullPointer(String),

    /// Failed reference cast
    #[error("Class cast: {found} cannot be cast to {expected}")]
    ClassCast {
        /// Target type
        expected: String,
        /// Runtime type of the value
        found: String,
    },

    /// Method lookup failed
    #[error("No such method: {class}.{name}{descriptor}")]
    NoSuchMethod {
        /// Class searched
        class: String,
        /// Method name
        name: String,
        /// Erased descriptor
        descriptor: String,
    },

    /// Field lookup failed
    #[error("No such field: {class}.{name}")]
    NoSuchField {
        /// Class searched
        class: String,
        /// Field name
        name: String,
    },

    /// Class name did not resolve
    #[error("No such class: {0}")]
    NoSuchClass(String),

    /// List index out of range
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// List length
        len: usize,
    },

    /// Exception raised by `athrow`
    #[error("{class}: {message}")]
    Thrown {
        /// Exception class
        class: String,
        /// Exception message
        message: String,
    },

    /// Parts list length differs from the accessor count
    #[error("Expected {expected} parts, got {found}")]
    ShapeMismatch {
        /// Accessor count
        expected: usize,
        /// Parts supplied
        found: usize,
    },

    /// Class cannot be instantiated
    #[error("Cannot instantiate {0}")]
    Instantiation(String),

    /// Method has no body
    #[error("Abstract method invoked: {0}")]
    AbstractMethod(String),

    /// Malformed code reached the interpreter
    #[error("Execution error: {0}")]
    Execution(String),
}

/// Result alias for runtime operations
pub type FaultResult<T> = Result<T, Fault>;

impl Fault {
    /// A runtime exception with `message`
    pub fn runtime(message: impl Into<String>) -> Self {
        Fault::Thrown {
            class: crate::defaults::RUNTIME_EXCEPTION.to_string(),
            message: message.into(),
        }
    }
}
