//! Error types for the late-binding ABI

/// Result type for ABI calls
pub type NativeResult<T> = Result<T, NativeError>;

/// Errors raised by emission libraries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// Argument of the wrong kind
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected kind
        expected: String,
        /// Actual kind
        got: String,
    },

    /// Invalid argument value
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// No member with that name and shape
    #[error("No method {method} on {type_name}")]
    NoSuchMethod {
        /// Type searched
        type_name: String,
        /// Method name and arity
        method: String,
    },

    /// Operation invalid in the object's current state
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Failure raised inside an invoked member
    #[error("Invocation failed: {0}")]
    InvocationTarget(Box<NativeError>),

    /// Library-level failure
    #[error("{0}")]
    LibraryError(String),
}

impl NativeError {
    /// Wrap a failure raised inside an invoked member
    pub fn target(cause: NativeError) -> Self {
        NativeError::InvocationTarget(Box::new(cause))
    }

    /// Strip every `InvocationTarget` layer
    pub fn root_cause(self) -> NativeError {
        let mut error = self;
        while let NativeError::InvocationTarget(cause) = error {
            error = *cause;
        }
        error
    }
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::LibraryError(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::LibraryError(s.to_string())
    }
}
