//! Error types for code generation and configuration

use crate::codegen::adapter::AdapterError;
use crate::descriptor::DescriptorError;
use crate::runtime::{Fault, LoadError};
use thiserror::Error;

/// Code generation errors
///
/// None of these reach callers of the helper factory; the synthesizer logs
/// them and falls back to the reflective helper.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// No emission library was discovered
    #[error("No emission library available")]
    Unavailable,

    /// Generation is switched off by configuration
    #[error("Code generation disabled")]
    Disabled,

    /// The library lacks something the facade needs
    #[error("Emission library {identity} is incompatible: {reason}")]
    IncompatibleProvider {
        /// Library identity
        identity: String,
        /// What is missing
        reason: String,
    },

    /// The opcode table has no usable value for this name
    #[error("Opcode {0} is not supported by the active library")]
    MissingOpcode(&'static str),

    /// The wrapper shape cannot be generated
    #[error("Unsupported wrapper part {index} of {wrapper}: {reason}")]
    UnsupportedPart {
        /// Wrapper type
        wrapper: String,
        /// Part index
        index: usize,
        /// Why generation gave up
        reason: String,
    },

    /// Every probed version name is taken by a different shape
    #[error("No free helper version for {wrapper} within {max} probes")]
    VersionLimit {
        /// Wrapper type
        wrapper: String,
        /// Probe limit
        max: u32,
    },

    /// A different class is registered under the wrapper's name
    #[error("Class {0} is shadowed by another registered class")]
    Shadowed(String),

    /// Late-bound call failed
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Type could not be encoded
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Generated bytes could not be defined
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Generated code failed while being instantiated or probed
    #[error("Runtime fault: {0}")]
    Fault(#[from] Fault),
}

/// Result alias for code generation
pub type CodeGenResult<T> = Result<T, CodeGenError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a configuration
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// An override holds an unusable value
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting or environment variable
        key: String,
        /// Offending value
        value: String,
    },
}
