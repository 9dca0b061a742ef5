//! Default configuration values and well-known names
//!
//! Names are binary class names with `.` separators; the loader and the
//! synthesizer convert them to internal form where the class-file format
//! requires it.

/// Suffix inserted between the wrapper name and the version of a helper
pub const HELPER_SUFFIX: &str = "_WrapperTypeHelper";

/// Candidate emission libraries, probed in this order
pub const CANDIDATES: &[&str] = &["asm", "asm-shaded", "asm-legacy"];

/// Upper bound on helper versions probed per wrapper type
pub const MAX_PROBE_VERSIONS: u32 = 1024;

/// Entry type every emission library must export
pub const ENTRY_TYPE: &str = "ClassWriter";

/// Companion type checked during discovery
pub const COMPANION_TYPE: &str = "Type";

/// Member the companion type must expose
pub const COMPANION_METHOD: &str = "getOpcode";

/// Interface implemented by generated helpers
pub const HELPER_INTERFACE: &str = "wrapgen.WrapperHelper";

/// Annotation type placed on generated helpers when annotation is enabled
pub const GENERATED_ANNOTATION: &str = "Lwrapgen/Generated;";

/// Name of the field holding the object factory in generated helpers
pub const FACTORY_FIELD: &str = "factory";

/// Simple name of the object factory class in a wrapper's package
pub const OBJECT_FACTORY: &str = "ObjectFactory";

// ===== Host classes =====

/// Root class
pub const OBJECT: &str = "java.lang.Object";
/// String class
pub const STRING: &str = "java.lang.String";
/// Collection interface
pub const COLLECTION: &str = "java.util.Collection";
/// List interface
pub const LIST: &str = "java.util.List";
/// Default list implementation
pub const ARRAY_LIST: &str = "java.util.ArrayList";
/// Root of the throwable hierarchy
pub const THROWABLE: &str = "java.lang.Throwable";
/// Unchecked exception raised by generated helpers
pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
/// Factory-constructed element holder
pub const ELEMENT: &str = "jakarta.xml.bind.JAXBElement";
