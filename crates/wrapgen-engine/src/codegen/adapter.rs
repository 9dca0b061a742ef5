//! Late-bound call adapter
//!
//! Every facade call names its target member through a static [`CallSpec`].
//! A [`Proxy`] resolves the call against the concrete object's members at
//! run time:
//!
//! 1. facade-typed arguments are unwrapped to the library objects they stand for
//! 2. exact match on name and declared parameter types
//! 3. optional parameters dropped in declared order, cumulatively
//! 4. a scan of same-name, same-arity members accepting the argument values
//!
//! Results declared as facade objects come back re-proxied; iterators are
//! re-proxied element by element as they are drained. Resolutions found by
//! steps 2 and 3 are cached per concrete type, call name and arity.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use wrapgen_sdk::{NativeError, NativeIter, NativeMethod, NativeObjectRef, NativeValue, ParamType};

/// Late-bound call errors
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No member matches the call
    #[error("No method {call} on {type_name}")]
    NoSuchMethod {
        /// Concrete type searched
        type_name: String,
        /// Call name
        call: &'static str,
    },

    /// Several members match equally well
    #[error("Ambiguous call {call} on {type_name}: {candidates:?}")]
    AmbiguousOverload {
        /// Concrete type searched
        type_name: String,
        /// Call name
        call: &'static str,
        /// Equally specific members
        candidates: Vec<String>,
    },

    /// Object does not implement the facade it is bound or passed as
    #[error("Expected {expected}, found {found}")]
    WrongFacade {
        /// Required library type
        expected: &'static str,
        /// Actual library type
        found: String,
    },

    /// Result does not have the declared shape
    #[error("Unexpected result from {call}: expected {expected}, found {found}")]
    UnexpectedReturn {
        /// Call name
        call: &'static str,
        /// Declared result
        expected: String,
        /// Actual result kind
        found: String,
    },

    /// Wrong number of arguments for the call spec
    #[error("{call} takes {expected} arguments, {found} given")]
    Arity {
        /// Call name
        call: &'static str,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        found: usize,
    },

    /// Failure raised by the library member itself
    #[error(transparent)]
    Target(#[from] NativeError),
}

/// Result alias for late-bound calls
pub type AdapterResult<T> = Result<T, AdapterError>;

// ===== Call descriptors =====

/// Facade interfaces a library object can be bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacadeKind {
    /// Class writer
    ClassWriter,
    /// Method visitor
    MethodVisitor,
    /// Field visitor
    FieldVisitor,
    /// Annotation visitor
    AnnotationVisitor,
    /// Branch label
    Label,
    /// Type handle
    Type,
}

impl FacadeKind {
    /// Library type name implementing this facade
    pub fn native_type(self) -> &'static str {
        match self {
            FacadeKind::ClassWriter => "ClassWriter",
            FacadeKind::MethodVisitor => "MethodVisitor",
            FacadeKind::FieldVisitor => "FieldVisitor",
            FacadeKind::AnnotationVisitor => "AnnotationVisitor",
            FacadeKind::Label => "Label",
            FacadeKind::Type => "Type",
        }
    }
}

/// Declared parameter kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `int`
    Int,
    /// `boolean`
    Bool,
    /// `String`
    Str,
    /// `String[]`
    StrArray,
    /// `byte[]`
    Bytes,
    /// `Object`
    Any,
    /// A facade object
    Facade(FacadeKind),
}

impl ParamKind {
    fn param_type(self) -> ParamType {
        match self {
            ParamKind::Int => ParamType::Int,
            ParamKind::Bool => ParamType::Bool,
            ParamKind::Str => ParamType::Str,
            ParamKind::StrArray => ParamType::StrArray,
            ParamKind::Bytes => ParamType::Bytes,
            ParamKind::Any => ParamType::Any,
            ParamKind::Facade(kind) => ParamType::object(kind.native_type()),
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Declared kind
    pub kind: ParamKind,
    /// May be dropped when the library has no overload taking it
    pub optional: bool,
    /// Zero-argument accessor yielding the library object behind a facade argument
    pub unwrap_via: Option<&'static str>,
}

impl ParamSpec {
    /// Required parameter
    pub const fn required(kind: ParamKind) -> Self {
        Self {
            kind,
            optional: false,
            unwrap_via: None,
        }
    }

    /// Optional parameter
    pub const fn optional(kind: ParamKind) -> Self {
        Self {
            kind,
            optional: true,
            unwrap_via: None,
        }
    }

    /// Unwrap facade arguments through `accessor` when the object has it
    pub const fn unwrap_via(mut self, accessor: &'static str) -> Self {
        self.unwrap_via = Some(accessor);
        self
    }
}

/// Declared result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnSpec {
    /// Returned as is
    Plain,
    /// A library object re-proxied as this facade
    Wrap(FacadeKind),
    /// An iterator whose elements are re-proxied as this facade
    WrapIter(FacadeKind),
}

/// Static description of a facade call
#[derive(Debug, Clone, Copy)]
pub struct CallSpec {
    /// Member name
    pub name: &'static str,
    /// Declared parameters
    pub params: &'static [ParamSpec],
    /// Declared result
    pub returns: ReturnSpec,
}

// ===== Arguments and results =====

/// Argument to a facade call
#[derive(Debug, Clone)]
pub enum Arg {
    /// Plain value
    Value(NativeValue),
    /// Facade object
    Facade(Proxy),
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Value(NativeValue::Int(v))
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Value(NativeValue::Bool(v))
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Value(v.into())
    }
}

impl From<Option<&str>> for Arg {
    fn from(v: Option<&str>) -> Self {
        Arg::Value(v.into())
    }
}

impl From<Vec<String>> for Arg {
    fn from(v: Vec<String>) -> Self {
        Arg::Value(if v.is_empty() {
            NativeValue::Null
        } else {
            NativeValue::StrArray(v)
        })
    }
}

impl From<NativeValue> for Arg {
    fn from(v: NativeValue) -> Self {
        Arg::Value(v)
    }
}

impl From<&Proxy> for Arg {
    fn from(p: &Proxy) -> Self {
        Arg::Facade(p.clone())
    }
}

/// Result of a facade call
#[derive(Debug)]
pub enum Dispatched {
    /// Plain value
    Value(NativeValue),
    /// Re-proxied object
    Proxy(Proxy),
    /// Lazily re-proxied iterator
    Iter(ProxyIter),
}

impl Dispatched {
    /// Plain value; proxies yield their library object
    pub fn into_value(self) -> NativeValue {
        match self {
            Dispatched::Value(v) => v,
            Dispatched::Proxy(p) => NativeValue::Object(p.target),
            Dispatched::Iter(it) => NativeValue::Iter(it.inner),
        }
    }

    /// Re-proxied object
    pub fn into_proxy(self, call: &'static str) -> AdapterResult<Proxy> {
        match self {
            Dispatched::Proxy(p) => Ok(p),
            other => Err(AdapterError::UnexpectedReturn {
                call,
                expected: "facade object".to_string(),
                found: other.into_value().kind_name(),
            }),
        }
    }

    /// Re-proxied iterator
    pub fn into_proxy_iter(self, call: &'static str) -> AdapterResult<ProxyIter> {
        match self {
            Dispatched::Iter(it) => Ok(it),
            other => Err(AdapterError::UnexpectedReturn {
                call,
                expected: "iterator".to_string(),
                found: other.into_value().kind_name(),
            }),
        }
    }
}

// ===== Binder =====

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    type_name: String,
    call: &'static str,
    arity: usize,
}

/// A cached resolution: the member and the argument positions it takes
#[derive(Debug, Clone)]
struct Resolution {
    method: NativeMethod,
    keep: Vec<usize>,
}

/// Binds library objects to facades and caches call resolutions
#[derive(Debug, Default)]
pub struct Binder {
    resolutions: DashMap<ResolutionKey, Arc<Resolution>>,
}

impl Binder {
    /// Binder with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `target` as `kind`
    pub fn bind(self: &Arc<Self>, kind: FacadeKind, target: NativeObjectRef) -> AdapterResult<Proxy> {
        if !target.is_instance_of(kind.native_type()) {
            return Err(AdapterError::WrongFacade {
                expected: kind.native_type(),
                found: target.type_name().to_string(),
            });
        }
        Ok(Proxy {
            kind,
            target,
            binder: self.clone(),
        })
    }

    /// Number of cached resolutions
    pub fn cached(&self) -> usize {
        self.resolutions.len()
    }

    fn resolve(&self, target: &NativeObjectRef, spec: &CallSpec) -> Option<Arc<Resolution>> {
        let key = ResolutionKey {
            type_name: target.type_name().to_string(),
            call: spec.name,
            arity: spec.params.len(),
        };
        if let Some(hit) = self.resolutions.get(&key) {
            return Some(hit.clone());
        }

        let declared: Vec<ParamType> = spec.params.iter().map(|p| p.kind.param_type()).collect();
        let methods = target.methods();
        let mut keep: Vec<usize> = (0..spec.params.len()).collect();
        let mut found = find_exact(methods, spec.name, &declared, &keep);
        if found.is_none() {
            for (index, param) in spec.params.iter().enumerate() {
                if !param.optional {
                    continue;
                }
                keep.retain(|k| *k != index);
                found = find_exact(methods, spec.name, &declared, &keep);
                if found.is_some() {
                    break;
                }
            }
        }

        let method = found?;
        tracing::trace!(
            target_type = target.type_name(),
            call = spec.name,
            resolved = %method,
            elided = spec.params.len() - keep.len(),
            "resolved facade call"
        );
        let resolution = Arc::new(Resolution { method, keep });
        self.resolutions.insert(key, resolution.clone());
        Some(resolution)
    }

    fn rewrap(self: &Arc<Self>, spec: &CallSpec, value: NativeValue) -> AdapterResult<Dispatched> {
        match (spec.returns, value) {
            (ReturnSpec::Plain, value) => Ok(Dispatched::Value(value)),
            (ReturnSpec::Wrap(kind), NativeValue::Object(obj)) => {
                Ok(Dispatched::Proxy(self.bind(kind, obj)?))
            }
            (ReturnSpec::WrapIter(kind), NativeValue::Iter(inner)) => Ok(Dispatched::Iter(ProxyIter {
                kind,
                inner,
                binder: self.clone(),
            })),
            (returns, other) => Err(AdapterError::UnexpectedReturn {
                call: spec.name,
                expected: format!("{:?}", returns),
                found: other.kind_name(),
            }),
        }
    }
}

fn find_exact(
    methods: &[NativeMethod],
    name: &str,
    declared: &[ParamType],
    keep: &[usize],
) -> Option<NativeMethod> {
    let params: Vec<ParamType> = keep.iter().map(|i| declared[*i].clone()).collect();
    methods.iter().find(|m| m.matches(name, &params)).cloned()
}

/// Pick the unique most specific member accepting `args`
fn find_by_values(
    target: &NativeObjectRef,
    name: &'static str,
    args: &[NativeValue],
) -> AdapterResult<NativeMethod> {
    let candidates: Vec<&NativeMethod> = target
        .methods()
        .iter()
        .filter(|m| m.name == name && m.accepts(args))
        .collect();
    let best: Vec<&NativeMethod> = candidates
        .iter()
        .copied()
        .filter(|c| candidates.iter().all(|o| c.is_more_specific_than(o)))
        .collect();
    match best.as_slice() {
        [one] => Ok((*one).clone()),
        [] if candidates.is_empty() => Err(AdapterError::NoSuchMethod {
            type_name: target.type_name().to_string(),
            call: name,
        }),
        _ => Err(AdapterError::AmbiguousOverload {
            type_name: target.type_name().to_string(),
            call: name,
            candidates: candidates.iter().map(|m| m.to_string()).collect(),
        }),
    }
}

// ===== Proxy =====

/// A library object bound to a facade
#[derive(Clone)]
pub struct Proxy {
    kind: FacadeKind,
    target: NativeObjectRef,
    binder: Arc<Binder>,
}

impl Proxy {
    /// Facade this object is bound as
    pub fn kind(&self) -> FacadeKind {
        self.kind
    }

    /// The library object
    pub fn target(&self) -> &NativeObjectRef {
        &self.target
    }

    /// Invoke a member described by `spec`
    pub fn call(&self, spec: &CallSpec, args: Vec<Arg>) -> AdapterResult<Dispatched> {
        if args.len() != spec.params.len() {
            return Err(AdapterError::Arity {
                call: spec.name,
                expected: spec.params.len(),
                found: args.len(),
            });
        }

        let values = args
            .into_iter()
            .zip(spec.params)
            .map(|(arg, param)| unwrap_arg(arg, param))
            .collect::<AdapterResult<Vec<_>>>()?;

        let (method, values) = match self.binder.resolve(&self.target, spec) {
            Some(resolution) => {
                let kept = resolution.keep.iter().map(|i| values[*i].clone()).collect();
                (resolution.method.clone(), kept)
            }
            None => {
                let method = find_by_values(&self.target, spec.name, &values)?;
                tracing::trace!(
                    target_type = self.target.type_name(),
                    call = spec.name,
                    resolved = %method,
                    "resolved facade call by argument values"
                );
                (method, values)
            }
        };

        let result = self
            .target
            .invoke(&method, values)
            .map_err(|e| AdapterError::Target(e.root_cause()))?;
        self.binder.rewrap(spec, result)
    }
}

fn unwrap_arg(arg: Arg, param: &ParamSpec) -> AdapterResult<NativeValue> {
    let proxy = match arg {
        Arg::Value(value) => return Ok(value),
        Arg::Facade(proxy) => proxy,
    };
    if let ParamKind::Facade(kind) = param.kind {
        if proxy.kind != kind {
            return Err(AdapterError::WrongFacade {
                expected: kind.native_type(),
                found: proxy.target.type_name().to_string(),
            });
        }
    }
    if let Some(accessor) = param.unwrap_via {
        let getter = proxy
            .target
            .methods()
            .iter()
            .find(|m| m.name == accessor && m.arity() == 0)
            .cloned();
        if let Some(getter) = getter {
            return proxy
                .target
                .invoke(&getter, Vec::new())
                .map_err(|e| AdapterError::Target(e.root_cause()));
        }
    }
    Ok(NativeValue::Object(proxy.target))
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("kind", &self.kind)
            .field("target", &self.target.type_name())
            .finish()
    }
}

/// Iterator re-proxying each element as it is drained
pub struct ProxyIter {
    kind: FacadeKind,
    inner: NativeIter,
    binder: Arc<Binder>,
}

impl Iterator for ProxyIter {
    type Item = AdapterResult<Proxy>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.inner.next()?;
        Some(match value {
            NativeValue::Object(obj) => self.binder.bind(self.kind, obj),
            other => Err(AdapterError::UnexpectedReturn {
                call: "next",
                expected: self.kind.native_type().to_string(),
                found: other.kind_name(),
            }),
        })
    }
}

impl fmt::Debug for ProxyIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyIter").field("kind", &self.kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::any::Any;
    use wrapgen_sdk::{NativeObject, NativeResult};

    /// Records every invocation it receives
    #[derive(Debug)]
    struct Recorder {
        type_name: &'static str,
        methods: Vec<NativeMethod>,
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new(type_name: &'static str, methods: Vec<NativeMethod>) -> Arc<Self> {
            Arc::new(Self {
                type_name,
                methods,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl NativeObject for Recorder {
        fn type_name(&self) -> &str {
            self.type_name
        }

        fn methods(&self) -> &[NativeMethod] {
            &self.methods
        }

        fn invoke(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue> {
            self.calls.lock().push(method.to_string());
            match method.name.as_str() {
                "fail" => Err(NativeError::target(NativeError::target(
                    NativeError::ArgumentError("boom".into()),
                ))),
                "self" => Ok(NativeValue::Str("unwrapped".into())),
                "echo" => Ok(args.into_iter().next().unwrap_or(NativeValue::Null)),
                "children" => Ok(NativeValue::Iter(NativeIter::new(
                    vec![
                        NativeValue::Object(Recorder::new("Label", vec![])),
                        NativeValue::Int(3),
                    ]
                    .into_iter(),
                ))),
                _ => Ok(NativeValue::Null),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    const INVOKE: CallSpec = CallSpec {
        name: "visitMethodInsn",
        params: &[
            ParamSpec::required(ParamKind::Int),
            ParamSpec::required(ParamKind::Str),
            ParamSpec::optional(ParamKind::Bool),
        ],
        returns: ReturnSpec::Plain,
    };

    const LDC: CallSpec = CallSpec {
        name: "visitLdcInsn",
        params: &[ParamSpec::required(ParamKind::Any)],
        returns: ReturnSpec::Plain,
    };

    fn m(name: &str, params: Vec<ParamType>) -> NativeMethod {
        NativeMethod::new(name, params)
    }

    fn bind(recorder: &Arc<Recorder>) -> Proxy {
        let binder = Arc::new(Binder::new());
        binder
            .bind(FacadeKind::MethodVisitor, recorder.clone())
            .unwrap()
    }

    #[test]
    fn test_exact_match_is_cached() {
        let recorder = Recorder::new(
            "MethodVisitor",
            vec![m("visitMethodInsn", vec![ParamType::Int, ParamType::Str, ParamType::Bool])],
        );
        let proxy = bind(&recorder);
        proxy.call(&INVOKE, vec![1.into(), "x".into(), true.into()]).unwrap();
        proxy.call(&INVOKE, vec![2.into(), "y".into(), false.into()]).unwrap();
        assert_eq!(proxy.binder.cached(), 1);
        assert_eq!(recorder.calls(), vec!["visitMethodInsn(int, String, boolean)"; 2]);
    }

    #[test]
    fn test_optional_parameter_elided() {
        let recorder = Recorder::new(
            "MethodVisitor",
            vec![m("visitMethodInsn", vec![ParamType::Int, ParamType::Str])],
        );
        let proxy = bind(&recorder);
        proxy.call(&INVOKE, vec![1.into(), "x".into(), false.into()]).unwrap();
        assert_eq!(recorder.calls(), vec!["visitMethodInsn(int, String)"]);
    }

    #[test]
    fn test_value_scan_picks_most_specific() {
        let recorder = Recorder::new(
            "MethodVisitor",
            vec![
                m("visitLdcInsn", vec![ParamType::Int]),
                m("visitLdcInsn", vec![ParamType::Str]),
            ],
        );
        let proxy = bind(&recorder);
        proxy.call(&LDC, vec!["s".into()]).unwrap();
        proxy.call(&LDC, vec![4.into()]).unwrap();
        assert_eq!(recorder.calls(), vec!["visitLdcInsn(String)", "visitLdcInsn(int)"]);
        assert_eq!(proxy.binder.cached(), 0);
    }

    #[test]
    fn test_value_scan_ambiguity() {
        let recorder = Recorder::new(
            "MethodVisitor",
            vec![
                m("visitLdcInsn", vec![ParamType::Str]),
                m("visitLdcInsn", vec![ParamType::object("Type")]),
            ],
        );
        let proxy = bind(&recorder);
        let err = proxy.call(&LDC, vec![Arg::Value(NativeValue::Null)]).unwrap_err();
        assert!(matches!(err, AdapterError::AmbiguousOverload { .. }));
        let err = proxy.call(&LDC, vec![true.into()]).unwrap_err();
        assert!(matches!(err, AdapterError::NoSuchMethod { .. }));
    }

    #[test]
    fn test_target_failure_is_unwrapped() {
        const FAIL: CallSpec = CallSpec {
            name: "fail",
            params: &[],
            returns: ReturnSpec::Plain,
        };
        let recorder = Recorder::new("MethodVisitor", vec![m("fail", vec![])]);
        let err = bind(&recorder).call(&FAIL, vec![]).unwrap_err();
        match err {
            AdapterError::Target(NativeError::ArgumentError(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_facade_arguments_unwrapped() {
        const ECHO: CallSpec = CallSpec {
            name: "echo",
            params: &[ParamSpec::required(ParamKind::Facade(FacadeKind::MethodVisitor)).unwrap_via("self")],
            returns: ReturnSpec::Plain,
        };
        const ECHO_LABEL: CallSpec = CallSpec {
            name: "echo",
            params: &[ParamSpec::required(ParamKind::Facade(FacadeKind::Label))],
            returns: ReturnSpec::Plain,
        };
        let recorder = Recorder::new(
            "MethodVisitor",
            vec![
                m("echo", vec![ParamType::object("MethodVisitor")]),
                m("echo", vec![ParamType::object("Label")]),
                m("self", vec![]),
            ],
        );
        let proxy = bind(&recorder);
        let result = proxy.call(&ECHO, vec![(&proxy).into()]).unwrap().into_value();
        assert_eq!(result.as_str(), Some("unwrapped"));

        let err = proxy.call(&ECHO_LABEL, vec![(&proxy).into()]).unwrap_err();
        assert!(matches!(err, AdapterError::WrongFacade { expected: "Label", .. }));
    }

    #[test]
    fn test_iterator_rewrapped_lazily() {
        const CHILDREN: CallSpec = CallSpec {
            name: "children",
            params: &[],
            returns: ReturnSpec::WrapIter(FacadeKind::Label),
        };
        let recorder = Recorder::new("MethodVisitor", vec![m("children", vec![])]);
        let mut iter = bind(&recorder)
            .call(&CHILDREN, vec![])
            .unwrap()
            .into_proxy_iter("children")
            .unwrap();
        assert_eq!(iter.next().unwrap().unwrap().kind(), FacadeKind::Label);
        assert!(matches!(
            iter.next(),
            Some(Err(AdapterError::UnexpectedReturn { .. }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_bind_checks_type_and_arity() {
        let recorder = Recorder::new("Label", vec![]);
        let binder = Arc::new(Binder::new());
        assert!(matches!(
            binder.bind(FacadeKind::ClassWriter, recorder.clone()),
            Err(AdapterError::WrongFacade { .. })
        ));
        let proxy = binder.bind(FacadeKind::Label, recorder).unwrap();
        assert!(matches!(
            proxy.call(&LDC, vec![]),
            Err(AdapterError::Arity { expected: 1, found: 0, .. })
        ));
    }
}
