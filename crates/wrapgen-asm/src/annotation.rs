//! Annotation visitors
//!
//! Visitors record into a shared node tree; the owning class writer turns
//! the tree into class-file annotations when `toByteArray` is called.

use crate::dialect::Dialect;
use crate::values::{no_such_method, object, opt_string, string, type_handle};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use wrapgen_classfile::{Annotation, ElementValue};
use wrapgen_sdk::{NativeError, NativeMethod, NativeObject, NativeResult, NativeValue};

pub(crate) type NodeRef = Arc<Mutex<AnnotationNode>>;

#[derive(Debug)]
pub(crate) enum AnnotationNode {
    Annotation {
        descriptor: String,
        values: Vec<(String, NodeValue)>,
    },
    Array(Vec<NodeValue>),
}

#[derive(Debug)]
pub(crate) enum NodeValue {
    Const(ElementValue),
    Node(NodeRef),
}

impl AnnotationNode {
    pub(crate) fn root(descriptor: &str) -> NodeRef {
        Arc::new(Mutex::new(AnnotationNode::Annotation {
            descriptor: descriptor.to_string(),
            values: Vec::new(),
        }))
    }

    fn push(&mut self, name: Option<String>, value: NodeValue) {
        match self {
            AnnotationNode::Annotation { values, .. } => {
                values.push((name.unwrap_or_else(|| "value".to_string()), value))
            }
            AnnotationNode::Array(items) => items.push(value),
        }
    }
}

/// Convert a recorded tree into a class-file annotation
pub(crate) fn materialize(node: &NodeRef) -> Option<Annotation> {
    match materialize_value(node) {
        ElementValue::Annotation(annotation) => Some(annotation),
        _ => None,
    }
}

fn materialize_value(node: &NodeRef) -> ElementValue {
    let node = node.lock();
    let convert = |value: &NodeValue| match value {
        NodeValue::Const(value) => value.clone(),
        NodeValue::Node(child) => materialize_value(child),
    };
    match &*node {
        AnnotationNode::Annotation { descriptor, values } => ElementValue::Annotation(Annotation {
            type_descriptor: descriptor.clone(),
            elements: values.iter().map(|(n, v)| (n.clone(), convert(v))).collect(),
        }),
        AnnotationNode::Array(items) => ElementValue::Array(items.iter().map(convert).collect()),
    }
}

/// Visitor over one annotation or annotation array
#[derive(Debug)]
pub struct AnnotationVisitorObj {
    dialect: Dialect,
    node: NodeRef,
}

impl AnnotationVisitorObj {
    pub(crate) fn new(dialect: Dialect, node: NodeRef) -> Self {
        Self { dialect, node }
    }

    fn child(&self, name: Option<String>, node: AnnotationNode) -> NativeValue {
        let child = Arc::new(Mutex::new(node));
        self.node.lock().push(name, NodeValue::Node(child.clone()));
        object(AnnotationVisitorObj::new(self.dialect, child))
    }
}

fn element(value: &NativeValue) -> NativeResult<ElementValue> {
    if let Some(ty) = type_handle(value) {
        return Ok(ElementValue::Class(ty.descriptor().to_string()));
    }
    match value {
        NativeValue::Int(v) => Ok(ElementValue::Int(*v)),
        NativeValue::Bool(v) => Ok(ElementValue::Bool(*v)),
        NativeValue::Str(v) => Ok(ElementValue::Str(v.clone())),
        other => Err(NativeError::TypeMismatch {
            expected: "annotation constant".to_string(),
            got: other.kind_name(),
        }),
    }
}

impl NativeObject for AnnotationVisitorObj {
    fn type_name(&self) -> &str {
        "AnnotationVisitor"
    }

    fn methods(&self) -> &[NativeMethod] {
        self.dialect.annotation_visitor_methods()
    }

    fn invoke(&self, method: &NativeMethod, args: Vec<NativeValue>) -> NativeResult<NativeValue> {
        match method.name.as_str() {
            "visit" => {
                let name = opt_string(&args, 0)?;
                let value = element(args.get(1).unwrap_or(&NativeValue::Null))?;
                self.node.lock().push(name, NodeValue::Const(value));
                Ok(NativeValue::Null)
            }
            "visitEnum" => {
                let name = opt_string(&args, 0)?;
                let value = ElementValue::Enum {
                    type_descriptor: string(&args, 1)?,
                    const_name: string(&args, 2)?,
                };
                self.node.lock().push(name, NodeValue::Const(value));
                Ok(NativeValue::Null)
            }
            "visitAnnotation" => {
                let name = opt_string(&args, 0)?;
                let descriptor = string(&args, 1)?;
                Ok(self.child(
                    name,
                    AnnotationNode::Annotation {
                        descriptor,
                        values: Vec::new(),
                    },
                ))
            }
            "visitArray" => {
                let name = opt_string(&args, 0)?;
                Ok(self.child(name, AnnotationNode::Array(Vec::new())))
            }
            "visitEnd" => Ok(NativeValue::Null),
            _ => Err(no_such_method("AnnotationVisitor", method)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
