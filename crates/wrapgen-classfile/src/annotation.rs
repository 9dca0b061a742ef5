//! Annotation attribute payloads
//!
//! `RuntimeVisibleAnnotations` and friends share one encoding: a count
//! followed by `annotation` structures whose element values are tagged.

use crate::constants::ConstantPool;
use crate::encoder::{ByteReader, ByteWriter, DecodeError};

/// An annotation instance
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Descriptor of the annotation type (`Lpkg/Marker;`)
    pub type_descriptor: String,
    /// Element name / value pairs in declaration order
    pub elements: Vec<(String, ElementValue)>,
}

/// An annotation element value
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// `s`
    Str(String),
    /// `I`
    Int(i32),
    /// `Z`
    Bool(bool),
    /// `e`
    Enum {
        /// Descriptor of the enum type
        type_descriptor: String,
        /// Constant name
        const_name: String,
    },
    /// `c`, holding a return descriptor
    Class(String),
    /// `@`
    Annotation(Annotation),
    /// `[`
    Array(Vec<ElementValue>),
}

impl Annotation {
    /// Create an annotation with no elements
    pub fn new(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            elements: Vec::new(),
        }
    }

    fn encode(&self, pool: &mut ConstantPool, writer: &mut ByteWriter) {
        writer.u16(pool.utf8(&self.type_descriptor));
        writer.u16(self.elements.len() as u16);
        for (name, value) in &self.elements {
            writer.u16(pool.utf8(name));
            value.encode(pool, writer);
        }
    }

    fn decode(pool: &ConstantPool, reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let type_descriptor = pool.utf8_at(reader.read_u16()?)?.to_string();
        let count = reader.read_u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8_at(reader.read_u16()?)?.to_string();
            elements.push((name, ElementValue::decode(pool, reader)?));
        }
        Ok(Self {
            type_descriptor,
            elements,
        })
    }
}

impl ElementValue {
    fn encode(&self, pool: &mut ConstantPool, writer: &mut ByteWriter) {
        match self {
            ElementValue::Str(value) => {
                writer.u8(b's');
                writer.u16(pool.utf8(value));
            }
            ElementValue::Int(value) => {
                writer.u8(b'I');
                writer.u16(pool.integer(*value));
            }
            ElementValue::Bool(value) => {
                writer.u8(b'Z');
                writer.u16(pool.integer(*value as i32));
            }
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => {
                writer.u8(b'e');
                writer.u16(pool.utf8(type_descriptor));
                writer.u16(pool.utf8(const_name));
            }
            ElementValue::Class(descriptor) => {
                writer.u8(b'c');
                writer.u16(pool.utf8(descriptor));
            }
            ElementValue::Annotation(annotation) => {
                writer.u8(b'@');
                annotation.encode(pool, writer);
            }
            ElementValue::Array(values) => {
                writer.u8(b'[');
                writer.u16(values.len() as u16);
                for value in values {
                    value.encode(pool, writer);
                }
            }
        }
    }

    fn decode(pool: &ConstantPool, reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let offset = reader.position();
        let tag = reader.read_u8()?;
        let value = match tag {
            b's' => ElementValue::Str(pool.utf8_at(reader.read_u16()?)?.to_string()),
            b'I' | b'Z' => {
                let index = reader.read_u16()?;
                let value = match pool.get(index) {
                    Some(crate::constants::Constant::Integer(v)) => *v,
                    _ => {
                        return Err(DecodeError::BadConstant {
                            index,
                            expected: "Integer",
                        })
                    }
                };
                if tag == b'Z' {
                    ElementValue::Bool(value != 0)
                } else {
                    ElementValue::Int(value)
                }
            }
            b'e' => ElementValue::Enum {
                type_descriptor: pool.utf8_at(reader.read_u16()?)?.to_string(),
                const_name: pool.utf8_at(reader.read_u16()?)?.to_string(),
            },
            b'c' => ElementValue::Class(pool.utf8_at(reader.read_u16()?)?.to_string()),
            b'@' => ElementValue::Annotation(Annotation::decode(pool, reader)?),
            b'[' => {
                let count = reader.read_u16()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(ElementValue::decode(pool, reader)?);
                }
                ElementValue::Array(values)
            }
            tag => return Err(DecodeError::UnknownTag { tag, offset }),
        };
        Ok(value)
    }
}

/// Encode the payload of an annotations attribute
pub fn encode_annotations(pool: &mut ConstantPool, annotations: &[Annotation]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.u16(annotations.len() as u16);
    for annotation in annotations {
        annotation.encode(pool, &mut writer);
    }
    writer.into_bytes()
}

/// Decode the payload of an annotations attribute
pub fn decode_annotations(pool: &ConstantPool, data: &[u8]) -> Result<Vec<Annotation>, DecodeError> {
    let mut reader = ByteReader::new(data);
    let count = reader.read_u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(Annotation::decode(pool, &mut reader)?);
    }
    if reader.has_more() {
        return Err(DecodeError::TrailingBytes(reader.remaining()));
    }
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_annotation_payload() {
        let mut inner = Annotation::new("Lpkg/Inner;");
        inner.elements.push(("flag".into(), ElementValue::Bool(true)));

        let mut outer = Annotation::new("Lpkg/Outer;");
        outer.elements.push(("name".into(), ElementValue::Str("x".into())));
        outer.elements.push((
            "kinds".into(),
            ElementValue::Array(vec![
                ElementValue::Enum {
                    type_descriptor: "Lpkg/Kind;".into(),
                    const_name: "A".into(),
                },
                ElementValue::Class("Ljava/lang/String;".into()),
            ]),
        ));
        outer
            .elements
            .push(("inner".into(), ElementValue::Annotation(inner)));

        let mut pool = ConstantPool::new();
        let payload = encode_annotations(&mut pool, &[outer.clone()]);
        let decoded = decode_annotations(&pool, &payload).unwrap();
        assert_eq!(decoded, vec![outer]);
    }
}
