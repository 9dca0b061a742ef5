//! Descriptor parsing
//!
//! Field and method descriptors as they appear in the constant pool
//! (`I`, `Ljava/util/List;`, `(Ljava/util/List;)Ljava/lang/Object;`).

use crate::encoder::DecodeError;

/// A parsed field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Primitive, identified by its descriptor character
    Base(char),
    /// Class or interface, by internal name
    Object(String),
    /// Array of the component type
    Array(Box<FieldType>),
}

impl FieldType {
    /// Operand-stack and local-variable slots occupied by a value of this type
    pub fn slots(&self) -> u16 {
        match self {
            FieldType::Base('J') | FieldType::Base('D') => 2,
            _ => 1,
        }
    }

    /// Whether values of this type are references
    pub fn is_reference(&self) -> bool {
        !matches!(self, FieldType::Base(_))
    }

    /// Parse a complete field descriptor
    pub fn parse(descriptor: &str) -> Result<Self, DecodeError> {
        let mut chars = descriptor.char_indices().peekable();
        let ty = parse_field(descriptor, &mut chars)?;
        if chars.peek().is_some() {
            return Err(DecodeError::InvalidDescriptor(descriptor.to_string()));
        }
        Ok(ty)
    }
}

/// A parsed method descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Parameter types in order
    pub params: Vec<FieldType>,
    /// Return type, `None` for `V`
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    /// Parse `(<params>)<ret>`
    pub fn parse(descriptor: &str) -> Result<Self, DecodeError> {
        let bad = || DecodeError::InvalidDescriptor(descriptor.to_string());
        let mut chars = descriptor.char_indices().peekable();
        if chars.next().map(|(_, c)| c) != Some('(') {
            return Err(bad());
        }
        let mut params = Vec::new();
        loop {
            match chars.peek() {
                Some((_, ')')) => {
                    chars.next();
                    break;
                }
                Some(_) => params.push(parse_field(descriptor, &mut chars)?),
                None => return Err(bad()),
            }
        }
        let ret = match chars.peek() {
            Some((_, 'V')) => {
                chars.next();
                None
            }
            Some(_) => Some(parse_field(descriptor, &mut chars)?),
            None => return Err(bad()),
        };
        if chars.peek().is_some() {
            return Err(bad());
        }
        Ok(Self { params, ret })
    }

    /// Slots taken by the arguments, not counting a receiver
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(FieldType::slots).sum()
    }

    /// Slots pushed by the return value
    pub fn return_slots(&self) -> u16 {
        self.ret.as_ref().map(FieldType::slots).unwrap_or(0)
    }
}

fn parse_field(
    descriptor: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<FieldType, DecodeError> {
    let bad = || DecodeError::InvalidDescriptor(descriptor.to_string());
    let (start, c) = chars.next().ok_or_else(bad)?;
    match c {
        'Z' | 'B' | 'C' | 'S' | 'I' | 'J' | 'F' | 'D' => Ok(FieldType::Base(c)),
        '[' => Ok(FieldType::Array(Box::new(parse_field(descriptor, chars)?))),
        'L' => {
            for (end, c) in chars.by_ref() {
                if c == ';' {
                    let name = &descriptor[start + 1..end];
                    if name.is_empty() {
                        return Err(bad());
                    }
                    return Ok(FieldType::Object(name.to_string()));
                }
            }
            Err(bad())
        }
        _ => Err(bad()),
    }
}
