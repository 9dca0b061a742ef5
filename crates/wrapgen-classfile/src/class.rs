//! Class-file structure
//!
//! `ClassFile` is the decoded form used by loaders and the verifier. The
//! `Code` attribute is parsed; every other attribute is kept as raw bytes.

use crate::constants::ConstantPool;
use crate::encoder::{ByteReader, ByteWriter, DecodeError};

/// Class-file magic number
pub const MAGIC: u32 = 0xCAFE_BABE;

/// A raw attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Attribute payload
    pub data: Vec<u8>,
}

/// Method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    /// Maximum operand-stack depth in slots
    pub max_stack: u16,
    /// Local-variable slots
    pub max_locals: u16,
    /// Instruction bytes
    pub code: Vec<u8>,
    /// Nested attributes (`LineNumberTable`, `LocalVariableTable`)
    pub attributes: Vec<Attribute>,
}

/// A field declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Access flags
    pub access: u16,
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Attributes
    pub attributes: Vec<Attribute>,
}

/// A method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Access flags
    pub access: u16,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Body, absent for abstract methods
    pub code: Option<Code>,
    /// Attributes other than `Code`
    pub attributes: Vec<Attribute>,
}

/// A decoded class
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Minor version
    pub minor_version: u16,
    /// Major version
    pub major_version: u16,
    /// Constant pool referenced by the instruction bytes
    pub pool: ConstantPool,
    /// Access flags
    pub access: u16,
    /// Internal name of this class
    pub this_class: String,
    /// Internal name of the superclass
    pub super_class: Option<String>,
    /// Internal names of the implemented interfaces
    pub interfaces: Vec<String>,
    /// Fields
    pub fields: Vec<FieldInfo>,
    /// Methods
    pub methods: Vec<MethodInfo>,
    /// Class attributes
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Find a method by name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Find a class attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Encode to class-file bytes
    ///
    /// Names not yet in the pool are appended; existing indices are
    /// preserved so instruction operands stay valid.
    pub fn encode(&self) -> Vec<u8> {
        let mut pool = self.pool.clone();
        let mut body = ByteWriter::with_capacity(256);

        body.u16(self.access);
        body.u16(pool.class(&self.this_class));
        body.u16(self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0));
        body.u16(self.interfaces.len() as u16);
        for interface in &self.interfaces {
            body.u16(pool.class(interface));
        }

        body.u16(self.fields.len() as u16);
        for field in &self.fields {
            body.u16(field.access);
            body.u16(pool.utf8(&field.name));
            body.u16(pool.utf8(&field.descriptor));
            encode_attributes(&mut pool, &mut body, &field.attributes);
        }

        body.u16(self.methods.len() as u16);
        for method in &self.methods {
            body.u16(method.access);
            body.u16(pool.utf8(&method.name));
            body.u16(pool.utf8(&method.descriptor));
            let mut attributes = Vec::with_capacity(method.attributes.len() + 1);
            if let Some(code) = &method.code {
                attributes.push(code.to_attribute(&mut pool));
            }
            attributes.extend(method.attributes.iter().cloned());
            encode_attributes(&mut pool, &mut body, &attributes);
        }

        encode_attributes(&mut pool, &mut body, &self.attributes);

        let mut writer = ByteWriter::with_capacity(body.offset() + 512);
        writer.u32(MAGIC);
        writer.u16(self.minor_version);
        writer.u16(self.major_version);
        pool.encode(&mut writer);
        writer.bytes(body.buffer());
        writer.into_bytes()
    }

    /// Decode class-file bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(DecodeError::InvalidMagic(magic));
        }
        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        let pool = ConstantPool::decode(&mut reader)?;

        let access = reader.read_u16()?;
        let this_class = pool.class_at(reader.read_u16()?)?.to_string();
        let super_index = reader.read_u16()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(pool.class_at(super_index)?.to_string())
        };
        let interface_count = reader.read_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_at(reader.read_u16()?)?.to_string());
        }

        let field_count = reader.read_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let access = reader.read_u16()?;
            let name = pool.utf8_at(reader.read_u16()?)?.to_string();
            let descriptor = pool.utf8_at(reader.read_u16()?)?.to_string();
            let attributes = decode_attributes(&pool, &mut reader)?;
            fields.push(FieldInfo {
                access,
                name,
                descriptor,
                attributes,
            });
        }

        let method_count = reader.read_u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let access = reader.read_u16()?;
            let name = pool.utf8_at(reader.read_u16()?)?.to_string();
            let descriptor = pool.utf8_at(reader.read_u16()?)?.to_string();
            let mut code = None;
            let mut attributes = Vec::new();
            for attribute in decode_attributes(&pool, &mut reader)? {
                if attribute.name == "Code" {
                    code = Some(Code::from_attribute(&pool, &attribute.data)?);
                } else {
                    attributes.push(attribute);
                }
            }
            methods.push(MethodInfo {
                access,
                name,
                descriptor,
                code,
                attributes,
            });
        }

        let attributes = decode_attributes(&pool, &mut reader)?;
        if reader.has_more() {
            return Err(DecodeError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            minor_version,
            major_version,
            pool,
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

impl Code {
    fn to_attribute(&self, pool: &mut ConstantPool) -> Attribute {
        let mut writer = ByteWriter::with_capacity(self.code.len() + 32);
        writer.u16(self.max_stack);
        writer.u16(self.max_locals);
        writer.u32(self.code.len() as u32);
        writer.bytes(&self.code);
        // exception table
        writer.u16(0);
        encode_attributes(pool, &mut writer, &self.attributes);
        Attribute {
            name: "Code".to_string(),
            data: writer.into_bytes(),
        }
    }

    fn from_attribute(pool: &ConstantPool, data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(data);
        let max_stack = reader.read_u16()?;
        let max_locals = reader.read_u16()?;
        let len = reader.read_u32()? as usize;
        let code = reader.read_bytes(len)?;
        let handlers = reader.read_u16()? as usize;
        reader.read_bytes(handlers * 8)?;
        let attributes = decode_attributes(pool, &mut reader)?;
        Ok(Self {
            max_stack,
            max_locals,
            code,
            attributes,
        })
    }
}

fn encode_attributes(pool: &mut ConstantPool, writer: &mut ByteWriter, attributes: &[Attribute]) {
    writer.u16(attributes.len() as u16);
    for attribute in attributes {
        writer.u16(pool.utf8(&attribute.name));
        writer.u32(attribute.data.len() as u32);
        writer.bytes(&attribute.data);
    }
}

fn decode_attributes(
    pool: &ConstantPool,
    reader: &mut ByteReader<'_>,
) -> Result<Vec<Attribute>, DecodeError> {
    let count = reader.read_u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool.utf8_at(reader.read_u16()?)?.to_string();
        let len = reader.read_u32()? as usize;
        let data = reader.read_bytes(len)?;
        attributes.push(Attribute { name, data });
    }
    Ok(attributes)
}
