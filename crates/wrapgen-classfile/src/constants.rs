//! Constant pool
//!
//! Entries are de-duplicated on insertion. Index 0 is never used, and
//! `Long`/`Double` entries occupy two slots as the format requires.

use crate::encoder::{ByteReader, ByteWriter, DecodeError};
use rustc_hash::FxHashMap;

/// A constant-pool entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Modified UTF-8 string (tag 1)
    Utf8(String),
    /// 32-bit int (tag 3)
    Integer(i32),
    /// 32-bit float bits (tag 4)
    Float(u32),
    /// 64-bit long (tag 5)
    Long(i64),
    /// 64-bit double bits (tag 6)
    Double(u64),
    /// Class reference (tag 7): name index
    Class(u16),
    /// String literal (tag 8): utf8 index
    String(u16),
    /// Field reference (tag 9): class index, name-and-type index
    Fieldref(u16, u16),
    /// Method reference (tag 10)
    Methodref(u16, u16),
    /// Interface method reference (tag 11)
    InterfaceMethodref(u16, u16),
    /// Name and type (tag 12): name index, descriptor index
    NameAndType(u16, u16),
    /// Second slot of a two-slot entry
    Unusable,
}

/// A resolved field or method reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    /// Internal name of the owning class
    pub owner: &'a str,
    /// Member name
    pub name: &'a str,
    /// Member descriptor
    pub descriptor: &'a str,
    /// Whether the reference is an interface method reference
    pub interface: bool,
}

/// A value loadable by `ldc`
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<'a> {
    /// `CONSTANT_Integer`
    Int(i32),
    /// `CONSTANT_Float`
    Float(f32),
    /// `CONSTANT_String`
    Str(&'a str),
    /// `CONSTANT_Class`
    Class(&'a str),
}

/// Class-file constant pool
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    lookup: FxHashMap<Constant, u16>,
}

impl ConstantPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// The `constant_pool_count` value (entries + 1)
    pub fn count(&self) -> u16 {
        self.entries.len() as u16 + 1
    }

    /// Borrow the entry at `index`
    pub fn get(&self, index: u16) -> Option<&Constant> {
        if index == 0 {
            return None;
        }
        self.entries.get(index as usize - 1)
    }

    fn add(&mut self, constant: Constant) -> u16 {
        if let Some(&index) = self.lookup.get(&constant) {
            return index;
        }
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        self.entries.push(constant.clone());
        let index = self.entries.len() as u16;
        if wide {
            self.entries.push(Constant::Unusable);
        }
        self.lookup.insert(constant, index);
        index
    }

    // ===== Insertion =====

    /// Add a UTF-8 entry
    pub fn utf8(&mut self, value: &str) -> u16 {
        self.add(Constant::Utf8(value.to_string()))
    }

    /// Add an integer entry
    pub fn integer(&mut self, value: i32) -> u16 {
        self.add(Constant::Integer(value))
    }

    /// Add a class entry from an internal name (`java/lang/Object`)
    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.add(Constant::Class(name))
    }

    /// Add a string literal entry
    pub fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.add(Constant::String(utf8))
    }

    /// Add a name-and-type entry
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.add(Constant::NameAndType(name, descriptor))
    }

    /// Add a field reference
    pub fn fieldref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.add(Constant::Fieldref(class, nat))
    }

    /// Add a method reference, interface or not
    pub fn methodref(&mut self, owner: &str, name: &str, descriptor: &str, interface: bool) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        if interface {
            self.add(Constant::InterfaceMethodref(class, nat))
        } else {
            self.add(Constant::Methodref(class, nat))
        }
    }

    // ===== Lookup =====

    /// Resolve a UTF-8 entry
    pub fn utf8_at(&self, index: u16) -> Result<&str, DecodeError> {
        match self.get(index) {
            Some(Constant::Utf8(value)) => Ok(value),
            _ => Err(DecodeError::BadConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Resolve a class entry to its internal name
    pub fn class_at(&self, index: u16) -> Result<&str, DecodeError> {
        match self.get(index) {
            Some(Constant::Class(name)) => self.utf8_at(*name),
            _ => Err(DecodeError::BadConstant {
                index,
                expected: "Class",
            }),
        }
    }

    fn name_and_type_at(&self, index: u16) -> Result<(&str, &str), DecodeError> {
        match self.get(index) {
            Some(Constant::NameAndType(name, descriptor)) => {
                Ok((self.utf8_at(*name)?, self.utf8_at(*descriptor)?))
            }
            _ => Err(DecodeError::BadConstant {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolve a field reference
    pub fn fieldref_at(&self, index: u16) -> Result<MemberRef<'_>, DecodeError> {
        match self.get(index) {
            Some(Constant::Fieldref(class, nat)) => self.member(*class, *nat, false),
            _ => Err(DecodeError::BadConstant {
                index,
                expected: "Fieldref",
            }),
        }
    }

    /// Resolve a method or interface method reference
    pub fn methodref_at(&self, index: u16) -> Result<MemberRef<'_>, DecodeError> {
        match self.get(index) {
            Some(Constant::Methodref(class, nat)) => self.member(*class, *nat, false),
            Some(Constant::InterfaceMethodref(class, nat)) => self.member(*class, *nat, true),
            _ => Err(DecodeError::BadConstant {
                index,
                expected: "Methodref",
            }),
        }
    }

    fn member(&self, class: u16, nat: u16, interface: bool) -> Result<MemberRef<'_>, DecodeError> {
        let owner = self.class_at(class)?;
        let (name, descriptor) = self.name_and_type_at(nat)?;
        Ok(MemberRef {
            owner,
            name,
            descriptor,
            interface,
        })
    }

    /// Resolve an entry loadable by `ldc`
    pub fn loadable_at(&self, index: u16) -> Result<Loadable<'_>, DecodeError> {
        match self.get(index) {
            Some(Constant::Integer(value)) => Ok(Loadable::Int(*value)),
            Some(Constant::Float(bits)) => Ok(Loadable::Float(f32::from_bits(*bits))),
            Some(Constant::String(utf8)) => Ok(Loadable::Str(self.utf8_at(*utf8)?)),
            Some(Constant::Class(_)) => Ok(Loadable::Class(self.class_at(index)?)),
            _ => Err(DecodeError::BadConstant {
                index,
                expected: "loadable constant",
            }),
        }
    }

    // ===== Encoding =====

    /// Write `constant_pool_count` and the entries
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.u16(self.count());
        for entry in &self.entries {
            match entry {
                Constant::Utf8(value) => {
                    writer.u8(1);
                    writer.utf8(value);
                }
                Constant::Integer(value) => {
                    writer.u8(3);
                    writer.i32(*value);
                }
                Constant::Float(bits) => {
                    writer.u8(4);
                    writer.u32(*bits);
                }
                Constant::Long(value) => {
                    writer.u8(5);
                    writer.bytes(&value.to_be_bytes());
                }
                Constant::Double(bits) => {
                    writer.u8(6);
                    writer.bytes(&bits.to_be_bytes());
                }
                Constant::Class(name) => {
                    writer.u8(7);
                    writer.u16(*name);
                }
                Constant::String(utf8) => {
                    writer.u8(8);
                    writer.u16(*utf8);
                }
                Constant::Fieldref(class, nat) => {
                    writer.u8(9);
                    writer.u16(*class);
                    writer.u16(*nat);
                }
                Constant::Methodref(class, nat) => {
                    writer.u8(10);
                    writer.u16(*class);
                    writer.u16(*nat);
                }
                Constant::InterfaceMethodref(class, nat) => {
                    writer.u8(11);
                    writer.u16(*class);
                    writer.u16(*nat);
                }
                Constant::NameAndType(name, descriptor) => {
                    writer.u8(12);
                    writer.u16(*name);
                    writer.u16(*descriptor);
                }
                Constant::Unusable => {}
            }
        }
    }

    /// Read `constant_pool_count` and the entries
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_u16()?;
        let mut pool = ConstantPool::new();
        let mut index = 1u16;
        while index < count {
            let offset = reader.position();
            let tag = reader.read_u8()?;
            let entry = match tag {
                1 => Constant::Utf8(reader.read_utf8()?),
                3 => Constant::Integer(reader.read_i32()?),
                4 => Constant::Float(reader.read_u32()?),
                5 => {
                    let high = reader.read_u32()? as u64;
                    let low = reader.read_u32()? as u64;
                    Constant::Long(((high << 32) | low) as i64)
                }
                6 => {
                    let high = reader.read_u32()? as u64;
                    let low = reader.read_u32()? as u64;
                    Constant::Double((high << 32) | low)
                }
                7 => Constant::Class(reader.read_u16()?),
                8 => Constant::String(reader.read_u16()?),
                9 => Constant::Fieldref(reader.read_u16()?, reader.read_u16()?),
                10 => Constant::Methodref(reader.read_u16()?, reader.read_u16()?),
                11 => Constant::InterfaceMethodref(reader.read_u16()?, reader.read_u16()?),
                12 => Constant::NameAndType(reader.read_u16()?, reader.read_u16()?),
                tag => return Err(DecodeError::UnknownTag { tag, offset }),
            };
            let wide = matches!(entry, Constant::Long(_) | Constant::Double(_));
            pool.lookup.entry(entry.clone()).or_insert(index);
            pool.entries.push(entry);
            index += 1;
            if wide {
                pool.entries.push(Constant::Unusable);
                index += 1;
            }
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplication() {
        let mut pool = ConstantPool::new();
        let a = pool.class("java/util/List");
        let b = pool.class("java/util/List");
        assert_eq!(a, b);
        // utf8 + class
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn test_member_resolution() {
        let mut pool = ConstantPool::new();
        let index = pool.methodref("java/util/List", "get", "(I)Ljava/lang/Object;", true);
        let member = pool.methodref_at(index).unwrap();
        assert_eq!(member.owner, "java/util/List");
        assert_eq!(member.name, "get");
        assert_eq!(member.descriptor, "(I)Ljava/lang/Object;");
        assert!(member.interface);
        assert!(pool.fieldref_at(index).is_err());
    }

    #[test]
    fn test_encode_decode() {
        let mut pool = ConstantPool::new();
        pool.string("hello");
        pool.integer(40_000);
        pool.fieldref("pkg/Helper", "factory", "Lpkg/ObjectFactory;");

        let mut writer = ByteWriter::new();
        pool.encode(&mut writer);
        let bytes = writer.into_bytes();
        let decoded = ConstantPool::decode(&mut ByteReader::new(&bytes)).unwrap();

        assert_eq!(decoded.count(), pool.count());
        let string = (1..decoded.count())
            .find_map(|i| match decoded.loadable_at(i) {
                Ok(Loadable::Str(s)) => Some(s.to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(string, "hello");
    }

    #[test]
    fn test_wide_entries_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.add(Constant::Long(7));
        let next = pool.utf8("after");
        assert_eq!(next, long + 2);
        assert_eq!(pool.get(long + 1), Some(&Constant::Unusable));
    }
}
