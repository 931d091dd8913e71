//! Constant pool model.
//!
//! Entries are never moved once parsed: every rewrite either replaces an entry in place
//! (keeping its index, which code operands may reference) or appends a new entry at the
//! end. This keeps `ldc` operands, `StackMapTable` frames and any attribute this crate
//! does not understand valid without re-encoding them.

use crate::bytes::{ByteReader, ByteWriter};
use rejar_utils::errors::ClassFileError;
use std::collections::HashMap;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Highest usable constant pool count.
const MAX_POOL_COUNT: usize = u16::MAX as usize;

/// A single constant pool entry. Indices refer to other entries of the same pool.
///
/// Floating point values are kept as raw bits so that entries are `Eq + Hash` and NaN
/// payloads survive a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    /// A `Utf8` entry holding unpaired surrogates, kept as its original bytes.
    Utf8Bytes(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class { name: u16 },
    String { string: u16 },
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
    /// Slot zero and the second slot of a `Long` or `Double`.
    Unusable,
}

impl Constant {
    /// Whether this entry occupies two pool slots.
    pub const fn is_wide(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }
}

/// A resolved `Fieldref` / `Methodref` / `InterfaceMethodref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// The constant pool of a class file.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    lookup: HashMap<Constant, u16>,
}

impl ConstantPool {
    /// Creates an empty pool (containing only the unusable slot zero).
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
            lookup: HashMap::new(),
        }
    }

    pub(crate) fn parse(r: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        let mut pool = Self::new();
        pool.entries.reserve(count as usize);

        let mut index = 1u16;
        while index < count {
            let tag = r.u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = r.u16()? as usize;
                    utf8_constant(r.bytes(len)?, index)?
                }
                TAG_INTEGER => Constant::Integer(r.u32()? as i32),
                TAG_FLOAT => Constant::Float(r.u32()?),
                TAG_LONG => Constant::Long(r.u64()? as i64),
                TAG_DOUBLE => Constant::Double(r.u64()?),
                TAG_CLASS => Constant::Class { name: r.u16()? },
                TAG_STRING => Constant::String { string: r.u16()? },
                TAG_FIELDREF => Constant::FieldRef {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_METHODREF => Constant::MethodRef {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_INTERFACE_METHODREF => Constant::InterfaceMethodRef {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name: r.u16()?,
                    descriptor: r.u16()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    kind: r.u8()?,
                    reference: r.u16()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType {
                    descriptor: r.u16()?,
                },
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_MODULE => Constant::Module { name: r.u16()? },
                TAG_PACKAGE => Constant::Package { name: r.u16()? },
                tag => return Err(ClassFileError::BadTag { tag, index }),
            };

            let wide = constant.is_wide();
            pool.lookup.entry(constant.clone()).or_insert(index);
            pool.entries.push(constant);
            index += 1;
            if wide {
                pool.entries.push(Constant::Unusable);
                index += 1;
            }
        }

        Ok(pool)
    }

    pub(crate) fn write(&self, w: &mut ByteWriter) {
        w.u16(self.entries.len() as u16);
        for constant in &self.entries[1..] {
            match constant {
                Constant::Unusable => {}
                Constant::Utf8(s) => {
                    let bytes = encode_modified_utf8(s);
                    w.u8(TAG_UTF8).u16(bytes.len() as u16).bytes(&bytes);
                }
                Constant::Utf8Bytes(bytes) => {
                    w.u8(TAG_UTF8).u16(bytes.len() as u16).bytes(bytes);
                }
                Constant::Integer(v) => {
                    w.u8(TAG_INTEGER).u32(*v as u32);
                }
                Constant::Float(bits) => {
                    w.u8(TAG_FLOAT).u32(*bits);
                }
                Constant::Long(v) => {
                    w.u8(TAG_LONG).u64(*v as u64);
                }
                Constant::Double(bits) => {
                    w.u8(TAG_DOUBLE).u64(*bits);
                }
                Constant::Class { name } => {
                    w.u8(TAG_CLASS).u16(*name);
                }
                Constant::String { string } => {
                    w.u8(TAG_STRING).u16(*string);
                }
                Constant::FieldRef {
                    class,
                    name_and_type,
                } => {
                    w.u8(TAG_FIELDREF).u16(*class).u16(*name_and_type);
                }
                Constant::MethodRef {
                    class,
                    name_and_type,
                } => {
                    w.u8(TAG_METHODREF).u16(*class).u16(*name_and_type);
                }
                Constant::InterfaceMethodRef {
                    class,
                    name_and_type,
                } => {
                    w.u8(TAG_INTERFACE_METHODREF)
                        .u16(*class)
                        .u16(*name_and_type);
                }
                Constant::NameAndType { name, descriptor } => {
                    w.u8(TAG_NAME_AND_TYPE).u16(*name).u16(*descriptor);
                }
                Constant::MethodHandle { kind, reference } => {
                    w.u8(TAG_METHOD_HANDLE).u8(*kind).u16(*reference);
                }
                Constant::MethodType { descriptor } => {
                    w.u8(TAG_METHOD_TYPE).u16(*descriptor);
                }
                Constant::Dynamic {
                    bootstrap,
                    name_and_type,
                } => {
                    w.u8(TAG_DYNAMIC).u16(*bootstrap).u16(*name_and_type);
                }
                Constant::InvokeDynamic {
                    bootstrap,
                    name_and_type,
                } => {
                    w.u8(TAG_INVOKE_DYNAMIC).u16(*bootstrap).u16(*name_and_type);
                }
                Constant::Module { name } => {
                    w.u8(TAG_MODULE).u16(*name);
                }
                Constant::Package { name } => {
                    w.u8(TAG_PACKAGE).u16(*name);
                }
            }
        }
    }

    /// Number of slots including the unusable slot zero (the class-file `constant_pool_count`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no entries besides slot zero.
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Iterates `(index, constant)` over every usable entry.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| (i as u16, c))
    }

    pub fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFileError::BadIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            Constant::Utf8Bytes(_) => Err(ClassFileError::BadUtf8(index)),
            _ => Err(ClassFileError::WrongKind {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Name of the `Class` entry at `index`.
    pub fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8(*name),
            _ => Err(ClassFileError::WrongKind {
                index,
                expected: "Class",
            }),
        }
    }

    /// `(name, descriptor)` of the `NameAndType` entry at `index`.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassFileError> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(ClassFileError::WrongKind {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolves a field or method reference.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>, ClassFileError> {
        match self.get(index)? {
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(MemberRef {
                    owner: self.class_name(*class)?,
                    name,
                    descriptor,
                })
            }
            _ => Err(ClassFileError::WrongKind {
                index,
                expected: "member reference",
            }),
        }
    }

    /// Replaces the entry at `index` in place. The slot width must not change.
    pub fn set(&mut self, index: u16, constant: Constant) -> Result<(), ClassFileError> {
        check_length(&constant)?;
        let current = self.get(index)?;
        if current.is_wide() != constant.is_wide() {
            return Err(ClassFileError::WrongKind {
                index,
                expected: "entry of the same width",
            });
        }
        self.lookup.entry(constant.clone()).or_insert(index);
        self.entries[index as usize] = constant;
        Ok(())
    }

    /// Returns the index of an equal entry, appending one if none exists.
    pub fn put(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        if let Some(&index) = self.lookup.get(&constant) {
            if self.entries.get(index as usize) == Some(&constant) {
                return Ok(index);
            }
        }
        self.push(constant)
    }

    /// Appends an entry without deduplication.
    pub fn push(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        check_length(&constant)?;
        let width = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() + width > MAX_POOL_COUNT {
            return Err(ClassFileError::PoolOverflow);
        }
        let index = self.entries.len() as u16;
        self.lookup.insert(constant.clone(), index);
        self.entries.push(constant);
        if width == 2 {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    pub fn put_utf8(&mut self, value: &str) -> Result<u16, ClassFileError> {
        self.put(Constant::Utf8(value.to_owned()))
    }

    pub fn put_class(&mut self, name: &str) -> Result<u16, ClassFileError> {
        let name = self.put_utf8(name)?;
        self.put(Constant::Class { name })
    }

    pub fn put_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, ClassFileError> {
        let name = self.put_utf8(name)?;
        let descriptor = self.put_utf8(descriptor)?;
        self.put(Constant::NameAndType { name, descriptor })
    }
}

/// Utf8 entries are limited to a `u16` byte length.
fn check_length(constant: &Constant) -> Result<(), ClassFileError> {
    let len = match constant {
        Constant::Utf8(s) => modified_utf8_len(s),
        Constant::Utf8Bytes(bytes) => bytes.len(),
        _ => return Ok(()),
    };
    if len > u16::MAX as usize {
        return Err(ClassFileError::Utf8TooLong(len));
    }
    Ok(())
}

/// Builds the constant for a `Utf8` entry. Well-formed data that does not decode to
/// valid UTF-16 is kept verbatim.
fn utf8_constant(bytes: &[u8], index: u16) -> Result<Constant, ClassFileError> {
    if is_plain_ascii(bytes) {
        return Ok(Constant::Utf8(bytes.iter().map(|&b| b as char).collect()));
    }
    let units = decode_units(bytes, index)?;
    Ok(match String::from_utf16(&units) {
        Ok(s) => Constant::Utf8(s),
        Err(_) => Constant::Utf8Bytes(bytes.to_vec()),
    })
}

fn is_plain_ascii(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b != 0 && b < 0x80)
}

/// Decodes the JVM's modified UTF-8 (two-byte NUL, surrogate pairs as two three-byte units).
pub fn decode_modified_utf8(bytes: &[u8], index: u16) -> Result<String, ClassFileError> {
    if is_plain_ascii(bytes) {
        // Pure ASCII is the overwhelmingly common case.
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }
    String::from_utf16(&decode_units(bytes, index)?).map_err(|_| ClassFileError::BadUtf8(index))
}

fn decode_units(bytes: &[u8], index: u16) -> Result<Vec<u16>, ClassFileError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let continuation = |offset: usize| -> Result<u16, ClassFileError> {
            match bytes.get(i + offset) {
                Some(&c) if c & 0xc0 == 0x80 => Ok((c & 0x3f) as u16),
                _ => Err(ClassFileError::BadUtf8(index)),
            }
        };
        if b != 0 && b < 0x80 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xe0 == 0xc0 {
            units.push((((b & 0x1f) as u16) << 6) | continuation(1)?);
            i += 2;
        } else if b & 0xf0 == 0xe0 {
            units.push((((b & 0x0f) as u16) << 12) | (continuation(1)? << 6) | continuation(2)?);
            i += 3;
        } else {
            return Err(ClassFileError::BadUtf8(index));
        }
    }

    Ok(units)
}

/// Length of `value` once encoded as modified UTF-8.
pub fn modified_utf8_len(value: &str) -> usize {
    value
        .encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007f => 1,
            0x0000 | 0x0080..=0x07ff => 2,
            _ => 3,
        })
        .sum()
}

/// Encodes a string as the JVM's modified UTF-8.
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modified_utf8_nul_and_supplementary() {
        let s = "a\0\u{2603}\u{1F600}";
        let encoded = encode_modified_utf8(s);
        assert_eq!(&encoded[..3], &[b'a', 0xc0, 0x80]);
        // U+1F600 is written as a surrogate pair of two 3-byte units
        assert_eq!(encoded.len(), 1 + 2 + 3 + 6);
        assert_eq!(decode_modified_utf8(&encoded, 1).unwrap(), s);
    }

    #[test]
    fn lone_surrogate_is_kept_verbatim() {
        // count 3: #1 Utf8 [ED A0 80], #2 String #1
        let data = [0x00, 0x03, 0x01, 0x00, 0x03, 0xed, 0xa0, 0x80, 0x08, 0x00, 0x01];
        let pool = ConstantPool::parse(&mut ByteReader::new(&data)).unwrap();
        assert_eq!(pool.get(1).unwrap(), &Constant::Utf8Bytes(vec![0xed, 0xa0, 0x80]));
        assert!(matches!(pool.utf8(1), Err(ClassFileError::BadUtf8(1))));

        let mut w = ByteWriter::new();
        pool.write(&mut w);
        assert_eq!(w.into_inner(), data);
    }

    #[test]
    fn oversized_utf8_is_rejected() {
        let mut pool = ConstantPool::new();
        let limit = "a".repeat(u16::MAX as usize);
        assert!(pool.put_utf8(&limit).is_ok());

        // 2 bytes per char once encoded
        let wide = "\u{e9}".repeat(40_000);
        assert_eq!(modified_utf8_len(&wide), 80_000);
        assert!(matches!(pool.put_utf8(&wide), Err(ClassFileError::Utf8TooLong(80_000))));

        let idx = pool.put_utf8("x").unwrap();
        assert!(pool.set(idx, Constant::Utf8("y".repeat(70_000))).is_err());
        assert_eq!(pool.utf8(idx).unwrap(), "x");
    }

    #[test]
    fn raw_nul_is_rejected() {
        assert!(decode_modified_utf8(&[b'a', 0, b'b'], 3).is_err());
    }

    #[test]
    fn put_deduplicates_and_push_does_not() {
        let mut pool = ConstantPool::new();
        let a = pool.put_class("a/B").unwrap();
        let b = pool.put_class("a/B").unwrap();
        assert_eq!(a, b);
        let before = pool.len();
        pool.push(Constant::Utf8("a/B".into())).unwrap();
        assert_eq!(pool.len(), before + 1);
    }

    #[test]
    fn wide_entries_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.put(Constant::Long(7)).unwrap();
        let next = pool.put_utf8("x").unwrap();
        assert_eq!(next, long + 2);
        assert!(pool.get(long + 1).is_err());
    }

    #[test]
    fn set_rejects_width_change() {
        let mut pool = ConstantPool::new();
        let idx = pool.put_utf8("x").unwrap();
        assert!(pool.set(idx, Constant::Long(1)).is_err());
    }
}
