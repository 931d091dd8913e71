//! Class-file reader, writer and builder.
//!
//! A [`ClassFile`] keeps every attribute body as raw bytes. Transformers decode the
//! attributes they care about through [`crate::attributes`] and put back re-encoded
//! bodies; everything else is written out exactly as it was read.

use crate::access::AccessFlags;
use crate::attributes::AttributeBody;
use crate::bytes::{ByteReader, ByteWriter};
use crate::constant_pool::ConstantPool;
use crate::constant_pool::Constant;
use rejar_utils::errors::ClassFileError;

const MAGIC: u32 = 0xCAFE_BABE;

/// Major version used by [`ClassFile::new`] (Java 17).
pub const DEFAULT_MAJOR_VERSION: u16 = 61;

pub const SIGNATURE: &str = "Signature";
pub const SOURCE_FILE: &str = "SourceFile";

/// A raw attribute. `name` is resolved from `name_index` when the class is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: u16,
    pub name: String,
    pub info: Vec<u8>,
}

impl Attribute {
    /// Decodes the body as `T`.
    pub fn parse_as<T: AttributeBody>(&self, pool: &ConstantPool) -> Result<T, ClassFileError> {
        T::parse(&self.info, pool)
    }

    /// Reads the single constant-pool index that makes up `Signature`, `SourceFile` and
    /// similar attributes.
    pub fn index_body(&self) -> Result<u16, ClassFileError> {
        match self.info.as_slice() {
            [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
            _ => Err(ClassFileError::BadAttribute("single-index")),
        }
    }
}

/// A field or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub access: AccessFlags,
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Vec<Attribute>,
}

impl Member {
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str, ClassFileError> {
        pool.utf8(self.name)
    }

    pub fn descriptor<'p>(&self, pool: &'p ConstantPool) -> Result<&'p str, ClassFileError> {
        pool.utf8(self.descriptor)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }

    /// The member's `Signature`, if any.
    pub fn signature<'p>(&self, pool: &'p ConstantPool) -> Result<Option<&'p str>, ClassFileError> {
        utf8_attribute(&self.attributes, SIGNATURE, pool)
    }
}

/// A parsed class file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub pool: ConstantPool,
    pub access: AccessFlags,
    pub this_class: u16,
    /// Zero for `java/lang/Object` and `module-info`.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Creates an empty class with the given name and superclass.
    pub fn new(access: AccessFlags, name: &str, super_name: Option<&str>) -> Result<Self, ClassFileError> {
        let mut pool = ConstantPool::new();
        let this_class = pool.put_class(name)?;
        let super_class = match super_name {
            Some(s) => pool.put_class(s)?,
            None => 0,
        };
        Ok(Self {
            minor_version: 0,
            major_version: DEFAULT_MAJOR_VERSION,
            pool,
            access,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    pub fn parse(data: &[u8]) -> Result<Self, ClassFileError> {
        let mut r = ByteReader::new(data);
        let magic = r.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = r.u16()?;
        let major_version = r.u16()?;
        let pool = ConstantPool::parse(&mut r)?;
        let access = AccessFlags::from_raw(r.u16()?);
        let this_class = r.u16()?;
        let super_class = r.u16()?;

        let interface_count = r.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(r.u16()?);
        }

        let fields = read_members(&mut r, &pool)?;
        let methods = read_members(&mut r, &pool)?;
        let attributes = read_attributes(&mut r, &pool)?;

        if !r.is_empty() {
            return Err(ClassFileError::BadAttribute("trailing class data"));
        }

        let class = Self {
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
        };
        // Validate the structural names up front so later accessors cannot fail on them.
        class.name()?;
        class.super_name()?;
        class.interface_names()?;
        Ok(class)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(1024);
        w.u32(MAGIC).u16(self.minor_version).u16(self.major_version);
        self.pool.write(&mut w);
        w.u16(self.access.bits())
            .u16(self.this_class)
            .u16(self.super_class)
            .u16(self.interfaces.len() as u16);
        for &itf in &self.interfaces {
            w.u16(itf);
        }
        write_members(&mut w, &self.fields);
        write_members(&mut w, &self.methods);
        write_attributes(&mut w, &self.attributes);
        w.into_inner()
    }

    /// Binary name of this class (`a/b/C`).
    pub fn name(&self) -> Result<&str, ClassFileError> {
        self.pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<&str>, ClassFileError> {
        match self.super_class {
            0 => Ok(None),
            index => self.pool.class_name(index).map(Some),
        }
    }

    pub fn interface_names(&self) -> Result<Vec<&str>, ClassFileError> {
        self.interfaces
            .iter()
            .map(|&i| self.pool.class_name(i))
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }

    pub fn signature(&self) -> Result<Option<&str>, ClassFileError> {
        utf8_attribute(&self.attributes, SIGNATURE, &self.pool)
    }

    pub fn source_file(&self) -> Result<Option<&str>, ClassFileError> {
        utf8_attribute(&self.attributes, SOURCE_FILE, &self.pool)
    }

    /// Builds an attribute named `name` with the given body, adding the name to the pool.
    pub fn make_attribute(&mut self, name: &str, info: Vec<u8>) -> Result<Attribute, ClassFileError> {
        Ok(Attribute {
            name_index: self.pool.put_utf8(name)?,
            name: name.to_owned(),
            info,
        })
    }

    /// Builds an attribute whose body is the index of the Utf8 entry `value`.
    pub fn make_utf8_attribute(&mut self, name: &str, value: &str) -> Result<Attribute, ClassFileError> {
        let index = self.pool.put_utf8(value)?;
        self.make_attribute(name, index.to_be_bytes().to_vec())
    }

    /// Encodes `body` into an attribute.
    pub fn make_typed_attribute<T: AttributeBody>(&mut self, body: &T) -> Result<Attribute, ClassFileError> {
        self.make_attribute(T::NAME, body.to_bytes())
    }

    pub fn add_interface(&mut self, name: &str) -> Result<(), ClassFileError> {
        let index = self.pool.put_class(name)?;
        self.interfaces.push(index);
        Ok(())
    }

    /// Appends a field and returns its position in [`ClassFile::fields`].
    pub fn add_field(&mut self, access: AccessFlags, name: &str, descriptor: &str) -> Result<usize, ClassFileError> {
        let member = self.new_member(access, name, descriptor)?;
        self.fields.push(member);
        Ok(self.fields.len() - 1)
    }

    /// Appends a method and returns its position in [`ClassFile::methods`].
    pub fn add_method(&mut self, access: AccessFlags, name: &str, descriptor: &str) -> Result<usize, ClassFileError> {
        let member = self.new_member(access, name, descriptor)?;
        self.methods.push(member);
        Ok(self.methods.len() - 1)
    }

    /// Adds a `Fieldref` to the pool and returns its index.
    pub fn add_field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16, ClassFileError> {
        let class = self.pool.put_class(owner)?;
        let name_and_type = self.pool.put_name_and_type(name, descriptor)?;
        self.pool.put(Constant::FieldRef { class, name_and_type })
    }

    /// Adds a `Methodref` (or `InterfaceMethodref`) to the pool and returns its index.
    pub fn add_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<u16, ClassFileError> {
        let class = self.pool.put_class(owner)?;
        let name_and_type = self.pool.put_name_and_type(name, descriptor)?;
        self.pool.put(if interface {
            Constant::InterfaceMethodRef { class, name_and_type }
        } else {
            Constant::MethodRef { class, name_and_type }
        })
    }

    fn new_member(&mut self, access: AccessFlags, name: &str, descriptor: &str) -> Result<Member, ClassFileError> {
        Ok(Member {
            access,
            name: self.pool.put_utf8(name)?,
            descriptor: self.pool.put_utf8(descriptor)?,
            attributes: Vec::new(),
        })
    }
}

pub fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.name == name)
}

/// Replaces the first attribute with the same name, or appends it.
pub fn set_attribute(attributes: &mut Vec<Attribute>, attribute: Attribute) {
    match attributes.iter_mut().find(|a| a.name == attribute.name) {
        Some(slot) => *slot = attribute,
        None => attributes.push(attribute),
    }
}

fn utf8_attribute<'p>(
    attributes: &[Attribute],
    name: &str,
    pool: &'p ConstantPool,
) -> Result<Option<&'p str>, ClassFileError> {
    match find_attribute(attributes, name) {
        Some(attr) => pool.utf8(attr.index_body()?).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn read_attributes(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<Attribute>, ClassFileError> {
    let count = r.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = r.u16()?;
        let len = r.u32()? as usize;
        let info = r.bytes(len)?.to_vec();
        attributes.push(Attribute {
            name_index,
            name: pool.utf8(name_index)?.to_owned(),
            info,
        });
    }
    Ok(attributes)
}

pub(crate) fn write_attributes(w: &mut ByteWriter, attributes: &[Attribute]) {
    w.u16(attributes.len() as u16);
    for attr in attributes {
        w.u16(attr.name_index)
            .u32(attr.info.len() as u32)
            .bytes(&attr.info);
    }
}

fn read_members(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<Member>, ClassFileError> {
    let count = r.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = AccessFlags::from_raw(r.u16()?);
        let name = r.u16()?;
        let descriptor = r.u16()?;
        pool.utf8(name)?;
        pool.utf8(descriptor)?;
        let attributes = read_attributes(r, pool)?;
        members.push(Member {
            access,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

fn write_members(w: &mut ByteWriter, members: &[Member]) {
    w.u16(members.len() as u16);
    for m in members {
        w.u16(m.access.bits()).u16(m.name).u16(m.descriptor);
        write_attributes(w, &m.attributes);
    }
}
