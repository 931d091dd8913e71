//! Typed views of the attributes the rewriting passes need to look inside.
//!
//! Every body keeps constant-pool indices rather than strings, so decoding and
//! re-encoding an attribute without touching it yields the same bytes.

use crate::access::AccessFlags;
use crate::bytes::{ByteReader, ByteWriter};
use crate::class_file::{read_attributes, write_attributes, Attribute};
use crate::constant_pool::ConstantPool;
use rejar_utils::errors::ClassFileError;

/// An attribute body with a fixed name.
pub trait AttributeBody: Sized {
    const NAME: &'static str;

    fn read(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError>;

    fn write(&self, w: &mut ByteWriter);

    /// Decodes a complete attribute body; leftover or missing bytes are an error.
    fn parse(info: &[u8], pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let mut r = ByteReader::new(info);
        let body = Self::read(&mut r, pool).map_err(|e| match e {
            ClassFileError::Truncated(_) => ClassFileError::BadAttribute(Self::NAME),
            other => other,
        })?;
        if !r.is_empty() {
            return Err(ClassFileError::BadAttribute(Self::NAME));
        }
        Ok(body)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        self.write(&mut w);
        w.into_inner()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class: u16,
    /// Zero for local and anonymous classes.
    pub outer_class: u16,
    /// Zero for anonymous classes.
    pub inner_name: u16,
    pub access: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InnerClasses {
    pub classes: Vec<InnerClass>,
}

impl AttributeBody for InnerClasses {
    const NAME: &'static str = "InnerClasses";

    fn read(r: &mut ByteReader<'_>, _pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        let mut classes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            classes.push(InnerClass {
                inner_class: r.u16()?,
                outer_class: r.u16()?,
                inner_name: r.u16()?,
                access: AccessFlags::from_raw(r.u16()?),
            });
        }
        Ok(Self { classes })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u16(self.classes.len() as u16);
        for c in &self.classes {
            w.u16(c.inner_class)
                .u16(c.outer_class)
                .u16(c.inner_name)
                .u16(c.access.bits());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class: u16,
    /// `NameAndType` of the enclosing method, zero when enclosed by an initializer.
    pub method: u16,
}

impl AttributeBody for EnclosingMethod {
    const NAME: &'static str = "EnclosingMethod";

    fn read(r: &mut ByteReader<'_>, _pool: &ConstantPool) -> Result<Self, ClassFileError> {
        Ok(Self {
            class: r.u16()?,
            method: r.u16()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u16(self.class).u16(self.method);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordComponent {
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub components: Vec<RecordComponent>,
}

impl AttributeBody for Record {
    const NAME: &'static str = "Record";

    fn read(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        let mut components = Vec::with_capacity(count as usize);
        for _ in 0..count {
            components.push(RecordComponent {
                name: r.u16()?,
                descriptor: r.u16()?,
                attributes: read_attributes(r, pool)?,
            });
        }
        Ok(Self { components })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u16(self.components.len() as u16);
        for c in &self.components {
            w.u16(c.name).u16(c.descriptor);
            write_attributes(w, &c.attributes);
        }
    }
}

/// One row of a `LocalVariableTable` or `LocalVariableTypeTable`. In the latter
/// `descriptor` points at a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name: u16,
    pub descriptor: u16,
    pub index: u16,
}

fn read_locals(r: &mut ByteReader<'_>) -> Result<Vec<LocalVariable>, ClassFileError> {
    let count = r.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(LocalVariable {
            start_pc: r.u16()?,
            length: r.u16()?,
            name: r.u16()?,
            descriptor: r.u16()?,
            index: r.u16()?,
        });
    }
    Ok(entries)
}

fn write_locals(w: &mut ByteWriter, entries: &[LocalVariable]) {
    w.u16(entries.len() as u16);
    for e in entries {
        w.u16(e.start_pc)
            .u16(e.length)
            .u16(e.name)
            .u16(e.descriptor)
            .u16(e.index);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalVariableTable {
    pub entries: Vec<LocalVariable>,
}

impl AttributeBody for LocalVariableTable {
    const NAME: &'static str = "LocalVariableTable";

    fn read(r: &mut ByteReader<'_>, _pool: &ConstantPool) -> Result<Self, ClassFileError> {
        Ok(Self {
            entries: read_locals(r)?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        write_locals(w, &self.entries);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalVariableTypeTable {
    pub entries: Vec<LocalVariable>,
}

impl AttributeBody for LocalVariableTypeTable {
    const NAME: &'static str = "LocalVariableTypeTable";

    fn read(r: &mut ByteReader<'_>, _pool: &ConstantPool) -> Result<Self, ClassFileError> {
        Ok(Self {
            entries: read_locals(r)?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        write_locals(w, &self.entries);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodParameter {
    /// Zero for a nameless parameter.
    pub name: u16,
    pub access: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodParameters {
    pub params: Vec<MethodParameter>,
}

impl AttributeBody for MethodParameters {
    const NAME: &'static str = "MethodParameters";

    fn read(r: &mut ByteReader<'_>, _pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let count = r.u8()?;
        let mut params = Vec::with_capacity(count as usize);
        for _ in 0..count {
            params.push(MethodParameter {
                name: r.u16()?,
                access: AccessFlags::from_raw(r.u16()?),
            });
        }
        Ok(Self { params })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u8(self.params.len() as u8);
        for p in &self.params {
            w.u16(p.name).u16(p.access.bits());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// A method body. The instruction stream is kept opaque; nested attributes are exposed so
/// debug tables can be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl AttributeBody for Code {
    const NAME: &'static str = "Code";

    fn read(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let max_stack = r.u16()?;
        let max_locals = r.u16()?;
        let len = r.u32()? as usize;
        let code = r.bytes(len)?.to_vec();
        let handlers = r.u16()?;
        let mut exception_table = Vec::with_capacity(handlers as usize);
        for _ in 0..handlers {
            exception_table.push(ExceptionHandler {
                start_pc: r.u16()?,
                end_pc: r.u16()?,
                handler_pc: r.u16()?,
                catch_type: r.u16()?,
            });
        }
        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes: read_attributes(r, pool)?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u16(self.max_stack)
            .u16(self.max_locals)
            .u32(self.code.len() as u32)
            .bytes(&self.code)
            .u16(self.exception_table.len() as u16);
        for h in &self.exception_table {
            w.u16(h.start_pc)
                .u16(h.end_pc)
                .u16(h.handler_pc)
                .u16(h.catch_type);
        }
        write_attributes(w, &self.attributes);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    /// `MethodHandle` constant.
    pub method_ref: u16,
    pub arguments: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BootstrapMethods {
    pub methods: Vec<BootstrapMethod>,
}

impl AttributeBody for BootstrapMethods {
    const NAME: &'static str = "BootstrapMethods";

    fn read(r: &mut ByteReader<'_>, _pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let method_ref = r.u16()?;
            let argc = r.u16()?;
            let mut arguments = Vec::with_capacity(argc as usize);
            for _ in 0..argc {
                arguments.push(r.u16()?);
            }
            methods.push(BootstrapMethod {
                method_ref,
                arguments,
            });
        }
        Ok(Self { methods })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u16(self.methods.len() as u16);
        for m in &self.methods {
            w.u16(m.method_ref).u16(m.arguments.len() as u16);
            for &arg in &m.arguments {
                w.u16(arg);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Field descriptor of the annotation type.
    pub type_index: u16,
    pub elements: Vec<(u16, ElementValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// Primitive or string constant; `tag` is one of `BCDFIJSZs`.
    Const { tag: u8, value: u16 },
    Enum { type_name: u16, const_name: u16 },
    /// Return descriptor of the class literal.
    Class(u16),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl Annotation {
    fn read(r: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let type_index = r.u16()?;
        let count = r.u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = r.u16()?;
            elements.push((name, ElementValue::read(r)?));
        }
        Ok(Self {
            type_index,
            elements,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.u16(self.type_index).u16(self.elements.len() as u16);
        for (name, value) in &self.elements {
            w.u16(*name);
            value.write(w);
        }
    }
}

impl ElementValue {
    fn read(r: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let tag = r.u8()?;
        Ok(match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => Self::Const {
                tag,
                value: r.u16()?,
            },
            b'e' => Self::Enum {
                type_name: r.u16()?,
                const_name: r.u16()?,
            },
            b'c' => Self::Class(r.u16()?),
            b'@' => Self::Annotation(Annotation::read(r)?),
            b'[' => {
                let count = r.u16()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(Self::read(r)?);
                }
                Self::Array(values)
            }
            _ => return Err(ClassFileError::BadAttribute("element_value")),
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        match self {
            Self::Const { tag, value } => {
                w.u8(*tag).u16(*value);
            }
            Self::Enum {
                type_name,
                const_name,
            } => {
                w.u8(b'e').u16(*type_name).u16(*const_name);
            }
            Self::Class(index) => {
                w.u8(b'c').u16(*index);
            }
            Self::Annotation(a) => {
                w.u8(b'@');
                a.write(w);
            }
            Self::Array(values) => {
                w.u8(b'[').u16(values.len() as u16);
                for v in values {
                    v.write(w);
                }
            }
        }
    }
}

/// `RuntimeVisibleAnnotations` / `RuntimeInvisibleAnnotations`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotations {
    pub annotations: Vec<Annotation>,
}

impl Annotations {
    pub const VISIBLE: &'static str = "RuntimeVisibleAnnotations";
    pub const INVISIBLE: &'static str = "RuntimeInvisibleAnnotations";

    pub fn parse(info: &[u8]) -> Result<Self, ClassFileError> {
        let mut r = ByteReader::new(info);
        let annotations = read_annotation_list(&mut r)?;
        finish(&r, Self::VISIBLE)?;
        Ok(Self { annotations })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        write_annotation_list(&mut w, &self.annotations);
        w.into_inner()
    }
}

/// `RuntimeVisibleParameterAnnotations` / `RuntimeInvisibleParameterAnnotations`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterAnnotations {
    pub params: Vec<Vec<Annotation>>,
}

impl ParameterAnnotations {
    pub const VISIBLE: &'static str = "RuntimeVisibleParameterAnnotations";
    pub const INVISIBLE: &'static str = "RuntimeInvisibleParameterAnnotations";

    pub fn parse(info: &[u8]) -> Result<Self, ClassFileError> {
        let mut r = ByteReader::new(info);
        let count = r.u8()?;
        let mut params = Vec::with_capacity(count as usize);
        for _ in 0..count {
            params.push(read_annotation_list(&mut r)?);
        }
        finish(&r, Self::VISIBLE)?;
        Ok(Self { params })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.u8(self.params.len() as u8);
        for list in &self.params {
            write_annotation_list(&mut w, list);
        }
        w.into_inner()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationDefault {
    pub value: ElementValue,
}

impl AttributeBody for AnnotationDefault {
    const NAME: &'static str = "AnnotationDefault";

    fn read(r: &mut ByteReader<'_>, _pool: &ConstantPool) -> Result<Self, ClassFileError> {
        Ok(Self {
            value: ElementValue::read(r)?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        self.value.write(w);
    }
}

fn read_annotation_list(r: &mut ByteReader<'_>) -> Result<Vec<Annotation>, ClassFileError> {
    let count = r.u16()?;
    let mut list = Vec::with_capacity(count as usize);
    for _ in 0..count {
        list.push(Annotation::read(r)?);
    }
    Ok(list)
}

fn write_annotation_list(w: &mut ByteWriter, list: &[Annotation]) {
    w.u16(list.len() as u16);
    for a in list {
        a.write(w);
    }
}

fn finish(r: &ByteReader<'_>, name: &'static str) -> Result<(), ClassFileError> {
    if r.is_empty() {
        Ok(())
    } else {
        Err(ClassFileError::BadAttribute(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_annotation_bytes_are_stable() {
        let annotation = Annotation {
            type_index: 3,
            elements: vec![
                (4, ElementValue::Const { tag: b's', value: 5 }),
                (
                    6,
                    ElementValue::Array(vec![
                        ElementValue::Class(7),
                        ElementValue::Enum {
                            type_name: 8,
                            const_name: 9,
                        },
                        ElementValue::Annotation(Annotation {
                            type_index: 10,
                            elements: Vec::new(),
                        }),
                    ]),
                ),
            ],
        };
        let list = Annotations {
            annotations: vec![annotation],
        };
        let bytes = list.to_bytes();
        assert_eq!(Annotations::parse(&bytes).unwrap(), list);
    }

    #[test]
    fn record_with_nested_attributes() {
        let mut pool = ConstantPool::new();
        let sig = pool.put_utf8("Signature").unwrap();
        let record = Record {
            components: vec![RecordComponent {
                name: 1,
                descriptor: 1,
                attributes: vec![Attribute {
                    name_index: sig,
                    name: "Signature".into(),
                    info: vec![0, 1],
                }],
            }],
        };
        let parsed = Record::parse(&record.to_bytes(), &pool).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn short_body_is_a_bad_attribute() {
        let pool = ConstantPool::new();
        let err = EnclosingMethod::parse(&[0, 1, 0], &pool).unwrap_err();
        assert!(matches!(err, ClassFileError::BadAttribute("EnclosingMethod")));
        let err = EnclosingMethod::parse(&[0, 1, 0, 0, 9], &pool).unwrap_err();
        assert!(matches!(err, ClassFileError::BadAttribute("EnclosingMethod")));
    }
}
