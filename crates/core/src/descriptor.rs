//! Field and method descriptors (JVMS §4.3).

use rejar_utils::errors::DescriptorError;
use std::fmt;

/// Element type of a field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// One of `BCDFIJSZ`.
    Primitive(char),
    /// Internal class name, e.g. `java/lang/String`.
    Object(String),
}

/// A parsed field descriptor: an element type with zero or more array dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub dimensions: u8,
    pub base: BaseType,
}

impl FieldType {
    pub fn parse(desc: &str) -> Result<Self, DescriptorError> {
        let mut cursor = Cursor::new(desc);
        let ty = cursor.field_type()?;
        cursor.finish()?;
        Ok(ty)
    }

    /// Number of local-variable slots a value of this type occupies.
    pub const fn slot_size(&self) -> u16 {
        match self.base {
            BaseType::Primitive('J' | 'D') if self.dimensions == 0 => 2,
            _ => 1,
        }
    }

    pub const fn is_array(&self) -> bool {
        self.dimensions > 0
    }

    /// The erased name of this type as it appears in a `CONSTANT_Class`: the class name for
    /// object types, the full descriptor for arrays and primitives.
    pub fn internal_name(&self) -> String {
        match (&self.base, self.dimensions) {
            (BaseType::Object(name), 0) => name.clone(),
            _ => self.to_string(),
        }
    }

    /// Replaces the class name of an object element type.
    pub fn remap<F: FnMut(&str) -> String>(&mut self, map: &mut F) {
        if let BaseType::Object(name) = &mut self.base {
            *name = map(name);
        }
    }

    /// The element type with all array dimensions removed.
    pub fn element(&self) -> Self {
        Self {
            dimensions: 0,
            base: self.base.clone(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.dimensions {
            f.write_str("[")?;
        }
        match &self.base {
            BaseType::Primitive(c) => write!(f, "{c}"),
            BaseType::Object(name) => write!(f, "L{name};"),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` for `void`.
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(desc: &str) -> Result<Self, DescriptorError> {
        let mut cursor = Cursor::new(desc);
        cursor.expect('(')?;
        let mut params = Vec::new();
        while cursor.peek() != Some(')') {
            params.push(cursor.field_type()?);
        }
        cursor.expect(')')?;
        let ret = if cursor.peek() == Some('V') {
            cursor.next();
            None
        } else {
            Some(cursor.field_type()?)
        };
        cursor.finish()?;
        Ok(Self { params, ret })
    }

    /// Total local-variable slots used by the parameters (excluding `this`).
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(FieldType::slot_size).sum()
    }

    /// Local-variable slot of each parameter, starting after `this` when `is_static` is false.
    pub fn param_slot_indices(&self, is_static: bool) -> Vec<u16> {
        let mut slot = if is_static { 0 } else { 1 };
        self.params
            .iter()
            .map(|p| {
                let current = slot;
                slot += p.slot_size();
                current
            })
            .collect()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for p in &self.params {
            write!(f, "{p}")?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{ret}"),
            None => f.write_str("V"),
        }
    }
}

/// Rewrites every class name embedded in a field or method descriptor.
///
/// The descriptor is validated on the way; primitives and array dimensions are copied
/// through unchanged.
pub fn remap_descriptor<F>(desc: &str, mut map: F) -> Result<String, DescriptorError>
where
    F: FnMut(&str) -> String,
{
    if desc.starts_with('(') {
        let mut method = MethodDescriptor::parse(desc)?;
        for ty in method.params.iter_mut().chain(method.ret.iter_mut()) {
            ty.remap(&mut map);
        }
        Ok(method.to_string())
    } else {
        let mut field = FieldType::parse(desc)?;
        field.remap(&mut map);
        Ok(field.to_string())
    }
}

struct Cursor<'a> {
    desc: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(desc: &'a str) -> Self {
        Self {
            desc,
            chars: desc.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn next(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn unexpected(&self, pos: usize, ch: char) -> DescriptorError {
        DescriptorError::Unexpected {
            desc: self.desc.to_owned(),
            pos,
            ch,
        }
    }

    fn expect(&mut self, want: char) -> Result<(), DescriptorError> {
        match self.next() {
            Some((_, c)) if c == want => Ok(()),
            Some((pos, c)) => Err(self.unexpected(pos, c)),
            None if self.desc.is_empty() => Err(DescriptorError::Empty),
            None => Err(DescriptorError::Unterminated(self.desc.to_owned())),
        }
    }

    fn field_type(&mut self) -> Result<FieldType, DescriptorError> {
        let mut dimensions = 0u8;
        loop {
            let Some((pos, ch)) = self.next() else {
                return Err(if self.desc.is_empty() {
                    DescriptorError::Empty
                } else {
                    DescriptorError::Unterminated(self.desc.to_owned())
                });
            };
            match ch {
                '[' => {
                    dimensions = dimensions
                        .checked_add(1)
                        .ok_or_else(|| self.unexpected(pos, ch))?;
                }
                'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => {
                    return Ok(FieldType {
                        dimensions,
                        base: BaseType::Primitive(ch),
                    })
                }
                'L' => {
                    let desc = self.desc;
                    let start = pos + 1;
                    let end = self.chars.by_ref().find(|&(_, c)| c == ';').map(|(p, _)| p);
                    return match end {
                        Some(end) if end > start => Ok(FieldType {
                            dimensions,
                            base: BaseType::Object(desc[start..end].to_owned()),
                        }),
                        Some(_) => Err(self.unexpected(pos, ch)),
                        None => Err(DescriptorError::Unterminated(desc.to_owned())),
                    };
                }
                _ => return Err(self.unexpected(pos, ch)),
            }
        }
    }

    fn finish(&mut self) -> Result<(), DescriptorError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(DescriptorError::Trailing(self.desc.to_owned())),
        }
    }
}
