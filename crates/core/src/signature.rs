//! Generic signatures (JVMS §4.7.9.1).
//!
//! Signatures are parsed into a small tree, rewritten with plain functions and written
//! back with `Display`. Parsing and writing a well-formed signature is lossless.

use rejar_utils::errors::SignatureError;
use std::fmt;

/// `JavaTypeSignature`: a primitive, a class type, a type variable or an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    Base(char),
    Class(ClassTypeSignature),
    TypeVar(String),
    Array(Box<TypeSignature>),
}

/// A class type, possibly parameterized, possibly naming inner classes of a parameterized
/// outer class (`La/Outer<TT;>.Inner<TU;>;`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeSignature {
    /// First segment holds the package-qualified name, later segments the simple inner names.
    pub segments: Vec<ClassTypeSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeSegment {
    pub name: String,
    pub args: Vec<TypeArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    /// `*`
    Any,
    Exact(TypeSignature),
    /// `+`
    Extends(TypeSignature),
    /// `-`
    Super(TypeSignature),
}

/// A formal type parameter `T:ClassBound:InterfaceBound...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<TypeSignature>,
    pub interface_bounds: Vec<TypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSignature {
    pub type_params: Vec<TypeParameter>,
    pub superclass: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<TypeSignature>,
    /// `None` for `void`.
    pub ret: Option<TypeSignature>,
    pub throws: Vec<TypeSignature>,
}

/// Which grammar a `Signature` attribute follows; decided by where the attribute sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Class,
    Method,
    Field,
}

impl ClassTypeSignature {
    /// A non-generic, non-nested class type.
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            segments: vec![ClassTypeSegment {
                name: name.into(),
                args: Vec::new(),
            }],
        }
    }

    /// The binary name of the class this type denotes (`a/Outer$Inner`).
    pub fn binary_name(&self) -> String {
        let mut name = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                name.push('$');
            }
            name.push_str(&seg.name);
        }
        name
    }

    /// Rewrites the class names of this type and of every type argument.
    ///
    /// Inner segments are resolved through the full binary name and split again after the
    /// remapped outer name when it is still a prefix, otherwise after the last `$`.
    pub fn remap<F: FnMut(&str) -> String>(&mut self, map: &mut F) {
        let mut original = String::new();
        let mut remapped_outer = String::new();
        for (i, seg) in self.segments.iter_mut().enumerate() {
            for arg in &mut seg.args {
                arg.remap(map);
            }
            if i == 0 {
                original.push_str(&seg.name);
                seg.name = map(&original);
                remapped_outer = seg.name.clone();
                continue;
            }
            original.push('$');
            original.push_str(&seg.name);
            let remapped = map(&original);
            let prefix = format!("{remapped_outer}$");
            let simple = match remapped.strip_prefix(&prefix) {
                Some(rest) => rest.to_owned(),
                None => remapped.rsplit('$').next().unwrap_or(&remapped).to_owned(),
            };
            seg.name = simple;
            remapped_outer = remapped;
        }
    }
}

impl TypeSignature {
    pub fn remap<F: FnMut(&str) -> String>(&mut self, map: &mut F) {
        match self {
            Self::Base(_) | Self::TypeVar(_) => {}
            Self::Class(class) => class.remap(map),
            Self::Array(inner) => inner.remap(map),
        }
    }
}

impl TypeArgument {
    fn remap<F: FnMut(&str) -> String>(&mut self, map: &mut F) {
        match self {
            Self::Any => {}
            Self::Exact(t) | Self::Extends(t) | Self::Super(t) => t.remap(map),
        }
    }
}

impl TypeParameter {
    fn remap<F: FnMut(&str) -> String>(&mut self, map: &mut F) {
        for bound in self.class_bound.iter_mut().chain(self.interface_bounds.iter_mut()) {
            bound.remap(map);
        }
    }
}

impl ClassSignature {
    pub fn parse(sig: &str) -> Result<Self, SignatureError> {
        let mut p = Parser::new(sig);
        let type_params = p.type_params()?;
        let superclass = p.class_type()?;
        let mut interfaces = Vec::new();
        while !p.at_end() {
            interfaces.push(p.class_type()?);
        }
        Ok(Self {
            type_params,
            superclass,
            interfaces,
        })
    }

    pub fn remap<F: FnMut(&str) -> String>(&mut self, map: &mut F) {
        for tp in &mut self.type_params {
            tp.remap(map);
        }
        self.superclass.remap(map);
        for itf in &mut self.interfaces {
            itf.remap(map);
        }
    }
}

impl MethodSignature {
    pub fn parse(sig: &str) -> Result<Self, SignatureError> {
        let mut p = Parser::new(sig);
        let type_params = p.type_params()?;
        p.expect(b'(')?;
        let mut params = Vec::new();
        while p.peek() != Some(b')') {
            params.push(p.java_type()?);
        }
        p.expect(b')')?;
        let ret = if p.peek() == Some(b'V') {
            p.bump();
            None
        } else {
            Some(p.java_type()?)
        };
        let mut throws = Vec::new();
        while p.peek() == Some(b'^') {
            p.bump();
            throws.push(p.reference_type()?);
        }
        p.finish()?;
        Ok(Self {
            type_params,
            params,
            ret,
            throws,
        })
    }

    pub fn remap<F: FnMut(&str) -> String>(&mut self, map: &mut F) {
        for tp in &mut self.type_params {
            tp.remap(map);
        }
        for t in self
            .params
            .iter_mut()
            .chain(self.ret.iter_mut())
            .chain(self.throws.iter_mut())
        {
            t.remap(map);
        }
    }
}

/// Parses a field signature (a single reference type).
pub fn parse_field_signature(sig: &str) -> Result<TypeSignature, SignatureError> {
    let mut p = Parser::new(sig);
    let ty = p.reference_type()?;
    p.finish()?;
    Ok(ty)
}

/// Rewrites every class name in a signature of the given kind.
pub fn remap_signature<F>(sig: &str, kind: SignatureKind, mut map: F) -> Result<String, SignatureError>
where
    F: FnMut(&str) -> String,
{
    Ok(match kind {
        SignatureKind::Class => {
            let mut parsed = ClassSignature::parse(sig)?;
            parsed.remap(&mut map);
            parsed.to_string()
        }
        SignatureKind::Method => {
            let mut parsed = MethodSignature::parse(sig)?;
            parsed.remap(&mut map);
            parsed.to_string()
        }
        SignatureKind::Field => {
            let mut parsed = parse_field_signature(sig)?;
            parsed.remap(&mut map);
            parsed.to_string()
        }
    })
}

struct Parser<'a> {
    sig: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(sig: &'a str) -> Self {
        Self {
            sig,
            bytes: sig.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn truncated(&self) -> SignatureError {
        SignatureError::Truncated(self.sig.to_owned())
    }

    fn unexpected(&self) -> SignatureError {
        match self.sig[self.pos..].chars().next() {
            Some(ch) => SignatureError::Unexpected {
                sig: self.sig.to_owned(),
                pos: self.pos,
                ch,
            },
            None => self.truncated(),
        }
    }

    fn expect(&mut self, want: u8) -> Result<(), SignatureError> {
        match self.peek() {
            Some(b) if b == want => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(self.truncated()),
        }
    }

    fn finish(&self) -> Result<(), SignatureError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Reads an identifier up to (not including) one of `stops`.
    fn identifier(&mut self, stops: &[u8]) -> Result<&'a str, SignatureError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(if self.at_end() {
                self.truncated()
            } else {
                self.unexpected()
            });
        }
        Ok(&self.sig[start..self.pos])
    }

    fn type_params(&mut self) -> Result<Vec<TypeParameter>, SignatureError> {
        let mut params = Vec::new();
        if self.peek() != Some(b'<') {
            return Ok(params);
        }
        self.bump();
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.bump();
                    break;
                }
                None => return Err(SignatureError::Unbalanced(self.sig.to_owned())),
                Some(_) => {}
            }
            let name = self.identifier(b":;<>.").map(str::to_owned)?;
            self.expect(b':')?;
            let class_bound = match self.peek() {
                Some(b'L' | b'T' | b'[') => Some(self.reference_type()?),
                _ => None,
            };
            let mut interface_bounds = Vec::new();
            while self.peek() == Some(b':') {
                self.bump();
                interface_bounds.push(self.reference_type()?);
            }
            params.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
        }
        if params.is_empty() {
            return Err(self.unexpected());
        }
        Ok(params)
    }

    fn java_type(&mut self) -> Result<TypeSignature, SignatureError> {
        match self.peek() {
            Some(b @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z')) => {
                self.bump();
                Ok(TypeSignature::Base(b as char))
            }
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<TypeSignature, SignatureError> {
        match self.peek() {
            Some(b'L') => Ok(TypeSignature::Class(self.class_type()?)),
            Some(b'T') => {
                self.bump();
                let name = self.identifier(b";<>.:/")?.to_owned();
                self.expect(b';')?;
                Ok(TypeSignature::TypeVar(name))
            }
            Some(b'[') => {
                self.bump();
                Ok(TypeSignature::Array(Box::new(self.java_type()?)))
            }
            Some(_) => Err(self.unexpected()),
            None => Err(self.truncated()),
        }
    }

    fn class_type(&mut self) -> Result<ClassTypeSignature, SignatureError> {
        self.expect(b'L')?;
        let mut segments = Vec::new();
        loop {
            let name = self.identifier(b";<>.")?.to_owned();
            let args = if self.peek() == Some(b'<') {
                self.type_args()?
            } else {
                Vec::new()
            };
            segments.push(ClassTypeSegment { name, args });
            match self.peek() {
                Some(b';') => {
                    self.bump();
                    return Ok(ClassTypeSignature { segments });
                }
                Some(b'.') => self.bump(),
                Some(b'>') => return Err(SignatureError::Unbalanced(self.sig.to_owned())),
                Some(_) => return Err(self.unexpected()),
                None => return Err(self.truncated()),
            }
        }
    }

    fn type_args(&mut self) -> Result<Vec<TypeArgument>, SignatureError> {
        self.expect(b'<')?;
        let mut args = Vec::new();
        loop {
            let arg = match self.peek() {
                Some(b'>') => {
                    self.bump();
                    break;
                }
                None => return Err(SignatureError::Unbalanced(self.sig.to_owned())),
                Some(b'*') => {
                    self.bump();
                    TypeArgument::Any
                }
                Some(b'+') => {
                    self.bump();
                    TypeArgument::Extends(self.reference_type()?)
                }
                Some(b'-') => {
                    self.bump();
                    TypeArgument::Super(self.reference_type()?)
                }
                Some(_) => TypeArgument::Exact(self.reference_type()?),
            };
            args.push(arg);
        }
        if args.is_empty() {
            return Err(SignatureError::Unbalanced(self.sig.to_owned()));
        }
        Ok(args)
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(c) => write!(f, "{c}"),
            Self::Class(class) => write!(f, "{class}"),
            Self::TypeVar(name) => write!(f, "T{name};"),
            Self::Array(inner) => write!(f, "[{inner}"),
        }
    }
}

impl fmt::Display for ClassTypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("L")?;
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&seg.name)?;
            if !seg.args.is_empty() {
                f.write_str("<")?;
                for arg in &seg.args {
                    match arg {
                        TypeArgument::Any => f.write_str("*")?,
                        TypeArgument::Exact(t) => write!(f, "{t}")?,
                        TypeArgument::Extends(t) => write!(f, "+{t}")?,
                        TypeArgument::Super(t) => write!(f, "-{t}")?,
                    }
                }
                f.write_str(">")?;
            }
        }
        f.write_str(";")
    }
}

fn write_type_params(f: &mut fmt::Formatter<'_>, params: &[TypeParameter]) -> fmt::Result {
    if params.is_empty() {
        return Ok(());
    }
    f.write_str("<")?;
    for tp in params {
        write!(f, "{}:", tp.name)?;
        if let Some(bound) = &tp.class_bound {
            write!(f, "{bound}")?;
        }
        for bound in &tp.interface_bounds {
            write!(f, ":{bound}")?;
        }
    }
    f.write_str(">")
}

impl fmt::Display for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_params(f, &self.type_params)?;
        write!(f, "{}", self.superclass)?;
        for itf in &self.interfaces {
            write!(f, "{itf}")?;
        }
        Ok(())
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type_params(f, &self.type_params)?;
        f.write_str("(")?;
        for p in &self.params {
            write!(f, "{p}")?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{ret}")?,
            None => f.write_str("V")?,
        }
        for t in &self.throws {
            write!(f, "^{t}")?;
        }
        Ok(())
    }
}
