//! Identifier mappings: class, field, method and parameter renames.

mod loader;

pub use loader::{load, parse, write_tsrg2};

use crate::descriptor::remap_descriptor;
use indexmap::IndexMap;
use rejar_utils::errors::MappingError;

/// A complete rename table. Classes keep the order they were declared in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings {
    classes: IndexMap<String, ClassMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapping {
    pub original: String,
    pub mapped: String,
    /// Keyed by original field name.
    pub fields: IndexMap<String, FieldMapping>,
    /// Keyed by original `(name, descriptor)`.
    pub methods: IndexMap<(String, String), MethodMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub original: String,
    pub mapped: String,
    /// Only some formats carry field descriptors.
    pub descriptor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMapping {
    pub original: String,
    pub descriptor: String,
    pub mapped: String,
    pub params: Vec<ParamMapping>,
}

/// A parameter rename, keyed by local-variable slot (`this` is slot 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMapping {
    pub slot: u16,
    pub original: String,
    pub mapped: String,
}

impl ClassMapping {
    pub fn new(original: impl Into<String>, mapped: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            mapped: mapped.into(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }

    pub fn add_field(&mut self, original: &str, mapped: &str, descriptor: Option<&str>) {
        self.fields.insert(
            original.to_owned(),
            FieldMapping {
                original: original.to_owned(),
                mapped: mapped.to_owned(),
                descriptor: descriptor.map(str::to_owned),
            },
        );
    }

    pub fn add_method(&mut self, original: &str, descriptor: &str, mapped: &str) -> &mut MethodMapping {
        self.methods
            .entry((original.to_owned(), descriptor.to_owned()))
            .and_modify(|m| m.mapped = mapped.to_owned())
            .or_insert_with(|| MethodMapping {
                original: original.to_owned(),
                descriptor: descriptor.to_owned(),
                mapped: mapped.to_owned(),
                params: Vec::new(),
            })
    }

    pub fn field(&self, name: &str, descriptor: Option<&str>) -> Option<&FieldMapping> {
        let field = self.fields.get(name)?;
        match (&field.descriptor, descriptor) {
            (Some(known), Some(wanted)) if known != wanted => None,
            _ => Some(field),
        }
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodMapping> {
        self.methods.get(&(name.to_owned(), descriptor.to_owned()))
    }
}

impl MethodMapping {
    pub fn add_param(&mut self, slot: u16, original: &str, mapped: &str) {
        self.params.retain(|p| p.slot != slot);
        self.params.push(ParamMapping {
            slot,
            original: original.to_owned(),
            mapped: mapped.to_owned(),
        });
    }

    pub fn param(&self, slot: u16) -> Option<&ParamMapping> {
        self.params.iter().find(|p| p.slot == slot)
    }
}

impl Mappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassMapping> + '_ {
        self.classes.values()
    }

    /// Declares a class rename, replacing the target of an earlier declaration but
    /// keeping its members.
    pub fn add_class(&mut self, original: &str, mapped: &str) -> &mut ClassMapping {
        self.classes
            .entry(original.to_owned())
            .and_modify(|c| c.mapped = mapped.to_owned())
            .or_insert_with(|| ClassMapping::new(original, mapped))
    }

    /// The mapping for `original`, created as an identity rename when absent.
    pub fn class_mut(&mut self, original: &str) -> &mut ClassMapping {
        self.classes
            .entry(original.to_owned())
            .or_insert_with(|| ClassMapping::new(original, original))
    }

    pub fn class(&self, original: &str) -> Option<&ClassMapping> {
        self.classes.get(original)
    }

    /// Direct class lookup, no nesting fallback.
    pub fn class_name(&self, original: &str) -> Option<&str> {
        self.classes.get(original).map(|c| c.mapped.as_str())
    }

    pub fn field_name(&self, owner: &str, name: &str, descriptor: Option<&str>) -> Option<&str> {
        self.class(owner)?
            .field(name, descriptor)
            .map(|f| f.mapped.as_str())
    }

    pub fn method_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        self.class(owner)?
            .method(name, descriptor)
            .map(|m| m.mapped.as_str())
    }

    pub fn parameter_name(&self, owner: &str, method: &str, descriptor: &str, slot: u16) -> Option<&str> {
        self.class(owner)?
            .method(method, descriptor)?
            .param(slot)
            .map(|p| p.mapped.as_str())
    }

    /// Maps a class name through the table, falling back to the renamed outer class for
    /// nested classes that have no entry of their own.
    pub fn remap_class(&self, name: &str) -> String {
        if let Some(mapped) = self.class_name(name) {
            return mapped.to_owned();
        }
        if let Some((outer, inner)) = name.rsplit_once('$') {
            let outer = self.remap_class(outer);
            return format!("{outer}${inner}");
        }
        name.to_owned()
    }

    /// The inverse table. Member descriptors are carried into the target namespace so
    /// the inverse can be applied to already renamed classes.
    pub fn reverse(&self) -> Result<Self, MappingError> {
        let mut reversed = Self::new();
        for class in self.classes.values() {
            let target = reversed.add_class(&class.mapped, &class.original);
            for field in class.fields.values() {
                let descriptor = field
                    .descriptor
                    .as_deref()
                    .map(|d| remap_descriptor(d, |n| self.remap_class(n)))
                    .transpose()?;
                target.add_field(&field.mapped, &field.original, descriptor.as_deref());
            }
            for method in class.methods.values() {
                let descriptor = remap_descriptor(&method.descriptor, |n| self.remap_class(n))?;
                let m = target.add_method(&method.mapped, &descriptor, &method.original);
                for p in &method.params {
                    m.add_param(p.slot, &p.mapped, &p.original);
                }
            }
        }
        Ok(reversed)
    }
}
