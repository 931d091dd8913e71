//! Inheritance-aware identifier remapping.
//!
//! The mapping table only knows the class that declares a member. Call sites, overrides
//! and inherited accesses name other owners, so member lookups walk the type hierarchy
//! until they find an ancestor that both declares the member and has a mapping for it.

use dashmap::DashMap;
use rejar_analysis::inheritance::{ClassInfo, Inheritance};
use rejar_core::access::AccessFlags;
use rejar_core::descriptor::remap_descriptor;
use rejar_core::mapping::Mappings;
use rejar_core::signature::{remap_signature, SignatureKind};
use rejar_utils::errors::TransformError;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MemberKind {
    Field,
    Method,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemberKey {
    kind: MemberKind,
    owner: String,
    name: String,
    descriptor: String,
}

/// Applies a [`Mappings`] table with hierarchy-aware member resolution.
#[derive(Debug)]
pub struct Remapper {
    mappings: Arc<Mappings>,
    inheritance: Arc<Inheritance>,
    members: DashMap<MemberKey, Option<String>>,
}

impl Remapper {
    pub fn new(mappings: Arc<Mappings>, inheritance: Arc<Inheritance>) -> Self {
        Self {
            mappings,
            inheritance,
            members: DashMap::new(),
        }
    }

    /// Maps a binary class name. Unmapped nested classes follow their renamed outer class.
    pub fn map_class(&self, name: &str) -> String {
        self.mappings.remap_class(name)
    }

    /// Maps the name held by a `CONSTANT_Class`, which is a descriptor for array types.
    pub fn map_class_constant(&self, name: &str) -> Result<String, TransformError> {
        if name.starts_with('[') {
            Ok(self.map_descriptor(name)?)
        } else {
            Ok(self.map_class(name))
        }
    }

    pub fn map_descriptor(&self, descriptor: &str) -> Result<String, TransformError> {
        Ok(remap_descriptor(descriptor, |n| self.map_class(n))?)
    }

    pub fn map_signature(&self, signature: &str, kind: SignatureKind) -> Result<String, TransformError> {
        Ok(remap_signature(signature, kind, |n| self.map_class(n))?)
    }

    pub fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> Result<String, TransformError> {
        self.map_member(MemberKind::Method, owner, name, descriptor)
    }

    pub fn map_field(&self, owner: &str, name: &str, descriptor: &str) -> Result<String, TransformError> {
        self.map_member(MemberKind::Field, owner, name, descriptor)
    }

    /// Name for the local at `slot` of a method, `default` when the mapping has none.
    pub fn map_parameter(&self, owner: &str, method: &str, descriptor: &str, slot: u16, default: &str) -> String {
        self.mappings
            .parameter_name(owner, method, descriptor, slot)
            .unwrap_or(default)
            .to_owned()
    }

    /// New simple name for an `InnerClasses` entry.
    ///
    /// When the renamed class still ends in the same simple name the original is kept;
    /// otherwise the part after the last `$` is used, skipping the digits of local class
    /// names.
    pub fn map_inner_name(&self, name: &str, inner_name: &str) -> String {
        let mapped = self.map_class(name);
        if mapped == name {
            return inner_name.to_owned();
        }
        if let (Some(a), Some(b)) = (name.rfind('/'), mapped.rfind('/')) {
            if name[a..] == mapped[b..] {
                return inner_name.to_owned();
            }
        }
        match mapped.rfind('$') {
            Some(pos) => mapped[pos + 1..]
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .to_owned(),
            None => inner_name.to_owned(),
        }
    }

    fn map_member(&self, kind: MemberKind, owner: &str, name: &str, descriptor: &str) -> Result<String, TransformError> {
        if name == "<init>" || name == "<clinit>" || owner.starts_with('[') {
            return Ok(name.to_owned());
        }
        let key = MemberKey {
            kind,
            owner: owner.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        };
        if let Some(hit) = self.members.get(&key) {
            return Ok(hit.value().clone().unwrap_or_else(|| name.to_owned()));
        }
        let resolved = self.resolve_member(kind, owner, name, descriptor)?;
        if let Some(mapped) = &resolved {
            debug!("{owner}.{name}{descriptor} -> {mapped}");
        }
        let out = resolved.clone().unwrap_or_else(|| name.to_owned());
        self.members.insert(key, resolved);
        Ok(out)
    }

    fn lookup(&self, kind: MemberKind, owner: &str, name: &str, descriptor: &str) -> Option<String> {
        match kind {
            MemberKind::Method => self.mappings.method_name(owner, name, descriptor),
            MemberKind::Field => self.mappings.field_name(owner, name, Some(descriptor)),
        }
        .map(str::to_owned)
    }

    fn resolve_member(
        &self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Option<String>, TransformError> {
        if let Some(direct) = self.lookup(kind, owner, name, descriptor) {
            return Ok(Some(direct));
        }
        let inherited = self.inheritance.walk_ancestors(owner, |ancestor: &ClassInfo| {
            let declared = match kind {
                MemberKind::Method => ancestor.method(name, descriptor),
                MemberKind::Field => ancestor.field(name, Some(descriptor)),
            }?;
            if declared.access.contains(AccessFlags::PRIVATE) {
                return None;
            }
            self.lookup(kind, &ancestor.name, name, descriptor)
        })?;
        Ok(inherited)
    }
}
