//! Restores record metadata stripped by shrinkers.
//!
//! Obfuscators commonly drop the `Record` attribute and the class `Signature` of records.
//! Without them decompilers render the record as a plain class and `javac` refuses to
//! compile against it. Both can be recovered from what survives: the record's final
//! instance fields and the generic signatures of its members.

use crate::config::RecordFixFlags;
use crate::fixer::ClassFixer;
use indexmap::IndexMap;
use rejar_analysis::inheritance::Inheritance;
use rejar_core::access::AccessFlags;
use rejar_core::attributes::{AttributeBody, Record, RecordComponent};
use rejar_core::class_file::{find_attribute, set_attribute, ClassFile, SIGNATURE};
use rejar_core::descriptor::{BaseType, FieldType, MethodDescriptor};
use rejar_core::signature::{
    parse_field_signature, ClassSignature, ClassTypeSignature, MethodSignature, TypeArgument, TypeParameter,
    TypeSignature,
};
use rejar_utils::errors::TransformError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const RECORD: &str = "java/lang/Record";
const OBJECT: &str = "java/lang/Object";

/// Rebuilds missing record components and generic signatures.
#[derive(Debug)]
pub struct RecordFixer {
    flags: RecordFixFlags,
    inheritance: Arc<Inheritance>,
}

impl RecordFixer {
    pub fn new(flags: RecordFixFlags, inheritance: Arc<Inheritance>) -> Self {
        Self { flags, inheritance }
    }

    /// Adds a `Record` attribute built from the final instance fields.
    ///
    /// Candidates are picked regardless of visibility and made private.
    fn rebuild_components(&self, class: &mut ClassFile) -> Result<bool, TransformError> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for (i, field) in class.fields.iter().enumerate() {
            if !field.access.contains(AccessFlags::FINAL) || field.access.contains(AccessFlags::STATIC) {
                continue;
            }
            let key = (field.name(&class.pool)?, field.descriptor(&class.pool)?);
            if seen.insert(key) {
                candidates.push(i);
            }
        }
        if candidates.is_empty() {
            return Ok(false);
        }

        let mut components = Vec::with_capacity(candidates.len());
        for i in candidates {
            let field = &mut class.fields[i];
            field.access = field.access.with_visibility(AccessFlags::PRIVATE);
            components.push(RecordComponent {
                name: field.name,
                descriptor: field.descriptor,
                attributes: find_attribute(&field.attributes, SIGNATURE).cloned().into_iter().collect(),
            });
        }
        debug!("rebuilt {} record components for {}", components.len(), class.name()?);
        let attr = class.make_typed_attribute(&Record { components })?;
        set_attribute(&mut class.attributes, attr);
        Ok(true)
    }

    /// Declares every type variable the members use, so the class compiles when read from
    /// the classpath.
    fn rebuild_signature(&self, class: &mut ClassFile) -> Result<bool, TransformError> {
        let mut collector = TypeVariableCollector::default();
        let pool = &class.pool;

        if let Some(attr) = class.attribute(Record::NAME) {
            for component in attr.parse_as::<Record>(pool)?.components {
                if let Some(sig) = find_attribute(&component.attributes, SIGNATURE) {
                    let sig = pool.utf8(sig.index_body()?)?;
                    collector.field(sig, pool.utf8(component.descriptor)?)?;
                }
            }
        }
        for field in &class.fields {
            if let Some(sig) = field.signature(pool)? {
                collector.field(sig, field.descriptor(pool)?)?;
            }
        }
        for method in &class.methods {
            if let Some(sig) = method.signature(pool)? {
                collector.method(sig, method.descriptor(pool)?)?;
            }
        }
        if collector.variables.is_empty() {
            return Ok(false);
        }

        let mut type_params = Vec::with_capacity(collector.variables.len());
        for (name, binding) in collector.variables {
            type_params.push(self.type_parameter(name, binding)?);
        }
        let signature = ClassSignature {
            type_params,
            superclass: ClassTypeSignature::simple(RECORD),
            interfaces: class
                .interface_names()?
                .into_iter()
                .map(ClassTypeSignature::simple)
                .collect(),
        }
        .to_string();

        debug!("new signature for {}: {signature}", class.name()?);
        let attr = class.make_utf8_attribute(SIGNATURE, &signature)?;
        set_attribute(&mut class.attributes, attr);
        Ok(true)
    }

    fn type_parameter(&self, name: String, binding: Binding) -> Result<TypeParameter, TransformError> {
        let object = || TypeSignature::Class(ClassTypeSignature::simple(OBJECT));
        let Binding::Known(bound) = binding else {
            return Ok(TypeParameter {
                name,
                class_bound: Some(object()),
                interface_bounds: Vec::new(),
            });
        };
        Ok(match self.inheritance.resolve(&bound)? {
            Some(info) if info.is_interface() => TypeParameter {
                name,
                class_bound: None,
                interface_bounds: vec![TypeSignature::Class(ClassTypeSignature::simple(bound))],
            },
            Some(_) => TypeParameter {
                name,
                class_bound: Some(TypeSignature::Class(ClassTypeSignature::simple(bound))),
                interface_bounds: Vec::new(),
            },
            None => {
                debug!("unable to find information for type {bound}");
                TypeParameter {
                    name,
                    class_bound: Some(object()),
                    interface_bounds: Vec::new(),
                }
            }
        })
    }
}

impl ClassFixer for RecordFixer {
    fn name(&self) -> &'static str {
        "record-fix"
    }

    fn fix(&self, class: &mut ClassFile) -> Result<bool, TransformError> {
        if class.super_name()? != Some(RECORD) {
            return Ok(false);
        }
        let mut changed = false;
        if self.flags.contains(RecordFixFlags::COMPONENTS) {
            let has_components = match class.attribute(Record::NAME) {
                Some(attr) => !attr.parse_as::<Record>(&class.pool)?.components.is_empty(),
                None => false,
            };
            if !has_components {
                changed |= self.rebuild_components(class)?;
            }
        }
        if self.flags.contains(RecordFixFlags::SIGNATURE) && class.signature()?.is_none() {
            changed |= self.rebuild_signature(class)?;
        }
        Ok(changed)
    }
}

/// Candidate bound of a type variable.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    /// Erased type seen where the variable was the whole type of a field, parameter or
    /// return value.
    Known(String),
    /// Only seen nested inside another type.
    Unknown,
}

/// Collects the undeclared type variables of member signatures with a guess at their
/// bound. The first concrete guess sticks; an unknown one is replaced by a later
/// concrete guess.
#[derive(Debug, Default)]
struct TypeVariableCollector {
    variables: IndexMap<String, Binding>,
}

impl TypeVariableCollector {
    fn field(&mut self, signature: &str, descriptor: &str) -> Result<(), TransformError> {
        let sig = parse_field_signature(signature)?;
        let erased = FieldType::parse(descriptor)?;
        self.top_level(&sig, Some(erased), &HashSet::new());
        Ok(())
    }

    fn method(&mut self, signature: &str, descriptor: &str) -> Result<(), TransformError> {
        let sig = MethodSignature::parse(signature)?;
        let erased = MethodDescriptor::parse(descriptor)?;
        let declared: HashSet<&str> = sig.type_params.iter().map(|p| p.name.as_str()).collect();

        for param in &sig.type_params {
            for bound in param.class_bound.iter().chain(&param.interface_bounds) {
                self.nested(bound, &declared);
            }
        }
        for (i, param) in sig.params.iter().enumerate() {
            self.top_level(param, erased.params.get(i).cloned(), &declared);
        }
        if let Some(ret) = &sig.ret {
            self.top_level(ret, erased.ret.clone(), &declared);
        }
        for thrown in &sig.throws {
            self.nested(thrown, &declared);
        }
        Ok(())
    }

    fn top_level(&mut self, sig: &TypeSignature, erased: Option<FieldType>, declared: &HashSet<&str>) {
        match sig {
            TypeSignature::Base(_) => {}
            TypeSignature::TypeVar(name) => {
                let candidate = erased.and_then(|e| match (&e.base, e.dimensions) {
                    (BaseType::Primitive(_), 0) => None,
                    _ => Some(e.internal_name()),
                });
                self.bind(name, candidate, declared);
            }
            TypeSignature::Array(inner) => {
                let element = erased.filter(FieldType::is_array).map(|e| FieldType {
                    dimensions: e.dimensions - 1,
                    base: e.base,
                });
                self.top_level(inner, element, declared);
            }
            TypeSignature::Class(_) => self.nested(sig, declared),
        }
    }

    fn nested(&mut self, sig: &TypeSignature, declared: &HashSet<&str>) {
        match sig {
            TypeSignature::Base(_) => {}
            TypeSignature::TypeVar(name) => self.bind(name, None, declared),
            TypeSignature::Array(inner) => self.nested(inner, declared),
            TypeSignature::Class(class) => {
                for arg in class.segments.iter().flat_map(|s| &s.args) {
                    match arg {
                        TypeArgument::Any => {}
                        TypeArgument::Exact(t) | TypeArgument::Extends(t) | TypeArgument::Super(t) => {
                            self.nested(t, declared);
                        }
                    }
                }
            }
        }
    }

    fn bind(&mut self, name: &str, candidate: Option<String>, declared: &HashSet<&str>) {
        if declared.contains(name) {
            return;
        }
        if matches!(self.variables.get(name), Some(Binding::Known(_))) {
            return;
        }
        match candidate {
            Some(known) => {
                self.variables.insert(name.to_owned(), Binding::Known(known));
            }
            None => {
                self.variables.entry(name.to_owned()).or_insert(Binding::Unknown);
            }
        }
    }
}
