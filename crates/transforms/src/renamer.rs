//! Whole-class renaming.
//!
//! Every rewrite reads names from a snapshot of the original constant pool and writes
//! new entries into the live pool. Class entries are redirected in place so their
//! indices stay valid for code operands; changed member references get a fresh
//! `NameAndType` and changed strings are appended, so nothing an unparsed attribute
//! points at ever moves or changes meaning.

use crate::remapper::Remapper;
use crate::Transformer;
use dashmap::DashSet;
use rejar_core::access::AccessFlags;
use rejar_core::archive::{stable_timestamp, ClassEntry, Entry, ResourceEntry};
use rejar_core::attributes::{
    Annotation, AnnotationDefault, AttributeBody, BootstrapMethods, Code, ElementValue, EnclosingMethod,
    InnerClasses, LocalVariableTable, LocalVariableTypeTable, MethodParameters, ParameterAnnotations, Record,
};
use rejar_core::attributes::Annotations;
use rejar_core::class_file::{find_attribute, Attribute, ClassFile, Member, SIGNATURE};
use rejar_core::constant_pool::{Constant, ConstantPool};
use rejar_core::descriptor::{BaseType, FieldType, MethodDescriptor};
use rejar_core::signature::SignatureKind;
use rejar_utils::errors::TransformError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Resource holding parameter names of abstract and native methods, read by decompilers.
pub const ABSTRACT_PARAMETER_NAMES: &str = "fernflower_abstract_parameter_names.txt";

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";

/// Applies a [`Remapper`] to every class of an archive.
#[derive(Debug)]
pub struct RenamingTransformer {
    remapper: Arc<Remapper>,
    abstract_params: DashSet<String>,
    changed: AtomicUsize,
}

impl RenamingTransformer {
    pub fn new(remapper: Arc<Remapper>) -> Self {
        Self {
            remapper,
            abstract_params: DashSet::new(),
            changed: AtomicUsize::new(0),
        }
    }

    /// Records the parameter names of abstract and native methods, which have no local
    /// variable table to carry them.
    fn store_abstract_params(&self, class: &ClassFile) -> Result<(), TransformError> {
        let owner = class.name()?;
        for method in &class.methods {
            if !method.access.intersects(AccessFlags::ABSTRACT | AccessFlags::NATIVE) {
                continue;
            }
            let name = method.name(&class.pool)?;
            let desc = method.descriptor(&class.pool)?;
            let parsed = MethodDescriptor::parse(desc)?;
            if parsed.params.is_empty() {
                continue;
            }
            let names: Vec<String> = parsed
                .param_slot_indices(method.access.contains(AccessFlags::STATIC))
                .into_iter()
                .map(|slot| {
                    self.remapper
                        .map_parameter(owner, name, desc, slot, &format!("var{slot}"))
                })
                .collect();
            self.abstract_params.insert(format!(
                "{} {} {} {}",
                self.remapper.map_class(owner),
                self.remapper.map_method(owner, name, desc)?,
                self.remapper.map_descriptor(desc)?,
                names.join(" ")
            ));
        }
        Ok(())
    }
}

impl Transformer for RenamingTransformer {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn process_class(&self, entry: ClassEntry) -> Result<Option<ClassEntry>, TransformError> {
        let mut class = ClassFile::parse(&entry.data)?;
        self.store_abstract_params(&class)?;

        let source = class.pool.clone();
        let owner = source.class_name(class.this_class)?.to_owned();
        ClassRewriter {
            remapper: &self.remapper,
            source: &source,
            class: &mut class,
            owner: &owner,
        }
        .rewrite()?;

        let data = class.to_bytes();
        if data == entry.data {
            return Ok(Some(entry));
        }
        let name = self.remapper.map_class(&owner);
        debug!("renamed {owner} -> {name}");
        self.changed.fetch_add(1, Ordering::Relaxed);
        Ok(Some(entry.with_data(name, data)))
    }

    fn process_resource(&self, entry: ResourceEntry) -> Result<Option<ResourceEntry>, TransformError> {
        if entry.path == ABSTRACT_PARAMETER_NAMES {
            debug!("dropping stale {ABSTRACT_PARAMETER_NAMES}");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn extras(&self) -> Vec<Entry> {
        if self.abstract_params.is_empty() {
            return Vec::new();
        }
        let mut lines: Vec<String> = self.abstract_params.iter().map(|l| l.key().clone()).collect();
        lines.sort();
        vec![Entry::Resource(ResourceEntry::new(
            ABSTRACT_PARAMETER_NAMES,
            lines.join("\n").into_bytes(),
            stable_timestamp(),
        ))]
    }

    fn changed(&self) -> usize {
        self.changed.load(Ordering::Relaxed)
    }
}

/// Where an attribute list sits, which decides how its entries are interpreted.
#[derive(Debug, Clone, Copy)]
enum Site<'a> {
    Class,
    Field,
    Method {
        name: &'a str,
        descriptor: &'a str,
        is_static: bool,
    },
    Component,
}

impl Site<'_> {
    const fn signature_kind(&self) -> SignatureKind {
        match self {
            Self::Class => SignatureKind::Class,
            Self::Method { .. } => SignatureKind::Method,
            Self::Field | Self::Component => SignatureKind::Field,
        }
    }
}

struct ClassRewriter<'a> {
    remapper: &'a Remapper,
    /// The pool as it was parsed; all original names are read from here.
    source: &'a ConstantPool,
    class: &'a mut ClassFile,
    owner: &'a str,
}

impl<'a> ClassRewriter<'a> {
    fn rewrite(mut self) -> Result<(), TransformError> {
        self.rewrite_pool()?;

        let mut fields = std::mem::take(&mut self.class.fields);
        for field in &mut fields {
            self.rewrite_field(field)?;
        }
        self.class.fields = fields;

        let mut methods = std::mem::take(&mut self.class.methods);
        for method in &mut methods {
            self.rewrite_method(method)?;
        }
        self.class.methods = methods;

        let mut attributes = std::mem::take(&mut self.class.attributes);
        self.rewrite_attributes(&mut attributes, Site::Class)?;
        self.class.attributes = attributes;
        Ok(())
    }

    fn rewrite_pool(&mut self) -> Result<(), TransformError> {
        let source = self.source;
        let bootstrap = match find_attribute(&self.class.attributes, BootstrapMethods::NAME) {
            Some(attr) => Some(attr.parse_as::<BootstrapMethods>(source)?),
            None => None,
        };

        for (index, constant) in source.iter() {
            match *constant {
                Constant::Class { name } => {
                    let old = source.utf8(name)?;
                    let new = self.remapper.map_class_constant(old)?;
                    if new != old {
                        let name = self.class.pool.put_utf8(&new)?;
                        self.class.pool.set(index, Constant::Class { name })?;
                    }
                }
                Constant::FieldRef { class, name_and_type } => {
                    let owner = source.class_name(class)?;
                    let (name, desc) = source.name_and_type(name_and_type)?;
                    let new_name = self.remapper.map_field(owner, name, desc)?;
                    if let Some(name_and_type) = self.retarget(name_and_type, &new_name)? {
                        self.class.pool.set(index, Constant::FieldRef { class, name_and_type })?;
                    }
                }
                Constant::MethodRef { class, name_and_type } => {
                    let owner = source.class_name(class)?;
                    let (name, desc) = source.name_and_type(name_and_type)?;
                    let new_name = self.remapper.map_method(owner, name, desc)?;
                    if let Some(name_and_type) = self.retarget(name_and_type, &new_name)? {
                        self.class.pool.set(index, Constant::MethodRef { class, name_and_type })?;
                    }
                }
                Constant::InterfaceMethodRef { class, name_and_type } => {
                    let owner = source.class_name(class)?;
                    let (name, desc) = source.name_and_type(name_and_type)?;
                    let new_name = self.remapper.map_method(owner, name, desc)?;
                    if let Some(name_and_type) = self.retarget(name_and_type, &new_name)? {
                        self.class
                            .pool
                            .set(index, Constant::InterfaceMethodRef { class, name_and_type })?;
                    }
                }
                Constant::MethodType { descriptor } => {
                    let new = self.descriptor(descriptor)?;
                    if new != descriptor {
                        self.class.pool.set(index, Constant::MethodType { descriptor: new })?;
                    }
                }
                Constant::InvokeDynamic {
                    bootstrap: method,
                    name_and_type,
                } => {
                    let (name, desc) = source.name_and_type(name_and_type)?;
                    let new_name = match &bootstrap {
                        Some(table) => self.lambda_name(table, method, name, desc)?,
                        None => None,
                    };
                    let new_name = new_name.unwrap_or_else(|| name.to_owned());
                    if let Some(name_and_type) = self.retarget(name_and_type, &new_name)? {
                        self.class.pool.set(
                            index,
                            Constant::InvokeDynamic {
                                bootstrap: method,
                                name_and_type,
                            },
                        )?;
                    }
                }
                Constant::Dynamic {
                    bootstrap: method,
                    name_and_type,
                } => {
                    let (name, _) = source.name_and_type(name_and_type)?;
                    if let Some(name_and_type) = self.retarget(name_and_type, name)? {
                        self.class.pool.set(
                            index,
                            Constant::Dynamic {
                                bootstrap: method,
                                name_and_type,
                            },
                        )?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// New `NameAndType` for a reference, `None` when neither name nor descriptor change.
    fn retarget(&mut self, name_and_type: u16, new_name: &str) -> Result<Option<u16>, TransformError> {
        let source = self.source;
        let (name, desc) = source.name_and_type(name_and_type)?;
        let new_desc = self.remapper.map_descriptor(desc)?;
        if name == new_name && desc == new_desc {
            return Ok(None);
        }
        Ok(Some(self.class.pool.put_name_and_type(new_name, &new_desc)?))
    }

    /// The functional interface method implemented by a `LambdaMetafactory` call site.
    ///
    /// The interface is the return type of the call site descriptor and the erased method
    /// type is the first bootstrap argument.
    fn lambda_name(
        &self,
        table: &BootstrapMethods,
        method: u16,
        name: &str,
        desc: &str,
    ) -> Result<Option<String>, TransformError> {
        let source = self.source;
        let Some(bsm) = table.methods.get(method as usize) else {
            return Ok(None);
        };
        let Constant::MethodHandle { reference, .. } = *source.get(bsm.method_ref)? else {
            return Ok(None);
        };
        let factory = source.member_ref(reference)?;
        if factory.owner != LAMBDA_METAFACTORY || !matches!(factory.name, "metafactory" | "altMetafactory") {
            return Ok(None);
        }
        let Some(&first) = bsm.arguments.first() else {
            return Ok(None);
        };
        let Constant::MethodType { descriptor } = *source.get(first)? else {
            return Ok(None);
        };
        let interface = match MethodDescriptor::parse(desc)?.ret {
            Some(FieldType {
                dimensions: 0,
                base: BaseType::Object(interface),
            }) => interface,
            _ => return Ok(None),
        };
        let sam = source.utf8(descriptor)?;
        Ok(Some(self.remapper.map_method(&interface, name, sam)?))
    }

    fn rewrite_field(&mut self, field: &mut Member) -> Result<(), TransformError> {
        let source = self.source;
        let name = source.utf8(field.name)?;
        let desc = source.utf8(field.descriptor)?;
        let new_name = self.remapper.map_field(self.owner, name, desc)?;
        field.name = self.replace_utf8(field.name, &new_name)?;
        field.descriptor = self.descriptor(field.descriptor)?;
        self.rewrite_attributes(&mut field.attributes, Site::Field)
    }

    fn rewrite_method(&mut self, method: &mut Member) -> Result<(), TransformError> {
        let source = self.source;
        let name = source.utf8(method.name)?;
        let desc = source.utf8(method.descriptor)?;
        let new_name = self.remapper.map_method(self.owner, name, desc)?;
        method.name = self.replace_utf8(method.name, &new_name)?;
        method.descriptor = self.descriptor(method.descriptor)?;
        let site = Site::Method {
            name,
            descriptor: desc,
            is_static: method.access.contains(AccessFlags::STATIC),
        };
        self.rewrite_attributes(&mut method.attributes, site)
    }

    fn rewrite_attributes(&mut self, attributes: &mut [Attribute], site: Site<'_>) -> Result<(), TransformError> {
        let source = self.source;
        for attr in attributes.iter_mut() {
            let info = match attr.name.as_str() {
                SIGNATURE => {
                    let index = attr.index_body()?;
                    let old = source.utf8(index)?;
                    let new = self.remapper.map_signature(old, site.signature_kind())?;
                    self.replace_utf8(index, &new)?.to_be_bytes().to_vec()
                }
                Annotations::VISIBLE | Annotations::INVISIBLE => {
                    let mut body = Annotations::parse(&attr.info)?;
                    for a in &mut body.annotations {
                        self.rewrite_annotation(a)?;
                    }
                    body.to_bytes()
                }
                ParameterAnnotations::VISIBLE | ParameterAnnotations::INVISIBLE => {
                    let mut body = ParameterAnnotations::parse(&attr.info)?;
                    for a in body.params.iter_mut().flatten() {
                        self.rewrite_annotation(a)?;
                    }
                    body.to_bytes()
                }
                AnnotationDefault::NAME => {
                    let mut body = attr.parse_as::<AnnotationDefault>(source)?;
                    self.rewrite_element(&mut body.value)?;
                    body.to_bytes()
                }
                Code::NAME => {
                    let mut body = attr.parse_as::<Code>(source)?;
                    self.rewrite_code_attributes(&mut body.attributes, site)?;
                    body.to_bytes()
                }
                MethodParameters::NAME => self.rewrite_method_parameters(attr, site)?,
                Record::NAME => {
                    let mut body = attr.parse_as::<Record>(source)?;
                    for component in &mut body.components {
                        let name = source.utf8(component.name)?;
                        let desc = source.utf8(component.descriptor)?;
                        let new_name = self.remapper.map_field(self.owner, name, desc)?;
                        component.name = self.replace_utf8(component.name, &new_name)?;
                        component.descriptor = self.descriptor(component.descriptor)?;
                        self.rewrite_attributes(&mut component.attributes, Site::Component)?;
                    }
                    body.to_bytes()
                }
                InnerClasses::NAME => {
                    let mut body = attr.parse_as::<InnerClasses>(source)?;
                    for inner in &mut body.classes {
                        if inner.inner_name == 0 {
                            continue;
                        }
                        let class = source.class_name(inner.inner_class)?;
                        let simple = source.utf8(inner.inner_name)?;
                        let new = self.remapper.map_inner_name(class, simple);
                        inner.inner_name = self.replace_utf8(inner.inner_name, &new)?;
                    }
                    body.to_bytes()
                }
                EnclosingMethod::NAME => {
                    let mut body = attr.parse_as::<EnclosingMethod>(source)?;
                    if body.method != 0 {
                        let class = source.class_name(body.class)?;
                        let (name, desc) = source.name_and_type(body.method)?;
                        let new_name = self.remapper.map_method(class, name, desc)?;
                        if let Some(method) = self.retarget(body.method, &new_name)? {
                            body.method = method;
                        }
                    }
                    body.to_bytes()
                }
                _ => continue,
            };
            if info != attr.info {
                attr.info = info;
            }
        }
        Ok(())
    }

    /// Rewrites the attributes nested in a method's `Code`.
    fn rewrite_code_attributes(&mut self, attributes: &mut [Attribute], site: Site<'_>) -> Result<(), TransformError> {
        let source = self.source;
        let Site::Method {
            name: method,
            descriptor,
            is_static,
        } = site
        else {
            return Ok(());
        };
        let params = MethodDescriptor::parse(descriptor)?.param_slot_indices(is_static);

        for attr in attributes.iter_mut() {
            let info = match attr.name.as_str() {
                LocalVariableTable::NAME => {
                    let mut body = attr.parse_as::<LocalVariableTable>(source)?;
                    for var in &mut body.entries {
                        if var.start_pc == 0 && params.contains(&var.index) {
                            let old = source.utf8(var.name)?;
                            let new = self
                                .remapper
                                .map_parameter(self.owner, method, descriptor, var.index, old);
                            var.name = self.replace_utf8(var.name, &new)?;
                        }
                        var.descriptor = self.descriptor(var.descriptor)?;
                    }
                    body.to_bytes()
                }
                LocalVariableTypeTable::NAME => {
                    let mut body = attr.parse_as::<LocalVariableTypeTable>(source)?;
                    for var in &mut body.entries {
                        if var.start_pc == 0 && params.contains(&var.index) {
                            let old = source.utf8(var.name)?;
                            let new = self
                                .remapper
                                .map_parameter(self.owner, method, descriptor, var.index, old);
                            var.name = self.replace_utf8(var.name, &new)?;
                        }
                        let old = source.utf8(var.descriptor)?;
                        let new = self.remapper.map_signature(old, SignatureKind::Field)?;
                        var.descriptor = self.replace_utf8(var.descriptor, &new)?;
                    }
                    body.to_bytes()
                }
                _ => continue,
            };
            if info != attr.info {
                attr.info = info;
            }
        }
        Ok(())
    }

    fn rewrite_method_parameters(&mut self, attr: &Attribute, site: Site<'_>) -> Result<Vec<u8>, TransformError> {
        let source = self.source;
        let mut body = attr.parse_as::<MethodParameters>(source)?;
        let Site::Method {
            name: method,
            descriptor,
            is_static,
        } = site
        else {
            return Ok(body.to_bytes());
        };
        let slots = MethodDescriptor::parse(descriptor)?.param_slot_indices(is_static);
        for (param, slot) in body.params.iter_mut().zip(slots) {
            if param.name == 0 {
                continue;
            }
            let old = source.utf8(param.name)?;
            let new = self.remapper.map_parameter(self.owner, method, descriptor, slot, old);
            param.name = self.replace_utf8(param.name, &new)?;
        }
        Ok(body.to_bytes())
    }

    fn rewrite_annotation(&mut self, annotation: &mut Annotation) -> Result<(), TransformError> {
        annotation.type_index = self.descriptor(annotation.type_index)?;
        for (_, value) in &mut annotation.elements {
            self.rewrite_element(value)?;
        }
        Ok(())
    }

    fn rewrite_element(&mut self, value: &mut ElementValue) -> Result<(), TransformError> {
        let source = self.source;
        match value {
            ElementValue::Const { .. } => {}
            ElementValue::Enum {
                type_name,
                const_name,
            } => {
                let desc = source.utf8(*type_name)?;
                let constant = source.utf8(*const_name)?;
                let owner = FieldType::parse(desc)?.internal_name();
                let new = self.remapper.map_field(&owner, constant, desc)?;
                *const_name = self.replace_utf8(*const_name, &new)?;
                *type_name = self.descriptor(*type_name)?;
            }
            ElementValue::Class(index) => {
                if source.utf8(*index)? != "V" {
                    *index = self.descriptor(*index)?;
                }
            }
            ElementValue::Annotation(nested) => self.rewrite_annotation(nested)?,
            ElementValue::Array(values) => {
                for v in values {
                    self.rewrite_element(v)?;
                }
            }
        }
        Ok(())
    }

    /// Remaps the descriptor stored at `index`.
    fn descriptor(&mut self, index: u16) -> Result<u16, TransformError> {
        let source = self.source;
        let old = source.utf8(index)?;
        let new = self.remapper.map_descriptor(old)?;
        self.replace_utf8(index, &new)
    }

    /// Index of a Utf8 entry holding `new`; the original index when the value is unchanged.
    fn replace_utf8(&mut self, index: u16, new: &str) -> Result<u16, TransformError> {
        let source = self.source;
        if source.utf8(index)? == new {
            return Ok(index);
        }
        Ok(self.class.pool.put_utf8(new)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rejar_analysis::inheritance::{Inheritance, MemoryProvider};
    use rejar_core::mapping::parse;

    const MAPPING: &str = "tsrg2 left right
a net/Foo
\tf I value
\tm (La;I)V run
\t\t1 p0 other
\t\t2 p1 count
b net/Bar
";

    fn transformer(text: &str, classes: &[&ClassFile]) -> RenamingTransformer {
        let mut provider = MemoryProvider::new();
        for c in classes {
            provider.insert(c.name().unwrap(), c.to_bytes());
        }
        let inheritance = Arc::new(Inheritance::new().with_provider(provider));
        let mappings = Arc::new(parse(text).unwrap());
        RenamingTransformer::new(Arc::new(Remapper::new(mappings, inheritance)))
    }

    fn entry(class: &ClassFile) -> ClassEntry {
        ClassEntry::new(class.name().unwrap(), class.to_bytes(), stable_timestamp(), None)
    }

    fn sample() -> ClassFile {
        let mut class = ClassFile::new(AccessFlags::PUBLIC, "a", Some("java/lang/Object")).unwrap();
        class.add_field(AccessFlags::PRIVATE, "f", "I").unwrap();
        let m = class.add_method(AccessFlags::PUBLIC, "m", "(La;I)V").unwrap();
        let sig = class.make_utf8_attribute(SIGNATURE, "(La;I)V").unwrap();
        class.methods[m].attributes.push(sig);
        class.add_field_ref("a", "f", "I").unwrap();
        class.add_method_ref("b", "m", "(La;I)V", false).unwrap();
        class
    }

    #[test]
    fn renames_class_members_and_references() {
        let class = sample();
        let stage = transformer(MAPPING, &[&class]);
        let out = stage.process_class(entry(&class)).unwrap().unwrap();
        assert_eq!(out.name, "net/Foo");
        assert_eq!(stage.changed(), 1);

        let renamed = ClassFile::parse(&out.data).unwrap();
        let pool = &renamed.pool;
        assert_eq!(renamed.name().unwrap(), "net/Foo");
        assert_eq!(renamed.fields[0].name(pool).unwrap(), "value");
        assert_eq!(renamed.methods[0].name(pool).unwrap(), "run");
        assert_eq!(renamed.methods[0].descriptor(pool).unwrap(), "(Lnet/Foo;I)V");
        assert_eq!(renamed.methods[0].signature(pool).unwrap(), Some("(Lnet/Foo;I)V"));

        let refs: Vec<_> = pool
            .iter()
            .filter(|(_, c)| matches!(c, Constant::FieldRef { .. } | Constant::MethodRef { .. }))
            .map(|(i, _)| pool.member_ref(i).unwrap())
            .map(|r| (r.owner.to_owned(), r.name.to_owned(), r.descriptor.to_owned()))
            .collect();
        assert_eq!(
            refs,
            vec![
                ("net/Foo".to_owned(), "value".to_owned(), "I".to_owned()),
                // b has no mapping for m, so only the descriptor follows the class rename
                ("net/Bar".to_owned(), "m".to_owned(), "(Lnet/Foo;I)V".to_owned()),
            ]
        );
    }

    #[test]
    fn untouched_class_is_passed_through() {
        let class = ClassFile::new(AccessFlags::PUBLIC, "z/Keep", Some("java/lang/Object")).unwrap();
        let stage = transformer(MAPPING, &[&class]);
        let input = entry(&class);
        let out = stage.process_class(input.clone()).unwrap().unwrap();
        assert_eq!(out, input);
        assert_eq!(stage.changed(), 0);
        assert!(stage.extras().is_empty());
    }

    #[test]
    fn abstract_parameter_names_are_collected() {
        let mut class = ClassFile::new(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "a", Some("java/lang/Object")).unwrap();
        class
            .add_method(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "m", "(La;I)V")
            .unwrap();
        class
            .add_method(AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::NATIVE, "n", "(JI)V")
            .unwrap();
        class
            .add_method(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "none", "()V")
            .unwrap();
        let stage = transformer(MAPPING, &[&class]);
        stage.process_class(entry(&class)).unwrap();

        let extras = stage.extras();
        assert_eq!(extras.len(), 1);
        assert_eq!(extras[0].path(), ABSTRACT_PARAMETER_NAMES);
        assert_eq!(extras[0].time(), stable_timestamp());
        assert_eq!(
            String::from_utf8(extras[0].data().to_vec()).unwrap(),
            "net/Foo n (JI)V var0 var2\nnet/Foo run (Lnet/Foo;I)V other count"
        );
    }

    #[test]
    fn stale_parameter_names_resource_is_dropped() {
        let stage = transformer(MAPPING, &[]);
        let stale = ResourceEntry::new(ABSTRACT_PARAMETER_NAMES, b"x".to_vec(), stable_timestamp());
        assert!(stage.process_resource(stale).unwrap().is_none());
        let other = ResourceEntry::new("data/a.txt", b"x".to_vec(), stable_timestamp());
        assert!(stage.process_resource(other).unwrap().is_some());
    }

    #[test]
    fn inherited_call_site_uses_declaring_class_mapping() {
        let mut base = ClassFile::new(AccessFlags::PUBLIC, "a", Some("java/lang/Object")).unwrap();
        base.add_method(AccessFlags::PUBLIC, "m", "(La;I)V").unwrap();
        let sub = ClassFile::new(AccessFlags::PUBLIC, "c", Some("a")).unwrap();
        let mut caller = ClassFile::new(AccessFlags::PUBLIC, "d", Some("java/lang/Object")).unwrap();
        caller.add_method_ref("c", "m", "(La;I)V", false).unwrap();

        let stage = transformer(MAPPING, &[&base, &sub, &caller]);
        let out = stage.process_class(entry(&caller)).unwrap().unwrap();
        let renamed = ClassFile::parse(&out.data).unwrap();
        let (_, target) = renamed
            .pool
            .iter()
            .find(|(_, c)| matches!(c, Constant::MethodRef { .. }))
            .unwrap();
        let Constant::MethodRef { name_and_type, .. } = *target else { unreachable!() };
        assert_eq!(renamed.pool.name_and_type(name_and_type).unwrap(), ("run", "(Lnet/Foo;I)V"));
    }
}
