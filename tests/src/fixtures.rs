//! Builders for the classes, jars and mapping files used by the tests.

use rejar_core::archive::{self, ClassEntry, Entry, ResourceEntry};
use rejar_core::class_file::SIGNATURE;
use rejar_core::{AccessFlags, ClassFile};
use rejar_transform::{Renamer, RenamerConfig, RunReport};
use std::path::{Path, PathBuf};
use std::sync::Once;

pub const OBJECT: &str = "java/lang/Object";
pub const RECORD: &str = "java/lang/Record";

/// Installs a test subscriber once so `RUST_LOG` works while debugging a failure.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn class(name: &str, super_name: &str) -> ClassFile {
    ClassFile::new(AccessFlags::PUBLIC | AccessFlags::SUPER, name, Some(super_name)).unwrap()
}

pub fn with_signature(class: &mut ClassFile, member: Member, signature: &str) {
    let attr = class.make_utf8_attribute(SIGNATURE, signature).unwrap();
    match member {
        Member::Field(i) => class.fields[i].attributes.push(attr),
        Member::Method(i) => class.methods[i].attributes.push(attr),
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Member {
    Field(usize),
    Method(usize),
}

pub fn class_entry(class: &ClassFile) -> Entry {
    Entry::Class(ClassEntry::new(
        class.name().unwrap(),
        class.to_bytes(),
        archive::stable_timestamp(),
        None,
    ))
}

pub fn resource(path: &str, data: &[u8]) -> Entry {
    Entry::Resource(ResourceEntry::new(path, data.to_vec(), archive::stable_timestamp()))
}

pub fn manifest() -> Entry {
    Entry::Manifest(ResourceEntry::new(
        archive::MANIFEST_PATH,
        b"Manifest-Version: 1.0\r\n\r\n".to_vec(),
        archive::stable_timestamp(),
    ))
}

pub fn write_jar(dir: &Path, file: &str, entries: &[Entry]) -> PathBuf {
    let path = dir.join(file);
    archive::write_jar(&path, entries).unwrap();
    path
}

pub fn write_mapping(dir: &Path, file: &str, text: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, text).unwrap();
    path
}

/// Runs the pipeline and returns the report together with the output entries.
pub fn run(config: RenamerConfig) -> (RunReport, Vec<Entry>) {
    init_tracing();
    let output = config.output_path().clone();
    let report = Renamer::new(config).unwrap().run().unwrap();
    (report, archive::read_jar(&output).unwrap())
}

pub fn find_class(entries: &[Entry], name: &str) -> ClassFile {
    entries
        .iter()
        .find_map(|e| match e {
            Entry::Class(c) if c.name == name => Some(ClassFile::parse(&c.data).unwrap()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("class {name} missing from output"))
}

pub fn paths(entries: &[Entry]) -> Vec<String> {
    entries.iter().map(Entry::path).collect()
}

/// Owner, name and descriptor of every field and method reference in the pool.
pub fn member_refs(class: &ClassFile) -> Vec<(String, String, String)> {
    use rejar_core::constant_pool::Constant;
    class
        .pool
        .iter()
        .filter(|(_, c)| {
            matches!(
                c,
                Constant::FieldRef { .. } | Constant::MethodRef { .. } | Constant::InterfaceMethodRef { .. }
            )
        })
        .map(|(i, _)| class.pool.member_ref(i).unwrap())
        .map(|r| (r.owner.to_owned(), r.name.to_owned(), r.descriptor.to_owned()))
        .collect()
}
