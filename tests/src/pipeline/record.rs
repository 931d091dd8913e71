use crate::fixtures::*;
use rejar_core::attributes::{AttributeBody, Record};
use rejar_core::{AccessFlags, ClassFile};
use rejar_transform::{RecordFixFlags, RenamerConfig};
use std::path::{Path, PathBuf};

/// `record Box<T>(T value)` compiled with its generic metadata stripped: the field is
/// erased to `String` and the `Record` attribute and class signature are missing.
fn stripped_box() -> ClassFile {
    let mut class = ClassFile::new(AccessFlags::PUBLIC | AccessFlags::FINAL, "p/Box", Some(RECORD)).unwrap();
    let f = class
        .add_field(AccessFlags::PRIVATE | AccessFlags::FINAL, "value", "Ljava/lang/String;")
        .unwrap();
    with_signature(&mut class, Member::Field(f), "TT;");
    class
        .add_field(AccessFlags::PUBLIC | AccessFlags::FINAL, "count", "I")
        .unwrap();
    let m = class
        .add_method(AccessFlags::PUBLIC, "merge", "(Ljava/util/List;)V")
        .unwrap();
    with_signature(&mut class, Member::Method(m), "(Ljava/util/List<TT;>;)V");
    class
}

fn string_library(dir: &Path) -> PathBuf {
    let string = ClassFile::new(AccessFlags::PUBLIC | AccessFlags::FINAL, "java/lang/String", Some(OBJECT)).unwrap();
    write_jar(dir, "rt.jar", &[class_entry(&string)])
}

fn components(class: &ClassFile) -> Vec<(String, String, Option<String>)> {
    let record = class
        .attribute(Record::NAME)
        .expect("Record attribute")
        .parse_as::<Record>(&class.pool)
        .unwrap();
    record
        .components
        .iter()
        .map(|c| {
            let signature = rejar_core::class_file::find_attribute(&c.attributes, "Signature")
                .map(|a| class.pool.utf8(a.index_body().unwrap()).unwrap().to_owned());
            (
                class.pool.utf8(c.name).unwrap().to_owned(),
                class.pool.utf8(c.descriptor).unwrap().to_owned(),
                signature,
            )
        })
        .collect()
}

fn fix(dir: &Path, input: &Path, output: &str, libraries: Vec<PathBuf>) -> (rejar_transform::RunReport, ClassFile) {
    let mut config = RenamerConfig::new(input);
    config.output = Some(dir.join(output));
    config.libraries = libraries;
    config.fixes.record = Some(RecordFixFlags::all());
    let (report, entries) = run(config);
    (report, find_class(&entries, "p/Box"))
}

#[test]
fn components_and_signature_are_rebuilt_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &[class_entry(&stripped_box())]);
    let rt = string_library(dir.path());

    let (report, fixed) = fix(dir.path(), &input, "fixed.jar", vec![rt.clone()]);
    assert_eq!(report.changed["record-fix"], 1);
    assert_eq!(
        components(&fixed),
        vec![
            ("value".to_owned(), "Ljava/lang/String;".to_owned(), Some("TT;".to_owned())),
            ("count".to_owned(), "I".to_owned(), None),
        ]
    );
    assert_eq!(fixed.signature().unwrap(), Some("<T:Ljava/lang/String;>Ljava/lang/Record;"));
    // record fields are private
    assert!(fixed.fields[1].access.contains(AccessFlags::PRIVATE | AccessFlags::FINAL));
    assert!(!fixed.fields[1].access.contains(AccessFlags::PUBLIC));

    let (report, again) = fix(dir.path(), &dir.path().join("fixed.jar"), "again.jar", vec![rt]);
    assert_eq!(report.changed["record-fix"], 0);
    assert_eq!(again.to_bytes(), fixed.to_bytes());
}

#[test]
fn bound_falls_back_to_object_without_the_library() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &[class_entry(&stripped_box())]);
    let (_, fixed) = fix(dir.path(), &input, "fixed.jar", Vec::new());
    assert_eq!(fixed.signature().unwrap(), Some("<T:Ljava/lang/Object;>Ljava/lang/Record;"));
}

#[test]
fn only_requested_repairs_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &[class_entry(&stripped_box())]);
    let mut config = RenamerConfig::new(&input);
    config.fixes.record = Some(RecordFixFlags::COMPONENTS);
    let (_, entries) = run(config);
    let fixed = find_class(&entries, "p/Box");
    assert_eq!(components(&fixed).len(), 2);
    assert_eq!(fixed.signature().unwrap(), None);
}
