use crate::fixtures::*;
use rejar_core::archive::{self, ClassEntry, Entry};
use rejar_core::{AccessFlags, ClassFile};
use rejar_transform::renamer::ABSTRACT_PARAMETER_NAMES;
use rejar_transform::RenamerConfig;

const MAPPING: &str = "tsrg2 left right
a net/Foo
\tf I value
\tm (La;I)V run
b net/Bar
";

fn originals() -> Vec<Entry> {
    let mut a = class("a", OBJECT);
    a.add_field(AccessFlags::PROTECTED, "f", "I").unwrap();
    let m = a.add_method(AccessFlags::PUBLIC, "m", "(La;I)V").unwrap();
    with_signature(&mut a, Member::Method(m), "(La;I)V");
    a.add_field_ref("a", "f", "I").unwrap();
    a.add_method_ref("a", "m", "(La;I)V", false).unwrap();

    let mut b = class("b", "a");
    b.add_method_ref("b", "m", "(La;I)V", false).unwrap();
    b.add_field_ref("b", "f", "I").unwrap();

    vec![manifest(), class_entry(&a), class_entry(&b), resource("data/b.txt", b"b")]
}

/// Everything a rename touches, in a comparable form.
fn shape(class: &ClassFile) -> (String, Option<String>, Vec<String>, Vec<(String, String, Option<String>)>) {
    let pool = &class.pool;
    let fields = class.fields.iter().map(|f| f.name(pool).unwrap().to_owned()).collect();
    let methods = class
        .methods
        .iter()
        .map(|m| {
            (
                m.name(pool).unwrap().to_owned(),
                m.descriptor(pool).unwrap().to_owned(),
                m.signature(pool).unwrap().map(str::to_owned),
            )
        })
        .collect();
    (
        class.name().unwrap().to_owned(),
        class.super_name().unwrap().map(str::to_owned),
        fields,
        methods,
    )
}

#[test]
fn forward_then_reverse_restores_names() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &originals());
    let mapping = write_mapping(dir.path(), "names.tsrg", MAPPING);
    let renamed = dir.path().join("renamed.jar");
    let restored = dir.path().join("restored.jar");

    let mut forward = RenamerConfig::new(&input);
    forward.output = Some(renamed.clone());
    forward.mapping = Some(mapping.clone());
    let (report, entries) = run(forward);
    assert_eq!(
        paths(&entries),
        vec!["META-INF/MANIFEST.MF", "net/Foo.class", "net/Bar.class", "data/b.txt"]
    );
    assert_eq!(report.changed["rename"], 2);

    let foo = find_class(&entries, "net/Foo");
    assert_eq!(
        shape(&foo),
        (
            "net/Foo".to_owned(),
            Some(OBJECT.to_owned()),
            vec!["value".to_owned()],
            vec![("run".to_owned(), "(Lnet/Foo;I)V".to_owned(), Some("(Lnet/Foo;I)V".to_owned()))],
        )
    );
    let bar = find_class(&entries, "net/Bar");
    assert_eq!(
        member_refs(&bar),
        vec![
            ("net/Bar".to_owned(), "run".to_owned(), "(Lnet/Foo;I)V".to_owned()),
            ("net/Bar".to_owned(), "value".to_owned(), "I".to_owned()),
        ]
    );

    let mut backward = RenamerConfig::new(&renamed);
    backward.output = Some(restored.clone());
    backward.mapping = Some(mapping);
    backward.reverse = true;
    let (_, entries) = run(backward);
    assert_eq!(
        paths(&entries),
        vec!["META-INF/MANIFEST.MF", "a.class", "b.class", "data/b.txt"]
    );

    for entry in originals() {
        let Entry::Class(original) = entry else {
            continue;
        };
        let original = ClassFile::parse(&original.data).unwrap();
        let round_tripped = find_class(&entries, original.name().unwrap());
        assert_eq!(shape(&round_tripped), shape(&original));
        assert_eq!(member_refs(&round_tripped), member_refs(&original));
    }
}

#[test]
fn stale_abstract_parameter_names_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let concrete = class("a", OBJECT);
    let input = write_jar(
        dir.path(),
        "in.jar",
        &[class_entry(&concrete), resource(ABSTRACT_PARAMETER_NAMES, b"a m ()V x")],
    );
    let mut config = RenamerConfig::new(&input);
    config.mapping = Some(write_mapping(dir.path(), "names.tsrg", MAPPING));
    let (report, entries) = run(config);

    assert_eq!(paths(&entries), vec!["net/Foo.class"]);
    assert!(report.extras.is_empty());
}

#[test]
fn abstract_parameter_names_are_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let mut iface = ClassFile::new(
        AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT,
        "a",
        Some(OBJECT),
    )
    .unwrap();
    iface
        .add_method(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "m", "(La;I)V")
        .unwrap();
    let input = write_jar(
        dir.path(),
        "in.jar",
        &[class_entry(&iface), resource(ABSTRACT_PARAMETER_NAMES, b"stale")],
    );
    let mapping = "tsrg2 left right
a net/Foo
\tm (La;I)V run
\t\t1 p0 other
";
    let mut config = RenamerConfig::new(&input);
    config.mapping = Some(write_mapping(dir.path(), "names.tsrg", mapping));
    let (report, entries) = run(config);

    assert_eq!(paths(&entries), vec!["net/Foo.class", ABSTRACT_PARAMETER_NAMES]);
    assert_eq!(report.extras, vec![ABSTRACT_PARAMETER_NAMES.to_owned()]);
    let Entry::Resource(names) = &entries[1] else {
        panic!("expected a resource");
    };
    assert_eq!(
        String::from_utf8(names.data.clone()).unwrap(),
        "net/Foo run (Lnet/Foo;I)V other var2"
    );
}

#[test]
fn multi_release_classes_are_renamed_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let mut base = class("a", OBJECT);
    base.add_method(AccessFlags::PUBLIC, "m", "(La;I)V").unwrap();
    let mut release = class("a", OBJECT);
    release.add_method(AccessFlags::PUBLIC, "m", "(La;I)V").unwrap();
    release.add_method_ref("b", "m", "(La;I)V", false).unwrap();
    let versioned = Entry::Class(ClassEntry::new(
        "a",
        release.to_bytes(),
        archive::stable_timestamp(),
        Some(11),
    ));
    let b = class("b", "a");
    let input = write_jar(
        dir.path(),
        "in.jar",
        &[class_entry(&base), versioned, class_entry(&b)],
    );
    let mut config = RenamerConfig::new(&input);
    config.mapping = Some(write_mapping(dir.path(), "names.tsrg", MAPPING));
    let (report, entries) = run(config);

    assert_eq!(
        paths(&entries),
        vec!["net/Foo.class", "META-INF/versions/11/net/Foo.class", "net/Bar.class"]
    );
    assert_eq!(report.changed["rename"], 3);
    let Entry::Class(renamed) = &entries[1] else {
        panic!("expected a class");
    };
    assert_eq!(renamed.version, Some(11));
    let renamed = ClassFile::parse(&renamed.data).unwrap();
    assert_eq!(renamed.name().unwrap(), "net/Foo");
    assert_eq!(renamed.methods[0].name(&renamed.pool).unwrap(), "run");
    assert_eq!(
        member_refs(&renamed),
        vec![("net/Bar".to_owned(), "run".to_owned(), "(Lnet/Foo;I)V".to_owned())]
    );
}
