use crate::fixtures::*;
use rejar_analysis::{Inheritance, MemoryProvider};
use rejar_core::AccessFlags;
use rejar_transform::RenamerConfig;
use rejar_utils::errors::{InheritanceError, RenameError};

/// `A <- B <- C`, with `A` declaring `foo()V` and `D` calling `C.foo()V`.
fn chain(b_declares_foo: bool) -> Vec<rejar_core::archive::Entry> {
    let mut a = class("A", OBJECT);
    a.add_method(AccessFlags::PUBLIC, "foo", "()V").unwrap();
    let mut b = class("B", "A");
    if b_declares_foo {
        b.add_method(AccessFlags::PUBLIC, "foo", "()V").unwrap();
    }
    let c = class("C", "B");
    let mut d = class("D", OBJECT);
    d.add_method_ref("C", "foo", "()V", false).unwrap();
    vec![class_entry(&a), class_entry(&b), class_entry(&c), class_entry(&d)]
}

fn call_site_name(mapping: &str, b_declares_foo: bool) -> String {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &chain(b_declares_foo));
    let mut config = RenamerConfig::new(&input);
    config.mapping = Some(write_mapping(dir.path(), "names.tsrg", mapping));
    let (_, entries) = run(config);
    let d = find_class(&entries, "D");
    let refs = member_refs(&d);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].0, "C");
    refs[0].1.clone()
}

#[test]
fn call_site_resolves_to_the_declaring_ancestor() {
    assert_eq!(call_site_name("A A\n\tfoo ()V bar\n", false), "bar");
}

#[test]
fn nearest_mapped_declaration_wins() {
    assert_eq!(call_site_name("B B\n\tfoo ()V baz\n", true), "baz");
    assert_eq!(call_site_name("A A\n\tfoo ()V bar\nB B\n\tfoo ()V baz\n", true), "baz");
    // B declares foo without a mapping; A's entry still applies to the override chain
    assert_eq!(call_site_name("A A\n\tfoo ()V bar\n", true), "bar");
}

#[test]
fn ancestors_from_library_jars_are_consulted() {
    let dir = tempfile::tempdir().unwrap();
    let mut base = class("lib/Base", OBJECT);
    base.add_method(AccessFlags::PUBLIC, "tick", "()V").unwrap();
    let library = write_jar(dir.path(), "lib.jar", &[class_entry(&base)]);

    let child = class("app/Child", "lib/Base");
    let mut caller = class("app/Caller", OBJECT);
    caller.add_method_ref("app/Child", "tick", "()V", false).unwrap();
    let input = write_jar(dir.path(), "in.jar", &[class_entry(&child), class_entry(&caller)]);

    let mut config = RenamerConfig::new(&input);
    config.output = Some(dir.path().join("out.jar"));
    config.libraries = vec![library];
    config.mapping = Some(write_mapping(dir.path(), "names.tsrg", "lib/Base lib/Base\n\ttick ()V update\n"));
    let (report, entries) = run(config);

    // library classes are never written out
    assert_eq!(report.classes_out, 2);
    let caller = find_class(&entries, "app/Caller");
    assert_eq!(member_refs(&caller)[0].1, "update");
}

#[test]
fn private_ancestor_members_are_not_inherited() {
    let mut a = class("A", OBJECT);
    a.add_method(AccessFlags::PRIVATE, "foo", "()V").unwrap();
    let b = class("B", "A");
    let mut caller = class("D", OBJECT);
    caller.add_method_ref("B", "foo", "()V", false).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &[class_entry(&a), class_entry(&b), class_entry(&caller)]);
    let mut config = RenamerConfig::new(&input);
    config.mapping = Some(write_mapping(dir.path(), "names.tsrg", "A A\n\tfoo ()V bar\n"));
    let (_, entries) = run(config);
    assert_eq!(member_refs(&find_class(&entries, "D"))[0].1, "foo");
}

#[test]
fn cyclic_hierarchy_is_reported() {
    let mut provider = MemoryProvider::new();
    provider.insert("X", class("X", "Y").to_bytes());
    provider.insert("Y", class("Y", "X").to_bytes());
    let inheritance = Inheritance::new().with_provider(provider);
    let err = inheritance.walk_ancestors("X", |_| None::<()>).unwrap_err();
    assert!(matches!(err, InheritanceError::Cycle(_)));
}

#[test]
fn unreadable_library_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &chain(false));
    let library = write_mapping(dir.path(), "broken.jar", "not a zip");
    let mut config = RenamerConfig::new(&input);
    config.libraries = vec![library];
    let err = rejar_transform::Renamer::new(config).unwrap().run().unwrap_err();
    assert!(matches!(err, RenameError::Inheritance(_)));
}

#[test]
fn classes_with_lone_surrogate_strings_are_processed() {
    use rejar_core::constant_pool::Constant;
    let surrogate = vec![0xed, 0xa0, 0x80];
    let with_odd_string = |name: &str, super_name: &str| {
        let mut c = class(name, super_name);
        let raw = c.pool.push(Constant::Utf8Bytes(surrogate.clone())).unwrap();
        c.pool.push(Constant::String { string: raw }).unwrap();
        c
    };

    let dir = tempfile::tempdir().unwrap();
    let mut base = with_odd_string("lib/Base", OBJECT);
    base.add_method(AccessFlags::PUBLIC, "tick", "()V").unwrap();
    let library = write_jar(dir.path(), "lib.jar", &[class_entry(&base)]);

    let mut child = with_odd_string("app/Child", "lib/Base");
    child.add_method_ref("app/Child", "tick", "()V", false).unwrap();
    let input = write_jar(dir.path(), "in.jar", &[class_entry(&child)]);

    let mut config = RenamerConfig::new(&input);
    config.libraries = vec![library];
    config.mapping = Some(write_mapping(dir.path(), "names.tsrg", "lib/Base lib/Base\n\ttick ()V update\n"));
    config.fixes.source = Some(rejar_transform::SourceFixMode::Java);
    let (report, entries) = run(config);

    assert_eq!(report.changed["source-fix"], 1);
    let child = find_class(&entries, "app/Child");
    assert_eq!(member_refs(&child)[0].1, "update");
    assert!(child
        .pool
        .iter()
        .any(|(_, c)| *c == Constant::Utf8Bytes(surrogate.clone())));
}
