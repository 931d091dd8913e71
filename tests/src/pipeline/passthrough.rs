use crate::fixtures::*;
use rejar_core::archive::Entry;
use rejar_core::class_file::SOURCE_FILE;
use rejar_core::AccessFlags;
use rejar_transform::{IdentifierFixMode, RecordFixFlags, RenamerConfig, SourceFixMode};
use std::fs;

fn all_fixes(config: &mut RenamerConfig) {
    config.fixes.record = Some(RecordFixFlags::all());
    config.fixes.source = Some(SourceFixMode::Java);
    config.fixes.identifiers = Some(IdentifierFixMode::All);
}

#[test]
fn classes_needing_no_repair_are_byte_identical() {
    let mut tidy = class("net/Tidy", OBJECT);
    tidy.add_method(AccessFlags::PUBLIC, "run", "(I)V").unwrap();
    let source = tidy.make_utf8_attribute(SOURCE_FILE, "Tidy.java").unwrap();
    tidy.attributes.push(source);

    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(
        dir.path(),
        "in.jar",
        &[manifest(), class_entry(&tidy), resource("config/app.properties", b"k=v\n")],
    );
    let output = dir.path().join("out.jar");
    let mut config = RenamerConfig::new(&input);
    config.output = Some(output.clone());
    all_fixes(&mut config);
    let (report, _) = run(config);

    assert!(report.changed.values().all(|&n| n == 0));
    assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());
}

#[test]
fn runs_are_deterministic() {
    let mut entries = vec![manifest()];
    let mut mapping = String::new();
    for i in 0..40 {
        let name = format!("c{i}");
        let super_name = if i == 0 { OBJECT.to_owned() } else { format!("c{}", i - 1) };
        let mut c = class(&name, &super_name);
        c.add_method(AccessFlags::PUBLIC, "m", "()V").unwrap();
        c.add_method_ref(&name, "m", "()V", false).unwrap();
        entries.push(class_entry(&c));
        entries.push(resource(&format!("res/{i}.txt"), name.as_bytes()));
        mapping.push_str(&format!("{name} net/C{i}\n"));
        if i == 0 {
            mapping.push_str("\tm ()V tick\n");
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let input = write_jar(dir.path(), "in.jar", &entries);
    let mapping = write_mapping(dir.path(), "names.tsrg", &mapping);

    let mut outputs = Vec::new();
    for (run_no, threads) in [(0, 1), (1, 4)] {
        let output = dir.path().join(format!("out{run_no}.jar"));
        let mut config = RenamerConfig::new(&input);
        config.output = Some(output.clone());
        config.mapping = Some(mapping.clone());
        config.threads = threads;
        all_fixes(&mut config);
        let (report, written) = run(config);
        assert_eq!(report.classes_out, 40);
        assert_eq!(report.changed["rename"], 40);
        // input order is preserved
        let Entry::Class(last) = &written[written.len() - 2] else {
            panic!("expected a class entry");
        };
        assert_eq!(last.name, "net/C39");
        let leaf = find_class(&written, "net/C39");
        assert_eq!(member_refs(&leaf)[0].1, "tick");
        outputs.push(fs::read(&output).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}
