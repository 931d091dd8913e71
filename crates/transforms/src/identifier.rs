use crate::config::IdentifierFixMode;
use crate::fixer::ClassFixer;
use rejar_core::attributes::{AttributeBody, Code, LocalVariable, LocalVariableTable, LocalVariableTypeTable};
use rejar_core::class_file::{Attribute, ClassFile};
use rejar_core::constant_pool::ConstantPool;
use rejar_utils::errors::TransformError;
use std::collections::HashMap;

const SNOWMAN: &str = "\u{2603}";

const KEYWORDS: &[&str] = &[
    "_", "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue",
    "default", "do", "double", "else", "enum", "extends", "false", "final", "finally", "float", "for", "goto",
    "if", "implements", "import", "instanceof", "int", "interface", "long", "native", "new", "null", "package",
    "private", "protected", "public", "return", "short", "static", "strictfp", "super", "switch",
    "synchronized", "throw", "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Renames local variables whose names a Java compiler would reject.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierFixer {
    mode: IdentifierFixMode,
}

impl IdentifierFixer {
    pub const fn new(mode: IdentifierFixMode) -> Self {
        Self { mode }
    }

    fn needs_fix(&self, name: &str) -> bool {
        match self.mode {
            IdentifierFixMode::Snowmen => name == SNOWMAN,
            IdentifierFixMode::All => !is_java_identifier(name),
        }
    }

    /// Rewrites the variable tables of one `Code` body. Returns the new body when a name changed.
    fn fix_code(&self, code: &Attribute, pool: &mut ConstantPool) -> Result<Option<Vec<u8>>, TransformError> {
        let mut body = code.parse_as::<Code>(pool)?;
        // (slot, start_pc) -> new name, shared by both tables
        let mut renamed: HashMap<(u16, u16), String> = HashMap::new();
        let mut counter = 0u32;
        let mut changed = false;

        for attr in &mut body.attributes {
            let info = match attr.name.as_str() {
                LocalVariableTable::NAME => {
                    let mut table = attr.parse_as::<LocalVariableTable>(pool)?;
                    if !self.fix_entries(&mut table.entries, pool, &mut renamed, &mut counter)? {
                        continue;
                    }
                    table.to_bytes()
                }
                LocalVariableTypeTable::NAME => {
                    let mut table = attr.parse_as::<LocalVariableTypeTable>(pool)?;
                    if !self.fix_entries(&mut table.entries, pool, &mut renamed, &mut counter)? {
                        continue;
                    }
                    table.to_bytes()
                }
                _ => continue,
            };
            attr.info = info;
            changed = true;
        }
        Ok(changed.then(|| body.to_bytes()))
    }

    fn fix_entries(
        &self,
        entries: &mut [LocalVariable],
        pool: &mut ConstantPool,
        renamed: &mut HashMap<(u16, u16), String>,
        counter: &mut u32,
    ) -> Result<bool, TransformError> {
        let mut changed = false;
        for var in entries {
            if !self.needs_fix(pool.utf8(var.name)?) {
                continue;
            }
            let name = renamed.entry((var.index, var.start_pc)).or_insert_with(|| {
                let name = format!("lvt_{}_{}_", var.index, counter);
                *counter += 1;
                name
            });
            var.name = pool.put_utf8(name)?;
            changed = true;
        }
        Ok(changed)
    }
}

impl ClassFixer for IdentifierFixer {
    fn name(&self) -> &'static str {
        "identifier-fix"
    }

    fn fix(&self, class: &mut ClassFile) -> Result<bool, TransformError> {
        let mut changed = false;
        for method in &mut class.methods {
            for attr in &mut method.attributes {
                if attr.name != Code::NAME {
                    continue;
                }
                if let Some(info) = self.fix_code(attr, &mut class.pool)? {
                    attr.info = info;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }
}

/// Whether `name` is accepted as a Java identifier.
pub fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start = first.is_alphabetic() || first == '$' || first == '_';
    start
        && chars.all(|c| c.is_alphanumeric() || c == '$' || c == '_')
        && (name == "this" || !KEYWORDS.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rejar_core::AccessFlags;

    fn class_with_locals(names: &[(&str, u16, u16)]) -> ClassFile {
        let mut class = ClassFile::new(AccessFlags::PUBLIC, "a/B", Some("java/lang/Object")).unwrap();
        let m = class.add_method(AccessFlags::PUBLIC, "run", "(I)V").unwrap();
        let descriptor = class.pool.put_utf8("I").unwrap();
        let mut entries = Vec::new();
        for (name, index, start_pc) in names {
            entries.push(LocalVariable {
                start_pc: *start_pc,
                length: 1,
                name: class.pool.put_utf8(name).unwrap(),
                descriptor,
                index: *index,
            });
        }
        let lvt = class
            .make_typed_attribute(&LocalVariableTable {
                entries: entries.clone(),
            })
            .unwrap();
        let lvtt = class.make_typed_attribute(&LocalVariableTypeTable { entries }).unwrap();
        let code = Code {
            max_stack: 0,
            max_locals: 4,
            code: vec![0xb1],
            exception_table: Vec::new(),
            attributes: vec![lvt, lvtt],
        };
        let code = class.make_typed_attribute(&code).unwrap();
        class.methods[m].attributes.push(code);
        class
    }

    fn local_names(class: &ClassFile) -> (Vec<String>, Vec<String>) {
        let code = class.methods[0].attribute(Code::NAME).unwrap();
        let body = code.parse_as::<Code>(&class.pool).unwrap();
        let names = |entries: &[LocalVariable]| -> Vec<String> {
            entries
                .iter()
                .map(|v| class.pool.utf8(v.name).unwrap().to_owned())
                .collect()
        };
        let lvt = body.attributes[0].parse_as::<LocalVariableTable>(&class.pool).unwrap();
        let lvtt = body.attributes[1].parse_as::<LocalVariableTypeTable>(&class.pool).unwrap();
        (names(&lvt.entries), names(&lvtt.entries))
    }

    #[test]
    fn identifier_rules() {
        assert!(is_java_identifier("value"));
        assert!(is_java_identifier("$x_1"));
        assert!(is_java_identifier("this"));
        assert!(is_java_identifier("_x"));
        assert!(!is_java_identifier("_"));
        assert!(!is_java_identifier("int"));
        assert!(!is_java_identifier("1abc"));
        assert!(!is_java_identifier("a-b"));
        assert!(!is_java_identifier(SNOWMAN));
        assert!(!is_java_identifier(""));
    }

    #[test]
    fn invalid_names_are_renamed_consistently() {
        let mut class = class_with_locals(&[("this", 0, 0), ("\u{2603}", 1, 0), ("class", 2, 3), ("ok", 3, 0)]);
        let fixer = IdentifierFixer::new(IdentifierFixMode::All);
        assert!(fixer.fix(&mut class).unwrap());
        let (lvt, lvtt) = local_names(&class);
        assert_eq!(lvt, vec!["this", "lvt_1_0_", "lvt_2_1_", "ok"]);
        assert_eq!(lvtt, lvt);
        assert!(!fixer.fix(&mut class).unwrap());
    }

    #[test]
    fn snowmen_mode_ignores_other_names() {
        let mut class = class_with_locals(&[("\u{2603}", 1, 0), ("class", 2, 0)]);
        let fixer = IdentifierFixer::new(IdentifierFixMode::Snowmen);
        assert!(fixer.fix(&mut class).unwrap());
        let (lvt, _) = local_names(&class);
        assert_eq!(lvt, vec!["lvt_1_0_", "class"]);
    }

    #[test]
    fn lone_underscore_local_is_renamed() {
        let mut class = class_with_locals(&[("_", 1, 0), ("_a", 2, 0)]);
        assert!(IdentifierFixer::new(IdentifierFixMode::All).fix(&mut class).unwrap());
        let (lvt, _) = local_names(&class);
        assert_eq!(lvt, vec!["lvt_1_0_", "_a"]);
    }
}
