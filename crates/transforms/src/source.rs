use crate::config::SourceFixMode;
use crate::fixer::ClassFixer;
use rejar_core::class_file::{set_attribute, ClassFile, SOURCE_FILE};
use rejar_utils::errors::TransformError;

/// Points the `SourceFile` attribute at a name derived from the class name, which lets
/// debuggers and decompilers find sources after renaming.
#[derive(Debug, Clone, Copy)]
pub struct SourceFixer {
    mode: SourceFixMode,
}

impl SourceFixer {
    pub const fn new(mode: SourceFixMode) -> Self {
        Self { mode }
    }

    pub fn source_name(&self, class_name: &str) -> String {
        match self.mode {
            SourceFixMode::Basic => class_name.to_owned(),
            SourceFixMode::Java => {
                let simple = class_name.rsplit('/').next().unwrap_or(class_name);
                let outer = simple.split('$').next().unwrap_or(simple);
                format!("{outer}.java")
            }
        }
    }
}

impl ClassFixer for SourceFixer {
    fn name(&self) -> &'static str {
        "source-fix"
    }

    fn fix(&self, class: &mut ClassFile) -> Result<bool, TransformError> {
        let expected = self.source_name(class.name()?);
        if class.source_file()? == Some(expected.as_str()) {
            return Ok(false);
        }
        let attr = class.make_utf8_attribute(SOURCE_FILE, &expected)?;
        set_attribute(&mut class.attributes, attr);
        Ok(true)
    }
}
