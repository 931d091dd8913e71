//! Repairs that only touch a class when something is actually wrong with it.

use crate::Transformer;
use rejar_core::archive::ClassEntry;
use rejar_core::class_file::ClassFile;
use rejar_utils::errors::TransformError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// A structural repair applied to a parsed class.
///
/// `fix` returns `true` only when it changed the class. A fixer that returns `false`
/// must leave the class exactly as it found it; the original bytes are then written out
/// unchanged.
pub trait ClassFixer: Send + Sync {
    fn name(&self) -> &'static str;

    fn fix(&self, class: &mut ClassFile) -> Result<bool, TransformError>;
}

/// Adapts a [`ClassFixer`] to the [`Transformer`] chain.
#[derive(Debug)]
pub struct OptionalChange<F> {
    fixer: F,
    changed: AtomicUsize,
}

impl<F: ClassFixer> OptionalChange<F> {
    pub fn new(fixer: F) -> Self {
        Self {
            fixer,
            changed: AtomicUsize::new(0),
        }
    }
}

impl<F: ClassFixer> Transformer for OptionalChange<F> {
    fn name(&self) -> &'static str {
        self.fixer.name()
    }

    fn process_class(&self, entry: ClassEntry) -> Result<Option<ClassEntry>, TransformError> {
        let mut class = ClassFile::parse(&entry.data)?;
        if !self.fixer.fix(&mut class)? {
            return Ok(Some(entry));
        }
        debug!("{} changed {}", self.fixer.name(), entry.name);
        self.changed.fetch_add(1, Ordering::Relaxed);
        let name = class.name()?.to_owned();
        Ok(Some(entry.with_data(name, class.to_bytes())))
    }

    fn changed(&self) -> usize {
        self.changed.load(Ordering::Relaxed)
    }
}
