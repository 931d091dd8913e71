pub mod config;
pub mod fixer;
pub mod identifier;
pub mod pipeline;
pub mod record;
pub mod remapper;
pub mod renamer;
pub mod source;

use rejar_core::archive::{ClassEntry, Entry, ResourceEntry};
use rejar_utils::errors::TransformError;

pub use config::{FixOptions, IdentifierFixMode, RecordFixFlags, RenamerConfig, SourceFixMode};
pub use pipeline::{Renamer, RunReport};

/// One stage of the entry processing chain.
///
/// Every hook receives an entry and returns its replacement: the same entry when there
/// is nothing to do, a new one when something changed, or `None` to drop the entry
/// from the output. Hooks for classes run concurrently, so implementations keep any
/// per-run state behind shared-safe types.
pub trait Transformer: Send + Sync {
    /// Returns the transformer's name for logging and reporting.
    fn name(&self) -> &'static str;

    fn process_class(&self, entry: ClassEntry) -> Result<Option<ClassEntry>, TransformError> {
        Ok(Some(entry))
    }

    fn process_manifest(&self, entry: ResourceEntry) -> Result<Option<ResourceEntry>, TransformError> {
        Ok(Some(entry))
    }

    fn process_resource(&self, entry: ResourceEntry) -> Result<Option<ResourceEntry>, TransformError> {
        Ok(Some(entry))
    }

    /// Entries generated by this transformer, collected once after every input entry
    /// has been processed.
    fn extras(&self) -> Vec<Entry> {
        Vec::new()
    }

    /// Number of classes this transformer has changed so far.
    fn changed(&self) -> usize {
        0
    }
}
