//! Jar processing pipeline.
//!
//! A run reads the input archive, builds the type hierarchy from its classes and the
//! configured libraries, pushes every entry through the transformer chain and writes the
//! result. Classes are processed in parallel; the manifest and resources afterwards on
//! the calling thread.

use crate::config::RenamerConfig;
use crate::fixer::OptionalChange;
use crate::identifier::IdentifierFixer;
use crate::record::RecordFixer;
use crate::remapper::Remapper;
use crate::renamer::RenamingTransformer;
use crate::source::SourceFixer;
use crate::Transformer;
use indexmap::IndexMap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rejar_analysis::inheritance::{Inheritance, JarProvider, MemoryProvider};
use rejar_core::archive::{self, ClassEntry, Entry, ResourceEntry};
use rejar_core::mapping::{self, Mappings};
use rejar_utils::errors::{RenameError, TransformError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Class entries read from the input
    pub classes_in: usize,
    /// Class entries written to the output
    pub classes_out: usize,
    /// Manifest and resource entries read from the input
    pub resources_in: usize,
    /// Manifest, resource and generated entries written to the output
    pub resources_out: usize,
    /// Number of classes each transformer changed, in chain order
    pub changed: IndexMap<String, usize>,
    /// Paths of generated entries
    pub extras: Vec<String>,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, RenameError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Renames and repairs one archive according to a [`RenamerConfig`].
pub struct Renamer {
    config: RenamerConfig,
    mappings: Option<Arc<Mappings>>,
    pool: ThreadPool,
}

impl std::fmt::Debug for Renamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renamer")
            .field("config", &self.config)
            .field(
                "mappings",
                &self.mappings.as_ref().map(|m| format!("{} classes", m.len())),
            )
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl Renamer {
    /// Validates the configuration, loads the mapping and starts the worker pool.
    pub fn new(config: RenamerConfig) -> Result<Self, RenameError> {
        config.validate()?;

        let mappings = match &config.mapping {
            Some(path) => {
                let mut loaded = mapping::load(path)?;
                if config.reverse {
                    loaded = loaded.reverse()?;
                }
                info!("loaded {} class mappings from {}", loaded.len(), path.display());
                Some(Arc::new(loaded))
            }
            None => None,
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("rejar-worker-{i}"))
            .build()?;

        Ok(Self {
            config,
            mappings,
            pool,
        })
    }

    /// Runs the whole pipeline and writes the output archive.
    pub fn run(&self) -> Result<RunReport, RenameError> {
        info!("Processing {}", self.config.input.display());
        let entries = archive::read_jar(&self.config.input)?;
        let (output, report) = self.process(entries)?;

        let target = self.config.output_path();
        write_atomically(target, &output)?;
        info!(
            "Wrote {} ({} classes, {} other entries)",
            target.display(),
            report.classes_out,
            report.resources_out
        );
        Ok(report)
    }

    /// Runs the transformer chain over already loaded entries.
    pub fn process(&self, entries: Vec<Entry>) -> Result<(Vec<Entry>, RunReport), RenameError> {
        let mut report = RunReport::default();
        for entry in &entries {
            match entry {
                Entry::Class(_) => report.classes_in += 1,
                Entry::Manifest(_) | Entry::Resource(_) => report.resources_in += 1,
            }
        }

        let inheritance = Arc::new(self.build_inheritance(&entries)?);
        let chain = self.build_chain(&inheritance);
        debug!(
            "Transformer chain: {:?}",
            chain.iter().map(|t| t.name()).collect::<Vec<_>>()
        );

        let staged: Vec<Option<Entry>> = self.pool.install(|| {
            entries
                .into_par_iter()
                .map(|entry| -> Result<Option<Entry>, TransformError> {
                    match entry {
                        Entry::Class(class) => Ok(apply_class(&chain, class)?.map(Entry::Class)),
                        other => Ok(Some(other)),
                    }
                })
                .collect::<Result<Vec<_>, _>>()
        })?;

        let mut output = Vec::with_capacity(staged.len());
        for entry in staged.into_iter().flatten() {
            let processed = match entry {
                Entry::Manifest(manifest) => apply_resource(&chain, manifest, true)?.map(Entry::Manifest),
                Entry::Resource(resource) => apply_resource(&chain, resource, false)?.map(Entry::Resource),
                class @ Entry::Class(_) => Some(class),
            };
            output.extend(processed);
        }

        for transformer in &chain {
            for extra in transformer.extras() {
                debug!("{} generated {}", transformer.name(), extra.path());
                report.extras.push(extra.path());
                output.push(extra);
            }
            report
                .changed
                .insert(transformer.name().to_owned(), transformer.changed());
        }

        for entry in &output {
            match entry {
                Entry::Class(_) => report.classes_out += 1,
                Entry::Manifest(_) | Entry::Resource(_) => report.resources_out += 1,
            }
        }
        Ok((output, report))
    }

    /// Archive classes come first, libraries after in the configured order. Within the
    /// archive the base version of a multi-release class wins.
    fn build_inheritance(&self, entries: &[Entry]) -> Result<Inheritance, RenameError> {
        let mut provider = MemoryProvider::new();
        let classes = entries.iter().filter_map(|e| match e {
            Entry::Class(c) => Some(c),
            _ => None,
        });
        let (base, versioned): (Vec<&ClassEntry>, Vec<&ClassEntry>) = classes.partition(|c| c.version.is_none());
        for class in base.into_iter().chain(versioned) {
            provider.insert(class.name.as_str(), class.data.clone());
        }

        let mut inheritance = Inheritance::new().with_provider(provider);
        for library in &self.config.libraries {
            debug!("Adding library {}", library.display());
            inheritance.add_provider(JarProvider::open(library)?);
        }
        Ok(inheritance)
    }

    fn build_chain(&self, inheritance: &Arc<Inheritance>) -> Vec<Box<dyn Transformer>> {
        let fixes = &self.config.fixes;
        let mut chain: Vec<Box<dyn Transformer>> = Vec::new();
        if let Some(mappings) = &self.mappings {
            let remapper = Remapper::new(mappings.clone(), inheritance.clone());
            chain.push(Box::new(RenamingTransformer::new(Arc::new(remapper))));
        }
        if let Some(flags) = fixes.record {
            chain.push(Box::new(OptionalChange::new(RecordFixer::new(
                flags,
                inheritance.clone(),
            ))));
        }
        if let Some(mode) = fixes.identifiers {
            chain.push(Box::new(OptionalChange::new(IdentifierFixer::new(mode))));
        }
        if let Some(mode) = fixes.source {
            chain.push(Box::new(OptionalChange::new(SourceFixer::new(mode))));
        }
        chain
    }
}

fn apply_class(chain: &[Box<dyn Transformer>], entry: ClassEntry) -> Result<Option<ClassEntry>, TransformError> {
    let mut current = entry;
    for transformer in chain {
        let name = current.name.clone();
        match transformer
            .process_class(current)
            .map_err(|e| e.in_entry(transformer.name(), &name))?
        {
            Some(next) => current = next,
            None => {
                debug!("{} dropped {name}", transformer.name());
                return Ok(None);
            }
        }
    }
    Ok(Some(current))
}

fn apply_resource(
    chain: &[Box<dyn Transformer>],
    entry: ResourceEntry,
    manifest: bool,
) -> Result<Option<ResourceEntry>, TransformError> {
    let mut current = entry;
    for transformer in chain {
        let path = current.path.clone();
        let result = if manifest {
            transformer.process_manifest(current)
        } else {
            transformer.process_resource(current)
        };
        match result.map_err(|e| e.in_entry(transformer.name(), &path))? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Writes next to the target and renames over it, so the input may double as the output.
fn write_atomically(target: &Path, entries: &[Entry]) -> Result<(), RenameError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    archive::write_jar_to(temp.as_file_mut(), entries)?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
