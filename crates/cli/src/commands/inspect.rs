//! Module for the `inspect` subcommand, which dumps the structure of one class as JSON.
//!
//! Accepts either a bare `.class` file or a jar together with `--class`.

use anyhow::{bail, Context};
use clap::Args;
use rejar_analysis::ClassInfo;
use rejar_core::archive::{self, Entry};
use rejar_core::attributes::{AttributeBody, Record};
use rejar_core::class_file::{find_attribute, SIGNATURE};
use rejar_core::ClassFile;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Arguments for the `inspect` subcommand.
#[derive(Args)]
pub struct InspectArgs {
    /// A `.class` file or a jar.
    pub input: PathBuf,
    /// Binary name of the class to show when the input is a jar (e.g. `net/example/Foo`).
    #[arg(long)]
    pub class: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComponentReport {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassReport {
    #[serde(flatten)]
    pub info: ClassInfo,
    pub signature: Option<String>,
    pub source_file: Option<String>,
    /// `None` when the class carries no `Record` attribute.
    pub record_components: Option<Vec<ComponentReport>>,
}

impl ClassReport {
    pub fn from_class(class: &ClassFile) -> anyhow::Result<Self> {
        let record_components = match class.attribute(Record::NAME) {
            Some(attr) => {
                let record = attr.parse_as::<Record>(&class.pool)?;
                let mut components = Vec::with_capacity(record.components.len());
                for component in &record.components {
                    let signature = match find_attribute(&component.attributes, SIGNATURE) {
                        Some(sig) => Some(class.pool.utf8(sig.index_body()?)?.to_owned()),
                        None => None,
                    };
                    components.push(ComponentReport {
                        name: class.pool.utf8(component.name)?.to_owned(),
                        descriptor: class.pool.utf8(component.descriptor)?.to_owned(),
                        signature,
                    });
                }
                Some(components)
            }
            None => None,
        };
        Ok(Self {
            info: ClassInfo::from_class(class)?,
            signature: class.signature()?.map(str::to_owned),
            source_file: class.source_file()?.map(str::to_owned),
            record_components,
        })
    }
}

impl InspectArgs {
    fn load(&self) -> anyhow::Result<ClassFile> {
        let is_class = self.input.extension().and_then(|e| e.to_str()) == Some("class");
        if is_class {
            let data = fs::read(&self.input).with_context(|| format!("reading {}", self.input.display()))?;
            return Ok(ClassFile::parse(&data)?);
        }

        let Some(name) = self.class.as_deref() else {
            bail!("{} is not a class file; pass --class to pick a class from the jar", self.input.display());
        };
        let name = name.trim_end_matches(".class").replace('.', "/");
        let entries = archive::read_jar(&self.input)?;
        // The base entry wins over versioned copies.
        let mut found = None;
        for entry in &entries {
            if let Entry::Class(class) = entry {
                if class.name == name && (found.is_none() || class.version.is_none()) {
                    found = Some(class);
                }
            }
        }
        match found {
            Some(entry) => Ok(ClassFile::parse(&entry.data)?),
            None => bail!("class {name} not found in {}", self.input.display()),
        }
    }
}

impl super::Command for InspectArgs {
    fn execute(self) -> anyhow::Result<()> {
        let class = self.load()?;
        let report = ClassReport::from_class(&class)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
