use bitflags::bitflags;
use rejar_utils::errors::RenameError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

bitflags! {
    /// Repairs the record fixer may perform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RecordFixFlags: u8 {
        /// Rebuild a missing or empty `Record` attribute from the record's fields.
        const COMPONENTS = 1 << 0;
        /// Rebuild a missing class `Signature` from type-variable usages.
        const SIGNATURE = 1 << 1;
    }
}

impl Default for RecordFixFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for RecordFixFlags {
    type Err = String;

    /// Parses a comma separated list such as `components,signature`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = Self::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            flags |= match part.to_ascii_lowercase().as_str() {
                "components" => Self::COMPONENTS,
                "signature" => Self::SIGNATURE,
                other => return Err(format!("unknown record fix '{other}'")),
            };
        }
        Ok(flags)
    }
}

/// How the `SourceFile` attribute is derived from the class name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFixMode {
    /// Outermost simple class name plus `.java`.
    #[default]
    Java,
    /// The binary name unchanged.
    Basic,
}

impl FromStr for SourceFixMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "basic" => Ok(Self::Basic),
            other => Err(format!("unknown source fix mode '{other}'")),
        }
    }
}

/// Which local variable names the identifier fixer replaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierFixMode {
    /// Any name that is not a legal Java identifier.
    #[default]
    All,
    /// Only the snowman placeholder some obfuscators emit.
    Snowmen,
}

impl FromStr for IdentifierFixMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "snowmen" => Ok(Self::Snowmen),
            other => Err(format!("unknown identifier fix mode '{other}'")),
        }
    }
}

/// Optional repair passes. `None` disables a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOptions {
    pub record: Option<RecordFixFlags>,
    pub source: Option<SourceFixMode>,
    pub identifiers: Option<IdentifierFixMode>,
}

/// Configuration for one renaming run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamerConfig {
    /// Input archive
    pub input: PathBuf,
    /// Output archive; the input is replaced when absent
    pub output: Option<PathBuf>,
    /// Library archives consulted for the type hierarchy, in order
    pub libraries: Vec<PathBuf>,
    /// Mapping file; no renaming happens without one
    pub mapping: Option<PathBuf>,
    /// Apply the inverse of the mapping
    pub reverse: bool,
    /// Worker threads for class processing
    pub threads: usize,
    /// Repair passes
    pub fixes: FixOptions,
}

impl RenamerConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            libraries: Vec::new(),
            mapping: None,
            reverse: false,
            threads: default_threads(),
            fixes: FixOptions::default(),
        }
    }

    /// Checks the configuration before any work starts.
    pub fn validate(&self) -> Result<(), RenameError> {
        if self.threads == 0 {
            return Err(RenameError::Config("thread count must be at least 1".into()));
        }
        if !self.input.is_file() {
            return Err(RenameError::Config(format!(
                "input '{}' does not exist",
                self.input.display()
            )));
        }
        if let Some(missing) = self.libraries.iter().find(|l| !l.is_file()) {
            return Err(RenameError::Config(format!(
                "library '{}' does not exist",
                missing.display()
            )));
        }
        if self.reverse && self.mapping.is_none() {
            return Err(RenameError::Config("--reverse needs a mapping".into()));
        }
        Ok(())
    }

    /// Where the result is written.
    pub fn output_path(&self) -> &PathBuf {
        self.output.as_ref().unwrap_or(&self.input)
    }
}

pub fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
