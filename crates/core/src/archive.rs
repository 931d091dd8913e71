//! Archive entries and jar I/O.

use rejar_utils::errors::ArchiveError;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const VERSIONS_PREFIX: &str = "META-INF/versions/";
const CLASS_SUFFIX: &str = ".class";

/// Timestamp given to every entry the tool generates: 2000-01-01 00:00:00.
pub fn stable_timestamp() -> DateTime {
    DateTime::from_date_and_time(2000, 1, 1, 0, 0, 0).unwrap_or_default()
}

/// A compiled class stored in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Binary name without the `.class` suffix or version prefix.
    pub name: String,
    pub data: Vec<u8>,
    pub time: DateTime,
    /// Release of a `META-INF/versions/<N>/` entry.
    pub version: Option<u32>,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>, time: DateTime, version: Option<u32>) -> Self {
        Self {
            name: name.into(),
            data,
            time,
            version,
        }
    }

    /// Recognizes `a/B.class` and `META-INF/versions/<N>/a/B.class`.
    pub fn from_path(path: &str, data: Vec<u8>, time: DateTime) -> Option<Self> {
        let (name, version) = split_class_path(path)?;
        Some(Self::new(name, data, time, version))
    }

    pub fn path(&self) -> String {
        match self.version {
            Some(v) => format!("{VERSIONS_PREFIX}{v}/{}{CLASS_SUFFIX}", self.name),
            None => format!("{}{CLASS_SUFFIX}", self.name),
        }
    }

    /// Same entry with new bytes and, for renamed classes, a new name. Timestamp and
    /// release are kept.
    pub fn with_data(&self, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, data, self.time, self.version)
    }
}

/// A manifest or any other non-class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub time: DateTime,
}

impl ResourceEntry {
    pub fn new(path: impl Into<String>, data: Vec<u8>, time: DateTime) -> Self {
        Self {
            path: path.into(),
            data,
            time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Class(ClassEntry),
    Manifest(ResourceEntry),
    Resource(ResourceEntry),
}

impl Entry {
    /// Classifies a file entry by its path.
    pub fn from_path(path: &str, data: Vec<u8>, time: DateTime) -> Self {
        if path == MANIFEST_PATH {
            return Self::Manifest(ResourceEntry::new(path, data, time));
        }
        match split_class_path(path) {
            Some((name, version)) => Self::Class(ClassEntry::new(name, data, time, version)),
            None => Self::Resource(ResourceEntry::new(path, data, time)),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Class(c) => c.path(),
            Self::Manifest(r) | Self::Resource(r) => r.path.clone(),
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Self::Class(c) => &c.data,
            Self::Manifest(r) | Self::Resource(r) => &r.data,
        }
    }

    pub fn time(&self) -> DateTime {
        match self {
            Self::Class(c) => c.time,
            Self::Manifest(r) | Self::Resource(r) => r.time,
        }
    }
}

/// Reads every file entry of a jar. Directory entries are skipped.
pub fn read_jar(path: &Path) -> Result<Vec<Entry>, ArchiveError> {
    let file = File::open(path)?;
    read_jar_from(BufReader::new(file))
}

pub fn read_jar_from<R: Read + Seek>(reader: R) -> Result<Vec<Entry>, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            debug!("skipping directory entry {}", file.name());
            continue;
        }
        let name = file.name().to_owned();
        if name.starts_with('/') || name.split('/').any(|part| part == "..") {
            return Err(ArchiveError::BadPath(name));
        }
        let time = file.last_modified().unwrap_or_else(stable_timestamp);
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.push(Entry::from_path(&name, data, time));
    }
    Ok(entries)
}

fn split_class_path(path: &str) -> Option<(&str, Option<u32>)> {
    let stem = path.strip_suffix(CLASS_SUFFIX)?;
    if let Some((release, name)) = stem.strip_prefix(VERSIONS_PREFIX).and_then(|r| r.split_once('/')) {
        if let Ok(version) = release.parse() {
            if !name.is_empty() {
                return Some((name, Some(version)));
            }
        }
    }
    (!stem.is_empty()).then_some((stem, None))
}

/// Writes `entries` in order. Two entries with the same path are an error.
pub fn write_jar(path: &Path, entries: &[Entry]) -> Result<(), ArchiveError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(65536, file);
    write_jar_to(&mut writer, entries)?;
    writer.flush()?;
    Ok(())
}

pub fn write_jar_to<W: Write + Seek>(writer: W, entries: &[Entry]) -> Result<(), ArchiveError> {
    let mut zip = ZipWriter::new(writer);
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        let path = entry.path();
        if !seen.insert(path.clone()) {
            return Err(ArchiveError::Duplicate(path));
        }
        let options = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(entry.time());
        zip.start_file(path, options)?;
        zip.write_all(entry.data())?;
    }
    zip.finish()?;
    Ok(())
}
