//! Type hierarchy resolution.
//!
//! Answers "what are the supertypes and declared members of class X" for classes of
//! the archive being processed and for classes of read-only library jars. Lookups go
//! through an ordered list of [`ClassProvider`]s (first hit wins) and are memoized,
//! misses included, in a concurrent map shared by every worker thread.

use dashmap::DashMap;
use rejar_core::access::AccessFlags;
use rejar_core::class_file::ClassFile;
use rejar_utils::errors::{ArchiveError, ClassFileError, InheritanceError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use zip::ZipArchive;

/// A declared field or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberInfo {
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
}

/// The hierarchy-relevant shape of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub access: AccessFlags,
    /// Absent for `java/lang/Object` and `module-info`.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
}

impl ClassInfo {
    pub fn from_class(class: &ClassFile) -> Result<Self, ClassFileError> {
        let members = |list: &[rejar_core::class_file::Member]| -> Result<Vec<MemberInfo>, ClassFileError> {
            list.iter()
                .map(|m| {
                    Ok(MemberInfo {
                        name: m.name(&class.pool)?.to_owned(),
                        descriptor: m.descriptor(&class.pool)?.to_owned(),
                        access: m.access,
                    })
                })
                .collect()
        };
        Ok(Self {
            name: class.name()?.to_owned(),
            access: class.access,
            super_name: class.super_name()?.map(str::to_owned),
            interfaces: class
                .interface_names()?
                .into_iter()
                .map(str::to_owned)
                .collect(),
            fields: members(&class.fields)?,
            methods: members(&class.methods)?,
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ClassFileError> {
        Self::from_class(&ClassFile::parse(data)?)
    }

    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MemberInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Finds a field by name, and by descriptor when one is given.
    pub fn field(&self, name: &str, descriptor: Option<&str>) -> Option<&MemberInfo> {
        self.fields
            .iter()
            .find(|f| f.name == name && descriptor.map_or(true, |d| f.descriptor == d))
    }
}

/// A source of class bytes, looked up by binary name.
pub trait ClassProvider: Send + Sync + fmt::Debug {
    /// Returns the raw class file for `name`, or `None` if this provider does not have it.
    fn class_bytes(&self, name: &str) -> Result<Option<Vec<u8>>, InheritanceError>;
}

/// Classes held in memory, keyed by binary name.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    classes: HashMap<String, Vec<u8>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class unless one with the same name is already present.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.classes.entry(name.into()).or_insert(data);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassProvider for MemoryProvider {
    fn class_bytes(&self, name: &str) -> Result<Option<Vec<u8>>, InheritanceError> {
        Ok(self.classes.get(name).cloned())
    }
}

/// A library jar. Entry names are indexed when the jar is opened; bytes are read on demand.
pub struct JarProvider {
    path: PathBuf,
    index: HashMap<String, usize>,
    archive: Mutex<ZipArchive<BufReader<File>>>,
}

impl fmt::Debug for JarProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JarProvider")
            .field("path", &self.path)
            .field("classes", &self.index.len())
            .finish()
    }
}

impl JarProvider {
    pub fn open(path: &Path) -> Result<Self, InheritanceError> {
        let library_error = |source: ArchiveError| InheritanceError::Library {
            path: path.display().to_string(),
            source,
        };
        let file = File::open(path).map_err(|e| library_error(e.into()))?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| library_error(e.into()))?;

        let mut index = HashMap::new();
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(|e| library_error(e.into()))?;
            let Some(name) = entry.name().strip_suffix(".class") else {
                continue;
            };
            // Versioned copies never shadow the base class.
            if !name.starts_with("META-INF/") {
                index.entry(name.to_owned()).or_insert(i);
            }
        }

        debug!("indexed {} classes in library {}", index.len(), path.display());
        Ok(Self {
            path: path.to_owned(),
            index,
            archive: Mutex::new(archive),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClassProvider for JarProvider {
    fn class_bytes(&self, name: &str) -> Result<Option<Vec<u8>>, InheritanceError> {
        let Some(&i) = self.index.get(name) else {
            return Ok(None);
        };
        let library_error = |source: ArchiveError| InheritanceError::Library {
            path: self.path.display().to_string(),
            source,
        };
        let mut archive = match self.archive.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut file = archive.by_index(i).map_err(|e| library_error(e.into()))?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| library_error(e.into()))?;
        Ok(Some(data))
    }
}

/// Memoizing class hierarchy over an ordered provider list.
#[derive(Debug, Default)]
pub struct Inheritance {
    providers: Vec<Box<dyn ClassProvider>>,
    cache: DashMap<String, Option<Arc<ClassInfo>>>,
}

impl Inheritance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider; earlier providers take precedence.
    pub fn add_provider(&mut self, provider: impl ClassProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn with_provider(mut self, provider: impl ClassProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }

    /// Looks up a class.
    ///
    /// # Arguments
    /// * `name` - Binary name, e.g. `java/util/List`.
    ///
    /// # Returns
    /// The class shape, or `None` when no provider has the class or its bytes do not parse.
    /// Both outcomes are cached for the lifetime of this resolver.
    pub fn resolve(&self, name: &str) -> Result<Option<Arc<ClassInfo>>, InheritanceError> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(hit.value().clone());
        }
        let resolved = self.load(name)?;
        self.cache.insert(name.to_owned(), resolved.clone());
        Ok(resolved)
    }

    fn load(&self, name: &str) -> Result<Option<Arc<ClassInfo>>, InheritanceError> {
        if name.starts_with('[') {
            return Ok(None);
        }
        for provider in &self.providers {
            let Some(bytes) = provider.class_bytes(name)? else {
                continue;
            };
            return Ok(match ClassInfo::from_bytes(&bytes) {
                Ok(info) => Some(Arc::new(info)),
                Err(e) => {
                    warn!("ignoring unparsable class {name} from {provider:?}: {e}");
                    None
                }
            });
        }
        debug!("class {name} not found on any provider");
        Ok(None)
    }

    /// Walks the supertypes of `name` depth first, superclass before interfaces, calling
    /// `visit` once per reachable ancestor until it returns `Some`.
    ///
    /// Unresolvable ancestors end their branch. A class that re-appears on its own
    /// supertype path is an [`InheritanceError::Cycle`].
    pub fn walk_ancestors<T, F>(&self, name: &str, mut visit: F) -> Result<Option<T>, InheritanceError>
    where
        F: FnMut(&ClassInfo) -> Option<T>,
    {
        let Some(start) = self.resolve(name)? else {
            return Ok(None);
        };
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(start.name.clone());
        self.walk(&start, &mut path, &mut seen, &mut visit)
    }

    fn walk<T, F>(
        &self,
        class: &ClassInfo,
        path: &mut Vec<String>,
        seen: &mut HashSet<String>,
        visit: &mut F,
    ) -> Result<Option<T>, InheritanceError>
    where
        F: FnMut(&ClassInfo) -> Option<T>,
    {
        path.push(class.name.clone());
        for parent in class.super_name.iter().chain(class.interfaces.iter()) {
            if path.iter().any(|p| p == parent) {
                return Err(InheritanceError::Cycle(parent.clone()));
            }
            if !seen.insert(parent.clone()) {
                continue;
            }
            let Some(info) = self.resolve(parent)? else {
                debug!("ancestor {parent} of {} is unresolvable", class.name);
                continue;
            };
            if let Some(found) = visit(&info) {
                return Ok(Some(found));
            }
            if let Some(found) = self.walk(&info, path, seen, visit)? {
                return Ok(Some(found));
            }
        }
        path.pop();
        Ok(None)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rejar_core::archive::{stable_timestamp, write_jar, ClassEntry, Entry};

    fn class(name: &str, super_name: Option<&str>, interfaces: &[&str], access: AccessFlags) -> Vec<u8> {
        let mut c = ClassFile::new(access, name, super_name).unwrap();
        for itf in interfaces {
            c.add_interface(itf).unwrap();
        }
        c.add_method(AccessFlags::PUBLIC, "foo", "()V").unwrap();
        c.to_bytes()
    }

    fn memory(classes: &[(&str, Vec<u8>)]) -> MemoryProvider {
        let mut p = MemoryProvider::new();
        for (name, data) in classes {
            p.insert(*name, data.clone());
        }
        p
    }

    #[test]
    fn ancestors_are_visited_superclass_first_and_once() {
        let itf = AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        let provider = memory(&[
            ("C", class("C", Some("B"), &["I"], AccessFlags::PUBLIC)),
            ("B", class("B", Some("A"), &["J"], AccessFlags::PUBLIC)),
            ("A", class("A", None, &[], AccessFlags::PUBLIC)),
            ("J", class("J", None, &["I"], itf)),
            ("I", class("I", None, &[], itf)),
        ]);
        let hierarchy = Inheritance::new().with_provider(provider);
        let mut order = Vec::new();
        let found: Option<()> = hierarchy
            .walk_ancestors("C", |c| {
                order.push(c.name.clone());
                None
            })
            .unwrap();
        assert!(found.is_none());
        assert_eq!(order, ["B", "A", "J", "I"]);
        let hit = hierarchy
            .walk_ancestors("C", |c| (c.name == "I").then_some(()))
            .unwrap();
        assert!(hit.is_some());
    }

    #[test]
    fn cycles_are_reported() {
        let provider = memory(&[
            ("X", class("X", Some("Y"), &[], AccessFlags::PUBLIC)),
            ("Y", class("Y", Some("X"), &[], AccessFlags::PUBLIC)),
        ]);
        let hierarchy = Inheritance::new().with_provider(provider);
        let err = hierarchy.walk_ancestors("X", |_| None::<()>).unwrap_err();
        assert!(matches!(err, InheritanceError::Cycle(name) if name == "X"));
    }

    #[test]
    fn misses_are_cached_and_unparsable_bytes_are_misses() {
        let provider = memory(&[("Bad", vec![1, 2, 3])]);
        let hierarchy = Inheritance::new().with_provider(provider);
        assert!(hierarchy.resolve("Bad").unwrap().is_none());
        assert!(hierarchy.resolve("Missing").unwrap().is_none());
        assert_eq!(hierarchy.cached(), 2);
    }

    #[test]
    fn earlier_providers_win_and_jars_are_read_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        let t = stable_timestamp();
        write_jar(
            &jar,
            &[
                Entry::Class(ClassEntry::new("lib/Base", class("lib/Base", None, &[], AccessFlags::PUBLIC), t, None)),
                Entry::Class(ClassEntry::new("app/Main", class("app/Main", None, &[], AccessFlags::FINAL), t, None)),
            ],
        )
        .unwrap();

        let mut hierarchy = Inheritance::new();
        hierarchy.add_provider(memory(&[(
            "app/Main",
            class("app/Main", Some("lib/Base"), &[], AccessFlags::PUBLIC),
        )]));
        hierarchy.add_provider(JarProvider::open(&jar).unwrap());

        let main = hierarchy.resolve("app/Main").unwrap().unwrap();
        assert_eq!(main.super_name.as_deref(), Some("lib/Base"));
        let base = hierarchy.resolve("lib/Base").unwrap().unwrap();
        assert!(base.method("foo", "()V").is_some());
    }
}
