use thiserror::Error;

/// Error type for class-file parsing and serialization.
#[derive(Debug, Error)]
pub enum ClassFileError {
    /// The input does not start with `0xCAFEBABE`.
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    /// The input ended before the structure was complete.
    #[error("unexpected end of class data at offset {0}")]
    Truncated(usize),
    /// A constant-pool index is zero, out of range, or points into a long/double gap.
    #[error("invalid constant pool index {0}")]
    BadIndex(u16),
    /// A constant-pool entry has an unknown tag byte.
    #[error("unknown constant pool tag {tag} at index {index}")]
    BadTag { tag: u8, index: u16 },
    /// A constant-pool entry has a different kind than the referencing structure expects.
    #[error("constant pool index {index} is not a {expected}")]
    WrongKind { index: u16, expected: &'static str },
    /// Modified UTF-8 data could not be decoded.
    #[error("malformed modified utf-8 in constant pool index {0}")]
    BadUtf8(u16),
    /// A string needs more than 65535 bytes of modified UTF-8.
    #[error("string constant of {0} bytes exceeds the 65535 byte limit")]
    Utf8TooLong(usize),
    /// An attribute body is shorter or longer than its contents require.
    #[error("malformed {0} attribute")]
    BadAttribute(&'static str),
    /// Appending constants would exceed the 65535 entry limit.
    #[error("constant pool overflow")]
    PoolOverflow,
    /// Descriptor inside the class file is malformed.
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
    /// Signature inside the class file is malformed.
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
}

/// Error type for field and method descriptors.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("empty descriptor")]
    Empty,
    #[error("unexpected character '{ch}' at {pos} in `{desc}`")]
    Unexpected { desc: String, pos: usize, ch: char },
    #[error("unterminated class name in `{0}`")]
    Unterminated(String),
    #[error("trailing data in `{0}`")]
    Trailing(String),
}

/// Error type for generic signatures.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("unexpected end of signature `{0}`")]
    Truncated(String),
    #[error("unexpected character '{ch}' at {pos} in signature `{sig}`")]
    Unexpected { sig: String, pos: usize, ch: char },
    #[error("unbalanced nesting in signature `{0}`")]
    Unbalanced(String),
}

/// Error type for mapping files.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("could not read mapping '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("mapping parse error at line {line}: {msg} ⇒ `{raw}`")]
    Parse {
        line: usize,
        msg: String,
        raw: String,
    },
    #[error("unrecognized mapping format")]
    UnknownFormat,
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// Error type for archive reading and writing.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("duplicate output entry '{0}'")]
    Duplicate(String),
    #[error("invalid entry path '{0}'")]
    BadPath(String),
}

/// Error type for type hierarchy resolution.
#[derive(Debug, Error)]
pub enum InheritanceError {
    /// A class re-appeared on its own supertype path.
    #[error("class '{0}' is its own ancestor")]
    Cycle(String),
    #[error("could not open library '{path}': {source}")]
    Library {
        path: String,
        #[source]
        source: ArchiveError,
    },
}

/// Error type for transform operations.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{transformer} failed on '{entry}': {source}")]
    Class {
        transformer: &'static str,
        entry: String,
        #[source]
        source: Box<TransformError>,
    },
    #[error("class file error: {0}")]
    ClassFile(#[from] ClassFileError),
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
    #[error("hierarchy error: {0}")]
    Inheritance(#[from] InheritanceError),
    #[error("{0}")]
    Generic(String),
}

impl TransformError {
    /// Attaches the transformer and entry name to an error raised while processing one entry.
    pub fn in_entry(self, transformer: &'static str, entry: impl Into<String>) -> Self {
        match self {
            already @ Self::Class { .. } => already,
            other => Self::Class {
                transformer,
                entry: entry.into(),
                source: Box::new(other),
            },
        }
    }
}

/// Errors that can occur during a renaming run.
#[derive(Debug, Error)]
pub enum RenameError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// File read/write error.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    /// Archive read/write error.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    /// Mapping load error.
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),
    /// Library registration error.
    #[error("hierarchy error: {0}")]
    Inheritance(#[from] InheritanceError),
    /// Transform application failed.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
    /// Worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
