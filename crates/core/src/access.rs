use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Access and property flags of classes, fields, methods and inner-class entries.
    ///
    /// Several bits mean different things depending on where they appear; the aliases are
    /// provided as associated constants below.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl AccessFlags {
    pub const SYNCHRONIZED: Self = Self::SUPER;
    pub const BRIDGE: Self = Self::VOLATILE;
    pub const VARARGS: Self = Self::TRANSIENT;
    pub const MANDATED: Self = Self::MODULE;

    /// The three visibility bits.
    pub const VISIBILITY: Self = Self::PUBLIC.union(Self::PRIVATE).union(Self::PROTECTED);

    /// Builds flags from raw bits, keeping bits this crate has no name for.
    pub const fn from_raw(bits: u16) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Returns these flags with the visibility replaced by `visibility`.
    pub fn with_visibility(self, visibility: Self) -> Self {
        self.difference(Self::VISIBILITY).union(visibility)
    }
}
