//! Class-file model and archive plumbing for rejar.
//!
//! Classes are parsed into [`class_file::ClassFile`], rewritten by the transform crate
//! and written back. Constant-pool entries never move, so parts of a class that are not
//! rewritten (code, stack maps, unknown attributes) are carried over byte for byte.

pub mod access;
pub mod archive;
pub mod attributes;
pub mod bytes;
pub mod class_file;
pub mod constant_pool;
pub mod descriptor;
pub mod mapping;
pub mod signature;

pub use access::AccessFlags;
pub use class_file::ClassFile;
