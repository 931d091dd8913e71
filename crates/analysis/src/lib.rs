//! Class hierarchy analysis shared by the rewriting passes.

pub mod inheritance;

pub use inheritance::{ClassInfo, ClassProvider, Inheritance, JarProvider, MemberInfo, MemoryProvider};
