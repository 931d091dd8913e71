//! Shared error types for the rejar crates.

pub mod errors;
