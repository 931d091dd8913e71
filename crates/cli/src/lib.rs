//! Command implementations for the `rejar` binary.

pub mod commands;
