//! Cross-crate tests for rejar: whole-archive runs through the pipeline and checks that
//! span the mapping, hierarchy and class-file crates.

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod hierarchy;
#[cfg(test)]
mod pipeline;
