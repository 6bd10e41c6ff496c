//! Command implementations for the Triquetra CLI

pub mod cache;
pub mod completions;
pub mod update;
pub mod version;
