//! High-level operations
//!
//! - [`update`]: the complete update run, from environment probe to restart
//!
//! The operation coordinates:
//! - Selector and scanner: where to download from and what (from `selector`, `scanner`)
//! - Download manager and cache: verified local copies (from `download`, `cache`)
//! - Installer and decision gates: the OS and the user (from `installer`, `prompt`)

pub mod update;

pub use update::{UpdateEngine, UpdateOutcome};
