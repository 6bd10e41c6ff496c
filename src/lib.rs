//! Triquetra - Windows 11 servicing updater
//!
//! Finds the newest Windows 11 build published on an h5ai-hosted repository,
//! downloads its servicing stack, cumulative and .NET packages, verifies
//! them against their published checksums and installs them in order. An
//! Enablement Package is offered when the installed feature update has one.
//!
//! The update run lives in [`operations::update`]; everything it talks to
//! (network, registry, installer, user) sits behind a trait so the whole run
//! can be driven in memory.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod download;
pub mod environment;
pub mod error;
pub mod exit_codes;
pub mod hash;
pub mod installer;
pub mod lock;
pub mod logging;
pub mod operations;
pub mod progress;
pub mod prompt;
pub mod remote;
pub mod scanner;
pub mod selector;
pub mod selfupdate;
