//! Domain models for Triquetra
//!
//! This module contains the pure domain objects the engine passes between
//! components: build versions, edition tags, candidates and artifacts.

pub mod artifact;
pub mod candidate;
pub mod edition;
pub mod version;

pub use artifact::{ArtifactDescriptor, ArtifactDetail, ArtifactKind, CuFormat};
pub use candidate::{ArtifactManifest, RemoteCandidate};
pub use edition::{Architecture, EditionTag, FeatureUpdate};
pub use version::BuildVersion;
