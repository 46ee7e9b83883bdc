//! geometa Core - Domain models, organization profile, and the metadata orchestrator
//!
//! This crate contains the core domain logic and port definitions for geometa.
//! Raster reading and artifact encoding are adapters behind the traits in
//! [`ports`].

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod naming;
pub mod orchestrator;
pub mod ports;
pub mod profile;

pub use error::{ArtifactFailure, MetadataError, Result};
pub use orchestrator::{GenerationPlan, MetadataOrchestrator};
pub use profile::OrganizationProfile;
