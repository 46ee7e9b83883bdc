//! Port trait definitions
//!
//! These traits define the collaborators the orchestrator drives. Adapters
//! live in `geometa-raster` and `geometa-iso`.

pub mod raster;
pub mod serializer;

pub use raster::RasterInspector;
pub use serializer::MetadataSerializer;
