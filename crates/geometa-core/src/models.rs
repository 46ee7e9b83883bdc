pub mod artifact;
pub mod dataset;
pub mod record;

pub use artifact::{
    ArtifactKind, ArtifactOutcome, ArtifactPaths, ArtifactStatus, GenerationReport,
    ThumbnailFormat, ThumbnailOptions,
};
pub use dataset::{
    CellGeometry, CrsKind, DatasetReference, DatasetType, RasterPreview, RasterProperties,
    Resolution, SpatialReference, ValueRange,
};
pub use record::{BrowseGraphic, MetadataRecord, RecordInput};
