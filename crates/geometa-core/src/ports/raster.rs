use std::path::Path;

use crate::error::Result;
use crate::models::{RasterPreview, RasterProperties};

/// Port for reading raster datasets
pub trait RasterInspector {
    /// Open handle to a dataset
    type Raster;

    /// Open a dataset; fails with `DatasetRead` when it cannot be read
    fn open(&self, path: &Path) -> Result<Self::Raster>;

    /// Read intrinsic properties (spatial reference, extent, resolution, ...)
    fn read_properties(&self, raster: &mut Self::Raster) -> Result<RasterProperties>;

    /// Read a downsampled copy whose longest edge is at most `max_edge`
    fn read_preview(&self, raster: &mut Self::Raster, max_edge: u32) -> Result<RasterPreview>;
}
