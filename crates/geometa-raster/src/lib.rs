//! geometa Raster - Raster inspection without GDAL
//!
//! Reads dimensions, sample layout, georeferencing and a downsampled preview
//! from GeoTIFF files, falling back to world file and `.prj` sidecars for
//! plain TIFFs.

pub mod geokeys;
pub mod geotiff;
pub mod preview;
pub mod transform;
pub mod world_file;

pub use geotiff::{GeoTiffInspector, GeoTiffRaster};
pub use transform::GeoTransform;
