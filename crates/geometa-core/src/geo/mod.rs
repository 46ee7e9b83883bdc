//! Geo module for CRS handling
//!
//! Converts native raster extents into the geographic bounding box required
//! by ISO 19115, without an external projection library.

pub mod crs;

pub use crs::{geographic_bounds, projection_for_epsg, GeographicBoundingBox, Projection};
