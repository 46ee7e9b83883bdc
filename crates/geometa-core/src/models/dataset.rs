use chrono::NaiveDate;
use geo::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::MetadataError;

/// Kind of raster product being documented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    /// Digital terrain model (MDT)
    Terrain,
    /// Orthorectified aerial or satellite image
    Orthoimage,
}

impl DatasetType {
    pub const ALL: [DatasetType; 2] = [DatasetType::Terrain, DatasetType::Orthoimage];

    /// Canonical tag accepted on the command line
    pub fn tag(&self) -> &'static str {
        match self {
            DatasetType::Terrain => "terrain",
            DatasetType::Orthoimage => "orthoimage",
        }
    }

    /// Human-readable label used in templates
    pub fn label(&self) -> &'static str {
        match self {
            DatasetType::Terrain => "digital terrain model",
            DatasetType::Orthoimage => "orthoimage",
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DatasetType {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terrain" | "terrain-model" | "mdt" | "dtm" => Ok(DatasetType::Terrain),
            "orthoimage" | "ortho" | "orthophoto" => Ok(DatasetType::Orthoimage),
            "" => Err(MetadataError::invalid_input("dataset type is empty")),
            other => Err(MetadataError::invalid_input(format!(
                "unknown dataset type '{}'. Use terrain or orthoimage",
                other
            ))),
        }
    }
}

/// Coordinate reference system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrsKind {
    Projected,
    Geographic,
    Unknown,
}

/// Spatial reference read from the raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    /// EPSG code, if the raster declares a registered one
    pub epsg: Option<u32>,

    /// Citation or WKT name, if any
    pub name: Option<String>,

    pub kind: CrsKind,
}

impl SpatialReference {
    pub fn from_epsg(epsg: u32, kind: CrsKind) -> Self {
        Self { epsg: Some(epsg), name: None, kind }
    }

    pub fn unknown() -> Self {
        Self { epsg: None, name: None, kind: CrsKind::Unknown }
    }

    /// Identifier used in metadata and templates (e.g. "EPSG:25830")
    pub fn identifier(&self) -> String {
        match (&self.epsg, &self.name) {
            (Some(code), _) => format!("EPSG:{}", code),
            (None, Some(name)) => name.clone(),
            (None, None) => "unknown".to_string(),
        }
    }

    /// Unit of measure for cell sizes, as an ISO 19139 `uom` value
    pub fn resolution_unit(&self) -> &'static str {
        match self.kind {
            CrsKind::Geographic => "deg",
            CrsKind::Projected | CrsKind::Unknown => "m",
        }
    }
}

/// Interpretation of the raster grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellGeometry {
    Area,
    Point,
}

impl CellGeometry {
    pub fn code(&self) -> &'static str {
        match self {
            CellGeometry::Area => "area",
            CellGeometry::Point => "point",
        }
    }
}

/// Cell size along each axis, always positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

impl Resolution {
    /// Representative ground distance (the coarser axis)
    pub fn distance(&self) -> f64 {
        self.x.max(self.y)
    }
}

/// Intrinsic properties of a raster dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterProperties {
    /// Number of columns
    pub width: u32,

    /// Number of rows
    pub height: u32,

    pub band_count: u16,

    /// Sample format (e.g. "uint8", "float32")
    pub sample_format: String,

    pub bits_per_sample: u16,

    pub spatial_reference: SpatialReference,

    /// Extent in the native CRS
    pub extent: Rect<f64>,

    pub resolution: Resolution,

    pub nodata: Option<f64>,

    pub cell_geometry: CellGeometry,

    /// Storage format name (e.g. "GeoTIFF")
    pub format_name: String,

    /// Size of the dataset file in bytes
    pub file_size: u64,

    /// Last modification date of the dataset file
    pub modified: Option<NaiveDate>,
}

/// Minimum and maximum of the valid samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Downsampled copy of the raster used for thumbnails and statistics
#[derive(Debug, Clone, PartialEq)]
pub struct RasterPreview {
    pub width: u32,
    pub height: u32,
    pub bands: u16,

    /// Row-major, band-interleaved samples
    pub samples: Vec<f32>,

    pub nodata: Option<f64>,
}

impl RasterPreview {
    pub fn is_valid(&self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.nodata {
            Some(nodata) => value != nodata as f32,
            None => true,
        }
    }

    /// Range of the valid samples of one band
    pub fn band_range(&self, band: u16) -> Option<ValueRange> {
        if band >= self.bands {
            return None;
        }

        self.samples
            .iter()
            .skip(band as usize)
            .step_by(self.bands as usize)
            .filter(|v| self.is_valid(**v))
            .fold(None, |range: Option<ValueRange>, v| {
                let v = *v as f64;
                Some(match range {
                    Some(r) => ValueRange { min: r.min.min(v), max: r.max.max(v) },
                    None => ValueRange { min: v, max: v },
                })
            })
    }

    /// Range of the valid samples over all bands
    pub fn value_range(&self) -> Option<ValueRange> {
        (0..self.bands).filter_map(|b| self.band_range(b)).reduce(|a, b| ValueRange {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        })
    }
}

/// The input raster, resolved once per invocation
#[derive(Debug, Clone, Serialize)]
pub struct DatasetReference {
    pub path: PathBuf,

    /// File stem shared by all output artifacts
    pub base_name: String,

    pub dataset_type: DatasetType,

    pub properties: RasterProperties,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_type_aliases() {
        assert_eq!("terrain".parse::<DatasetType>().unwrap(), DatasetType::Terrain);
        assert_eq!("MDT".parse::<DatasetType>().unwrap(), DatasetType::Terrain);
        assert_eq!(" Ortho ".parse::<DatasetType>().unwrap(), DatasetType::Orthoimage);
        assert_eq!("orthophoto".parse::<DatasetType>().unwrap(), DatasetType::Orthoimage);
    }

    #[test]
    fn test_dataset_type_rejects_unknown() {
        let err = "lidar".parse::<DatasetType>().unwrap_err();
        assert!(matches!(err, MetadataError::InvalidInput { .. }));
        assert!("".parse::<DatasetType>().is_err());
    }

    #[test]
    fn test_spatial_reference_identifier() {
        assert_eq!(SpatialReference::from_epsg(25830, CrsKind::Projected).identifier(), "EPSG:25830");
        let named = SpatialReference {
            epsg: None,
            name: Some("Local grid".to_string()),
            kind: CrsKind::Projected,
        };
        assert_eq!(named.identifier(), "Local grid");
        assert_eq!(SpatialReference::unknown().identifier(), "unknown");
    }

    #[test]
    fn test_preview_ranges_skip_nodata() {
        let preview = RasterPreview {
            width: 2,
            height: 2,
            bands: 1,
            samples: vec![-9999.0, 10.0, 250.5, f32::NAN],
            nodata: Some(-9999.0),
        };
        let range = preview.value_range().unwrap();
        assert_eq!(range.min, 10.0);
        assert_eq!(range.max, 250.5);
    }

    #[test]
    fn test_preview_band_range_interleaved() {
        let preview = RasterPreview {
            width: 2,
            height: 1,
            bands: 3,
            samples: vec![1.0, 100.0, 50.0, 2.0, 200.0, 60.0],
            nodata: None,
        };
        assert_eq!(preview.band_range(1), Some(ValueRange { min: 100.0, max: 200.0 }));
        assert_eq!(preview.band_range(3), None);
        assert_eq!(preview.value_range(), Some(ValueRange { min: 1.0, max: 200.0 }));
    }

    #[test]
    fn test_preview_all_nodata_has_no_range() {
        let preview = RasterPreview {
            width: 1,
            height: 1,
            bands: 1,
            samples: vec![0.0],
            nodata: Some(0.0),
        };
        assert_eq!(preview.value_range(), None);
    }
}
