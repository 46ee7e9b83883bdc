//! GeoTIFF inspector
//!
//! Georeferencing comes from the GeoTIFF tags when present, otherwise from
//! a world file and `.prj` sidecar next to the raster.

use chrono::{DateTime, Utc};
use geometa_core::models::{CellGeometry, CrsKind, RasterPreview, RasterProperties, SpatialReference};
use geometa_core::ports::RasterInspector;
use geometa_core::{MetadataError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{ifd::Value, ChunkType, Decoder, Limits};
use tiff::tags::Tag;

use crate::geokeys::GeoKeys;
use crate::preview::{samples_to_f32, ChunkLayout, PreviewBuilder};
use crate::transform::GeoTransform;
use crate::world_file::{find_world_file, read_prj, read_world_file};

pub const GEOTIFF_FORMAT: &str = "GeoTIFF";
pub const WORLD_FILE_FORMAT: &str = "TIFF with world file";

/// Largest single decoded strip or tile, in bytes
pub const DEFAULT_DECODING_LIMIT: usize = 256 * 1024 * 1024;

/// PlanarConfiguration value for band-sequential storage
const PLANAR_SEPARATE: u16 = 2;

/// Reads rasters with the pure-Rust `tiff` decoder
///
/// Previews are decoded one strip or tile at a time, so the decoding limit
/// bounds a single chunk rather than the whole raster.
#[derive(Debug, Clone)]
pub struct GeoTiffInspector {
    decoding_limit: usize,
}

impl Default for GeoTiffInspector {
    fn default() -> Self {
        Self { decoding_limit: DEFAULT_DECODING_LIMIT }
    }
}

impl GeoTiffInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decoding_limit(mut self, bytes: usize) -> Self {
        self.decoding_limit = bytes;
        self
    }

    /// Open and read properties in one step
    pub fn inspect(&self, path: &Path) -> Result<RasterProperties> {
        let mut raster = self.open(path)?;
        self.read_properties(&mut raster)
    }
}

/// An open TIFF file and its filesystem facts
pub struct GeoTiffRaster {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    file_size: u64,
    modified: Option<DateTime<Utc>>,
}

impl GeoTiffRaster {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, reason: impl std::fmt::Display) -> MetadataError {
        MetadataError::dataset_read(&self.path, reason)
    }

    fn tag(&mut self, tag: Tag) -> Result<Option<Value>> {
        self.decoder.find_tag(tag).map_err(|e| MetadataError::dataset_read(&self.path, e))
    }

    /// SHORT values; single ones decode as `Value::Unsigned`, lists as `Value::Short`
    fn tag_u16s(&mut self, tag: Tag) -> Result<Option<Vec<u16>>> {
        let Some(value) = self.tag(tag)? else {
            return Ok(None);
        };
        let values = value.into_u32_vec().map_err(|e| self.read_error(e))?;
        values
            .into_iter()
            .map(|v| {
                u16::try_from(v)
                    .map_err(|_| self.read_error(format!("{:?} value {} exceeds 16 bits", tag, v)))
            })
            .collect::<Result<Vec<u16>>>()
            .map(Some)
    }

    fn tag_f64s(&mut self, tag: Tag) -> Result<Option<Vec<f64>>> {
        match self.tag(tag)? {
            Some(value) => value.into_f64_vec().map(Some).map_err(|e| self.read_error(e)),
            None => Ok(None),
        }
    }

    fn tag_string(&mut self, tag: Tag) -> Result<Option<String>> {
        match self.tag(tag)? {
            Some(value) => value.into_string().map(Some).map_err(|e| self.read_error(e)),
            None => Ok(None),
        }
    }

    fn samples_per_pixel(&mut self) -> Result<u16> {
        Ok(self
            .tag_u16s(Tag::SamplesPerPixel)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1))
    }

    fn sample_layout(&mut self) -> Result<(u16, String)> {
        let bits = self
            .tag_u16s(Tag::BitsPerSample)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1);

        let kind = match self.tag_u16s(Tag::SampleFormat)?.and_then(|v| v.first().copied()) {
            Some(2) => "int",
            Some(3) => "float",
            _ => "uint",
        };

        Ok((bits, format!("{}{}", kind, bits)))
    }

    fn geo_keys(&mut self) -> Result<GeoKeys> {
        let Some(directory) = self.tag_u16s(Tag::GeoKeyDirectoryTag)? else {
            return Ok(GeoKeys::default());
        };
        let doubles = self.tag_f64s(Tag::GeoDoubleParamsTag)?.unwrap_or_default();
        let ascii = self.tag_string(Tag::GeoAsciiParamsTag)?.unwrap_or_default();

        Ok(GeoKeys::parse(&directory, &doubles, &ascii))
    }

    /// Affine transform from ModelTransformation or ModelPixelScale + ModelTiepoint
    fn tag_transform(&mut self) -> Result<Option<GeoTransform>> {
        if let Some(matrix) = self.tag_f64s(Tag::ModelTransformationTag)? {
            return Ok(GeoTransform::from_matrix(&matrix));
        }

        let scale = self.tag_f64s(Tag::ModelPixelScaleTag)?;
        let tiepoint = self.tag_f64s(Tag::ModelTiepointTag)?;
        Ok(match (scale, tiepoint) {
            (Some(scale), Some(tiepoint)) => GeoTransform::from_scale_and_tiepoint(&scale, &tiepoint),
            _ => None,
        })
    }

    fn nodata(&mut self) -> Result<Option<f64>> {
        let value = self.tag_string(Tag::GdalNodata)?;
        Ok(value.and_then(|s| {
            let s = s.trim_end_matches('\0').trim();
            match s.parse::<f64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring unparseable nodata value '{}'", s);
                    None
                }
            }
        }))
    }
}

impl RasterInspector for GeoTiffInspector {
    type Raster = GeoTiffRaster;

    fn open(&self, path: &Path) -> Result<GeoTiffRaster> {
        let file = File::open(path).map_err(|e| MetadataError::dataset_read(path, e))?;
        let metadata = file.metadata().map_err(|e| MetadataError::dataset_read(path, e))?;
        if !metadata.is_file() {
            return Err(MetadataError::dataset_read(path, "not a regular file"));
        }

        let mut limits = Limits::default();
        limits.decoding_buffer_size = self.decoding_limit;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| MetadataError::dataset_read(path, format!("not a readable TIFF: {}", e)))?
            .with_limits(limits);

        Ok(GeoTiffRaster {
            path: path.to_path_buf(),
            decoder,
            file_size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    fn read_properties(&self, raster: &mut GeoTiffRaster) -> Result<RasterProperties> {
        let (width, height) = raster.decoder.dimensions().map_err(|e| raster.read_error(e))?;
        let band_count = raster.samples_per_pixel()?;
        let (bits_per_sample, sample_format) = raster.sample_layout()?;
        let keys = raster.geo_keys()?;
        let cell_geometry = keys.cell_geometry();

        let (transform, format_name) = match raster.tag_transform()? {
            // GeoTIFF ties PixelIsPoint rasters to cell centres
            Some(transform) if cell_geometry == CellGeometry::Point => {
                (transform.centre_to_corner(), GEOTIFF_FORMAT)
            }
            Some(transform) => (transform, GEOTIFF_FORMAT),
            None => {
                let world_file = find_world_file(&raster.path)
                    .ok_or_else(|| raster.read_error("raster has no georeferencing"))?;
                tracing::debug!("Georeferencing {} from {}", raster.path.display(), world_file.display());
                (read_world_file(&world_file)?, WORLD_FILE_FORMAT)
            }
        };

        let mut spatial_reference = keys.spatial_reference();
        if spatial_reference.kind == CrsKind::Unknown && spatial_reference.epsg.is_none() {
            if let Some(prj) = read_prj(&raster.path) {
                spatial_reference = prj;
            }
        }
        if spatial_reference == SpatialReference::unknown() {
            tracing::warn!("{} declares no coordinate reference system", raster.path.display());
        }
        if transform.is_rotated() {
            tracing::warn!("{} is rotated; extent is its bounding rectangle", raster.path.display());
        }

        Ok(RasterProperties {
            width,
            height,
            band_count,
            sample_format,
            bits_per_sample,
            spatial_reference,
            extent: transform.extent(width, height),
            resolution: transform.resolution(),
            nodata: raster.nodata()?,
            cell_geometry,
            format_name: format_name.to_string(),
            file_size: raster.file_size,
            modified: raster.modified.map(|m| m.date_naive()),
        })
    }

    fn read_preview(&self, raster: &mut GeoTiffRaster, max_edge: u32) -> Result<RasterPreview> {
        let (width, height) = raster.decoder.dimensions().map_err(|e| raster.read_error(e))?;
        if width == 0 || height == 0 {
            return Err(raster.read_error("raster has no pixels"));
        }
        let nodata = raster.nodata()?;
        let bands = raster.samples_per_pixel()?.max(1);
        let planar = raster
            .tag_u16s(Tag::PlanarConfiguration)?
            .and_then(|v| v.first().copied())
            == Some(PLANAR_SEPARATE);

        let (chunk_width, chunk_height) = raster.decoder.chunk_dimensions();
        let layout = ChunkLayout {
            width,
            height,
            chunk_width: match raster.decoder.get_chunk_type() {
                ChunkType::Strip => width,
                ChunkType::Tile => chunk_width,
            },
            chunk_height,
        };
        if layout.chunk_width == 0 || layout.chunk_height == 0 {
            return Err(raster.read_error("raster declares empty strips or tiles"));
        }

        let planes = if planar { bands } else { 1 };
        let per_pixel = if planar { 1 } else { bands as usize };
        let per_plane = layout.chunks_per_plane();
        let mut builder = PreviewBuilder::new(width, height, bands, max_edge, nodata);
        let mut decoded = 0u32;

        for plane in 0..planes {
            for index in 0..per_plane {
                let window = layout.window(index);
                if !builder.needs(window) {
                    continue;
                }

                let chunk_index = plane as u32 * per_plane + index;
                let chunk = raster.decoder.read_chunk(chunk_index).map_err(|e| {
                    raster.read_error(format!("cannot decode pixels of chunk {}: {}", chunk_index, e))
                })?;
                let samples = samples_to_f32(chunk);

                let expected = window.width as usize * window.height as usize * per_pixel;
                if samples.len() < expected {
                    return Err(raster.read_error(format!(
                        "chunk {} decoded {} samples, expected {}",
                        chunk_index,
                        samples.len(),
                        expected
                    )));
                }

                builder.add_chunk(&samples, window, planar.then_some(plane));
                decoded += 1;
            }
        }

        tracing::debug!(
            "Preview of {} sampled {} of {} chunks",
            raster.path.display(),
            decoded,
            per_plane * planes as u32
        );
        Ok(builder.finish())
    }
}
