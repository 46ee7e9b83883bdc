//! World file and `.prj` sidecars
//!
//! A world file holds six lines: x cell size, row rotation, column rotation,
//! y cell size (negative for north-up), then the x and y of the centre of
//! the upper-left cell.

use geometa_core::models::{CrsKind, SpatialReference};
use geometa_core::{MetadataError, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::transform::GeoTransform;

pub const WORLD_FILE_EXTENSIONS: [&str; 3] = ["tfw", "tifw", "wld"];

/// First world file found beside the raster
pub fn find_world_file(raster: &Path) -> Option<PathBuf> {
    WORLD_FILE_EXTENSIONS
        .iter()
        .map(|ext| raster.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

pub fn read_world_file(path: &Path) -> Result<GeoTransform> {
    let content = fs::read_to_string(path)?;
    parse_world_file(&content).map_err(|reason| MetadataError::dataset_read(path, reason))
}

pub fn parse_world_file(content: &str) -> std::result::Result<GeoTransform, String> {
    let values = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(6)
        .map(|l| l.parse::<f64>().map_err(|_| format!("invalid world file line '{}'", l)))
        .collect::<std::result::Result<Vec<f64>, String>>()?;

    let &[a, d, b, e, c, f] = values.as_slice() else {
        return Err(format!("world file has {} values, expected 6", values.len()));
    };

    if a == 0.0 || e == 0.0 {
        return Err("world file has a zero cell size".to_string());
    }

    // Shift from the centre of the upper-left cell to its corner
    Ok(GeoTransform {
        origin_x: c - a / 2.0 - b / 2.0,
        origin_y: f - d / 2.0 - e / 2.0,
        col_x: a,
        row_x: b,
        col_y: d,
        row_y: e,
    })
}

/// Spatial reference from a `.prj` sidecar, if there is one
pub fn read_prj(raster: &Path) -> Option<SpatialReference> {
    let path = raster.with_extension("prj");
    let wkt = fs::read_to_string(&path).ok()?;
    let srs = parse_prj(&wkt);
    if srs.epsg.is_none() {
        tracing::warn!("{} has no EPSG authority; CRS recorded by name only", path.display());
    }
    Some(srs)
}

/// Read kind, name and EPSG code out of an ESRI or OGC WKT1 string
pub fn parse_prj(wkt: &str) -> SpatialReference {
    let wkt = wkt.trim();
    let kind = if wkt.starts_with("PROJCS") {
        CrsKind::Projected
    } else if wkt.starts_with("GEOGCS") {
        CrsKind::Geographic
    } else {
        CrsKind::Unknown
    };

    let name = wkt
        .split('"')
        .nth(1)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    // The outermost AUTHORITY closes the WKT, so it is the last one
    let epsg = wkt.rmatch_indices("AUTHORITY[").find_map(|(idx, _)| {
        let rest = &wkt[idx..];
        let mut parts = rest.split('"');
        let authority = parts.nth(1)?;
        let code = parts.nth(1)?;
        if authority.eq_ignore_ascii_case("EPSG") {
            code.trim().parse::<u32>().ok()
        } else {
            None
        }
    });

    SpatialReference { epsg, name, kind }
}
