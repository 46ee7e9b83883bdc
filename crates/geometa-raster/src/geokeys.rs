//! GeoKeyDirectory decoding
//!
//! The directory is a flat `u16` array: a four-entry header followed by one
//! four-entry record per key (id, tag location, count, value or offset).

use geometa_core::models::{CellGeometry, CrsKind, SpatialReference};
use std::collections::BTreeMap;

pub const GT_MODEL_TYPE: u16 = 1024;
pub const GT_RASTER_TYPE: u16 = 1025;
pub const GT_CITATION: u16 = 1026;
pub const GEOGRAPHIC_TYPE: u16 = 2048;
pub const GEOG_CITATION: u16 = 2049;
pub const PROJECTED_CS_TYPE: u16 = 3072;
pub const PCS_CITATION: u16 = 3073;

const GEO_DOUBLE_PARAMS_TAG: u16 = 34736;
const GEO_ASCII_PARAMS_TAG: u16 = 34737;

/// EPSG "user-defined" sentinel
const USER_DEFINED: u16 = 32767;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum GeoKeyValue {
    Short(u16),
    Double(Vec<f64>),
    Ascii(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeys {
    keys: BTreeMap<u16, GeoKeyValue>,
}

impl GeoKeys {
    /// Decode the directory; malformed entries are skipped
    pub fn parse(directory: &[u16], doubles: &[f64], ascii: &str) -> Self {
        let mut keys = BTreeMap::new();
        if directory.len() < 4 {
            return Self { keys };
        }

        let count = directory[3] as usize;
        for entry in directory[4..].chunks_exact(4).take(count) {
            let (id, location, len, offset) =
                (entry[0], entry[1], entry[2] as usize, entry[3] as usize);

            let value = match location {
                0 => Some(GeoKeyValue::Short(entry[3])),
                GEO_DOUBLE_PARAMS_TAG => doubles
                    .get(offset..offset + len)
                    .map(|v| GeoKeyValue::Double(v.to_vec())),
                GEO_ASCII_PARAMS_TAG => ascii.get(offset..offset + len).map(|s| {
                    GeoKeyValue::Ascii(s.trim_end_matches(&['|', '\0'][..]).trim().to_string())
                }),
                _ => None,
            };

            match value {
                Some(value) => {
                    keys.insert(id, value);
                }
                None => tracing::debug!("Skipping GeoKey {} stored in tag {}", id, location),
            }
        }

        Self { keys }
    }

    pub fn short(&self, id: u16) -> Option<u16> {
        match self.keys.get(&id) {
            Some(GeoKeyValue::Short(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn ascii(&self, id: u16) -> Option<&str> {
        match self.keys.get(&id) {
            Some(GeoKeyValue::Ascii(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn cell_geometry(&self) -> CellGeometry {
        match self.short(GT_RASTER_TYPE) {
            Some(RASTER_PIXEL_IS_POINT) => CellGeometry::Point,
            _ => CellGeometry::Area,
        }
    }

    pub fn spatial_reference(&self) -> SpatialReference {
        let registered = |code: Option<u16>| code.filter(|c| *c != 0 && *c != USER_DEFINED);

        let projected = registered(self.short(PROJECTED_CS_TYPE));
        let geographic = registered(self.short(GEOGRAPHIC_TYPE));

        let kind = match self.short(GT_MODEL_TYPE) {
            Some(MODEL_TYPE_PROJECTED) => CrsKind::Projected,
            Some(MODEL_TYPE_GEOGRAPHIC) => CrsKind::Geographic,
            _ if projected.is_some() => CrsKind::Projected,
            _ if geographic.is_some() => CrsKind::Geographic,
            _ => CrsKind::Unknown,
        };

        let epsg = match kind {
            CrsKind::Projected => projected,
            CrsKind::Geographic => geographic,
            CrsKind::Unknown => None,
        };

        let name = [PCS_CITATION, GT_CITATION, GEOG_CITATION]
            .into_iter()
            .find_map(|id| self.ascii(id))
            .map(str::to_string);

        SpatialReference { epsg: epsg.map(u32::from), name, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(entries: &[[u16; 4]]) -> Vec<u16> {
        let mut dir = vec![1, 1, 0, entries.len() as u16];
        for e in entries {
            dir.extend_from_slice(e);
        }
        dir
    }

    #[test]
    fn test_projected_utm() {
        let dir = directory(&[
            [GT_MODEL_TYPE, 0, 1, 1],
            [GT_RASTER_TYPE, 0, 1, 1],
            [GT_CITATION, GEO_ASCII_PARAMS_TAG, 22, 0],
            [PROJECTED_CS_TYPE, 0, 1, 25830],
        ]);
        let keys = GeoKeys::parse(&dir, &[], "ETRS89 / UTM zone 30N|");

        let srs = keys.spatial_reference();
        assert_eq!(srs.epsg, Some(25830));
        assert_eq!(srs.kind, CrsKind::Projected);
        assert_eq!(srs.name.as_deref(), Some("ETRS89 / UTM zone 30N"));
        assert_eq!(keys.cell_geometry(), CellGeometry::Area);
    }

    #[test]
    fn test_geographic_pixel_is_point() {
        let dir = directory(&[
            [GT_MODEL_TYPE, 0, 1, 2],
            [GT_RASTER_TYPE, 0, 1, 2],
            [GEOGRAPHIC_TYPE, 0, 1, 4258],
        ]);
        let keys = GeoKeys::parse(&dir, &[], "");

        let srs = keys.spatial_reference();
        assert_eq!(srs.epsg, Some(4258));
        assert_eq!(srs.kind, CrsKind::Geographic);
        assert_eq!(keys.cell_geometry(), CellGeometry::Point);
    }

    #[test]
    fn test_user_defined_has_no_code() {
        let dir = directory(&[[GT_MODEL_TYPE, 0, 1, 1], [PROJECTED_CS_TYPE, 0, 1, USER_DEFINED]]);
        let srs = GeoKeys::parse(&dir, &[], "").spatial_reference();

        assert_eq!(srs.epsg, None);
        assert_eq!(srs.kind, CrsKind::Projected);
    }

    #[test]
    fn test_truncated_directory() {
        assert!(GeoKeys::parse(&[1, 1], &[], "").is_empty());
        // Count claims more keys than present
        let keys = GeoKeys::parse(&[1, 1, 0, 5, GT_MODEL_TYPE, 0, 1, 1], &[], "");
        assert_eq!(keys.short(GT_MODEL_TYPE), Some(1));
    }

    #[test]
    fn test_out_of_range_offsets_are_skipped() {
        let dir = directory(&[[GT_CITATION, GEO_ASCII_PARAMS_TAG, 40, 10]]);
        let keys = GeoKeys::parse(&dir, &[], "short|");
        assert_eq!(keys.ascii(GT_CITATION), None);
    }
}
