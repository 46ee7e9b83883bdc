//! Inverse projections for the CRSs terrain models and orthoimages ship in
//!
//! Datum shifts are ignored: bounding boxes are accurate to a few hundred
//! metres, which is what a discovery bounding box needs.

use geo::{BoundingRect, Coord, MultiPoint, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::models::{CrsKind, SpatialReference};

/// Points sampled along each edge of a projected extent
const EDGE_SAMPLES: usize = 16;

const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// ISO 19115 EX_GeographicBoundingBox, in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicBoundingBox {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid =
        Ellipsoid { semi_major_axis: 6_378_137.0, inverse_flattening: 298.257_223_563 };
    pub const GRS80: Ellipsoid =
        Ellipsoid { semi_major_axis: 6_378_137.0, inverse_flattening: 298.257_222_101 };
    pub const INTERNATIONAL_1924: Ellipsoid =
        Ellipsoid { semi_major_axis: 6_378_388.0, inverse_flattening: 297.0 };

    fn eccentricity_squared(&self) -> f64 {
        let f = 1.0 / self.inverse_flattening;
        f * (2.0 - f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Coordinates are already longitude/latitude
    Geographic,
    Utm { zone: u8, south: bool, ellipsoid: Ellipsoid },
    WebMercator,
}

/// Projection for an EPSG code, if it is one we can invert
pub fn projection_for_epsg(code: u32) -> Option<Projection> {
    let utm = |zone: u32, south: bool, ellipsoid: Ellipsoid| Projection::Utm {
        zone: zone as u8,
        south,
        ellipsoid,
    };

    match code {
        4326 | 4258 | 4230 | 4617 | 4269 | 4674 => Some(Projection::Geographic),
        32601..=32660 => Some(utm(code - 32600, false, Ellipsoid::WGS84)),
        32701..=32760 => Some(utm(code - 32700, true, Ellipsoid::WGS84)),
        25828..=25838 => Some(utm(code - 25800, false, Ellipsoid::GRS80)),
        26901..=26923 => Some(utm(code - 26900, false, Ellipsoid::GRS80)),
        23028..=23038 => Some(utm(code - 23000, false, Ellipsoid::INTERNATIONAL_1924)),
        3857 | 3785 | 900913 => Some(Projection::WebMercator),
        _ => None,
    }
}

impl Projection {
    /// Convert a native coordinate to (longitude, latitude) in degrees
    pub fn to_lon_lat(&self, c: Coord<f64>) -> Coord<f64> {
        match *self {
            Projection::Geographic => c,
            Projection::Utm { zone, south, ellipsoid } => inverse_utm(c, zone, south, ellipsoid),
            Projection::WebMercator => Coord {
                x: (c.x / WEB_MERCATOR_RADIUS).to_degrees(),
                y: (2.0 * (c.y / WEB_MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
                    .to_degrees(),
            },
        }
    }
}

/// Inverse transverse Mercator (Snyder, USGS PP 1395, eqs. 8-12 to 8-25)
fn inverse_utm(c: Coord<f64>, zone: u8, south: bool, ellipsoid: Ellipsoid) -> Coord<f64> {
    let k0 = 0.9996;
    let a = ellipsoid.semi_major_axis;
    let e2 = ellipsoid.eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);

    let x = c.x - 500_000.0;
    let y = if south { c.y - 10_000_000.0 } else { c.y };

    let m = y / k0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1, tan1) = (phi1.sin(), phi1.cos(), phi1.tan());
    let c1 = ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let n1 = a / (1.0 - e2 * sin1 * sin1).sqrt();
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = x / (n1 * k0);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let central_meridian = (zone as f64 * 6.0 - 183.0).to_radians();
    let lon = central_meridian
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;

    Coord { x: lon.to_degrees(), y: lat.to_degrees() }
}

/// Geographic bounding box of a native extent, when the CRS can be inverted
pub fn geographic_bounds(
    extent: &Rect<f64>,
    spatial_reference: &SpatialReference,
) -> Option<GeographicBoundingBox> {
    let projection = match spatial_reference.epsg.and_then(projection_for_epsg) {
        Some(projection) => projection,
        None if spatial_reference.kind == CrsKind::Geographic => Projection::Geographic,
        None => {
            tracing::warn!(
                "No inverse projection for {}; geographic bounding box omitted",
                spatial_reference.identifier()
            );
            return None;
        }
    };

    let (min, max) = (extent.min(), extent.max());
    let step = |from: f64, to: f64, i: usize| from + (to - from) * i as f64 / EDGE_SAMPLES as f64;

    let mut points = Vec::with_capacity(4 * (EDGE_SAMPLES + 1));
    for i in 0..=EDGE_SAMPLES {
        let x = step(min.x, max.x, i);
        let y = step(min.y, max.y, i);
        points.push(Coord { x, y: min.y });
        points.push(Coord { x, y: max.y });
        points.push(Coord { x: min.x, y });
        points.push(Coord { x: max.x, y });
    }

    let transformed: MultiPoint<f64> = points
        .into_iter()
        .map(|c| projection.to_lon_lat(c))
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .map(Point::from)
        .collect();

    let rect = transformed.bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    if max.x < -180.0 || min.x > 180.0 || max.y < -90.0 || min.y > 90.0 {
        tracing::warn!("Extent of {} falls outside valid coordinates", spatial_reference.identifier());
        return None;
    }

    let bbox = GeographicBoundingBox {
        west: min.x.clamp(-180.0, 180.0),
        east: max.x.clamp(-180.0, 180.0),
        south: min.y.clamp(-90.0, 90.0),
        north: max.y.clamp(-90.0, 90.0),
    };
    if bbox != (GeographicBoundingBox { west: min.x, east: max.x, south: min.y, north: max.y }) {
        tracing::warn!("Clamped geographic bounds of {} to valid coordinates", spatial_reference.identifier());
    }

    Some(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {} within {} of {}",
            actual,
            tolerance,
            expected
        );
    }

    #[test]
    fn test_projection_lookup() {
        assert_eq!(projection_for_epsg(4326), Some(Projection::Geographic));
        assert!(matches!(
            projection_for_epsg(25830),
            Some(Projection::Utm { zone: 30, south: false, .. })
        ));
        assert!(matches!(
            projection_for_epsg(32756),
            Some(Projection::Utm { zone: 56, south: true, .. })
        ));
        assert_eq!(projection_for_epsg(2154), None);
    }

    #[test]
    fn test_utm_central_meridian_on_equator() {
        let projection = projection_for_epsg(25830).unwrap();
        let c = projection.to_lon_lat(coord! { x: 500_000.0, y: 0.0 });
        assert_close(c.x, -3.0, 1e-9);
        assert_close(c.y, 0.0, 1e-9);
    }

    #[test]
    fn test_utm_madrid() {
        let projection = projection_for_epsg(25830).unwrap();
        let c = projection.to_lon_lat(coord! { x: 440_291.0, y: 4_474_254.0 });
        assert_close(c.x, -3.7038, 1e-3);
        assert_close(c.y, 40.4168, 1e-3);
    }

    #[test]
    fn test_web_mercator() {
        let projection = Projection::WebMercator;
        let c = projection.to_lon_lat(coord! { x: 20_037_508.342_789_244, y: 0.0 });
        assert_close(c.x, 180.0, 1e-9);
        assert_close(c.y, 0.0, 1e-9);
    }

    #[test]
    fn test_geographic_bounds_for_utm_extent() {
        let extent = Rect::new(coord! { x: 430_000.0, y: 4_465_000.0 }, coord! { x: 450_000.0, y: 4_485_000.0 });
        let srs = SpatialReference::from_epsg(25830, CrsKind::Projected);
        let bbox = geographic_bounds(&extent, &srs).unwrap();

        assert!(bbox.west < -3.7 && bbox.east > -3.7);
        assert!(bbox.south < 40.42 && bbox.north > 40.42);
        assert!(bbox.east - bbox.west < 0.3);
    }

    #[test]
    fn test_geographic_bounds_passthrough() {
        let extent = Rect::new(coord! { x: -4.0, y: 40.0 }, coord! { x: -3.0, y: 41.0 });
        let srs = SpatialReference::from_epsg(4258, CrsKind::Geographic);
        let bbox = geographic_bounds(&extent, &srs).unwrap();
        assert_eq!(bbox, GeographicBoundingBox { west: -4.0, east: -3.0, south: 40.0, north: 41.0 });
    }

    #[test]
    fn test_geographic_bounds_are_clamped() {
        let srs = SpatialReference::from_epsg(4326, CrsKind::Geographic);

        let extent = Rect::new(coord! { x: 0.0, y: -95.0 }, coord! { x: 360.0, y: 95.0 });
        let bbox = geographic_bounds(&extent, &srs).unwrap();
        assert_eq!(bbox, GeographicBoundingBox { west: 0.0, east: 180.0, south: -90.0, north: 90.0 });

        let extent = Rect::new(coord! { x: -200.0, y: 10.0 }, coord! { x: -170.0, y: 20.0 });
        let bbox = geographic_bounds(&extent, &srs).unwrap();
        assert_eq!(bbox.west, -180.0);
        assert_eq!(bbox.east, -170.0);
    }

    #[test]
    fn test_geographic_bounds_outside_valid_range() {
        let srs = SpatialReference::from_epsg(4326, CrsKind::Geographic);
        let extent = Rect::new(coord! { x: 190.0, y: 0.0 }, coord! { x: 200.0, y: 10.0 });
        assert!(geographic_bounds(&extent, &srs).is_none());
    }

    #[test]
    fn test_geographic_bounds_unknown_crs() {
        let extent = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 });
        assert!(geographic_bounds(&extent, &SpatialReference::unknown()).is_none());
    }
}
