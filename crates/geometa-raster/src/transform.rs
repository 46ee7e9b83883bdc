//! Affine raster-to-model transform

use geo::{coord, BoundingRect, Coord, MultiPoint, Point, Rect};
use geometa_core::models::Resolution;

/// Maps the corner of cell (col, row) to model coordinates:
/// `x = origin_x + col * col_x + row * row_x`, `y = origin_y + col * col_y + row * row_y`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub col_x: f64,
    pub row_x: f64,
    pub col_y: f64,
    pub row_y: f64,
}

impl GeoTransform {
    /// From ModelPixelScale and the first ModelTiepoint
    pub fn from_scale_and_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<Self> {
        let (&sx, &sy) = (scale.first()?, scale.get(1)?);
        let [i, j, _k, x, y, ..] = *tiepoint else {
            return None;
        };
        if sx == 0.0 || sy == 0.0 {
            return None;
        }

        Some(Self {
            origin_x: x - i * sx,
            origin_y: y + j * sy,
            col_x: sx,
            row_x: 0.0,
            col_y: 0.0,
            row_y: -sy,
        })
    }

    /// From a row-major 4x4 ModelTransformation matrix
    pub fn from_matrix(m: &[f64]) -> Option<Self> {
        if m.len() < 16 {
            return None;
        }
        let transform = Self {
            origin_x: m[3],
            origin_y: m[7],
            col_x: m[0],
            row_x: m[1],
            col_y: m[4],
            row_y: m[5],
        };
        (transform.determinant() != 0.0).then_some(transform)
    }

    fn determinant(&self) -> f64 {
        self.col_x * self.row_y - self.row_x * self.col_y
    }

    pub fn apply(&self, col: f64, row: f64) -> Coord<f64> {
        coord! {
            x: self.origin_x + col * self.col_x + row * self.row_x,
            y: self.origin_y + col * self.col_y + row * self.row_y,
        }
    }

    /// Move the origin from a cell centre to its corner
    pub fn centre_to_corner(self) -> Self {
        let corner = self.apply(-0.5, -0.5);
        Self { origin_x: corner.x, origin_y: corner.y, ..self }
    }

    /// Bounding rectangle of the grid in model coordinates
    pub fn extent(&self, width: u32, height: u32) -> Rect<f64> {
        let (w, h) = (width as f64, height as f64);
        let corners: MultiPoint<f64> = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
            .into_iter()
            .map(|(c, r)| Point::from(self.apply(c, r)))
            .collect();

        // Four finite corners always have a bounding box
        corners
            .bounding_rect()
            .unwrap_or_else(|| Rect::new(self.apply(0.0, 0.0), self.apply(w, h)))
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            x: self.col_x.hypot(self.col_y),
            y: self.row_x.hypot(self.row_y),
        }
    }

    pub fn is_rotated(&self) -> bool {
        self.row_x != 0.0 || self.col_y != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_tiepoint() {
        let t = GeoTransform::from_scale_and_tiepoint(
            &[5.0, 5.0, 0.0],
            &[0.0, 0.0, 0.0, 430_000.0, 4_472_500.0, 0.0],
        )
        .unwrap();

        let extent = t.extent(2000, 1500);
        assert_eq!(extent.min(), coord! { x: 430_000.0, y: 4_465_000.0 });
        assert_eq!(extent.max(), coord! { x: 440_000.0, y: 4_472_500.0 });
        assert_eq!(t.resolution(), Resolution { x: 5.0, y: 5.0 });
        assert!(!t.is_rotated());
    }

    #[test]
    fn test_tiepoint_away_from_origin() {
        let t = GeoTransform::from_scale_and_tiepoint(
            &[2.0, 2.0],
            &[10.0, 20.0, 0.0, 1_000.0, 5_000.0, 0.0],
        )
        .unwrap();

        assert_eq!(t.origin_x, 980.0);
        assert_eq!(t.origin_y, 5_040.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(GeoTransform::from_scale_and_tiepoint(&[0.0, 1.0], &[0.0; 6]).is_none());
        assert!(GeoTransform::from_scale_and_tiepoint(&[1.0], &[0.0; 6]).is_none());
        assert!(GeoTransform::from_scale_and_tiepoint(&[1.0, 1.0], &[0.0; 4]).is_none());
        assert!(GeoTransform::from_matrix(&[0.0; 16]).is_none());
    }

    #[test]
    fn test_rotated_matrix_extent() {
        // 90 degree rotation: columns run south, rows run east
        let mut m = [0.0; 16];
        m[1] = 1.0;
        m[4] = -1.0;
        m[3] = 100.0;
        m[7] = 200.0;
        m[15] = 1.0;
        let t = GeoTransform::from_matrix(&m).unwrap();

        let extent = t.extent(10, 4);
        assert_eq!(extent.min(), coord! { x: 100.0, y: 190.0 });
        assert_eq!(extent.max(), coord! { x: 104.0, y: 200.0 });
        assert!(t.is_rotated());
        assert_eq!(t.resolution(), Resolution { x: 1.0, y: 1.0 });
    }

    #[test]
    fn test_centre_to_corner() {
        let t = GeoTransform {
            origin_x: 0.5,
            origin_y: 9.5,
            col_x: 1.0,
            row_x: 0.0,
            col_y: 0.0,
            row_y: -1.0,
        }
        .centre_to_corner();

        assert_eq!((t.origin_x, t.origin_y), (0.0, 10.0));
    }
}
