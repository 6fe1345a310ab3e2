//! Core geographic types for earthcube

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from corner coordinates
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Returns the east-west extent in degrees
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Returns the north-south extent in degrees
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns whether this box overlaps another
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    /// Returns whether a point falls inside this box
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.xmin && lon <= self.xmax && lat >= self.ymin && lat <= self.ymax
    }
}

/// A piecewise-linear geometry in WGS84 degrees
///
/// Transect selections arrive as xmin,xmax,ymin,ymax and become a
/// two-point line, but any multipoint string is representable.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGeometry {
    points: Vec<(f64, f64)>,
}

impl LineGeometry {
    /// Creates a line from an ordered point list (lon, lat)
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Creates the two-point line (xmin,ymin) -> (xmax,ymax)
    pub fn from_bounds(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self::new(vec![(xmin, ymin), (xmax, ymax)])
    }

    /// Returns the vertex list
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Total length in degree space
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| {
                let (dx, dy) = (w[1].0 - w[0].0, w[1].1 - w[0].1);
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    /// Returns the point at distance `d` from the start, clamped to the ends
    pub fn interpolate(&self, d: f64) -> (f64, f64) {
        if self.points.len() < 2 || d <= 0.0 {
            return self.points[0];
        }
        let mut remaining = d;
        for w in self.points.windows(2) {
            let (dx, dy) = (w[1].0 - w[0].0, w[1].1 - w[0].1);
            let seg = (dx * dx + dy * dy).sqrt();
            if remaining <= seg && seg > 0.0 {
                let t = remaining / seg;
                return (w[0].0 + dx * t, w[0].1 + dy * t);
            }
            remaining -= seg;
        }
        *self.points.last().unwrap()
    }

    /// Bounding box of the vertex list
    pub fn bounds(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x, y) in &self.points {
            bbox.xmin = bbox.xmin.min(x);
            bbox.ymin = bbox.ymin.min(y);
            bbox.xmax = bbox.xmax.max(x);
            bbox.ymax = bbox.ymax.max(y);
        }
        bbox
    }
}

/// Maps between geographic coordinates and raster pixel indices
///
/// North-up grids only: row 0 is the northern edge, `y_res` is the
/// positive per-pixel degree step going south.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub x_min: f64,
    pub y_max: f64,
    pub x_res: f64,
    pub y_res: f64,
}

impl GeoTransform {
    /// Creates a transform from the grid's north-west corner and resolution
    pub fn new(x_min: f64, y_max: f64, x_res: f64, y_res: f64) -> Self {
        Self { x_min, y_max, x_res, y_res }
    }

    /// Geographic center of pixel (row, col)
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_min + (col as f64 + 0.5) * self.x_res,
            self.y_max - (row as f64 + 0.5) * self.y_res,
        )
    }

    /// Nearest pixel (row, col) for a geographic point, if inside the grid
    pub fn pixel_at(&self, lon: f64, lat: f64, shape: (usize, usize)) -> Option<(usize, usize)> {
        let col = (lon - self.x_min) / self.x_res;
        let row = (self.y_max - lat) / self.y_res;
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if row < shape.0 && col < shape.1 {
            Some((row, col))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::new(1.0, 1.0, 3.0, 3.0);
        let c = BoundingBox::new(5.0, 5.0, 6.0, 6.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_bbox_contains() {
        let b = BoundingBox::new(-4.0, 52.0, -3.9, 52.6);
        assert!(b.contains(-3.95, 52.3));
        assert!(!b.contains(-3.95, 53.0));
    }

    #[test]
    fn test_line_length_and_interpolate() {
        let line = LineGeometry::from_bounds(0.0, 0.0, 3.0, 4.0);
        assert!((line.length() - 5.0).abs() < 1e-12);

        let mid = line.interpolate(2.5);
        assert!((mid.0 - 1.5).abs() < 1e-12);
        assert!((mid.1 - 2.0).abs() < 1e-12);

        // clamped past the end
        let end = line.interpolate(99.0);
        assert_eq!(end, (3.0, 4.0));
    }

    #[test]
    fn test_line_bounds() {
        let line = LineGeometry::from_bounds(-4.0, 52.5, -3.9, 52.6);
        let b = line.bounds();
        assert_eq!(b.xmin, -4.0);
        assert_eq!(b.ymax, 52.6);
    }

    #[test]
    fn test_transform_roundtrip() {
        let t = GeoTransform::new(10.0, 50.0, 0.1, 0.1);
        let (lon, lat) = t.pixel_center(0, 0);
        assert_eq!(t.pixel_at(lon, lat, (100, 100)), Some((0, 0)));

        let (lon, lat) = t.pixel_center(7, 3);
        assert_eq!(t.pixel_at(lon, lat, (100, 100)), Some((7, 3)));
    }

    #[test]
    fn test_transform_outside() {
        let t = GeoTransform::new(10.0, 50.0, 0.1, 0.1);
        assert_eq!(t.pixel_at(9.0, 49.0, (10, 10)), None);
        assert_eq!(t.pixel_at(10.05, 51.0, (10, 10)), None);
    }
}
