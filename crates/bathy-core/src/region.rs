use geo::{BoundingRect, Contains, Coord, Intersects, LineString, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{BathyError, Result};

/// Axis-aligned bounding box in grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    fn to_rect(self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

/// Area of interest. Every raster and vector query is clipped to it.
///
/// Coordinates are in the same reference system as the rasters it is applied
/// to; no reprojection happens here.
#[derive(Clone, Debug)]
pub struct Region {
    polygon: Polygon<f64>,
    bounds: Bounds,
}

impl Region {
    /// Build a region from an exterior ring. The ring is closed automatically.
    pub fn from_coords(coords: &[[f64; 2]]) -> Result<Self> {
        let finite = coords.iter().all(|c| c[0].is_finite() && c[1].is_finite());
        if !finite {
            return Err(BathyError::InvalidConfig(
                "region coordinates must be finite".into(),
            ));
        }

        let mut distinct: Vec<[f64; 2]> = Vec::with_capacity(coords.len());
        for c in coords {
            if !distinct.contains(c) {
                distinct.push(*c);
            }
        }
        if distinct.len() < 3 {
            return Err(BathyError::InvalidConfig(format!(
                "region needs at least 3 distinct vertices, got {}",
                distinct.len()
            )));
        }

        let ring: LineString<f64> = coords.iter().map(|c| (c[0], c[1])).collect();
        let polygon = Polygon::new(ring, vec![]);
        let rect = polygon
            .bounding_rect()
            .ok_or_else(|| BathyError::InvalidConfig("region has no extent".into()))?;
        let bounds = Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(BathyError::InvalidConfig("region has zero area".into()));
        }

        Ok(Self { polygon, bounds })
    }

    /// Rectangular region covering `bounds`.
    pub fn from_bounds(bounds: Bounds) -> Self {
        Self {
            polygon: bounds.to_rect().to_polygon(),
            bounds,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Exterior ring as plain coordinate pairs (closed).
    pub fn coords(&self) -> Vec<[f64; 2]> {
        self.polygon.exterior().coords().map(|c| [c.x, c.y]).collect()
    }

    /// Whether the point lies strictly inside the polygon.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.bounds.contains_point(x, y) {
            return false;
        }
        self.polygon.contains(&Point::new(x, y))
    }

    pub fn intersects_bounds(&self, other: &Bounds) -> bool {
        if !self.bounds.intersects(other) {
            return false;
        }
        self.polygon.intersects(&other.to_rect().to_polygon())
    }
}
