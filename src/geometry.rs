/// Shared coordinate primitives used by the editor, the map surface and the API client.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Earth radius used by the Web Mercator (EPSG:3857) projection.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;
const MIN_RING_POINTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coordinate: Coordinate) -> Self {
        [coordinate.x, coordinate.y]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    #[error("ring needs at least 4 points, got {0}")]
    TooFewPoints(usize),
    #[error("ring is not closed")]
    NotClosed,
    #[error("ring contains a non-finite coordinate")]
    NonFinite,
    #[error("rectangle corners span no area")]
    DegenerateRectangle,
    #[error("polygon needs at least three distinct vertices")]
    TooFewVertices,
    #[error("coordinates are not a list of [x, y] pairs")]
    Malformed,
}

/// Closed outer boundary of a shape: the first and last points are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct Ring {
    points: Vec<Coordinate>,
}

impl Ring {
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned box between two opposite corners, wound counter-clockwise from the minimum corner.
    pub fn rectangle(start: Coordinate, end: Coordinate) -> Result<Self, RingError> {
        let min_x = start.x.min(end.x);
        let max_x = start.x.max(end.x);
        let min_y = start.y.min(end.y);
        let max_y = start.y.max(end.y);
        if min_x == max_x || min_y == max_y {
            return Err(RingError::DegenerateRectangle);
        }

        Self::try_from(vec![
            Coordinate::new(min_x, min_y),
            Coordinate::new(max_x, min_y),
            Coordinate::new(max_x, max_y),
            Coordinate::new(min_x, max_y),
            Coordinate::new(min_x, min_y),
        ])
    }

    /// Builds a ring from drawn vertices, closing it when the caller did not repeat the first point.
    pub fn polygon(vertices: &[Coordinate]) -> Result<Self, RingError> {
        let mut points = vertices.to_vec();
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if first != last {
                points.push(first);
            }
        }

        let mut distinct: Vec<Coordinate> = Vec::with_capacity(points.len());
        for point in &points[..points.len().saturating_sub(1)] {
            if !distinct.contains(point) {
                distinct.push(*point);
            }
        }
        if distinct.len() < 3 {
            return Err(RingError::TooFewVertices);
        }

        Self::try_from(points)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|point| point.translated(dx, dy))
                .collect(),
        }
    }

    pub fn extent(&self) -> Extent {
        let mut extent = Extent::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for point in &self.points {
            extent.min_x = extent.min_x.min(point.x);
            extent.min_y = extent.min_y.min(point.y);
            extent.max_x = extent.max_x.max(point.x);
            extent.max_y = extent.max_y.max(point.y);
        }
        extent
    }

    /// Even-odd ray casting; points exactly on an edge may land either way.
    pub fn contains(&self, point: Coordinate) -> bool {
        let mut inside = false;
        for edge in self.points.windows(2) {
            let (a, b) = (edge[0], edge[1]);
            if (a.y > point.y) != (b.y > point.y) {
                let crossing_x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if point.x < crossing_x {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

impl TryFrom<Vec<Coordinate>> for Ring {
    type Error = RingError;

    fn try_from(points: Vec<Coordinate>) -> Result<Self, Self::Error> {
        if points.len() < MIN_RING_POINTS {
            return Err(RingError::TooFewPoints(points.len()));
        }
        if points
            .iter()
            .any(|point| !point.x.is_finite() || !point.y.is_finite())
        {
            return Err(RingError::NonFinite);
        }
        if points.first() != points.last() {
            return Err(RingError::NotClosed);
        }
        Ok(Self { points })
    }
}

impl From<Ring> for Vec<Coordinate> {
    fn from(ring: Ring) -> Self {
        ring.points
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|value| value.is_finite())
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }
}

/// Geographic bounds in degrees, ordered `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LonLatBounds {
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [west, south, east, north] => Some(Self {
                west: *west,
                south: *south,
                east: *east,
                north: *north,
            }),
            _ => None,
        }
    }

    pub fn to_map_extent(self) -> Extent {
        let south_west = from_lon_lat(self.west, self.south);
        let north_east = from_lon_lat(self.east, self.north);
        Extent::new(south_west.x, south_west.y, north_east.x, north_east.y)
    }
}

/// Projects a lon/lat pair in degrees into Web Mercator metres.
pub fn from_lon_lat(lon: f64, lat: f64) -> Coordinate {
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Coordinate::new(x, y)
}
