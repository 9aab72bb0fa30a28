use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// Padding applied around a path when fitting the map to it.
pub const BOUNDS_PADDING_DEG: f64 = 0.001;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Point {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn haversine_distance(&self, other: &Point) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// A sample of a track. Only `point` matters for playback, the rest is carried
/// through so it can be exported again.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackPoint {
    pub point: Point,
    pub altitude: Option<f64>,
    pub bearing: Option<f64>,
    pub timestamp: Option<DateTime<FixedOffset>>,
}

impl TrackPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        TrackPoint {
            point: Point::new(latitude, longitude),
            altitude: None,
            bearing: None,
            timestamp: None,
        }
    }

    pub fn checked(self) -> Result<Self> {
        if self.point.is_valid() {
            Ok(self)
        } else {
            Err(Error::InvalidCoordinate {
                latitude: self.point.latitude,
                longitude: self.point.longitude,
            })
        }
    }
}

impl From<Point> for TrackPoint {
    fn from(point: Point) -> Self {
        TrackPoint::new(point.latitude, point.longitude)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    pub fn contains(&self, point: &Point) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }
}

/// Ordered track samples. Insertion order is traversal order; timestamps are
/// never used to reorder. An empty path is the "no data" state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    samples: Vec<TrackPoint>,
    points: Vec<Point>,
}

impl Path {
    pub fn load(samples: Vec<TrackPoint>) -> Self {
        let points = samples.iter().map(|x| x.point).collect();
        info!("loaded path with {} points", samples.len());
        Path { samples, points }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        Self::load(points.into_iter().map(TrackPoint::from).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn samples(&self) -> &[TrackPoint] {
        &self.samples
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Bounding box padded by `BOUNDS_PADDING_DEG` on every side.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.first()?;
        let mut bounds = Bounds {
            min_lat: first.latitude,
            min_lon: first.longitude,
            max_lat: first.latitude,
            max_lon: first.longitude,
        };
        for point in &self.points[1..] {
            bounds.min_lat = bounds.min_lat.min(point.latitude);
            bounds.min_lon = bounds.min_lon.min(point.longitude);
            bounds.max_lat = bounds.max_lat.max(point.latitude);
            bounds.max_lon = bounds.max_lon.max(point.longitude);
        }
        Some(Bounds {
            min_lat: bounds.min_lat - BOUNDS_PADDING_DEG,
            min_lon: bounds.min_lon - BOUNDS_PADDING_DEG,
            max_lat: bounds.max_lat + BOUNDS_PADDING_DEG,
            max_lon: bounds.max_lon + BOUNDS_PADDING_DEG,
        })
    }

    pub fn total_length_m(&self) -> f64 {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| a.haversine_distance(b))
            .sum()
    }

    /// Linear interpolation between `floor(cursor)` and the next sample. Past
    /// the last segment the last point is returned as is.
    pub fn position_at(&self, cursor: f64) -> Option<Point> {
        let last = self.last()?;
        let cursor = cursor.max(0.0);
        let index = cursor.floor() as usize;
        if index >= self.points.len() - 1 {
            return Some(last);
        }
        let fraction = cursor - index as f64;
        if fraction == 0.0 {
            return Some(self.points[index]);
        }
        let start = self.points[index];
        let end = self.points[index + 1];
        Some(Point {
            latitude: start.latitude + fraction * (end.latitude - start.latitude),
            longitude: start.longitude + fraction * (end.longitude - start.longitude),
        })
    }
}
