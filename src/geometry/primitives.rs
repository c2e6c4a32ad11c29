use std::{fmt, str::FromStr};

use anyhow::anyhow;
use geo::BoundingRect;

/// A geographic point in degrees. Latitude comes first, unlike GeoJSON and `geo` which use x/y
/// (longitude/latitude) order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl From<LatLon> for geo::Coord {
    fn from(value: LatLon) -> Self {
        geo::Coord {
            x: value.lon,
            y: value.lat,
        }
    }
}

impl From<geo::Coord> for LatLon {
    fn from(value: geo::Coord) -> Self {
        Self {
            lat: value.y,
            lon: value.x,
        }
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Parses "lat,lon", the form used on the command line.
impl FromStr for LatLon {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("Expected a point as LAT,LON, got '{}'", s))?;
        Ok(Self::new(lat.trim().parse()?, lon.trim().parse()?))
    }
}

/// Ordered sequence of points. Rings are kept open: the first point is not repeated at the end.
pub type Ring = Vec<LatLon>;

pub fn ring_to_linestring(ring: &[LatLon]) -> geo::LineString {
    ring.iter().map(|point| geo::Coord::from(*point)).collect()
}

/// Drop trailing points equal to the first one, which closed rings carry.
pub fn open_ring(mut ring: Ring) -> Ring {
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Lon/lat bounding rectangle of all given rings, `None` when there are no points.
pub fn bounds_of<'a>(rings: impl IntoIterator<Item = &'a Ring>) -> Option<geo::Rect> {
    let points: geo::MultiPoint = rings
        .into_iter()
        .flatten()
        .map(|point| geo::Point::from(geo::Coord::from(*point)))
        .collect();
    points.bounding_rect()
}
