use std::fmt;

use crate::{
    error::{AoiError, Result},
    geometry::{
        area::polygon_area,
        primitives::{open_ring, LatLon, Ring},
    },
};

/// Identifier of a feature within a store. Assigned from a per-store sequence, never reused while
/// the store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Polygon,
    Polyline,
    Marker,
}

impl FeatureKind {
    /// Minimum number of points in each ring.
    pub fn min_ring_len(&self) -> usize {
        match self {
            FeatureKind::Polygon => 3,
            FeatureKind::Polyline => 2,
            FeatureKind::Marker => 1,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::Polygon => "Polygon",
            FeatureKind::Polyline => "Polyline",
            FeatureKind::Marker => "Marker",
        };
        write!(f, "{}", name)
    }
}

/// Check ring cardinality for `kind`: a polygon is an outer ring plus optional holes of at least
/// three points each, a polyline is one ring of at least two points and a marker is one ring of
/// exactly one point. All coordinates must be finite.
pub fn validate_rings(kind: FeatureKind, rings: &[Ring]) -> Result<()> {
    if rings.is_empty() {
        return Err(AoiError::InvalidGeometry(format!("{} without points", kind)));
    }
    if kind != FeatureKind::Polygon && rings.len() > 1 {
        return Err(AoiError::InvalidGeometry(format!(
            "{} must have a single ring, got {}",
            kind,
            rings.len()
        )));
    }
    for ring in rings {
        if ring.len() < kind.min_ring_len() {
            return Err(AoiError::InvalidGeometry(format!(
                "{} ring needs at least {} points, got {}",
                kind,
                kind.min_ring_len(),
                ring.len()
            )));
        }
        if ring.iter().any(|point| !point.is_finite()) {
            return Err(AoiError::InvalidGeometry(format!(
                "{} has non-finite coordinates",
                kind
            )));
        }
    }
    if kind == FeatureKind::Marker && rings[0].len() != 1 {
        return Err(AoiError::InvalidGeometry(format!(
            "Marker must be a single point, got {}",
            rings[0].len()
        )));
    }
    Ok(())
}

/// Normalize and validate rings for `kind`. Polygon rings are stored open, a repeated closing
/// point is dropped before the cardinality check.
pub fn prepare_rings(kind: FeatureKind, rings: Vec<Ring>) -> Result<Vec<Ring>> {
    let rings: Vec<Ring> = match kind {
        FeatureKind::Polygon => rings.into_iter().map(open_ring).collect(),
        FeatureKind::Polyline | FeatureKind::Marker => rings,
    };
    validate_rings(kind, &rings)?;
    Ok(rings)
}

/// A request to create a feature, as produced by drawing or decoding GeoJSON.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDraft {
    pub kind: FeatureKind,
    pub rings: Vec<Ring>,
    pub label: Option<String>,
    pub visible: Option<bool>,
    /// Identifier the feature carried when it was persisted.
    pub id_hint: Option<u64>,
}

impl FeatureDraft {
    pub fn new(kind: FeatureKind, rings: Vec<Ring>) -> Self {
        Self {
            kind,
            rings,
            label: None,
            visible: None,
            id_hint: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An area of interest. Fields are only mutated through `FeatureStore`, which keeps `area_sq_km`
/// in sync with `rings`.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: FeatureId,
    kind: FeatureKind,
    rings: Vec<Ring>,
    area_sq_km: Option<f64>,
    visible: bool,
    label: String,
}

impl Feature {
    /// `rings` must come out of `prepare_rings` for `kind`.
    pub(super) fn new(
        id: FeatureId,
        kind: FeatureKind,
        rings: Vec<Ring>,
        label: String,
        visible: bool,
    ) -> Self {
        let mut feature = Self {
            id,
            kind,
            rings: Vec::new(),
            area_sq_km: None,
            visible,
            label,
        };
        feature.set_rings(rings);
        feature
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Geodesic area in km², only present for polygons.
    pub fn area_sq_km(&self) -> Option<f64> {
        self.area_sq_km
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The single point of a marker, or the first point of any other kind.
    pub fn anchor(&self) -> Option<LatLon> {
        self.rings.first().and_then(|ring| ring.first()).copied()
    }

    /// Replace the geometry. `rings` must come out of `prepare_rings` for this feature's kind.
    pub(super) fn set_rings(&mut self, rings: Vec<Ring>) {
        self.area_sq_km = match self.kind {
            FeatureKind::Polygon => Some(polygon_area(&rings)),
            FeatureKind::Polyline | FeatureKind::Marker => None,
        };
        self.rings = rings;
    }

    pub(super) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(super) fn set_label(&mut self, label: String) {
        self.label = label;
    }
}

pub fn default_label(id: FeatureId) -> String {
    format!("Area {}", id.0)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::{error::AoiError, geometry::primitives::LatLon};

    use super::{prepare_rings, validate_rings, Feature, FeatureId, FeatureKind};

    fn ring(len: usize) -> Vec<LatLon> {
        (0..len)
            .map(|i| LatLon::new(i as f64 * 0.01, (i % 2) as f64 * 0.01))
            .collect()
    }

    #[rstest]
    #[case(FeatureKind::Polygon, vec![ring(3)])]
    #[case(FeatureKind::Polygon, vec![ring(5), ring(3), ring(4)])]
    #[case(FeatureKind::Polyline, vec![ring(2)])]
    #[case(FeatureKind::Marker, vec![ring(1)])]
    fn test_valid_rings(#[case] kind: FeatureKind, #[case] rings: Vec<Vec<LatLon>>) {
        validate_rings(kind, &rings).unwrap();
    }

    #[rstest]
    #[case(FeatureKind::Polygon, vec![])]
    #[case(FeatureKind::Polygon, vec![ring(2)])]
    #[case(FeatureKind::Polygon, vec![ring(4), ring(2)])] // Degenerate hole.
    #[case(FeatureKind::Polyline, vec![ring(1)])]
    #[case(FeatureKind::Polyline, vec![ring(2), ring(2)])]
    #[case(FeatureKind::Marker, vec![ring(0)])]
    #[case(FeatureKind::Marker, vec![ring(2)])]
    #[case(FeatureKind::Polyline, vec![vec![LatLon::new(0.0, 0.0), LatLon::new(f64::NAN, 1.0)]])]
    fn test_invalid_rings(#[case] kind: FeatureKind, #[case] rings: Vec<Vec<LatLon>>) {
        assert!(matches!(
            validate_rings(kind, &rings),
            Err(AoiError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_prepare_rings_opens_polygon_rings() {
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0, 1.0);
        let c = LatLon::new(1.0, 1.0);
        let rings = prepare_rings(FeatureKind::Polygon, vec![vec![a, b, c, a]]).unwrap();
        assert_eq!(vec![vec![a, b, c]], rings);
        let rings = prepare_rings(FeatureKind::Polygon, vec![vec![a, b, c, a, a]]).unwrap();
        assert_eq!(vec![vec![a, b, c]], rings);

        // A closed polyline is a loop, not a repeated point.
        let rings = prepare_rings(FeatureKind::Polyline, vec![vec![a, b, a]]).unwrap();
        assert_eq!(vec![vec![a, b, a]], rings);

        // Closing a two-point ring leaves too few points for a polygon.
        assert!(matches!(
            prepare_rings(FeatureKind::Polygon, vec![vec![a, b, a]]),
            Err(AoiError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_area_only_for_polygons() {
        let polygon = Feature::new(
            FeatureId(1),
            FeatureKind::Polygon,
            vec![ring(3)],
            "a".to_string(),
            true,
        );
        assert!(polygon.area_sq_km().is_some());

        let polyline = Feature::new(
            FeatureId(2),
            FeatureKind::Polyline,
            vec![ring(3)],
            "b".to_string(),
            true,
        );
        assert!(polyline.area_sq_km().is_none());
    }
}
