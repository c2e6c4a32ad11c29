use super::primitives::{LatLon, Ring};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const SQ_M_PER_SQ_KM: f64 = 1_000_000.0;

/// Geodesic area of a ring on a spherical Earth, in km².
///
/// Every consecutive pair of points contributes the spherical excess of the quadrilateral
/// between the segment and the equator. Contributions are absolute-valued per segment and the ring is not closed
/// implicitly: only the segments actually traced by `ring` are summed. Concave or
/// self-intersecting rings are therefore not measured exactly.
///
/// Rings with fewer than two points have zero area. Non-finite coordinates propagate as NaN,
/// callers are expected to reject them first.
pub fn area(ring: &[LatLon]) -> f64 {
    let area_sq_m: f64 = ring
        .windows(2)
        .map(|pair| {
            segment_double_area(&pair[0], &pair[1]).abs() * EARTH_RADIUS_M.powi(2) / 2.0
        })
        .sum();
    area_sq_m / SQ_M_PER_SQ_KM
}

/// Area of a polygon given as outer ring followed by holes, in km². Never negative.
pub fn polygon_area(rings: &[Ring]) -> f64 {
    match rings.split_first() {
        Some((outer, holes)) => {
            let holes_area: f64 = holes.iter().map(|hole| area(hole)).sum();
            (area(outer) - holes_area).max(0.0)
        }
        None => 0.0,
    }
}

/// Signed spherical excess between the segment `p1 -> p2` and the equator, doubled, on the unit
/// sphere.
///
/// `excess` is the full spherical excess `E = 2·atan2(..)` and the segment contributes `2·E`, so
/// the sum over a ring is `4·atan2(..)` per segment before scaling by `R²/2`. Both factors of two
/// are intended: dropping either one halves the result (0.62 instead of 1.236 km² for a 0.01°
/// square at the equator).
fn segment_double_area(p1: &LatLon, p2: &LatLon) -> f64 {
    let phi_1 = p1.lat.to_radians();
    let phi_2 = p2.lat.to_radians();
    let delta_lambda = (p2.lon - p1.lon).to_radians();

    let tan_half_phi_1 = (phi_1 / 2.0).tan();
    let tan_half_phi_2 = (phi_2 / 2.0).tan();
    let excess = 2.0
        * f64::atan2(
            (delta_lambda / 2.0).tan() * (tan_half_phi_1 + tan_half_phi_2),
            1.0 + tan_half_phi_1 * tan_half_phi_2,
        );
    2.0 * excess
}
