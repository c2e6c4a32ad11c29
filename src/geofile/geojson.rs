use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};

use crate::{
    error::{AoiError, Result},
    geometry::primitives::{open_ring, ring_to_linestring, LatLon, Ring},
    store::feature::{Feature, FeatureDraft, FeatureKind},
};

pub const LABEL_PROPERTY: &str = "label";
pub const AREA_PROPERTY: &str = "areaSqKm";
pub const VISIBLE_PROPERTY: &str = "visible";

fn feature_to_geo(feature: &Feature) -> geo::Geometry {
    let mut rings = feature.rings().iter().map(|ring| ring_to_linestring(ring));
    let first = rings.next().unwrap_or_else(|| geo::LineString::new(Vec::new()));
    match feature.kind() {
        // geo closes the rings, as GeoJSON requires.
        FeatureKind::Polygon => geo::Geometry::Polygon(geo::Polygon::new(first, rings.collect())),
        FeatureKind::Polyline => geo::Geometry::LineString(first),
        FeatureKind::Marker => {
            let point = first.points().next();
            match point {
                Some(point) => geo::Geometry::Point(point),
                None => geo::Geometry::LineString(first),
            }
        }
    }
}

fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    let geometry = feature_to_geo(feature);

    let mut properties = JsonObject::new();
    properties.insert(LABEL_PROPERTY.to_string(), JsonValue::from(feature.label()));
    if let Some(area_sq_km) = feature.area_sq_km() {
        properties.insert(AREA_PROPERTY.to_string(), JsonValue::from(area_sq_km));
    }
    properties.insert(VISIBLE_PROPERTY.to_string(), JsonValue::from(feature.visible()));

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&geometry))),
        id: Some(Id::Number(serde_json::Number::from(feature.id().0))),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Encode features as a GeoJSON FeatureCollection. Coordinates are written in `[lon, lat]` order.
pub fn to_geojson(features: &[Feature]) -> geojson::FeatureCollection {
    features.iter().map(feature_to_geojson).collect()
}

pub fn to_geojson_string(features: &[Feature]) -> Result<String> {
    let geojson_contents = GeoJson::from(to_geojson(features));
    Ok(serde_json::to_string_pretty(&geojson_contents)?)
}

fn position_to_latlon(position: &[f64]) -> Result<LatLon> {
    match position {
        [lon, lat, ..] => Ok(LatLon::new(*lat, *lon)),
        _ => Err(AoiError::InvalidGeoJson(format!(
            "Position needs longitude and latitude, got {:?}",
            position
        ))),
    }
}

fn positions_to_ring(positions: &[Vec<f64>]) -> Result<Ring> {
    positions
        .iter()
        .map(|position| position_to_latlon(position))
        .collect()
}

fn polygon_rings(rings: &[Vec<Vec<f64>>]) -> Result<Vec<Ring>> {
    rings
        .iter()
        .map(|ring| positions_to_ring(ring).map(open_ring))
        .collect()
}

/// Map one GeoJSON geometry to drafts. Multi-geometries and collections yield one draft per member.
fn geometry_to_drafts(geometry: &geojson::Geometry, drafts: &mut Vec<FeatureDraft>) -> Result<()> {
    use geojson::Value;
    match &geometry.value {
        Value::Point(position) => drafts.push(FeatureDraft::new(
            FeatureKind::Marker,
            vec![vec![position_to_latlon(position)?]],
        )),
        Value::MultiPoint(positions) => {
            for position in positions {
                drafts.push(FeatureDraft::new(
                    FeatureKind::Marker,
                    vec![vec![position_to_latlon(position)?]],
                ));
            }
        }
        Value::LineString(positions) => drafts.push(FeatureDraft::new(
            FeatureKind::Polyline,
            vec![positions_to_ring(positions)?],
        )),
        Value::MultiLineString(lines) => {
            for positions in lines {
                drafts.push(FeatureDraft::new(
                    FeatureKind::Polyline,
                    vec![positions_to_ring(positions)?],
                ));
            }
        }
        Value::Polygon(rings) => {
            drafts.push(FeatureDraft::new(FeatureKind::Polygon, polygon_rings(rings)?))
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                drafts.push(FeatureDraft::new(FeatureKind::Polygon, polygon_rings(rings)?));
            }
        }
        Value::GeometryCollection(geometries) => {
            for member in geometries {
                geometry_to_drafts(member, drafts)?;
            }
        }
    }
    Ok(())
}

fn feature_to_drafts(feature: &geojson::Feature, drafts: &mut Vec<FeatureDraft>) -> Result<()> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| AoiError::InvalidGeoJson("Feature without geometry".to_string()))?;
    let first_new = drafts.len();
    geometry_to_drafts(geometry, drafts)?;

    let property = |key: &str| feature.properties.as_ref().and_then(|props| props.get(key));
    let label = property(LABEL_PROPERTY)
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let visible = property(VISIBLE_PROPERTY).and_then(JsonValue::as_bool);
    let id_hint = match &feature.id {
        Some(Id::Number(number)) => number.as_u64(),
        _ => None,
    };

    let new_drafts = &mut drafts[first_new..];
    let single = new_drafts.len() == 1;
    for draft in new_drafts {
        draft.label = label.clone();
        draft.visible = visible;
        if single {
            draft.id_hint = id_hint;
        }
    }
    Ok(())
}

/// Decode a FeatureCollection, Feature or bare Geometry into feature drafts, in document order.
///
/// Polygon rings lose their repeated closing point. Ring cardinality is not checked here, that
/// happens when the drafts are added to a store.
pub fn from_geojson(document: &GeoJson) -> Result<Vec<FeatureDraft>> {
    let mut drafts = Vec::new();
    match document {
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                feature_to_drafts(feature, &mut drafts)?;
            }
        }
        GeoJson::Feature(feature) => feature_to_drafts(feature, &mut drafts)?,
        GeoJson::Geometry(geometry) => geometry_to_drafts(geometry, &mut drafts)?,
    }
    Ok(drafts)
}

pub fn from_geojson_str(contents: &str) -> Result<Vec<FeatureDraft>> {
    let document: GeoJson = contents
        .parse()
        .map_err(|err: geojson::Error| AoiError::InvalidGeoJson(err.to_string()))?;
    from_geojson(&document)
}
