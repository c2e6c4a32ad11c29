use std::{fs, path::Path};

use chrono::NaiveDate;

use crate::{
    error::{AoiError, Result},
    store::feature::{Feature, FeatureDraft},
};

use super::geojson::{from_geojson_str, to_geojson_string};

const IMPORT_EXTENSIONS: [&str; 2] = ["geojson", "json"];

pub fn export_filename(date: NaiveDate) -> String {
    format!("aoi-features-{}.geojson", date.format("%Y-%m-%d"))
}

/// Export filename for today's date in UTC.
pub fn default_export_filename() -> String {
    export_filename(chrono::Utc::now().date_naive())
}

pub fn write_features_to_geojson(features: &[Feature], output_filepath: &Path) -> Result<()> {
    let geojson_contents = to_geojson_string(features)?;
    fs::write(output_filepath, geojson_contents)?;
    log::info!(
        "Wrote {} features to {:?}",
        features.len(),
        output_filepath
    );
    Ok(())
}

/// Read a `.geojson` or `.json` file holding a FeatureCollection, a Feature or a Geometry.
pub fn read_drafts_from_geojson(filepath: &Path) -> Result<Vec<FeatureDraft>> {
    let extension = filepath
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(extension) if IMPORT_EXTENSIONS.contains(&extension.as_str()) => {}
        _ => {
            return Err(AoiError::InvalidGeoJson(format!(
                "{:?} is not a .geojson or .json file",
                filepath
            )))
        }
    }
    let contents = fs::read_to_string(filepath)?;
    from_geojson_str(&contents)
}
