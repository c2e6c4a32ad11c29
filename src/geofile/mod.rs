pub mod exchange;
pub mod geojson;
pub mod persistence;
