pub mod feature;
pub mod feature_store;
