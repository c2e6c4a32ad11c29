pub mod area;
pub mod primitives;
