pub mod geometry;
pub mod pattern;
