pub mod build;
pub mod measure;
