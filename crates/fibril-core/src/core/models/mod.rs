//! # Core Models Module
//!
//! Data structures describing the molecular scene the fibril engine works on.
//!
//! - [`atom`] - Individual atoms with residue metadata and coordinates
//! - [`object`] - Named rigid groups of atoms
//! - [`scene`] - The in-memory [`StructureStore`](crate::core::store::StructureStore)
//!   implementation with selections and groups
//! - [`morphology`] - Target fibril morphologies, stacking patterns and handedness
//! - [`ids`] - Stable keys for scene objects

pub mod atom;
pub mod ids;
pub mod morphology;
pub mod object;
pub mod scene;
