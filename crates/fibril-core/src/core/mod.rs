//! # Core Module
//!
//! The foundation layer: the capability interface the fibril engine uses to talk
//! to a molecular modeling host, one in-memory host implementation, the data
//! models it stores, file I/O and geometric helpers.
//!
//! ## Architecture
//!
//! - **Host Interface** ([`store`]) - The [`store::StructureStore`] trait: copy,
//!   query, transform, neighbor search and scene bookkeeping over named atom groups
//! - **Molecular Representation** ([`models`]) - Atoms, objects, the [`models::scene::Scene`]
//!   host and the morphology vocabulary
//! - **File I/O** ([`io`]) - PDB structures and CSV bead trajectories
//! - **Geometry** ([`utils`]) - Reference frames, centroids, bounding boxes and
//!   name-pattern matching
//!
//! Nothing in this layer knows about refinement or assembly; the [`crate::engine`]
//! drives a store exclusively through the trait.

pub mod io;
pub mod models;
pub mod store;
pub mod utils;
