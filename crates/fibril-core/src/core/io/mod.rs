//! Provides input/output functionality for structure and trajectory files.
//!
//! Structure formats implement the [`traits::StructureFile`] trait; the PDB
//! codec covers the ATOM/HETATM subset needed to load templates and export
//! assembled fibrils. Bead trajectories for morphology analysis are CSV.

pub mod pdb;
pub mod trajectory;
pub mod traits;
