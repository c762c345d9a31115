//! # Engine Module
//!
//! This module implements the fibril construction engine: it turns a template
//! β-sheet unit and a target morphology into a set of rigid placements that close
//! the helical symmetry without steric clashes.
//!
//! ## Overview
//!
//! A build runs in three stages. The [`unit`] extractor aligns four peptide
//! chains into a reusable periodic unit and measures it. The [`refine`] stage
//! searches for a tilt, twist and radius whose helix closes through the unit's
//! rise while the clash probe in [`tasks`] confirms neighbouring copies keep
//! their distance. Finally [`assembly`] plans every copy and realizes it in a
//! [`StructureStore`](crate::core::store::StructureStore).
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Clash tolerance, scan resolution and refinement budget
//! - **Unit Extraction** ([`unit`]) - Reference frame, alignment and unit dimensions
//! - **Refinement** ([`refine`]) - Bounded per-family search for feasible helical parameters
//! - **Assembly** ([`assembly`]) - Pure placement planning and realization in a store
//! - **Reporting** ([`dimension`]) - Radius, pitch and period of the result
//! - **Progress Monitoring** ([`progress`]) - Progress reporting and user feedback mechanisms
//! - **Error Handling** ([`error`]) - Engine-specific error types and error propagation
//!
//! The engine never holds scene state between calls; every operation borrows the
//! store for its own duration and leaves no temporary objects behind.

pub mod assembly;
pub mod config;
pub mod dimension;
pub mod error;
pub(crate) mod placement;
pub mod progress;
pub mod refine;
pub(crate) mod tasks;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;
