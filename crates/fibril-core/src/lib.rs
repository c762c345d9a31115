//! # fibrilkit
//!
//! Builds amyloid fibril models from a periodic β-sheet unit: flat and stacked
//! sheets, rods, stacked rods, ribbons and stacked ribbons. Twisted morphologies
//! are refined until a clash probe finds the helical geometry free of steric
//! overlap, then assembled by copying the unit peptides into place.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** The `StructureStore` capability trait through
//!   which all molecular work happens, the in-memory `Scene` host, morphology
//!   vocabulary, PDB and trajectory I/O, and geometric helpers.
//!
//! - **[`engine`]: The Logic Core.** Unit extraction, helical placement, the
//!   clash probe and edge-contact tasks, the geometry refiner and the assembler.
//!   Configuration, progress reporting and errors live here too.
//!
//! - **[`workflows`]: The Public API.** The per-morphology build entry points and
//!   the trajectory morphology analyzer.

pub mod core;
pub mod engine;
pub mod workflows;
