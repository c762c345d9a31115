//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::engine`] and [`crate::core`]
//! layers together into complete procedures.
//!
//! ## Overview
//!
//! - **Build Workflow** ([`build`]) - One entry point per fibril morphology. Each
//!   refines the helical geometry against the clash probe, assembles the copies
//!   into the structure store and reports the resulting dimensions.
//! - **Measure Workflow** ([`measure`]) - Fits an axis through bead segments of a
//!   simulated fibril trajectory and reports radius and pitch per frame.
//!
//! Build workflows either finish with the complete fibril in the store or leave
//! the store as they found it.

pub mod build;
pub mod measure;
