//! Geometric tests run by the refiner while it searches for a feasible helix.
//!
//! [`clash_probe`] places temporary copies of the unit in the store and asks it
//! for close contacts; [`edge_contact`] is a closed-form check of how adjacent
//! ribbon stacks meet.

pub mod clash_probe;
pub mod edge_contact;
