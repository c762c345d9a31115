//! Synthetic cross-β template shared by the engine and workflow tests.

use super::unit::PeriodicUnit;
use crate::core::models::atom::Atom;
use crate::core::models::scene::{AtomSelection, Scene};
use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

pub const CHAIN_SELECTIONS: [&str; 4] = ["p1", "p2", "p3", "p4"];
pub const ANCHORS: [&str; 3] = ["po1", "po2", "po3"];

const CHAIN_IDS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Four straight strands: sheet 1 in the `z = 0` plane, sheet 2 at
/// `z = sheet_spacing`, and the second peptide of each sheet `rise` above the
/// first along `y`. Every residue contributes N, CA and C along `x`.
#[derive(Debug, Clone)]
pub struct FixtureGeometry {
    pub rise: f64,
    pub sheet_spacing: f64,
    pub residues: usize,
    pub ca_spacing: f64,
    pub backbone_offset: f64,
}

impl Default for FixtureGeometry {
    fn default() -> Self {
        Self {
            rise: 4.8,
            sheet_spacing: 9.5,
            residues: 5,
            ca_spacing: 3.3,
            backbone_offset: 1.0,
        }
    }
}

impl FixtureGeometry {
    /// Extent of one strand along `x`, N of the first residue to C of the last.
    pub fn strand_length(&self) -> f64 {
        (self.residues - 1) as f64 * self.ca_spacing + 2.0 * self.backbone_offset
    }

    fn strand(&self, chain_id: char, y: f64, z: f64) -> Vec<Atom> {
        (0..self.residues)
            .flat_map(|i| {
                let x = i as f64 * self.ca_spacing;
                let residue_number = i as isize + 1;
                [
                    ("N", x - self.backbone_offset),
                    ("CA", x),
                    ("C", x + self.backbone_offset),
                ]
                .into_iter()
                .map(move |(name, x)| {
                    Atom::new(name, residue_number, Point3::new(x, y, z))
                        .with_residue_name("VAL")
                        .with_chain(chain_id)
                })
            })
            .collect()
    }
}

/// Adds the template object and the `p1..p4` / `po1..po3` selections.
///
/// `rotation` turns the whole template about a skewed axis through the origin,
/// by that many degrees.
pub fn load_template(scene: &mut Scene, geometry: &FixtureGeometry, rotation: Option<f64>) {
    let layout = [
        (0.0, 0.0),
        (geometry.rise, 0.0),
        (0.0, geometry.sheet_spacing),
        (geometry.rise, geometry.sheet_spacing),
    ];
    let mut atoms: Vec<Atom> = CHAIN_IDS
        .iter()
        .zip(layout)
        .flat_map(|(&chain_id, (y, z))| geometry.strand(chain_id, y, z))
        .collect();

    if let Some(degrees) = rotation {
        let axis = Unit::new_normalize(Vector3::new(1.0, -2.0, 0.5));
        let q = UnitQuaternion::from_axis_angle(&axis, degrees.to_radians());
        for atom in &mut atoms {
            atom.position = q * atom.position;
        }
    }

    scene.add_object("template", atoms).unwrap();
    for (name, chain_id) in CHAIN_SELECTIONS.iter().zip(CHAIN_IDS) {
        scene
            .select(name, "template", &AtomSelection::new().chain(chain_id))
            .unwrap();
    }
    let last = geometry.residues as isize;
    for (name, chain_id, residue) in [("po1", 'A', 1), ("po2", 'A', last), ("po3", 'B', 1)] {
        scene
            .select(
                name,
                "template",
                &AtomSelection::new()
                    .chain(chain_id)
                    .residue(residue)
                    .atom_name("CA"),
            )
            .unwrap();
    }
}

/// A scene holding the template plus the four extracted unit chains.
pub fn extracted_unit(geometry: &FixtureGeometry) -> (Scene, PeriodicUnit) {
    let mut scene = Scene::new();
    load_template(&mut scene, geometry, None);
    let unit = PeriodicUnit::extract(&mut scene, CHAIN_SELECTIONS, ANCHORS).unwrap();
    (scene, unit)
}
