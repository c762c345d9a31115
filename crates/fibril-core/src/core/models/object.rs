use super::atom::Atom;
use nalgebra::Point3;

/// A named, rigid group of atoms held by a [`Scene`](super::scene::Scene).
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularObject {
    pub name: String,
    atoms: Vec<Atom>,
    /// Display color; recorded for bookkeeping only.
    pub color: Option<String>,
}

impl MolecularObject {
    pub fn new(name: &str, atoms: Vec<Atom>) -> Self {
        Self {
            name: name.to_string(),
            atoms,
            color: None,
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.atoms.iter().map(|a| &a.position)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}
