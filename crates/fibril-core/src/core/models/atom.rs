use nalgebra::Point3;

const ALPHA_CARBON_NAME: &str = "CA";

/// Represents a single atom of a template or assembled structure.
///
/// Atoms carry just enough identity to round-trip through a structure file and
/// to be addressed by residue-range selections; the fibril engine itself only
/// ever looks at positions and the alpha-carbon flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The serial number from the source file (1-based, may be reassigned on write).
    pub serial: usize,
    /// The name of the atom (e.g., "CA", "N", "O").
    pub name: String,
    /// The three-letter name of the parent residue (e.g., "ALA").
    pub residue_name: String,
    /// The sequence number of the parent residue.
    pub residue_number: isize,
    /// The single-character chain identifier.
    pub chain_id: char,
    /// The element symbol, if known.
    pub element: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom` with empty residue metadata.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_number` - The sequence number of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_number: isize, position: Point3<f64>) -> Self {
        Self {
            serial: 0,
            name: name.to_string(),
            residue_name: String::new(),
            residue_number,
            chain_id: 'A',
            element: guess_element(name),
            position,
        }
    }

    pub fn with_residue_name(mut self, residue_name: &str) -> Self {
        self.residue_name = residue_name.to_string();
        self
    }

    pub fn with_chain(mut self, chain_id: char) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Returns `true` for protein alpha carbons (atom name `CA`, case-insensitive).
    pub fn is_alpha_carbon(&self) -> bool {
        self.name.eq_ignore_ascii_case(ALPHA_CARBON_NAME)
    }
}

/// Derives an element symbol from a PDB-style atom name.
pub fn guess_element(name: &str) -> String {
    name.trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}
