use crate::core::models::atom::Atom;
use crate::core::models::object::MolecularObject;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing structure file formats.
///
/// Readers produce a flat list of atoms that the caller loads into a scene as
/// one object; writers emit a sequence of scene objects.
pub trait StructureFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads all atoms from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Atom>, Self::Error>;

    /// Writes `objects` in order to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(objects: &[&MolecularObject], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads all atoms from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Atom>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes `objects` to a file path, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        objects: &[&MolecularObject],
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(objects, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
