use crate::core::io::traits::StructureFile;
use crate::core::models::atom::{Atom, guess_element};
use crate::core::models::object::MolecularObject;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const MIN_ATOM_RECORD_LEN: usize = 54;
const MAX_SERIAL: usize = 99_999;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.to_string(),
        },
    })
}

fn parse_atom_record(line: &str, line_num: usize) -> Result<Atom, PdbError> {
    if line.len() < MIN_ATOM_RECORD_LEN {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::LineTooShort,
        });
    }

    let serial_str = slice_and_trim(line, 6, 11);
    let serial = if serial_str.is_empty() {
        0
    } else {
        serial_str.parse().map_err(|_| PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::InvalidInt {
                columns: "7-11".into(),
                value: serial_str.to_string(),
            },
        })?
    };

    let name = slice_and_trim(line, 12, 16);
    if name.is_empty() {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::MissingRequiredField {
                columns: "13-16".into(),
            },
        });
    }

    let res_seq_str = slice_and_trim(line, 22, 26);
    let residue_number: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: "23-26".into(),
            value: res_seq_str.to_string(),
        },
    })?;

    let x = parse_float(line, line_num, 30, 38)?;
    let y = parse_float(line, line_num, 38, 46)?;
    let z = parse_float(line, line_num, 46, 54)?;

    let chain_id = line
        .get(21..22)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
        .unwrap_or('A');
    let element = match slice_and_trim(line, 76, 78) {
        "" => guess_element(name),
        e => e.to_ascii_uppercase(),
    };

    Ok(Atom {
        serial,
        name: name.to_string(),
        residue_name: slice_and_trim(line, 17, 20).to_string(),
        residue_number,
        chain_id,
        element,
        position: Point3::new(x, y, z),
    })
}

/// PDB atom-name field: four-character names start in column 13, shorter
/// names in column 14.
fn format_atom_name(name: &str) -> String {
    if name.len() >= 4 {
        name.chars().take(4).collect()
    } else {
        format!(" {:<3}", name)
    }
}

/// Reader and writer for the ATOM/HETATM subset of the PDB format.
///
/// Only coordinates and residue identity are kept; every other record is
/// skipped on read. On write, atoms are renumbered and each object is closed
/// with a `TER` record.
pub struct PdbFile;

impl StructureFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Atom>, Self::Error> {
        let mut atoms = Vec::new();
        for (index, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = index + 1;
            if line.starts_with("ENDMDL") {
                break;
            }
            if line.starts_with("ATOM") || line.starts_with("HETATM") {
                atoms.push(parse_atom_record(&line, line_num)?);
            }
        }
        if atoms.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }
        Ok(atoms)
    }

    fn write_to(objects: &[&MolecularObject], writer: &mut impl Write) -> Result<(), Self::Error> {
        let mut serial = 0usize;
        for object in objects {
            writeln!(writer, "REMARK   1 OBJECT {}", object.name)?;
            let mut last = None;
            for atom in object.atoms() {
                serial = serial % MAX_SERIAL + 1;
                writeln!(
                    writer,
                    "{:<6}{:>5} {}{:1}{:>3} {}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                    "ATOM",
                    serial,
                    format_atom_name(&atom.name),
                    "",
                    atom.residue_name,
                    atom.chain_id,
                    atom.residue_number,
                    "",
                    atom.position.x,
                    atom.position.y,
                    atom.position.z,
                    1.0,
                    0.0,
                    atom.element
                )?;
                last = Some(atom);
            }
            if let Some(atom) = last {
                serial = serial % MAX_SERIAL + 1;
                writeln!(
                    writer,
                    "TER   {:>5}      {:>3} {}{:>4}",
                    serial, atom.residue_name, atom.chain_id, atom.residue_number
                )?;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}
