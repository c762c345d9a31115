use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Frame {frame} has {found} beads, expected {expected}")]
    RaggedFrame {
        frame: u64,
        expected: usize,
        found: usize,
    },
    #[error("Trajectory contains no frames")]
    Empty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BeadRecord {
    frame: u64,
    x: f64,
    y: f64,
    z: f64,
}

/// A sequence of frames, each an ordered list of bead coordinates.
///
/// Stored on disk as CSV with a `frame,x,y,z` header. Rows of one frame must be
/// contiguous; bead order within a frame is row order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    frames: Vec<(u64, Vec<Point3<f64>>)>,
}

impl Trajectory {
    /// Builds a trajectory from in-memory frames numbered from zero.
    pub fn from_frames(frames: Vec<Vec<Point3<f64>>>) -> Result<Self, TrajectoryError> {
        let trajectory = Self {
            frames: frames
                .into_iter()
                .enumerate()
                .map(|(i, beads)| (i as u64, beads))
                .collect(),
        };
        trajectory.validate()?;
        Ok(trajectory)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of beads per frame.
    pub fn num_beads(&self) -> usize {
        self.frames.first().map_or(0, |(_, beads)| beads.len())
    }

    /// Iterates over `(frame_number, beads)` pairs.
    pub fn frames(&self) -> impl Iterator<Item = (u64, &[Point3<f64>])> {
        self.frames.iter().map(|(n, beads)| (*n, beads.as_slice()))
    }

    pub fn read_from(reader: impl Read) -> Result<Self, TrajectoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut frames: Vec<(u64, Vec<Point3<f64>>)> = Vec::new();
        for record in csv_reader.deserialize() {
            let bead: BeadRecord = record?;
            let position = Point3::new(bead.x, bead.y, bead.z);
            match frames.last_mut() {
                Some((frame, beads)) if *frame == bead.frame => beads.push(position),
                _ => frames.push((bead.frame, vec![position])),
            }
        }
        let trajectory = Self { frames };
        trajectory.validate()?;
        Ok(trajectory)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        Self::read_from(File::open(path)?)
    }

    pub fn write_to(&self, writer: impl Write) -> Result<(), TrajectoryError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for (frame, beads) in self.frames() {
            for p in beads {
                csv_writer.serialize(BeadRecord {
                    frame,
                    x: p.x,
                    y: p.y,
                    z: p.z,
                })?;
            }
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TrajectoryError> {
        self.write_to(File::create(path)?)
    }

    fn validate(&self) -> Result<(), TrajectoryError> {
        let expected = self.num_beads();
        if expected == 0 {
            return Err(TrajectoryError::Empty);
        }
        match self.frames.iter().find(|(_, beads)| beads.len() != expected) {
            Some((frame, beads)) => Err(TrajectoryError::RaggedFrame {
                frame: *frame,
                expected,
                found: beads.len(),
            }),
            None => Ok(()),
        }
    }
}
