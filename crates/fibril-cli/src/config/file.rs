use crate::error::{CliError, Result};
use fibrilkit::core::models::morphology::{
    Handedness, MorphologyKind, SidechainFlip, StackingPattern, StrandAlignment,
};
use fibrilkit::engine::config::Layering;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileResidueRange {
    pub chain: char,
    /// Inclusive `[first, last]` residue numbers.
    pub residues: [isize; 2],
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileAnchorAtom {
    pub chain: char,
    pub residue: isize,
    pub atom: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileUnitConfig {
    pub sheet1_peptide1: FileResidueRange,
    pub sheet1_peptide2: FileResidueRange,
    pub sheet2_peptide1: FileResidueRange,
    pub sheet2_peptide2: FileResidueRange,
    pub anchors: Vec<FileAnchorAtom>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMorphologyConfig {
    #[serde(rename = "type")]
    pub kind: Option<MorphologyKind>,
    pub tilt: Option<f64>,
    pub radius: Option<f64>,
    pub stacking: Option<StackingPattern>,
    pub stack_angle: Option<f64>,
    pub num_stack: Option<usize>,
    pub num_half: Option<usize>,
    pub handedness: Option<Handedness>,
    pub alignment: Option<StrandAlignment>,
    pub sidechain_flip: Option<SidechainFlip>,
    /// Inclusive `[first, last]` Cα indices used to register flipped strands.
    pub alignment_window: Option<[usize; 2]>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRefinementConfig {
    pub dist_tolerance: Option<f64>,
    pub probe_offset: Option<f64>,
    pub twist_scan_step: Option<f64>,
    pub twist_scan_steps: Option<usize>,
    pub max_steps: Option<usize>,
    pub tilt_step: Option<f64>,
    pub radius_step: Option<f64>,
    pub tilt_offsets: Option<[f64; 2]>,
    pub layering: Option<Layering>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub unit: Option<FileUnitConfig>,
    pub morphology: Option<FileMorphologyConfig>,
    pub refinement: Option<FileRefinementConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
