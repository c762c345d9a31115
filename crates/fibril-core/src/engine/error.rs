use thiserror::Error;

use super::config::ConfigError;
use super::refine::GeometryParameters;
use crate::core::models::morphology::{MorphologyError, MorphologyKind};
use crate::core::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Selection '{0}' matched no atoms")]
    EmptySelection(String),

    #[error("Cannot build a reference frame: {0}")]
    DegenerateFrame(String),

    #[error("Sheet {sheet} has a non-positive rise ({value:.3} Å); check the peptide order")]
    NonPositiveRise { sheet: usize, value: f64 },

    #[error("Invalid morphology: {0}")]
    InvalidMorphology(#[from] MorphologyError),

    #[error(
        "No feasible {morphology} geometry within {steps} refinement steps. Please {hint}. Last attempt: {last}"
    )]
    Infeasible {
        morphology: MorphologyKind,
        hint: &'static str,
        steps: usize,
        last: GeometryParameters,
    },

    #[error("Alignment window {first}-{last} does not fit a peptide of {residues} Cα atoms")]
    AlignmentWindow {
        first: usize,
        last: usize,
        residues: usize,
    },

    #[error("Structure store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
