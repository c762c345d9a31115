use itertools::iproduct;
use phf::{Map, phf_map};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MorphologyError {
    #[error("Unknown morphology '{0}'")]
    Unknown(String),
    #[error("Unknown handedness '{0}' (expected 'left' or 'right')")]
    UnknownHandedness(String),
    #[error("Morphology '{kind}' requires parameter '{name}'")]
    MissingParameter {
        kind: MorphologyKind,
        name: &'static str,
    },
    #[error("Invalid value {value} for '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("Stacking pattern must have at least one row and one column")]
    EmptyPattern,
    #[error("Stacking pattern row {row} has {found} cells, expected {expected}")]
    RaggedPattern {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Stacking pattern has no occupied position")]
    NoOccupiedCell,
    #[error("Unknown strand alignment '{0}' (expected three of 'a'/'p', e.g. 'pap')")]
    UnknownAlignment(String),
    #[error("Unknown sidechain flip '{0}' (expected 's' or 'd')")]
    UnknownSidechainFlip(String),
    #[error("Strand alignment applies to flat sheets only, not to '{0}'")]
    AlignmentRequiresFlatSheet(MorphologyKind),
}

/// Helical sense of a twisted fibril.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    #[default]
    Left,
    Right,
}

impl Handedness {
    /// `+1` for left-handed, `-1` for right-handed.
    pub fn sign(self) -> f64 {
        match self {
            Handedness::Left => 1.0,
            Handedness::Right => -1.0,
        }
    }
}

impl FromStr for Handedness {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" | "+1" | "1" => Ok(Handedness::Left),
            "right" | "r" | "-1" => Ok(Handedness::Right),
            _ => Err(MorphologyError::UnknownHandedness(s.to_string())),
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left => write!(f, "left"),
            Handedness::Right => write!(f, "right"),
        }
    }
}

/// Rectangular occupancy matrix of a stacked cross-section.
///
/// Rows run along `z` (first row is the most positive `z`), columns along `x`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>")]
pub struct StackingPattern {
    rows: Vec<Vec<bool>>,
}

impl StackingPattern {
    pub fn new(rows: Vec<Vec<bool>>) -> Result<Self, MorphologyError> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(MorphologyError::EmptyPattern);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(MorphologyError::RaggedPattern {
                row,
                expected: width,
                found: r.len(),
            });
        }
        if !rows.iter().flatten().any(|&cell| cell) {
            return Err(MorphologyError::NoOccupiedCell);
        }
        Ok(Self { rows })
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.rows[0].len())
    }

    /// Fractional index of the pattern center as `(row, column)`.
    pub fn center(&self) -> (f64, f64) {
        let (nz, nx) = self.shape();
        ((nz as f64 - 1.0) / 2.0, (nx as f64 - 1.0) / 2.0)
    }

    pub fn is_occupied(&self, row: usize, column: usize) -> bool {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(false)
    }

    /// Occupied `(row, column)` cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (nz, nx) = self.shape();
        iproduct!(0..nz, 0..nx).filter(|&(j, k)| self.is_occupied(j, k))
    }
}

impl TryFrom<Vec<Vec<u8>>> for StackingPattern {
    type Error = MorphologyError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::new(
            rows.into_iter()
                .map(|r| r.into_iter().map(|cell| cell != 0).collect())
                .collect(),
        )
    }
}

/// Direction of a strand relative to its reference strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrandDirection {
    Parallel,
    Antiparallel,
}

impl StrandDirection {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'p' => Some(StrandDirection::Parallel),
            'a' => Some(StrandDirection::Antiparallel),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            StrandDirection::Parallel => 'p',
            StrandDirection::Antiparallel => 'a',
        }
    }

    /// Extra turn about `z`, in degrees, that reverses an antiparallel strand.
    fn half_turn(self) -> f64 {
        match self {
            StrandDirection::Parallel => 0.0,
            StrandDirection::Antiparallel => 180.0,
        }
    }
}

/// Strand directions of a sheet pair built from one peptide, written as three
/// letters such as `pap`.
///
/// The letters give, in order, the second peptide of sheet 1 against the first,
/// the first peptide of sheet 2 against the first of sheet 1, and the second
/// peptide of sheet 2 against the first of sheet 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct StrandAlignment {
    pub sheet1: StrandDirection,
    pub across: StrandDirection,
    pub sheet2: StrandDirection,
}

impl StrandAlignment {
    /// Backbone flip `(about y, about z)` in degrees of each chain, ordered
    /// sheet 1 peptide 1, sheet 1 peptide 2, sheet 2 peptide 1, sheet 2 peptide 2.
    ///
    /// Sheet 2 is always turned about `y` to face sheet 1; the turn about `z`
    /// then decides whether it runs along or against sheet 1.
    pub fn backbone_flips(&self) -> [(f64, f64); 4] {
        let across = 180.0 - self.across.half_turn();
        [
            (0.0, 0.0),
            (0.0, self.sheet1.half_turn()),
            (180.0, across),
            (180.0, (across + self.sheet2.half_turn()) % 360.0),
        ]
    }
}

impl FromStr for StrandAlignment {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || MorphologyError::UnknownAlignment(s.to_string());
        let letters: Vec<StrandDirection> = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(StrandDirection::from_letter)
            .collect::<Option<_>>()
            .ok_or_else(unknown)?;
        match letters[..] {
            [sheet1, across, sheet2] => Ok(Self {
                sheet1,
                across,
                sheet2,
            }),
            _ => Err(unknown()),
        }
    }
}

impl TryFrom<String> for StrandAlignment {
    type Error = MorphologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for StrandAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for direction in [self.sheet1, self.across, self.sheet2] {
            write!(f, "{}", direction.letter())?;
        }
        Ok(())
    }
}

/// Whether sheet 2 copies are turned over before their backbone flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SidechainFlip {
    /// `s`: sidechains keep the orientation of the peptide.
    #[default]
    Same,
    /// `d`: sidechains of sheet 2 point the other way.
    Flipped,
}

impl SidechainFlip {
    /// Flip `(about y, about z)` in degrees applied to sheet 2 copies.
    pub fn angles(self) -> (f64, f64) {
        match self {
            SidechainFlip::Same => (0.0, 0.0),
            SidechainFlip::Flipped => (180.0, 180.0),
        }
    }
}

impl FromStr for SidechainFlip {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "same" => Ok(SidechainFlip::Same),
            "d" | "flipped" => Ok(SidechainFlip::Flipped),
            _ => Err(MorphologyError::UnknownSidechainFlip(s.to_string())),
        }
    }
}

impl TryFrom<String> for SidechainFlip {
    type Error = MorphologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Flat sheet built from copies of a single peptide with flipped strands.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetAlignment {
    pub strands: StrandAlignment,
    pub sidechains: SidechainFlip,
    /// Inclusive `[first, last]` Cα indices of the peptide used to center and
    /// register flipped copies. The whole peptide when unset.
    pub window: Option<[usize; 2]>,
}

impl SheetAlignment {
    pub fn new(strands: StrandAlignment, sidechains: SidechainFlip) -> Self {
        Self {
            strands,
            sidechains,
            window: None,
        }
    }

    pub fn with_window(mut self, first: usize, last: usize) -> Self {
        self.window = Some([first, last]);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum MorphologyKind {
    FlatSheet,
    StackedSheet,
    Rod,
    StackedRod,
    Ribbon,
    StackedRibbon,
}

static MORPHOLOGY_ALIASES: Map<&'static str, MorphologyKind> = phf_map! {
    "a_sheet" => MorphologyKind::FlatSheet, "flat-sheet" => MorphologyKind::FlatSheet,
    "s_sheet" => MorphologyKind::StackedSheet, "stacked-sheet" => MorphologyKind::StackedSheet,
    "a_rod" => MorphologyKind::Rod, "rod" => MorphologyKind::Rod,
    "s_rod" => MorphologyKind::StackedRod, "stacked-rod" => MorphologyKind::StackedRod,
    "a_ribbon" => MorphologyKind::Ribbon, "ribbon" => MorphologyKind::Ribbon,
    "s_ribbon" => MorphologyKind::StackedRibbon, "stacked-ribbon" => MorphologyKind::StackedRibbon,
};

impl MorphologyKind {
    pub fn name(self) -> &'static str {
        match self {
            MorphologyKind::FlatSheet => "flat-sheet",
            MorphologyKind::StackedSheet => "stacked-sheet",
            MorphologyKind::Rod => "rod",
            MorphologyKind::StackedRod => "stacked-rod",
            MorphologyKind::Ribbon => "ribbon",
            MorphologyKind::StackedRibbon => "stacked-ribbon",
        }
    }

    /// Name prefix of every object placed for this morphology.
    pub fn object_prefix(self) -> &'static str {
        match self {
            MorphologyKind::FlatSheet => "p",
            MorphologyKind::StackedSheet => "sp",
            MorphologyKind::Rod => "nr",
            MorphologyKind::StackedRod => "snr",
            MorphologyKind::Ribbon => "r",
            MorphologyKind::StackedRibbon => "sr",
        }
    }

    /// Name of the group collecting the assembled objects.
    pub fn group_name(self) -> &'static str {
        match self {
            MorphologyKind::FlatSheet | MorphologyKind::StackedSheet => "plain_sheet",
            MorphologyKind::Rod => "a_rod",
            MorphologyKind::StackedRod => "s_rod",
            MorphologyKind::Ribbon => "a_ribbon",
            MorphologyKind::StackedRibbon => "s_ribbon",
        }
    }

    /// Advice shown when refinement cannot find a feasible geometry.
    pub fn infeasible_hint(self) -> &'static str {
        match self {
            MorphologyKind::FlatSheet | MorphologyKind::StackedSheet => "check the unit geometry",
            MorphologyKind::Rod | MorphologyKind::StackedRod => "decrease tilt angle",
            MorphologyKind::Ribbon => "decrease tilt angle or try another radius",
            MorphologyKind::StackedRibbon => {
                "decrease tilt angle, try another radius, or try another stack angle"
            }
        }
    }

    pub fn is_twisted(self) -> bool {
        !matches!(self, MorphologyKind::FlatSheet | MorphologyKind::StackedSheet)
    }
}

impl FromStr for MorphologyKind {
    type Err = MorphologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        MORPHOLOGY_ALIASES
            .get(key.as_str())
            .or_else(|| MORPHOLOGY_ALIASES.get(key.replace('_', "-").as_str()))
            .copied()
            .ok_or_else(|| MorphologyError::Unknown(s.to_string()))
    }
}

impl TryFrom<String> for MorphologyKind {
    type Error = MorphologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MorphologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Loose morphology parameters as collected from a file or command line.
///
/// Angles are in degrees.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MorphologyParams {
    pub tilt: Option<f64>,
    pub radius: Option<f64>,
    pub stacking: Option<StackingPattern>,
    pub stack_angle: Option<f64>,
    pub num_stack: Option<usize>,
}

/// A target morphology with its validated parameters. Angles are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Morphology {
    FlatSheet,
    StackedSheet {
        stacking: StackingPattern,
    },
    Rod {
        tilt: f64,
    },
    StackedRod {
        tilt: f64,
        stacking: StackingPattern,
    },
    Ribbon {
        tilt: f64,
        radius: f64,
    },
    StackedRibbon {
        tilt: f64,
        radius: f64,
        stack_angle: f64,
        num_stack: usize,
    },
}

impl Morphology {
    /// Assembles a morphology of `kind` from `params`, ignoring parameters the
    /// kind does not use.
    pub fn from_params(
        kind: MorphologyKind,
        params: MorphologyParams,
    ) -> Result<Self, MorphologyError> {
        let missing = |name: &'static str| MorphologyError::MissingParameter { kind, name };
        let tilt = || -> Result<f64, MorphologyError> {
            let tilt = params.tilt.ok_or_else(|| missing("tilt"))?;
            check(
                "tilt",
                tilt,
                (0.0..90.0).contains(&tilt),
                "must lie in [0, 90) degrees",
            )
        };
        let radius = || -> Result<f64, MorphologyError> {
            let radius = params.radius.ok_or_else(|| missing("radius"))?;
            check("radius", radius, radius > 0.0, "must be positive")
        };

        Ok(match kind {
            MorphologyKind::FlatSheet => Morphology::FlatSheet,
            MorphologyKind::StackedSheet => Morphology::StackedSheet {
                stacking: params.stacking.clone().ok_or_else(|| missing("stacking"))?,
            },
            MorphologyKind::Rod => Morphology::Rod { tilt: tilt()? },
            MorphologyKind::StackedRod => Morphology::StackedRod {
                tilt: tilt()?,
                stacking: params.stacking.clone().ok_or_else(|| missing("stacking"))?,
            },
            MorphologyKind::Ribbon => Morphology::Ribbon {
                tilt: tilt()?,
                radius: radius()?,
            },
            MorphologyKind::StackedRibbon => {
                let stack_angle = params.stack_angle.ok_or_else(|| missing("stack-angle"))?;
                let num_stack = params.num_stack.ok_or_else(|| missing("num-stack"))?;
                Morphology::StackedRibbon {
                    tilt: tilt()?,
                    radius: radius()?,
                    stack_angle: check(
                        "stack-angle",
                        stack_angle,
                        stack_angle > 0.0 && stack_angle <= 360.0,
                        "must lie in (0, 360] degrees",
                    )?,
                    num_stack: check(
                        "num-stack",
                        num_stack as f64,
                        num_stack >= 1,
                        "must be at least 1",
                    )
                    .map(|_| num_stack)?,
                }
            }
        })
    }

    pub fn kind(&self) -> MorphologyKind {
        match self {
            Morphology::FlatSheet => MorphologyKind::FlatSheet,
            Morphology::StackedSheet { .. } => MorphologyKind::StackedSheet,
            Morphology::Rod { .. } => MorphologyKind::Rod,
            Morphology::StackedRod { .. } => MorphologyKind::StackedRod,
            Morphology::Ribbon { .. } => MorphologyKind::Ribbon,
            Morphology::StackedRibbon { .. } => MorphologyKind::StackedRibbon,
        }
    }

    /// Requested tilt in degrees (zero for flat sheets).
    pub fn tilt(&self) -> f64 {
        match self {
            Morphology::FlatSheet | Morphology::StackedSheet { .. } => 0.0,
            Morphology::Rod { tilt }
            | Morphology::StackedRod { tilt, .. }
            | Morphology::Ribbon { tilt, .. }
            | Morphology::StackedRibbon { tilt, .. } => *tilt,
        }
    }
}

fn check(
    name: &'static str,
    value: f64,
    ok: bool,
    reason: &'static str,
) -> Result<f64, MorphologyError> {
    if ok && value.is_finite() {
        Ok(value)
    } else {
        Err(MorphologyError::InvalidParameter {
            name,
            value,
            reason,
        })
    }
}

/// Everything the refiner and assembler need to know about the requested build.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphologySpec {
    pub morphology: Morphology,
    /// Number of peptide pairs placed along each strand.
    pub num_half: usize,
    pub handedness: Handedness,
    /// Strand flips of a flat sheet built from one peptide.
    pub alignment: Option<SheetAlignment>,
}

impl MorphologySpec {
    pub fn new(
        morphology: Morphology,
        num_half: usize,
        handedness: Handedness,
    ) -> Result<Self, MorphologyError> {
        if num_half == 0 {
            return Err(MorphologyError::InvalidParameter {
                name: "num-half",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        Ok(Self {
            morphology,
            num_half,
            handedness,
            alignment: None,
        })
    }

    /// Builds the flat sheet from the first peptide with `alignment`.
    pub fn with_alignment(mut self, alignment: SheetAlignment) -> Result<Self, MorphologyError> {
        if self.kind() != MorphologyKind::FlatSheet {
            return Err(MorphologyError::AlignmentRequiresFlatSheet(self.kind()));
        }
        self.alignment = Some(alignment);
        Ok(self)
    }

    pub fn kind(&self) -> MorphologyKind {
        self.morphology.kind()
    }
}
